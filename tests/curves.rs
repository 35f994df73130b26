use std::fs;
use std::sync::Arc;

use approx::assert_abs_diff_eq;

use curve_tracer::curve::{ BezierCurve1, BezierCurve3 };
use curve_tracer::intersect::{ intersect, make_facing_transform };
use curve_tracer::parallel::run_batch;
use curve_tracer::ray::Ray3;
use curve_tracer::scene::{ Scene, SceneError };
use curve_tracer::tuple::Vector3;

fn cast<const P: usize>(curve: &curve_tracer::curve::BezierCurve<P>, origin: [f64; 3],
    direction: [f64; 3]) -> Option<f64>
    where curve_tracer::curve::Bernstein: curve_tracer::curve::BernsteinBasis<P> {
    let ray = Ray3::new(origin.into(), direction.into());
    let xfm = make_facing_transform(&ray);

    let mut t = f64::INFINITY;
    if intersect(curve, &ray, &xfm, &mut t) { Some(t) } else { None }
}

fn wavy_cubic() -> BezierCurve3 {
    BezierCurve3::new([
        Vector3::new(0.0, 0.0, 5.0),
        Vector3::new(1.0, 1.0, 5.0),
        Vector3::new(2.0, -1.0, 5.0),
        Vector3::new(3.0, 0.0, 5.0),
    ], 0.2)
}

#[test]
fn straight_hair_is_hit_at_its_start() {
    let hair = BezierCurve1::new(
        [Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, 10.0)], 0.4);

    let t = cast(&hair, [0.1, 0.0, 0.0], [0.0, 0.0, 1.0]).unwrap();
    assert_abs_diff_eq!(t, 5.0, epsilon = 1e-3);
}

#[test]
fn cubic_hair_is_hit_near_its_middle() {
    let t = cast(&wavy_cubic(), [1.5, 0.0, 0.0], [0.0, 0.0, 1.0]).unwrap();
    assert_abs_diff_eq!(t, 5.0, epsilon = 0.1);
}

#[test]
fn hit_parameter_lies_on_the_ray() {
    let curve = wavy_cubic();
    let ray = Ray3::new(Vector3::new(0.4, 0.22, -1.0), Vector3::new(0.0, 0.0, 2.0));
    let xfm = make_facing_transform(&ray);

    let h = curve_tracer::intersect::hit(&curve, &ray, &xfm, f64::INFINITY).unwrap();
    let on_curve = curve.evaluate_point(h.v);
    let on_ray = ray.position(h.t);
    assert_abs_diff_eq!(h.t, 3.0, epsilon = 1e-9);

    assert_abs_diff_eq!(on_ray.z, on_curve.z, epsilon = 1e-9);
    let dx = on_ray.x - on_curve.x;
    let dy = on_ray.y - on_curve.y;
    assert!((dx * dx + dy * dy).sqrt() < curve.evaluate_width(h.v) * 0.5);
}

#[test]
fn cubic_hair_is_missed_from_afar() {
    assert!(cast(&wavy_cubic(), [10.0, 10.0, 0.0], [0.0, 0.0, 1.0]).is_none());
}

#[test]
fn ray_outside_the_swept_width_misses() {
    // The curve never leaves y in [-0.29, 0.29]; half its width is 0.1.
    assert!(cast(&wavy_cubic(), [1.5, 0.5, 0.0], [0.0, 0.0, 1.0]).is_none());
    assert!(cast(&wavy_cubic(), [1.5, -0.5, 0.0], [0.0, 0.0, 1.0]).is_none());
}

#[test]
fn query_file_end_to_end() {
    let path = std::env::temp_dir().join(format!("curve-tracer-{}.json", std::process::id()));
    fs::write(&path, r#"{
        "curves": [
            { "points": [[0, 0, 5], [1, 1, 5], [2, -1, 5], [3, 0, 5]], "width": 0.2 },
            { "points": [[-1, 0, 2], [1, 0, 2]], "widths": [0.3, 0.3] }
        ],
        "rays": [
            { "origin": [1.5, 0, 0], "direction": [0, 0, 1] },
            { "origin": [0, 0, 0], "direction": [0, 0, 1] },
            { "origin": [10, 10, 0], "direction": [0, 0, 1] }
        ]
    }"#).unwrap();

    let scene = Scene::load(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let hits = run_batch(Arc::new(scene), 2);
    assert_eq!(hits.len(), 3);

    let first = hits[0].unwrap();
    assert_eq!(first.curve, 0);
    assert_abs_diff_eq!(first.t, 5.0, epsilon = 0.1);

    // The straight segment at z = 2 hides the cubic behind it.
    let second = hits[1].unwrap();
    assert_eq!(second.curve, 1);
    assert_abs_diff_eq!(second.t, 2.0, epsilon = 1e-9);

    assert!(hits[2].is_none());
}

#[test]
fn missing_query_file_is_an_io_error() {
    let path = std::env::temp_dir().join("curve-tracer-does-not-exist.json");
    assert!(matches!(Scene::load(&path), Err(SceneError::Io(_))));
}

#[test]
fn malformed_query_file_is_a_json_error() {
    assert!(matches!(Scene::from_json("{ \"curves\": 3 }"), Err(SceneError::Json(_))));
}
