use std::f64::consts::FRAC_PI_2;

use log::trace;

use crate::consts::{
    DEGENERATE_CHORD_EPSILON, DEGENERATE_DIRECTION_EPSILON, RAY_NEAR_EPSILON
};
use crate::curve::{ Bernstein, BernsteinBasis, BezierCurve };
use crate::matrix::Matrix4D;
use crate::ray::Ray3;

/// A ray/curve hit.
///
/// `t` is measured in units of the ray's direction (so `ray.position(t)` is
/// the hit point) and `v` is the parameter on the curve, in `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hit {
    pub t: f64,
    pub v: f64,
}

/// Builds the transform into a ray's local frame.
///
/// In that frame the ray starts at the origin and travels along +Z, so a
/// ray/curve test reduces to asking whether the curve passes within its
/// half-width of the Z axis.
///
/// The rotation is built in closed form from the normalized direction. When
/// the direction is (nearly) parallel to the Y axis that construction
/// degenerates, and a quarter turn about X is used instead, signed by the
/// direction's Y component.
pub fn make_facing_transform(ray: &Ray3) -> Matrix4D {
    let dir = ray.direction.normalize();
    let d = (dir.x * dir.x + dir.z * dir.z).sqrt();

    let mut m = if d >= DEGENERATE_DIRECTION_EPSILON {
        let rcp_d = 1.0 / d;
        Matrix4D::from([
            dir.z * rcp_d,            0.0,   -dir.x * rcp_d,            0.0,
            -(dir.x * dir.y) * rcp_d, d,     -(dir.y * dir.z) * rcp_d,  0.0,
            dir.x,                    dir.y, dir.z,                     0.0,
            0.0,                      0.0,   0.0,                       1.0,
        ])
    } else {
        let angle = if dir.y > 0.0 { FRAC_PI_2 } else { -FRAC_PI_2 };
        Matrix4D::rotation_x(angle)
    };

    // Translate the ray origin onto the local origin.
    let o = ray.origin;
    for r in 0..3 {
        m[(r, 3)] = -(m[(r, 0)] * o.x + m[(r, 1)] * o.y + m[(r, 2)] * o.z);
    }

    m
}

/// Intersects a ray with a curve, looking for a hit closer than `t`.
///
/// `xfm` maps the curve into the ray's local frame (usually
/// `make_facing_transform(ray)`). Returns `true` and overwrites `t` with the
/// hit distance when such a hit exists; otherwise `t` is left untouched.
pub fn intersect<const P: usize>(curve: &BezierCurve<P>, ray: &Ray3, xfm: &Matrix4D,
    t: &mut f64) -> bool
    where Bernstein: BernsteinBasis<P> {
    match hit(curve, ray, xfm, *t) {
        Some(h) => {
            *t = h.t;
            true
        },
        None => false,
    }
}

/// Like `intersect`, but also reports the curve parameter of the hit.
pub fn hit<const P: usize>(curve: &BezierCurve<P>, ray: &Ray3, xfm: &Matrix4D,
    t_max: f64) -> Option<Hit>
    where Bernstein: BernsteinBasis<P> {
    let dir_len = ray.direction.magnitude();
    if !dir_len.is_normal() {
        return None;
    }

    let local_curve = curve.transformed(xfm);
    let depth = local_curve.recursion_depth();

    // The local frame measures distance along the normalized direction.
    let mut search = Convergence::new(curve, xfm, t_max * dir_len);
    let found = search.converge(depth, &local_curve, 0.0, 1.0);

    trace!("curve query: depth {}, {} leaves tested, hit: {}",
        depth, search.leaves_tested, found);

    if found {
        Some(Hit { t: search.t / dir_len, v: search.v })
    } else {
        None
    }
}

/// State for one recursive search over a curve's subdivision tree.
///
/// `t` only ever shrinks: once a hit is recorded, every later test must beat
/// it.
struct Convergence<'a, const P: usize> {
    original: &'a BezierCurve<P>,
    xfm: &'a Matrix4D,
    t: f64,
    v: f64,
    leaves_tested: usize,
}

impl<'a, const P: usize> Convergence<'a, P> where Bernstein: BernsteinBasis<P> {
    fn new(original: &'a BezierCurve<P>, xfm: &'a Matrix4D, t: f64) -> Self {
        Convergence { original, xfm, t, v: 0.0, leaves_tested: 0 }
    }

    /// Searches `curve`, which covers `[v0, vn]` of the original curve.
    fn converge(&mut self, depth: usize, curve: &BezierCurve<P>, v0: f64, vn: f64) -> bool {
        let bbox = curve.bbox();
        let half_width = curve.max_width() * 0.5;

        if bbox.minimum.z >= self.t || bbox.maximum.z <= RAY_NEAR_EPSILON
            || bbox.minimum.x >= half_width || bbox.maximum.x <= -half_width
            || bbox.minimum.y >= half_width || bbox.maximum.y <= -half_width {
            return false;
        }

        if depth > 0 {
            let (left, right) = curve.split();
            let vm = (v0 + vn) * 0.5;

            return self.converge(depth - 1, &left, v0, vm)
                || self.converge(depth - 1, &right, vm, vn);
        }

        self.leaves_tested += 1;
        self.intersect_leaf(curve, v0, vn)
    }

    /// Treats a flat enough segment as its chord.
    fn intersect_leaf(&mut self, curve: &BezierCurve<P>, v0: f64, vn: f64) -> bool {
        let n = BezierCurve::<P>::DEGREE;
        let cp0 = *curve.control_point(0);
        let cpn = *curve.control_point(n);
        let dir = cpn - cp0;

        // The end tangents, oriented along the chord, bound the segment like
        // a pair of caps. The ray origin must lie between them.
        let mut dp0 = *curve.control_point(1) - cp0;
        if dir.dot_xy(&dp0) < 0.0 {
            dp0 = -dp0;
        }

        if dp0.dot_xy(&cp0) > 0.0 {
            return false;
        }

        let mut dpn = cpn - *curve.control_point(n - 1);
        if dir.dot_xy(&dpn) < 0.0 {
            dpn = -dpn;
        }

        if dpn.dot_xy(&cpn) < 0.0 {
            return false;
        }

        // Closest point of the chord to the Z axis. A chord seen end-on has no
        // unique closest point; take its nearer end.
        let chord_len2 = dir.dot_xy(&dir);
        let w = if chord_len2 < DEGENERATE_CHORD_EPSILON {
            if cp0.z <= cpn.z { 0.0 } else { 1.0 }
        } else {
            (-cp0.dot_xy(&dir) / chord_len2).clamp(0.0, 1.0)
        };

        // Position comes from the unsplit curve, to avoid accumulating
        // subdivision error.
        let v = v0 * (1.0 - w) + vn * w;
        let p = self.xfm.transform_point(&self.original.evaluate_point(v));

        if p.z <= RAY_NEAR_EPSILON || p.z >= self.t {
            return false;
        }

        // Width comes from the segment at the local parameter.
        let half_width = 0.5 * curve.evaluate_width(w);
        if p.x * p.x + p.y * p.y >= half_width * half_width {
            return false;
        }

        self.t = p.z;
        self.v = v;
        true
    }
}

#[cfg(test)]
use crate::curve::{ BezierCurve1, BezierCurve2, BezierCurve3 };
#[cfg(test)]
use crate::tuple::Vector3;

#[cfg(test)]
fn wavy_cubic() -> BezierCurve3 {
    BezierCurve3::new([
        Vector3::new(0.0, 0.0, 5.0),
        Vector3::new(1.0, 1.0, 5.0),
        Vector3::new(2.0, -1.0, 5.0),
        Vector3::new(3.0, 0.0, 5.0),
    ], 0.2)
}

#[cfg(test)]
fn arch(z0: f64, z1: f64, z2: f64) -> BezierCurve2 {
    BezierCurve2::new([
        Vector3::new(0.0, 0.0, z0),
        Vector3::new(1.0, 2.0, z1),
        Vector3::new(2.0, 0.0, z2),
    ], 0.2)
}

#[cfg(test)]
fn z_segment(width: f64) -> BezierCurve1 {
    BezierCurve1::new([Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 10.0)], width)
}

#[cfg(test)]
fn query<const P: usize>(curve: &BezierCurve<P>, origin: Vector3, direction: Vector3)
    -> Option<Hit>
    where Bernstein: BernsteinBasis<P> {
    let ray = Ray3::new(origin, direction);
    hit(curve, &ray, &make_facing_transform(&ray), f64::INFINITY)
}

#[test]
fn facing_transform_puts_ray_on_z_axis() {
    let rays = [
        Ray3::new(Vector3::new(1.0, 2.0, 3.0), Vector3::new(0.3, -0.4, 2.0)),
        Ray3::new(Vector3::new(-4.0, 0.5, 1.0), Vector3::new(-1.0, 0.0, 0.0)),
        Ray3::new(Vector3::new(0.0, -5.0, 3.0), Vector3::new(0.0, 1.0, 0.0)),
        Ray3::new(Vector3::new(2.0, 5.0, 3.0), Vector3::new(0.0, -3.0, 0.0)),
    ];

    for ray in rays.iter() {
        let m = make_facing_transform(ray);
        let len = ray.direction.magnitude();

        assert_eq!(m.transform_point(&ray.origin), Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(m.transform_point(&ray.position(1.0)), Vector3::new(0.0, 0.0, len));
    }
}

#[test]
fn facing_transform_is_rigid() {
    let ray = Ray3::new(Vector3::new(1.0, 1.0, 1.0), Vector3::new(1.0, 2.0, 3.0));
    let m = make_facing_transform(&ray);

    let a = Vector3::new(3.0, -1.0, 2.0);
    let b = Vector3::new(-2.0, 4.0, 0.5);
    let before = (a - b).magnitude();
    let after = (m.transform_point(&a) - m.transform_point(&b)).magnitude();

    approx::assert_abs_diff_eq!(before, after, epsilon = 1e-9);
}

#[test]
fn straight_segment_hit_near_start() {
    let h = query(&BezierCurve1::new(
        [Vector3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, 10.0)], 0.4),
        Vector3::new(0.1, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0)).unwrap();

    approx::assert_abs_diff_eq!(h.t, 5.0, epsilon = 1e-3);
    assert_eq!(h.v, 0.0);
}

#[test]
fn cubic_hit_through_midpoint() {
    let h = query(&wavy_cubic(),
        Vector3::new(1.5, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0)).unwrap();

    approx::assert_abs_diff_eq!(h.t, 5.0, epsilon = 0.1);
    approx::assert_abs_diff_eq!(h.v, 0.5, epsilon = 0.05);
}

#[test]
fn cubic_missed_far_away() {
    let h = query(&wavy_cubic(),
        Vector3::new(10.0, 10.0, 0.0), Vector3::new(0.0, 0.0, 1.0));

    assert!(h.is_none());
}

#[test]
fn curve_behind_ray_is_culled_before_any_leaf() {
    let curve = wavy_cubic();
    let ray = Ray3::new(Vector3::new(1.5, 0.0, 10.0), Vector3::new(0.0, 0.0, 1.0));
    let xfm = make_facing_transform(&ray);
    let local = curve.transformed(&xfm);

    assert!(local.bbox().maximum.z <= RAY_NEAR_EPSILON);

    let mut search = Convergence::new(&curve, &xfm, f64::INFINITY);
    assert!(!search.converge(local.recursion_depth(), &local, 0.0, 1.0));
    assert_eq!(search.leaves_tested, 0);
}

#[test]
fn ray_from_the_side() {
    let h = query(&z_segment(0.4),
        Vector3::new(5.0, 0.0, 3.0), Vector3::new(-1.0, 0.0, 0.0)).unwrap();

    approx::assert_abs_diff_eq!(h.t, 5.0, epsilon = 1e-9);
    approx::assert_abs_diff_eq!(h.v, 0.3, epsilon = 1e-9);

    assert!(query(&z_segment(0.4),
        Vector3::new(5.0, 0.0, 11.0), Vector3::new(-1.0, 0.0, 0.0)).is_none());
}

#[test]
fn ray_parallel_to_y_axis() {
    for (origin, direction) in [
        (Vector3::new(0.0, -5.0, 3.0), Vector3::new(0.0, 1.0, 0.0)),
        (Vector3::new(0.0, 5.0, 3.0), Vector3::new(0.0, -1.0, 0.0)),
    ] {
        let h = query(&z_segment(0.4), origin, direction).unwrap();

        approx::assert_abs_diff_eq!(h.t, 5.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(h.v, 0.3, epsilon = 1e-9);
    }
}

#[test]
fn distance_is_in_units_of_direction() {
    let h = query(&z_segment(0.4),
        Vector3::new(4.0, 4.0, 7.0), Vector3::new(-1.0, -1.0, 0.0)).unwrap();
    approx::assert_abs_diff_eq!(h.t, 4.0, epsilon = 1e-9);

    let h = query(&wavy_cubic(),
        Vector3::new(1.5, 0.0, 0.0), Vector3::new(0.0, 0.0, 2.0)).unwrap();
    approx::assert_abs_diff_eq!(h.t, 2.5, epsilon = 0.05);
}

#[test]
fn nearer_ray_records_smaller_t() {
    let tilted = BezierCurve3::new([
        Vector3::new(0.0, 0.0, 5.0),
        Vector3::new(1.0, 1.0, 6.0),
        Vector3::new(2.0, -1.0, 7.0),
        Vector3::new(3.0, 0.0, 8.0),
    ], 0.2);

    let near = tilted.evaluate_point(0.25);
    let far = tilted.evaluate_point(0.75);
    let up = Vector3::new(0.0, 0.0, 1.0);

    let near_hit = query(&tilted, Vector3::new(near.x, near.y, 0.0), up).unwrap();
    let far_hit = query(&tilted, Vector3::new(far.x, far.y, 0.0), up).unwrap();

    approx::assert_abs_diff_eq!(near_hit.t, near.z, epsilon = 1e-6);
    approx::assert_abs_diff_eq!(far_hit.t, far.z, epsilon = 1e-6);
    assert!(near_hit.t < far_hit.t);
}

#[test]
fn width_follows_the_taper() {
    let tapered = BezierCurve1::with_widths(
        [Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 10.0)],
        [1.0, 0.0],
    );
    let dir = Vector3::new(-1.0, 0.0, 0.0);

    // Half-width is 0.45 at z = 1 but only 0.05 at z = 9.
    assert!(query(&tapered, Vector3::new(5.0, 0.3, 1.0), dir).is_some());
    assert!(query(&tapered, Vector3::new(5.0, 0.3, 9.0), dir).is_none());
}

#[test]
fn search_bound_is_respected_and_kept_on_miss() {
    let curve = wavy_cubic();
    let ray = Ray3::new(Vector3::new(1.5, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0));
    let xfm = make_facing_transform(&ray);

    let mut t = 4.0;
    assert!(!intersect(&curve, &ray, &xfm, &mut t));
    assert_eq!(t, 4.0);

    let mut t = 100.0;
    assert!(intersect(&curve, &ray, &xfm, &mut t));
    approx::assert_abs_diff_eq!(t, 5.0, epsilon = 0.1);
}

#[test]
fn zero_direction_never_hits() {
    let h = query(&wavy_cubic(), Vector3::new(1.5, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0));
    assert!(h.is_none());
}

#[test]
fn quadratic_hit_through_apex() {
    let h = query(&arch(5.0, 5.0, 5.0),
        Vector3::new(1.0, 1.0, 0.0), Vector3::new(0.0, 0.0, 1.0)).unwrap();

    approx::assert_abs_diff_eq!(h.t, 5.0, epsilon = 1e-9);
    approx::assert_abs_diff_eq!(h.v, 0.5, epsilon = 1e-9);

    assert!(query(&arch(5.0, 5.0, 5.0),
        Vector3::new(1.0, 1.05, 0.0), Vector3::new(0.0, 0.0, 1.0)).is_some());
}

#[test]
fn quadratic_missed_outside_its_width() {
    // The apex sits at (1, 1); half the width is 0.1.
    for y in [1.2, 0.8] {
        let h = query(&arch(5.0, 5.0, 5.0),
            Vector3::new(1.0, y, 0.0), Vector3::new(0.0, 0.0, 1.0));
        assert!(h.is_none(), "ray at y = {} should miss", y);
    }
}

#[test]
fn quadratic_behind_ray_is_culled() {
    let curve = arch(5.0, 5.0, 5.0);
    let ray = Ray3::new(Vector3::new(1.0, 1.0, 10.0), Vector3::new(0.0, 0.0, 1.0));
    let xfm = make_facing_transform(&ray);
    let local = curve.transformed(&xfm);

    let mut search = Convergence::new(&curve, &xfm, f64::INFINITY);
    assert!(!search.converge(local.recursion_depth(), &local, 0.0, 1.0));
    assert_eq!(search.leaves_tested, 0);
}

#[test]
fn quadratic_nearer_ray_records_smaller_t() {
    let curve = arch(4.0, 6.0, 8.0);

    let near = curve.evaluate_point(0.25);
    let far = curve.evaluate_point(0.75);
    assert_eq!(near, Vector3::new(0.5, 0.75, 5.0));
    assert_eq!(far, Vector3::new(1.5, 0.75, 7.0));

    let down = Vector3::new(0.0, 0.0, 1.0);
    let h_near = query(&curve, Vector3::new(near.x, near.y, 0.0), down).unwrap();
    let h_far = query(&curve, Vector3::new(far.x, far.y, 0.0), down).unwrap();

    approx::assert_abs_diff_eq!(h_near.t, 5.0, epsilon = 1e-9);
    approx::assert_abs_diff_eq!(h_near.v, 0.25, epsilon = 1e-9);
    approx::assert_abs_diff_eq!(h_far.t, 7.0, epsilon = 1e-9);
    approx::assert_abs_diff_eq!(h_far.v, 0.75, epsilon = 1e-9);
}
