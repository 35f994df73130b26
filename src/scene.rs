use std::convert::{ TryFrom, TryInto };
use std::fs;
use std::path::Path;

use log::{ debug, warn };
use serde::{ Deserialize, Serialize };
use thiserror::Error;

use crate::consts::HOMOGENEOUS_W_EPSILON;
use crate::curve::{ BezierCurve1, BezierCurve2, BezierCurve3 };
use crate::intersect::make_facing_transform;
use crate::matrix::Matrix4D;
use crate::ray::Ray3;
use crate::shape::Curve;
use crate::tuple::Vector3;

/// Reasons a query file can be rejected.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("could not read query file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed query file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("curve {curve}: expected 2 to 4 control points, found {count}")]
    ControlPointCount { curve: usize, count: usize },

    #[error("curve {curve}: give exactly one of `width` or `widths`")]
    WidthSpec { curve: usize },

    #[error("curve {curve}: {widths} widths for {points} control points")]
    WidthCount { curve: usize, widths: usize, points: usize },

    #[error("curve {curve}: width {width} is negative or not a number")]
    NegativeWidth { curve: usize, width: f64 },

    #[error("curve {curve}: transform must have 16 entries, found {count}")]
    TransformSize { curve: usize, count: usize },

    #[error("curve {curve}: transform sends control point {point} to infinity")]
    SingularTransform { curve: usize, point: usize },
}

/// Curves and rays to test against each other.
#[derive(Clone, Debug)]
pub struct Scene {
    pub curves: Vec<Curve>,
    pub rays: Vec<Ray3>,

    /// Hits beyond this distance (in units of each ray's direction) are
    /// ignored.
    pub max_distance: f64,
}

/// The closest hit of a ray among all curves of a scene.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct SceneHit {
    /// Index of the curve that was hit.
    pub curve: usize,
    pub t: f64,
    pub v: f64,
}

impl Scene {
    pub fn new(curves: Vec<Curve>) -> Scene {
        Scene { curves, rays: Vec::new(), max_distance: f64::INFINITY }
    }

    /// Reads and validates a JSON query file.
    pub fn load(path: &Path) -> Result<Scene, SceneError> {
        debug!("loading query file {}", path.display());
        let text = fs::read_to_string(path)?;
        Scene::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Scene, SceneError> {
        let query: QueryJson = serde_json::from_str(text)?;
        Scene::try_from(query)
    }

    /// Finds the nearest curve hit closer than `t_max`.
    ///
    /// Curves are scanned in order; each hit tightens the bound for the
    /// curves after it.
    pub fn closest_hit(&self, ray: &Ray3, t_max: f64) -> Option<SceneHit> {
        let xfm = make_facing_transform(ray);
        let mut t = t_max;
        let mut closest = None;

        for (i, curve) in self.curves.iter().enumerate() {
            if !curve.bbox().intersects_ray(ray, t) {
                continue;
            }

            if let Some(h) = curve.hit(ray, &xfm, t) {
                t = h.t;
                closest = Some(SceneHit { curve: i, t: h.t, v: h.v });
            }
        }

        closest
    }
}

#[derive(Clone, Debug, Deserialize)]
struct QueryJson {
    #[serde(default)]
    max_distance: Option<f64>,

    curves: Vec<CurveJson>,

    #[serde(default)]
    rays: Vec<RayJson>,
}

#[derive(Clone, Debug, Deserialize)]
struct CurveJson {
    points: Vec<[f64; 3]>,

    #[serde(default)]
    width: Option<f64>,

    #[serde(default)]
    widths: Option<Vec<f64>>,

    /// Row-major 4x4 matrix applied to the control points at load time.
    #[serde(default)]
    transform: Option<Vec<f64>>,
}

#[derive(Clone, Debug, Deserialize)]
struct RayJson {
    origin: [f64; 3],
    direction: [f64; 3],
}

impl TryFrom<QueryJson> for Scene {
    type Error = SceneError;

    fn try_from(query: QueryJson) -> Result<Scene, SceneError> {
        let curves = query.curves.iter().enumerate()
            .map(|(i, c)| c.to_curve(i))
            .collect::<Result<Vec<_>, _>>()?;

        let rays: Vec<Ray3> = query.rays.iter()
            .map(|r| Ray3::new(r.origin.into(), r.direction.into()))
            .collect();

        for (i, ray) in rays.iter().enumerate() {
            if !ray.direction.magnitude().is_normal() {
                warn!("ray {} has a degenerate direction and will never hit", i);
            }
        }

        debug!("query file holds {} curves and {} rays", curves.len(), rays.len());

        Ok(Scene {
            curves,
            rays,
            max_distance: query.max_distance.unwrap_or(f64::INFINITY),
        })
    }
}

impl CurveJson {
    /// Validates the description, then builds the curve.
    ///
    /// Everything the curve constructors would panic on is reported as an
    /// error here first.
    fn to_curve(&self, index: usize) -> Result<Curve, SceneError> {
        let count = self.points.len();
        if !(2..=4).contains(&count) {
            return Err(SceneError::ControlPointCount { curve: index, count });
        }

        let widths = match (self.width, &self.widths) {
            (Some(w), None) => vec![w; count],
            (None, Some(ws)) => ws.clone(),
            _ => return Err(SceneError::WidthSpec { curve: index }),
        };

        if widths.len() != count {
            return Err(SceneError::WidthCount {
                curve: index, widths: widths.len(), points: count
            });
        }

        if let Some(&width) = widths.iter().find(|w| !(**w >= 0.0)) {
            return Err(SceneError::NegativeWidth { curve: index, width });
        }

        let curve = match count {
            2 => Curve::from(BezierCurve1::with_widths(points(&self.points), widths_of(&widths))),
            3 => Curve::from(BezierCurve2::with_widths(points(&self.points), widths_of(&widths))),
            _ => Curve::from(BezierCurve3::with_widths(points(&self.points), widths_of(&widths))),
        };

        match &self.transform {
            None => Ok(curve),
            Some(data) => {
                let xfm = self.checked_transform(index, data)?;
                Ok(curve.transformed(&xfm))
            },
        }
    }

    fn checked_transform(&self, index: usize, data: &[f64]) -> Result<Matrix4D, SceneError> {
        let buf: [f64; 16] = data.try_into().map_err(|_| SceneError::TransformSize {
            curve: index, count: data.len()
        })?;
        let xfm = Matrix4D::from(buf);

        for (point, p) in self.points.iter().enumerate() {
            let w = xfm[(3, 0)] * p[0] + xfm[(3, 1)] * p[1] + xfm[(3, 2)] * p[2] + xfm[(3, 3)];
            if !(w.abs() > HOMOGENEOUS_W_EPSILON) {
                return Err(SceneError::SingularTransform { curve: index, point });
            }
        }

        Ok(xfm)
    }
}

fn points<const P: usize>(pts: &[[f64; 3]]) -> [Vector3; P] {
    std::array::from_fn(|i| Vector3::from(pts[i]))
}

fn widths_of<const P: usize>(widths: &[f64]) -> [f64; P] {
    std::array::from_fn(|i| widths[i])
}

#[test]
fn loads_curves_of_every_degree() {
    let scene = Scene::from_json(r#"{
        "max_distance": 50.0,
        "curves": [
            { "points": [[0, 0, 5], [0, 0, 10]], "width": 0.4 },
            { "points": [[0, 0, 5], [1, 1, 5], [2, 0, 5]], "widths": [0.1, 0.2, 0.1] },
            { "points": [[0, 0, 5], [1, 1, 5], [2, -1, 5], [3, 0, 5]], "width": 0.2,
              "transform": [1, 0, 0, 1,  0, 1, 0, 0,  0, 0, 1, 0,  0, 0, 0, 1] }
        ],
        "rays": [ { "origin": [0.1, 0, 0], "direction": [0, 0, 1] } ]
    }"#).unwrap();

    assert_eq!(scene.curves.len(), 3);
    assert_eq!(scene.curves[0].degree(), 1);
    assert_eq!(scene.curves[1].max_width(), 0.2);
    assert_eq!(scene.curves[2].evaluate_point(0.0), Vector3::new(1.0, 0.0, 5.0));
    assert_eq!(scene.rays.len(), 1);
    assert_eq!(scene.max_distance, 50.0);
}

#[test]
fn rejects_bad_point_count() {
    let err = Scene::from_json(r#"{ "curves": [ { "points": [[0, 0, 0]], "width": 1 } ] }"#)
        .unwrap_err();
    assert!(matches!(err, SceneError::ControlPointCount { curve: 0, count: 1 }));
}

#[test]
fn rejects_negative_width() {
    let err = Scene::from_json(r#"{ "curves": [
        { "points": [[0, 0, 0], [1, 0, 0]], "width": 1 },
        { "points": [[0, 0, 0], [1, 0, 0]], "widths": [0.5, -0.5] }
    ] }"#).unwrap_err();
    assert!(matches!(err, SceneError::NegativeWidth { curve: 1, .. }));
}

#[test]
fn rejects_mismatched_widths() {
    let err = Scene::from_json(r#"{ "curves": [
        { "points": [[0, 0, 0], [1, 0, 0], [2, 0, 0]], "widths": [0.5, 0.5] }
    ] }"#).unwrap_err();
    assert!(matches!(err, SceneError::WidthCount { curve: 0, widths: 2, points: 3 }));

    let err = Scene::from_json(r#"{ "curves": [
        { "points": [[0, 0, 0], [1, 0, 0]] }
    ] }"#).unwrap_err();
    assert!(matches!(err, SceneError::WidthSpec { curve: 0 }));
}

#[test]
fn rejects_singular_transform() {
    let err = Scene::from_json(r#"{ "curves": [
        { "points": [[0, 0, 0], [1, 0, 0]], "width": 1,
          "transform": [1, 0, 0, 0,  0, 1, 0, 0,  0, 0, 1, 0,  0, 0, 0, 0] }
    ] }"#).unwrap_err();
    assert!(matches!(err, SceneError::SingularTransform { curve: 0, point: 0 }));
}

#[test]
fn closest_hit_prefers_nearer_curve() {
    let near: Curve = BezierCurve1::new(
        [Vector3::new(-1.0, 0.0, 3.0), Vector3::new(1.0, 0.0, 3.0)], 0.2).into();
    let far: Curve = BezierCurve1::new(
        [Vector3::new(-1.0, 0.0, 8.0), Vector3::new(1.0, 0.0, 8.0)], 0.2).into();

    let ray = Ray3::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0));

    let scene = Scene::new(vec![far, near]);
    let h = scene.closest_hit(&ray, f64::INFINITY).unwrap();
    assert_eq!(h.curve, 1);
    approx::assert_abs_diff_eq!(h.t, 3.0, epsilon = 1e-9);
    approx::assert_abs_diff_eq!(h.v, 0.5, epsilon = 1e-9);

    assert!(scene.closest_hit(&ray, 2.0).is_none());
}
