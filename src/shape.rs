use crate::bounds::Bounds;
use crate::curve::{ BezierCurve1, BezierCurve2, BezierCurve3 };
use crate::intersect::{ self, Hit };
use crate::matrix::Matrix4D;
use crate::ray::Ray3;
use crate::tuple::Vector3;

/// A curve of any supported degree.
///
/// This is what the host keeps in its primitive lists; each variant forwards
/// to the degree-specific `BezierCurve`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Curve {
    /// A straight segment (two control points).
    Linear(BezierCurve1),

    /// A quadratic Bezier curve (three control points).
    Quadratic(BezierCurve2),

    /// A cubic Bezier curve (four control points).
    Cubic(BezierCurve3),
}

impl From<BezierCurve1> for Curve {
    fn from(c: BezierCurve1) -> Curve {
        Curve::Linear(c)
    }
}

impl From<BezierCurve2> for Curve {
    fn from(c: BezierCurve2) -> Curve {
        Curve::Quadratic(c)
    }
}

impl From<BezierCurve3> for Curve {
    fn from(c: BezierCurve3) -> Curve {
        Curve::Cubic(c)
    }
}

impl Curve {
    pub fn degree(&self) -> usize {
        match self {
            Curve::Linear(c) => c.degree(),
            Curve::Quadratic(c) => c.degree(),
            Curve::Cubic(c) => c.degree(),
        }
    }

    pub fn bbox(&self) -> &Bounds {
        match self {
            Curve::Linear(c) => c.bbox(),
            Curve::Quadratic(c) => c.bbox(),
            Curve::Cubic(c) => c.bbox(),
        }
    }

    pub fn max_width(&self) -> f64 {
        match self {
            Curve::Linear(c) => c.max_width(),
            Curve::Quadratic(c) => c.max_width(),
            Curve::Cubic(c) => c.max_width(),
        }
    }

    pub fn evaluate_point(&self, v: f64) -> Vector3 {
        match self {
            Curve::Linear(c) => c.evaluate_point(v),
            Curve::Quadratic(c) => c.evaluate_point(v),
            Curve::Cubic(c) => c.evaluate_point(v),
        }
    }

    pub fn evaluate_width(&self, v: f64) -> f64 {
        match self {
            Curve::Linear(c) => c.evaluate_width(v),
            Curve::Quadratic(c) => c.evaluate_width(v),
            Curve::Cubic(c) => c.evaluate_width(v),
        }
    }

    /// Moves the curve into another space; see `BezierCurve::transformed`.
    pub fn transformed(&self, xfm: &Matrix4D) -> Curve {
        match self {
            Curve::Linear(c) => Curve::Linear(c.transformed(xfm)),
            Curve::Quadratic(c) => Curve::Quadratic(c.transformed(xfm)),
            Curve::Cubic(c) => Curve::Cubic(c.transformed(xfm)),
        }
    }

    /// Finds a hit closer than `t_max`; see `intersect::hit`.
    pub fn hit(&self, ray: &Ray3, xfm: &Matrix4D, t_max: f64) -> Option<Hit> {
        match self {
            Curve::Linear(c) => intersect::hit(c, ray, xfm, t_max),
            Curve::Quadratic(c) => intersect::hit(c, ray, xfm, t_max),
            Curve::Cubic(c) => intersect::hit(c, ray, xfm, t_max),
        }
    }
}

#[test]
fn dispatches_by_degree() {
    let pts = [
        Vector3::new(0.0, 0.0, 5.0),
        Vector3::new(1.0, 0.0, 5.0),
        Vector3::new(2.0, 0.0, 5.0),
    ];
    let curve: Curve = BezierCurve2::new(pts, 0.5).into();

    assert_eq!(curve.degree(), 2);
    assert_eq!(curve.max_width(), 0.5);
    assert_eq!(curve.evaluate_point(0.5), Vector3::new(1.0, 0.0, 5.0));
    assert!(curve.bbox().contains(&Vector3::new(2.2, 0.2, 5.2)));
}

#[test]
fn transformed_curve_is_hit_where_moved() {
    let seg: Curve = BezierCurve1::new(
        [Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 10.0)], 0.4).into();
    let moved = seg.transformed(&Matrix4D::translation(3.0, 0.0, 0.0));

    let ray = Ray3::new(Vector3::new(3.0, -5.0, 2.0), Vector3::new(0.0, 1.0, 0.0));
    let xfm = intersect::make_facing_transform(&ray);

    assert!(seg.hit(&ray, &xfm, f64::INFINITY).is_none());

    let h = moved.hit(&ray, &xfm, f64::INFINITY).unwrap();
    approx::assert_abs_diff_eq!(h.t, 5.0, epsilon = 1e-9);
    approx::assert_abs_diff_eq!(h.v, 0.2, epsilon = 1e-9);
}
