use std::f64::consts::SQRT_2;

use crate::bounds::Bounds;
use crate::consts::{
    CURVE_BBOX_ROBUST_EPSILON, FLATNESS_WIDTH_FRACTION, MAX_RECURSION_DEPTH
};
use crate::matrix::Matrix4D;
use crate::tuple::Vector3;

/// Per-degree constants of the Bernstein basis for `P` control points.
///
/// The split tables are the De Casteljau midpoint cascade written out as
/// weights: row `j` of `SPLIT_LEFT` gives control point `j` of the left half
/// as a blend of the parent's control points. Degree 1 takes the endpoint and
/// the midpoint; degree 2 adds the one-level midpoint `(p0 + p1) / 2`; degree
/// 3 adds the one- and two-level midpoints. The last row of `SPLIT_LEFT` and
/// the first row of `SPLIT_RIGHT` are the same curve midpoint.
pub trait BernsteinBasis<const P: usize> {
    const BINOMIAL: [f64; P];
    const SPLIT_LEFT: [[f64; P]; P];
    const SPLIT_RIGHT: [[f64; P]; P];
}

/// Implements `BernsteinBasis` for the supported degrees (1, 2 and 3).
#[derive(Copy, Clone, Debug)]
pub struct Bernstein;

impl BernsteinBasis<2> for Bernstein {
    const BINOMIAL: [f64; 2] = [1.0, 1.0];

    const SPLIT_LEFT: [[f64; 2]; 2] = [
        [1.0, 0.0],
        [0.5, 0.5],
    ];

    const SPLIT_RIGHT: [[f64; 2]; 2] = [
        [0.5, 0.5],
        [0.0, 1.0],
    ];
}

impl BernsteinBasis<3> for Bernstein {
    const BINOMIAL: [f64; 3] = [1.0, 2.0, 1.0];

    const SPLIT_LEFT: [[f64; 3]; 3] = [
        [1.0,  0.0, 0.0 ],
        [0.5,  0.5, 0.0 ],
        [0.25, 0.5, 0.25],
    ];

    const SPLIT_RIGHT: [[f64; 3]; 3] = [
        [0.25, 0.5, 0.25],
        [0.0,  0.5, 0.5 ],
        [0.0,  0.0, 1.0 ],
    ];
}

impl BernsteinBasis<4> for Bernstein {
    const BINOMIAL: [f64; 4] = [1.0, 3.0, 3.0, 1.0];

    const SPLIT_LEFT: [[f64; 4]; 4] = [
        [1.0,   0.0,   0.0,   0.0  ],
        [0.5,   0.5,   0.0,   0.0  ],
        [0.25,  0.5,   0.25,  0.0  ],
        [0.125, 0.375, 0.375, 0.125],
    ];

    const SPLIT_RIGHT: [[f64; 4]; 4] = [
        [0.125, 0.375, 0.375, 0.125],
        [0.0,   0.25,  0.5,   0.25 ],
        [0.0,   0.0,   0.5,   0.5  ],
        [0.0,   0.0,   0.0,   1.0  ],
    ];
}

/// A Bezier curve swept by a varying width, with `P` control points.
///
/// The degree of the curve is `P - 1`; see the `BezierCurve1`,
/// `BezierCurve2` and `BezierCurve3` aliases. Every control point carries
/// its own width. Curves are immutable: transforming or splitting a curve
/// produces new curves with their own cached maximum width and bounding box.
///
/// # Examples
///
/// ```
/// # use curve_tracer::tuple::Vector3;
/// # use curve_tracer::curve::BezierCurve3;
/// let curve = BezierCurve3::new([
///     Vector3::new(0.0, 0.0, 5.0),
///     Vector3::new(1.0, 1.0, 5.0),
///     Vector3::new(2.0, -1.0, 5.0),
///     Vector3::new(3.0, 0.0, 5.0),
/// ], 0.2);
///
/// assert_eq!(curve.evaluate_point(0.5), Vector3::new(1.5, 0.0, 5.0));
/// assert_eq!(curve.max_width(), 0.2);
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BezierCurve<const P: usize> {
    ctrl_pts: [Vector3; P],
    widths: [f64; P],
    max_width: f64,
    bbox: Bounds,
}

pub type BezierCurve1 = BezierCurve<2>;
pub type BezierCurve2 = BezierCurve<3>;
pub type BezierCurve3 = BezierCurve<4>;

impl<const P: usize> BezierCurve<P> where Bernstein: BernsteinBasis<P> {
    pub const DEGREE: usize = P - 1;

    /// Creates a curve with the same width at every control point.
    pub fn new(ctrl_pts: [Vector3; P], width: f64) -> Self {
        Self::with_widths(ctrl_pts, [width; P])
    }

    /// Creates a curve with one width per control point.
    ///
    /// # Panics
    ///
    /// Panics if any width is negative (or NaN).
    pub fn with_widths(ctrl_pts: [Vector3; P], widths: [f64; P]) -> Self {
        for (i, w) in widths.iter().enumerate() {
            assert!(*w >= 0.0, "Width {} of control point {} must be non-negative.", w, i);
        }

        Self::assemble(ctrl_pts, widths)
    }

    /// Creates the image of this curve under `xfm`.
    ///
    /// Control points are projected with a homogeneous divide, widths are
    /// copied unchanged.
    ///
    /// # Panics
    ///
    /// Panics if a control point projects to a (nearly) zero `w`.
    pub fn transformed(&self, xfm: &Matrix4D) -> Self {
        let ctrl_pts = self.ctrl_pts.map(|p| xfm.transform_point(&p));
        Self::assemble(ctrl_pts, self.widths)
    }

    fn assemble(ctrl_pts: [Vector3; P], widths: [f64; P]) -> Self {
        let max_width = widths.iter().copied().fold(0.0, f64::max);

        let mut bbox = Bounds::empty();
        for p in ctrl_pts.iter() {
            bbox.insert(p);
        }

        bbox.grow(&Vector3::splat(max_width * 0.5));
        bbox.robust_grow(CURVE_BBOX_ROBUST_EPSILON);

        BezierCurve { ctrl_pts, widths, max_width, bbox }
    }

    pub fn degree(&self) -> usize {
        Self::DEGREE
    }

    pub fn control_point_count(&self) -> usize {
        P
    }

    pub fn control_point(&self, index: usize) -> &Vector3 {
        &self.ctrl_pts[index]
    }

    pub fn control_points(&self) -> &[Vector3; P] {
        &self.ctrl_pts
    }

    pub fn width(&self, index: usize) -> f64 {
        self.widths[index]
    }

    pub fn max_width(&self) -> f64 {
        self.max_width
    }

    pub fn bbox(&self) -> &Bounds {
        &self.bbox
    }

    fn bernstein_weights(t: f64) -> [f64; P] {
        let s = 1.0 - t;
        let binomial = <Bernstein as BernsteinBasis<P>>::BINOMIAL;

        std::array::from_fn(|i| {
            binomial[i] * s.powi((Self::DEGREE - i) as i32) * t.powi(i as i32)
        })
    }

    pub fn evaluate_point(&self, t: f64) -> Vector3 {
        blend_points(&Self::bernstein_weights(t), &self.ctrl_pts)
    }

    pub fn evaluate_width(&self, t: f64) -> f64 {
        blend_widths(&Self::bernstein_weights(t), &self.widths)
    }

    /// Splits the curve at `t = 0.5` into a left and a right half.
    ///
    /// The halves share the exact same midpoint (position and width), and
    /// together trace the same curve as the parent.
    pub fn split(&self) -> (Self, Self) {
        (
            self.split_half(&<Bernstein as BernsteinBasis<P>>::SPLIT_LEFT),
            self.split_half(&<Bernstein as BernsteinBasis<P>>::SPLIT_RIGHT),
        )
    }

    fn split_half(&self, rows: &[[f64; P]; P]) -> Self {
        let ctrl_pts = std::array::from_fn(|j| blend_points(&rows[j], &self.ctrl_pts));
        let widths = std::array::from_fn(|j| blend_widths(&rows[j], &self.widths));

        Self::assemble(ctrl_pts, widths)
    }

    /// Estimates how many times the curve must be halved before each piece
    /// is flat enough to be treated as a line segment.
    ///
    /// Only the X and Y components count: in a ray-local frame they are the
    /// ones the ray can see. The flattening error target is a fraction of the
    /// curve's maximum width, so thin, strongly bent curves recurse deepest.
    /// The result never exceeds `MAX_RECURSION_DEPTH`.
    pub fn recursion_depth(&self) -> usize {
        let n = Self::DEGREE;
        if n < 2 {
            return 0;
        }

        let l0 = self.ctrl_pts.windows(3)
            .map(|p| {
                let dx = (p[0].x - 2.0 * p[1].x + p[2].x).abs();
                let dy = (p[0].y - 2.0 * p[1].y + p[2].y).abs();
                dx.max(dy)
            })
            .fold(0.0, f64::max);

        let epsilon = self.max_width * FLATNESS_WIDTH_FRACTION;
        let value = (SQRT_2 * (n * (n - 1)) as f64 * l0) / (8.0 * epsilon);

        // log4(value); zero curvature on a zero-width curve gives NaN.
        let r0 = value.ln() / 4.0f64.ln();
        if r0.is_nan() {
            return 0;
        }

        r0.clamp(0.0, MAX_RECURSION_DEPTH as f64) as usize
    }
}

fn blend_points<const P: usize>(weights: &[f64; P], pts: &[Vector3; P]) -> Vector3 {
    weights.iter().zip(pts.iter())
        .fold(Vector3::default(), |acc, (w, p)| acc + *p * *w)
}

fn blend_widths<const P: usize>(weights: &[f64; P], widths: &[f64; P]) -> f64 {
    weights.iter().zip(widths.iter())
        .fold(0.0, |acc, (w, v)| acc + v * w)
}

#[cfg(test)]
fn random_curve<const P: usize>(rng: &mut rand::rngs::StdRng) -> BezierCurve<P>
    where Bernstein: BernsteinBasis<P> {
    use rand::Rng;

    let ctrl_pts = std::array::from_fn(|_| Vector3::new(
        rng.random_range(-10.0..10.0),
        rng.random_range(-10.0..10.0),
        rng.random_range(-10.0..10.0),
    ));
    let widths = std::array::from_fn(|_| rng.random_range(0.0..2.0));

    BezierCurve::with_widths(ctrl_pts, widths)
}

#[cfg(test)]
fn seeded_rng() -> rand::rngs::StdRng {
    use rand::SeedableRng;
    rand::rngs::StdRng::seed_from_u64(0x5eed_c0de)
}

#[cfg(test)]
fn check_endpoints<const P: usize>() where Bernstein: BernsteinBasis<P> {
    let mut rng = seeded_rng();
    for _ in 0..100 {
        let c: BezierCurve<P> = random_curve(&mut rng);

        assert_eq!(c.evaluate_point(0.0), *c.control_point(0));
        assert_eq!(c.evaluate_point(1.0), *c.control_point(P - 1));
        approx::assert_abs_diff_eq!(c.evaluate_width(0.0), c.width(0), epsilon = 1e-12);
        approx::assert_abs_diff_eq!(c.evaluate_width(1.0), c.width(P - 1), epsilon = 1e-12);
    }
}

#[cfg(test)]
fn check_split_continuity<const P: usize>() where Bernstein: BernsteinBasis<P> {
    let mut rng = seeded_rng();
    for _ in 0..100 {
        let c: BezierCurve<P> = random_curve(&mut rng);
        let (left, right) = c.split();

        assert_eq!(left.evaluate_point(1.0), right.evaluate_point(0.0));
        assert_eq!(left.evaluate_point(1.0), c.evaluate_point(0.5));
        approx::assert_abs_diff_eq!(left.evaluate_width(1.0), right.evaluate_width(0.0),
            epsilon = 1e-9);
        approx::assert_abs_diff_eq!(left.evaluate_width(1.0), c.evaluate_width(0.5),
            epsilon = 1e-9);

        // The halves retrace the parent.
        assert_eq!(left.evaluate_point(0.5), c.evaluate_point(0.25));
        assert_eq!(right.evaluate_point(0.5), c.evaluate_point(0.75));
    }
}

#[cfg(test)]
fn check_bbox_contains_inflated_points<const P: usize>() where Bernstein: BernsteinBasis<P> {
    let mut rng = seeded_rng();
    for _ in 0..100 {
        let c: BezierCurve<P> = random_curve(&mut rng);
        let h = c.max_width() * 0.5;

        for p in c.control_points() {
            for corner in [
                Vector3::new(p.x - h, p.y - h, p.z - h),
                Vector3::new(p.x + h, p.y + h, p.z + h),
            ] {
                assert!(c.bbox().contains(&corner), "{:?} not in {:?}", corner, c.bbox());
            }
        }
    }
}

#[test]
fn evaluate_hits_endpoints_for_every_degree() {
    check_endpoints::<2>();
    check_endpoints::<3>();
    check_endpoints::<4>();
}

#[test]
fn split_is_continuous_for_every_degree() {
    check_split_continuity::<2>();
    check_split_continuity::<3>();
    check_split_continuity::<4>();
}

#[test]
fn bbox_contains_control_points_inflated_by_half_width() {
    check_bbox_contains_inflated_points::<2>();
    check_bbox_contains_inflated_points::<3>();
    check_bbox_contains_inflated_points::<4>();
}

#[test]
fn linear_curves_never_recurse() {
    let mut rng = seeded_rng();
    for _ in 0..100 {
        let c: BezierCurve1 = random_curve(&mut rng);
        assert_eq!(c.recursion_depth(), 0);
    }
}

#[test]
fn cubic_recursion_depth() {
    let c = BezierCurve3::new([
        Vector3::new(0.0, 0.0, 5.0),
        Vector3::new(1.0, 1.0, 5.0),
        Vector3::new(2.0, -1.0, 5.0),
        Vector3::new(3.0, 0.0, 5.0),
    ], 0.2);

    // L0 = 3, epsilon = 0.01: log4(sqrt(2) * 6 * 3 / 0.08) = 4.16
    assert_eq!(c.recursion_depth(), 4);

    let thin = BezierCurve3::new(*c.control_points(), 0.0001);
    assert_eq!(thin.recursion_depth(), 5);
}

#[test]
fn straight_curve_of_any_degree_is_flat() {
    let c = BezierCurve2::new([
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 1.0, 7.0),
        Vector3::new(2.0, 2.0, -3.0),
    ], 0.0);

    assert_eq!(c.recursion_depth(), 0);
}

#[test]
fn transform_round_trip() {
    let mut rng = seeded_rng();
    let m = Matrix4D::translation(1.0, -2.0, 3.0)
        * Matrix4D::rotation_y(0.7)
        * Matrix4D::scaling(2.0, 0.5, 1.5);
    let inv = m.inverse().unwrap();

    for _ in 0..50 {
        let c: BezierCurve3 = random_curve(&mut rng);
        let back = c.transformed(&m).transformed(&inv);

        for i in 0..4 {
            assert_eq!(back.control_point(i), c.control_point(i));
            assert_eq!(back.width(i), c.width(i));
        }
    }
}

#[test]
fn transform_keeps_widths() {
    let c = BezierCurve1::with_widths(
        [Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0)],
        [0.1, 0.3],
    );
    let t = c.transformed(&Matrix4D::scaling(10.0, 10.0, 10.0));

    assert_eq!(*t.control_point(1), Vector3::new(10.0, 0.0, 0.0));
    assert_eq!(t.width(0), 0.1);
    assert_eq!(t.max_width(), 0.3);
}

#[test]
fn quadratic_split_matches_midpoint_cascade() {
    let c = BezierCurve2::with_widths([
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(2.0, 4.0, 0.0),
        Vector3::new(4.0, 0.0, 0.0),
    ], [0.0, 1.0, 0.5]);
    let (left, right) = c.split();

    assert_eq!(*left.control_point(1), Vector3::new(1.0, 2.0, 0.0));
    assert_eq!(*left.control_point(2), Vector3::new(2.0, 2.0, 0.0));
    assert_eq!(*right.control_point(1), Vector3::new(3.0, 2.0, 0.0));
    assert_eq!(left.width(2), 0.625);
    assert_eq!(right.width(1), 0.75);
}

#[test]
#[should_panic]
fn negative_width_is_rejected() {
    BezierCurve1::new([Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0)], -0.1);
}
