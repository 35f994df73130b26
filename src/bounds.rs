use crate::tuple::Vector3;
use crate::ray::Ray3;

/// An axis-aligned bounding box.
///
/// A freshly invalidated box has `minimum = +inf` and `maximum = -inf`, so the
/// first `insert` snaps it onto the inserted point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub minimum: Vector3,
    pub maximum: Vector3,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, min_z: f64,
        max_x: f64, max_y: f64, max_z: f64) -> Bounds {
        Bounds {
            minimum: Vector3::new(min_x, min_y, min_z),
            maximum: Vector3::new(max_x, max_y, max_z),
        }
    }

    /// An invalid (empty) box, ready for `insert`.
    pub fn empty() -> Bounds {
        Bounds {
            minimum: Vector3::splat(f64::INFINITY),
            maximum: Vector3::splat(f64::NEG_INFINITY),
        }
    }

    /// Resets the box to the empty state.
    pub fn invalidate(&mut self) {
        *self = Bounds::empty();
    }

    pub fn is_valid(&self) -> bool {
        (0..3).all(|axis| self.minimum[axis] <= self.maximum[axis])
    }

    /// Grows the box to enclose `p`.
    pub fn insert(&mut self, p: &Vector3) {
        self.minimum = self.minimum.min(p);
        self.maximum = self.maximum.max(p);
    }

    /// Symmetrically grows the box by `v` along each axis.
    pub fn grow(&mut self, v: &Vector3) {
        self.minimum = self.minimum - *v;
        self.maximum = self.maximum + *v;
    }

    /// Inflates the box by a margin proportional to its size and position.
    ///
    /// Along each axis the margin is `eps` times the largest of the box
    /// center's magnitude, the box extent and `1.0`. Far-off or large boxes
    /// lose more absolute precision, so they get a larger margin.
    pub fn robust_grow(&mut self, eps: f64) {
        debug_assert!(self.is_valid(), "robust_grow on an invalid box");

        let center = (self.minimum + self.maximum) * 0.5;
        let extent = self.maximum - self.minimum;

        let delta = |axis: usize| center[axis].abs().max(extent[axis]).max(1.0) * eps;
        let margin = Vector3::new(delta(0), delta(1), delta(2));

        self.grow(&margin);
    }

    pub fn contains(&self, p: &Vector3) -> bool {
        (0..3).all(|axis| self.minimum[axis] <= p[axis] && p[axis] <= self.maximum[axis])
    }

    /// Finds the entry and exit `t` of a ray against one slab of the box.
    pub fn check_axis(min: f64, max: f64, origin: f64, direction: f64) -> (f64, f64) {
        let tmin_numerator = min - origin;
        let tmax_numerator = max - origin;

        // Parallel to the slab: either always inside it or never. A miss is
        // the empty interval, so it must not go through the swap below.
        if direction == 0.0 {
            return if tmin_numerator <= 0.0 && tmax_numerator >= 0.0 {
                (f64::NEG_INFINITY, f64::INFINITY)
            } else {
                (f64::INFINITY, f64::NEG_INFINITY)
            };
        }

        let tmin = tmin_numerator / direction;
        let tmax = tmax_numerator / direction;

        if tmin > tmax { (tmax, tmin) } else { (tmin, tmax) }
    }

    /// Checks whether a ray passes through the box somewhere in `[0, t_max]`.
    pub fn intersects_ray(&self, ray: &Ray3, t_max: f64) -> bool {
        if !self.is_valid() {
            return false;
        }

        let mut tmin: f64 = 0.0;
        let mut tmax = t_max;

        for axis in 0..3 {
            let (t0, t1) = Bounds::check_axis(
                self.minimum[axis], self.maximum[axis],
                ray.origin[axis], ray.direction[axis]
            );

            tmin = tmin.max(t0);
            tmax = tmax.min(t1);

            if tmin > tmax {
                return false;
            }
        }

        true
    }
}

#[test]
fn insert_snaps_empty_box() {
    let mut b = Bounds::empty();
    assert!(!b.is_valid());

    b.insert(&Vector3::new(1.0, 2.0, 3.0));
    b.insert(&Vector3::new(-1.0, 4.0, 0.0));

    assert_eq!(b, Bounds::new(-1.0, 2.0, 0.0, 1.0, 4.0, 3.0));
}

#[test]
fn grow_and_invalidate() {
    let mut b = Bounds::new(0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
    b.grow(&Vector3::splat(0.5));
    assert_eq!(b, Bounds::new(-0.5, -0.5, -0.5, 1.5, 1.5, 1.5));

    b.invalidate();
    assert!(!b.is_valid());
}

#[test]
fn robust_grow_scales_with_position() {
    let mut near = Bounds::new(0.0, 0.0, 0.0, 0.5, 0.5, 0.5);
    near.robust_grow(1.0e-4);
    assert!((near.minimum.x + 1.0e-4).abs() < 1.0e-12);

    let mut far = Bounds::new(1000.0, 0.0, 0.0, 1001.0, 0.5, 0.5);
    far.robust_grow(1.0e-4);
    assert!((far.maximum.x - (1001.0 + 1000.5e-4)).abs() < 1.0e-9);
}

#[test]
fn ray_hits_and_misses_box() {
    let b = Bounds::new(-1.0, -1.0, 4.0, 1.0, 1.0, 6.0);
    let hit = Ray3::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0));
    let miss = Ray3::new(Vector3::new(3.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0));

    assert!(b.intersects_ray(&hit, f64::INFINITY));
    assert!(!b.intersects_ray(&hit, 3.0));
    assert!(!b.intersects_ray(&miss, f64::INFINITY));
}

#[test]
fn axis_parallel_ray_beside_box_misses() {
    let b = Bounds::new(-1.0, -1.0, 4.0, 1.0, 1.0, 6.0);

    assert_eq!(Bounds::check_axis(-1.0, 1.0, 3.0, 0.0), (f64::INFINITY, f64::NEG_INFINITY));
    assert_eq!(Bounds::check_axis(-1.0, 1.0, 0.5, 0.0), (f64::NEG_INFINITY, f64::INFINITY));

    for origin in [
        Vector3::new(3.0, 0.0, 0.0),
        Vector3::new(-3.0, 0.0, 0.0),
        Vector3::new(0.0, 1.5, 0.0),
        Vector3::new(0.0, -1.5, 0.0),
    ] {
        let ray = Ray3::new(origin, Vector3::new(0.0, 0.0, 1.0));
        assert!(!b.intersects_ray(&ray, f64::INFINITY), "{:?} should miss", origin);
    }

    let sideways = Ray3::new(Vector3::new(-5.0, 0.0, 10.0), Vector3::new(1.0, 0.0, 0.0));
    assert!(!b.intersects_ray(&sideways, f64::INFINITY));

    let through = Ray3::new(Vector3::new(-5.0, 0.0, 5.0), Vector3::new(1.0, 0.0, 0.0));
    assert!(b.intersects_ray(&through, f64::INFINITY));
}
