use crate::tuple::Vector3;
use crate::matrix::Matrix4D;

/// A ray with an origin point and a direction vector.
///
/// The direction is not required to be normalized; intersection distances
/// are reported in units of `direction`, so `position(t)` lands on the hit.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray3 {
    pub origin: Vector3,
    pub direction: Vector3,
}

impl Ray3 {
    pub fn new(origin: Vector3, direction: Vector3) -> Ray3 {
        Ray3 { origin, direction }
    }

    pub fn position(&self, t: f64) -> Vector3 {
        self.origin + (t * self.direction)
    }

    pub fn transform(&self, m: &Matrix4D) -> Ray3 {
        Ray3 {
            origin: m.transform_point(&self.origin),
            direction: m.transform_vector(&self.direction),
        }
    }
}

#[test]
fn ray_position() {
    let r = Ray3::new(
                Vector3::new(2.0, 3.0, 4.0),
                Vector3::new(1.0, 0.0, 0.0)
            );

    assert_eq!(r.position(0.0), Vector3::new(2.0, 3.0, 4.0));
    assert_eq!(r.position(1.0), Vector3::new(3.0, 3.0, 4.0));
    assert_eq!(r.position(-1.0), Vector3::new(1.0, 3.0, 4.0));
    assert_eq!(r.position(2.5), Vector3::new(4.5, 3.0, 4.0));
}

#[test]
fn ray_translation() {
    let r = Ray3::new(
                Vector3::new(1.0, 2.0, 3.0),
                Vector3::new(0.0, 1.0, 0.0)
            );
    let t = r.transform(&Matrix4D::translation(3.0, 4.0, 5.0));

    assert_eq!(t.origin, Vector3::new(4.0, 6.0, 8.0));
    assert_eq!(t.direction, Vector3::new(0.0, 1.0, 0.0));
}

#[test]
fn ray_scaling() {
    let r = Ray3::new(
                Vector3::new(1.0, 2.0, 3.0),
                Vector3::new(0.0, 1.0, 0.0)
            );
    let t = r.transform(&Matrix4D::scaling(2.0, 3.0, 4.0));

    assert_eq!(t.origin, Vector3::new(2.0, 6.0, 12.0));
    assert_eq!(t.direction, Vector3::new(0.0, 3.0, 0.0));
}
