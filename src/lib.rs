pub mod consts;

pub mod tuple;
pub mod matrix;
pub mod ray;
pub mod bounds;

pub mod curve;
pub mod intersect;
pub mod shape;

pub mod scene;
pub mod parallel;
pub mod logging;

use consts::FEQ_EPSILON;

pub fn feq(left: f64, right: f64) -> bool {
    (left - right).abs() < FEQ_EPSILON
}
