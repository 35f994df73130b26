// Runtime parameters
pub const NUM_THREADS: usize = 3;

// Floating point comparisons
pub const FEQ_EPSILON: f64 = 0.0001;

// Outward inflation applied to every curve bounding box
pub const CURVE_BBOX_ROBUST_EPSILON: f64 = 1.0e-4;

// Hits at or behind this local depth are ignored
pub const RAY_NEAR_EPSILON: f64 = 1.0e-6;

// Below this, a ray direction is treated as parallel to the Y axis
pub const DEGENERATE_DIRECTION_EPSILON: f64 = 1.0e-6;

// Below this squared length, a leaf chord is seen end-on
pub const DEGENERATE_CHORD_EPSILON: f64 = 1.0e-6;

// Smallest homogeneous divisor accepted when projecting points
pub const HOMOGENEOUS_W_EPSILON: f64 = 1.0e-12;

// Subdivision limits
pub const MAX_RECURSION_DEPTH: usize = 5;
pub const FLATNESS_WIDTH_FRACTION: f64 = 0.05;
