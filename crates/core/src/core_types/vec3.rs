//! Vector type alias for slopes and centroid displacements.

use nalgebra::Vector3;

/// 3-component vector type for limited gradients and centroid displacement
/// vectors.
///
/// This is a simple alias for `nalgebra::Vector3<f64>`, used throughout
/// the solver for slope vectors and face/cell centroid offsets.
pub type Vec3 = Vector3<f64>;
