//! Spatial direction enumeration for face-centered data.

use serde::{Deserialize, Serialize};

/// One of the three coordinate axes.
///
/// Face-centered fields, boundary records and predictor kernels are all
/// parameterized by a `Direction`; the kernels are structurally identical
/// across directions with the component index and sign conventions rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// X axis (component 0)
    X,
    /// Y axis (component 1)
    Y,
    /// Z axis (component 2)
    Z,
}

impl Direction {
    /// All three directions, in component order.
    pub const ALL: [Direction; 3] = [Direction::X, Direction::Y, Direction::Z];

    /// Component index of this direction (0, 1 or 2).
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Direction::X => 0,
            Direction::Y => 1,
            Direction::Z => 2,
        }
    }

    /// Unit cell offset along this direction.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> [i32; 3] {
        match self {
            Direction::X => [1, 0, 0],
            Direction::Y => [0, 1, 0],
            Direction::Z => [0, 0, 1],
        }
    }

    /// The two transverse directions, in ascending component order.
    ///
    /// Face-centroid offsets are stored in this order: the first stored
    /// component belongs to the lower-numbered transverse axis.
    #[inline]
    #[must_use]
    pub const fn transverse(self) -> [Direction; 2] {
        match self {
            Direction::X => [Direction::Y, Direction::Z],
            Direction::Y => [Direction::X, Direction::Z],
            Direction::Z => [Direction::X, Direction::Y],
        }
    }
}
