//! Domain boundary condition records.
//!
//! One record per velocity component carries the boundary type on the low
//! and high side of every direction. The predictor reads these to decide
//! where external-value ("Dirichlet") handling applies; the projection
//! operator receives its own, coarser classification through
//! [`LinOpBc`].

use serde::{Deserialize, Serialize};

use crate::core_types::Direction;

/// Mathematical boundary type of one field component on one domain side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BcType {
    /// Interior/periodic: ghost values come from the opposite side.
    IntDir,
    /// External value prescribed directly on the boundary face; the ghost
    /// cell adjacent to the face carries that value.
    ExtDir,
    /// First-order extrapolation from the interior.
    FoExtrap,
    /// Higher-order extrapolation from the interior.
    HoExtrap,
    /// Even reflection across the boundary.
    ReflectEven,
    /// Odd reflection across the boundary.
    ReflectOdd,
}

/// Boundary types of one field component, per direction and side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BcRec {
    lo: [BcType; 3],
    hi: [BcType; 3],
}

impl BcRec {
    /// Record with the given low-side and high-side types per direction.
    #[must_use]
    pub fn new(lo: [BcType; 3], hi: [BcType; 3]) -> Self {
        Self { lo, hi }
    }

    /// Record with the same type on every side.
    #[must_use]
    pub fn uniform(bc: BcType) -> Self {
        Self {
            lo: [bc; 3],
            hi: [bc; 3],
        }
    }

    /// Boundary type on the low side of a direction.
    #[inline]
    #[must_use]
    pub fn lo(&self, dir: Direction) -> BcType {
        self.lo[dir.index()]
    }

    /// Boundary type on the high side of a direction.
    #[inline]
    #[must_use]
    pub fn hi(&self, dir: Direction) -> BcType {
        self.hi[dir.index()]
    }

    /// Replace the type on the low side of one direction.
    pub fn set_lo(&mut self, dir: Direction, bc: BcType) {
        self.lo[dir.index()] = bc;
    }

    /// Replace the type on the high side of one direction.
    pub fn set_hi(&mut self, dir: Direction, bc: BcType) {
        self.hi[dir.index()] = bc;
    }
}

/// Domain side selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Low end of a direction.
    Low,
    /// High end of a direction.
    High,
}

/// Boundary classification consumed by the linear operator of the
/// projection solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinOpBc {
    /// Potential value prescribed on the boundary (outflow-like).
    Dirichlet,
    /// Zero normal gradient of the potential (wall/inflow-like).
    Neumann,
    /// Periodic wrap.
    Periodic,
}

/// Provider of boundary-condition records for the fields this core reads.
///
/// The host application owns the records; the predictor and orchestrator
/// only read them. Host- and device-resident copies (where a device build
/// exists) must agree; this crate sees a single authoritative copy.
pub trait BoundaryConditions {
    /// Records for the three velocity components, in component order.
    fn velocity_bcrec(&self) -> &[BcRec; 3];

    /// Record for the density field.
    fn density_bcrec(&self) -> &BcRec;

    /// Projection-operator boundary types for one domain side, per
    /// direction.
    fn projection_bc(&self, side: Side) -> [LinOpBc; 3];
}

/// Plain-struct [`BoundaryConditions`] implementation for hosts that keep
/// a single static set of records.
#[derive(Debug, Clone)]
pub struct StaticBoundaryConditions {
    /// Velocity component records.
    pub velocity: [BcRec; 3],
    /// Density record.
    pub density: BcRec,
    /// Projection types on the low sides.
    pub projection_lo: [LinOpBc; 3],
    /// Projection types on the high sides.
    pub projection_hi: [LinOpBc; 3],
}

impl BoundaryConditions for StaticBoundaryConditions {
    fn velocity_bcrec(&self) -> &[BcRec; 3] {
        &self.velocity
    }

    fn density_bcrec(&self) -> &BcRec {
        &self.density
    }

    fn projection_bc(&self, side: Side) -> [LinOpBc; 3] {
        match side {
            Side::Low => self.projection_lo,
            Side::High => self.projection_hi,
        }
    }
}
