//! Limited-gradient (slope) provider interface.
//!
//! The cut-cell predictor extrapolates cell values to face centroids using
//! a monotonicity-limited gradient evaluated at each neighbor cell. Those
//! gradients come from an external geometric-slope utility: computing them
//! needs the full cut-cell least-squares/limiting machinery, which lives
//! with the geometry collaborator, not here. This module only defines the
//! contract the predictor consumes.

use crate::core_types::{Direction, Vec3};
use crate::grid::{BcRec, BcType, CellField, Domain, EbGeometry};

/// Per-axis external-value boundary flags for one field component.
///
/// The boundary-aware slope variant substitutes the prescribed boundary
/// value for the missing neighbor in its one-sided differences; these
/// flags tell it on which sides that applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtdirFlags {
    /// Low-side external-value flag per direction.
    pub lo: [bool; 3],
    /// High-side external-value flag per direction.
    pub hi: [bool; 3],
}

impl ExtdirFlags {
    /// Extract the flags of one component's boundary record.
    #[must_use]
    pub fn from_bcrec(rec: &BcRec) -> Self {
        let mut lo = [false; 3];
        let mut hi = [false; 3];
        for dir in Direction::ALL {
            lo[dir.index()] = rec.lo(dir) == BcType::ExtDir;
            hi[dir.index()] = rec.hi(dir) == BcType::ExtDir;
        }
        Self { lo, hi }
    }

    /// Whether any side of any direction is external-value.
    #[must_use]
    pub fn any(&self) -> bool {
        self.lo.iter().chain(self.hi.iter()).any(|&b| b)
    }
}

/// Pure limited-gradient evaluation at a cell, cut-cell aware.
///
/// Both methods return the 3-component limited gradient of component
/// `comp` of `vcc` at the given cell, in cell-width-normalized units (the
/// same units as the centroid offsets in [`EbGeometry`]). Implementations
/// must honor the connectivity flags: differences never reach across a
/// disconnected neighbor.
///
/// Providers are shared across Rayon worker threads by the predictor,
/// hence the `Send + Sync` bound.
pub trait SlopeProvider: Send + Sync {
    /// Limited gradient away from any external-value boundary.
    fn slopes(
        &self,
        cell: [i32; 3],
        comp: usize,
        vcc: &CellField,
        geom: &EbGeometry,
    ) -> Vec3;

    /// Limited gradient near an external-value boundary: the one-sided
    /// difference on a flagged side substitutes the prescribed (ghost
    /// cell) value for the missing interior neighbor.
    #[allow(clippy::too_many_arguments)]
    fn slopes_extdir(
        &self,
        cell: [i32; 3],
        comp: usize,
        vcc: &CellField,
        geom: &EbGeometry,
        extdir: &ExtdirFlags,
        domain: &Domain,
    ) -> Vec3;
}
