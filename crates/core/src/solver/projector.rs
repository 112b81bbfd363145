//! Variable-coefficient projection operator interface.
//!
//! The elliptic engine that actually solves the projection system is an
//! external collaborator; this module defines the contract the
//! orchestrator drives it through. All calls are synchronous and mutate
//! the supplied buffers in place. The solve's postcondition — the
//! registered face velocities are discretely divergence-free to the
//! requested tolerance — is owned by the implementation, never
//! re-verified here.

use crate::grid::{CellField, FaceSet, LinOpBc};

/// Lifecycle of a projector with respect to the current mesh
/// configuration.
///
/// Initialization is driven by an explicit configuration hash rather than
/// an ambient boolean: the orchestrator re-initializes only when the hash
/// changes and otherwise refreshes the coefficient alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectorState {
    /// Never initialized for any mesh configuration.
    Uninitialized,
    /// Initialized for the mesh/coefficient configuration with this hash.
    Initialized {
        /// Hash of the mesh/coefficient configuration at init time.
        config_hash: u64,
    },
}

/// Diffusion coefficient of the projection operator (inverse density on
/// faces).
///
/// The `Constant` variant is the cheap degenerate form used when density
/// is spatially uniform; `Field` carries the full per-face values, one
/// [`FaceSet`] per level.
#[derive(Debug, Clone, Copy)]
pub enum Beta<'a> {
    /// Spatially constant coefficient.
    Constant(f64),
    /// Per-face coefficient, per level.
    Field(&'a [FaceSet]),
}

/// Multigrid configuration forwarded to the projector at initialization.
#[derive(Debug, Clone, Copy)]
pub struct MgInfo {
    /// Maximum number of coarsening levels the solver may build.
    pub max_coarsening_level: i32,
}

/// Where face fluxes of the potential are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluxLocation {
    /// Nominal face centers (no cut cells).
    FaceCenter,
    /// True wetted face centroids (cut cells present).
    FaceCentroid,
}

/// Contract of the external MAC projection solver.
///
/// The face-velocity registration of the underlying engine is the `umac`
/// argument of the two `project` calls; the buffers are corrected in
/// place to a divergence-free state.
pub trait MacProjector {
    /// Current lifecycle state.
    fn state(&self) -> ProjectorState;

    /// Whether the projector must be (re)built for `config_hash`.
    fn needs_initialization(&self, config_hash: u64) -> bool {
        self.state() != ProjectorState::Initialized { config_hash }
    }

    /// Build the operator for a new mesh configuration.
    fn init_projector(&mut self, info: MgInfo, beta: Beta<'_>, config_hash: u64);

    /// Supply the domain boundary types, per direction, low and high side.
    fn set_domain_bc(&mut self, lo: [LinOpBc; 3], hi: [LinOpBc; 3]);

    /// Refresh the coefficient without rebuilding the operator.
    fn update_beta(&mut self, beta: Beta<'_>);

    /// Project the face velocities to a divergence-free state.
    fn project(&mut self, umac: &mut [FaceSet], rtol: f64, atol: f64);

    /// Project using `phi` as the initial guess for the potential and
    /// write the solved potential back into it.
    fn project_with_potential(
        &mut self,
        umac: &mut [FaceSet],
        phi: &mut [CellField],
        rtol: f64,
        atol: f64,
    );

    /// Extract the face fluxes `-beta * grad(phi)` of a potential into
    /// `fluxes`, evaluated at the given face location.
    fn get_fluxes(&self, fluxes: &mut [FaceSet], phi: &[CellField], location: FluxLocation);
}
