//! Face-velocity prediction and MAC projection orchestration.
//!
//! Two components consumed in sequence every time step, for every level:
//! [`FaceVelocityPredictor`] turns cell-centered velocity into provisional
//! face-centered normal velocities, and [`MacProjection`] assembles
//! forcing and the inverse-density coefficient, drives the external
//! projection operator and corrects the predicted faces to a discretely
//! divergence-free state.

pub mod mac_projection;
pub mod predictor;
pub mod projector;
pub mod slopes;

pub use mac_projection::{
    build_inv_rho, AdvectionScheme, GhostFiller, GodunovExtrapolator, MacProjection,
    MacProjectionConfig, StepContext,
};
pub use predictor::{upwind_face_value, FaceVelocityPredictor, SMALL_VEL};
pub use projector::{Beta, FluxLocation, MacProjector, MgInfo, ProjectorState};
pub use slopes::{ExtdirFlags, SlopeProvider};
