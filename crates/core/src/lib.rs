//! Incompressible Flow Simulation Core Library
//!
//! Computes discretely divergence-free, face-centered advection velocities
//! for incompressible-flow time steps on block-structured grids with
//! embedded (cut-cell) solid boundaries. Combines a monotonicity-preserving
//! upwind reconstruction of cell-centered velocity onto faces with a
//! variable-coefficient MAC projection driven through an external elliptic
//! solver.
//!
//! The mesh hierarchy, the multigrid engine, the cut-cell geometric moment
//! computation and the Godunov-type extrapolator are external collaborators
//! consumed through trait contracts.

// Core types and utilities
pub mod core_types;

// Grid data model: fields, boundary records, cut-cell geometry
pub mod grid;

// Prediction kernels and projection orchestration
pub mod solver;

// Re-export core types
pub use core_types::{Direction, Vec3};

// Re-export the grid data model
pub use grid::{
    BcRec, BcType, BoundaryConditions, CellField, ConnectivityFlags, Domain, EbGeometry,
    FaceField, FaceSet, LevelGeometry, LinOpBc, Side, StaticBoundaryConditions,
};

// Re-export the solver surface
pub use solver::{
    AdvectionScheme, Beta, ExtdirFlags, FaceVelocityPredictor, FluxLocation, GhostFiller,
    GodunovExtrapolator, MacProjection, MacProjectionConfig, MacProjector, MgInfo,
    ProjectorState, SlopeProvider, StepContext,
};
