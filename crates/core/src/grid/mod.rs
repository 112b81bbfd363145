//! Grid data model: fields, domain box, boundary records, cut-cell
//! geometry.

pub mod boundary;
pub mod domain;
pub mod fields;
pub mod geometry;

pub use boundary::{BcRec, BcType, BoundaryConditions, LinOpBc, Side, StaticBoundaryConditions};
pub use domain::Domain;
pub use fields::{CellField, FaceField, FaceSet};
pub use geometry::{ConnectivityFlags, EbGeometry, LevelGeometry};
