//! MAC projection orchestration.
//!
//! Drives one projection pass per time step: assemble the velocity
//! forcing, build the face-centered inverse-density coefficient,
//! initialize or refresh the external projection operator, predict
//! provisional face velocities on every level, and invoke the projector's
//! solve to correct them to a divergence-free state.
//!
//! The phase order forcing → density → projector-init → predict → project
//! is load-bearing: predicting before the coefficient is in place would
//! hand the solve a stale or default operator.

use std::hash::Hasher;

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core_types::Direction;
use crate::grid::{
    BcRec, BcType, BoundaryConditions, CellField, Domain, EbGeometry, FaceField, FaceSet,
    LevelGeometry, Side,
};
use crate::solver::predictor::FaceVelocityPredictor;
use crate::solver::projector::{Beta, FluxLocation, MacProjector, MgInfo};
use crate::solver::slopes::SlopeProvider;

/// Selectable face-velocity reconstruction scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvectionScheme {
    /// Godunov-type extrapolation with forcing terms (external
    /// collaborator).
    Godunov,
    /// Method-of-lines monotonized-central prediction (in-crate).
    Mol,
}

impl AdvectionScheme {
    /// Parse a scheme name from the application configuration.
    ///
    /// # Panics
    ///
    /// Panics on an unrecognized name. An unknown scheme is a
    /// programming/configuration defect, not a runtime condition; the run
    /// must not continue.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "Godunov" => AdvectionScheme::Godunov,
            "MOL" => AdvectionScheme::Mol,
            _ => panic!("Unknown advection scheme: {name}"),
        }
    }

    /// Canonical configuration name of the scheme.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            AdvectionScheme::Godunov => "Godunov",
            AdvectionScheme::Mol => "MOL",
        }
    }
}

/// Configuration scalars of the projection pass.
///
/// These are opaque inputs owned by the surrounding application; the
/// orchestrator only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacProjectionConfig {
    /// Face-velocity reconstruction scheme.
    pub scheme: AdvectionScheme,
    /// Whether density is spatially uniform (enables the scalar-
    /// coefficient fast path).
    pub constant_density: bool,
    /// Reference density used on the constant-density fast path.
    pub reference_density: f64,
    /// Relative residual tolerance of the projection solve.
    pub mg_rtol: f64,
    /// Absolute residual tolerance of the projection solve.
    pub mg_atol: f64,
    /// Maximum multigrid coarsening level handed to the projector.
    pub mg_max_coarsening_level: i32,
    /// Verbosity of the orchestration log output.
    pub verbose: i32,
    /// Seed the Godunov prediction with the previous step's projection
    /// potential.
    pub use_mac_phi_in_godunov: bool,
    /// Fold the stored diffusive term into the forcing (non-MOL schemes).
    pub include_diffusion_in_forcing: bool,
}

impl Default for MacProjectionConfig {
    fn default() -> Self {
        Self {
            scheme: AdvectionScheme::Godunov,
            constant_density: false,
            reference_density: 1.0,
            mg_rtol: 1.0e-11,
            mg_atol: 1.0e-14,
            mg_max_coarsening_level: 100,
            verbose: 0,
            use_mac_phi_in_godunov: false,
            include_diffusion_in_forcing: true,
        }
    }
}

/// Ghost-region refresh contract of the mesh hierarchy.
///
/// The hierarchy owns the box decomposition, parallel distribution and
/// coarse-fine interpolation; this core only asks it to refresh halos in
/// place.
pub trait GhostFiller {
    /// Ghost width the forcing field needs; 0 means no fill is required.
    fn nghost_force(&self) -> usize;

    /// Refresh `nghost` ghost layers of the forcing fields at `time`.
    fn fillpatch_force(&self, time: f64, forces: &mut [CellField], nghost: usize);

    /// Refresh the ghost region of a single cell-centered field
    /// (periodic/level boundary exchange).
    fn fill_boundary(&self, field: &mut CellField);
}

/// Contract of the external Godunov-type face extrapolator, the
/// selectable higher-order alternative to the in-crate predictor.
pub trait GodunovExtrapolator {
    /// Extrapolate cell velocities to faces with forcing and an optional
    /// potential-flux seed, writing into `umac`.
    fn extrap_vel_to_faces(
        &self,
        vel: &CellField,
        forces: &CellField,
        phi_fluxes: &FaceSet,
        umac: &mut FaceSet,
        bcrec: &[BcRec; 3],
        dt: f64,
    );
}

/// External collaborators of one projection pass.
pub struct StepContext<'a> {
    /// Per-level geometry, regular or embedded-boundary.
    pub geometry: &'a [LevelGeometry],
    /// Boundary-condition provider.
    pub bc: &'a dyn BoundaryConditions,
    /// Mesh-hierarchy ghost filler.
    pub filler: &'a dyn GhostFiller,
    /// Cut-cell limited-gradient provider.
    pub slopes: &'a dyn SlopeProvider,
    /// Godunov extrapolator; required when the scheme is Godunov.
    pub godunov: Option<&'a dyn GodunovExtrapolator>,
}

/// Orchestrates the per-step MAC projection across all levels.
///
/// Stateless across steps except for the persisted projection potential
/// (`mac_phi`) and the optional stored diffusive forcing term; the
/// projector owns its own lifecycle state.
pub struct MacProjection {
    config: MacProjectionConfig,
    mac_phi: Vec<CellField>,
    divtau_old: Vec<CellField>,
}

impl MacProjection {
    /// Create an orchestrator with the given configuration.
    #[must_use]
    pub fn new(config: MacProjectionConfig) -> Self {
        Self {
            config,
            mac_phi: Vec::new(),
            divtau_old: Vec::new(),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &MacProjectionConfig {
        &self.config
    }

    /// The persisted projection potential, one field per level (empty
    /// before the first run).
    #[must_use]
    pub fn mac_phi(&self) -> &[CellField] {
        &self.mac_phi
    }

    /// Store the diffusive term to fold into the forcing on subsequent
    /// runs (one field per level).
    pub fn set_diffusive_term(&mut self, divtau: Vec<CellField>) {
        self.divtau_old = divtau;
    }

    /// Compute divergence-free face velocities for one time step.
    ///
    /// Mutates `umac` in place: on return the face velocities satisfy the
    /// projector's divergence-free postcondition at the configured
    /// tolerances. `vel_forces` is refreshed in place as part of forcing
    /// assembly.
    ///
    /// # Arguments
    ///
    /// * `vel` - Cell-centered velocity per level (3 components, 2 ghosts)
    /// * `density` - Cell-centered density per level (1 component, ghosts)
    /// * `umac` - Face-velocity buffers per level, corrected in place
    /// * `vel_forces` - Velocity forcing per level, refreshed in place
    /// * `ctx` - External collaborators
    /// * `projector` - The projection operator
    /// * `time` - Current simulation time (forcing ghost fill)
    /// * `dt` - Time step (potential seed rescaling)
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &mut self,
        vel: &[CellField],
        density: &[CellField],
        umac: &mut [FaceSet],
        vel_forces: &mut [CellField],
        ctx: &StepContext<'_>,
        projector: &mut dyn MacProjector,
        time: f64,
        dt: f64,
    ) {
        let nlev = vel.len();
        assert!(
            density.len() == nlev
                && umac.len() == nlev
                && vel_forces.len() == nlev
                && ctx.geometry.len() == nlev,
            "Per-level input lengths disagree"
        );

        if self.config.verbose >= 1 {
            info!(
                levels = nlev,
                scheme = self.config.scheme.name(),
                "Computing MAC-projected velocities"
            );
        }

        // Forcing terms used in predicting to faces (not needed by the
        // method-of-lines scheme).
        if self.config.scheme != AdvectionScheme::Mol {
            if self.config.include_diffusion_in_forcing && !self.divtau_old.is_empty() {
                for lev in 0..nlev {
                    vel_forces[lev].add_interior(&self.divtau_old[lev]);
                }
            }
            let ng = ctx.filler.nghost_force();
            if ng > 0 {
                ctx.filler.fillpatch_force(time, vel_forces, ng);
            }
        }

        // (1/rho) on faces, shaped like the face-velocity buffers.
        let inv_rho: Vec<FaceSet> = (0..nlev)
            .map(|lev| {
                build_inv_rho(
                    &density[lev],
                    &ctx.geometry[lev],
                    ctx.bc.density_bcrec(),
                    &Domain::cells(density[lev].dims()),
                )
            })
            .collect();

        let any_eb = ctx.geometry.iter().any(LevelGeometry::has_cut_cells);
        let use_scalar_beta = self.config.constant_density && !any_eb;
        let scalar_beta = 1.0 / self.config.reference_density;

        // Initialize (or refresh the coefficient of) the projector.
        let hash = self.config_hash(vel, ctx.geometry);
        if projector.needs_initialization(hash) {
            let info = MgInfo {
                max_coarsening_level: self.config.mg_max_coarsening_level,
            };
            if use_scalar_beta {
                projector.init_projector(info, Beta::Constant(scalar_beta), hash);
            } else {
                projector.init_projector(info, Beta::Field(&inv_rho), hash);
            }
            projector.set_domain_bc(
                ctx.bc.projection_bc(Side::Low),
                ctx.bc.projection_bc(Side::High),
            );
        } else if use_scalar_beta {
            projector.update_beta(Beta::Constant(scalar_beta));
        } else {
            projector.update_beta(Beta::Field(&inv_rho));
        }

        self.ensure_mac_phi(vel);

        // Face fluxes of the stored potential seed the Godunov
        // prediction; without seeding the buffer stays zero.
        let mut phi_fluxes: Vec<FaceSet> = vel.iter().map(|v| FaceSet::new(v.dims())).collect();
        if self.config.use_mac_phi_in_godunov {
            let location = if any_eb {
                FluxLocation::FaceCentroid
            } else {
                FluxLocation::FaceCenter
            };
            projector.get_fluxes(&mut phi_fluxes, &self.mac_phi, location);
        } else {
            for fluxes in &mut phi_fluxes {
                fluxes.fill(0.0);
            }
        }

        // Predict provisional normal velocities on faces, per level.
        for lev in 0..nlev {
            ctx.filler.fill_boundary(&mut self.mac_phi[lev]);
            match self.config.scheme {
                AdvectionScheme::Godunov => {
                    let extrap = ctx
                        .godunov
                        .expect("Godunov scheme requires an extrapolator collaborator");
                    extrap.extrap_vel_to_faces(
                        &vel[lev],
                        &vel_forces[lev],
                        &phi_fluxes[lev],
                        &mut umac[lev],
                        ctx.bc.velocity_bcrec(),
                        dt,
                    );
                }
                AdvectionScheme::Mol => {
                    debug!(
                        level = lev,
                        eb = ctx.geometry[lev].has_cut_cells(),
                        "Predicting face velocities"
                    );
                    let predictor = FaceVelocityPredictor::new(
                        &vel[lev],
                        &ctx.geometry[lev],
                        Domain::cells(vel[lev].dims()),
                        ctx.bc.velocity_bcrec(),
                        ctx.slopes,
                    );
                    for dir in Direction::ALL {
                        predictor.predict(dir, umac[lev].get_mut(dir));
                    }
                }
            }
        }

        // Perform the MAC projection.
        if self.config.verbose > 2 {
            info!("MAC Projection:");
        }
        if self.config.use_mac_phi_in_godunov {
            // The stored potential serves as both a forcing seed and the
            // solve unknown; convert units going in and back out.
            for phi in &mut self.mac_phi {
                phi.scale(dt / 2.0);
            }
            projector.project_with_potential(
                umac,
                &mut self.mac_phi,
                self.config.mg_rtol,
                self.config.mg_atol,
            );
            for phi in &mut self.mac_phi {
                phi.scale(2.0 / dt);
            }
        } else {
            projector.project(umac, self.config.mg_rtol, self.config.mg_atol);
        }
    }

    /// Allocate the per-level potential on first use; persist it across
    /// steps otherwise.
    fn ensure_mac_phi(&mut self, vel: &[CellField]) {
        if self.mac_phi.len() != vel.len() {
            self.mac_phi = vel
                .iter()
                .map(|v| CellField::new(v.dims(), 1, 1))
                .collect();
        }
    }

    /// Hash of the mesh/coefficient configuration the projector was (or
    /// would be) built for.
    fn config_hash(&self, vel: &[CellField], geometry: &[LevelGeometry]) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write_usize(vel.len());
        for (v, g) in vel.iter().zip(geometry) {
            for d in v.dims() {
                hasher.write_usize(d);
            }
            hasher.write_u8(u8::from(g.has_cut_cells()));
        }
        hasher.write_u8(u8::from(self.config.constant_density));
        hasher.write_i32(self.config.mg_max_coarsening_level);
        hasher.finish()
    }
}

/// Build the face-centered inverse-density coefficient of one level.
///
/// Density is interpolated to faces (at the true face centroid when the
/// level has cut cells, at the nominal center otherwise) and inverted
/// pointwise. Zero density is a physical-setup error and is not guarded
/// against. Faces between disconnected cells get a zero coefficient: no
/// correction flux crosses a wall.
pub fn build_inv_rho(
    density: &CellField,
    geometry: &LevelGeometry,
    bc: &BcRec,
    domain: &Domain,
) -> FaceSet {
    assert!(density.nghost() >= 1, "Density needs a ghost layer");
    let mut out = FaceSet::new(density.dims());
    for dir in Direction::ALL {
        match geometry {
            LevelGeometry::Regular => {
                average_cellcenter_to_face(density, dir, out.get_mut(dir));
                out.get_mut(dir).invert();
            }
            LevelGeometry::EmbeddedBoundary(eb) => {
                eb_interp_to_face_centroid(density, eb, dir, bc, domain, out.get_mut(dir));
                out.get_mut(dir).invert();
                zero_disconnected_faces(eb, dir, out.get_mut(dir));
            }
        }
    }
    out
}

/// Plain cell-center-to-face average of a single-component field.
fn average_cellcenter_to_face(field: &CellField, dir: Direction, out: &mut FaceField) {
    let off = dir.offset();
    let fdims = out.dims();
    for k in 0..fdims[2] {
        for j in 0..fdims[1] {
            for i in 0..fdims[0] {
                let hi = [i as i32, j as i32, k as i32];
                let lo = [hi[0] - off[0], hi[1] - off[1], hi[2] - off[2]];
                let avg = 0.5 * (field.at(lo[0], lo[1], lo[2], 0) + field.at(hi[0], hi[1], hi[2], 0));
                out.set(i, j, k, avg);
            }
        }
    }
}

/// Interpolate cell-centroid values to the true face centroid.
///
/// The nominal two-cell average is blended toward the neighboring face
/// averages along each transverse direction according to the centroid's
/// fractional offset. On an external-value density boundary the
/// prescribed (ghost cell) value sits on the face and is used directly.
/// Disconnected faces receive a placeholder that the caller masks out
/// after inversion.
fn eb_interp_to_face_centroid(
    field: &CellField,
    eb: &EbGeometry,
    dir: Direction,
    bc: &BcRec,
    domain: &Domain,
    out: &mut FaceField,
) {
    let off = dir.offset();
    let d = dir.index();
    let [t1, t2] = dir.transverse();
    let fdims = out.dims();
    let extdir_lo = bc.lo(dir) == BcType::ExtDir;
    let extdir_hi = bc.hi(dir) == BcType::ExtDir;

    for k in 0..fdims[2] {
        for j in 0..fdims[1] {
            for i in 0..fdims[0] {
                let hi = [i as i32, j as i32, k as i32];
                let lo = [hi[0] - off[0], hi[1] - off[1], hi[2] - off[2]];

                if !eb
                    .flags(hi[0], hi[1], hi[2])
                    .is_connected(-off[0], -off[1], -off[2])
                {
                    out.set(i, j, k, 1.0);
                    continue;
                }

                let fpos = hi[d];
                let value = if extdir_lo && fpos == domain.lo(dir) {
                    field.at(lo[0], lo[1], lo[2], 0)
                } else if extdir_hi && fpos == domain.hi(dir) + 1 {
                    field.at(hi[0], hi[1], hi[2], 0)
                } else {
                    let fc = eb.face_centroid(dir, i, j, k);
                    let mut value = 0.5
                        * (field.at(lo[0], lo[1], lo[2], 0) + field.at(hi[0], hi[1], hi[2], 0));
                    for (t, frac) in [(t1, fc[0]), (t2, fc[1])] {
                        if frac != 0.0 {
                            let s = t.offset();
                            let sign = if frac > 0.0 { 1 } else { -1 };
                            let slo = [lo[0] + sign * s[0], lo[1] + sign * s[1], lo[2] + sign * s[2]];
                            let shi = [hi[0] + sign * s[0], hi[1] + sign * s[1], hi[2] + sign * s[2]];
                            let neighbor = 0.5
                                * (field.at(slo[0], slo[1], slo[2], 0)
                                    + field.at(shi[0], shi[1], shi[2], 0));
                            let w = frac.abs();
                            value = (1.0 - w) * value + w * neighbor;
                        }
                    }
                    value
                };
                out.set(i, j, k, value);
            }
        }
    }
}

/// Force a zero coefficient on faces whose neighbor cells are not
/// connected.
fn zero_disconnected_faces(eb: &EbGeometry, dir: Direction, out: &mut FaceField) {
    let off = dir.offset();
    let fdims = out.dims();
    for k in 0..fdims[2] {
        for j in 0..fdims[1] {
            for i in 0..fdims[0] {
                let hi = [i as i32, j as i32, k as i32];
                if !eb
                    .flags(hi[0], hi[1], hi[2])
                    .is_connected(-off[0], -off[1], -off[2])
                {
                    out.set(i, j, k, 0.0);
                }
            }
        }
    }
}
