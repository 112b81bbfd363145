//! Shared test collaborators: a reference projection solver, ghost
//! fillers and slope providers standing in for the external components.
#![allow(dead_code)]

use flow_sim_core::{
    Beta, CellField, Direction, Domain, EbGeometry, ExtdirFlags, FaceSet, FluxLocation,
    GhostFiller, LinOpBc, MacProjector, MgInfo, ProjectorState, SlopeProvider, Vec3,
};

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Reference variable-coefficient projection solver.
///
/// Solves `div(beta grad(phi)) = div(u)` cell by cell with red-black
/// Gauss-Seidel sweeps (unit cell width) and subtracts `beta grad(phi)`
/// from the face velocities. Slow but dependable; it exists so the
/// orchestrator can be exercised end-to-end without the production
/// multigrid engine.
pub struct ReferenceProjector {
    state: ProjectorState,
    beta: StoredBeta,
    bc_lo: [LinOpBc; 3],
    bc_hi: [LinOpBc; 3],
    max_sweeps: usize,
    /// Number of `init_projector` calls, for protocol assertions.
    pub init_calls: usize,
}

#[derive(Clone)]
enum StoredBeta {
    None,
    Constant(f64),
    Field(Vec<FaceSet>),
}

impl Default for ReferenceProjector {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceProjector {
    pub fn new() -> Self {
        Self {
            state: ProjectorState::Uninitialized,
            beta: StoredBeta::None,
            bc_lo: [LinOpBc::Dirichlet; 3],
            bc_hi: [LinOpBc::Dirichlet; 3],
            max_sweeps: 50_000,
            init_calls: 0,
        }
    }

    /// Snapshot of the stored coefficient of one level, flattened per
    /// direction, for idempotence assertions.
    pub fn beta_snapshot(&self, lev: usize) -> Option<Vec<f64>> {
        match &self.beta {
            StoredBeta::Field(levels) => {
                let fs = &levels[lev];
                let mut out = Vec::new();
                for dir in Direction::ALL {
                    out.extend_from_slice(fs.get(dir).as_slice());
                }
                Some(out)
            }
            StoredBeta::Constant(c) => Some(vec![*c]),
            StoredBeta::None => None,
        }
    }

    fn store(&mut self, beta: Beta<'_>) {
        self.beta = match beta {
            Beta::Constant(c) => StoredBeta::Constant(c),
            Beta::Field(levels) => StoredBeta::Field(levels.to_vec()),
        };
    }

    fn beta_at(&self, lev: usize, dir: Direction, i: usize, j: usize, k: usize) -> f64 {
        match &self.beta {
            StoredBeta::Constant(c) => *c,
            StoredBeta::Field(levels) => levels[lev].get(dir).at(i, j, k),
            StoredBeta::None => panic!("Projector used before init"),
        }
    }

    fn solve_level(
        &self,
        lev: usize,
        umac: &mut FaceSet,
        phi_init: Option<&CellField>,
        rtol: f64,
        atol: f64,
    ) -> Vec<f64> {
        let fdx = umac.x.dims();
        let dims = [fdx[0] - 1, fdx[1], fdx[2]];
        let (nx, ny, nz) = (dims[0], dims[1], dims[2]);
        let idx = |i: usize, j: usize, k: usize| (k * ny + j) * nx + i;

        // Right-hand side: discrete divergence of the face velocities.
        let mut rhs = vec![0.0; nx * ny * nz];
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    rhs[idx(i, j, k)] = (umac.x.at(i + 1, j, k) - umac.x.at(i, j, k))
                        + (umac.y.at(i, j + 1, k) - umac.y.at(i, j, k))
                        + (umac.z.at(i, j, k + 1) - umac.z.at(i, j, k));
                }
            }
        }
        let rhs_norm = rhs.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let target = atol.max(rtol * rhs_norm);

        let mut phi = vec![0.0; nx * ny * nz];
        if let Some(init) = phi_init {
            for k in 0..nz {
                for j in 0..ny {
                    for i in 0..nx {
                        phi[idx(i, j, k)] = init.at(i as i32, j as i32, k as i32, 0);
                    }
                }
            }
        }

        // Per-cell couplings: (beta, neighbor index or ghost) for each of
        // the six faces. Neumann boundary faces drop out of the operator
        // entirely; Dirichlet boundary faces couple to a zero ghost.
        let couplings = |i: usize, j: usize, k: usize| -> ([(f64, Option<usize>); 6], f64) {
            let mut faces = [(0.0, None); 6];
            let mut denom = 0.0;
            let cell = [i, j, k];
            for (slot, dir) in Direction::ALL.iter().enumerate() {
                let d = dir.index();
                let n = dims[d];
                // Low-side face of this cell
                let (bi, bj, bk) = (i, j, k);
                let beta = self.beta_at(lev, *dir, bi, bj, bk);
                if cell[d] == 0 {
                    match self.bc_lo[d] {
                        LinOpBc::Dirichlet => {
                            faces[2 * slot] = (beta, None);
                            denom += beta;
                        }
                        LinOpBc::Neumann => {}
                        LinOpBc::Periodic => {
                            let mut nb = cell;
                            nb[d] = n - 1;
                            faces[2 * slot] = (beta, Some(idx(nb[0], nb[1], nb[2])));
                            denom += beta;
                        }
                    }
                } else {
                    let mut nb = cell;
                    nb[d] -= 1;
                    faces[2 * slot] = (beta, Some(idx(nb[0], nb[1], nb[2])));
                    denom += beta;
                }
                // High-side face of this cell
                let mut f = cell;
                f[d] += 1;
                let beta = self.beta_at(lev, *dir, f[0], f[1], f[2]);
                if cell[d] == n - 1 {
                    match self.bc_hi[d] {
                        LinOpBc::Dirichlet => {
                            faces[2 * slot + 1] = (beta, None);
                            denom += beta;
                        }
                        LinOpBc::Neumann => {}
                        LinOpBc::Periodic => {
                            let mut nb = cell;
                            nb[d] = 0;
                            faces[2 * slot + 1] = (beta, Some(idx(nb[0], nb[1], nb[2])));
                            denom += beta;
                        }
                    }
                } else {
                    let mut nb = cell;
                    nb[d] += 1;
                    faces[2 * slot + 1] = (beta, Some(idx(nb[0], nb[1], nb[2])));
                    denom += beta;
                }
            }
            (faces, denom)
        };

        // Red-black Gauss-Seidel sweeps until the residual meets the
        // requested tolerance.
        for _sweep in 0..self.max_sweeps {
            for parity in 0..2 {
                for k in 0..nz {
                    for j in 0..ny {
                        for i in 0..nx {
                            if (i + j + k) % 2 != parity {
                                continue;
                            }
                            let (faces, denom) = couplings(i, j, k);
                            if denom == 0.0 {
                                continue;
                            }
                            let mut acc = 0.0;
                            for (beta, nb) in faces {
                                if let Some(nb) = nb {
                                    acc += beta * phi[nb];
                                }
                            }
                            phi[idx(i, j, k)] = (acc - rhs[idx(i, j, k)]) / denom;
                        }
                    }
                }
            }

            let mut max_res = 0.0_f64;
            for k in 0..nz {
                for j in 0..ny {
                    for i in 0..nx {
                        let (faces, denom) = couplings(i, j, k);
                        let mut lap = -denom * phi[idx(i, j, k)];
                        for (beta, nb) in faces {
                            if let Some(nb) = nb {
                                lap += beta * phi[nb];
                            }
                        }
                        max_res = max_res.max((lap - rhs[idx(i, j, k)]).abs());
                    }
                }
            }
            if max_res <= target {
                break;
            }
        }

        // Subtract beta grad(phi) from the faces; Neumann boundary faces
        // carry no correction, Dirichlet boundaries use a zero ghost.
        for dir in Direction::ALL {
            let d = dir.index();
            let n = dims[d];
            let fdims = umac.get(dir).dims();
            for k in 0..fdims[2] {
                for j in 0..fdims[1] {
                    for i in 0..fdims[0] {
                        let f = [i, j, k];
                        let beta = self.beta_at(lev, dir, i, j, k);
                        let mut hi_cell = f;
                        let mut lo_cell = f;
                        let gphi = if f[d] == 0 {
                            match self.bc_lo[d] {
                                LinOpBc::Dirichlet => phi[idx(f[0], f[1], f[2])],
                                LinOpBc::Neumann => continue,
                                LinOpBc::Periodic => {
                                    lo_cell[d] = n - 1;
                                    phi[idx(hi_cell[0], hi_cell[1], hi_cell[2])]
                                        - phi[idx(lo_cell[0], lo_cell[1], lo_cell[2])]
                                }
                            }
                        } else if f[d] == n {
                            match self.bc_hi[d] {
                                LinOpBc::Dirichlet => {
                                    lo_cell[d] = n - 1;
                                    -phi[idx(lo_cell[0], lo_cell[1], lo_cell[2])]
                                }
                                LinOpBc::Neumann => continue,
                                LinOpBc::Periodic => {
                                    hi_cell[d] = 0;
                                    lo_cell[d] = n - 1;
                                    phi[idx(hi_cell[0], hi_cell[1], hi_cell[2])]
                                        - phi[idx(lo_cell[0], lo_cell[1], lo_cell[2])]
                                }
                            }
                        } else {
                            lo_cell[d] -= 1;
                            phi[idx(hi_cell[0], hi_cell[1], hi_cell[2])]
                                - phi[idx(lo_cell[0], lo_cell[1], lo_cell[2])]
                        };
                        let v = umac.get(dir).at(i, j, k) - beta * gphi;
                        umac.get_mut(dir).set(i, j, k, v);
                    }
                }
            }
        }

        phi
    }
}

impl MacProjector for ReferenceProjector {
    fn state(&self) -> ProjectorState {
        self.state
    }

    fn init_projector(&mut self, _info: MgInfo, beta: Beta<'_>, config_hash: u64) {
        self.store(beta);
        self.state = ProjectorState::Initialized { config_hash };
        self.init_calls += 1;
    }

    fn set_domain_bc(&mut self, lo: [LinOpBc; 3], hi: [LinOpBc; 3]) {
        self.bc_lo = lo;
        self.bc_hi = hi;
    }

    fn update_beta(&mut self, beta: Beta<'_>) {
        self.store(beta);
    }

    fn project(&mut self, umac: &mut [FaceSet], rtol: f64, atol: f64) {
        for (lev, faces) in umac.iter_mut().enumerate() {
            self.solve_level(lev, faces, None, rtol, atol);
        }
    }

    fn project_with_potential(
        &mut self,
        umac: &mut [FaceSet],
        phi: &mut [CellField],
        rtol: f64,
        atol: f64,
    ) {
        for (lev, faces) in umac.iter_mut().enumerate() {
            let solved = self.solve_level(lev, faces, Some(&phi[lev]), rtol, atol);
            let dims = phi[lev].dims();
            for k in 0..dims[2] {
                for j in 0..dims[1] {
                    for i in 0..dims[0] {
                        let flat = (k * dims[1] + j) * dims[0] + i;
                        phi[lev].set(i as i32, j as i32, k as i32, 0, solved[flat]);
                    }
                }
            }
        }
    }

    fn get_fluxes(&self, fluxes: &mut [FaceSet], phi: &[CellField], _location: FluxLocation) {
        for (lev, (out, pot)) in fluxes.iter_mut().zip(phi).enumerate() {
            for dir in Direction::ALL {
                let off = dir.offset();
                let fdims = out.get(dir).dims();
                for k in 0..fdims[2] {
                    for j in 0..fdims[1] {
                        for i in 0..fdims[0] {
                            let hi = [i as i32, j as i32, k as i32];
                            let lo = [hi[0] - off[0], hi[1] - off[1], hi[2] - off[2]];
                            // Gradient from cell values; the potential's
                            // ghost layer covers the boundary faces.
                            let gphi = pot.at(hi[0], hi[1], hi[2], 0) - pot.at(lo[0], lo[1], lo[2], 0);
                            let beta = self.beta_at(lev, dir, i, j, k);
                            out.get_mut(dir).set(i, j, k, -beta * gphi);
                        }
                    }
                }
            }
        }
    }
}

/// Minimal stand-in for the external Godunov extrapolator: central
/// average of the cell velocities plus the forcing and potential-flux
/// seeds.
pub struct CentralExtrapolator;

impl flow_sim_core::GodunovExtrapolator for CentralExtrapolator {
    fn extrap_vel_to_faces(
        &self,
        vel: &CellField,
        forces: &CellField,
        phi_fluxes: &FaceSet,
        umac: &mut FaceSet,
        _bcrec: &[flow_sim_core::BcRec; 3],
        dt: f64,
    ) {
        for dir in Direction::ALL {
            let comp = dir.index();
            let off = dir.offset();
            let fdims = umac.get(dir).dims();
            for k in 0..fdims[2] {
                for j in 0..fdims[1] {
                    for i in 0..fdims[0] {
                        let hi = [i as i32, j as i32, k as i32];
                        let lo = [hi[0] - off[0], hi[1] - off[1], hi[2] - off[2]];
                        let avg = 0.5
                            * (vel.at(lo[0], lo[1], lo[2], comp) + vel.at(hi[0], hi[1], hi[2], comp));
                        let force = 0.5
                            * (forces.at(lo[0], lo[1], lo[2], comp)
                                + forces.at(hi[0], hi[1], hi[2], comp));
                        let seed = phi_fluxes.get(dir).at(i, j, k);
                        umac.get_mut(dir).set(i, j, k, avg + 0.5 * dt * force + seed);
                    }
                }
            }
        }
    }
}

/// Ghost filler that first-order extrapolates interior values outward.
pub struct ExtrapolationFiller {
    pub force_ghosts: usize,
}

fn extrapolate_ghosts(field: &mut CellField) {
    let dims = field.dims();
    let ng = field.nghost() as i32;
    for n in 0..field.ncomp() {
        for k in -ng..dims[2] as i32 + ng {
            for j in -ng..dims[1] as i32 + ng {
                for i in -ng..dims[0] as i32 + ng {
                    let ci = i.clamp(0, dims[0] as i32 - 1);
                    let cj = j.clamp(0, dims[1] as i32 - 1);
                    let ck = k.clamp(0, dims[2] as i32 - 1);
                    if (ci, cj, ck) != (i, j, k) {
                        let v = field.at(ci, cj, ck, n);
                        field.set(i, j, k, n, v);
                    }
                }
            }
        }
    }
}

impl GhostFiller for ExtrapolationFiller {
    fn nghost_force(&self) -> usize {
        self.force_ghosts
    }

    fn fillpatch_force(&self, _time: f64, forces: &mut [CellField], _nghost: usize) {
        for f in forces {
            extrapolate_ghosts(f);
        }
    }

    fn fill_boundary(&self, field: &mut CellField) {
        extrapolate_ghosts(field);
    }
}

/// Monotonized-central slope provider honoring the connectivity flags.
pub struct McSlopes;

impl McSlopes {
    fn axis_slope(
        cell: [i32; 3],
        axis: Direction,
        comp: usize,
        vcc: &CellField,
        geom: &EbGeometry,
        one_sided: Option<(bool, bool, i32, i32)>,
    ) -> f64 {
        let off = axis.offset();
        let [i, j, k] = cell;
        let flags = geom.flags(i, j, k);
        if !flags.is_connected(-off[0], -off[1], -off[2])
            || !flags.is_connected(off[0], off[1], off[2])
        {
            return 0.0;
        }
        let v_m = vcc.at(i - off[0], j - off[1], k - off[2], comp);
        let v_c = vcc.at(i, j, k, comp);
        let v_p = vcc.at(i + off[0], j + off[1], k + off[2], comp);
        let dl = 2.0 * (v_c - v_m);
        let dr = 2.0 * (v_p - v_c);
        let pos = cell[axis.index()];
        let dc = match one_sided {
            Some((ext_lo, _, dom_lo, _)) if ext_lo && pos == dom_lo => {
                (v_p + 3.0 * v_c - 4.0 * v_m) / 3.0
            }
            Some((_, ext_hi, _, dom_hi)) if ext_hi && pos == dom_hi => {
                (4.0 * v_p - 3.0 * v_c - v_m) / 3.0
            }
            _ => 0.5 * (v_p - v_m),
        };
        let s = dl.abs().min(dc.abs()).min(dr.abs());
        let s = if dl * dr > 0.0 { s } else { 0.0 };
        if dc > 0.0 {
            s
        } else {
            -s
        }
    }
}

impl SlopeProvider for McSlopes {
    fn slopes(&self, cell: [i32; 3], comp: usize, vcc: &CellField, geom: &EbGeometry) -> Vec3 {
        Vec3::new(
            Self::axis_slope(cell, Direction::X, comp, vcc, geom, None),
            Self::axis_slope(cell, Direction::Y, comp, vcc, geom, None),
            Self::axis_slope(cell, Direction::Z, comp, vcc, geom, None),
        )
    }

    fn slopes_extdir(
        &self,
        cell: [i32; 3],
        comp: usize,
        vcc: &CellField,
        geom: &EbGeometry,
        extdir: &ExtdirFlags,
        domain: &Domain,
    ) -> Vec3 {
        let mut out = Vec3::zeros();
        for axis in Direction::ALL {
            let d = axis.index();
            out[d] = Self::axis_slope(
                cell,
                axis,
                comp,
                vcc,
                geom,
                Some((extdir.lo[d], extdir.hi[d], domain.lo(axis), domain.hi(axis))),
            );
        }
        out
    }
}

/// Maximum absolute discrete divergence over the interior cells of one
/// level.
pub fn max_divergence(umac: &FaceSet) -> f64 {
    let fdx = umac.x.dims();
    let dims = [fdx[0] - 1, fdx[1], fdx[2]];
    let mut max_div = 0.0_f64;
    for k in 0..dims[2] {
        for j in 0..dims[1] {
            for i in 0..dims[0] {
                let div = (umac.x.at(i + 1, j, k) - umac.x.at(i, j, k))
                    + (umac.y.at(i, j + 1, k) - umac.y.at(i, j, k))
                    + (umac.z.at(i, j, k + 1) - umac.z.at(i, j, k));
                max_div = max_div.max(div.abs());
            }
        }
    }
    max_div
}

/// Cell-centered velocity with a reproducible pseudo-random interior.
pub fn random_velocity(dims: [usize; 3], seed: u64) -> CellField {
    use rand::{rngs::StdRng, Rng, SeedableRng};
    let mut rng = StdRng::seed_from_u64(seed);
    let mut vcc = CellField::new(dims, 3, 2);
    for n in 0..3 {
        for k in 0..dims[2] as i32 {
            for j in 0..dims[1] as i32 {
                for i in 0..dims[0] as i32 {
                    vcc.set(i, j, k, n, rng.random_range(-1.0..1.0));
                }
            }
        }
    }
    extrapolate_ghosts(&mut vcc);
    vcc
}

/// Cell-centered density varying smoothly across the level.
pub fn smooth_density(dims: [usize; 3]) -> CellField {
    let mut rho = CellField::new(dims, 1, 1);
    for k in 0..dims[2] as i32 {
        for j in 0..dims[1] as i32 {
            for i in 0..dims[0] as i32 {
                let x = f64::from(i) / dims[0] as f64;
                let y = f64::from(j) / dims[1] as f64;
                rho.set(i, j, k, 0, 1.0 + 0.4 * x + 0.2 * y);
            }
        }
    }
    extrapolate_ghosts(&mut rho);
    rho
}

/// Cell-centered density uniformly equal to `value`.
pub fn uniform_density(dims: [usize; 3], value: f64) -> CellField {
    let mut rho = CellField::new(dims, 1, 1);
    rho.fill(value);
    rho
}
