//! Embedded-boundary geometry descriptor.
//!
//! Cut cells are grid cells partially or wholly excluded from the fluid
//! domain by an immersed solid surface. The geometry/factory collaborator
//! precomputes, per cell, which neighbors remain fluid-connected and where
//! the true (wetted) cell and face centroids sit relative to the nominal
//! centers; this module only stores and serves those moments. All centroid
//! offsets are fractions of a cell width, so they never exceed 0.5 in
//! magnitude.

use crate::core_types::Direction;

/// Per-cell record of which of the 26 neighbors are fluid-connected.
///
/// Bit `(di + 1) + 3 (dj + 1) + 9 (dk + 1)` covers neighbor offset
/// `(di, dj, dk)` with each component in `-1..=1`. A fully covered cell has
/// no bits set and can never contribute a nonzero face velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityFlags(u32);

const ALL_NEIGHBORS: u32 = (1 << 27) - 1;

impl ConnectivityFlags {
    /// Flags for an uncut cell: every neighbor connected.
    #[must_use]
    pub fn fully_connected() -> Self {
        Self(ALL_NEIGHBORS)
    }

    /// Flags for a fully covered cell: no neighbor connected.
    #[must_use]
    pub fn covered() -> Self {
        Self(0)
    }

    #[inline]
    fn bit(di: i32, dj: i32, dk: i32) -> u32 {
        debug_assert!(
            (-1..=1).contains(&di) && (-1..=1).contains(&dj) && (-1..=1).contains(&dk),
            "Neighbor offset out of range"
        );
        ((di + 1) + 3 * (dj + 1) + 9 * (dk + 1)) as u32
    }

    /// Whether the neighbor at offset `(di, dj, dk)` is fluid-connected.
    #[inline]
    #[must_use]
    pub fn is_connected(&self, di: i32, dj: i32, dk: i32) -> bool {
        self.0 & (1 << Self::bit(di, dj, dk)) != 0
    }

    /// Mark the neighbor at offset `(di, dj, dk)` as disconnected.
    pub fn disconnect(&mut self, di: i32, dj: i32, dk: i32) {
        self.0 &= !(1 << Self::bit(di, dj, dk));
    }
}

/// Immutable cut-cell geometry of one level patch.
///
/// Connectivity flags and cell centroids are stored with a one-cell ghost
/// halo (the predictor evaluates both at the low-side neighbor of boundary
/// faces); face centroids cover exactly the faces of the patch.
#[derive(Debug, Clone)]
pub struct EbGeometry {
    dims: [usize; 3],
    nghost: usize,
    flags: Vec<ConnectivityFlags>,
    cell_centroids: Vec<[f64; 3]>,
    face_centroids: [Vec<[f64; 2]>; 3],
}

impl EbGeometry {
    /// Geometry with every cell uncut: full connectivity, centroids at the
    /// nominal centers.
    #[must_use]
    pub fn uncut(dims: [usize; 3]) -> Self {
        let nghost = 1;
        let grown: usize = dims.iter().map(|d| d + 2 * nghost).product();
        let face_centroids = [
            vec![[0.0; 2]; Self::face_count(dims, Direction::X)],
            vec![[0.0; 2]; Self::face_count(dims, Direction::Y)],
            vec![[0.0; 2]; Self::face_count(dims, Direction::Z)],
        ];
        Self {
            dims,
            nghost,
            flags: vec![ConnectivityFlags::fully_connected(); grown],
            cell_centroids: vec![[0.0; 3]; grown],
            face_centroids,
        }
    }

    fn face_count(dims: [usize; 3], dir: Direction) -> usize {
        let mut fd = dims;
        fd[dir.index()] += 1;
        fd.iter().product()
    }

    /// Interior cell counts per direction.
    #[must_use]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    fn cell_index(&self, i: i32, j: i32, k: i32) -> usize {
        let ng = self.nghost as i32;
        debug_assert!(
            i >= -ng
                && j >= -ng
                && k >= -ng
                && i < self.dims[0] as i32 + ng
                && j < self.dims[1] as i32 + ng
                && k < self.dims[2] as i32 + ng,
            "Geometry cell index out of bounds"
        );
        let nxg = self.dims[0] + 2 * self.nghost;
        let nyg = self.dims[1] + 2 * self.nghost;
        let ii = (i + ng) as usize;
        let jj = (j + ng) as usize;
        let kk = (k + ng) as usize;
        (kk * nyg + jj) * nxg + ii
    }

    #[inline]
    fn face_index(&self, dir: Direction, i: usize, j: usize, k: usize) -> usize {
        let mut fd = self.dims;
        fd[dir.index()] += 1;
        debug_assert!(i < fd[0] && j < fd[1] && k < fd[2], "Face index out of bounds");
        (k * fd[1] + j) * fd[0] + i
    }

    /// Connectivity flags of cell `(i, j, k)`.
    #[inline]
    #[must_use]
    pub fn flags(&self, i: i32, j: i32, k: i32) -> ConnectivityFlags {
        self.flags[self.cell_index(i, j, k)]
    }

    /// Overwrite the connectivity flags of cell `(i, j, k)`.
    pub fn set_flags(&mut self, i: i32, j: i32, k: i32, flags: ConnectivityFlags) {
        let idx = self.cell_index(i, j, k);
        self.flags[idx] = flags;
    }

    /// Centroid offset of cell `(i, j, k)` from the nominal cell center,
    /// in cell-width fractions.
    #[inline]
    #[must_use]
    pub fn cell_centroid(&self, i: i32, j: i32, k: i32) -> [f64; 3] {
        self.cell_centroids[self.cell_index(i, j, k)]
    }

    /// Overwrite the centroid offset of cell `(i, j, k)`.
    pub fn set_cell_centroid(&mut self, i: i32, j: i32, k: i32, centroid: [f64; 3]) {
        let idx = self.cell_index(i, j, k);
        self.cell_centroids[idx] = centroid;
    }

    /// Transverse centroid offset of the `dir`-face at `(i, j, k)`, in
    /// cell-width fractions, ordered by ascending transverse axis.
    #[inline]
    #[must_use]
    pub fn face_centroid(&self, dir: Direction, i: usize, j: usize, k: usize) -> [f64; 2] {
        self.face_centroids[dir.index()][self.face_index(dir, i, j, k)]
    }

    /// Overwrite the transverse centroid offset of one face.
    pub fn set_face_centroid(
        &mut self,
        dir: Direction,
        i: usize,
        j: usize,
        k: usize,
        centroid: [f64; 2],
    ) {
        let idx = self.face_index(dir, i, j, k);
        self.face_centroids[dir.index()][idx] = centroid;
    }
}

/// Geometry of one level, resolved once per level per step.
///
/// Levels without any cut cell take the `Regular` variant and skip every
/// cut-cell branch; levels with embedded boundaries carry the full
/// descriptor. The divergence-free postcondition is shared by both.
#[derive(Debug, Clone)]
pub enum LevelGeometry {
    /// No cut cells anywhere on the level.
    Regular,
    /// At least one cut cell; centroid corrections and connectivity
    /// gating apply.
    EmbeddedBoundary(EbGeometry),
}

impl LevelGeometry {
    /// Whether this level contains any cut cells.
    #[must_use]
    pub fn has_cut_cells(&self) -> bool {
        matches!(self, LevelGeometry::EmbeddedBoundary(_))
    }
}
