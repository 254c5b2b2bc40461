//! # Per-sampling spatial index
//!
//! A [`SpatialIndex`] owns every [`Cell`] of one calorimeter sampling and maps a 3D step
//! position onto the unique cell whose `(eta, phi)` bin contains it.
//!
//! ## Storage
//!
//! Cells live in an arena (`Vec<Cell>`) and are addressed by a small [`CellHandle`];
//! the `(eta_bin, phi_bin) → handle` map gives O(1) lookup once the two bins are known.
//! Bins follow the same left-exclusive / right-inclusive rule as the time samples
//! (see [`crate::binning::find_bin`]), so a position on a shared edge maps to exactly
//! one cell.
//!
//! ## Lookup
//!
//! ```text
//! (x, y, z) ──► (eta, phi, r) ──► r ∈ [rmin, rmax] ? ──► (eta_bin, phi_bin) ──► handle ──► Cell
//! ```

use std::collections::HashMap;

use nalgebra::Vector3;

use crate::{
    binning::{find_bin, uniform_edges, validate_edges},
    calo_cell::{sampling::CaloSampling, Cell},
    calo_errors::CaloError,
    constants::{Eta, Millimeter, Radian, DPI},
    coordinates::{delta_phi, DetectorCoordinates},
    geometry::LayerDirective,
};

/// Phi ranges closer than this to 2π are treated as the full circle
const FULL_CIRCLE_TOLERANCE: Radian = 1e-6;

/// Index of a cell inside the arena of its [`SpatialIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellHandle(u32);

impl CellHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Why a position could not be mapped onto a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupFailure {
    /// Transverse radius outside `[rmin, rmax]`
    OutsideRadius,
    /// Pseudorapidity outside the eta edges
    OutsideEta,
    /// Azimuth outside the phi edges
    OutsidePhi,
    /// Both bins found but no cell registered there (inconsistent grid)
    MissingCell { eta_bin: usize, phi_bin: usize },
}

#[derive(Debug, Clone)]
pub struct SpatialIndex {
    sampling: CaloSampling,
    eta_edges: Vec<Eta>,
    phi_edges: Vec<Radian>,
    rmin: Millimeter,
    rmax: Millimeter,
    cells: Vec<Cell>,
    lookup: HashMap<(usize, usize), CellHandle>,
}

impl SpatialIndex {
    /// Build an empty index with uniform bins from a layer directive.
    pub fn new(layer: &LayerDirective) -> Result<Self, CaloError> {
        SpatialIndex::from_edges(
            layer.sampling,
            uniform_edges(layer.eta_min, layer.eta_max, layer.eta_bins)?,
            uniform_edges(layer.phi_min, layer.phi_max, layer.phi_bins)?,
            layer.rmin,
            layer.rmax,
        )
    }

    /// Build an empty index from explicit bin edges.
    ///
    /// Arguments
    /// -----------------
    /// * `sampling`: the sampling served by this index.
    /// * `eta_edges`, `phi_edges`: strictly increasing bin boundaries.
    /// * `rmin`, `rmax`: transverse radial range of the sampling, in mm.
    ///
    /// Return
    /// ----------
    /// * The index, or [`CaloError::InvalidBinning`] for unsorted edges or an empty radial range.
    pub fn from_edges(
        sampling: CaloSampling,
        eta_edges: Vec<Eta>,
        phi_edges: Vec<Radian>,
        rmin: Millimeter,
        rmax: Millimeter,
    ) -> Result<Self, CaloError> {
        validate_edges(&eta_edges)?;
        validate_edges(&phi_edges)?;
        if !(rmin < rmax) {
            return Err(CaloError::InvalidBinning(format!(
                "empty radial range [{rmin}, {rmax}] for sampling {sampling}"
            )));
        }
        Ok(SpatialIndex {
            sampling,
            eta_edges,
            phi_edges,
            rmin,
            rmax,
            cells: Vec::new(),
            lookup: HashMap::new(),
        })
    }

    pub fn sampling(&self) -> CaloSampling {
        self.sampling
    }

    pub fn eta_edges(&self) -> &[Eta] {
        &self.eta_edges
    }

    pub fn phi_edges(&self) -> &[Radian] {
        &self.phi_edges
    }

    pub fn radial_range(&self) -> (Millimeter, Millimeter) {
        (self.rmin, self.rmax)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// `(eta_bin, phi_bin)` containing an angular position.
    pub fn bin_of(&self, eta: Eta, phi: Radian) -> Option<(usize, usize)> {
        Some((find_bin(&self.eta_edges, eta)?, find_bin(&self.phi_edges, phi)?))
    }

    /// Signed `(eta, phi)` bin distance from the bin containing `(eta, phi)` to the bin of
    /// the cell `handle`.
    ///
    /// The phi distance wraps around when the phi edges span the full circle, so that the
    /// first and last phi bins are neighbours. `None` when `(eta, phi)` is outside the grid.
    pub fn bin_offset(&self, eta: Eta, phi: Radian, handle: CellHandle) -> Option<(i64, i64)> {
        let (center_eta, center_phi) = self.bin_of(eta, phi)?;
        let cell = self.cell(handle);
        let (cell_eta, cell_phi) = self.bin_of(cell.eta(), cell.phi())?;

        let eta_offset = cell_eta as i64 - center_eta as i64;
        let mut phi_offset = cell_phi as i64 - center_phi as i64;
        if self.phi_wraps() {
            let n_phi = (self.phi_edges.len() - 1) as i64;
            phi_offset = phi_offset.rem_euclid(n_phi);
            if phi_offset > n_phi / 2 {
                phi_offset -= n_phi;
            }
        }
        Some((eta_offset, phi_offset))
    }

    fn phi_wraps(&self) -> bool {
        match (self.phi_edges.first(), self.phi_edges.last()) {
            (Some(first), Some(last)) => (last - first - DPI).abs() < FULL_CIRCLE_TOLERANCE,
            _ => false,
        }
    }

    /// Insert a cell, keyed by the bin containing its center.
    ///
    /// The `eta_channel`/`phi_channel` of the cell geometry are informational: they are
    /// reported in the output records but never used as the lookup key.
    ///
    /// Return
    /// ----------
    /// * The handle of the new cell.
    /// * [`CaloError::CellOutsideGrid`] if the center is not inside any bin.
    /// * [`CaloError::DuplicateCell`] if another cell already occupies the bin.
    pub fn push(&mut self, cell: Cell) -> Result<CellHandle, CaloError> {
        let (eta_bin, phi_bin) =
            self.bin_of(cell.eta(), cell.phi())
                .ok_or_else(|| CaloError::CellOutsideGrid {
                    sampling: self.sampling,
                    hash: cell.hash().to_string(),
                })?;

        if self.lookup.contains_key(&(eta_bin, phi_bin)) {
            return Err(CaloError::DuplicateCell {
                sampling: self.sampling,
                eta_bin,
                phi_bin,
            });
        }

        let handle = CellHandle(self.cells.len() as u32);
        self.cells.push(cell);
        self.lookup.insert((eta_bin, phi_bin), handle);
        Ok(handle)
    }

    /// Map a Cartesian position onto a cell handle, reporting why it failed otherwise.
    pub fn locate(&self, position: &Vector3<f64>) -> Result<CellHandle, LookupFailure> {
        let coords = DetectorCoordinates::from_cartesian(position);
        if coords.r < self.rmin || coords.r > self.rmax {
            return Err(LookupFailure::OutsideRadius);
        }
        let eta_bin = find_bin(&self.eta_edges, coords.eta).ok_or(LookupFailure::OutsideEta)?;
        let phi_bin = find_bin(&self.phi_edges, coords.phi).ok_or(LookupFailure::OutsidePhi)?;
        self.lookup
            .get(&(eta_bin, phi_bin))
            .copied()
            .ok_or(LookupFailure::MissingCell { eta_bin, phi_bin })
    }

    /// The cell containing `position`, if any.
    pub fn retrieve(&self, position: &Vector3<f64>) -> Option<&Cell> {
        self.locate(position).ok().map(|handle| self.cell(handle))
    }

    pub fn retrieve_mut(&mut self, position: &Vector3<f64>) -> Option<&mut Cell> {
        let handle = self.locate(position).ok()?;
        Some(self.cell_mut(handle))
    }

    pub fn cell(&self, handle: CellHandle) -> &Cell {
        &self.cells[handle.index()]
    }

    pub fn cell_mut(&mut self, handle: CellHandle) -> &mut Cell {
        &mut self.cells[handle.index()]
    }

    pub fn cells(&self) -> impl Iterator<Item = (CellHandle, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| (CellHandle(i as u32), cell))
    }

    /// Handles of the cells whose center satisfies `|Δeta| <= eta_window` and
    /// `|Δphi| <= phi_window` around `(eta, phi)`, with azimuth wraparound.
    ///
    /// Only the eta bins overlapping the window are visited.
    pub fn cells_in_window(
        &self,
        eta: Eta,
        phi: Radian,
        eta_window: Eta,
        phi_window: Radian,
    ) -> Vec<CellHandle> {
        let n_eta = self.eta_edges.len() - 1;
        let n_phi = self.phi_edges.len() - 1;
        let first = self
            .eta_edges
            .partition_point(|&edge| edge < eta - eta_window)
            .saturating_sub(1);
        let last = self
            .eta_edges
            .partition_point(|&edge| edge <= eta + eta_window)
            .min(n_eta);

        let mut handles = Vec::new();
        for eta_bin in first..last {
            for phi_bin in 0..n_phi {
                let Some(&handle) = self.lookup.get(&(eta_bin, phi_bin)) else {
                    continue;
                };
                let cell = self.cell(handle);
                if (cell.eta() - eta).abs() <= eta_window
                    && delta_phi(cell.phi(), phi).abs() <= phi_window
                {
                    handles.push(handle);
                }
            }
        }
        handles
    }

    /// Zero the energy of every cell, leaving the geometry untouched.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(Cell::clear);
    }
}

#[cfg(test)]
mod spatial_index_test {
    use super::*;
    use crate::time_digitizer::BunchCrossing;
    use std::f64::consts::PI;

    fn layer() -> LayerDirective {
        LayerDirective {
            sampling: CaloSampling::EMB2,
            eta_min: -1.0,
            eta_max: 1.0,
            eta_bins: 20,
            phi_min: -PI,
            phi_max: PI,
            phi_bins: 16,
            rmin: 1500.0,
            rmax: 1800.0,
        }
    }

    fn filled_index() -> SpatialIndex {
        let layer = layer();
        let mut index = SpatialIndex::new(&layer).unwrap();
        for geometry in layer.generate_cells() {
            index
                .push(Cell::new(geometry, BunchCrossing::default()))
                .unwrap();
        }
        index
    }

    fn position(eta: f64, phi: f64, r: f64) -> Vector3<f64> {
        let theta = 2.0 * (-eta).exp().atan();
        Vector3::new(r * phi.cos(), r * phi.sin(), r / theta.tan())
    }

    #[test]
    fn test_retrieve_cell_center() {
        let index = filled_index();
        assert_eq!(index.len(), 320);
        for (handle, cell) in index.cells() {
            let pos = position(cell.eta(), cell.phi(), 1650.0);
            assert_eq!(index.locate(&pos), Ok(handle));
        }
    }

    #[test]
    fn test_radius_outside_layer() {
        let index = filled_index();
        assert!(index.retrieve(&position(0.05, 0.1, 1499.0)).is_none());
        assert!(index.retrieve(&position(0.05, 0.1, 1801.0)).is_none());
        assert_eq!(
            index.locate(&position(0.05, 0.1, 2000.0)),
            Err(LookupFailure::OutsideRadius)
        );
        assert!(index.retrieve(&position(0.05, 0.1, 1500.5)).is_some());
    }

    #[test]
    fn test_radial_range_is_inclusive() {
        let index = filled_index();
        // on the x axis the transverse radius is exact
        for r in [1500.0, 1800.0] {
            assert!(index.retrieve(&Vector3::new(r, 0.0, 100.0)).is_some());
        }
        assert_eq!(
            index.locate(&Vector3::new(1800.0 + 1e-9, 0.0, 100.0)),
            Err(LookupFailure::OutsideRadius)
        );
    }

    #[test]
    fn test_cartesian_position_on_bin_edge() {
        let index = filled_index();
        // y = ±0 puts phi exactly on the edge between phi bins 7 and 8
        for y in [0.0, -0.0] {
            let cell = index
                .retrieve(&Vector3::new(1650.0, y, 1650.0 * 0.55_f64.sinh()))
                .unwrap();
            assert_eq!(cell.geometry().phi_channel, 7);
            assert_eq!(cell.geometry().eta_channel, 15);
        }

        for k in 1..20 {
            let edge = index.eta_edges()[k];
            let pos = position(edge, 0.1, 1650.0);
            let coords = DetectorCoordinates::from_cartesian(&pos);
            let (eta_bin, phi_bin) = index.bin_of(coords.eta, coords.phi).unwrap();
            assert!(eta_bin == k - 1 || eta_bin == k);
            let cell = index.retrieve(&pos).unwrap();
            assert_eq!(cell.geometry().eta_channel as usize, eta_bin);
            assert_eq!(cell.geometry().phi_channel as usize, phi_bin);
        }
    }

    #[test]
    fn test_channels_do_not_key_the_cell() {
        let layer = layer();
        let mut index = SpatialIndex::new(&layer).unwrap();
        let mut geometry = layer.generate_cells().next().unwrap();
        geometry.eta_channel = 99;
        geometry.phi_channel = 42;
        let handle = index
            .push(Cell::new(geometry.clone(), BunchCrossing::default()))
            .unwrap();
        let pos = position(geometry.eta, geometry.phi, 1650.0);
        assert_eq!(index.locate(&pos), Ok(handle));
        assert_eq!(index.cell(handle).geometry().eta_channel, 99);
    }

    #[test]
    fn test_bin_offset_wraps_phi() {
        let index = filled_index();
        let first_phi_bin = index.locate(&position(0.05, -PI + 0.1, 1650.0)).unwrap();
        let higher_eta = index.locate(&position(0.25, -PI + 0.1, 1650.0)).unwrap();

        // seed in the last phi bin, eta bin 10
        assert_eq!(index.bin_offset(0.05, PI - 0.1, first_phi_bin), Some((0, 1)));
        assert_eq!(index.bin_offset(0.05, PI - 0.1, higher_eta), Some((2, 1)));
        assert_eq!(index.bin_offset(0.05, -PI + 0.1, first_phi_bin), Some((0, 0)));
        assert_eq!(index.bin_offset(1.5, 0.0, first_phi_bin), None);
    }

    #[test]
    fn test_angular_acceptance() {
        let index = filled_index();
        assert_eq!(
            index.locate(&position(1.5, 0.1, 1600.0)),
            Err(LookupFailure::OutsideEta)
        );
    }

    #[test]
    fn test_bin_edge_goes_to_left_cell() {
        let index = filled_index();
        // 0.0 is the edge between eta bins 9 and 10, 0.0 is also a phi edge (8 bins below)
        assert_eq!(index.bin_of(0.0, 0.0), Some((9, 7)));
        assert_eq!(index.bin_of(1e-9, 1e-9), Some((10, 8)));
        assert_eq!(index.bin_of(-1.0, 0.1), None);
        assert_eq!(index.bin_of(1.0, 0.1), None);
    }

    #[test]
    fn test_missing_cell_is_reported() {
        let layer = layer();
        let mut index = SpatialIndex::new(&layer).unwrap();
        let geometry = layer.generate_cells().next().unwrap();
        index
            .push(Cell::new(geometry, BunchCrossing::default()))
            .unwrap();
        assert_eq!(
            index.locate(&position(0.05, 0.1, 1600.0)),
            Err(LookupFailure::MissingCell {
                eta_bin: 10,
                phi_bin: 8
            })
        );
    }

    #[test]
    fn test_duplicate_cell_rejected() {
        let layer = layer();
        let mut index = SpatialIndex::new(&layer).unwrap();
        let geometry = layer.generate_cells().next().unwrap();
        index
            .push(Cell::new(geometry.clone(), BunchCrossing::default()))
            .unwrap();
        assert_eq!(
            index.push(Cell::new(geometry, BunchCrossing::default())),
            Err(CaloError::DuplicateCell {
                sampling: CaloSampling::EMB2,
                eta_bin: 0,
                phi_bin: 0
            })
        );
    }

    #[test]
    fn test_cells_in_window_wraps_phi() {
        let index = filled_index();
        let dphi = 2.0 * PI / 16.0;
        // seed in the last phi bin, window of one bin on each side
        let seed_phi = PI - dphi / 2.0;
        let handles = index.cells_in_window(0.05, seed_phi, 0.1 + 1e-9, dphi + 1e-9);
        // 3 eta bins x 3 phi bins, the third phi bin across the seam
        assert_eq!(handles.len(), 9);
        assert!(handles
            .iter()
            .any(|&h| (index.cell(h).phi() + PI - dphi / 2.0).abs() < 1e-9));
    }

    #[test]
    fn test_clear_resets_cells() {
        let mut index = filled_index();
        let pos = position(0.05, 0.1, 1600.0);
        index.retrieve_mut(&pos).unwrap().fill(10.0, 0.0);
        assert_eq!(index.retrieve(&pos).unwrap().energy(), 10.0);
        index.clear();
        assert_eq!(index.retrieve(&pos).unwrap().energy(), 0.0);
        assert_eq!(index.len(), 320);
    }
}
