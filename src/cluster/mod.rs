//! # Cluster building
//!
//! This module groups digitized cells into clusters around seed cells and compares them to
//! the generated particles.
//!
//! ## Algorithm
//!
//! 1. **Seeds** – every cell of the seed samplings whose total energy exceeds
//!    [`ClusterConfig::min_center_energy`].
//! 2. **Members** – for each seed, every cell of every sampling whose center lies within
//!    `|Δeta| <= eta_window` and `|Δphi| <= phi_window` of the seed, with `Δphi` wrapped into
//!    `(-π, π]`. The seed is always a member.
//! 3. **Truth match** – the generated particle closest in `ΔR` to the seed, rejected when
//!    further than [`ClusterConfig::max_match_dr`].
//!
//! Seeds are processed independently: clusters built from nearby seeds may share cells.
//! Deduplication is left to whoever consumes the clusters.
//!
//! ## Shower shapes
//!
//! [`ClusterBuilder::sum_energy`] sums the cells of one layer inside a window of
//! `eta_ncell × phi_ncell` cells centered on the seed. Those sums are the building blocks
//! of the observables in [`shower_shapes`].
pub mod shower_shapes;

use std::ops::RangeInclusive;

use tracing::debug;

use crate::{
    calo_cell::{
        sampling::{CaloLayer, CaloSampling},
        Cell,
    },
    constants::{Eta, MeV, Radian},
    coordinates::delta_r,
    detector::{CaloDetector, CellRef},
    truth_particle::TruthParticle,
};

/// Parameters of the cluster builder.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    /// Half-size of the member window in eta.
    pub eta_window: Eta,
    /// Half-size of the member window in phi (radians).
    pub phi_window: Radian,
    /// Minimum total energy of a seed cell (MeV), strict.
    pub min_center_energy: MeV,
    /// Maximum seed-to-particle distance for a truth match (`None` = unlimited).
    pub max_match_dr: Option<f64>,
    /// Samplings searched for seeds (empty = all samplings).
    pub seed_samplings: Vec<CaloSampling>,
    /// Shower-shape window reported per layer, in cells.
    pub eta_ncell: usize,
    pub phi_ncell: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            eta_window: 0.4,
            phi_window: 0.4,
            min_center_energy: 1000.0,
            max_match_dr: Some(0.1),
            seed_samplings: Vec::new(),
            eta_ncell: 3,
            phi_ncell: 3,
        }
    }
}

impl ClusterConfig {
    pub fn with_eta_window(mut self, eta_window: Eta) -> Self {
        self.eta_window = eta_window;
        self
    }

    pub fn with_phi_window(mut self, phi_window: Radian) -> Self {
        self.phi_window = phi_window;
        self
    }

    pub fn with_min_center_energy(mut self, energy: MeV) -> Self {
        self.min_center_energy = energy;
        self
    }

    pub fn with_max_match_dr(mut self, max_dr: Option<f64>) -> Self {
        self.max_match_dr = max_dr;
        self
    }

    pub fn with_seed_samplings(mut self, samplings: Vec<CaloSampling>) -> Self {
        self.seed_samplings = samplings;
        self
    }

    pub fn with_shape_window(mut self, eta_ncell: usize, phi_ncell: usize) -> Self {
        self.eta_ncell = eta_ncell;
        self.phi_ncell = phi_ncell;
        self
    }

    fn is_seed_sampling(&self, sampling: CaloSampling) -> bool {
        self.seed_samplings.is_empty() || self.seed_samplings.contains(&sampling)
    }
}

/// A truth particle paired with a cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruthMatch {
    /// Index in the truth particle slice given to the builder
    pub index: usize,
    pub delta_r: f64,
}

/// Cells gathered around one seed.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    seed: CellRef,
    eta: Eta,
    phi: Radian,
    members: Vec<CellRef>,
    truth: Option<TruthMatch>,
}

impl Cluster {
    pub fn seed(&self) -> CellRef {
        self.seed
    }

    /// Seed center in eta.
    pub fn eta(&self) -> Eta {
        self.eta
    }

    /// Seed center in phi.
    pub fn phi(&self) -> Radian {
        self.phi
    }

    pub fn members(&self) -> &[CellRef] {
        &self.members
    }

    pub fn truth(&self) -> Option<TruthMatch> {
        self.truth
    }

    /// Member cells, resolved in `detector`.
    pub fn cells<'a>(&'a self, detector: &'a CaloDetector) -> impl Iterator<Item = &'a Cell> + 'a {
        self.members
            .iter()
            .filter_map(move |&cell_ref| detector.cell(cell_ref))
    }

    /// Total calibrated energy of the member cells.
    pub fn energy(&self, detector: &CaloDetector) -> MeV {
        self.cells(detector).map(Cell::energy).fold(0.0, |acc, e| acc + e)
    }

    /// Total truth energy of the member cells.
    pub fn truth_energy(&self, detector: &CaloDetector) -> MeV {
        self.cells(detector)
            .map(Cell::truth_energy)
            .fold(0.0, |acc, e| acc + e)
    }

    /// Calibrated energy of the member cells of one layer, whatever their distance to the seed.
    pub fn layer_energy(&self, detector: &CaloDetector, layer: CaloLayer) -> MeV {
        self.cells(detector)
            .filter(|cell| cell.layer() == layer)
            .map(Cell::energy)
            .fold(0.0, |acc, e| acc + e)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClusterBuilder {
    config: ClusterConfig,
}

impl ClusterBuilder {
    pub fn new(config: ClusterConfig) -> Self {
        ClusterBuilder { config }
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Build one cluster per seed cell and match each to the closest truth particle.
    ///
    /// Arguments
    /// -----------------
    /// * `detector`: the digitized cells of the event.
    /// * `truth`: generated particles of the event.
    ///
    /// Return
    /// ----------
    /// * The clusters, in seed order (sampling, then cell handle).
    pub fn build_clusters(&self, detector: &CaloDetector, truth: &[TruthParticle]) -> Vec<Cluster> {
        let clusters: Vec<Cluster> = detector
            .cells()
            .filter(|(cell_ref, cell)| {
                self.config.is_seed_sampling(cell_ref.sampling)
                    && cell.energy() > self.config.min_center_energy
            })
            .map(|(seed, cell)| {
                let mut cluster = Cluster {
                    seed,
                    eta: cell.eta(),
                    phi: cell.phi(),
                    members: self.collect_members(detector, cell.eta(), cell.phi()),
                    truth: None,
                };
                cluster.truth = self.match_to_truth(&cluster, truth);
                cluster
            })
            .collect();

        debug!(
            clusters = clusters.len(),
            matched = clusters.iter().filter(|c| c.truth.is_some()).count(),
            "clusters built"
        );
        clusters
    }

    fn collect_members(&self, detector: &CaloDetector, eta: Eta, phi: Radian) -> Vec<CellRef> {
        detector
            .indices()
            .flat_map(|index| {
                let sampling = index.sampling();
                index
                    .cells_in_window(eta, phi, self.config.eta_window, self.config.phi_window)
                    .into_iter()
                    .map(move |handle| CellRef { sampling, handle })
            })
            .collect()
    }

    /// Sum the energy of the member cells of `layer` inside an `eta_ncell × phi_ncell`
    /// window of cells centered on the seed.
    ///
    /// In each sampling of `layer` the window is centered on the cell whose bin contains the
    /// seed position, and counted in bins of that sampling (phi wraps on full-circle grids).
    /// Even sizes extend one bin further towards lower indices.
    ///
    /// Arguments
    /// -----------------
    /// * `raw`: sum the samples of the truth bunch crossing instead of the total energy.
    pub fn sum_energy(
        &self,
        detector: &CaloDetector,
        cluster: &Cluster,
        layer: CaloLayer,
        eta_ncell: usize,
        phi_ncell: usize,
        raw: bool,
    ) -> MeV {
        window_cells(detector, cluster, layer, eta_ncell, phi_ncell)
            .map(|cell| if raw { cell.raw_energy() } else { cell.energy() })
            .fold(0.0, |acc, e| acc + e)
    }

    /// The truth particle closest to the cluster seed, if within `max_match_dr`.
    pub fn match_to_truth(&self, cluster: &Cluster, truth: &[TruthParticle]) -> Option<TruthMatch> {
        truth
            .iter()
            .enumerate()
            .map(|(index, particle)| TruthMatch {
                index,
                delta_r: delta_r(cluster.eta, cluster.phi, particle.eta, particle.phi),
            })
            .filter(|candidate| !candidate.delta_r.is_nan())
            .min_by(|a, b| a.delta_r.total_cmp(&b.delta_r))
            .filter(|best| self.config.max_match_dr.is_none_or(|max| best.delta_r <= max))
    }
}

/// Signed bin offsets covered by a centered window of `ncell` cells.
fn window_offsets(ncell: usize) -> RangeInclusive<i64> {
    let n = ncell as i64;
    -(n / 2)..=(n - 1).div_euclid(2)
}

/// Member cells of `layer` inside the `eta_ncell × phi_ncell` window around the seed.
pub(crate) fn window_cells<'a>(
    detector: &'a CaloDetector,
    cluster: &'a Cluster,
    layer: CaloLayer,
    eta_ncell: usize,
    phi_ncell: usize,
) -> impl Iterator<Item = &'a Cell> + 'a {
    let eta_offsets = window_offsets(eta_ncell);
    let phi_offsets = window_offsets(phi_ncell);

    cluster.members.iter().filter_map(move |&cell_ref| {
        if cell_ref.sampling.layer() != layer {
            return None;
        }
        let index = detector.index(cell_ref.sampling)?;
        let (eta_offset, phi_offset) = index.bin_offset(cluster.eta, cluster.phi, cell_ref.handle)?;
        (eta_offsets.contains(&eta_offset) && phi_offsets.contains(&phi_offset))
            .then(|| index.cell(cell_ref.handle))
    })
}
