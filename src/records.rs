//! # Flat event records
//!
//! One event is flattened into a list of [`CellRecord`] and a list of [`ClusterRecord`],
//! ready to be written as CSV by [`write_cells_csv`] and [`write_clusters_csv`].
//!
//! Only cells that received energy (digitized or truth) are recorded. Every floating point
//! field is finite: ratios go through [`safe_ratio`] and empty sums are zero.
use std::io::Write;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    calo_cell::{sampling::CaloLayer, Cell},
    calo_errors::CaloError,
    cluster::{
        shower_shapes::{safe_ratio, ShowerShapes},
        Cluster, ClusterBuilder,
    },
    constants::{Eta, MeV, Millimeter, Radian},
    detector::CaloDetector,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellRecord {
    pub sampling: u32,
    pub hash: String,
    pub eta: Eta,
    pub phi: Radian,
    pub deta: Eta,
    pub dphi: Radian,
    pub rmin: Millimeter,
    pub rmax: Millimeter,
    pub eta_channel: u32,
    pub phi_channel: u32,
    pub energy: MeV,
    pub truth_energy: MeV,
    pub raw_energy: MeV,
    /// Time samples joined with `;`
    pub samples: String,
}

impl From<&Cell> for CellRecord {
    fn from(cell: &Cell) -> Self {
        let geometry = cell.geometry();
        CellRecord {
            sampling: geometry.sampling.id(),
            hash: geometry.hash.clone(),
            eta: geometry.eta,
            phi: geometry.phi,
            deta: geometry.deta,
            dphi: geometry.dphi,
            rmin: geometry.rmin,
            rmax: geometry.rmax,
            eta_channel: geometry.eta_channel,
            phi_channel: geometry.phi_channel,
            energy: cell.energy(),
            truth_energy: cell.truth_energy(),
            raw_energy: cell.raw_energy(),
            samples: cell.samples().iter().join(";"),
        }
    }
}

/// Raw and calibrated window sums of one layer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerSums {
    pub raw: MeV,
    pub calibrated: MeV,
}

/// One cluster, flattened.
///
/// The per-layer sums use the `eta_ncell × phi_ncell` window of the builder configuration.
/// `truth_index` and `truth_dr` are empty when the cluster has no matched particle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterRecord {
    pub seed_sampling: u32,
    pub eta: Eta,
    pub phi: Radian,
    pub n_cells: usize,
    pub energy: MeV,
    pub truth_energy: MeV,
    pub truth_index: Option<usize>,
    pub truth_dr: Option<f64>,
    pub ps_raw: MeV,
    pub ps: MeV,
    pub em1_raw: MeV,
    pub em1: MeV,
    pub em2_raw: MeV,
    pub em2: MeV,
    pub em3_raw: MeV,
    pub em3: MeV,
    pub had1_raw: MeV,
    pub had1: MeV,
    pub had2_raw: MeV,
    pub had2: MeV,
    pub had3_raw: MeV,
    pub had3: MeV,
    pub e233: MeV,
    pub e237: MeV,
    pub e277: MeV,
    pub reta: f64,
    pub rphi: f64,
    pub f0: f64,
    pub f1: f64,
    pub f2: f64,
    pub f3: f64,
    pub rhad: f64,
    pub weta2: f64,
    /// `(E - E_truth) / E_truth` of the whole cluster, zero without truth energy
    pub residual: f64,
}

impl ClusterRecord {
    pub fn new(builder: &ClusterBuilder, detector: &CaloDetector, cluster: &Cluster) -> Self {
        let config = builder.config();
        let sums = |layer| LayerSums {
            raw: builder.sum_energy(detector, cluster, layer, config.eta_ncell, config.phi_ncell, true),
            calibrated: builder.sum_energy(
                detector,
                cluster,
                layer,
                config.eta_ncell,
                config.phi_ncell,
                false,
            ),
        };
        let [ps, em1, em2, em3, had1, had2, had3] = CaloLayer::ALL.map(sums);
        let shapes = ShowerShapes::compute(builder, detector, cluster);
        let energy = cluster.energy(detector);
        let truth_energy = cluster.truth_energy(detector);
        let truth = cluster.truth();

        ClusterRecord {
            seed_sampling: cluster.seed().sampling.id(),
            eta: cluster.eta(),
            phi: cluster.phi(),
            n_cells: cluster.members().len(),
            energy,
            truth_energy,
            truth_index: truth.map(|m| m.index),
            truth_dr: truth.map(|m| m.delta_r),
            ps_raw: ps.raw,
            ps: ps.calibrated,
            em1_raw: em1.raw,
            em1: em1.calibrated,
            em2_raw: em2.raw,
            em2: em2.calibrated,
            em3_raw: em3.raw,
            em3: em3.calibrated,
            had1_raw: had1.raw,
            had1: had1.calibrated,
            had2_raw: had2.raw,
            had2: had2.calibrated,
            had3_raw: had3.raw,
            had3: had3.calibrated,
            e233: shapes.e233,
            e237: shapes.e237,
            e277: shapes.e277,
            reta: shapes.reta,
            rphi: shapes.rphi,
            f0: shapes.f0,
            f1: shapes.f1,
            f2: shapes.f2,
            f3: shapes.f3,
            rhad: shapes.rhad,
            weta2: shapes.weta2,
            residual: safe_ratio(energy - truth_energy, truth_energy),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventRecords {
    pub cells: Vec<CellRecord>,
    pub clusters: Vec<ClusterRecord>,
}

impl EventRecords {
    pub fn from_event(builder: &ClusterBuilder, detector: &CaloDetector, clusters: &[Cluster]) -> Self {
        EventRecords {
            cells: detector
                .cells()
                .filter(|(_, cell)| cell.energy() != 0.0 || cell.truth_energy() != 0.0)
                .map(|(_, cell)| CellRecord::from(cell))
                .collect(),
            clusters: clusters
                .iter()
                .map(|cluster| ClusterRecord::new(builder, detector, cluster))
                .collect(),
        }
    }
}

fn write_csv<W: Write, R: Serialize>(writer: W, records: &[R]) -> Result<(), CaloError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the cell records as CSV, header line included.
pub fn write_cells_csv<W: Write>(writer: W, cells: &[CellRecord]) -> Result<(), CaloError> {
    write_csv(writer, cells)
}

/// Write the cluster records as CSV, header line included.
pub fn write_clusters_csv<W: Write>(writer: W, clusters: &[ClusterRecord]) -> Result<(), CaloError> {
    write_csv(writer, clusters)
}
