//! # Shower shape observables
//!
//! Energy ratios describing the lateral and longitudinal profile of a cluster.
//! Window sums are named `e<layer><eta cells><phi cells>`:
//!
//! | Observable | Definition                                         |
//! |------------|----------------------------------------------------|
//! | `reta`     | `e237 / e277`                                      |
//! | `rphi`     | `e233 / e237`                                      |
//! | `f0..f3`   | energy of PS, EM1, EM2, EM3 / total EM energy       |
//! | `rhad`     | total hadronic energy / total EM energy            |
//! | `weta2`    | energy-weighted eta spread in EM2, 3×5 window       |
//!
//! Every ratio is `0.0` when its denominator vanishes, so no NaN or infinity can reach the
//! reported records.
use serde::Serialize;

use crate::{
    calo_cell::sampling::CaloLayer,
    cluster::{window_cells, Cluster, ClusterBuilder},
    constants::MeV,
    detector::CaloDetector,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ShowerShapes {
    pub e233: MeV,
    pub e237: MeV,
    pub e277: MeV,
    pub em_energy: MeV,
    pub had_energy: MeV,
    pub reta: f64,
    pub rphi: f64,
    pub f0: f64,
    pub f1: f64,
    pub f2: f64,
    pub f3: f64,
    pub rhad: f64,
    pub weta2: f64,
}

/// `numerator / denominator`, or zero when the quotient is not finite.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

impl ShowerShapes {
    pub fn compute(builder: &ClusterBuilder, detector: &CaloDetector, cluster: &Cluster) -> Self {
        let e233 = builder.sum_energy(detector, cluster, CaloLayer::EM2, 3, 3, false);
        let e237 = builder.sum_energy(detector, cluster, CaloLayer::EM2, 3, 7, false);
        let e277 = builder.sum_energy(detector, cluster, CaloLayer::EM2, 7, 7, false);

        let layer_energy = |layer| cluster.layer_energy(detector, layer);
        let e0 = layer_energy(CaloLayer::PS);
        let e1 = layer_energy(CaloLayer::EM1);
        let e2 = layer_energy(CaloLayer::EM2);
        let e3 = layer_energy(CaloLayer::EM3);
        let em_energy = e0 + e1 + e2 + e3;
        let had_energy: MeV = CaloLayer::ALL
            .into_iter()
            .filter(|layer| layer.is_hadronic())
            .map(layer_energy)
            .fold(0.0, |acc, e| acc + e);

        ShowerShapes {
            e233,
            e237,
            e277,
            em_energy,
            had_energy,
            reta: safe_ratio(e237, e277),
            rphi: safe_ratio(e233, e237),
            f0: safe_ratio(e0, em_energy),
            f1: safe_ratio(e1, em_energy),
            f2: safe_ratio(e2, em_energy),
            f3: safe_ratio(e3, em_energy),
            rhad: safe_ratio(had_energy, em_energy),
            weta2: weta2(detector, cluster),
        }
    }
}

fn weta2(detector: &CaloDetector, cluster: &Cluster) -> f64 {
    let (sum_e, sum_e_eta, sum_e_eta2) = window_cells(detector, cluster, CaloLayer::EM2, 3, 5)
        .fold((0.0, 0.0, 0.0), |(e, e_eta, e_eta2), cell| {
            let energy = cell.energy();
            (
                e + energy,
                e_eta + energy * cell.eta(),
                e_eta2 + energy * cell.eta() * cell.eta(),
            )
        });
    let mean = safe_ratio(sum_e_eta, sum_e);
    let variance = safe_ratio(sum_e_eta2, sum_e) - mean * mean;
    if variance > 0.0 {
        variance.sqrt()
    } else {
        0.0
    }
}
