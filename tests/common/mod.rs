#![allow(dead_code)]

use std::f64::consts::PI;

use calodigit::{
    calo_cell::sampling::CaloSampling,
    detector::{CaloDetector, StepRecord},
    env_state::CaloEnv,
    geometry::{DetectorGeometry, LayerDirective},
    time_digitizer::BunchCrossing,
};
use nalgebra::Vector3;

pub const EMB2_RADIUS: f64 = 1750.0;
pub const TILE_RADIUS: f64 = 2500.0;

pub fn barrel_layer(
    sampling: CaloSampling,
    eta_bins: usize,
    phi_bins: usize,
    rmin: f64,
    rmax: f64,
) -> LayerDirective {
    LayerDirective {
        sampling,
        eta_min: -1.4,
        eta_max: 1.4,
        eta_bins,
        phi_min: -PI,
        phi_max: PI,
        phi_bins,
        rmin,
        rmax,
    }
}

/// EMB1 / EMB2 / TileCal1 barrel with the granularity of the real detector.
pub fn barrel_geometry() -> DetectorGeometry {
    let mut geometry = DetectorGeometry::new();
    for layer in [
        barrel_layer(CaloSampling::EMB1, 448, 64, 1500.0, 1600.0),
        barrel_layer(CaloSampling::EMB2, 112, 256, 1600.0, 1900.0),
        barrel_layer(CaloSampling::TileCal1, 28, 64, 2300.0, 2700.0),
    ] {
        geometry
            .add_uniform_layer(layer)
            .expect("valid barrel layer");
    }
    geometry
}

pub fn barrel_detector(env: &CaloEnv) -> CaloDetector {
    CaloDetector::from_geometry(env, &barrel_geometry(), BunchCrossing::default())
        .expect("valid barrel detector")
}

/// Cartesian point at transverse radius `r` in direction `(eta, phi)`.
pub fn position(eta: f64, phi: f64, r: f64) -> Vector3<f64> {
    Vector3::new(r * phi.cos(), r * phi.sin(), r * eta.sinh())
}

pub fn step(eta: f64, phi: f64, r: f64, energy: f64, time: f64) -> StepRecord {
    StepRecord::new(position(eta, phi, r), energy, time)
}
