//! # Calorimeter cells
//!
//! A [`Cell`] couples the static geometry of one readout channel ([`CellGeometry`])
//! with the [`TimeDigitizer`] accumulating its energy. The geometry is fixed once the
//! cell is built; only the digitizer changes during a run.
//!
//! ```text
//! Cell
//! ├── geometry  (eta, phi, half-widths, radial range, hash, channels, sampling)
//! └── digitizer (time edges, samples, total energy, truth energy)
//! ```
pub mod sampling;

use crate::{
    constants::{Eta, MeV, Millimeter, Nanosecond, Radian},
    time_digitizer::{BunchCrossing, TimeDigitizer},
};
use sampling::{CaloLayer, CaloSampling};

/// Static description of a cell, as read from a `C` geometry directive.
///
/// # Fields
///
/// * `sampling` - The calorimeter sampling the cell belongs to
/// * `eta`, `phi` - Cell center
/// * `deta`, `dphi` - Half-widths of the cell in eta and phi
/// * `rmin`, `rmax` - Transverse radial extent in mm
/// * `hash` - Unique text identifier of the cell
/// * `eta_channel`, `phi_channel` - Readout channel indices inside the sampling
#[derive(Debug, Clone, PartialEq)]
pub struct CellGeometry {
    pub sampling: CaloSampling,
    pub eta: Eta,
    pub phi: Radian,
    pub deta: Eta,
    pub dphi: Radian,
    pub rmin: Millimeter,
    pub rmax: Millimeter,
    pub hash: String,
    pub eta_channel: u32,
    pub phi_channel: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    geometry: CellGeometry,
    digitizer: TimeDigitizer,
}

impl Cell {
    pub fn new(geometry: CellGeometry, bunch_crossing: BunchCrossing) -> Self {
        Cell {
            geometry,
            digitizer: TimeDigitizer::new(bunch_crossing),
        }
    }

    pub fn geometry(&self) -> &CellGeometry {
        &self.geometry
    }

    pub fn digitizer(&self) -> &TimeDigitizer {
        &self.digitizer
    }

    pub fn sampling(&self) -> CaloSampling {
        self.geometry.sampling
    }

    pub fn layer(&self) -> CaloLayer {
        self.geometry.sampling.layer()
    }

    pub fn eta(&self) -> Eta {
        self.geometry.eta
    }

    pub fn phi(&self) -> Radian {
        self.geometry.phi
    }

    pub fn deta(&self) -> Eta {
        self.geometry.deta
    }

    pub fn dphi(&self) -> Radian {
        self.geometry.dphi
    }

    pub fn hash(&self) -> &str {
        &self.geometry.hash
    }

    /// Total digitized energy, all bunch crossings included.
    pub fn energy(&self) -> MeV {
        self.digitizer.total_energy()
    }

    pub fn truth_energy(&self) -> MeV {
        self.digitizer.truth_energy()
    }

    /// Energy sampled in the truth bunch crossing only.
    pub fn raw_energy(&self) -> MeV {
        self.digitizer.raw_energy()
    }

    pub fn samples(&self) -> &[MeV] {
        self.digitizer.samples()
    }

    /// `(E - E_truth) / E_truth`, or `None` when the cell received no truth energy.
    pub fn relative_residual(&self) -> Option<f64> {
        let truth = self.truth_energy();
        if truth == 0.0 {
            return None;
        }
        Some((self.energy() - truth) / truth)
    }

    pub fn fill(&mut self, energy: MeV, time: Nanosecond) -> Option<usize> {
        self.digitizer.fill(energy, time)
    }

    pub fn clear(&mut self) {
        self.digitizer.clear();
    }
}
