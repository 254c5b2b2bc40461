//! # Calorimeter detector
//!
//! [`CaloDetector`] owns one [`SpatialIndex`] per configured sampling and routes every
//! transport step to the cells it hits. It is the mutable state of one worker: a detector
//! instance must never be shared between threads processing different events.
//!
//! ## Step processing
//!
//! Every sampling is asked to locate the step position. Each sampling that returns a cell
//! has that cell's digitizer filled; in practice the radial ranges of the samplings do not
//! overlap and a step fills at most one cell. Steps that no sampling accepts are dropped and
//! counted; in-range positions without a cell are reported as lookup misses. Neither case
//! interrupts the event.

use std::collections::BTreeMap;

use nalgebra::Vector3;

use crate::{
    calo_cell::{sampling::CaloSampling, Cell},
    calo_errors::CaloError,
    constants::{MeV, Nanosecond},
    env_state::CaloEnv,
    geometry::DetectorGeometry,
    spatial_index::{CellHandle, LookupFailure, SpatialIndex},
    time_digitizer::BunchCrossing,
};

/// One energy deposit delivered by the transport engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRecord {
    /// Pre-step position in mm
    pub position: Vector3<f64>,
    /// Deposited energy in MeV
    pub energy_deposit: MeV,
    /// Global time of the step in ns
    pub global_time: Nanosecond,
}

impl StepRecord {
    pub fn new(position: Vector3<f64>, energy_deposit: MeV, global_time: Nanosecond) -> Self {
        StepRecord {
            position,
            energy_deposit,
            global_time,
        }
    }
}

/// What happened to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The deposit was handed to the cells of `layers` samplings
    Deposited { layers: usize },
    /// No sampling covers the position
    OutOfAcceptance,
    /// A sampling covers the position but has no cell for it
    LookupMiss,
}

/// Address of a cell across the whole detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub sampling: CaloSampling,
    pub handle: CellHandle,
}

#[derive(Debug, Clone)]
pub struct CaloDetector {
    bunch_crossing: BunchCrossing,
    indices: BTreeMap<CaloSampling, SpatialIndex>,
}

impl CaloDetector {
    /// Build every sampling index and its cells from a geometry description.
    ///
    /// Arguments
    /// -----------------
    /// * `env`: message context used to report the configuration error, if any.
    /// * `geometry`: layer and cell directives.
    /// * `bunch_crossing`: time binning given to every cell digitizer.
    ///
    /// Return
    /// ----------
    /// * The detector, or the first configuration error (invalid binning, cell outside its
    ///   grid, duplicate cell, cells of an undeclared sampling).
    pub fn from_geometry(
        env: &CaloEnv,
        geometry: &DetectorGeometry,
        bunch_crossing: BunchCrossing,
    ) -> Result<Self, CaloError> {
        Self::build(geometry, bunch_crossing).map_err(|err| env.configuration_error(err))
    }

    fn build(geometry: &DetectorGeometry, bunch_crossing: BunchCrossing) -> Result<Self, CaloError> {
        geometry.validate()?;
        let mut indices = BTreeMap::new();
        for layer in geometry.layers() {
            let mut index = SpatialIndex::new(layer)?;
            for cell in geometry.cells(layer.sampling) {
                index.push(Cell::new(cell.clone(), bunch_crossing))?;
            }
            tracing::debug!(sampling = %layer.sampling, cells = index.len(), "sampling ready");
            indices.insert(layer.sampling, index);
        }
        Ok(CaloDetector {
            bunch_crossing,
            indices,
        })
    }

    pub fn bunch_crossing(&self) -> &BunchCrossing {
        &self.bunch_crossing
    }

    pub fn samplings(&self) -> impl Iterator<Item = CaloSampling> + '_ {
        self.indices.keys().copied()
    }

    pub fn index(&self, sampling: CaloSampling) -> Option<&SpatialIndex> {
        self.indices.get(&sampling)
    }

    pub fn indices(&self) -> impl Iterator<Item = &SpatialIndex> {
        self.indices.values()
    }

    pub fn n_cells(&self) -> usize {
        self.indices.values().map(SpatialIndex::len).sum()
    }

    pub fn cell(&self, cell_ref: CellRef) -> Option<&Cell> {
        self.indices
            .get(&cell_ref.sampling)
            .filter(|index| cell_ref.handle.index() < index.len())
            .map(|index| index.cell(cell_ref.handle))
    }

    /// Every cell of the detector, sampling by sampling.
    pub fn cells(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.indices.iter().flat_map(|(&sampling, index)| {
            index
                .cells()
                .map(move |(handle, cell)| (CellRef { sampling, handle }, cell))
        })
    }

    /// Route one step to the cells it hits.
    pub fn process_step(&mut self, env: &mut CaloEnv, step: &StepRecord) -> StepOutcome {
        let mut layers = 0;
        let mut missed = false;

        for (&sampling, index) in self.indices.iter_mut() {
            match index.locate(&step.position) {
                Ok(handle) => {
                    index
                        .cell_mut(handle)
                        .fill(step.energy_deposit, step.global_time);
                    layers += 1;
                }
                Err(LookupFailure::MissingCell { eta_bin, phi_bin }) => {
                    env.report_lookup_miss(sampling, eta_bin, phi_bin, &step.position);
                    missed = true;
                }
                Err(_) => {}
            }
        }

        if layers > 0 {
            StepOutcome::Deposited { layers }
        } else if missed {
            StepOutcome::LookupMiss
        } else {
            env.record_out_of_acceptance(&step.position);
            StepOutcome::OutOfAcceptance
        }
    }

    /// Zero every cell before the next event.
    pub fn clear(&mut self) {
        self.indices.values_mut().for_each(SpatialIndex::clear);
    }
}

#[cfg(test)]
mod detector_test {
    use super::*;
    use crate::geometry::LayerDirective;
    use std::f64::consts::PI;

    fn layer(sampling: CaloSampling, rmin: f64, rmax: f64) -> LayerDirective {
        LayerDirective {
            sampling,
            eta_min: -1.0,
            eta_max: 1.0,
            eta_bins: 10,
            phi_min: -PI,
            phi_max: PI,
            phi_bins: 8,
            rmin,
            rmax,
        }
    }

    fn detector(env: &CaloEnv) -> CaloDetector {
        let mut geometry = DetectorGeometry::new();
        geometry
            .add_uniform_layer(layer(CaloSampling::EMB1, 1500.0, 1600.0))
            .unwrap();
        geometry
            .add_uniform_layer(layer(CaloSampling::EMB2, 1600.0, 1900.0))
            .unwrap();
        CaloDetector::from_geometry(env, &geometry, BunchCrossing::default()).unwrap()
    }

    #[test]
    fn test_step_routing() {
        let mut env = CaloEnv::new("detector");
        let mut det = detector(&env);
        assert_eq!(det.n_cells(), 160);

        let step = StepRecord::new(Vector3::new(1700.0, 10.0, 5.0), 12.0, 1.0);
        assert_eq!(
            det.process_step(&mut env, &step),
            StepOutcome::Deposited { layers: 1 }
        );
        let hit: Vec<_> = det.cells().filter(|(_, c)| c.energy() > 0.0).collect();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].0.sampling, CaloSampling::EMB2);
        assert_eq!(hit[0].1.energy(), 12.0);

        let outside = StepRecord::new(Vector3::new(100.0, 10.0, 5.0), 12.0, 1.0);
        assert_eq!(
            det.process_step(&mut env, &outside),
            StepOutcome::OutOfAcceptance
        );
        assert_eq!(env.out_of_acceptance(), 1);

        det.clear();
        assert!(det.cells().all(|(_, c)| c.energy() == 0.0));
    }

    #[test]
    fn test_lookup_miss_does_not_abort() {
        let mut env = CaloEnv::new("detector");
        let mut geometry = DetectorGeometry::new();
        let emb2 = layer(CaloSampling::EMB2, 1600.0, 1900.0);
        geometry.add_layer(emb2).unwrap();
        // only the first cell is declared
        geometry.add_cell(emb2.generate_cells().next().unwrap());
        let mut det = CaloDetector::from_geometry(&env, &geometry, BunchCrossing::default()).unwrap();

        let step = StepRecord::new(Vector3::new(1700.0, 10.0, 5.0), 12.0, 1.0);
        assert_eq!(det.process_step(&mut env, &step), StepOutcome::LookupMiss);
        assert_eq!(env.lookup_misses(), 1);
        assert_eq!(env.out_of_acceptance(), 0);
    }

    #[test]
    fn test_configuration_error_is_fatal() {
        let env = CaloEnv::new("detector");
        let mut geometry = DetectorGeometry::new();
        let emb2 = layer(CaloSampling::EMB2, 1600.0, 1900.0);
        geometry.add_layer(emb2).unwrap();
        let cell = emb2.generate_cells().next().unwrap();
        geometry.add_cell(cell.clone());
        geometry.add_cell(cell);
        assert_eq!(
            CaloDetector::from_geometry(&env, &geometry, BunchCrossing::default()).unwrap_err(),
            CaloError::DuplicateCell {
                sampling: CaloSampling::EMB2,
                eta_bin: 0,
                phi_bin: 0
            }
        );
    }
}
