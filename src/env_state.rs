//! # Run environment
//!
//! This module defines [`CaloEnv`], the **message context** handed explicitly to every
//! operation that may need to report a problem. There is no global message service: each
//! worker thread owns its own `CaloEnv` together with its own detector state.
//!
//! ## Responsibilities
//!
//! 1. Emit configuration errors through `tracing` (once, at the point where the run aborts).
//! 2. Report lookup misses (an in-range step with no cell behind it, i.e. an inconsistent
//!    grid) without interrupting step processing.
//! 3. Count the per-step data problems that were absorbed, so that the caller can check them
//!    at the end of an event or of the run.
//!
//! ```text
//! CaloEnv
//! ├── run_name           (tracing field)
//! ├── lookup_misses      (in-range positions with no cell)
//! └── out_of_acceptance  (steps outside every sampling, silently dropped)
//! ```
use nalgebra::Vector3;
use tracing::{debug, error, warn};

use crate::{calo_cell::sampling::CaloSampling, calo_errors::CaloError};

#[derive(Debug, Clone, Default)]
pub struct CaloEnv {
    run_name: String,
    lookup_misses: u64,
    out_of_acceptance: u64,
}

impl CaloEnv {
    pub fn new(run_name: impl Into<String>) -> Self {
        CaloEnv {
            run_name: run_name.into(),
            ..Default::default()
        }
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    /// Number of lookup misses reported since the start of the run.
    pub fn lookup_misses(&self) -> u64 {
        self.lookup_misses
    }

    /// Number of steps that fell outside every sampling since the start of the run.
    pub fn out_of_acceptance(&self) -> u64 {
        self.out_of_acceptance
    }

    /// Report a fatal configuration error and hand it back for propagation.
    pub fn configuration_error(&self, err: CaloError) -> CaloError {
        error!(run = %self.run_name, "geometry configuration failed: {err}");
        err
    }

    /// Report a step whose position is inside the grid of `sampling` but maps to no cell.
    pub fn report_lookup_miss(
        &mut self,
        sampling: CaloSampling,
        eta_bin: usize,
        phi_bin: usize,
        position: &Vector3<f64>,
    ) {
        self.lookup_misses += 1;
        warn!(
            run = %self.run_name,
            %sampling,
            eta_bin,
            phi_bin,
            x = position.x,
            y = position.y,
            z = position.z,
            "no cell registered for an in-range position, deposit dropped"
        );
    }

    pub fn record_out_of_acceptance(&mut self, position: &Vector3<f64>) {
        self.out_of_acceptance += 1;
        debug!(
            run = %self.run_name,
            x = position.x,
            y = position.y,
            z = position.z,
            "step outside the calorimeter acceptance"
        );
    }
}

#[cfg(test)]
mod env_state_test {
    use super::*;

    #[test]
    fn test_counters() {
        let mut env = CaloEnv::new("unit");
        let position = Vector3::new(1.0, 2.0, 3.0);
        env.report_lookup_miss(CaloSampling::EMB2, 3, 4, &position);
        env.record_out_of_acceptance(&position);
        env.record_out_of_acceptance(&position);
        assert_eq!(env.run_name(), "unit");
        assert_eq!(env.lookup_misses(), 1);
        assert_eq!(env.out_of_acceptance(), 2);

        let err = env.configuration_error(CaloError::MissingLayer(CaloSampling::EMB1));
        assert_eq!(err, CaloError::MissingLayer(CaloSampling::EMB1));
    }
}
