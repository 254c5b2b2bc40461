//! # Digitization run
//!
//! [`DigitizationRun`] drives one worker through the lifecycle of a run:
//!
//! ```text
//! Ready ──begin_event──▶ InEvent ──end_event──▶ EventDone ──begin_event──▶ InEvent ...
//!   │                                              │
//!   └──────────────────finalize────────────────────┴──▶ Finalized
//! ```
//!
//! Every transition is checked. A call made in the wrong phase returns
//! [`CaloError::InvalidPhase`] and leaves the cells untouched.
use tracing::{debug, info};

use crate::{
    calo_errors::CaloError,
    cluster::{ClusterBuilder, ClusterConfig},
    detector::{CaloDetector, StepOutcome, StepRecord},
    env_state::CaloEnv,
    records::EventRecords,
    truth_particle::TruthParticle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Ready,
    InEvent,
    EventDone,
    Finalized,
}

#[derive(Debug, Clone)]
pub struct DigitizationRun {
    env: CaloEnv,
    detector: CaloDetector,
    phase: RunPhase,
    events: u64,
    steps: u64,
}

impl DigitizationRun {
    pub fn new(env: CaloEnv, detector: CaloDetector) -> Self {
        DigitizationRun {
            env,
            detector,
            phase: RunPhase::Ready,
            events: 0,
            steps: 0,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn env(&self) -> &CaloEnv {
        &self.env
    }

    pub fn detector(&self) -> &CaloDetector {
        &self.detector
    }

    /// Number of events closed with [`DigitizationRun::end_event`].
    pub fn events(&self) -> u64 {
        self.events
    }

    fn expect_phase(&self, expected: RunPhase) -> Result<(), CaloError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(CaloError::InvalidPhase {
                expected,
                found: self.phase,
            })
        }
    }

    /// Zero every cell and start accepting steps.
    pub fn begin_event(&mut self) -> Result<(), CaloError> {
        match self.phase {
            RunPhase::Ready | RunPhase::EventDone => {
                self.detector.clear();
                self.phase = RunPhase::InEvent;
                Ok(())
            }
            found => Err(CaloError::InvalidPhase {
                expected: RunPhase::EventDone,
                found,
            }),
        }
    }

    pub fn process_step(&mut self, step: &StepRecord) -> Result<StepOutcome, CaloError> {
        self.expect_phase(RunPhase::InEvent)?;
        self.steps += 1;
        Ok(self.detector.process_step(&mut self.env, step))
    }

    /// Close the event: build the clusters and flatten the event into output records.
    ///
    /// Arguments
    /// -----------------
    /// * `truth`: generated particles of the event, used for cluster matching.
    /// * `config`: cluster builder parameters.
    ///
    /// Return
    /// ----------
    /// * The cell and cluster records of the event.
    pub fn end_event(
        &mut self,
        truth: &[TruthParticle],
        config: &ClusterConfig,
    ) -> Result<EventRecords, CaloError> {
        self.expect_phase(RunPhase::InEvent)?;
        let builder = ClusterBuilder::new(config.clone());
        let clusters = builder.build_clusters(&self.detector, truth);
        let records = EventRecords::from_event(&builder, &self.detector, &clusters);

        debug!(
            run = %self.env.run_name(),
            event = self.events,
            cells = records.cells.len(),
            clusters = records.clusters.len(),
            "event digitized"
        );
        self.events += 1;
        self.phase = RunPhase::EventDone;
        Ok(records)
    }

    /// Close the run and log its summary.
    pub fn finalize(&mut self) -> Result<(), CaloError> {
        match self.phase {
            RunPhase::Ready | RunPhase::EventDone => {
                info!(
                    run = %self.env.run_name(),
                    events = self.events,
                    steps = self.steps,
                    lookup_misses = self.env.lookup_misses(),
                    out_of_acceptance = self.env.out_of_acceptance(),
                    "digitization run finished"
                );
                self.phase = RunPhase::Finalized;
                Ok(())
            }
            found => Err(CaloError::InvalidPhase {
                expected: RunPhase::EventDone,
                found,
            }),
        }
    }
}
