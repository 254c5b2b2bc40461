//! # Time digitizer
//!
//! Each calorimeter cell owns a [`TimeDigitizer`] that splits the energy it receives
//! into time samples, one group of samples per bunch crossing, and keeps a separate
//! "truth" accumulator for the deposits of the hard-scatter crossing.
//!
//! ## Time binning
//!
//! For `samples_per_bunch = n`, bunch crossings `bcid_start ..= bcid_end` and a crossing
//! duration `d`, the edges are
//!
//! ```text
//! edge[t] = (bcid_start - 0.5) * d + t * d / n      t = 0 ..= n * (bcid_end - bcid_start + 1)
//! ```
//!
//! so that each crossing `b` is centered on `b * d`. A time exactly on an edge is stored
//! in the sample ending at that edge, see [`crate::binning::find_bin`].
//!
//! ## Truth window
//!
//! Independently of the samples, deposits with
//! `(bcid_truth - 1) * d <= t < (bcid_truth + 1) * d` are added to the truth energy,
//! even when they fall outside the digitized time range.

use crate::{
    binning::{find_bin, linear_edges},
    calo_errors::CaloError,
    constants::{
        Bcid, MeV, Nanosecond, DEFAULT_BCID_END, DEFAULT_BCID_START, DEFAULT_BCID_TRUTH,
        DEFAULT_BC_DURATION, DEFAULT_SAMPLES_PER_BUNCH,
    },
};

/// Bunch crossing parameters shared by every digitizer of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BunchCrossing {
    duration: Nanosecond,
    samples_per_bunch: usize,
    bcid_start: Bcid,
    bcid_end: Bcid,
    bcid_truth: Bcid,
}

impl Default for BunchCrossing {
    fn default() -> Self {
        BunchCrossing {
            duration: DEFAULT_BC_DURATION,
            samples_per_bunch: DEFAULT_SAMPLES_PER_BUNCH,
            bcid_start: DEFAULT_BCID_START,
            bcid_end: DEFAULT_BCID_END,
            bcid_truth: DEFAULT_BCID_TRUTH,
        }
    }
}

impl BunchCrossing {
    /// Validate and build the bunch crossing parameters.
    ///
    /// Arguments
    /// -----------------
    /// * `duration`: bunch spacing in ns, must be strictly positive and finite.
    /// * `samples_per_bunch`: number of time samples per crossing, must be non-zero.
    /// * `bcid_start`, `bcid_end`: first and last digitized crossing, `bcid_start <= bcid_end`.
    /// * `bcid_truth`: crossing whose deposits define the truth energy.
    ///
    /// Return
    /// ----------
    /// * The parameters, or [`CaloError::InvalidBunchCrossing`].
    pub fn new(
        duration: Nanosecond,
        samples_per_bunch: usize,
        bcid_start: Bcid,
        bcid_end: Bcid,
        bcid_truth: Bcid,
    ) -> Result<Self, CaloError> {
        if !(duration > 0.0) || !duration.is_finite() {
            return Err(CaloError::InvalidBunchCrossing(format!(
                "bunch duration must be positive, got {duration}"
            )));
        }
        if samples_per_bunch == 0 {
            return Err(CaloError::InvalidBunchCrossing(
                "at least one sample per bunch is required".into(),
            ));
        }
        if bcid_start > bcid_end {
            return Err(CaloError::InvalidBunchCrossing(format!(
                "bcid_start ({bcid_start}) is after bcid_end ({bcid_end})"
            )));
        }
        Ok(BunchCrossing {
            duration,
            samples_per_bunch,
            bcid_start,
            bcid_end,
            bcid_truth,
        })
    }

    pub fn duration(&self) -> Nanosecond {
        self.duration
    }

    pub fn samples_per_bunch(&self) -> usize {
        self.samples_per_bunch
    }

    pub fn bcid_start(&self) -> Bcid {
        self.bcid_start
    }

    pub fn bcid_end(&self) -> Bcid {
        self.bcid_end
    }

    pub fn bcid_truth(&self) -> Bcid {
        self.bcid_truth
    }

    /// Number of digitized bunch crossings.
    pub fn n_bunches(&self) -> usize {
        (self.bcid_end - self.bcid_start + 1) as usize
    }

    /// Total number of time samples.
    pub fn n_samples(&self) -> usize {
        self.n_bunches() * self.samples_per_bunch
    }

    /// Half-open time window `[(bcid_truth - 1) * d, (bcid_truth + 1) * d)` of the truth energy.
    pub fn truth_window(&self) -> (Nanosecond, Nanosecond) {
        (
            f64::from(self.bcid_truth - 1) * self.duration,
            f64::from(self.bcid_truth + 1) * self.duration,
        )
    }

    /// Range of sample indices belonging to crossing `bcid`, if it is digitized.
    pub fn bunch_sample_range(&self, bcid: Bcid) -> Option<std::ops::Range<usize>> {
        if bcid < self.bcid_start || bcid > self.bcid_end {
            return None;
        }
        let first = (bcid - self.bcid_start) as usize * self.samples_per_bunch;
        Some(first..first + self.samples_per_bunch)
    }
}

/// Per-cell energy sampler.
///
/// The edges are fixed at construction; only the samples and the two energy
/// accumulators change, and [`TimeDigitizer::clear`] resets them between events.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeDigitizer {
    bunch_crossing: BunchCrossing,
    edges: Vec<Nanosecond>,
    samples: Vec<MeV>,
    total_energy: MeV,
    truth_energy: MeV,
}

impl TimeDigitizer {
    pub fn new(bunch_crossing: BunchCrossing) -> Self {
        let start = (f64::from(bunch_crossing.bcid_start) - 0.5) * bunch_crossing.duration;
        let step = bunch_crossing.duration / bunch_crossing.samples_per_bunch as f64;
        let n_samples = bunch_crossing.n_samples();

        TimeDigitizer {
            bunch_crossing,
            edges: linear_edges(start, step, n_samples),
            samples: vec![0.0; n_samples],
            total_energy: 0.0,
            truth_energy: 0.0,
        }
    }

    pub fn bunch_crossing(&self) -> &BunchCrossing {
        &self.bunch_crossing
    }

    pub fn edges(&self) -> &[Nanosecond] {
        &self.edges
    }

    pub fn samples(&self) -> &[MeV] {
        &self.samples
    }

    /// Sum of every deposit that landed in a time sample.
    pub fn total_energy(&self) -> MeV {
        self.total_energy
    }

    /// Sum of every deposit inside the truth window.
    pub fn truth_energy(&self) -> MeV {
        self.truth_energy
    }

    /// Index of the sample containing `time`, `None` outside the digitized range.
    pub fn find_bin(&self, time: Nanosecond) -> Option<usize> {
        find_bin(&self.edges, time)
    }

    /// Whether `time` lies inside the truth window, lower bound included.
    pub fn in_truth_window(&self, time: Nanosecond) -> bool {
        let (low, high) = self.bunch_crossing.truth_window();
        low <= time && time < high
    }

    /// Accumulate one deposit.
    ///
    /// Arguments
    /// -----------------
    /// * `energy`: deposited energy in MeV.
    /// * `time`: global time of the deposit in ns.
    ///
    /// Return
    /// ----------
    /// * The sample index that received the deposit, `None` if it fell outside the
    ///   digitized range. The truth energy is updated in both cases.
    pub fn fill(&mut self, energy: MeV, time: Nanosecond) -> Option<usize> {
        let bin = self.find_bin(time);
        if let Some(index) = bin {
            self.samples[index] += energy;
            self.total_energy += energy;
        }
        if self.in_truth_window(time) {
            self.truth_energy += energy;
        }
        bin
    }

    /// Samples of one bunch crossing.
    pub fn bunch_samples(&self, bcid: Bcid) -> Option<&[MeV]> {
        self.bunch_crossing
            .bunch_sample_range(bcid)
            .map(|range| &self.samples[range])
    }

    /// Energy sampled in the truth bunch crossing, zero when that crossing is not digitized.
    pub fn raw_energy(&self) -> MeV {
        self.bunch_samples(self.bunch_crossing.bcid_truth)
            .map(|samples| samples.iter().sum())
            .unwrap_or(0.0)
    }

    pub fn clear(&mut self) {
        self.total_energy = 0.0;
        self.truth_energy = 0.0;
        self.samples.iter_mut().for_each(|sample| *sample = 0.0);
    }
}
