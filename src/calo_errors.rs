use thiserror::Error;

use crate::calo_cell::sampling::CaloSampling;
use crate::run::RunPhase;

#[derive(Error, Debug)]
pub enum CaloError {
    #[error("Malformed geometry directive: {0}")]
    GeometryParsing(String),

    #[error("No layer directive found for sampling {0}")]
    MissingLayer(CaloSampling),

    #[error("Layer directive given twice for sampling {0}")]
    DuplicateLayer(CaloSampling),

    #[error("Two cells share the bin (eta={eta_bin}, phi={phi_bin}) in sampling {sampling}")]
    DuplicateCell {
        sampling: CaloSampling,
        eta_bin: usize,
        phi_bin: usize,
    },

    #[error("Cell {hash} has its center outside the grid of sampling {sampling}")]
    CellOutsideGrid { sampling: CaloSampling, hash: String },

    #[error("Invalid bunch crossing configuration: {0}")]
    InvalidBunchCrossing(String),

    #[error("Invalid binning: {0}")]
    InvalidBinning(String),

    #[error("Unknown calorimeter sampling id: {0}")]
    UnknownSampling(u32),

    #[error("Run is in phase {found:?}, expected {expected:?}")]
    InvalidPhase { expected: RunPhase, found: RunPhase },

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV writer error: {0}")]
    CsvError(#[from] csv::Error),
}

impl PartialEq for CaloError {
    fn eq(&self, other: &Self) -> bool {
        use CaloError::*;
        match (self, other) {
            (GeometryParsing(a), GeometryParsing(b)) => a == b,
            (MissingLayer(a), MissingLayer(b)) => a == b,
            (DuplicateLayer(a), DuplicateLayer(b)) => a == b,
            (
                DuplicateCell {
                    sampling: s1,
                    eta_bin: e1,
                    phi_bin: p1,
                },
                DuplicateCell {
                    sampling: s2,
                    eta_bin: e2,
                    phi_bin: p2,
                },
            ) => s1 == s2 && e1 == e2 && p1 == p2,
            (
                CellOutsideGrid {
                    sampling: s1,
                    hash: h1,
                },
                CellOutsideGrid {
                    sampling: s2,
                    hash: h2,
                },
            ) => s1 == s2 && h1 == h2,
            (InvalidBunchCrossing(a), InvalidBunchCrossing(b)) => a == b,
            (InvalidBinning(a), InvalidBinning(b)) => a == b,
            (UnknownSampling(a), UnknownSampling(b)) => a == b,
            (
                InvalidPhase {
                    expected: e1,
                    found: f1,
                },
                InvalidPhase {
                    expected: e2,
                    found: f2,
                },
            ) => e1 == e2 && f1 == f2,

            // I/O errors are not comparable: same variant is enough
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,

            _ => false,
        }
    }
}
