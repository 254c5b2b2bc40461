//! # Constants and type definitions for calodigit
//!
//! This module centralizes the **unit conventions**, **default run parameters**, and
//! **common type aliases** shared by the digitizer, the spatial index and the cluster builder.
//!
//! ## Units
//!
//! - Lengths are in millimeters.
//! - Times are in nanoseconds.
//! - Energies are in MeV.
//! - Angles (azimuth) are in radians, pseudorapidity is dimensionless.

// -------------------------------------------------------------------------------------------------
// Physical constants and defaults
// -------------------------------------------------------------------------------------------------

/// 2π, used for azimuth wraparound
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Default bunch crossing spacing of the collider, in nanoseconds
pub const DEFAULT_BC_DURATION: Nanosecond = 25.0;

/// Default number of digitized samples per bunch crossing
pub const DEFAULT_SAMPLES_PER_BUNCH: usize = 1;

/// First bunch crossing kept by default (pile-up from earlier crossings)
pub const DEFAULT_BCID_START: Bcid = -7;

/// Last bunch crossing kept by default
pub const DEFAULT_BCID_END: Bcid = 8;

/// Bunch crossing holding the hard-scatter event, used for the truth energy window
pub const DEFAULT_BCID_TRUTH: Bcid = 0;

/// Multiplier applied to the sampling id when generating cell hashes
pub const HASH_SAMPLING_STRIDE: u64 = 10_000_000;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in radians
pub type Radian = f64;
/// Pseudorapidity (dimensionless)
pub type Eta = f64;
/// Distance in millimeters
pub type Millimeter = f64;
/// Time in nanoseconds
pub type Nanosecond = f64;
/// Energy in MeV
pub type MeV = f64;
/// Bunch crossing identifier, relative to the hard-scatter crossing
pub type Bcid = i32;
