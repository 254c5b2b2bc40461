//! # Detector coordinate system
//!
//! Conversion between the Cartesian frame of the transport engine and the
//! `(eta, phi, r)` frame in which the calorimeter is segmented:
//!
//! - `z` is the beam axis, `θ = atan2(r, z)` is the polar angle from it,
//! - `eta = -ln(tan(θ/2))` is the pseudorapidity,
//! - `phi = atan2(y, x)` is the azimuth in `(-π, π]`,
//! - `r = sqrt(x² + y²)` is the transverse radius.
//!
//! Angular distances always use the wrapped azimuth difference of [`delta_phi`], so that
//! two directions on either side of the `±π` seam are close.

use nalgebra::Vector3;

use crate::constants::{Eta, Millimeter, Radian, DPI};
use std::f64::consts::PI;

/// A position expressed in the calorimeter frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorCoordinates {
    pub eta: Eta,
    pub phi: Radian,
    pub r: Millimeter,
}

impl DetectorCoordinates {
    /// Convert a Cartesian position (mm) into `(eta, phi, r)`.
    pub fn from_cartesian(position: &Vector3<f64>) -> Self {
        let r = position.x.hypot(position.y);
        DetectorCoordinates {
            eta: theta_to_eta(r.atan2(position.z)),
            phi: position.y.atan2(position.x),
            r,
        }
    }
}

/// Pseudorapidity of a polar angle measured from the beam axis.
pub fn theta_to_eta(theta: Radian) -> Eta {
    -(theta / 2.0).tan().ln()
}

/// Azimuth difference `a - b` mapped into `(-π, π]`.
pub fn delta_phi(a: Radian, b: Radian) -> Radian {
    let diff = (a - b).rem_euclid(DPI);
    if diff > PI {
        diff - DPI
    } else {
        diff
    }
}

/// Angular distance `sqrt(Δeta² + Δphi²)` with the wrapped azimuth difference.
pub fn delta_r(eta1: Eta, phi1: Radian, eta2: Eta, phi2: Radian) -> f64 {
    (eta1 - eta2).hypot(delta_phi(phi1, phi2))
}
