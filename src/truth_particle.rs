use nalgebra::Vector3;

use crate::constants::{Eta, MeV, Millimeter, Radian};

/// A generated particle with known kinematics, used as reference for the clusters.
///
/// # Fields
///
/// * `pdg_id` - PDG Monte Carlo particle code
/// * `e`, `et` - Energy and transverse energy in MeV
/// * `eta`, `phi` - Direction of flight
/// * `momentum` - Momentum (px, py, pz) in MeV
/// * `vertex` - Production vertex in mm
#[derive(Debug, Clone, PartialEq)]
pub struct TruthParticle {
    pub pdg_id: i32,
    pub e: MeV,
    pub et: MeV,
    pub eta: Eta,
    pub phi: Radian,
    pub momentum: Vector3<MeV>,
    pub vertex: Vector3<Millimeter>,
}

impl TruthParticle {
    /// Particle produced at the origin, with its momentum derived from `(e, eta, phi)`
    /// assuming a massless particle.
    pub fn massless(pdg_id: i32, e: MeV, eta: Eta, phi: Radian) -> Self {
        let et = e / eta.cosh();
        TruthParticle {
            pdg_id,
            e,
            et,
            eta,
            phi,
            momentum: Vector3::new(et * phi.cos(), et * phi.sin(), et * eta.sinh()),
            vertex: Vector3::zeros(),
        }
    }
}
