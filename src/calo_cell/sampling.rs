use std::fmt;

use crate::calo_errors::CaloError;

/// Physical calorimeter sampling, numbered as in the detector description files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CaloSampling {
    PSB = 0,
    EMB1 = 1,
    EMB2 = 2,
    EMB3 = 3,
    TileCal1 = 4,
    TileCal2 = 5,
    TileCal3 = 6,
    TileExt1 = 7,
    TileExt2 = 8,
    TileExt3 = 9,
    EMEC1 = 10,
    EMEC2 = 11,
    EMEC3 = 12,
    HEC1 = 13,
    HEC2 = 14,
    HEC3 = 15,
}

/// Logical depth layer, merging barrel, extended barrel and endcap samplings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CaloLayer {
    PS,
    EM1,
    EM2,
    EM3,
    HAD1,
    HAD2,
    HAD3,
}

impl CaloSampling {
    pub const ALL: [CaloSampling; 16] = [
        CaloSampling::PSB,
        CaloSampling::EMB1,
        CaloSampling::EMB2,
        CaloSampling::EMB3,
        CaloSampling::TileCal1,
        CaloSampling::TileCal2,
        CaloSampling::TileCal3,
        CaloSampling::TileExt1,
        CaloSampling::TileExt2,
        CaloSampling::TileExt3,
        CaloSampling::EMEC1,
        CaloSampling::EMEC2,
        CaloSampling::EMEC3,
        CaloSampling::HEC1,
        CaloSampling::HEC2,
        CaloSampling::HEC3,
    ];

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn layer(self) -> CaloLayer {
        use CaloSampling::*;
        match self {
            PSB => CaloLayer::PS,
            EMB1 | EMEC1 => CaloLayer::EM1,
            EMB2 | EMEC2 => CaloLayer::EM2,
            EMB3 | EMEC3 => CaloLayer::EM3,
            TileCal1 | TileExt1 | HEC1 => CaloLayer::HAD1,
            TileCal2 | TileExt2 | HEC2 => CaloLayer::HAD2,
            TileCal3 | TileExt3 | HEC3 => CaloLayer::HAD3,
        }
    }
}

impl CaloLayer {
    pub const ALL: [CaloLayer; 7] = [
        CaloLayer::PS,
        CaloLayer::EM1,
        CaloLayer::EM2,
        CaloLayer::EM3,
        CaloLayer::HAD1,
        CaloLayer::HAD2,
        CaloLayer::HAD3,
    ];

    /// Presampler and the three electromagnetic layers.
    pub fn is_electromagnetic(self) -> bool {
        matches!(
            self,
            CaloLayer::PS | CaloLayer::EM1 | CaloLayer::EM2 | CaloLayer::EM3
        )
    }

    pub fn is_hadronic(self) -> bool {
        !self.is_electromagnetic()
    }
}

impl TryFrom<u32> for CaloSampling {
    type Error = CaloError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        CaloSampling::ALL
            .get(value as usize)
            .copied()
            .ok_or(CaloError::UnknownSampling(value))
    }
}

impl fmt::Display for CaloSampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl fmt::Display for CaloLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
