//! # Detector geometry description
//!
//! The calorimeter geometry is described by a plain-text stream of directives, one per line:
//!
//! ```text
//! # sampling eta_min eta_max eta_bins phi_min phi_max phi_bins rmin rmax
//! L 2 -1.4 1.4 112 -3.14159265 3.14159265 256 1596 1926
//! # sampling eta phi deta dphi rmin rmax hash eta_channel phi_channel
//! C 2 -1.3875 -3.12932 0.0125 0.01227 1596 1926 20000000 0 0
//! ```
//!
//! - `L` lines define the uniform `(eta, phi)` grid and the radial range of a sampling,
//! - `C` lines define one cell of a sampling (`deta`/`dphi` are half-widths),
//! - `#` starts a comment, blank lines are ignored.
//!
//! [`parse_geometry`] turns such a stream into a [`DetectorGeometry`]. Any malformed line is a
//! fatal configuration error: the run cannot proceed without a complete geometry.
//!
//! [`LayerDirective::generate_cells`] produces the complete uniform cell grid of a layer, which
//! is how description files are generated in the first place.
mod parser;

use std::collections::BTreeMap;

use camino::Utf8Path;
use itertools::iproduct;

use crate::{
    calo_cell::{sampling::CaloSampling, CellGeometry},
    calo_errors::CaloError,
    constants::{Eta, Millimeter, Radian, HASH_SAMPLING_STRIDE},
};
use parser::{parse_directive_line, Directive};

/// Grid and radial range of one sampling, as read from an `L` directive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerDirective {
    pub sampling: CaloSampling,
    pub eta_min: Eta,
    pub eta_max: Eta,
    pub eta_bins: usize,
    pub phi_min: Radian,
    pub phi_max: Radian,
    pub phi_bins: usize,
    pub rmin: Millimeter,
    pub rmax: Millimeter,
}

impl LayerDirective {
    /// Every cell of the uniform grid, eta-major.
    ///
    /// Cells are centered on their bin, carry half the bin size as half-widths, and are
    /// hashed as `sampling * 10^7 + eta_index * phi_bins + phi_index`.
    pub fn generate_cells(&self) -> impl Iterator<Item = CellGeometry> {
        let layer = *self;
        let eta_step = (layer.eta_max - layer.eta_min) / layer.eta_bins as f64;
        let phi_step = (layer.phi_max - layer.phi_min) / layer.phi_bins as f64;

        iproduct!(0..layer.eta_bins, 0..layer.phi_bins).map(move |(eta_idx, phi_idx)| {
            let hash = u64::from(layer.sampling.id()) * HASH_SAMPLING_STRIDE
                + (eta_idx * layer.phi_bins + phi_idx) as u64;
            CellGeometry {
                sampling: layer.sampling,
                eta: layer.eta_min + eta_step * (eta_idx as f64 + 0.5),
                phi: layer.phi_min + phi_step * (phi_idx as f64 + 0.5),
                deta: eta_step / 2.0,
                dphi: phi_step / 2.0,
                rmin: layer.rmin,
                rmax: layer.rmax,
                hash: hash.to_string(),
                eta_channel: eta_idx as u32,
                phi_channel: phi_idx as u32,
            }
        })
    }
}

/// Complete geometry of the calorimeter: one layer directive per sampling and its cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectorGeometry {
    layers: BTreeMap<CaloSampling, LayerDirective>,
    cells: BTreeMap<CaloSampling, Vec<CellGeometry>>,
}

impl DetectorGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer, rejecting a second definition of the same sampling.
    pub fn add_layer(&mut self, layer: LayerDirective) -> Result<(), CaloError> {
        if self.layers.contains_key(&layer.sampling) {
            return Err(CaloError::DuplicateLayer(layer.sampling));
        }
        self.layers.insert(layer.sampling, layer);
        Ok(())
    }

    pub fn add_cell(&mut self, cell: CellGeometry) {
        self.cells.entry(cell.sampling).or_default().push(cell);
    }

    /// Register a layer together with its full uniform grid of cells.
    pub fn add_uniform_layer(&mut self, layer: LayerDirective) -> Result<(), CaloError> {
        self.add_layer(layer)?;
        self.cells
            .entry(layer.sampling)
            .or_default()
            .extend(layer.generate_cells());
        Ok(())
    }

    pub fn layer(&self, sampling: CaloSampling) -> Option<&LayerDirective> {
        self.layers.get(&sampling)
    }

    pub fn layers(&self) -> impl Iterator<Item = &LayerDirective> {
        self.layers.values()
    }

    /// Cells of one sampling, empty if none were declared.
    pub fn cells(&self, sampling: CaloSampling) -> &[CellGeometry] {
        self.cells.get(&sampling).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn n_cells(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    /// Every cell must belong to a sampling with a layer directive.
    pub fn validate(&self) -> Result<(), CaloError> {
        match self
            .cells
            .keys()
            .find(|sampling| !self.layers.contains_key(sampling))
        {
            Some(&sampling) => Err(CaloError::MissingLayer(sampling)),
            None => Ok(()),
        }
    }

    /// Read and parse a geometry description file.
    pub fn from_file(path: &Utf8Path) -> Result<Self, CaloError> {
        let content = std::fs::read_to_string(path)?;
        parse_geometry(&content)
    }
}

/// Parse a full directive stream.
///
/// Arguments
/// -----------------
/// * `content`: the text of a geometry description.
///
/// Return
/// ----------
/// * The geometry, or the first configuration error:
///   [`CaloError::GeometryParsing`] for a malformed line,
///   [`CaloError::DuplicateLayer`] for a sampling defined twice,
///   [`CaloError::MissingLayer`] for cells of an undefined sampling.
pub fn parse_geometry(content: &str) -> Result<DetectorGeometry, CaloError> {
    let mut geometry = DetectorGeometry::new();

    for line in content.lines() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        match parse_directive_line(line)? {
            Directive::Layer(layer) => geometry.add_layer(layer)?,
            Directive::Cell(cell) => geometry.add_cell(cell),
        }
    }

    geometry.validate()?;
    Ok(geometry)
}

#[cfg(test)]
mod geometry_test {
    use super::*;
    use std::f64::consts::PI;

    const SAMPLE: &str = "\
# sampling eta_min eta_max eta_bins phi_min phi_max phi_bins rmin rmax
L 2 -0.1 0.1 2 -3.14159265 3.14159265 2 1596 1926

C 2 -0.05 -1.5707963 0.05 1.5707963 1596 1926 20000000 0 0
C 2 -0.05 1.5707963 0.05 1.5707963 1596 1926 20000001 0 1   # trailing comment
C 2 0.05 -1.5707963 0.05 1.5707963 1596 1926 20000002 1 0
C 2 0.05 1.5707963 0.05 1.5707963 1596 1926 20000003 1 1
";

    #[test]
    fn test_parse_geometry() {
        let geometry = parse_geometry(SAMPLE).unwrap();
        let layer = geometry.layer(CaloSampling::EMB2).unwrap();
        assert_eq!(layer.eta_bins, 2);
        assert_eq!(layer.phi_bins, 2);
        assert_eq!(layer.rmax, 1926.0);
        assert_eq!(geometry.n_cells(), 4);

        let cells = geometry.cells(CaloSampling::EMB2);
        assert_eq!(cells[1].hash, "20000001");
        assert_eq!(cells[1].phi_channel, 1);
        assert_eq!(cells[3].eta, 0.05);
        assert!(geometry.cells(CaloSampling::EMB1).is_empty());
    }

    #[test]
    fn test_cells_without_layer() {
        let content = "C 3 0.05 0.1 0.05 0.1 1926 2000 30000000 0 0";
        assert_eq!(
            parse_geometry(content),
            Err(CaloError::MissingLayer(CaloSampling::EMB3))
        );
    }

    #[test]
    fn test_duplicate_layer() {
        let content = "L 1 -1 1 4 -3.14 3.14 4 1500 1596\nL 1 -1 1 4 -3.14 3.14 4 1500 1596";
        assert_eq!(
            parse_geometry(content),
            Err(CaloError::DuplicateLayer(CaloSampling::EMB1))
        );
    }

    #[test]
    fn test_malformed_line() {
        let content = "L 1 -1 1 four -3.14 3.14 4 1500 1596";
        assert_eq!(
            parse_geometry(content),
            Err(CaloError::GeometryParsing(content.to_string()))
        );
        assert!(parse_geometry("X 1 2 3").is_err());
        assert!(parse_geometry("L 42 -1 1 4 -3.14 3.14 4 1500 1596").is_err());
    }

    #[test]
    fn test_generate_cells() {
        let layer = LayerDirective {
            sampling: CaloSampling::TileCal1,
            eta_min: -1.0,
            eta_max: 1.0,
            eta_bins: 20,
            phi_min: -PI,
            phi_max: PI,
            phi_bins: 64,
            rmin: 2283.0,
            rmax: 2683.0,
        };
        let cells: Vec<_> = layer.generate_cells().collect();
        assert_eq!(cells.len(), 20 * 64);
        assert_eq!(cells[0].hash, "40000000");
        assert_eq!(cells[65].hash, "40000065");
        assert_eq!(cells[65].eta_channel, 1);
        assert_eq!(cells[65].phi_channel, 1);
        assert!((cells[0].eta + 0.95).abs() < 1e-12);
        assert!((cells[0].deta - 0.05).abs() < 1e-12);
        assert!((cells[0].dphi - PI / 64.0).abs() < 1e-12);

        let mut geometry = DetectorGeometry::new();
        geometry.add_uniform_layer(layer).unwrap();
        assert_eq!(geometry.n_cells(), 1280);
        assert!(geometry.validate().is_ok());
    }
}
