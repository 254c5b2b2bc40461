//! # Bin edge construction and lookup
//!
//! Both the time digitizer and the angular grid of a layer map a scalar value onto
//! an ordered sequence of bin edges with the same boundary rule:
//!
//! ```text
//! edges:   e0      e1      e2      e3
//!          |  b0   |  b1   |  b2   |
//! value v lands in bin i  <=>  e[i] < v <= e[i+1]
//! ```
//!
//! A value sitting exactly on an inner edge belongs to the bin **ending** at that edge.
//! Values at or below the first edge, at or above the last edge, and NaN have no bin.

use crate::calo_errors::CaloError;

/// Build `nbins + 1` evenly spaced edges starting at `start` with spacing `step`.
///
/// Each edge is computed as `start + i * step` rather than accumulated, so rounding
/// does not drift along long sequences.
pub fn linear_edges(start: f64, step: f64, nbins: usize) -> Vec<f64> {
    (0..=nbins).map(|i| start + step * i as f64).collect()
}

/// Build `nbins + 1` evenly spaced edges covering `[min, max]`.
///
/// Return
/// ----------
/// * The edges, or [`CaloError::InvalidBinning`] when `nbins == 0` or the range is empty.
pub fn uniform_edges(min: f64, max: f64, nbins: usize) -> Result<Vec<f64>, CaloError> {
    if nbins == 0 {
        return Err(CaloError::InvalidBinning(
            "number of bins must be positive".into(),
        ));
    }
    if !(max > min) {
        return Err(CaloError::InvalidBinning(format!(
            "empty range [{min}, {max}]"
        )));
    }
    let mut edges = linear_edges(min, (max - min) / nbins as f64, nbins);
    // pin the upper bound exactly, the linear formula may miss it by one ulp
    if let Some(last) = edges.last_mut() {
        *last = max;
    }
    Ok(edges)
}

/// Check that `edges` describe at least one bin and are strictly increasing.
pub fn validate_edges(edges: &[f64]) -> Result<(), CaloError> {
    if edges.len() < 2 {
        return Err(CaloError::InvalidBinning(format!(
            "at least two edges are needed, got {}",
            edges.len()
        )));
    }
    if edges.windows(2).any(|w| !(w[0] < w[1])) {
        return Err(CaloError::InvalidBinning(
            "bin edges must be strictly increasing".into(),
        ));
    }
    Ok(())
}

/// Find the bin of `value` in a sorted edge sequence.
///
/// Binary search equivalent of scanning adjacent pairs `(left, right)` for
/// `left < value <= right`, except that the last edge itself is treated as outside.
///
/// Arguments
/// -----------------
/// * `edges`: strictly increasing bin edges.
/// * `value`: the value to place.
///
/// Return
/// ----------
/// * `Some(i)` with `edges[i] < value <= edges[i + 1]`, or `None` when the value is
///   outside `(edges[0], edges[last])` or is NaN.
pub fn find_bin(edges: &[f64], value: f64) -> Option<usize> {
    let n = edges.len();
    if n < 2 {
        return None;
    }
    // first edge that is >= value
    let upper = edges.partition_point(|&edge| edge < value);
    if upper == 0 || (upper >= n - 1 && !(value < edges[n - 1])) {
        return None;
    }
    Some(upper - 1)
}

#[cfg(test)]
mod binning_test {
    use super::*;

    fn scan_adjacent(edges: &[f64], value: f64) -> Option<usize> {
        edges
            .windows(2)
            .position(|w| w[0] < value && value <= w[1])
            .filter(|&i| i + 2 < edges.len() || value < edges[edges.len() - 1])
    }

    #[test]
    fn test_edge_belongs_to_left_bin() {
        let edges = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(find_bin(&edges, 1.0), Some(0));
        assert_eq!(find_bin(&edges, 2.0), Some(1));
        assert_eq!(find_bin(&edges, 1.5), Some(1));
        assert_eq!(find_bin(&edges, 2.999), Some(2));
    }

    #[test]
    fn test_outside_range() {
        let edges = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(find_bin(&edges, -0.5), None);
        assert_eq!(find_bin(&edges, 0.0), None);
        assert_eq!(find_bin(&edges, 3.0), None);
        assert_eq!(find_bin(&edges, 4.0), None);
        assert_eq!(find_bin(&edges, f64::NAN), None);
        assert_eq!(find_bin(&[1.0], 1.0), None);
    }

    #[test]
    fn test_binary_search_matches_scan() {
        let edges = linear_edges(-187.5, 25.0, 16);
        let mut t = -200.0;
        while t <= 220.0 {
            assert_eq!(find_bin(&edges, t), scan_adjacent(&edges, t), "t = {t}");
            t += 2.5;
        }
        for &edge in &edges {
            assert_eq!(find_bin(&edges, edge), scan_adjacent(&edges, edge));
        }
    }

    #[test]
    fn test_uniform_edges() {
        let edges = uniform_edges(-1.0, 1.0, 4).unwrap();
        assert_eq!(edges, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert!(validate_edges(&edges).is_ok());

        assert!(uniform_edges(1.0, 1.0, 4).is_err());
        assert!(uniform_edges(0.0, 1.0, 0).is_err());
        assert!(validate_edges(&[0.0, 0.0]).is_err());
        assert!(validate_edges(&[0.0]).is_err());
    }
}
