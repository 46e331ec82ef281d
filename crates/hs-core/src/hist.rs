//! One-dimensional histograms with ROOT cell conventions.
//!
//! Cells are indexed like ROOT's `TH1`: `0` is the underflow, `1..=n` the
//! in-range bins and `n + 1` the overflow. Every cell carries a sum of squared
//! weights, so errors survive rebinning and addition.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Relative tolerance when comparing bin edges.
pub const EDGE_RTOL: f64 = 1e-9;

/// A binned 1D histogram with under/overflow and per-cell `Σw²`.
#[derive(Debug, Clone, PartialEq)]
pub struct Hist1D {
    name: String,
    title: String,
    edges: Vec<f64>,
    contents: Vec<f64>,
    sumw2: Vec<f64>,
    entries: f64,
}

/// Target binning used to put heterogeneous inputs on a common axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonBinning {
    /// Lower edge of the uniform target.
    #[serde(default)]
    pub x_min: f64,
    /// Upper edge of the target; custom edges reaching past `2 * x_max` are cut here.
    pub x_max: f64,
    /// Number of uniform bins when no custom edges are given.
    #[serde(default = "default_common_bins")]
    pub nbins: usize,
    /// Custom edges; take precedence over `nbins`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edges: Option<Vec<f64>>,
}

fn default_common_bins() -> usize {
    200
}

impl CommonBinning {
    /// Uniform target of `nbins` over `[x_min, x_max]`.
    pub fn uniform(nbins: usize, x_min: f64, x_max: f64) -> Self {
        Self { x_min, x_max, nbins, edges: None }
    }

    /// Resolve the target edges.
    ///
    /// Custom edges whose last value exceeds `2 * x_max` are truncated to the
    /// edges `<= x_max`, with `x_max` appended when it is not already an edge.
    pub fn target_edges(&self) -> Result<Vec<f64>> {
        let edges = match &self.edges {
            Some(custom) => {
                let last = custom.last().copied().unwrap_or(f64::NAN);
                if last > 2.0 * self.x_max {
                    let mut kept: Vec<f64> = custom.iter().copied().filter(|&e| e <= self.x_max).collect();
                    if kept.last().is_none_or(|&e| !approx_eq(e, self.x_max)) {
                        kept.push(self.x_max);
                    }
                    kept
                } else {
                    custom.clone()
                }
            }
            None => {
                if self.nbins == 0 {
                    return Err(Error::InvalidBinning("common binning needs at least one bin".into()));
                }
                uniform_edges(self.nbins, self.x_min, self.x_max)
            }
        };
        validate_edges(&edges)?;
        Ok(edges)
    }
}

/// Check that `edges` has at least two finite, strictly increasing values.
pub fn validate_edges(edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(Error::InvalidBinning(format!("need at least 2 edges, got {}", edges.len())));
    }
    if let Some(bad) = edges.iter().find(|e| !e.is_finite()) {
        return Err(Error::InvalidBinning(format!("non-finite bin edge {}", bad)));
    }
    if let Some(w) = edges.windows(2).find(|w| w[1] <= w[0]) {
        return Err(Error::InvalidBinning(format!(
            "bin edges must be strictly increasing ({} followed by {})",
            w[0], w[1]
        )));
    }
    Ok(())
}

fn uniform_edges(n: usize, lo: f64, hi: f64) -> Vec<f64> {
    let width = (hi - lo) / n as f64;
    (0..=n).map(|i| if i == n { hi } else { lo + i as f64 * width }).collect()
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EDGE_RTOL * a.abs().max(b.abs()).max(1.0)
}

impl Hist1D {
    /// Empty histogram with explicit edges.
    pub fn variable(name: impl Into<String>, edges: Vec<f64>) -> Result<Self> {
        validate_edges(&edges)?;
        let cells = edges.len() + 1;
        let name = name.into();
        Ok(Self {
            title: name.clone(),
            name,
            edges,
            contents: vec![0.0; cells],
            sumw2: vec![0.0; cells],
            entries: 0.0,
        })
    }

    /// Empty histogram with `n` uniform bins over `[lo, hi)`.
    pub fn uniform(name: impl Into<String>, n: usize, lo: f64, hi: f64) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidBinning("histogram needs at least one bin".into()));
        }
        Self::variable(name, uniform_edges(n, lo, hi))
    }

    /// Build from in-range contents and `Σw²` (both of length `n`), flows empty.
    pub fn from_bins(name: impl Into<String>, edges: Vec<f64>, contents: &[f64], sumw2: &[f64]) -> Result<Self> {
        let mut h = Self::variable(name, edges)?;
        let n = h.n_bins();
        if contents.len() != n || sumw2.len() != n {
            return Err(Error::InvalidBinning(format!(
                "{} bins but {} contents and {} sumw2 values",
                n,
                contents.len(),
                sumw2.len()
            )));
        }
        h.contents[1..=n].copy_from_slice(contents);
        h.sumw2[1..=n].copy_from_slice(sumw2);
        h.entries = contents.iter().sum();
        Ok(h)
    }

    /// Convert a histogram read from a ROOT file.
    ///
    /// Without stored `Σw²` the errors default to `√|content|`, as after
    /// `TH1::Sumw2()` on an unweighted histogram.
    pub fn from_root(h: hs_root::HistogramWithFlows) -> Result<Self> {
        let hs_root::HistogramWithFlows { histogram, underflow, overflow, underflow_sumw2, overflow_sumw2 } = h;
        let n = histogram.n_bins;
        let mut out = Self::variable(histogram.name, histogram.bin_edges)?;
        if histogram.bin_content.len() != n || out.n_bins() != n {
            return Err(Error::InvalidBinning(format!(
                "'{}' has {} edges for {} contents",
                out.name,
                out.edges.len(),
                histogram.bin_content.len()
            )));
        }
        out.title = histogram.title;
        out.entries = histogram.entries;
        out.contents[0] = underflow;
        out.contents[1..=n].copy_from_slice(&histogram.bin_content);
        out.contents[n + 1] = overflow;

        match histogram.sumw2 {
            Some(sw2) if sw2.len() == n => {
                out.sumw2[0] = underflow_sumw2.unwrap_or(underflow.abs());
                out.sumw2[1..=n].copy_from_slice(&sw2);
                out.sumw2[n + 1] = overflow_sumw2.unwrap_or(overflow.abs());
            }
            _ => {
                for (s, c) in out.sumw2.iter_mut().zip(&out.contents) {
                    *s = c.abs();
                }
            }
        }
        Ok(out)
    }

    /// Histogram name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Builder-style rename.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Histogram title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of in-range bins.
    pub fn n_bins(&self) -> usize {
        self.edges.len() - 1
    }

    /// Bin edges (`n + 1` values).
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Lower edge of the axis.
    pub fn x_min(&self) -> f64 {
        self.edges[0]
    }

    /// Upper edge of the axis.
    pub fn x_max(&self) -> f64 {
        self.edges[self.n_bins()]
    }

    /// `fEntries`.
    pub fn entries(&self) -> f64 {
        self.entries
    }

    /// Lower edge of in-range bin `i` (1-based).
    pub fn bin_low_edge(&self, i: usize) -> f64 {
        self.edges[i - 1]
    }

    /// Width of in-range bin `i`.
    pub fn bin_width(&self, i: usize) -> f64 {
        self.edges[i] - self.edges[i - 1]
    }

    /// Center of in-range bin `i`.
    pub fn bin_center(&self, i: usize) -> f64 {
        0.5 * (self.edges[i - 1] + self.edges[i])
    }

    /// Content of cell `i` (0 = underflow, n+1 = overflow).
    pub fn content(&self, i: usize) -> f64 {
        self.contents[i]
    }

    /// `√Σw²` of cell `i`.
    pub fn error(&self, i: usize) -> f64 {
        self.sumw2[i].sqrt()
    }

    /// `Σw²` of cell `i`.
    pub fn sumw2(&self, i: usize) -> f64 {
        self.sumw2[i]
    }

    /// Set the content of cell `i`.
    pub fn set_content(&mut self, i: usize, value: f64) {
        self.contents[i] = value;
    }

    /// Set the error of cell `i` (stored as its square).
    pub fn set_error(&mut self, i: usize, error: f64) {
        self.sumw2[i] = error * error;
    }

    /// In-range contents.
    pub fn contents(&self) -> &[f64] {
        &self.contents[1..=self.n_bins()]
    }

    /// In-range errors.
    pub fn errors(&self) -> Vec<f64> {
        self.sumw2[1..=self.n_bins()].iter().map(|s| s.sqrt()).collect()
    }

    /// Underflow content.
    pub fn underflow(&self) -> f64 {
        self.contents[0]
    }

    /// Overflow content.
    pub fn overflow(&self) -> f64 {
        self.contents[self.n_bins() + 1]
    }

    /// Sum over all cells, flows included.
    pub fn total_with_flows(&self) -> f64 {
        self.contents.iter().sum()
    }

    /// Cell containing `x`: 0 below the axis, `n + 1` at or above the upper edge.
    pub fn find_bin(&self, x: f64) -> usize {
        let n = self.n_bins();
        if x.is_nan() || x < self.edges[0] {
            0
        } else if x >= self.edges[n] {
            n + 1
        } else {
            self.edges.partition_point(|&e| e <= x)
        }
    }

    /// Sum of in-range contents.
    pub fn integral(&self) -> f64 {
        self.contents().iter().sum()
    }

    /// Inclusive sum over cells `first..=last`, clamped like `TH1::Integral`.
    pub fn integral_range(&self, first: usize, last: usize) -> f64 {
        let overflow = self.n_bins() + 1;
        let last = if last > overflow || last < first { overflow } else { last };
        if first > last {
            return 0.0;
        }
        self.contents[first..=last].iter().sum()
    }

    /// Largest in-range content.
    pub fn maximum(&self) -> f64 {
        self.contents().iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Whether all bins share the same width.
    pub fn is_uniform(&self) -> bool {
        let w0 = self.edges[1] - self.edges[0];
        self.edges.windows(2).all(|w| approx_eq(w[1] - w[0], w0))
    }

    /// Whether `other` has the same edges.
    pub fn same_binning(&self, other: &Hist1D) -> bool {
        self.edges.len() == other.edges.len()
            && self.edges.iter().zip(&other.edges).all(|(&a, &b)| approx_eq(a, b))
    }

    fn check_compatible(&self, other: &Hist1D) -> Result<()> {
        if self.same_binning(other) {
            return Ok(());
        }
        Err(Error::IncompatibleBinning(format!(
            "'{}' has {} bins on [{}, {}], '{}' has {} bins on [{}, {}]",
            self.name,
            self.n_bins(),
            self.x_min(),
            self.x_max(),
            other.name,
            other.n_bins(),
            other.x_min(),
            other.x_max()
        )))
    }

    /// Add `other` cell by cell.
    pub fn add(&mut self, other: &Hist1D) -> Result<()> {
        self.add_scaled(other, 1.0)
    }

    /// Add `c · other`; `Σw²` grows by `c² · Σw²(other)`.
    pub fn add_scaled(&mut self, other: &Hist1D, c: f64) -> Result<()> {
        self.check_compatible(other)?;
        for (a, b) in self.contents.iter_mut().zip(&other.contents) {
            *a += c * b;
        }
        for (a, b) in self.sumw2.iter_mut().zip(&other.sumw2) {
            *a += c * c * b;
        }
        self.entries += other.entries;
        Ok(())
    }

    /// Multiply every cell by `c`.
    pub fn scale(&mut self, c: f64) {
        self.contents.iter_mut().for_each(|v| *v *= c);
        self.sumw2.iter_mut().for_each(|v| *v *= c * c);
    }

    /// Merge groups of `ngroup` adjacent bins (`TH1::Rebin(ngroup)`).
    ///
    /// When `ngroup` does not divide the bin count, the axis ends at the last
    /// complete group and the leftover bins move into the overflow.
    pub fn rebin(&self, ngroup: usize) -> Result<Hist1D> {
        let n = self.n_bins();
        if ngroup == 0 || ngroup > n {
            return Err(Error::InvalidBinning(format!(
                "cannot rebin '{}' ({} bins) by {}",
                self.name, n, ngroup
            )));
        }
        if ngroup == 1 {
            return Ok(self.clone());
        }
        let m = n / ngroup;
        let edges: Vec<f64> = (0..=m).map(|k| self.edges[k * ngroup]).collect();

        let regroup = |cells: &[f64]| -> Vec<f64> {
            let mut out = Vec::with_capacity(m + 2);
            out.push(cells[0]);
            for k in 0..m {
                out.push(cells[k * ngroup + 1..=(k + 1) * ngroup].iter().sum());
            }
            out.push(cells[m * ngroup + 1..=n + 1].iter().sum());
            out
        };

        Ok(Hist1D {
            name: self.name.clone(),
            title: self.title.clone(),
            edges,
            contents: regroup(&self.contents),
            sumw2: regroup(&self.sumw2),
            entries: self.entries,
        })
    }

    /// Rebin onto `edges` (`TH1::Rebin(n, name, xbins)`).
    ///
    /// Each old bin moves whole into the new bin holding its center; bins
    /// outside the new axis go to the new under/overflow. New edges that fall
    /// between old edges are reported since they split old bins.
    pub fn rebin_to_edges(&self, edges: &[f64]) -> Result<Hist1D> {
        validate_edges(edges)?;
        for &e in edges {
            let inside = e > self.x_min() && e < self.x_max();
            if inside && !self.edges.iter().any(|&old| approx_eq(old, e)) {
                tracing::warn!(
                    hist = %self.name,
                    edge = e,
                    "new bin edge does not coincide with an existing edge; content assigned by bin center"
                );
            }
        }
        self.move_by_center(edges.to_vec())
    }

    fn move_by_center(&self, edges: Vec<f64>) -> Result<Hist1D> {
        let mut out = Hist1D::variable(self.name.clone(), edges)?;
        out.title = self.title.clone();
        out.entries = self.entries;
        let n = self.n_bins();
        let m = out.n_bins();
        for i in 0..=n + 1 {
            let target = match i {
                0 => 0,
                _ if i == n + 1 => m + 1,
                _ => out.find_bin(self.bin_center(i)),
            };
            out.contents[target] += self.contents[i];
            out.sumw2[target] += self.sumw2[i];
        }
        Ok(out)
    }

    /// Redistribute content onto `edges` by fractional overlap.
    ///
    /// New bin `[lo, hi)` receives `Σ content_j · f_j` with error
    /// `√Σ (error_j · f_j)²`, where `f_j` is the fraction of old bin `j`'s
    /// width inside `[lo, hi)`. Flows are not carried over.
    pub fn redistribute(&self, edges: &[f64]) -> Result<Hist1D> {
        let mut out = Hist1D::variable(self.name.clone(), edges.to_vec())?;
        out.title = self.title.clone();
        out.entries = self.entries;
        let n = self.n_bins();

        for i in 1..=out.n_bins() {
            let (lo, hi) = (out.edges[i - 1], out.edges[i]);
            let first = self.find_bin(lo).max(1);
            let last = self.find_bin(hi).min(n);
            let mut content = 0.0;
            let mut err2 = 0.0;
            for j in first..=last {
                let (blo, bhi) = (self.edges[j - 1], self.edges[j]);
                let overlap = hi.min(bhi) - lo.max(blo);
                if overlap <= 0.0 {
                    continue;
                }
                let frac = overlap / (bhi - blo);
                content += self.contents[j] * frac;
                err2 += self.sumw2[j] * frac * frac;
            }
            out.contents[i] = content;
            out.sumw2[i] = err2;
        }
        Ok(out)
    }

    /// Whether common-binning resampling applies: counting histograms (name
    /// containing "num") and coarse histograms (at most 20 bins) keep their axis.
    pub fn should_resample(&self) -> bool {
        !(self.name.to_lowercase().contains("num") || self.n_bins() <= 20)
    }

    /// Move content onto a [`CommonBinning`] target by bin center.
    pub fn resample_common(&self, target: &CommonBinning) -> Result<Hist1D> {
        self.move_by_center(target.target_edges()?)
    }

    /// Zero every negative in-range bin (content and error). Returns how many changed.
    pub fn clamp_negative(&mut self) -> usize {
        let n = self.n_bins();
        let mut changed = 0;
        for i in 1..=n {
            if self.contents[i] < 0.0 {
                self.contents[i] = 0.0;
                self.sumw2[i] = 0.0;
                changed += 1;
            }
        }
        changed
    }

    /// `num / den` with uncorrelated error propagation (`TH1::Divide`).
    ///
    /// Cells with an empty denominator are set to zero with zero error.
    pub fn divide(num: &Hist1D, den: &Hist1D) -> Result<Hist1D> {
        num.check_compatible(den)?;
        let mut out = num.clone();
        for i in 0..out.contents.len() {
            let (c1, c2) = (num.contents[i], den.contents[i]);
            if c2 == 0.0 {
                out.contents[i] = 0.0;
                out.sumw2[i] = 0.0;
            } else {
                let c2sq = c2 * c2;
                out.contents[i] = c1 / c2;
                out.sumw2[i] = (num.sumw2[i] * c2sq + den.sumw2[i] * c1 * c1) / (c2sq * c2sq);
            }
        }
        Ok(out)
    }

    /// Relative statistical band `1 ∓ error/content` per in-range bin.
    ///
    /// Bins with non-positive content get a degenerate band at 1.
    pub fn relative_error_band(&self) -> (Vec<f64>, Vec<f64>) {
        let n = self.n_bins();
        (1..=n)
            .map(|i| {
                let c = self.contents[i];
                if c > 0.0 {
                    let rel = self.error(i) / c;
                    (1.0 - rel, 1.0 + rel)
                } else {
                    (1.0, 1.0)
                }
            })
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn quarters() -> Hist1D {
        Hist1D::from_bins("h", vec![0.0, 10.0, 20.0, 30.0, 40.0], &[10.0, 20.0, 30.0, 40.0], &[10.0, 20.0, 30.0, 40.0])
            .unwrap()
    }

    #[test]
    fn find_bin_follows_root_conventions() {
        let h = quarters();
        assert_eq!(h.find_bin(-1.0), 0);
        assert_eq!(h.find_bin(0.0), 1);
        assert_eq!(h.find_bin(9.999), 1);
        assert_eq!(h.find_bin(10.0), 2);
        assert_eq!(h.find_bin(39.9), 4);
        assert_eq!(h.find_bin(40.0), 5);
        assert_eq!(h.find_bin(f64::NAN), 0);
    }

    #[test]
    fn integral_range_clamps_like_root() {
        let mut h = quarters();
        h.set_content(0, 1.0);
        h.set_content(5, 2.0);
        assert_relative_eq!(h.integral(), 100.0);
        assert_relative_eq!(h.integral_range(2, 3), 50.0);
        assert_relative_eq!(h.integral_range(0, 99), 103.0);
        assert_relative_eq!(h.integral_range(3, 1), 72.0);
    }

    #[test]
    fn redistribute_splits_by_overlap() {
        let out = quarters().redistribute(&[5.0, 25.0, 40.0]).unwrap();
        // [5,25): half of bin 1, all of bin 2, half of bin 3
        assert_relative_eq!(out.content(1), 5.0 + 20.0 + 15.0);
        assert_relative_eq!(out.sumw2(1), 2.5 + 20.0 + 7.5);
        // [25,40): half of bin 3, all of bin 4
        assert_relative_eq!(out.content(2), 15.0 + 40.0);
        assert_relative_eq!(out.sumw2(2), 7.5 + 40.0);
        assert_eq!(out.underflow(), 0.0);
        assert_eq!(out.overflow(), 0.0);
    }

    #[test]
    fn redistribute_beyond_axis_keeps_only_overlap() {
        let out = quarters().redistribute(&[30.0, 60.0, 100.0]).unwrap();
        assert_relative_eq!(out.content(1), 40.0);
        assert_relative_eq!(out.content(2), 0.0);
    }

    #[test]
    fn rebin_moves_leftover_bins_to_overflow() {
        let contents: Vec<f64> = (1..=7).map(f64::from).collect();
        let mut h = Hist1D::from_bins("h", uniform_edges(7, 0.0, 7.0), &contents, &contents).unwrap();
        h.set_content(0, 0.5);
        h.set_content(8, 0.25);
        let r = h.rebin(3).unwrap();
        assert_eq!(r.edges(), &[0.0, 3.0, 6.0]);
        assert_eq!(r.contents(), &[6.0, 15.0]);
        assert_relative_eq!(r.underflow(), 0.5);
        assert_relative_eq!(r.overflow(), 7.25);
        assert_relative_eq!(r.sumw2(1), 6.0);
        assert_relative_eq!(r.total_with_flows(), h.total_with_flows());
    }

    #[test]
    fn rebin_rejects_bad_factors() {
        let h = quarters();
        assert!(h.rebin(0).is_err());
        assert!(h.rebin(5).is_err());
        assert_eq!(h.rebin(1).unwrap(), h);
    }

    #[test]
    fn rebin_to_edges_routes_outside_bins_to_flows() {
        let r = quarters().rebin_to_edges(&[10.0, 30.0]).unwrap();
        assert_eq!(r.n_bins(), 1);
        assert_relative_eq!(r.content(1), 50.0);
        assert_relative_eq!(r.underflow(), 10.0);
        assert_relative_eq!(r.overflow(), 40.0);
    }

    #[test]
    fn common_binning_truncates_far_custom_edges() {
        let target = CommonBinning {
            x_min: 0.0,
            x_max: 5.0,
            nbins: 200,
            edges: Some(vec![0.0, 1.0, 2.0, 4.0, 8.0, 16.0]),
        };
        assert_eq!(target.target_edges().unwrap(), vec![0.0, 1.0, 2.0, 4.0, 5.0]);
        let uniform = CommonBinning::uniform(4, 0.0, 2.0);
        assert_eq!(uniform.target_edges().unwrap(), vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn discrete_histograms_are_not_resampled() {
        let jets = Hist1D::uniform("Topjetnum", 50, 0.0, 50.0).unwrap();
        let coarse = Hist1D::uniform("MET", 20, 0.0, 200.0).unwrap();
        let fine = Hist1D::uniform("MET", 400, 0.0, 2000.0).unwrap();
        assert!(!jets.should_resample());
        assert!(!coarse.should_resample());
        assert!(fine.should_resample());
    }

    #[test]
    fn clamp_negative_zeroes_content_and_error() {
        let mut h = Hist1D::from_bins("h", vec![0.0, 1.0, 2.0, 3.0], &[-1.0, 2.0, -0.5], &[1.0, 2.0, 0.25]).unwrap();
        assert_eq!(h.clamp_negative(), 2);
        assert_eq!(h.contents(), &[0.0, 2.0, 0.0]);
        assert_eq!(h.errors(), vec![0.0, 2.0f64.sqrt(), 0.0]);
    }

    #[test]
    fn divide_propagates_uncorrelated_errors() {
        let num = Hist1D::from_bins("d", vec![0.0, 1.0, 2.0], &[4.0, 3.0], &[4.0, 3.0]).unwrap();
        let den = Hist1D::from_bins("mc", vec![0.0, 1.0, 2.0], &[2.0, 0.0], &[1.0, 0.0]).unwrap();
        let r = Hist1D::divide(&num, &den).unwrap();
        assert_relative_eq!(r.content(1), 2.0);
        // (4·4 + 1·16) / 16
        assert_relative_eq!(r.sumw2(1), 2.0);
        assert_eq!(r.content(2), 0.0);
        assert_eq!(r.error(2), 0.0);
    }

    #[test]
    fn add_requires_matching_edges() {
        let mut a = quarters();
        let b = Hist1D::uniform("b", 4, 0.0, 41.0).unwrap();
        assert!(matches!(a.add(&b), Err(Error::IncompatibleBinning(_))));
        let c = quarters();
        a.add_scaled(&c, 2.0).unwrap();
        assert_relative_eq!(a.content(4), 120.0);
        assert_relative_eq!(a.sumw2(4), 40.0 + 4.0 * 40.0);
    }

    #[test]
    fn relative_band_is_degenerate_for_empty_bins() {
        let h = Hist1D::from_bins("h", vec![0.0, 1.0, 2.0], &[4.0, 0.0], &[1.0, 0.0]).unwrap();
        let (lo, hi) = h.relative_error_band();
        assert_relative_eq!(lo[0], 0.75);
        assert_relative_eq!(hi[0], 1.25);
        assert_eq!((lo[1], hi[1]), (1.0, 1.0));
    }

    #[test]
    fn invalid_edges_are_rejected() {
        assert!(Hist1D::variable("h", vec![0.0]).is_err());
        assert!(Hist1D::variable("h", vec![0.0, 2.0, 1.0]).is_err());
        assert!(Hist1D::variable("h", vec![0.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn from_root_fills_missing_sumw2_from_contents() {
        let h = hs_root::HistogramWithFlows {
            histogram: hs_root::Histogram {
                name: "DileptonMass".into(),
                title: "m_{ll}".into(),
                n_bins: 2,
                x_min: 0.0,
                x_max: 2.0,
                bin_edges: vec![0.0, 1.0, 2.0],
                bin_content: vec![9.0, -4.0],
                sumw2: None,
                entries: 5.0,
            },
            underflow: 1.0,
            overflow: 0.0,
            underflow_sumw2: None,
            overflow_sumw2: None,
        };
        let h = Hist1D::from_root(h).unwrap();
        assert_eq!(h.errors(), vec![3.0, 2.0]);
        assert_eq!(h.underflow(), 1.0);
        assert_eq!(h.entries(), 5.0);
        assert_eq!(h.title(), "m_{ll}");
    }

    proptest! {
        #[test]
        fn rebin_conserves_total(contents in prop::collection::vec(-5.0f64..50.0, 2..60), ngroup in 1usize..8) {
            let n = contents.len();
            prop_assume!(ngroup <= n);
            let h = Hist1D::from_bins("p", uniform_edges(n, 0.0, n as f64), &contents, &vec![1.0; n]).unwrap();
            let r = h.rebin(ngroup).unwrap();
            prop_assert!((r.total_with_flows() - h.total_with_flows()).abs() < 1e-9 * (1.0 + h.total_with_flows().abs()));
        }

        #[test]
        fn redistribute_onto_covering_edges_conserves_integral(
            contents in prop::collection::vec(0.0f64..100.0, 1..40),
            cuts in prop::collection::vec(0.01f64..0.99, 0..6),
        ) {
            let n = contents.len();
            let hi = n as f64;
            let mut edges: Vec<f64> = cuts.iter().map(|c| c * hi).collect();
            edges.push(0.0);
            edges.push(hi);
            edges.sort_by(|a, b| a.partial_cmp(b).unwrap());
            edges.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
            let h = Hist1D::from_bins("p", uniform_edges(n, 0.0, hi), &contents, &contents).unwrap();
            let r = h.redistribute(&edges).unwrap();
            prop_assert!((r.integral() - h.integral()).abs() < 1e-6 * (1.0 + h.integral()));
        }
    }
}
