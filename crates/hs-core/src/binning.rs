//! Common-binning harmonization and binning consistency reports.

use std::fmt;

use crate::hist::{EDGE_RTOL, Hist1D};

/// Rebin factors commonly used for the analysis histograms.
pub const RECOMMENDED_REBIN_FACTORS: [usize; 8] = [1, 2, 4, 5, 8, 10, 16, 20];

/// Greatest common divisor of two integers.
pub fn gcd(a: usize, b: usize) -> usize {
    if b == 0 { a } else { gcd(b, a % b) }
}

/// Greatest common divisor of a list (0 for an empty list).
pub fn gcd_list(values: &[usize]) -> usize {
    values.iter().copied().fold(0, gcd)
}

/// Bring uniformly binned histograms with a shared range to a common bin count.
///
/// The common count is the GCD of all bin counts; each histogram is rebinned
/// by `n / gcd`. Histograms with differing ranges cannot be unified this way
/// (they need variable binning), in which case nothing is changed and `None`
/// is returned.
pub fn harmonize_uniform<'a>(hists: impl IntoIterator<Item = &'a mut Hist1D>) -> Option<usize> {
    let mut hists: Vec<&mut Hist1D> = hists.into_iter().collect();
    let first = hists.first()?;
    let (x_min, x_max) = (first.x_min(), first.x_max());

    let same_range = hists.iter().all(|h| close(h.x_min(), x_min) && close(h.x_max(), x_max));
    if !same_range {
        tracing::warn!("histogram ranges differ; cannot unify by GCD, use explicit bin edges instead");
        return None;
    }

    let counts: Vec<usize> = hists.iter().map(|h| h.n_bins()).collect();
    let common = gcd_list(&counts);
    if common == 0 {
        tracing::warn!("could not determine a common bin count");
        return None;
    }
    if let Some(h) = hists.iter().find(|h| h.n_bins() % common != 0) {
        tracing::warn!(hist = %h.name(), bins = h.n_bins(), common, "bin count not divisible by common count");
        return None;
    }

    let mut rebinned = Vec::with_capacity(hists.len());
    for h in &hists {
        match h.rebin(h.n_bins() / common) {
            Ok(r) => rebinned.push(r),
            Err(e) => {
                tracing::warn!(hist = %h.name(), error = %e, "harmonization failed");
                return None;
            }
        }
    }
    for (h, r) in hists.iter_mut().zip(rebinned) {
        **h = r;
    }

    let width = (x_max - x_min) / common as f64;
    tracing::info!(bins = common, width, "unified histograms to common binning");
    Some(common)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= EDGE_RTOL * a.abs().max(b.abs()).max(1.0)
}

/// Divisors of `n` up to 20, i.e. the uniform rebin factors that keep every bin whole.
pub fn possible_rebin_factors(n: usize) -> Vec<usize> {
    (1..=n.min(20)).filter(|f| n % f == 0).collect()
}

/// The subset of [`possible_rebin_factors`] among [`RECOMMENDED_REBIN_FACTORS`].
pub fn recommended_rebin_factors(n: usize) -> Vec<usize> {
    possible_rebin_factors(n).into_iter().filter(|f| RECOMMENDED_REBIN_FACTORS.contains(f)).collect()
}

/// Per-histogram line of a [`BinningReport`].
#[derive(Debug, Clone)]
pub struct BinningEntry {
    /// Sample label.
    pub label: String,
    /// Whether the sample is a signal.
    pub is_signal: bool,
    /// Bin count.
    pub n_bins: usize,
    /// Axis range.
    pub range: (f64, f64),
    /// Width of the first bin.
    pub first_width: f64,
    /// Whether all bins share the same width.
    pub uniform: bool,
    /// `fEntries`.
    pub entries: f64,
    /// In-range integral.
    pub integral: f64,
    /// Bins with non-zero content.
    pub non_empty: usize,
    /// First few low edges.
    pub low_edges: Vec<f64>,
}

/// Binning consistency check across a set of histograms.
#[derive(Debug, Clone, Default)]
pub struct BinningReport {
    /// One entry per histogram, in input order.
    pub entries: Vec<BinningEntry>,
}

impl BinningReport {
    /// Summarize `hists`, given as `(label, is_signal, histogram)`.
    pub fn analyze<'a>(hists: impl IntoIterator<Item = (&'a str, bool, &'a Hist1D)>) -> Self {
        let entries = hists
            .into_iter()
            .map(|(label, is_signal, h)| BinningEntry {
                label: label.to_string(),
                is_signal,
                n_bins: h.n_bins(),
                range: (h.x_min(), h.x_max()),
                first_width: h.bin_width(1),
                uniform: h.is_uniform(),
                entries: h.entries(),
                integral: h.integral(),
                non_empty: h.contents().iter().filter(|&&c| c != 0.0).count(),
                low_edges: h.edges().iter().take(5).copied().collect(),
            })
            .collect();
        Self { entries }
    }

    /// All histograms have the same bin count.
    pub fn same_bin_count(&self) -> bool {
        self.all_same(|e| e.n_bins as f64)
    }

    /// All histograms share the same range.
    pub fn same_range(&self) -> bool {
        self.all_same(|e| e.range.0) && self.all_same(|e| e.range.1)
    }

    /// All histograms share the same first-bin width.
    pub fn same_width(&self) -> bool {
        self.all_same(|e| e.first_width)
    }

    /// Distinct bin counts of signal and background histograms.
    pub fn bin_counts_by_role(&self) -> (Vec<usize>, Vec<usize>) {
        let distinct = |signal: bool| {
            let mut v: Vec<usize> = self.entries.iter().filter(|e| e.is_signal == signal).map(|e| e.n_bins).collect();
            v.sort_unstable();
            v.dedup();
            v
        };
        (distinct(true), distinct(false))
    }

    /// Whether the report describes a consistent set.
    pub fn is_consistent(&self) -> bool {
        self.same_bin_count() && self.same_range() && self.same_width()
    }

    fn all_same(&self, key: impl Fn(&BinningEntry) -> f64) -> bool {
        let mut it = self.entries.iter().map(key);
        match it.next() {
            Some(first) => it.all(|v| close(v, first)),
            None => true,
        }
    }
}

impl fmt::Display for BinningReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<40} {:>6} {:>10} {:>10} {:>10} {:>12} {:>14}", "sample", "bins", "xmin", "xmax", "width", "entries", "integral")?;
        writeln!(f, "{}", "-".repeat(108))?;
        for e in &self.entries {
            let tag = if e.is_signal { "[S]" } else { "[B]" };
            writeln!(
                f,
                "{:<40} {:>6} {:>10.3} {:>10.3} {:>10.4} {:>12.0} {:>14.3}{}",
                format!("{} {}", tag, e.label),
                e.n_bins,
                e.range.0,
                e.range.1,
                e.first_width,
                e.entries,
                e.integral,
                if e.uniform { "" } else { "  (variable)" }
            )?;
        }
        writeln!(f)?;
        let yes_no = |b: bool| if b { "yes" } else { "NO" };
        writeln!(f, "same bin count: {}", yes_no(self.same_bin_count()))?;
        writeln!(f, "same range:     {}", yes_no(self.same_range()))?;
        writeln!(f, "same bin width: {}", yes_no(self.same_width()))?;
        let (sig, bkg) = self.bin_counts_by_role();
        if !sig.is_empty() && !bkg.is_empty() {
            writeln!(f, "signal bin counts: {:?}, background bin counts: {:?}", sig, bkg)?;
            if sig != bkg {
                writeln!(f, "signal and background binning differ")?;
            }
        }
        if let Some(first) = self.entries.first() {
            writeln!(f, "possible rebin factors (<= 20): {:?}", possible_rebin_factors(first.n_bins))?;
            writeln!(f, "recommended rebin factors:      {:?}", recommended_rebin_factors(first.n_bins))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat(name: &str, n: usize, hi: f64) -> Hist1D {
        let ones = vec![1.0; n];
        Hist1D::from_bins(name, (0..=n).map(|i| i as f64 * hi / n as f64).collect(), &ones, &ones).unwrap()
    }

    #[test]
    fn gcd_of_lists() {
        assert_eq!(gcd_list(&[400, 200, 100]), 100);
        assert_eq!(gcd_list(&[12, 18]), 6);
        assert_eq!(gcd_list(&[7]), 7);
        assert_eq!(gcd_list(&[]), 0);
    }

    #[test]
    fn harmonize_rebins_to_gcd() {
        let mut a = flat("a", 400, 2000.0);
        let mut b = flat("b", 100, 2000.0);
        let mut c = flat("c", 200, 2000.0);
        let common = harmonize_uniform([&mut a, &mut b, &mut c]);
        assert_eq!(common, Some(100));
        for h in [&a, &b, &c] {
            assert_eq!(h.n_bins(), 100);
            assert_relative_eq!(h.bin_width(1), 20.0);
        }
        assert_relative_eq!(a.content(1), 4.0);
        assert_relative_eq!(c.content(1), 2.0);
    }

    #[test]
    fn harmonize_refuses_different_ranges() {
        let mut a = flat("a", 40, 2000.0);
        let mut b = flat("b", 20, 3000.0);
        assert_eq!(harmonize_uniform([&mut a, &mut b]), None);
        assert_eq!(a.n_bins(), 40);
        assert_eq!(b.n_bins(), 20);
    }

    #[test]
    fn harmonize_empty_is_none() {
        assert_eq!(harmonize_uniform(std::iter::empty::<&mut Hist1D>()), None);
    }

    #[test]
    fn rebin_factor_suggestions() {
        assert_eq!(possible_rebin_factors(40), vec![1, 2, 4, 5, 8, 10, 20]);
        assert_eq!(recommended_rebin_factors(40), vec![1, 2, 4, 5, 8, 10, 20]);
        assert_eq!(recommended_rebin_factors(30), vec![1, 2, 5, 10]);
        assert_eq!(possible_rebin_factors(7), vec![1, 7]);
    }

    #[test]
    fn report_flags_inconsistent_binning() {
        let s = flat("sig", 80, 8000.0);
        let b1 = flat("bkg1", 40, 8000.0);
        let b2 = flat("bkg2", 40, 8000.0);
        let report = BinningReport::analyze([("TB_WR4000_N100", true, &s), ("TTLJ", false, &b1), ("TTLL", false, &b2)]);
        assert!(!report.same_bin_count());
        assert!(report.same_range());
        assert!(!report.is_consistent());
        assert_eq!(report.bin_counts_by_role(), (vec![80], vec![40]));
        let text = report.to_string();
        assert!(text.contains("[S] TB_WR4000_N100"));
        assert!(text.contains("signal and background binning differ"));
        assert!(text.contains("recommended rebin factors"));
    }
}
