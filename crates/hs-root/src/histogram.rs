//! Histogram types returned by [`crate::RootFile`].

/// A 1D histogram extracted from a ROOT file.
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Histogram name.
    pub name: String,
    /// Histogram title.
    pub title: String,
    /// Number of bins (excluding under/overflow).
    pub n_bins: usize,
    /// Lower edge of first bin.
    pub x_min: f64,
    /// Upper edge of last bin.
    pub x_max: f64,
    /// Bin edges (length = n_bins + 1).
    pub bin_edges: Vec<f64>,
    /// Bin contents (length = n_bins, excluding under/overflow).
    pub bin_content: Vec<f64>,
    /// Sum of weights squared per bin, if the histogram stored it.
    pub sumw2: Option<Vec<f64>>,
    /// `fEntries` as stored by ROOT.
    pub entries: f64,
}

/// A 1D histogram plus its underflow/overflow cells.
#[derive(Debug, Clone)]
pub struct HistogramWithFlows {
    /// In-range histogram.
    pub histogram: Histogram,
    /// Underflow content.
    pub underflow: f64,
    /// Overflow content.
    pub overflow: f64,
    /// Underflow sumw2, if stored.
    pub underflow_sumw2: Option<f64>,
    /// Overflow sumw2, if stored.
    pub overflow_sumw2: Option<f64>,
}

impl HistogramWithFlows {
    /// Drop the flow cells.
    pub fn into_histogram(self) -> Histogram {
        self.histogram
    }
}
