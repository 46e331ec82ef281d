//! Numbers-first description of a stacked plot.
//!
//! The artifact holds everything a renderer needs (bin edges, per-component
//! yields, data points with errors, ratio, bands, axis and label settings)
//! and nothing renderer-specific. It round-trips through JSON so a plot can
//! be re-rendered with a different style without touching the inputs.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::config::DataErrorModel;
use crate::error::{Error, Result};
use crate::hist::Hist1D;
use crate::stack::Stack;

/// Schema identifier written into every artifact.
pub const SCHEMA_VERSION: &str = "hepstack_stack_plot_v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackPlotArtifact {
    pub schema_version: String,
    pub meta: PlotMeta,
    pub bin_edges: Vec<f64>,
    /// Stack components, bottom to top.
    pub stack: Vec<StackSeries>,
    /// Stack component names in legend order.
    pub stack_order: Vec<String>,
    pub total_y: Vec<f64>,
    pub total_yerr: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DataSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<LineSeries>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlays: Vec<LineSeries>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio: Option<RatioSeries>,
    /// Relative statistical uncertainty of the total stack, drawn around 1 in the ratio panel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio_band: Option<BandEnvelope>,
    /// Absolute statistical uncertainty of the total stack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mc_band: Option<BandEnvelope>,
    pub legend: Vec<LegendEntry>,
    pub axes: AxesArtifact,
    pub label: LabelArtifact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotMeta {
    pub tool: String,
    pub tool_version: String,
    pub created_unix_ms: u128,
    pub config_name: String,
    pub histogram: String,
    pub systematic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_dir: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSeries {
    pub name: String,
    pub label: String,
    pub color: String,
    pub y: Vec<f64>,
    pub yerr: Vec<f64>,
    pub integral: f64,
    pub n_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSeries {
    pub label: String,
    pub y: Vec<f64>,
    pub yerr_lo: Vec<f64>,
    pub yerr_hi: Vec<f64>,
    pub integral: f64,
    pub error_model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub label: String,
    pub color: String,
    pub y: Vec<f64>,
}

/// How the ratio is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioStyle {
    /// Markers with vertical error bars.
    Points,
    /// Step line.
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioSeries {
    pub numerator: String,
    pub denominator: String,
    pub y: Vec<f64>,
    pub yerr: Vec<f64>,
    pub style: RatioStyle,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandEnvelope {
    pub lo: Vec<f64>,
    pub hi: Vec<f64>,
}

/// Swatch drawn next to a legend label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegendKind {
    /// Filled box.
    Fill,
    /// Horizontal line.
    Line,
    /// Marker with error bar.
    Marker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub label: String,
    pub kind: LegendKind,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxesArtifact {
    pub x_range: (f64, f64),
    pub x_title: String,
    pub y_title: String,
    pub y_range: (f64, f64),
    pub logy: bool,
    pub logx: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_x_ticks: Option<Vec<f64>>,
    pub ratio_range: (f64, f64),
    pub ratio_title: String,
    /// Dashed line at y = 1 on the main panel.
    #[serde(default)]
    pub show_unity_line: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelArtifact {
    pub experiment: String,
    pub status: String,
    pub lumi_text: String,
}

impl StackPlotArtifact {
    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.bin_edges.len().saturating_sub(1)
    }

    /// Check that every per-bin series has one value per bin.
    pub fn validate(&self) -> Result<()> {
        let n = self.n_bins();
        if n == 0 {
            return Err(Error::Validation("artifact has no bins".into()));
        }
        let check = |what: &str, len: usize| -> Result<()> {
            if len == n {
                Ok(())
            } else {
                Err(Error::Validation(format!("{} has {} values for {} bins", what, len, n)))
            }
        };
        for s in &self.stack {
            check(&format!("stack component '{}'", s.name), s.y.len())?;
            check(&format!("stack component '{}' errors", s.name), s.yerr.len())?;
        }
        check("total", self.total_y.len())?;
        check("total errors", self.total_yerr.len())?;
        if let Some(d) = &self.data {
            check("data", d.y.len())?;
            check("data low errors", d.yerr_lo.len())?;
            check("data high errors", d.yerr_hi.len())?;
        }
        for l in self.signal.iter().chain(&self.overlays) {
            check(&format!("line '{}'", l.name), l.y.len())?;
        }
        if let Some(r) = &self.ratio {
            check("ratio", r.y.len())?;
            check("ratio errors", r.yerr.len())?;
        }
        for b in self.ratio_band.iter().chain(&self.mc_band) {
            check("band low edge", b.lo.len())?;
            check("band high edge", b.hi.len())?;
        }
        Ok(())
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate a JSON artifact.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let a: Self = serde_json::from_str(s)?;
        if a.schema_version != SCHEMA_VERSION {
            return Err(Error::Validation(format!(
                "unsupported artifact schema '{}' (expected '{}')",
                a.schema_version, SCHEMA_VERSION
            )));
        }
        a.validate()?;
        Ok(a)
    }

    /// Read a JSON artifact from disk.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }
}

pub(crate) fn now_unix_ms() -> Result<u128> {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Validation(format!("system time error: {}", e)))?;
    Ok(d.as_millis())
}

fn is_near_integer_nonneg(x: f64) -> Option<u64> {
    if !(x.is_finite() && x >= 0.0) {
        return None;
    }
    let r = x.round();
    if (x - r).abs() <= 1e-9 { Some(r as u64) } else { None }
}

/// Central 68% Garwood interval for `n` observed events, as `(n - lo, hi - n)`.
pub fn garwood_68_interval(n: u64) -> Option<(f64, f64)> {
    let alpha = 0.31731_f64;
    let lo = if n == 0 {
        0.0
    } else {
        let q = ChiSquared::new(2.0 * n as f64).ok()?.inverse_cdf(alpha / 2.0);
        n as f64 - 0.5 * q
    };
    let q_hi = ChiSquared::new(2.0 * (n + 1) as f64).ok()?.inverse_cdf(1.0 - alpha / 2.0);
    Some((lo, 0.5 * q_hi - n as f64))
}

/// Series for a data histogram under `model`.
///
/// The Poisson model falls back to `sqrt(sumw2)` for bins whose content is
/// not a non-negative integer; the recorded model name says so.
pub fn data_series(hist: &Hist1D, model: DataErrorModel) -> DataSeries {
    let y = hist.contents().to_vec();
    let sym = hist.errors();
    let (yerr_lo, yerr_hi, error_model) = match model {
        DataErrorModel::Sumw2 => (sym.clone(), sym, "sumw2".to_string()),
        DataErrorModel::Poisson => {
            let mut lo = Vec::with_capacity(y.len());
            let mut hi = Vec::with_capacity(y.len());
            let mut all_poisson = true;
            for (&v, &e) in y.iter().zip(&sym) {
                match is_near_integer_nonneg(v).and_then(garwood_68_interval) {
                    Some((dl, dh)) => {
                        lo.push(dl);
                        hi.push(dh);
                    }
                    None => {
                        all_poisson = false;
                        lo.push(e);
                        hi.push(e);
                    }
                }
            }
            let name = if all_poisson { "garwood_poisson_68" } else { "garwood_poisson_68_sumw2_fallback" };
            (lo, hi, name.to_string())
        }
    };
    DataSeries { label: "Data".to_string(), integral: hist.integral(), y, yerr_lo, yerr_hi, error_model }
}

/// Series for every stack component, bottom to top.
pub fn stack_series(stack: &Stack) -> Vec<StackSeries> {
    stack
        .components
        .iter()
        .map(|c| StackSeries {
            name: c.name.clone(),
            label: c.label.clone(),
            color: c.color.clone(),
            y: c.hist.contents().to_vec(),
            yerr: c.hist.errors(),
            integral: c.integral,
            n_samples: c.n_samples,
        })
        .collect()
}

/// Line series for a histogram.
pub fn line_series(name: &str, label: &str, color: &str, hist: &Hist1D) -> LineSeries {
    LineSeries { name: name.to_string(), label: label.to_string(), color: color.to_string(), y: hist.contents().to_vec() }
}

/// `total ± error` per bin.
pub fn absolute_band(total: &Hist1D) -> BandEnvelope {
    let (lo, hi) = total.contents().iter().zip(total.errors()).map(|(&c, e)| (c - e, c + e)).unzip();
    BandEnvelope { lo, hi }
}

/// `1 ± error / total` per bin.
pub fn relative_band(total: &Hist1D) -> BandEnvelope {
    let (lo, hi) = total.relative_error_band();
    BandEnvelope { lo, hi }
}
