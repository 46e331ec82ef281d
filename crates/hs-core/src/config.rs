//! Analysis configuration and built-in presets.
//!
//! An [`AnalysisConfig`] describes one plotting job end to end: which files
//! are data, signal and background, how backgrounds are grouped, how
//! histograms are rebinned and how the axes look. Every field has a serde
//! default so YAML files only need to spell out what differs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hist::{CommonBinning, validate_edges};
use crate::sample::{Pattern, SampleRules};
use crate::stack::GroupRule;

/// Names of the built-in presets.
pub const PRESET_NAMES: [&str; 4] = ["dy", "ttbar", "signal", "cr"];

/// Fill colors assigned to stack components in order.
pub const DEFAULT_PALETTE: [&str; 6] = ["#5790fc", "#f89c20", "#964a8b", "#CDDC39", "#009688", "#795548"];

/// Gray used for the `Others` component.
pub const OTHERS_COLOR: &str = "#9c9ca1";

/// Red used for signals.
pub const SIGNAL_COLOR: &str = "#e42536";

/// What is compared against what.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotKind {
    /// Data points over the stacked simulation; ratio Data / MC.
    #[default]
    DataVsMc,
    /// Signal line over the stacked backgrounds; ratio Signal / Background.
    SignalVsBackground,
}

/// How stack components are formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackMode {
    /// Merge samples into [`GroupRule`]s.
    #[default]
    Grouped,
    /// Keep the largest samples individually; merge the rest into `Others`.
    TopN,
}

/// How custom bin edges are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeMethod {
    /// Split bin contents proportionally to their overlap with the new bins.
    #[default]
    Overlap,
    /// Move whole bins by their center.
    Exact,
}

/// Common-binning strategy for inputs with different bin counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Harmonize {
    /// Rebin everything to the GCD of the bin counts.
    #[default]
    Gcd,
    /// Leave binning as read.
    None,
}

/// Error model for data points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataErrorModel {
    /// Symmetric `sqrt(sumw2)`.
    #[default]
    Sumw2,
    /// Garwood 68% intervals for integer counts.
    Poisson,
}

/// Stack building options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Grouped or top-N.
    pub mode: StackMode,
    /// Individual components kept in top-N mode.
    pub top_n: usize,
    /// Color of the `Others` component.
    pub others_color: String,
    /// Suffixes removed from sample names in legends.
    pub strip_suffixes: Vec<String>,
    /// One plot per signal sample.
    pub per_signal: bool,
    /// Prefix stripped from signal names to form the mass-point label.
    pub mass_point_prefix: Option<String>,
    /// Line color of the signal.
    pub signal_color: String,
    /// Legend label of the summed signal.
    pub signal_label: String,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            mode: StackMode::Grouped,
            top_n: 5,
            others_color: OTHERS_COLOR.to_string(),
            strip_suffixes: vec!["_powheg".to_string(), "_pythia".to_string()],
            per_signal: false,
            mass_point_prefix: None,
            signal_color: SIGNAL_COLOR.to_string(),
            signal_label: "Signal".to_string(),
        }
    }
}

/// Samples drawn as lines on top of the stack instead of inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Draw matching samples as lines. When off they are stacked like any background.
    pub enabled: bool,
    /// Sample-name prefixes selecting overlay samples.
    pub prefixes: Vec<String>,
    /// One plot per overlay sample.
    pub per_sample: bool,
    /// Labels start at this substring when present.
    pub label_from: Option<String>,
    /// Line color.
    pub color: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            prefixes: Vec::new(),
            per_sample: false,
            label_from: Some("WR".to_string()),
            color: "#ff0000".to_string(),
        }
    }
}

impl OverlayConfig {
    /// Whether `sample` is drawn as an overlay.
    pub fn matches(&self, sample: &str) -> bool {
        self.enabled && self.prefixes.iter().any(|p| sample.starts_with(p.as_str()))
    }
}

/// Rebinning applied before stacking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinningConfig {
    /// Uniform rebin factor (1 = none).
    pub rebin: usize,
    /// Custom bin edges; take precedence over `rebin`.
    pub edges: Option<Vec<f64>>,
    /// How `edges` are applied.
    pub edge_method: EdgeMethod,
    /// Common-binning strategy when `edges` is not set.
    pub harmonize: Harmonize,
    /// Target binning applied while loading.
    pub common: Option<CommonBinning>,
    /// Zero out negative bins after rebinning.
    pub clamp_negative: bool,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            rebin: 1,
            edges: None,
            edge_method: EdgeMethod::Overlap,
            harmonize: Harmonize::Gcd,
            common: None,
            clamp_negative: false,
        }
    }
}

/// Axis ranges, titles and scales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxesConfig {
    /// Visible x range; defaults to the histogram range.
    pub x_range: Option<(f64, f64)>,
    /// X-axis title (TLatex subset).
    pub x_title: String,
    /// Y-axis title.
    pub y_title: String,
    /// Logarithmic y axis.
    pub logy: bool,
    /// Logarithmic x axis.
    pub logx: bool,
    /// Labelled ticks for a logarithmic x axis.
    pub custom_x_ticks: Option<Vec<f64>>,
    /// Explicit y minimum.
    pub y_min: Option<f64>,
    /// Explicit y maximum.
    pub y_max: Option<f64>,
    /// Ratio-panel y range.
    pub ratio_range: (f64, f64),
    /// Ratio-panel y title.
    pub ratio_title: String,
    /// Dashed line at y = 1 on the main panel. The ratio panel always has one.
    pub show_unity_line: bool,
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            x_range: None,
            x_title: String::new(),
            y_title: "Events / bin".to_string(),
            logy: false,
            logx: false,
            custom_x_ticks: None,
            y_min: None,
            y_max: None,
            ratio_range: (0.5, 1.5),
            ratio_title: "Data / MC".to_string(),
            show_unity_line: false,
        }
    }
}

/// Experiment label drawn above the plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Experiment name, drawn in bold.
    pub experiment: String,
    /// Status text, drawn in italic.
    pub status: String,
    /// Integrated luminosity in fb⁻¹.
    pub lumi: Option<f64>,
    /// Centre-of-mass energy in TeV.
    pub energy_tev: Option<f64>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self { experiment: "CMS".to_string(), status: "Preliminary".to_string(), lumi: None, energy_tev: Some(13.6) }
    }
}

impl LabelConfig {
    /// Right-hand header text, e.g. `26.6717 fb^{-1} (13.6 TeV)`.
    pub fn lumi_text(&self) -> String {
        match (self.lumi, self.energy_tev) {
            (Some(l), Some(e)) => format!("{} fb^{{-1}} ({} TeV)", l, e),
            (Some(l), None) => format!("{} fb^{{-1}}", l),
            (None, Some(e)) => format!("({} TeV)", e),
            (None, None) => String::new(),
        }
    }
}

/// A complete plotting job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Preset or job name.
    pub name: String,
    /// Comparison type.
    pub kind: PlotKind,
    /// Histogram name inside the systematic directory.
    pub histogram: String,
    /// Systematic directory (empty = top level).
    pub systematic: String,
    /// Directory holding the sample files.
    pub input_dir: PathBuf,
    /// Output prefix; extensions are appended.
    pub output: String,
    /// File classification.
    pub samples: SampleRules,
    /// Stack groups in priority order.
    pub groups: Vec<GroupRule>,
    /// Fill colors for groups without an explicit color.
    pub palette: Vec<String>,
    /// Stack options.
    pub stack: StackConfig,
    /// Overlay options.
    pub overlay: OverlayConfig,
    /// Rebinning.
    pub binning: BinningConfig,
    /// Axes.
    pub axes: AxesConfig,
    /// Header label.
    pub label: LabelConfig,
    /// Error model for data points.
    pub data_errors: DataErrorModel,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            name: "custom".to_string(),
            kind: PlotKind::DataVsMc,
            histogram: String::new(),
            systematic: "Central".to_string(),
            input_dir: PathBuf::from("."),
            output: "stacked_plot".to_string(),
            samples: SampleRules::default(),
            groups: Vec::new(),
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            stack: StackConfig::default(),
            overlay: OverlayConfig::default(),
            binning: BinningConfig::default(),
            axes: AxesConfig::default(),
            label: LabelConfig::default(),
            data_errors: DataErrorModel::Sumw2,
        }
    }
}

impl AnalysisConfig {
    /// Built-in preset by name.
    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "dy" => Ok(dy()),
            "ttbar" => Ok(ttbar()),
            "signal" => Ok(signal()),
            "cr" => Ok(control_region()),
            other => Err(Error::Validation(format!(
                "unknown preset '{}' (available: {})",
                other,
                PRESET_NAMES.join(", ")
            ))),
        }
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_yaml_ng::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Serialize to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Check the settings that would otherwise fail deep inside the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.histogram.is_empty() {
            return Err(Error::Validation("histogram name is empty".into()));
        }
        if self.binning.rebin == 0 {
            return Err(Error::Validation("rebin factor must be at least 1".into()));
        }
        if let Some(edges) = &self.binning.edges {
            validate_edges(edges)?;
        }
        if let Some((lo, hi)) = self.axes.x_range
            && !(lo < hi)
        {
            return Err(Error::Validation(format!("x range [{}, {}] is empty", lo, hi)));
        }
        let (rlo, rhi) = self.axes.ratio_range;
        if !(rlo < rhi) {
            return Err(Error::Validation(format!("ratio range [{}, {}] is empty", rlo, rhi)));
        }
        if let (Some(lo), Some(hi)) = (self.axes.y_min, self.axes.y_max)
            && lo >= hi
        {
            return Err(Error::Validation(format!("y range [{}, {}] is empty", lo, hi)));
        }
        if self.axes.logy && self.axes.y_min.is_some_and(|y| y <= 0.0) {
            return Err(Error::Validation("log y axis needs a positive y minimum".into()));
        }
        if self.stack.mode == StackMode::TopN && self.stack.top_n == 0 {
            return Err(Error::Validation("top_n must be at least 1".into()));
        }
        Ok(())
    }
}

fn patterns(list: &[&str]) -> Vec<Pattern> {
    list.iter().map(|&p| Pattern::from(p)).collect()
}

fn palette(extra: &[&str]) -> Vec<String> {
    DEFAULT_PALETTE.iter().chain(extra).map(|c| c.to_string()).collect()
}

fn dy() -> AnalysisConfig {
    AnalysisConfig {
        name: "dy".into(),
        histogram: "DileptonMass".into(),
        output: "DY_DileptonZMass_comparison_2022".into(),
        samples: SampleRules {
            data: patterns(&["Muon_E", "Muon_F.root", "Muon_G.root"]),
            signal: patterns(&["DYJets.root", "DYJets10to50.root"]),
            exclude: patterns(&[
                "DYJet", "TBChannel", "Muon_", "EGamma_", "MuonEG_", "SingleMuon", "ZZTwo", "WZTo", "WJets_MG", "DYG",
            ]),
        },
        groups: vec![
            GroupRule::new("DYJets", &["DYJets"]).label("Drell-Yan").color(SIGNAL_COLOR),
            GroupRule::new("TT", &["TTLJ", "TTLL"]).color(DEFAULT_PALETTE[0]),
            GroupRule::new("VV", &["WZ", "WW", "ZZ"]).color(DEFAULT_PALETTE[1]),
            GroupRule::new("ST", &["ST"]).label("Single Top").color(DEFAULT_PALETTE[2]),
            GroupRule::new("QCD", &["QCD"]).color(DEFAULT_PALETTE[3]),
        ],
        binning: BinningConfig { rebin: 2, ..BinningConfig::default() },
        axes: AxesConfig {
            x_range: Some((15.0, 3000.0)),
            x_title: "m_{ll} [GeV]".into(),
            logy: true,
            custom_x_ticks: Some(vec![20.0, 30.0, 40.0, 100.0, 200.0, 1000.0, 2000.0]),
            y_min: Some(0.1),
            y_max: Some(1e6),
            ratio_range: (0.4, 1.6),
            ..AxesConfig::default()
        },
        label: LabelConfig { lumi: Some(26.6717), ..LabelConfig::default() },
        ..AnalysisConfig::default()
    }
}

fn ttbar() -> AnalysisConfig {
    AnalysisConfig {
        name: "ttbar".into(),
        histogram: "TTbarTransverseMass_v2".into(),
        output: "TTbar_StackedMC_comparison_2022".into(),
        samples: SampleRules {
            data: patterns(&["Muon_C.root", "Muon_D.root", "SingleMuon"]),
            signal: patterns(&["TTLJ_powheg.root"]),
            exclude: patterns(&[
                "TTLJ", "Muon_", "EGamma_", "MuonEG_", "SingleMuon", "ZZTo", "WZTo", "DYJets10", "DYJets_MG", "DYG",
                "WJets", "TTG", "TBChannel", "*bcToE.root",
            ]),
        },
        groups: vec![
            GroupRule::new("TTLJ", &["TTLJ"]).color(SIGNAL_COLOR),
            GroupRule::new("TTLL", &["TTLL"]).color(DEFAULT_PALETTE[0]),
            GroupRule::new("ST", &["ST"]).label("Single Top").color(DEFAULT_PALETTE[1]),
            GroupRule::new("DYJets", &["DYJets"]).label("Drell-Yan").color(DEFAULT_PALETTE[2]),
            GroupRule::new("QCD", &["QCD"]).color(DEFAULT_PALETTE[3]),
        ],
        binning: BinningConfig { rebin: 5, ..BinningConfig::default() },
        axes: AxesConfig {
            x_range: Some((0.0, 2000.0)),
            x_title: "m_{T}^{t#bar{t}} [GeV]".into(),
            logy: true,
            y_min: Some(0.1),
            y_max: Some(1e5),
            ratio_range: (0.5, 2.0),
            ..AxesConfig::default()
        },
        label: LabelConfig { lumi: Some(7.9104), ..LabelConfig::default() },
        ..AnalysisConfig::default()
    }
}

fn signal() -> AnalysisConfig {
    let mut edges = vec![0.0, 1000.0];
    edges.extend((0..=12).map(|i| 2000.0 + 500.0 * i as f64));
    AnalysisConfig {
        name: "signal".into(),
        kind: PlotKind::SignalVsBackground,
        histogram: "WRMass_Central".into(),
        output: "signal_background_plot".into(),
        samples: SampleRules {
            data: Vec::new(),
            signal: patterns(&["TB"]),
            exclude: patterns(&["Muon_", "EGamma_", "MuonEG_", "SingleMuon"]),
        },
        stack: StackConfig {
            mode: StackMode::TopN,
            top_n: 5,
            per_signal: true,
            mass_point_prefix: Some("TBChannel_".into()),
            ..StackConfig::default()
        },
        binning: BinningConfig {
            edges: Some(edges),
            edge_method: EdgeMethod::Exact,
            clamp_negative: true,
            ..BinningConfig::default()
        },
        axes: AxesConfig {
            x_range: Some((0.0, 8000.0)),
            x_title: "M_{W_{R}} [GeV]".into(),
            logy: true,
            y_min: Some(0.001),
            ratio_range: (0.001, 1e3),
            ratio_title: "Signal / Background".into(),
            show_unity_line: true,
            ..AxesConfig::default()
        },
        label: LabelConfig { status: "Simulation Preliminary".into(), lumi: Some(26.6717), ..LabelConfig::default() },
        ..AnalysisConfig::default()
    }
}

fn control_region() -> AnalysisConfig {
    AnalysisConfig {
        name: "cr".into(),
        histogram: "Topjetnum".into(),
        output: "Topjetnum_CR_2022".into(),
        samples: SampleRules {
            data: patterns(&["Muon_C.root", "Muon_D.root", "SingleMuon"]),
            signal: patterns(&["TB"]),
            exclude: patterns(&[
                "Muon_", "EGamma_", "MuonEG_", "ZZTo", "WZTo", "DYJets_MG", "DYG", "TTG", "DYJets10to50_MG",
                "*bcToE.root",
            ]),
        },
        groups: vec![
            GroupRule::new("TTLJ", &["TTLJ"]).color("#00C853"),
            GroupRule::new("TTLL", &["TTLL"]).color(DEFAULT_PALETTE[0]),
            GroupRule::new("ST", &["ST"]).label("Single Top").color(DEFAULT_PALETTE[1]),
            GroupRule::new("DYJets", &["DYJets"]).label("Drell-Yan").color(DEFAULT_PALETTE[2]),
            GroupRule::new("QCD", &["QCD"]).color(DEFAULT_PALETTE[3]),
            GroupRule::new("TTZ,TTW", &["TTZ", "TTW"]).color(DEFAULT_PALETTE[4]),
            GroupRule::new("TTH", &["TTH"]).color(DEFAULT_PALETTE[5]),
            GroupRule::new("TTTT", &["TTTT"]).color("#00bfae"),
        ],
        palette: palette(&["#00bfae"]),
        overlay: OverlayConfig {
            enabled: true,
            prefixes: vec!["TB".into()],
            per_sample: true,
            ..OverlayConfig::default()
        },
        binning: BinningConfig {
            common: Some(CommonBinning::uniform(200, 0.0, 5.0)),
            ..BinningConfig::default()
        },
        axes: AxesConfig {
            x_range: Some((0.0, 5.0)),
            x_title: "N_{top jets}".into(),
            // Log by default; `--linear` gives the linear view.
            logy: true,
            y_min: Some(1e-3),
            y_max: Some(1e6),
            ratio_range: (0.5, 1.5),
            ..AxesConfig::default()
        },
        label: LabelConfig { lumi: Some(7.9804), ..LabelConfig::default() },
        ..AnalysisConfig::default()
    }
}
