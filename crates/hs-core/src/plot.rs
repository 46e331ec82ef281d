//! Plot assembly: from loaded samples to [`StackPlotArtifact`]s.
//!
//! [`build_plots`] is the single entry point. It applies the configured
//! binning, builds the stack, and emits one artifact per output file (one in
//! the common case; one per signal or per overlay sample when configured).

use crate::artifact::{
    self, AxesArtifact, LabelArtifact, LegendEntry, LegendKind, PlotMeta, RatioSeries, RatioStyle, SCHEMA_VERSION,
    StackPlotArtifact,
};
use crate::binning::harmonize_uniform;
use crate::config::{AnalysisConfig, AxesConfig, EdgeMethod, Harmonize, PlotKind, StackMode};
use crate::error::{Error, Result};
use crate::hist::Hist1D;
use crate::sample::{LoadOptions, LoadedSamples, combine_data, load_samples, mass_point_label};
use crate::stack::{Stack, build_grouped, build_top_n};

/// Black, for data points and their ratio.
const DATA_COLOR: &str = "#000000";

/// One output file to produce.
#[derive(Debug, Clone)]
pub struct PlannedPlot {
    /// Output path without extension.
    pub output_prefix: String,
    /// What to draw.
    pub artifact: StackPlotArtifact,
}

/// Load every sample named by `config`.
///
/// Fails when the input directory is missing or when not a single histogram
/// could be read.
pub fn load(config: &AnalysisConfig) -> Result<LoadedSamples> {
    let options = LoadOptions { common_binning: config.binning.common.clone() };
    let loaded = load_samples(&config.input_dir, &config.samples, &config.histogram, &config.systematic, &options)?;
    if loaded.is_empty() {
        return Err(Error::EmptyInput(format!(
            "no '{}/{}' histogram in {}",
            config.systematic,
            config.histogram,
            config.input_dir.display()
        )));
    }
    tracing::info!(
        data = loaded.data.len(),
        signal = loaded.signal.len(),
        background = loaded.background.len(),
        skipped = loaded.skipped.len(),
        "samples loaded"
    );
    Ok(loaded)
}

/// Apply the configured rebinning to every histogram, in place.
///
/// Custom edges win over GCD harmonization and uniform rebinning. Negative
/// bins are clamped afterwards when configured.
pub fn apply_binning(config: &AnalysisConfig, loaded: &mut LoadedSamples) {
    let b = &config.binning;
    if let Some(edges) = &b.edges {
        match b.edge_method {
            EdgeMethod::Overlap => loaded.try_map("custom-edge rebinning", |h| h.redistribute(edges)),
            EdgeMethod::Exact => loaded.try_map("custom-edge rebinning", |h| h.rebin_to_edges(edges)),
        }
        tracing::info!(bins = edges.len() - 1, method = ?b.edge_method, "applied custom bin edges");
    } else {
        if b.harmonize == Harmonize::Gcd {
            let mut counts: Vec<usize> = loaded.all_mut().map(|h| h.n_bins()).collect();
            counts.sort_unstable();
            counts.dedup();
            if counts.len() > 1 {
                harmonize_uniform(loaded.all_mut());
            }
        }
        if b.rebin > 1 {
            let factor = b.rebin;
            loaded.try_map("rebinning", |h| h.rebin(factor));
            tracing::info!(factor, "applied uniform rebinning");
        }
    }
    if b.clamp_negative {
        let clamped: usize = loaded.all_mut().map(|h| h.clamp_negative()).sum();
        if clamped > 0 {
            tracing::info!(bins = clamped, "clamped negative bins to zero");
        }
    }
}

/// Y range of the main panel.
///
/// An explicit maximum wins. Otherwise the maximum is 1.5 times the largest
/// drawn value (1000 when nothing positive is drawn), raised to at least
/// 1000 on a log scale.
pub fn resolve_y_range(axes: &AxesConfig, max_drawn: f64) -> (f64, f64) {
    let y_max = match axes.y_max {
        Some(v) => v,
        None => {
            let auto = 1.5 * max_drawn;
            let auto = if auto > 0.0 { auto } else { 1000.0 };
            if axes.logy { auto.max(1000.0) } else { auto }
        }
    };
    let y_min = axes.y_min.unwrap_or(if axes.logy { 0.1 } else { 0.0 });
    tracing::info!(y_min, y_max, max_drawn, "y range");
    (y_min, y_max)
}

/// Build every plot `config` asks for from already-loaded samples.
pub fn build_plots(config: &AnalysisConfig, mut loaded: LoadedSamples) -> Result<Vec<PlannedPlot>> {
    apply_binning(config, &mut loaded);
    if loaded.is_empty() {
        return Err(Error::EmptyInput("every histogram failed rebinning".into()));
    }
    match config.kind {
        PlotKind::DataVsMc => data_vs_mc(config, &loaded),
        PlotKind::SignalVsBackground => signal_vs_background(config, &loaded),
    }
}

/// Load, then build.
pub fn run(config: &AnalysisConfig) -> Result<Vec<PlannedPlot>> {
    config.validate()?;
    let loaded = load(config)?;
    build_plots(config, loaded)
}

fn build_stack<'a>(config: &AnalysisConfig, samples: impl IntoIterator<Item = (&'a str, &'a Hist1D)>) -> Stack {
    let s = &config.stack;
    match s.mode {
        StackMode::Grouped => build_grouped(samples, &config.groups, &config.palette, &s.others_color),
        StackMode::TopN => build_top_n(samples, s.top_n, &config.palette, &s.others_color, &s.strip_suffixes),
    }
}

fn data_vs_mc(config: &AnalysisConfig, loaded: &LoadedSamples) -> Result<Vec<PlannedPlot>> {
    let mc = loaded
        .signal
        .iter()
        .chain(&loaded.background)
        .filter(|(name, _)| !config.overlay.matches(name))
        .map(|(n, h)| (n.as_str(), h));
    let stack = build_stack(config, mc);
    let data = combine_data(&loaded.data);
    if stack.is_empty() {
        tracing::warn!("no simulated samples to stack");
    }
    if data.is_none() {
        tracing::warn!("no data histograms loaded");
    }

    let overlays: Vec<(&str, &Hist1D)> = loaded
        .signal
        .iter()
        .chain(&loaded.background)
        .filter(|(name, _)| config.overlay.matches(name))
        .map(|(n, h)| (n.as_str(), h))
        .collect();

    let base = PlotParts { config, stack: &stack, data: data.as_ref(), signal: None };
    if config.overlay.enabled && config.overlay.per_sample {
        if overlays.is_empty() {
            tracing::warn!("no overlay samples found; producing a single plot without overlays");
        } else {
            let mut plots = Vec::with_capacity(overlays.len());
            for &(name, hist) in &overlays {
                tracing::info!(sample = name, "plot for overlay sample");
                plots.push(PlannedPlot {
                    output_prefix: format!("{}_{}", config.output, name),
                    artifact: base.assemble(&[(name, hist)])?,
                });
            }
            return Ok(plots);
        }
    }
    let artifact = base.assemble(&overlays)?;
    Ok(vec![PlannedPlot { output_prefix: config.output.clone(), artifact }])
}

fn signal_vs_background(config: &AnalysisConfig, loaded: &LoadedSamples) -> Result<Vec<PlannedPlot>> {
    let stack = build_stack(config, loaded.background.iter().map(|(n, h)| (n.as_str(), h)));
    if stack.is_empty() {
        tracing::warn!("no background histograms found");
    }
    if loaded.signal.is_empty() {
        tracing::warn!("no signal histograms found");
    }

    if config.stack.per_signal && !loaded.signal.is_empty() {
        let mut plots = Vec::with_capacity(loaded.signal.len());
        for (name, hist) in &loaded.signal {
            let mass_point =
                mass_point_label(name, config.stack.mass_point_prefix.as_deref(), config.overlay.label_from.as_deref());
            tracing::info!(%mass_point, "plot for signal mass point");
            let parts = PlotParts { config, stack: &stack, data: None, signal: Some((mass_point.as_str(), hist)) };
            plots.push(PlannedPlot {
                output_prefix: format!("{}_{}_vs_backgrounds", config.histogram, mass_point),
                artifact: parts.assemble(&[])?,
            });
        }
        return Ok(plots);
    }

    let total_signal = combine(loaded.signal.iter().map(|(n, h)| (n.as_str(), h)));
    if let Some(s) = &total_signal {
        tracing::info!(events = s.integral(), samples = loaded.signal.len(), "total signal");
    }
    let parts = PlotParts {
        config,
        stack: &stack,
        data: None,
        signal: total_signal.as_ref().map(|h| (config.stack.signal_label.as_str(), h)),
    };
    let artifact = parts.assemble(&[])?;
    Ok(vec![PlannedPlot { output_prefix: config.output.clone(), artifact }])
}

fn combine<'a>(hists: impl IntoIterator<Item = (&'a str, &'a Hist1D)>) -> Option<Hist1D> {
    let mut total: Option<Hist1D> = None;
    for (name, h) in hists {
        if let Some(t) = &mut total {
            if let Err(e) = t.add(h) {
                tracing::warn!(sample = name, error = %e, "sample not added to signal sum");
            }
        } else {
            total = Some(h.clone());
        }
    }
    total
}

struct PlotParts<'a> {
    config: &'a AnalysisConfig,
    stack: &'a Stack,
    data: Option<&'a Hist1D>,
    /// Signal line and its legend label.
    signal: Option<(&'a str, &'a Hist1D)>,
}

impl PlotParts<'_> {
    fn assemble(&self, overlays: &[(&str, &Hist1D)]) -> Result<StackPlotArtifact> {
        let config = self.config;
        let total = self.stack.total();
        let reference = total
            .as_ref()
            .or(self.data)
            .or(self.signal.map(|(_, h)| h))
            .or(overlays.first().map(|(_, h)| *h))
            .ok_or_else(|| Error::EmptyInput("nothing to draw".into()))?;
        let edges = reference.edges().to_vec();
        let n = reference.n_bins();

        let mut max_drawn = 0.0_f64;
        for h in total.iter().chain(self.data).chain(self.signal.map(|(_, h)| h)).chain(overlays.iter().map(|(_, h)| *h))
        {
            max_drawn = max_drawn.max(h.maximum());
        }
        let y_range = resolve_y_range(&config.axes, max_drawn);

        let mut legend = Vec::new();
        let data = self.data.map(|d| artifact::data_series(d, config.data_errors));
        if data.is_some() {
            legend.push(LegendEntry { label: "Data".into(), kind: LegendKind::Marker, color: DATA_COLOR.into() });
        }
        let signal = self.signal.map(|(label, h)| {
            artifact::line_series(h.name(), label, &config.stack.signal_color, h)
        });
        if let Some(s) = &signal {
            legend.push(LegendEntry { label: s.label.clone(), kind: LegendKind::Line, color: s.color.clone() });
        }
        for c in self.stack.legend_components() {
            legend.push(LegendEntry { label: c.label.clone(), kind: LegendKind::Fill, color: c.color.clone() });
        }
        let overlays: Vec<_> = overlays
            .iter()
            .map(|(name, h)| {
                let label = mass_point_label(name, None, config.overlay.label_from.as_deref());
                artifact::line_series(name, &label, &config.overlay.color, h)
            })
            .collect();
        for o in &overlays {
            legend.push(LegendEntry { label: o.label.clone(), kind: LegendKind::Line, color: o.color.clone() });
        }

        let (ratio, ratio_band) = self.ratio(total.as_ref());

        let x_range = match &config.binning.edges {
            Some(e) if e.len() >= 2 => (e[0], e[e.len() - 1]),
            _ => config.axes.x_range.unwrap_or((edges[0], edges[n])),
        };

        let artifact = StackPlotArtifact {
            schema_version: SCHEMA_VERSION.to_string(),
            meta: PlotMeta {
                tool: "hepstack".to_string(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                created_unix_ms: artifact::now_unix_ms()?,
                config_name: config.name.clone(),
                histogram: config.histogram.clone(),
                systematic: config.systematic.clone(),
                input_dir: Some(config.input_dir.display().to_string()),
            },
            bin_edges: edges,
            stack: artifact::stack_series(self.stack),
            stack_order: self.stack.legend.clone(),
            total_y: total.as_ref().map(|t| t.contents().to_vec()).unwrap_or_else(|| vec![0.0; n]),
            total_yerr: total.as_ref().map(|t| t.errors()).unwrap_or_else(|| vec![0.0; n]),
            data,
            signal,
            overlays,
            ratio,
            ratio_band,
            mc_band: total.as_ref().map(artifact::absolute_band),
            legend,
            axes: AxesArtifact {
                x_range,
                x_title: config.axes.x_title.clone(),
                y_title: config.axes.y_title.clone(),
                y_range,
                logy: config.axes.logy,
                logx: config.axes.logx,
                custom_x_ticks: if config.axes.logx { config.axes.custom_x_ticks.clone() } else { None },
                ratio_range: config.axes.ratio_range,
                ratio_title: config.axes.ratio_title.clone(),
                show_unity_line: config.axes.show_unity_line,
            },
            label: LabelArtifact {
                experiment: config.label.experiment.clone(),
                status: config.label.status.clone(),
                lumi_text: config.label.lumi_text(),
            },
        };
        artifact.validate()?;
        Ok(artifact)
    }

    fn ratio(&self, total: Option<&Hist1D>) -> (Option<RatioSeries>, Option<artifact::BandEnvelope>) {
        let Some(total) = total else { return (None, None) };
        let (num, numerator, style, color) = match (self.config.kind, self.data, self.signal) {
            (PlotKind::DataVsMc, Some(d), _) => (d, "data", RatioStyle::Points, DATA_COLOR),
            (PlotKind::SignalVsBackground, _, Some((_, s))) => {
                (s, "signal", RatioStyle::Line, self.config.stack.signal_color.as_str())
            }
            _ => return (None, Some(artifact::relative_band(total))),
        };
        let band = match self.config.kind {
            PlotKind::DataVsMc => Some(artifact::relative_band(total)),
            PlotKind::SignalVsBackground => None,
        };
        match Hist1D::divide(num, total) {
            Ok(r) => (
                Some(RatioSeries {
                    numerator: numerator.to_string(),
                    denominator: "total".to_string(),
                    y: r.contents().to_vec(),
                    yerr: r.errors(),
                    style,
                    color: color.to_string(),
                }),
                band,
            ),
            Err(e) => {
                tracing::warn!(error = %e, "ratio skipped");
                (None, band)
            }
        }
    }
}
