use hs_core::StackPlotArtifact;
use hs_core::artifact::{AxesArtifact, LegendKind, LineSeries, RatioStyle};

use crate::canvas::Canvas;
use crate::color::Color;
use crate::config::RenderConfig;
use crate::header::draw_header;
use crate::layout::axes::Axis;
use crate::layout::legend::{self, LegendEntry, SwatchKind};
use crate::layout::margins::PlotArea;
use crate::layout::multi_panel::MainRatioLayout;
use crate::plots::axes_draw::draw_axes;
use crate::primitives::*;

/// A panel: its area and the axes mapping data into it.
struct Panel {
    area: PlotArea,
    x: Axis,
    y: Axis,
}

impl Panel {
    fn px(&self, x: f64) -> f64 {
        self.x.data_to_pixel_clamped(x, self.area.left, self.area.right())
    }

    fn py(&self, y: f64) -> f64 {
        self.y.data_to_pixel_clamped(y, self.area.bottom(), self.area.top)
    }

    fn base(&self) -> f64 {
        self.py(if self.y.log { 0.0 } else { self.y.min.max(0.0) })
    }

    fn clip(&self, canvas: &mut Canvas) {
        let a = &self.area;
        canvas.push_clip(a.left, a.top, a.width, a.height);
    }
}

/// Render a stacked data/MC plot. The ratio panel is drawn when the
/// artifact carries a ratio.
pub fn render(artifact: &StackPlotArtifact, config: &RenderConfig) -> crate::Result<String> {
    config.validate()?;
    if artifact.n_bins() == 0 {
        return Err(crate::RenderError::Layout("artifact has no bins".into()));
    }
    let axes = &artifact.axes;
    let mut canvas = Canvas::new(config.figure.width, config.figure.height);

    let content = PlotArea::from_figure(&config.figure);
    let with_ratio = artifact.ratio.is_some() && config.figure.ratio_fraction > 0.0;
    let (main_area, ratio_area) = if with_ratio {
        let layout =
            MainRatioLayout::split(&content, config.figure.panel_gap, config.figure.ratio_fraction);
        (layout.main, Some(layout.ratio))
    } else {
        (content, None)
    };

    let x_axis = build_x_axis(axes);
    let main_x = if ratio_area.is_some() {
        x_axis.clone().without_tick_labels()
    } else {
        x_axis.clone().with_label(axes.x_title.as_str())
    };
    let (ylo, yhi) = axes.y_range;
    let main_y = (if axes.logy { Axis::log(ylo, yhi) } else { Axis::linear(ylo, yhi, 6) })
        .with_label(axes.y_title.as_str());
    let main = Panel { area: main_area, x: main_x, y: main_y };

    tracing::debug!(
        bins = artifact.n_bins(),
        components = artifact.stack.len(),
        ratio = ratio_area.is_some(),
        "rendering stack plot"
    );

    let edges: Vec<f64> = artifact.bin_edges.iter().map(|&e| main.px(e)).collect();

    main.clip(&mut canvas);
    draw_components(&mut canvas, &main, &edges, artifact, config);
    let mut band_pattern = None;
    if config.stack.show_mc_band
        && let Some(band) = &artifact.mc_band
    {
        let pattern = canvas.hatch_pattern(config.colors.mc_band, config.stack.hatch_spacing, 0.8);
        draw_band(&mut canvas, &main, &edges, &band.lo, &band.hi, &pattern);
        band_pattern = Some(pattern);
    }
    for line in &artifact.overlays {
        draw_line(&mut canvas, &main, &edges, line, config.stack.overlay_line_width);
    }
    if let Some(signal) = &artifact.signal {
        draw_line(&mut canvas, &main, &edges, signal, config.stack.signal_line_width);
    }
    draw_data(&mut canvas, &main, &edges, artifact, config);
    if axes.show_unity_line {
        draw_unity_line(&mut canvas, &main, config);
    }
    canvas.pop_clip();

    draw_axes(&mut canvas, &main.area, &main.x, &main.y, config);
    draw_legend(&mut canvas, &main.area, artifact, config, band_pattern);
    draw_header(&mut canvas, &main.area, &artifact.label, config);

    if let Some(area) = ratio_area {
        draw_ratio_panel(&mut canvas, area, x_axis, artifact, config);
    }

    Ok(canvas.finish_svg())
}

/// X axis shared by both panels: custom ticks (log x only), log, or linear.
fn build_x_axis(axes: &AxesArtifact) -> Axis {
    let (lo, hi) = axes.x_range;
    match (&axes.custom_x_ticks, axes.logx) {
        (Some(ticks), true) => Axis::custom(lo, hi, true, ticks),
        (_, true) => Axis::log(lo, hi),
        _ => Axis::linear(lo, hi, 8),
    }
}

/// Filled stack, painted top-down as cumulative areas so each component
/// covers only its own slice.
fn draw_components(
    canvas: &mut Canvas,
    panel: &Panel,
    edges: &[f64],
    artifact: &StackPlotArtifact,
    config: &RenderConfig,
) {
    let n = artifact.n_bins();
    let mut cumulative = Vec::with_capacity(artifact.stack.len());
    let mut running = vec![0.0_f64; n];
    for series in &artifact.stack {
        for (acc, v) in running.iter_mut().zip(&series.y) {
            *acc += v;
        }
        cumulative.push(running.clone());
    }

    let base = panel.base();
    for (series, levels) in artifact.stack.iter().zip(&cumulative).rev() {
        let color = Color::parse_or_fallback(&series.color);
        let style = if config.stack.outline_width > 0.0 {
            Style::filled_outlined(color, Color::rgb(0, 0, 0), config.stack.outline_width)
        } else {
            Style::filled(color)
        };
        let tops: Vec<f64> = levels.iter().map(|&v| panel.py(v)).collect();
        canvas.step_fill(edges, &tops, base, &style);
    }
}

fn draw_band(canvas: &mut Canvas, panel: &Panel, edges: &[f64], lo: &[f64], hi: &[f64], pattern: &str) {
    for (i, (&l, &h)) in lo.iter().zip(hi).enumerate() {
        if h <= l {
            continue;
        }
        let (Some(&x0), Some(&x1)) = (edges.get(i), edges.get(i + 1)) else { break };
        let y_hi = panel.py(h);
        let y_lo = panel.py(l);
        canvas.hatch_rect(x0, y_hi, x1 - x0, y_lo - y_hi, pattern);
    }
}

fn draw_line(canvas: &mut Canvas, panel: &Panel, edges: &[f64], line: &LineSeries, width: f64) {
    let color = Color::parse_or_fallback(&line.color);
    let levels: Vec<f64> = line.y.iter().map(|&v| panel.py(v)).collect();
    canvas.step(edges, &levels, &LineStyle::solid(color, width));
}

fn draw_data(
    canvas: &mut Canvas,
    panel: &Panel,
    edges: &[f64],
    artifact: &StackPlotArtifact,
    config: &RenderConfig,
) {
    let Some(data) = &artifact.data else { return };
    let color = config.colors.data;
    let marker = MarkerStyle { color, size: config.stack.marker_size, ..Default::default() };
    let err = LineStyle::solid(color, 1.0);

    for (i, &y) in data.y.iter().enumerate() {
        if panel.y.log && y <= 0.0 {
            continue;
        }
        let (Some(&x0), Some(&x1)) = (edges.get(i), edges.get(i + 1)) else { break };
        let x = (x0 + x1) / 2.0;
        let lo = data.yerr_lo.get(i).copied().unwrap_or(0.0);
        let hi = data.yerr_hi.get(i).copied().unwrap_or(0.0);
        canvas.error_bar(x, panel.py(y - lo), panel.py(y + hi), 0.0, &err);
        canvas.marker(x, panel.py(y), &marker);
    }
}

fn draw_unity_line(canvas: &mut Canvas, panel: &Panel, config: &RenderConfig) {
    let y1 = panel.py(1.0);
    canvas.line(panel.area.left, y1, panel.area.right(), y1, &LineStyle::dashed(config.colors.unity_line, 1.0));
}

fn draw_legend(
    canvas: &mut Canvas,
    area: &PlotArea,
    artifact: &StackPlotArtifact,
    config: &RenderConfig,
    band_pattern: Option<String>,
) {
    let signal_label = artifact.signal.as_ref().map(|s| s.label.as_str());
    let mut entries: Vec<LegendEntry> = artifact
        .legend
        .iter()
        .map(|e| {
            let kind = match e.kind {
                LegendKind::Fill => SwatchKind::Fill,
                LegendKind::Marker => SwatchKind::Marker,
                LegendKind::Line if Some(e.label.as_str()) == signal_label => {
                    SwatchKind::Line { width: config.stack.signal_line_width }
                }
                LegendKind::Line => SwatchKind::Line { width: config.stack.overlay_line_width },
            };
            let color = if e.kind == LegendKind::Marker {
                config.colors.data
            } else {
                Color::parse_or_fallback(&e.color)
            };
            LegendEntry { label: e.label.clone(), color, kind }
        })
        .collect();
    if let Some(pattern) = band_pattern {
        entries.push(LegendEntry {
            label: config.stack.band_label.clone(),
            color: config.colors.mc_band,
            kind: SwatchKind::Hatched(pattern),
        });
    }
    legend::draw_legend(canvas, area, &entries, config.font.size, config.stack.legend_columns);
}

fn draw_ratio_panel(
    canvas: &mut Canvas,
    area: PlotArea,
    x_axis: Axis,
    artifact: &StackPlotArtifact,
    config: &RenderConfig,
) {
    let Some(ratio) = &artifact.ratio else { return };
    let axes = &artifact.axes;
    let (lo, hi) = axes.ratio_range;
    // Ranges spanning two or more decades (signal/background) read better on log.
    let y = if lo > 0.0 && hi / lo >= 100.0 { Axis::log(lo, hi) } else { Axis::linear(lo, hi, 4) };
    let panel = Panel {
        area,
        x: x_axis.with_label(axes.x_title.as_str()),
        y: y.with_label(axes.ratio_title.as_str()),
    };
    let edges: Vec<f64> = artifact.bin_edges.iter().map(|&e| panel.px(e)).collect();

    panel.clip(canvas);
    if let Some(band) = &artifact.ratio_band {
        let pattern = canvas.hatch_pattern(config.colors.ratio_band, config.stack.hatch_spacing, 0.8);
        draw_band(canvas, &panel, &edges, &band.lo, &band.hi, &pattern);
    }
    draw_unity_line(canvas, &panel, config);
    let color = Color::parse_or_fallback(&ratio.color);
    match ratio.style {
        RatioStyle::Points => {
            let marker = MarkerStyle { color, size: config.stack.marker_size * 0.85, ..Default::default() };
            let err = LineStyle::solid(color, 1.0);
            for (i, (&r, &e)) in ratio.y.iter().zip(&ratio.yerr).enumerate() {
                if r <= 0.0 && e <= 0.0 {
                    continue;
                }
                let (Some(&x0), Some(&x1)) = (edges.get(i), edges.get(i + 1)) else { break };
                let x = (x0 + x1) / 2.0;
                canvas.error_bar(x, panel.py(r - e), panel.py(r + e), 0.0, &err);
                canvas.marker(x, panel.py(r), &marker);
            }
        }
        RatioStyle::Line => {
            let levels: Vec<f64> = ratio.y.iter().map(|&r| panel.py(r)).collect();
            canvas.step(&edges, &levels, &LineStyle::solid(color, config.stack.signal_line_width * 0.7));
        }
    }
    canvas.pop_clip();

    draw_axes(canvas, &panel.area, &panel.x, &panel.y, config);
}

#[cfg(test)]
mod tests {
    use super::*;
    use hs_core::artifact::*;
    use hs_core::artifact::LegendEntry;

    fn artifact(with_ratio: bool) -> StackPlotArtifact {
        StackPlotArtifact {
            schema_version: SCHEMA_VERSION.into(),
            meta: PlotMeta {
                tool: "hepstack".into(),
                tool_version: "0.1.0".into(),
                created_unix_ms: 0,
                config_name: "test".into(),
                histogram: "MET".into(),
                systematic: "Central".into(),
                input_dir: None,
            },
            bin_edges: vec![0.0, 10.0, 20.0, 30.0],
            stack: vec![
                StackSeries {
                    name: "VV".into(),
                    label: "VV".into(),
                    color: "#3f90da".into(),
                    y: vec![1.0, 1.0, 0.0],
                    yerr: vec![0.5, 0.5, 0.0],
                    integral: 2.0,
                    n_samples: 1,
                },
                StackSeries {
                    name: "DYJets".into(),
                    label: "Drell-Yan".into(),
                    color: "#e42536".into(),
                    y: vec![10.0, 20.0, 5.0],
                    yerr: vec![1.0, 1.0, 1.0],
                    integral: 35.0,
                    n_samples: 1,
                },
            ],
            stack_order: vec!["DYJets".into(), "VV".into()],
            total_y: vec![11.0, 21.0, 5.0],
            total_yerr: vec![1.1, 1.1, 1.0],
            data: Some(DataSeries {
                label: "Data".into(),
                y: vec![12.0, 19.0, 0.0],
                yerr_lo: vec![3.4, 4.3, 0.0],
                yerr_hi: vec![3.4, 4.3, 0.0],
                integral: 31.0,
                error_model: "sumw2".into(),
            }),
            signal: None,
            overlays: vec![LineSeries {
                name: "WR2000".into(),
                label: "W_{R} 2 TeV".into(),
                color: "#ff0000".into(),
                y: vec![0.0, 2.0, 3.0],
            }],
            ratio: with_ratio.then(|| RatioSeries {
                numerator: "data".into(),
                denominator: "total".into(),
                y: vec![12.0 / 11.0, 19.0 / 21.0, 0.0],
                yerr: vec![0.3, 0.2, 0.0],
                style: RatioStyle::Points,
                color: "#000000".into(),
            }),
            ratio_band: with_ratio.then(|| BandEnvelope { lo: vec![0.9, 0.95, 0.8], hi: vec![1.1, 1.05, 1.2] }),
            mc_band: Some(BandEnvelope { lo: vec![9.9, 19.9, 4.0], hi: vec![12.1, 22.1, 6.0] }),
            legend: vec![
                LegendEntry { label: "Data".into(), kind: LegendKind::Marker, color: "#000000".into() },
                LegendEntry { label: "Drell-Yan".into(), kind: LegendKind::Fill, color: "#e42536".into() },
                LegendEntry { label: "VV".into(), kind: LegendKind::Fill, color: "#3f90da".into() },
                LegendEntry { label: "W_{R} 2 TeV".into(), kind: LegendKind::Line, color: "#ff0000".into() },
            ],
            axes: AxesArtifact {
                x_range: (0.0, 30.0),
                x_title: "p_{T}^{miss} [GeV]".into(),
                y_title: "Events / bin".into(),
                y_range: (0.1, 1e3),
                logy: true,
                logx: false,
                custom_x_ticks: None,
                ratio_range: (0.5, 1.5),
                ratio_title: "Data / MC".into(),
                show_unity_line: true,
            },
            label: LabelArtifact {
                experiment: "CMS".into(),
                status: "Preliminary".into(),
                lumi_text: "26.6717 fb^{-1} (13.6 TeV)".into(),
            },
        }
    }

    #[test]
    fn draws_every_layer() {
        let svg = render(&artifact(true), &RenderConfig::default()).unwrap();
        // Two stack polygons plus the legend swatches.
        assert_eq!(svg.matches(r##"fill="#e42536""##).count(), 2);
        assert!(svg.contains(r##"stroke="#ff0000""##));
        assert!(svg.contains(">Drell-Yan</text>"));
        assert!(svg.contains(">Stat. unc.</text>"));
        assert!(svg.contains(">Data / MC</text>"));
        // Unity lines on both panels.
        assert_eq!(svg.matches(r#"stroke-dasharray="6 3""#).count(), 2);
        // Two clip groups: main and ratio panel.
        assert_eq!(svg.matches("<clipPath").count(), 2);
    }

    #[test]
    fn zero_data_bins_skipped_on_log() {
        let a = artifact(false);
        let svg = render(&a, &RenderConfig::default()).unwrap();
        // Two data markers plus the legend marker.
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(!svg.contains(">Data / MC</text>"));
    }

    #[test]
    fn linear_scale_draws_zero_bins() {
        let mut a = artifact(false);
        a.axes.logy = false;
        a.axes.y_range = (0.0, 30.0);
        let svg = render(&a, &RenderConfig::default()).unwrap();
        assert_eq!(svg.matches("<circle").count(), 4);
    }

    #[test]
    fn main_unity_line_follows_the_axes_flag() {
        let mut a = artifact(true);
        a.axes.show_unity_line = false;
        let svg = render(&a, &RenderConfig::default()).unwrap();
        assert_eq!(svg.matches(r#"stroke-dasharray="6 3""#).count(), 1);

        let mut a = artifact(false);
        a.axes.show_unity_line = true;
        let svg = render(&a, &RenderConfig::default()).unwrap();
        assert_eq!(svg.matches(r#"stroke-dasharray="6 3""#).count(), 1);
    }

    #[test]
    fn band_can_be_switched_off() {
        let mut cfg = RenderConfig::default();
        cfg.stack.show_mc_band = false;
        let svg = render(&artifact(false), &cfg).unwrap();
        assert!(!svg.contains("Stat. unc."));
    }

    #[test]
    fn custom_log_x_ticks_on_ratio_panel() {
        let mut a = artifact(true);
        a.bin_edges = vec![20.0, 100.0, 1000.0, 2000.0];
        a.axes.x_range = (20.0, 2000.0);
        a.axes.logx = true;
        a.axes.custom_x_ticks = Some(vec![20.0, 30.0, 200.0, 2000.0]);
        let svg = render(&a, &RenderConfig::default()).unwrap();
        assert_eq!(svg.matches(">30</text>").count(), 1);
        assert_eq!(svg.matches(">2000</text>").count(), 1);
    }

    #[test]
    fn invalid_style_is_rejected() {
        let mut cfg = RenderConfig::default();
        cfg.figure.width = 0.0;
        assert!(render(&artifact(true), &cfg).is_err());
    }
}
