//! hepstack CLI

mod inspect;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hs_core::config::PRESET_NAMES;
use hs_core::{AnalysisConfig, CommonBinning, StackPlotArtifact, plot};
use hs_render::config::{RenderConfig, resolve_config};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "hepstack")]
#[command(about = "hepstack - stacked data/MC histogram plots from ROOT files")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and render stacked plots for an analysis preset
    Plot(PlotArgs),

    /// Render a saved plot artifact (JSON)
    Render {
        /// Artifact produced by `plot --emit-json`
        #[arg(long)]
        artifact: PathBuf,

        /// Output file; the format comes from the extension (svg, png, pdf)
        #[arg(short, long)]
        output: PathBuf,

        /// Rendering style (YAML)
        #[arg(long)]
        style: Option<PathBuf>,
    },

    /// Check binning consistency of one histogram across a sample directory
    Inspect {
        /// Directory with one ROOT file per sample
        #[arg(long)]
        input_dir: PathBuf,

        /// Histogram name inside the systematic directory
        #[arg(long)]
        hist_name: String,

        /// Systematic directory ("" reads from the file's top directory)
        #[arg(long, default_value = "Central")]
        systematic: String,

        /// File-name prefix marking signal samples
        #[arg(long, default_value = "TB")]
        signal_prefix: String,
    },

    /// List built-in presets, or print one as YAML
    Presets {
        /// Preset to print
        #[arg(long)]
        dump: Option<String>,
    },

    /// Print version information
    Version,
}

#[derive(Args)]
struct PlotArgs {
    /// Built-in analysis preset (dy, ttbar, signal, cr)
    #[arg(long)]
    preset: String,

    /// Analysis config (YAML); replaces the preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rendering style (YAML)
    #[arg(long)]
    style: Option<PathBuf>,

    /// Directory with one ROOT file per sample
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Histogram name
    #[arg(long)]
    hist_name: Option<String>,

    /// Systematic directory
    #[arg(long)]
    systematic: Option<String>,

    /// Output path prefix (extensions are added per format)
    #[arg(short, long)]
    output: Option<String>,

    /// Custom bin edges, comma separated
    #[arg(long, value_parser = parse_float_list)]
    bin_edges: Option<FloatList>,

    /// Uniform rebin factor
    #[arg(long)]
    rebin: Option<usize>,

    /// Lower x limit
    #[arg(long, requires = "xmax", allow_hyphen_values = true)]
    xmin: Option<f64>,

    /// Upper x limit
    #[arg(long, requires = "xmin", allow_hyphen_values = true)]
    xmax: Option<f64>,

    /// Lower y limit
    #[arg(long, allow_hyphen_values = true)]
    ymin: Option<f64>,

    /// Upper y limit
    #[arg(long, allow_hyphen_values = true)]
    ymax: Option<f64>,

    /// Logarithmic y axis
    #[arg(long, conflicts_with = "linear")]
    logy: bool,

    /// Linear y axis
    #[arg(long)]
    linear: bool,

    /// Lower ratio-panel limit
    #[arg(long, requires = "ratio_ymax", allow_hyphen_values = true)]
    ratio_ymin: Option<f64>,

    /// Upper ratio-panel limit
    #[arg(long, requires = "ratio_ymin", allow_hyphen_values = true)]
    ratio_ymax: Option<f64>,

    /// Logarithmic x axis with the preset's custom tick labels
    #[arg(long)]
    log_x_ticks: bool,

    /// Stack overlay samples instead of drawing them as lines
    #[arg(long)]
    no_overlay_lines: bool,

    /// One plot per signal mass point
    #[arg(long)]
    per_signal: bool,

    /// Common bin edges applied while loading, comma separated
    #[arg(long, value_parser = parse_float_list)]
    common_bins: Option<FloatList>,

    /// Output formats
    #[arg(long, value_delimiter = ',')]
    format: Option<Vec<String>>,

    /// Also write the plot artifact as `{prefix}.json`
    #[arg(long)]
    emit_json: bool,
}

/// A comma-separated list of numbers, sorted ascending.
#[derive(Debug, Clone, PartialEq)]
struct FloatList(Vec<f64>);

fn parse_float_list(s: &str) -> std::result::Result<FloatList, String> {
    let mut values = Vec::new();
    for item in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let v: f64 = item.parse().map_err(|_| format!("'{}' is not a number", item))?;
        if !v.is_finite() {
            return Err(format!("'{}' is not a finite number", item));
        }
        values.push(v);
    }
    if values.len() < 2 {
        return Err("need at least two values".into());
    }
    values.sort_by(f64::total_cmp);
    Ok(FloatList(values))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Plot(args) => cmd_plot(&args),
        Commands::Render { artifact, output, style } => cmd_render(&artifact, &output, style.as_deref()),
        Commands::Inspect { input_dir, hist_name, systematic, signal_prefix } => {
            inspect::run(&input_dir, &hist_name, &systematic, &signal_prefix)
        }
        Commands::Presets { dump } => cmd_presets(dump.as_deref()),
        Commands::Version => {
            println!("hepstack {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn cmd_plot(args: &PlotArgs) -> Result<()> {
    let mut cfg = AnalysisConfig::preset(&args.preset)?;
    if let Some(path) = &args.config {
        cfg = AnalysisConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load analysis config {}", path.display()))?;
    }
    apply_overrides(&mut cfg, args);
    cfg.validate()?;

    let style = load_style(args.style.as_deref())?;
    let formats = args.format.clone().unwrap_or_else(|| style.output.formats.clone());
    check_formats(&formats)?;

    tracing::info!(
        preset = %args.preset,
        histogram = %cfg.histogram,
        input = %cfg.input_dir.display(),
        "building plots"
    );
    let plots = plot::run(&cfg).with_context(|| format!("failed to build plots for '{}'", cfg.histogram))?;

    for p in &plots {
        if args.emit_json {
            let path = PathBuf::from(format!("{}.json", p.output_prefix));
            write_text(&path, &p.artifact.to_json_pretty()?)?;
            tracing::info!(path = %path.display(), "saved artifact");
        }
        for fmt in &formats {
            let path = PathBuf::from(format!("{}.{}", p.output_prefix, fmt));
            hs_render::render_to_file(&p.artifact, &path, &style)
                .with_context(|| format!("failed to render {}", path.display()))?;
        }
    }
    tracing::info!(plots = plots.len(), "done");
    Ok(())
}

/// Layer command-line flags over the preset/config.
fn apply_overrides(cfg: &mut AnalysisConfig, args: &PlotArgs) {
    if let Some(dir) = &args.input_dir {
        cfg.input_dir = dir.clone();
    }
    if let Some(name) = &args.hist_name {
        cfg.histogram = name.clone();
    }
    if let Some(syst) = &args.systematic {
        cfg.systematic = syst.clone();
    }
    if let Some(out) = &args.output {
        cfg.output = out.clone();
    }
    if let Some(FloatList(edges)) = &args.bin_edges {
        cfg.binning.edges = Some(edges.clone());
    }
    if let Some(rebin) = args.rebin {
        cfg.binning.rebin = rebin;
    }
    if let (Some(lo), Some(hi)) = (args.xmin, args.xmax) {
        cfg.axes.x_range = Some((lo, hi));
    }
    if args.ymin.is_some() {
        cfg.axes.y_min = args.ymin;
    }
    if args.ymax.is_some() {
        cfg.axes.y_max = args.ymax;
    }
    if args.logy {
        cfg.axes.logy = true;
    } else if args.linear {
        cfg.axes.logy = false;
    }
    if let (Some(lo), Some(hi)) = (args.ratio_ymin, args.ratio_ymax) {
        cfg.axes.ratio_range = (lo, hi);
    }
    if args.log_x_ticks {
        cfg.axes.logx = true;
    }
    if args.no_overlay_lines {
        cfg.overlay.enabled = false;
    }
    if args.per_signal {
        cfg.stack.per_signal = true;
    }
    if let Some(FloatList(edges)) = &args.common_bins {
        let (x_min, last) = (edges[0], edges[edges.len() - 1]);
        let x_max = cfg
            .binning
            .common
            .as_ref()
            .map(|c| c.x_max)
            .or(cfg.axes.x_range.map(|r| r.1))
            .unwrap_or(last);
        cfg.binning.common =
            Some(CommonBinning { x_min, x_max, nbins: edges.len() - 1, edges: Some(edges.clone()) });
    }
}

fn cmd_render(artifact: &Path, output: &Path, style: Option<&Path>) -> Result<()> {
    let artifact = StackPlotArtifact::from_json_file(artifact)
        .with_context(|| format!("failed to read artifact {}", artifact.display()))?;
    let style = load_style(style)?;
    hs_render::render_to_file(&artifact, output, &style)
        .with_context(|| format!("failed to render {}", output.display()))?;
    Ok(())
}

fn cmd_presets(dump: Option<&str>) -> Result<()> {
    match dump {
        Some(name) => print!("{}", AnalysisConfig::preset(name)?.to_yaml()?),
        None => {
            for name in PRESET_NAMES {
                let cfg = AnalysisConfig::preset(name)?;
                println!("{:<8} {:<20} {:<16} {}", name, format!("{:?}", cfg.kind), cfg.histogram, cfg.output);
            }
        }
    }
    Ok(())
}

fn load_style(path: Option<&Path>) -> Result<RenderConfig> {
    let text = path
        .map(|p| std::fs::read_to_string(p).with_context(|| format!("failed to read style {}", p.display())))
        .transpose()?;
    Ok(resolve_config(text.as_deref())?)
}

fn check_formats(formats: &[String]) -> Result<()> {
    let supported = hs_render::supported_formats();
    if formats.is_empty() {
        anyhow::bail!("no output format requested");
    }
    for f in formats {
        if !supported.contains(&f.to_ascii_lowercase().as_str()) {
            anyhow::bail!("unsupported format '{}' (available: {})", f, supported.join(", "));
        }
    }
    Ok(())
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
