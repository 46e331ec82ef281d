//! Renderer for [`hs_core::StackPlotArtifact`].
//!
//! Drawing happens on an immediate-mode SVG [`canvas::Canvas`]; PNG and PDF
//! are produced from the SVG through `resvg` and `svg2pdf` (cargo features
//! `png` and `pdf`, both on by default).

#![warn(clippy::all)]

pub mod canvas;
pub mod color;
pub mod config;
pub mod header;
pub mod latex;
pub mod layout;
pub mod output;
pub mod plots;
pub mod primitives;
pub mod text;
pub mod theme;

use std::path::Path;

use config::RenderConfig;
use hs_core::StackPlotArtifact;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("layout error: {0}")]
    Layout(String),
    #[error("artifact error: {0}")]
    Artifact(#[from] hs_core::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "png")]
    #[error("PNG encoding error: {0}")]
    Png(String),
    #[cfg(feature = "pdf")]
    #[error("PDF conversion error: {0}")]
    Pdf(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// Output formats compiled into this build.
pub fn supported_formats() -> Vec<&'static str> {
    let mut v = vec!["svg"];
    if cfg!(feature = "png") {
        v.push("png");
    }
    if cfg!(feature = "pdf") {
        v.push("pdf");
    }
    v
}

/// Render an artifact to an SVG document.
pub fn render_svg(artifact: &StackPlotArtifact, config: &RenderConfig) -> Result<String> {
    artifact.validate()?;
    plots::stack::render(artifact, config)
}

/// Render an artifact to bytes in `format` (`svg`, `png` or `pdf`).
pub fn render_to_bytes(
    artifact: &StackPlotArtifact,
    format: &str,
    config: &RenderConfig,
) -> Result<Vec<u8>> {
    let svg = render_svg(artifact, config)?;
    match format.to_ascii_lowercase().as_str() {
        "svg" => Ok(svg.into_bytes()),
        #[cfg(feature = "png")]
        "png" => output::png::svg_to_png(&svg, config.output.dpi),
        #[cfg(feature = "pdf")]
        "pdf" => output::pdf::svg_to_pdf(&svg),
        other => Err(RenderError::UnsupportedFormat(other.to_string())),
    }
}

/// Render an artifact to a file; the format comes from the extension.
pub fn render_to_file(
    artifact: &StackPlotArtifact,
    path: &Path,
    config: &RenderConfig,
) -> Result<()> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("svg");
    let bytes = render_to_bytes(artifact, ext, config)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "saved plot");
    Ok(())
}
