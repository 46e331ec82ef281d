use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::theme::BuiltinTheme;

/// Rendering style (YAML or programmatic). Fields missing from YAML come
/// from the selected theme.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub theme: String,
    pub figure: FigureConfig,
    pub font: FontConfig,
    pub axes: AxesConfig,
    pub colors: ColorsConfig,
    pub output: OutputConfig,
    pub stack: StackStyle,
}

impl Default for RenderConfig {
    fn default() -> Self {
        BuiltinTheme::Cms.base_config()
    }
}

/// Canvas size in points and the placement of the panels as fractions of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureConfig {
    pub width: f64,
    pub height: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    /// Share of the content height given to the ratio panel.
    pub ratio_fraction: f64,
    pub panel_gap: f64,
}

impl Default for FigureConfig {
    fn default() -> Self {
        Self {
            width: 576.0,
            height: 576.0,
            margin_left: 0.14,
            margin_right: 0.04,
            margin_top: 0.07,
            margin_bottom: 0.11,
            ratio_fraction: 0.3,
            panel_gap: 6.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub size: f64,
    pub label_size: f64,
    pub tick_size: f64,
    pub header_size: f64,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self { size: 13.0, label_size: 16.0, tick_size: 13.0, header_size: 20.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AxesConfig {
    /// `in` or `out`.
    pub tick_direction: String,
    pub show_top_ticks: bool,
    pub show_right_ticks: bool,
    pub tick_length: f64,
    pub minor_tick_length: f64,
    pub frame_width: f64,
}

impl Default for AxesConfig {
    fn default() -> Self {
        Self {
            tick_direction: "in".into(),
            show_top_ticks: true,
            show_right_ticks: true,
            tick_length: 9.0,
            minor_tick_length: 5.0,
            frame_width: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    pub data: Color,
    pub frame: Color,
    pub mc_band: Color,
    pub ratio_band: Color,
    pub unity_line: Color,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            data: Color::rgb(0, 0, 0),
            frame: Color::rgb(0, 0, 0),
            mc_band: Color::rgb(0x55, 0x55, 0x55),
            ratio_band: Color::rgb(0x88, 0x88, 0x88),
            unity_line: Color::rgb(0x55, 0x55, 0x55),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dpi: u32,
    /// Formats written by `hepstack plot` when `--format` is not given.
    pub formats: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dpi: 150, formats: vec!["png".into(), "pdf".into()] }
    }
}

/// Stacked-plot specifics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackStyle {
    pub show_mc_band: bool,
    pub band_label: String,
    pub hatch_spacing: f64,
    /// Outline drawn around every stack component, in points (0 disables).
    pub outline_width: f64,
    pub overlay_line_width: f64,
    pub signal_line_width: f64,
    pub marker_size: f64,
    pub legend_columns: usize,
}

impl Default for StackStyle {
    fn default() -> Self {
        Self {
            show_mc_band: true,
            band_label: "Stat. unc.".into(),
            hatch_spacing: 5.0,
            outline_width: 0.0,
            overlay_line_width: 2.0,
            signal_line_width: 3.0,
            marker_size: 3.0,
            legend_columns: 1,
        }
    }
}

impl RenderConfig {
    /// Fail on values that would produce a degenerate canvas.
    pub fn validate(&self) -> crate::Result<()> {
        let f = &self.figure;
        if !(f.width > 0.0 && f.height > 0.0) {
            return Err(crate::RenderError::Config(format!(
                "figure size must be positive, got {}x{}",
                f.width, f.height
            )));
        }
        let horizontal = f.margin_left + f.margin_right;
        let vertical = f.margin_top + f.margin_bottom;
        if !(0.0..1.0).contains(&horizontal) || !(0.0..1.0).contains(&vertical) {
            return Err(crate::RenderError::Config("margins leave no room for the plot".into()));
        }
        if !(0.0..1.0).contains(&f.ratio_fraction) {
            return Err(crate::RenderError::Config(format!(
                "ratio_fraction must be in [0, 1), got {}",
                f.ratio_fraction
            )));
        }
        if self.output.dpi == 0 {
            return Err(crate::RenderError::Config("dpi must be positive".into()));
        }
        Ok(())
    }

    pub fn from_yaml_file(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        resolve_config(Some(&text))
    }

    pub fn to_yaml(&self) -> crate::Result<String> {
        serde_yaml_ng::to_string(self).map_err(|e| crate::RenderError::Config(e.to_string()))
    }
}

/// Resolve a RenderConfig from an optional YAML string.
///
/// A `theme:` key selects the base; every other key overrides it.
pub fn resolve_config(user_yaml: Option<&str>) -> crate::Result<RenderConfig> {
    let Some(yaml) = user_yaml else {
        return Ok(RenderConfig::default());
    };
    let value: serde_yaml_ng::Value =
        serde_yaml_ng::from_str(yaml).map_err(|e| crate::RenderError::Config(e.to_string()))?;
    let theme = value.get("theme").and_then(|t| t.as_str()).unwrap_or("cms");
    let base = BuiltinTheme::parse(theme)?.base_config();

    let config = if value.is_null() {
        base
    } else {
        let mut merged = serde_yaml_ng::to_value(&base)
            .map_err(|e| crate::RenderError::Config(e.to_string()))?;
        merge(&mut merged, value);
        serde_yaml_ng::from_value(merged).map_err(|e| crate::RenderError::Config(e.to_string()))?
    };
    config.validate()?;
    Ok(config)
}

/// Recursive mapping merge; scalars and sequences in `over` replace those in `base`.
fn merge(base: &mut serde_yaml_ng::Value, over: serde_yaml_ng::Value) {
    use serde_yaml_ng::Value;
    match (base, over) {
        (Value::Mapping(b), Value::Mapping(o)) => {
            for (k, v) in o {
                match b.get_mut(&k) {
                    Some(slot) => merge(slot, v),
                    None => {
                        b.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_cms() {
        let c = resolve_config(None).unwrap();
        assert_eq!(c.theme, "cms");
        assert_eq!(c.figure.ratio_fraction, 0.3);
    }

    #[test]
    fn yaml_overrides_only_named_fields() {
        let c = resolve_config(Some("figure:\n  width: 400\noutput:\n  dpi: 300\n")).unwrap();
        assert_eq!(c.figure.width, 400.0);
        assert_eq!(c.figure.height, 576.0);
        assert_eq!(c.output.dpi, 300);
        assert!(c.stack.show_mc_band);
    }

    #[test]
    fn theme_selects_base() {
        let c = resolve_config(Some("theme: minimal\nfont:\n  size: 9\n")).unwrap();
        assert_eq!(c.theme, "minimal");
        assert_eq!(c.axes.tick_direction, "out");
        assert_eq!(c.font.size, 9.0);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(resolve_config(Some("theme: neon\n")).is_err());
        assert!(resolve_config(Some("figure:\n  ratio_fraction: 1.5\n")).is_err());
        assert!(resolve_config(Some("colors:\n  data: nope\n")).is_err());
        assert!(resolve_config(Some("figure: [1, 2]\n")).is_err());
    }
}
