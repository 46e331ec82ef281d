use crate::color::Color;
use crate::config::*;

/// Built-in style presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTheme {
    Cms,
    Minimal,
}

impl BuiltinTheme {
    pub const NAMES: [&'static str; 2] = ["cms", "minimal"];

    pub fn parse(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "cms" => Ok(Self::Cms),
            "minimal" => Ok(Self::Minimal),
            other => Err(crate::RenderError::Config(format!(
                "unknown theme '{other}' (expected one of: {})",
                Self::NAMES.join(", ")
            ))),
        }
    }

    pub fn base_config(self) -> RenderConfig {
        match self {
            Self::Cms => cms(),
            Self::Minimal => minimal(),
        }
    }
}

/// Square canvas, inward ticks on all four sides, CMS header.
fn cms() -> RenderConfig {
    RenderConfig {
        theme: "cms".into(),
        figure: FigureConfig::default(),
        font: FontConfig::default(),
        axes: AxesConfig::default(),
        colors: ColorsConfig::default(),
        output: OutputConfig::default(),
        stack: StackStyle::default(),
    }
}

fn minimal() -> RenderConfig {
    RenderConfig {
        theme: "minimal".into(),
        figure: FigureConfig { width: 504.0, height: 432.0, margin_left: 0.13, ..FigureConfig::default() },
        font: FontConfig { size: 10.0, label_size: 12.0, tick_size: 10.0, header_size: 14.0 },
        axes: AxesConfig {
            tick_direction: "out".into(),
            show_top_ticks: false,
            show_right_ticks: false,
            tick_length: 4.0,
            minor_tick_length: 2.0,
            frame_width: 0.8,
        },
        colors: ColorsConfig { mc_band: Color::rgb(0x33, 0x33, 0x33), ..ColorsConfig::default() },
        stack: StackStyle { outline_width: 0.4, marker_size: 2.5, ..StackStyle::default() },
        ..cms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(BuiltinTheme::parse("CMS").unwrap(), BuiltinTheme::Cms);
        assert!(BuiltinTheme::parse("atlas").is_err());
    }

    #[test]
    fn every_theme_validates() {
        for name in BuiltinTheme::NAMES {
            let cfg = BuiltinTheme::parse(name).unwrap().base_config();
            assert_eq!(cfg.theme, name);
            cfg.validate().unwrap();
        }
    }
}
