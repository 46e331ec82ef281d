use crate::config::FigureConfig;

/// Rectangular plot area within the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Content area left after the figure's fractional margins, like a ROOT
    /// pad's SetLeftMargin/SetRightMargin/....
    pub fn from_figure(fig: &FigureConfig) -> Self {
        let left = fig.width * fig.margin_left;
        let top = fig.height * fig.margin_top;
        let width = fig.width * (1.0 - fig.margin_left - fig.margin_right);
        let height = fig.height * (1.0 - fig.margin_top - fig.margin_bottom);
        Self { left, top, width: width.max(50.0), height: height.max(50.0) }
    }

    pub fn manual(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn from_figure_fractions() {
        let fig = FigureConfig {
            width: 1000.0,
            height: 500.0,
            margin_left: 0.1,
            margin_right: 0.05,
            margin_top: 0.1,
            margin_bottom: 0.2,
            ..FigureConfig::default()
        };
        let a = PlotArea::from_figure(&fig);
        assert_relative_eq!(a.left, 100.0);
        assert_relative_eq!(a.top, 50.0);
        assert_relative_eq!(a.right(), 950.0, epsilon = 1e-9);
        assert_relative_eq!(a.bottom(), 400.0, epsilon = 1e-9);
    }
}
