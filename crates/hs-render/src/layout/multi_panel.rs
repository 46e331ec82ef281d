use crate::layout::margins::PlotArea;

/// Main panel stacked above a ratio panel sharing the x axis.
#[derive(Debug, Clone)]
pub struct MainRatioLayout {
    pub main: PlotArea,
    pub ratio: PlotArea,
}

impl MainRatioLayout {
    /// Split `content` vertically; the ratio panel gets `ratio_frac` of the height.
    pub fn split(content: &PlotArea, gap: f64, ratio_frac: f64) -> Self {
        let ratio_h = content.height * ratio_frac;
        let main_h = content.height - ratio_h - gap;

        Self {
            main: PlotArea::manual(content.left, content.top, content.width, main_h),
            ratio: PlotArea::manual(content.left, content.top + main_h + gap, content.width, ratio_h),
        }
    }
}
