use hs_core::artifact::LabelArtifact;

use crate::canvas::Canvas;
use crate::config::RenderConfig;
use crate::layout::margins::PlotArea;
use crate::primitives::*;

/// Draw the header above `area`: **CMS** *Preliminary* on the left and the
/// luminosity/energy text on the right.
pub fn draw_header(canvas: &mut Canvas, area: &PlotArea, label: &LabelArtifact, config: &RenderConfig) {
    let y = area.top - 0.35 * config.font.header_size;
    let mut x = area.left;

    if !label.experiment.is_empty() {
        let bold = TextStyle::sized(config.font.header_size).bold();
        canvas.latex(x, y, &label.experiment, &bold);
        x += canvas.measure_latex(&label.experiment, &bold).width + 0.3 * config.font.header_size;
    }

    if !label.status.is_empty() {
        let italic = TextStyle::sized(config.font.header_size * 0.76).italic();
        canvas.latex(x, y, &label.status, &italic);
    }

    if !label.lumi_text.is_empty() {
        let info = TextStyle::sized(config.font.label_size).anchor(TextAnchor::End);
        canvas.latex(area.right(), y, &label.lumi_text, &info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_places_all_three_parts() {
        let mut canvas = Canvas::new(400.0, 400.0);
        let area = PlotArea::manual(50.0, 40.0, 300.0, 300.0);
        let label = LabelArtifact {
            experiment: "CMS".into(),
            status: "Preliminary".into(),
            lumi_text: "26.7 fb^{-1} (13.6 TeV)".into(),
        };
        draw_header(&mut canvas, &area, &label, &RenderConfig::default());
        let svg = canvas.finish_svg();
        assert!(svg.contains(r#"font-weight="bold">CMS</text>"#));
        assert!(svg.contains(r#"font-style="italic">Preliminary</text>"#));
        assert!(svg.contains(r#"text-anchor="end""#));
        assert!(svg.contains(">-1</tspan>"));
    }

    #[test]
    fn empty_label_draws_nothing() {
        let mut canvas = Canvas::new(100.0, 100.0);
        let area = PlotArea::manual(10.0, 10.0, 80.0, 80.0);
        let label = LabelArtifact { experiment: String::new(), status: String::new(), lumi_text: String::new() };
        draw_header(&mut canvas, &area, &label, &RenderConfig::default());
        assert!(!canvas.finish_svg().contains("<text"));
    }
}
