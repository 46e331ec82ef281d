use crate::canvas::Canvas;
use crate::color::Color;
use crate::layout::margins::PlotArea;
use crate::primitives::*;

pub struct LegendEntry {
    pub label: String,
    pub color: Color,
    pub kind: SwatchKind,
}

pub enum SwatchKind {
    Fill,
    Line { width: f64 },
    Marker,
    /// Hatch pattern id, as returned by [`Canvas::hatch_pattern`].
    Hatched(String),
}

/// Draw an unframed legend in the top-right corner of `area`, filling
/// `columns` columns row by row. Returns the box it occupies.
pub fn draw_legend(
    canvas: &mut Canvas,
    area: &PlotArea,
    entries: &[LegendEntry],
    font_size: f64,
    columns: usize,
) -> Option<PlotArea> {
    if entries.is_empty() {
        return None;
    }
    let columns = columns.clamp(1, entries.len());
    let rows = entries.len().div_ceil(columns);

    let row_height = font_size * 1.45;
    let swatch_w = font_size * 1.8;
    let swatch_h = font_size * 0.9;
    let gap = font_size * 0.5;
    let inset = font_size * 0.8;

    let text_style = TextStyle::sized(font_size).baseline(TextBaseline::Central);
    let label_w = entries
        .iter()
        .map(|e| canvas.measure_latex(&e.label, &text_style).width)
        .fold(0.0_f64, f64::max);
    let col_w = swatch_w + gap + label_w + gap;

    let width = col_w * columns as f64;
    let height = row_height * rows as f64;
    let lx = area.right() - inset - width;
    let ly = area.top + inset;

    for (i, entry) in entries.iter().enumerate() {
        let (row, col) = (i / columns, i % columns);
        let sx = lx + col as f64 * col_w;
        let cy = ly + (row as f64 + 0.5) * row_height;
        let top = cy - swatch_h / 2.0;

        match &entry.kind {
            SwatchKind::Fill => {
                canvas.rect(sx, top, swatch_w, swatch_h, &Style::filled(entry.color));
            }
            SwatchKind::Line { width } => {
                canvas.line(sx, cy, sx + swatch_w, cy, &LineStyle::solid(entry.color, *width));
            }
            SwatchKind::Marker => {
                let mx = sx + swatch_w / 2.0;
                canvas.line(mx, top, mx, top + swatch_h, &LineStyle::solid(entry.color, 1.0));
                canvas.marker(
                    mx,
                    cy,
                    &MarkerStyle { color: entry.color, size: font_size * 0.25, ..Default::default() },
                );
            }
            SwatchKind::Hatched(pattern) => {
                canvas.hatch_rect(sx, top, swatch_w, swatch_h, pattern);
            }
        }

        canvas.latex(sx + swatch_w + gap, cy, &entry.label, &text_style);
    }

    Some(PlotArea::manual(lx, ly, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: &str, kind: SwatchKind) -> LegendEntry {
        LegendEntry { label: label.into(), color: Color::rgb(10, 20, 30), kind }
    }

    #[test]
    fn legend_sits_top_right() {
        let mut canvas = Canvas::new(400.0, 400.0);
        let area = PlotArea::manual(50.0, 50.0, 300.0, 300.0);
        let entries = vec![
            entry("Data", SwatchKind::Marker),
            entry("t#bar{t}", SwatchKind::Fill),
            entry("Signal", SwatchKind::Line { width: 2.0 }),
        ];
        let bbox = draw_legend(&mut canvas, &area, &entries, 10.0, 1).unwrap();
        assert!(bbox.right() <= area.right());
        assert!(bbox.top >= area.top);
        assert!((bbox.height - 3.0 * 14.5).abs() < 1e-9);
        let svg = canvas.finish_svg();
        assert!(svg.contains(">Data</text>"));
        assert!(svg.contains("<circle"));
    }

    #[test]
    fn two_columns_halve_rows() {
        let mut canvas = Canvas::new(400.0, 400.0);
        let area = PlotArea::manual(0.0, 0.0, 400.0, 400.0);
        let entries: Vec<_> = ["a", "b", "c"].iter().map(|l| entry(l, SwatchKind::Fill)).collect();
        let bbox = draw_legend(&mut canvas, &area, &entries, 10.0, 2).unwrap();
        assert!((bbox.height - 2.0 * 14.5).abs() < 1e-9);
        assert!(draw_legend(&mut canvas, &area, &[], 10.0, 1).is_none());
    }
}
