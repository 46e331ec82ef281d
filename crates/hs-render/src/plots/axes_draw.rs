use crate::canvas::Canvas;
use crate::config::RenderConfig;
use crate::layout::axes::Axis;
use crate::layout::margins::PlotArea;
use crate::primitives::*;

/// Draw a box frame with major/minor ticks, tick labels and axis titles.
///
/// Titles sit at the far end of each axis (x title right-aligned under the
/// frame, y title top-aligned), the ROOT/CMS convention.
pub fn draw_axes(canvas: &mut Canvas, area: &PlotArea, x_axis: &Axis, y_axis: &Axis, config: &RenderConfig) {
    let frame_color = config.colors.frame;
    let frame_style = LineStyle::solid(frame_color, config.axes.frame_width);
    let major = LineStyle::solid(frame_color, config.axes.frame_width * 0.8);
    let minor = LineStyle::solid(frame_color, config.axes.frame_width * 0.6);

    let inward = config.axes.tick_direction != "out";
    let dir = if inward { 1.0 } else { -1.0 };
    let tl = config.axes.tick_length;
    let mtl = config.axes.minor_tick_length;

    draw_frame(canvas, area, &frame_style);

    // --- X axis ---
    let x_label_style = TextStyle::sized(config.font.tick_size)
        .anchor(TextAnchor::Middle)
        .baseline(TextBaseline::Hanging);
    let x_label_y = area.bottom() + if inward { 4.0 } else { tl + 4.0 };
    let mut has_x_labels = false;

    for (i, &val) in x_axis.tick_positions.iter().enumerate() {
        let Some(px) = x_pixel(x_axis, area, val) else { continue };
        canvas.line(px, area.bottom(), px, area.bottom() - dir * tl, &major);
        if config.axes.show_top_ticks {
            canvas.line(px, area.top, px, area.top + dir * tl, &major);
        }
        if let Some(label) = x_axis.tick_labels.get(i)
            && !label.is_empty()
        {
            canvas.latex(px, x_label_y, label, &x_label_style);
            has_x_labels = true;
        }
    }
    for &val in &x_axis.minor_ticks {
        let Some(px) = x_pixel(x_axis, area, val) else { continue };
        canvas.line(px, area.bottom(), px, area.bottom() - dir * mtl, &minor);
        if config.axes.show_top_ticks {
            canvas.line(px, area.top, px, area.top + dir * mtl, &minor);
        }
    }

    // --- Y axis ---
    let y_label_style = TextStyle::sized(config.font.tick_size)
        .anchor(TextAnchor::End)
        .baseline(TextBaseline::Central);
    let y_label_x = area.left - if inward { 5.0 } else { tl + 5.0 };
    let mut widest = 0.0_f64;

    for (i, &val) in y_axis.tick_positions.iter().enumerate() {
        let Some(py) = y_pixel(y_axis, area, val) else { continue };
        canvas.line(area.left, py, area.left + dir * tl, py, &major);
        if config.axes.show_right_ticks {
            canvas.line(area.right(), py, area.right() - dir * tl, py, &major);
        }
        if let Some(label) = y_axis.tick_labels.get(i)
            && !label.is_empty()
        {
            canvas.latex(y_label_x, py, label, &y_label_style);
            widest = widest.max(canvas.measure_latex(label, &y_label_style).width);
        }
    }
    for &val in &y_axis.minor_ticks {
        let Some(py) = y_pixel(y_axis, area, val) else { continue };
        canvas.line(area.left, py, area.left + dir * mtl, py, &minor);
        if config.axes.show_right_ticks {
            canvas.line(area.right(), py, area.right() - dir * mtl, py, &minor);
        }
    }

    // --- Titles ---
    let title_style = TextStyle::sized(config.font.label_size).anchor(TextAnchor::End);
    if !x_axis.label.is_empty() {
        let offset = if has_x_labels { config.font.tick_size * 1.3 } else { 0.0 };
        let y = x_label_y + offset + config.font.label_size;
        canvas.latex(area.right(), y, &x_axis.label, &title_style);
    }
    if !y_axis.label.is_empty() {
        let x = y_label_x - widest - config.font.label_size * 0.45;
        canvas.latex_rotated(x, area.top, &y_axis.label, &title_style, -90.0);
    }
}

fn draw_frame(canvas: &mut Canvas, area: &PlotArea, style: &LineStyle) {
    canvas.line(area.left, area.top, area.right(), area.top, style);
    canvas.line(area.left, area.bottom(), area.right(), area.bottom(), style);
    canvas.line(area.left, area.top, area.left, area.bottom(), style);
    canvas.line(area.right(), area.top, area.right(), area.bottom(), style);
}

fn x_pixel(axis: &Axis, area: &PlotArea, val: f64) -> Option<f64> {
    let px = axis.data_to_pixel(val, area.left, area.right());
    (px >= area.left - 0.5 && px <= area.right() + 0.5).then_some(px)
}

fn y_pixel(axis: &Axis, area: &PlotArea, val: f64) -> Option<f64> {
    let py = axis.data_to_pixel(val, area.bottom(), area.top);
    (py >= area.top - 0.5 && py <= area.bottom() + 0.5).then_some(py)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_and_labels_are_drawn() {
        let mut canvas = Canvas::new(400.0, 400.0);
        let area = PlotArea::manual(60.0, 30.0, 300.0, 300.0);
        let x = Axis::linear(0.0, 100.0, 6).with_label("m_{ll} [GeV]");
        let y = Axis::log(0.1, 1e3).with_label("Events / bin");
        draw_axes(&mut canvas, &area, &x, &y, &RenderConfig::default());
        let svg = canvas.finish_svg();
        assert!(svg.contains(">100</text>"));
        assert!(svg.contains(">ll</tspan>"));
        assert!(svg.contains("rotate(-90.0"));
        assert!(svg.contains(">Events / bin</text>"));
    }

    #[test]
    fn hidden_tick_labels_keep_ticks() {
        let mut canvas = Canvas::new(400.0, 400.0);
        let area = PlotArea::manual(60.0, 30.0, 300.0, 300.0);
        let x = Axis::linear(0.0, 100.0, 6).without_tick_labels();
        let y = Axis::linear(0.0, 1.0, 3);
        draw_axes(&mut canvas, &area, &x, &y, &RenderConfig::default());
        let svg = canvas.finish_svg();
        assert!(!svg.contains(">100</text>"));
        assert!(svg.contains(">0.5</text>"));
    }
}
