use std::fmt::{self, Write as FmtWrite};

use crate::color::{Color, WHITE};
use crate::latex::{self, TextRun};
use crate::primitives::*;
use crate::text::{self, TextMetrics};

/// Font stack emitted on every text element; resolved by the SVG consumer.
pub const FONT_FAMILY: &str = "Helvetica, Arial, 'Liberation Sans', 'DejaVu Sans', sans-serif";

/// An SVG element stored for deferred rendering.
#[derive(Debug, Clone)]
enum SvgElement {
    Rect { x: f64, y: f64, w: f64, h: f64, style: Style },
    PatternRect { x: f64, y: f64, w: f64, h: f64, pattern: String },
    Line { x1: f64, y1: f64, x2: f64, y2: f64, style: LineStyle },
    Polyline { points: Vec<(f64, f64)>, style: LineStyle },
    Polygon { points: Vec<(f64, f64)>, style: Style },
    Text { x: f64, y: f64, runs: Vec<TextRun>, style: TextStyle, rotate: Option<f64> },
    Circle { cx: f64, cy: f64, r: f64, style: Style },
    Group { clip_id: String, children: Vec<SvgElement> },
}

/// Immediate-mode SVG canvas. Coordinates in points (1pt = 1/72").
pub struct Canvas {
    pub width: f64,
    pub height: f64,
    elements: Vec<SvgElement>,
    defs: Vec<(String, String)>,
    /// Open clip groups, innermost last.
    clip_stack: Vec<(String, Vec<SvgElement>)>,
    next_clip_id: usize,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            elements: Vec::new(),
            defs: Vec::new(),
            clip_stack: Vec::new(),
            next_clip_id: 0,
        }
    }

    // --- Drawing primitives ---

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, style: &Style) {
        let (x, w) = normalize(x, w);
        let (y, h) = normalize(y, h);
        self.push(SvgElement::Rect { x, y, w, h, style: style.clone() });
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, style: &LineStyle) {
        self.push(SvgElement::Line { x1, y1, x2, y2, style: style.clone() });
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], style: &LineStyle) {
        if points.len() < 2 {
            return;
        }
        self.push(SvgElement::Polyline { points: points.to_vec(), style: style.clone() });
    }

    pub fn polygon(&mut self, points: &[(f64, f64)], style: &Style) {
        if points.len() < 3 {
            return;
        }
        self.push(SvgElement::Polygon { points: points.to_vec(), style: style.clone() });
    }

    /// Histogram outline: a horizontal segment per bin joined by vertical risers.
    ///
    /// `edges` has one more entry than `levels`; both are already in pixels.
    pub fn step(&mut self, edges: &[f64], levels: &[f64], style: &LineStyle) {
        self.polyline(&step_points(edges, levels), style);
    }

    /// Filled histogram area between `levels` and a horizontal `base`.
    pub fn step_fill(&mut self, edges: &[f64], levels: &[f64], base: f64, style: &Style) {
        let mut pts = step_points(edges, levels);
        if let (Some(&(x0, _)), Some(&(x1, _))) = (pts.first(), pts.last()) {
            pts.push((x1, base));
            pts.push((x0, base));
        }
        self.polygon(&pts, style);
    }

    /// Plain text, drawn as-is.
    pub fn text(&mut self, x: f64, y: f64, content: &str, style: &TextStyle) {
        let runs = vec![TextRun { text: content.to_string(), level: 0 }];
        self.push(SvgElement::Text { x, y, runs, style: style.clone(), rotate: None });
    }

    /// TLatex-style markup (`m_{ll}`, `fb^{-1}`, `#mu`).
    pub fn latex(&mut self, x: f64, y: f64, markup: &str, style: &TextStyle) {
        let runs = latex::parse(markup);
        self.push(SvgElement::Text { x, y, runs, style: style.clone(), rotate: None });
    }

    pub fn latex_rotated(&mut self, x: f64, y: f64, markup: &str, style: &TextStyle, angle: f64) {
        let runs = latex::parse(markup);
        self.push(SvgElement::Text { x, y, runs, style: style.clone(), rotate: Some(angle) });
    }

    pub fn circle(&mut self, cx: f64, cy: f64, r: f64, style: &Style) {
        self.push(SvgElement::Circle { cx, cy, r, style: style.clone() });
    }

    /// Vertical error bar with optional horizontal caps.
    pub fn error_bar(&mut self, x: f64, y_lo: f64, y_hi: f64, cap_width: f64, style: &LineStyle) {
        self.line(x, y_lo, x, y_hi, style);
        if cap_width > 0.0 {
            let half = cap_width / 2.0;
            self.line(x - half, y_lo, x + half, y_lo, style);
            self.line(x - half, y_hi, x + half, y_hi, style);
        }
    }

    pub fn marker(&mut self, x: f64, y: f64, marker: &MarkerStyle) {
        let style = Style::filled(marker.color);
        match marker.shape {
            MarkerShape::Circle => self.circle(x, y, marker.size, &style),
            MarkerShape::Square => {
                let s = marker.size;
                self.rect(x - s, y - s, 2.0 * s, 2.0 * s, &style);
            }
        }
    }

    // --- Patterns ---

    /// Define (once) a 45-degree hatch pattern and return its id.
    pub fn hatch_pattern(&mut self, color: Color, spacing: f64, line_width: f64) -> String {
        let id = format!(
            "hatch_{}_{}_{}",
            color.to_hex().trim_start_matches('#'),
            (spacing * 100.0).round() as i64,
            (line_width * 100.0).round() as i64
        );
        if !self.defs.iter().any(|(k, _)| *k == id) {
            let def = format!(
                r#"<pattern id="{id}" patternUnits="userSpaceOnUse" width="{sp:.2}" height="{sp:.2}" patternTransform="rotate(45)"><line x1="0" y1="0" x2="0" y2="{sp:.2}" stroke="{c}" stroke-width="{lw:.2}" /></pattern>"#,
                sp = spacing,
                c = color.to_svg_fill(),
                lw = line_width,
            );
            self.defs.push((id.clone(), def));
        }
        id
    }

    pub fn hatch_rect(&mut self, x: f64, y: f64, w: f64, h: f64, pattern: &str) {
        let (x, w) = normalize(x, w);
        let (y, h) = normalize(y, h);
        self.push(SvgElement::PatternRect { x, y, w, h, pattern: pattern.to_string() });
    }

    // --- Clip paths ---

    /// Start clipping subsequent drawing to a rectangle until [`Canvas::pop_clip`].
    pub fn push_clip(&mut self, x: f64, y: f64, w: f64, h: f64) -> String {
        let id = format!("clip{}", self.next_clip_id);
        self.next_clip_id += 1;
        self.defs.push((
            id.clone(),
            format!(
                r#"<clipPath id="{id}"><rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" /></clipPath>"#
            ),
        ));
        self.clip_stack.push((id.clone(), Vec::new()));
        id
    }

    pub fn pop_clip(&mut self) {
        if let Some((clip_id, children)) = self.clip_stack.pop() {
            self.push(SvgElement::Group { clip_id, children });
        }
    }

    // --- Text measurement ---

    pub fn measure_text(&self, content: &str, style: &TextStyle) -> TextMetrics {
        text::measure_text(content, style)
    }

    pub fn measure_latex(&self, markup: &str, style: &TextStyle) -> TextMetrics {
        text::measure_latex(markup, style)
    }

    // --- SVG output ---

    fn push(&mut self, elem: SvgElement) {
        match self.clip_stack.last_mut() {
            Some((_, children)) => children.push(elem),
            None => self.elements.push(elem),
        }
    }

    /// Serialize the canvas. Clip groups still open are closed first.
    pub fn finish_svg(mut self) -> String {
        while !self.clip_stack.is_empty() {
            self.pop_clip();
        }
        let mut out = String::with_capacity(32 * 1024);
        // Writing into a String cannot fail.
        let _ = self.write_svg(&mut out);
        out
    }

    fn write_svg(&self, out: &mut String) -> fmt::Result {
        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height,
        )?;
        if !self.defs.is_empty() {
            out.push_str("<defs>\n");
            for (_, d) in &self.defs {
                writeln!(out, "{d}")?;
            }
            out.push_str("</defs>\n");
        }
        writeln!(
            out,
            r#"<rect width="{}" height="{}" fill="{}" />"#,
            self.width,
            self.height,
            WHITE.to_svg_fill()
        )?;
        for elem in &self.elements {
            render_element(out, elem)?;
        }
        out.push_str("</svg>\n");
        Ok(())
    }
}

fn normalize(origin: f64, extent: f64) -> (f64, f64) {
    if extent < 0.0 { (origin + extent, -extent) } else { (origin, extent) }
}

fn step_points(edges: &[f64], levels: &[f64]) -> Vec<(f64, f64)> {
    let mut pts = Vec::with_capacity(levels.len() * 2);
    for (i, &y) in levels.iter().enumerate() {
        let (Some(&x0), Some(&x1)) = (edges.get(i), edges.get(i + 1)) else { break };
        pts.push((x0, y));
        pts.push((x1, y));
    }
    pts
}

fn write_points(out: &mut String, points: &[(f64, f64)]) -> fmt::Result {
    for (i, (x, y)) in points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write!(out, "{x:.2},{y:.2}")?;
    }
    Ok(())
}

fn render_element(out: &mut String, elem: &SvgElement) -> fmt::Result {
    match elem {
        SvgElement::Rect { x, y, w, h, style } => {
            write!(out, r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}""#)?;
            write_style_attrs(out, style)?;
            out.push_str(" />\n");
        }
        SvgElement::PatternRect { x, y, w, h, pattern } => {
            writeln!(
                out,
                r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="url(#{pattern})" />"#
            )?;
        }
        SvgElement::Line { x1, y1, x2, y2, style } => {
            write!(out, r#"<line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}""#)?;
            write_line_attrs(out, style)?;
            out.push_str(" />\n");
        }
        SvgElement::Polyline { points, style } => {
            out.push_str(r#"<polyline points=""#);
            write_points(out, points)?;
            out.push_str(r#"" fill="none" stroke-linejoin="miter""#);
            write_line_attrs(out, style)?;
            out.push_str(" />\n");
        }
        SvgElement::Polygon { points, style } => {
            out.push_str(r#"<polygon points=""#);
            write_points(out, points)?;
            out.push('"');
            write_style_attrs(out, style)?;
            out.push_str(" />\n");
        }
        SvgElement::Text { x, y, runs, style, rotate } => {
            write!(out, r#"<text x="{x:.2}" y="{y:.2}" font-family="{FONT_FAMILY}""#)?;
            write!(out, r#" font-size="{:.2}" fill="{}""#, style.size, style.color.to_svg_fill())?;
            write!(out, r#" text-anchor="{}""#, style.anchor.as_str())?;
            if style.baseline != TextBaseline::Alphabetic {
                write!(out, r#" dominant-baseline="{}""#, style.baseline.as_str())?;
            }
            if style.weight == FontWeight::Bold {
                out.push_str(r#" font-weight="bold""#);
            }
            if style.style == FontStyle::Italic {
                out.push_str(r#" font-style="italic""#);
            }
            if let Some(angle) = rotate {
                write!(out, r#" transform="rotate({angle:.1},{x:.2},{y:.2})""#)?;
            }
            out.push('>');
            write_runs(out, runs, style.size)?;
            out.push_str("</text>\n");
        }
        SvgElement::Circle { cx, cy, r, style } => {
            write!(out, r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}""#)?;
            write_style_attrs(out, style)?;
            out.push_str(" />\n");
        }
        SvgElement::Group { clip_id, children } => {
            writeln!(out, r#"<g clip-path="url(#{clip_id})">"#)?;
            for child in children {
                render_element(out, child)?;
            }
            out.push_str("</g>\n");
        }
    }
    Ok(())
}

fn write_runs(out: &mut String, runs: &[TextRun], base: f64) -> fmt::Result {
    if let [only] = runs
        && only.level == 0
    {
        escape_into(out, &only.text);
        return Ok(());
    }
    let mut current = 0.0;
    for run in runs {
        let shift = latex::baseline_shift(run.level, base);
        // SVG y grows downwards.
        let dy = current - shift;
        current = shift;
        write!(out, r#"<tspan font-size="{:.2}""#, run.font_size(base))?;
        if dy.abs() > 1e-9 {
            write!(out, r#" dy="{dy:.2}""#)?;
        }
        out.push('>');
        escape_into(out, &run.text);
        out.push_str("</tspan>");
    }
    Ok(())
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

fn write_style_attrs(out: &mut String, style: &Style) -> fmt::Result {
    match &style.fill {
        Some(fill) => write!(out, r#" fill="{}""#, fill.to_svg_fill())?,
        None => out.push_str(r#" fill="none""#),
    }
    if let Some(stroke) = &style.stroke {
        write!(out, r#" stroke="{}" stroke-width="{:.2}""#, stroke.to_svg_fill(), style.stroke_width)?;
    }
    Ok(())
}

fn write_line_attrs(out: &mut String, style: &LineStyle) -> fmt::Result {
    write!(out, r#" stroke="{}" stroke-width="{:.2}""#, style.color.to_svg_fill(), style.width)?;
    if let Some(dash) = &style.dash {
        write!(out, r#" stroke-dasharray="{dash}""#)?;
    }
    Ok(())
}
