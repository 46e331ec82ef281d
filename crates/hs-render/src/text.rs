//! Approximate text metrics from the Helvetica advance-width table
//! (units of 1/1000 em). Good enough for layout; exact shaping happens in the
//! SVG consumer.

use crate::latex::{self, TextRun};
use crate::primitives::{FontWeight, TextStyle};

/// Result of text measurement.
#[derive(Debug, Clone, Copy)]
pub struct TextMetrics {
    pub width: f64,
    pub ascent: f64,
    pub descent: f64,
}

impl TextMetrics {
    pub fn height(&self) -> f64 {
        self.ascent + self.descent
    }
}

const ASCENT: f64 = 0.718;
const DESCENT: f64 = 0.207;
const BOLD_FACTOR: f64 = 1.06;

// ASCII 0x20..=0x7e
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

fn advance(ch: char) -> f64 {
    let code = ch as u32;
    if (0x20..=0x7e).contains(&code) {
        return f64::from(HELVETICA[(code - 0x20) as usize]);
    }
    // Combining marks take no space.
    if (0x0300..=0x036f).contains(&code) {
        return 0.0;
    }
    556.0
}

/// Width of a plain string at `size` points.
pub fn string_width(text: &str, size: f64, weight: FontWeight) -> f64 {
    let em: f64 = text.chars().map(advance).sum();
    let factor = if weight == FontWeight::Bold { BOLD_FACTOR } else { 1.0 };
    em / 1000.0 * size * factor
}

/// Measure plain text.
pub fn measure_text(text: &str, style: &TextStyle) -> TextMetrics {
    TextMetrics {
        width: string_width(text, style.size, style.weight),
        ascent: ASCENT * style.size,
        descent: DESCENT * style.size,
    }
}

/// Measure pre-parsed rich text, accounting for script sizes and shifts.
pub fn measure_runs(runs: &[TextRun], style: &TextStyle) -> TextMetrics {
    let mut width = 0.0;
    let mut ascent = ASCENT * style.size;
    let mut descent = DESCENT * style.size;
    for run in runs {
        let size = run.font_size(style.size);
        let shift = latex::baseline_shift(run.level, style.size);
        width += string_width(&run.text, size, style.weight);
        ascent = ascent.max(shift + ASCENT * size);
        descent = descent.max(DESCENT * size - shift);
    }
    TextMetrics { width, ascent, descent }
}

/// Measure TLatex-style markup.
pub fn measure_latex(markup: &str, style: &TextStyle) -> TextMetrics {
    measure_runs(&latex::parse(markup), style)
}
