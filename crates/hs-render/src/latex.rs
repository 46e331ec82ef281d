//! The subset of ROOT's TLatex markup that shows up in axis titles and legend
//! labels: `_{}` / `^{}` scripts, `#bar{}`, `#sqrt{}`, Greek letters and a
//! handful of symbols. `#it` and `#bf` are accepted and ignored.

/// Size factor applied per script level.
pub const SCRIPT_SCALE: f64 = 0.7;

/// A run of text at one script level (0 = baseline, >0 superscript, <0 subscript).
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub level: i8,
}

impl TextRun {
    pub fn font_size(&self, base: f64) -> f64 {
        base * SCRIPT_SCALE.powi(i32::from(self.level.unsigned_abs()))
    }
}

/// Vertical offset of a script level above the baseline, in points.
pub fn baseline_shift(level: i8, base: f64) -> f64 {
    let mut offset = 0.0;
    let mut size = base;
    for _ in 0..level.unsigned_abs() {
        offset += if level > 0 { 0.4 * size } else { -0.25 * size };
        size *= SCRIPT_SCALE;
    }
    offset
}

pub fn parse(input: &str) -> Vec<TextRun> {
    let mut p = Parser { chars: input.chars().collect(), pos: 0, runs: Vec::new() };
    p.sequence(0, false);
    p.runs
}

/// Text with all markup resolved and script levels flattened.
pub fn plain(input: &str) -> String {
    parse(input).into_iter().map(|r| r.text).collect()
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    runs: Vec<TextRun>,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn push(&mut self, text: &str, level: i8) {
        if text.is_empty() {
            return;
        }
        match self.runs.last_mut() {
            Some(last) if last.level == level => last.text.push_str(text),
            _ => self.runs.push(TextRun { text: text.to_string(), level }),
        }
    }

    /// Parse until end of input, or until the matching `}` when `in_group`.
    fn sequence(&mut self, level: i8, in_group: bool) {
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '}' if in_group => return,
                '{' => self.sequence(level, true),
                '_' | '^' => {
                    let inner = if c == '^' { level.saturating_add(1) } else { level.saturating_sub(1) };
                    self.argument(inner);
                }
                '#' => self.command(level),
                other => {
                    let mut buf = [0u8; 4];
                    self.push(other.encode_utf8(&mut buf), level);
                }
            }
        }
    }

    /// A braced group or a single character.
    fn argument(&mut self, level: i8) {
        match self.peek() {
            Some('{') => {
                self.pos += 1;
                self.sequence(level, true);
            }
            Some(c) => {
                self.pos += 1;
                let mut buf = [0u8; 4];
                self.push(c.encode_utf8(&mut buf), level);
            }
            None => {}
        }
    }

    fn command(&mut self, level: i8) {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        match name.as_str() {
            "" => {
                // "##" is a literal hash
                if self.peek() == Some('#') {
                    self.pos += 1;
                }
                self.push("#", level);
            }
            "it" | "bf" | "rm" => {
                if self.peek() == Some('{') {
                    self.argument(level);
                }
            }
            "bar" => {
                let first = self.runs.len();
                let tail_len = self.runs.last().map(|r| r.text.len()).unwrap_or(0);
                self.argument(level);
                self.apply_macron(first, tail_len);
            }
            "sqrt" => {
                self.push("\u{221A}", level);
                self.argument(level);
            }
            other => match symbol(other) {
                Some(s) => self.push(s, level),
                None => {
                    self.push("#", level);
                    self.push(other, level);
                }
            },
        }
    }

    /// Put a combining macron after every visible character appended since
    /// `(first_run, offset_in_previous_run)`.
    fn apply_macron(&mut self, first_run: usize, prev_len: usize) {
        let start_run = first_run.saturating_sub(1);
        for (i, run) in self.runs.iter_mut().enumerate().skip(start_run) {
            let skip = if i + 1 == first_run { prev_len } else { 0 };
            if i + 1 == first_run && run.text.len() == skip {
                continue;
            }
            let (kept, tail) = run.text.split_at(skip.min(run.text.len()));
            let mut out = kept.to_string();
            for ch in tail.chars() {
                out.push(ch);
                if !ch.is_whitespace() {
                    out.push('\u{0304}');
                }
            }
            run.text = out;
        }
    }
}

fn symbol(name: &str) -> Option<&'static str> {
    Some(match name {
        "alpha" => "α",
        "beta" => "β",
        "gamma" => "γ",
        "delta" => "δ",
        "epsilon" => "ε",
        "eta" => "η",
        "theta" => "θ",
        "kappa" => "κ",
        "lambda" => "λ",
        "mu" => "μ",
        "nu" => "ν",
        "xi" => "ξ",
        "pi" => "π",
        "rho" => "ρ",
        "sigma" => "σ",
        "tau" => "τ",
        "phi" => "φ",
        "chi" => "χ",
        "psi" => "ψ",
        "omega" => "ω",
        "Gamma" => "Γ",
        "Delta" => "Δ",
        "Theta" => "Θ",
        "Lambda" => "Λ",
        "Xi" => "Ξ",
        "Pi" => "Π",
        "Sigma" => "Σ",
        "Phi" => "Φ",
        "Psi" => "Ψ",
        "Omega" => "Ω",
        "ell" => "ℓ",
        "pm" => "±",
        "times" => "×",
        "cdot" => "·",
        "circ" => "°",
        "infty" => "∞",
        "approx" => "≈",
        "leq" => "≤",
        "geq" => "≥",
        "rightarrow" => "→",
        "leftarrow" => "←",
        _ => return None,
    })
}
