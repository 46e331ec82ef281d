/// Axis with tick generation and data→pixel mapping.
///
/// Tick labels are TLatex markup (`10^{3}`), drawn with [`crate::canvas::Canvas::latex`].
#[derive(Debug, Clone)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
    pub log: bool,
    pub label: String,
    pub tick_positions: Vec<f64>,
    pub tick_labels: Vec<String>,
    pub minor_ticks: Vec<f64>,
}

impl Axis {
    /// Auto-scale linear axis with "nice number" ticks; the range is widened
    /// to the enclosing ticks.
    pub fn auto_linear(data_min: f64, data_max: f64, target_ticks: usize) -> Self {
        let (nice_min, nice_max, _) = nice_range(data_min, data_max, target_ticks);
        Self::linear(nice_min, nice_max, target_ticks)
    }

    /// Linear axis over exactly `[min, max]` with nice ticks inside it.
    pub fn linear(min: f64, max: f64, target_ticks: usize) -> Self {
        let (min, max) = ordered(min, max);
        let step = nice_step((max - min) / (target_ticks.max(2) - 1) as f64);
        let tol = step * 1e-6;

        let mut ticks = Vec::new();
        let mut labels = Vec::new();
        let first = ((min - tol) / step).ceil() as i64;
        let last = ((max + tol) / step).floor() as i64;
        for k in first..=last {
            let v = k as f64 * step;
            ticks.push(v);
            labels.push(format_tick(v, step));
        }

        let minor_step = step / 5.0;
        let mut minor = Vec::new();
        let first = ((min - tol) / minor_step).ceil() as i64;
        let last = ((max + tol) / minor_step).floor() as i64;
        for k in first..=last {
            if k % 5 != 0 {
                minor.push(k as f64 * minor_step);
            }
        }

        Self {
            min,
            max,
            log: false,
            label: String::new(),
            tick_positions: ticks,
            tick_labels: labels,
            minor_ticks: minor,
        }
    }

    /// Logarithmic axis over `[min, max]`: labelled decades, minors at 2..9.
    ///
    /// A non-positive `min` is replaced by `max * 1e-3`.
    pub fn log(min: f64, max: f64) -> Self {
        let (mut min, max) = ordered(min, max);
        if min <= 0.0 {
            min = if max > 0.0 { max * 1e-3 } else { 1e-3 };
        }
        let max = if max > min { max } else { min * 10.0 };

        let lo = min.log10();
        let hi = max.log10();
        let first_decade = (lo - 1e-9).ceil() as i32;
        let last_decade = (hi + 1e-9).floor() as i32;
        let n_decades = (last_decade - first_decade + 1).max(0);
        // Keep at most ~8 labels.
        let label_every = ((n_decades + 7) / 8).max(1);

        let mut ticks = Vec::new();
        let mut labels = Vec::new();
        for exp in first_decade..=last_decade {
            ticks.push(10f64.powi(exp));
            let labelled = (exp - first_decade) % label_every == 0;
            labels.push(if labelled { decade_label(exp) } else { String::new() });
        }

        let mut minor = Vec::new();
        for exp in (lo.floor() as i32)..=(hi.floor() as i32) {
            for m in 2..=9 {
                let v = m as f64 * 10f64.powi(exp);
                if v >= min * (1.0 - 1e-9) && v <= max * (1.0 + 1e-9) {
                    minor.push(v);
                }
            }
        }

        // Less than two decades in range: promote the minors to labelled ticks.
        if ticks.len() < 2 {
            for v in std::mem::take(&mut minor) {
                ticks.push(v);
                labels.push(format_value(v));
            }
            let mut pairs: Vec<(f64, String)> = ticks.into_iter().zip(labels).collect();
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
            (ticks, labels) = pairs.into_iter().unzip();
        }

        Self {
            min,
            max,
            log: true,
            label: String::new(),
            tick_positions: ticks,
            tick_labels: labels,
            minor_ticks: minor,
        }
    }

    /// Axis with caller-chosen tick positions; ticks outside `[min, max]` are dropped.
    pub fn custom(min: f64, max: f64, log: bool, ticks: &[f64]) -> Self {
        let base = if log { Self::log(min, max) } else { Self::linear(min, max, 6) };
        let (lo, hi) = (base.min, base.max);
        let mut positions: Vec<f64> = ticks
            .iter()
            .copied()
            .filter(|t| *t >= lo * (1.0 - 1e-9) && *t <= hi * (1.0 + 1e-9))
            .collect();
        positions.sort_by(f64::total_cmp);
        positions.dedup();
        let labels = positions.iter().map(|v| format_value(*v)).collect();
        Self { tick_positions: positions, tick_labels: labels, ..base }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Drop tick labels but keep the ticks (shared x axis of a main panel).
    pub fn without_tick_labels(mut self) -> Self {
        self.tick_labels.iter_mut().for_each(String::clear);
        self
    }

    /// Map a data value to pixel coordinate.
    pub fn data_to_pixel(&self, value: f64, px_min: f64, px_max: f64) -> f64 {
        px_min + self.fraction(value) * (px_max - px_min)
    }

    /// Like [`Axis::data_to_pixel`] but pinned just outside the axis range, so
    /// that zero on a log axis or huge values stay finite for clipping.
    pub fn data_to_pixel_clamped(&self, value: f64, px_min: f64, px_max: f64) -> f64 {
        let frac = if self.log && value <= 0.0 { -0.05 } else { self.fraction(value) };
        px_min + frac.clamp(-0.05, 1.05) * (px_max - px_min)
    }

    fn fraction(&self, value: f64) -> f64 {
        if self.log {
            let v = value.max(1e-300).log10();
            let lo = self.min.log10();
            let hi = self.max.log10();
            (v - lo) / (hi - lo)
        } else {
            (value - self.min) / (self.max - self.min)
        }
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if (b - a).abs() < 1e-300 {
        (a - 1.0, a + 1.0)
    } else if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// "Nice numbers" range and step enclosing `[data_min, data_max]`.
fn nice_range(data_min: f64, data_max: f64, target_ticks: usize) -> (f64, f64, f64) {
    if (data_max - data_min).abs() < 1e-15 {
        return (data_min - 1.0, data_max + 1.0, 1.0);
    }
    let range = data_max - data_min;
    let step = nice_step(range / (target_ticks.max(2) - 1) as f64);
    let nice_min = (data_min / step).floor() * step;
    let nice_max = (data_max / step).ceil() * step;
    (nice_min, nice_max, step)
}

fn nice_step(rough: f64) -> f64 {
    let exp = rough.abs().log10().floor();
    let frac = rough / 10.0_f64.powf(exp);
    let nice_frac = if frac <= 1.5 {
        1.0
    } else if frac <= 3.5 {
        2.0
    } else if frac <= 7.5 {
        5.0
    } else {
        10.0
    };
    nice_frac * 10.0_f64.powf(exp)
}

fn format_tick(value: f64, step: f64) -> String {
    let decimals = if step >= 1.0 { 0 } else { (-step.log10().floor()) as usize };
    if decimals == 0 {
        // Avoid "-0"
        let v = if value.abs() < step * 0.01 { 0.0 } else { value };
        format!("{}", v.round() as i64)
    } else {
        format!("{:.prec$}", value, prec = decimals)
    }
}

fn format_value(v: f64) -> String {
    if (v - v.round()).abs() < 1e-9 * v.abs().max(1.0) && v.abs() < 1e15 {
        format!("{}", v.round() as i64)
    } else {
        format!("{v}")
    }
}

fn decade_label(exp: i32) -> String {
    match exp {
        0 => "1".into(),
        1 => "10".into(),
        e => format!("10^{{{e}}}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_linear_encloses_data() {
        let ax = Axis::auto_linear(0.0, 9.3, 6);
        assert!(ax.min <= 0.0 && ax.max >= 9.3);
        assert_eq!(ax.tick_labels.first().map(String::as_str), Some("0"));
    }

    #[test]
    fn fixed_linear_keeps_range() {
        let ax = Axis::linear(0.5, 1.5, 4);
        assert_eq!((ax.min, ax.max), (0.5, 1.5));
        assert_eq!(ax.tick_labels, vec!["0.6", "0.8", "1.0", "1.2", "1.4"]);
        assert!(ax.minor_ticks.iter().all(|m| *m > 0.5 - 1e-12 && *m < 1.5 + 1e-12));
    }

    #[test]
    fn linear_pixel_mapping() {
        let ax = Axis::linear(0.0, 100.0, 5);
        assert!((ax.data_to_pixel(50.0, 0.0, 500.0) - 250.0).abs() < 1e-9);
        // Inverted pixel range (y axis).
        assert!((ax.data_to_pixel(25.0, 400.0, 0.0) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn log_decades_and_minors() {
        let ax = Axis::log(0.1, 1e6);
        assert!(ax.log);
        assert_eq!(ax.tick_positions.len(), 8);
        assert_eq!(ax.tick_labels[0], "10^{-1}");
        assert_eq!(ax.tick_labels[1], "1");
        assert_eq!(ax.tick_labels[2], "10");
        assert_eq!(ax.tick_labels[7], "10^{6}");
        assert!(ax.minor_ticks.contains(&2e5));
        assert!(!ax.minor_ticks.contains(&2e6));
        assert!((ax.data_to_pixel(1e3, 0.0, 700.0) - 400.0).abs() < 1e-9);
    }

    #[test]
    fn log_clamps_nonpositive() {
        let ax = Axis::log(0.0, 1e3);
        assert_eq!(ax.min, 1.0);
        let px = ax.data_to_pixel_clamped(0.0, 100.0, 0.0);
        assert!((px - 105.0).abs() < 1e-9);
    }

    #[test]
    fn narrow_log_range_labels_minors() {
        let ax = Axis::log(2.0, 8.0);
        assert_eq!(ax.tick_labels, vec!["2", "3", "4", "5", "6", "7", "8"]);
        assert!(ax.minor_ticks.is_empty());
    }

    #[test]
    fn custom_ticks_filtered_to_range() {
        let ticks = [20.0, 30.0, 40.0, 100.0, 200.0, 1000.0, 2000.0, 5000.0];
        let ax = Axis::custom(20.0, 3000.0, true, &ticks);
        assert_eq!(ax.tick_labels, vec!["20", "30", "40", "100", "200", "1000", "2000"]);
        assert!(ax.log);
    }

    #[test]
    fn nice_step_values() {
        assert!((nice_step(3.2) - 2.0).abs() < 1e-9);
        assert!((nice_step(0.7) - 0.5).abs() < 1e-9);
        assert!((nice_step(15.0) - 10.0).abs() < 1e-9);
        assert!((nice_step(4.5) - 5.0).abs() < 1e-9);
    }
}
