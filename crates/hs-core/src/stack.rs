//! Grouping Monte Carlo samples into stack components.

use serde::{Deserialize, Serialize};

use crate::hist::Hist1D;
use crate::sample::display_name;

/// Name of the catch-all group.
pub const OTHERS: &str = "Others";

/// One process group of the stack, matched by sample-name prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRule {
    /// Group key.
    pub name: String,
    /// Legend label; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Sample-name prefixes belonging to the group.
    pub prefixes: Vec<String>,
    /// Fill color (`#rrggbb`); defaults to the palette entry for the group's position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl GroupRule {
    /// Rule with the given prefixes and no explicit label or color.
    pub fn new(name: &str, prefixes: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label: None,
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            color: None,
        }
    }

    /// Set the legend label.
    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    /// Set the fill color.
    pub fn color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    fn matches(&self, sample: &str) -> bool {
        self.prefixes.iter().any(|p| sample.starts_with(p.as_str()))
    }
}

/// Index of the first group matching `sample`, if any.
pub fn group_of(rules: &[GroupRule], sample: &str) -> Option<usize> {
    rules.iter().position(|g| g.matches(sample))
}

/// A filled layer of the stack.
#[derive(Debug, Clone)]
pub struct StackComponent {
    /// Group or sample key.
    pub name: String,
    /// Legend label.
    pub label: String,
    /// Fill color.
    pub color: String,
    /// Summed histogram.
    pub hist: Hist1D,
    /// Integral of `hist`.
    pub integral: f64,
    /// Number of samples merged into it.
    pub n_samples: usize,
}

/// Ordered stack of Monte Carlo components.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    /// Components from the bottom of the stack to the top.
    pub components: Vec<StackComponent>,
    /// Component names in legend order.
    pub legend: Vec<String>,
}

impl Stack {
    /// Sum of all components.
    pub fn total(&self) -> Option<Hist1D> {
        let mut iter = self.components.iter();
        let mut total = iter.next()?.hist.clone().with_name("total");
        for c in iter {
            if let Err(e) = total.add(&c.hist) {
                tracing::warn!(component = %c.name, error = %e, "component left out of total");
            }
        }
        Some(total)
    }

    /// Whether the stack has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Components in legend order.
    pub fn legend_components(&self) -> impl Iterator<Item = &StackComponent> {
        self.legend.iter().filter_map(|n| self.components.iter().find(|c| &c.name == n))
    }
}

/// Sort `components` by integral (largest first), giving the legend order,
/// and stack them so the largest ends up on top.
fn order(mut components: Vec<StackComponent>) -> Stack {
    components.sort_by(|a, b| b.integral.total_cmp(&a.integral));
    let legend = components.iter().map(|c| c.name.clone()).collect();
    components.reverse();
    Stack { components, legend }
}

/// Merge samples into the groups of `rules`; unmatched samples go to [`OTHERS`].
///
/// Empty groups are dropped. Groups without an explicit color take
/// `palette[group index]`; [`OTHERS`] uses `others_color`.
pub fn build_grouped<'a>(
    samples: impl IntoIterator<Item = (&'a str, &'a Hist1D)>,
    rules: &[GroupRule],
    palette: &[String],
    others_color: &str,
) -> Stack {
    let mut merged: Vec<Option<(Hist1D, usize)>> = vec![None; rules.len() + 1];
    for (name, hist) in samples {
        let idx = group_of(rules, name).unwrap_or(rules.len());
        if let Some((sum, count)) = &mut merged[idx] {
            match sum.add(hist) {
                Ok(()) => *count += 1,
                Err(e) => tracing::warn!(sample = name, error = %e, "sample not merged into its group"),
            }
        } else {
            merged[idx] = Some((hist.clone(), 1));
        }
    }

    let mut components = Vec::new();
    for (idx, slot) in merged.into_iter().enumerate() {
        let Some((hist, n_samples)) = slot else { continue };
        let (name, label, color) = match rules.get(idx) {
            Some(rule) => (
                rule.name.clone(),
                rule.label.clone().unwrap_or_else(|| rule.name.clone()),
                rule.color.clone().unwrap_or_else(|| palette_color(palette, idx, others_color)),
            ),
            None => (OTHERS.to_string(), OTHERS.to_string(), others_color.to_string()),
        };
        let integral = hist.integral();
        tracing::info!(group = %name, events = integral, samples = n_samples, "stack group");
        components.push(StackComponent {
            hist: hist.with_name(name.clone()),
            name,
            label,
            color,
            integral,
            n_samples,
        });
    }
    order(components)
}

/// Keep the `n` largest samples as individual components and merge the rest
/// into [`OTHERS`], which sits at the bottom of the stack and the end of the legend.
pub fn build_top_n<'a>(
    samples: impl IntoIterator<Item = (&'a str, &'a Hist1D)>,
    n: usize,
    palette: &[String],
    others_color: &str,
    strip_suffixes: &[String],
) -> Stack {
    let mut ranked: Vec<(&str, &Hist1D, f64)> = samples.into_iter().map(|(s, h)| (s, h, h.integral())).collect();
    ranked.sort_by(|a, b| b.2.total_cmp(&a.2));

    let mut top = Vec::new();
    let mut others: Option<(Hist1D, usize)> = None;
    for (i, (name, hist, integral)) in ranked.into_iter().enumerate() {
        if i < n {
            let label = display_name(name, strip_suffixes);
            tracing::info!(sample = name, events = integral, "stack component");
            top.push(StackComponent {
                name: name.to_string(),
                label,
                color: palette_color(palette, i, others_color),
                hist: hist.clone(),
                integral,
                n_samples: 1,
            });
            continue;
        }
        if let Some((sum, count)) = &mut others {
            match sum.add(hist) {
                Ok(()) => *count += 1,
                Err(e) => tracing::warn!(sample = name, error = %e, "sample not merged into Others"),
            }
        } else {
            others = Some((hist.clone().with_name(OTHERS), 1));
        }
    }

    let mut legend: Vec<String> = top.iter().map(|c| c.name.clone()).collect();
    let mut components: Vec<StackComponent> = top.into_iter().rev().collect();
    if let Some((hist, n_samples)) = others {
        let integral = hist.integral();
        tracing::info!(events = integral, samples = n_samples, "stack component Others");
        components.insert(
            0,
            StackComponent {
                name: OTHERS.to_string(),
                label: OTHERS.to_string(),
                color: others_color.to_string(),
                hist,
                integral,
                n_samples,
            },
        );
        legend.push(OTHERS.to_string());
    }
    Stack { components, legend }
}

fn palette_color(palette: &[String], idx: usize, fallback: &str) -> String {
    if palette.is_empty() { fallback.to_string() } else { palette[idx % palette.len()].clone() }
}
