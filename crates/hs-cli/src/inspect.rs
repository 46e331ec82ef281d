//! `hepstack inspect`: binning consistency across a sample directory.

use anyhow::{Context, Result};
use hs_core::Hist1D;
use hs_core::binning::BinningReport;
use hs_core::sample::{discover_root_files, load_histogram};
use std::fmt::Write as _;
use std::path::Path;

/// Samples shown in detail per role.
const DETAILED: usize = 3;

pub fn run(input_dir: &Path, hist_name: &str, systematic: &str, signal_prefix: &str) -> Result<()> {
    let files = discover_root_files(input_dir)
        .with_context(|| format!("cannot list input directory {}", input_dir.display()))?;

    let mut loaded: Vec<(String, bool, Hist1D)> = Vec::new();
    for file in files {
        match load_histogram(&file.path, systematic, hist_name) {
            Ok(h) => {
                let is_signal = file.file_name.starts_with(signal_prefix);
                loaded.push((file.name, is_signal, h));
            }
            Err(e) => tracing::warn!(file = %file.file_name, error = %e, "skipping"),
        }
    }
    if loaded.is_empty() {
        anyhow::bail!("no histogram '{}' found in {}", hist_name, input_dir.display());
    }

    print!("{}", summary(&loaded, hist_name, systematic));
    Ok(())
}

fn summary(loaded: &[(String, bool, Hist1D)], hist_name: &str, systematic: &str) -> String {
    let report = BinningReport::analyze(loaded.iter().map(|(n, s, h)| (n.as_str(), *s, h)));

    let mut out = String::new();
    let _ = writeln!(out, "histogram: {}/{} in {} files\n", systematic, hist_name, loaded.len());
    let _ = write!(out, "{}", report);

    for (role, signal) in [("signal", true), ("background", false)] {
        let shown: Vec<_> = report.entries.iter().filter(|e| e.is_signal == signal).take(DETAILED).collect();
        if shown.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{} samples (first {}):", role, shown.len());
        for e in shown {
            let _ = writeln!(out, "  {}", e.label);
            let _ = writeln!(out, "    bins: {}  range: [{}, {}]  width: {}", e.n_bins, e.range.0, e.range.1, e.first_width);
            let _ = writeln!(out, "    entries: {}  integral: {:.3}  non-empty bins: {}", e.entries, e.integral, e.non_empty);
            let _ = writeln!(out, "    first low edges: {:?}", e.low_edges);
        }
    }
    out
}
