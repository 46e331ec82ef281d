//! Sample discovery, classification and loading.
//!
//! Samples are ROOT files named after the physics process they hold
//! (`DYJets.root`, `TTLJ_powheg.root`, `Muon_E.root`, ...). The file name
//! decides whether a file is data, signal, background, or not used at all.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use hs_root::{RootError, RootFile};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hist::{CommonBinning, Hist1D};

/// A file-name pattern: a prefix, or a suffix when written as `*suffix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Pattern {
    /// File name starts with this text.
    Prefix(String),
    /// File name ends with this text.
    Suffix(String),
}

impl Pattern {
    /// Whether `file_name` matches.
    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            Pattern::Prefix(p) => file_name.starts_with(p.as_str()),
            Pattern::Suffix(s) => file_name.ends_with(s.as_str()),
        }
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        match s.strip_prefix('*') {
            Some(rest) => Pattern::Suffix(rest.to_string()),
            None => Pattern::Prefix(s),
        }
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Pattern::from(s.to_string())
    }
}

impl From<Pattern> for String {
    fn from(p: Pattern) -> Self {
        match p {
            Pattern::Prefix(p) => p,
            Pattern::Suffix(s) => format!("*{}", s),
        }
    }
}

fn any_match(patterns: &[Pattern], file_name: &str) -> bool {
    patterns.iter().any(|p| p.matches(file_name))
}

/// What a sample file is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleRole {
    /// Collision data.
    Data,
    /// Signal Monte Carlo.
    Signal,
    /// Background Monte Carlo.
    Background,
}

impl fmt::Display for SampleRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SampleRole::Data => "data",
            SampleRole::Signal => "signal",
            SampleRole::Background => "background",
        })
    }
}

/// File-name rules deciding each file's [`SampleRole`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleRules {
    /// Data streams.
    #[serde(default)]
    pub data: Vec<Pattern>,
    /// Signal samples.
    #[serde(default)]
    pub signal: Vec<Pattern>,
    /// Files to ignore (other data streams, superseded samples, ...).
    #[serde(default)]
    pub exclude: Vec<Pattern>,
}

impl SampleRules {
    /// Role of `file_name`, or `None` when it is excluded.
    ///
    /// Data and signal patterns take precedence over the exclusion list, which
    /// only filters what would otherwise become background.
    pub fn classify(&self, file_name: &str) -> Option<SampleRole> {
        if any_match(&self.data, file_name) {
            Some(SampleRole::Data)
        } else if any_match(&self.signal, file_name) {
            Some(SampleRole::Signal)
        } else if any_match(&self.exclude, file_name) {
            None
        } else {
            Some(SampleRole::Background)
        }
    }
}

/// A discovered `.root` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleFile {
    /// Full path.
    pub path: PathBuf,
    /// File name with extension.
    pub file_name: String,
    /// Sample name (file name without `.root`).
    pub name: String,
}

/// Sample name for a file name: the name without its `.root` extension.
pub fn sample_name(file_name: &str) -> &str {
    file_name.strip_suffix(".root").unwrap_or(file_name)
}

/// List the `.root` files directly inside `dir`, sorted by file name.
pub fn discover_root_files(dir: &Path) -> Result<Vec<SampleFile>> {
    if !dir.is_dir() {
        return Err(Error::FileNotFound(dir.display().to_string()));
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("root") {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let name = sample_name(&file_name).to_string();
        files.push(SampleFile { path, file_name, name });
    }
    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(files)
}

/// Read `systematic/hist_name` from `path`.
///
/// An empty `systematic` reads from the top directory.
pub fn load_histogram(path: &Path, systematic: &str, hist_name: &str) -> Result<Hist1D> {
    let file_str = path.display().to_string();
    if !path.exists() {
        return Err(Error::FileNotFound(file_str));
    }
    let f = RootFile::open(path)?;
    if !systematic.is_empty() && !f.has_directory(systematic)? {
        return Err(Error::DirectoryNotFound { dir: systematic.to_string(), file: file_str });
    }
    let full = if systematic.is_empty() { hist_name.to_string() } else { format!("{}/{}", systematic, hist_name) };
    match f.get_histogram_with_flows(&full) {
        Ok(h) => Hist1D::from_root(h),
        Err(RootError::KeyNotFound(_)) | Err(RootError::NotADirectory { .. }) => Err(Error::HistogramNotFound {
            hist: hist_name.to_string(),
            dir: systematic.to_string(),
            file: file_str,
        }),
        Err(e) => Err(e.into()),
    }
}

/// Options applied while loading samples.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Resample non-discrete histograms onto this binning as they are loaded.
    pub common_binning: Option<CommonBinning>,
}

/// A file that could not be used.
#[derive(Debug, Clone)]
pub struct SkippedSample {
    /// Sample name.
    pub name: String,
    /// Role it would have had.
    pub role: SampleRole,
    /// Why it was skipped.
    pub reason: String,
}

/// Histograms loaded from a sample directory, split by role.
#[derive(Debug, Clone, Default)]
pub struct LoadedSamples {
    /// Data histograms in file-name order.
    pub data: Vec<(String, Hist1D)>,
    /// Signal histograms by sample name.
    pub signal: BTreeMap<String, Hist1D>,
    /// Background histograms by sample name.
    pub background: BTreeMap<String, Hist1D>,
    /// Files that matched a role but failed to load.
    pub skipped: Vec<SkippedSample>,
}

impl LoadedSamples {
    /// Nothing was loaded at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.signal.is_empty() && self.background.is_empty()
    }

    /// Every loaded histogram, mutably.
    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut Hist1D> {
        self.data
            .iter_mut()
            .map(|(_, h)| h)
            .chain(self.signal.values_mut())
            .chain(self.background.values_mut())
    }

    /// Every loaded histogram with its name and role.
    pub fn iter(&self) -> impl Iterator<Item = (&str, SampleRole, &Hist1D)> {
        self.data
            .iter()
            .map(|(n, h)| (n.as_str(), SampleRole::Data, h))
            .chain(self.signal.iter().map(|(n, h)| (n.as_str(), SampleRole::Signal, h)))
            .chain(self.background.iter().map(|(n, h)| (n.as_str(), SampleRole::Background, h)))
    }

    /// Apply `f` to every loaded histogram, dropping those for which it fails.
    pub fn try_map(&mut self, what: &str, f: impl Fn(&Hist1D) -> Result<Hist1D>) {
        let apply = |name: &str, h: &mut Hist1D| -> bool {
            match f(h) {
                Ok(out) => {
                    *h = out;
                    true
                }
                Err(e) => {
                    tracing::warn!(sample = name, error = %e, "{} failed; sample dropped", what);
                    false
                }
            }
        };
        self.data.retain_mut(|(n, h)| apply(n, h));
        self.signal.retain(|n, h| apply(n, h));
        self.background.retain(|n, h| apply(n, h));
    }
}

/// Discover, classify and load every sample in `dir`.
///
/// Per-file failures are logged and skipped; only a missing `dir` is an error.
/// Background failures are logged at debug level since background lists are
/// usually broader than what a given production provides.
pub fn load_samples(
    dir: &Path,
    rules: &SampleRules,
    hist_name: &str,
    systematic: &str,
    options: &LoadOptions,
) -> Result<LoadedSamples> {
    let mut out = LoadedSamples::default();
    for file in discover_root_files(dir)? {
        let Some(role) = rules.classify(&file.file_name) else {
            tracing::debug!(file = %file.file_name, "excluded");
            continue;
        };

        let hist = match load_histogram(&file.path, systematic, hist_name) {
            Ok(h) => h,
            Err(e) => {
                if role == SampleRole::Background {
                    tracing::debug!(sample = %file.name, error = %e, "skipping background sample");
                } else {
                    tracing::warn!(sample = %file.name, %role, error = %e, "skipping sample");
                }
                out.skipped.push(SkippedSample { name: file.name, role, reason: e.to_string() });
                continue;
            }
        };

        let hist = match &options.common_binning {
            Some(target) if hist.should_resample() => match hist.resample_common(target) {
                Ok(h) => h,
                Err(e) => {
                    tracing::warn!(sample = %file.name, error = %e, "common binning failed");
                    out.skipped.push(SkippedSample { name: file.name, role, reason: e.to_string() });
                    continue;
                }
            },
            _ => hist,
        };

        tracing::info!(sample = %file.name, %role, integral = hist.integral(), bins = hist.n_bins(), "loaded");
        match role {
            SampleRole::Data => out.data.push((file.name, hist)),
            SampleRole::Signal => {
                out.signal.insert(file.name, hist);
            }
            SampleRole::Background => {
                out.background.insert(file.name, hist);
            }
        }
    }
    Ok(out)
}

/// Sum the data histograms. Files with mismatched binning are skipped.
pub fn combine_data(data: &[(String, Hist1D)]) -> Option<Hist1D> {
    let mut iter = data.iter();
    let (first_name, first) = iter.next()?;
    let mut total = first.clone().with_name("data");
    tracing::info!(sample = %first_name, events = first.integral(), "data");
    for (name, h) in iter {
        match total.add(h) {
            Ok(()) => tracing::info!(sample = %name, events = h.integral(), "data"),
            Err(e) => tracing::warn!(sample = %name, error = %e, "data file not added"),
        }
    }
    tracing::info!(events = total.integral(), files = data.len(), "total data");
    Some(total)
}

/// Legend name: `name` with every suffix in `strip` removed.
pub fn display_name(name: &str, strip: &[String]) -> String {
    strip.iter().fold(name.to_string(), |acc, s| acc.replace(s.as_str(), ""))
}

/// Short label for a signal mass point.
///
/// `prefix` is stripped when present (`TBChannel_WR4000_N100` → `WR4000_N100`);
/// otherwise, when `from` occurs in the name, the label starts there.
pub fn mass_point_label(name: &str, prefix: Option<&str>, from: Option<&str>) -> String {
    if let Some(rest) = prefix.and_then(|p| name.strip_prefix(p)) {
        return rest.to_string();
    }
    match from.and_then(|f| name.find(f)) {
        Some(idx) => name[idx..].to_string(),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hs_root::fixture::{HistogramSpec, RootFileBuilder};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn tmp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        let dir = std::env::temp_dir().join(format!("hs_core_{}_{}_{}", tag, std::process::id(), nanos));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn dy_rules() -> SampleRules {
        SampleRules {
            data: vec!["Muon_E".into(), "Muon_F.root".into(), "Muon_G.root".into()],
            signal: vec!["DYJets.root".into(), "DYJets10to50.root".into()],
            exclude: vec!["DYJet".into(), "Muon_".into(), "SingleMuon".into(), "*bcToE.root".into()],
        }
    }

    #[test]
    fn classification_precedence() {
        let rules = dy_rules();
        assert_eq!(rules.classify("Muon_E.root"), Some(SampleRole::Data));
        assert_eq!(rules.classify("Muon_F.root"), Some(SampleRole::Data));
        assert_eq!(rules.classify("Muon_C.root"), None);
        assert_eq!(rules.classify("DYJets.root"), Some(SampleRole::Signal));
        assert_eq!(rules.classify("DYJets_MG.root"), None);
        assert_eq!(rules.classify("QCD_bcToE.root"), None);
        assert_eq!(rules.classify("TTLJ_powheg.root"), Some(SampleRole::Background));
    }

    #[test]
    fn patterns_round_trip_through_strings() {
        let p: Pattern = "*bcToE.root".into();
        assert_eq!(p, Pattern::Suffix("bcToE.root".into()));
        assert_eq!(String::from(p), "*bcToE.root");
        let rules: SampleRules = serde_yaml_ng::from_str("data: [Muon_C.root]\nexclude: ['*_MG.root']\n").unwrap();
        assert_eq!(rules.classify("WJets_MG.root"), None);
        assert_eq!(rules.classify("Muon_C.root"), Some(SampleRole::Data));
    }

    #[test]
    fn labels() {
        let strip = vec!["_powheg".to_string(), "_pythia".to_string()];
        assert_eq!(display_name("TTLJ_powheg", &strip), "TTLJ");
        assert_eq!(display_name("QCD_pythia", &strip), "QCD");
        assert_eq!(mass_point_label("TBChannel_WR4000_N100", Some("TBChannel_"), None), "WR4000_N100");
        assert_eq!(mass_point_label("TB_TChannel_WR2000_N500", None, Some("WR")), "WR2000_N500");
        assert_eq!(mass_point_label("Other", Some("TBChannel_"), Some("WR")), "Other");
        assert_eq!(sample_name("Muon_E.root"), "Muon_E");
    }

    #[test]
    fn load_samples_classifies_and_skips_failures() {
        let dir = tmp_dir("load");
        let spec = |c: f64| HistogramSpec::th1d("DileptonMass", 0.0, 4.0, vec![c; 4]);
        RootFileBuilder::new().histogram("Central", spec(1.0)).write(dir.join("Muon_E.root")).unwrap();
        RootFileBuilder::new().histogram("Central", spec(2.0)).write(dir.join("Muon_F.root")).unwrap();
        RootFileBuilder::new().histogram("Central", spec(3.0)).write(dir.join("DYJets.root")).unwrap();
        RootFileBuilder::new().histogram("Central", spec(4.0)).write(dir.join("TTLL_powheg.root")).unwrap();
        RootFileBuilder::new().histogram("JESUp", spec(5.0)).write(dir.join("ST_tW.root")).unwrap();
        RootFileBuilder::new().histogram("Central", spec(6.0)).write(dir.join("Muon_C.root")).unwrap();
        std::fs::write(dir.join("notes.txt"), "x").unwrap();

        let loaded = load_samples(&dir, &dy_rules(), "DileptonMass", "Central", &LoadOptions::default()).unwrap();
        assert_eq!(loaded.data.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(), vec!["Muon_E", "Muon_F"]);
        assert_eq!(loaded.signal.keys().collect::<Vec<_>>(), vec!["DYJets"]);
        assert_eq!(loaded.background.keys().collect::<Vec<_>>(), vec!["TTLL_powheg"]);
        assert_eq!(loaded.skipped.len(), 1);
        assert!(loaded.skipped[0].reason.contains("Directory 'Central' not found"));

        let data = combine_data(&loaded.data).unwrap();
        assert_eq!(data.integral(), 12.0);
        assert_eq!(data.name(), "data");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_histogram_errors_are_specific() {
        let dir = tmp_dir("errors");
        let path = dir.join("TTLJ.root");
        RootFileBuilder::new()
            .histogram("Central", HistogramSpec::th1d("MET", 0.0, 1.0, vec![1.0]))
            .write(&path)
            .unwrap();
        assert!(matches!(load_histogram(&dir.join("nope.root"), "Central", "MET"), Err(Error::FileNotFound(_))));
        assert!(matches!(load_histogram(&path, "JESUp", "MET"), Err(Error::DirectoryNotFound { .. })));
        assert!(matches!(load_histogram(&path, "Central", "HT"), Err(Error::HistogramNotFound { .. })));
        assert_eq!(load_histogram(&path, "Central", "MET").unwrap().integral(), 1.0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let missing = std::env::temp_dir().join("hs_core_definitely_missing_dir");
        assert!(matches!(discover_root_files(&missing), Err(Error::FileNotFound(_))));
    }

    #[test]
    fn common_binning_applies_to_fine_histograms_only() {
        let dir = tmp_dir("common");
        let fine: Vec<f64> = vec![1.0; 100];
        RootFileBuilder::new()
            .histogram("Central", HistogramSpec::th1d("HT", 0.0, 100.0, fine))
            .write(dir.join("TTLJ.root"))
            .unwrap();
        let options = LoadOptions { common_binning: Some(CommonBinning::uniform(10, 0.0, 100.0)) };
        let loaded = load_samples(&dir, &SampleRules::default(), "HT", "Central", &options).unwrap();
        let h = &loaded.background["TTLJ"];
        assert_eq!(h.n_bins(), 10);
        assert_eq!(h.content(1), 10.0);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
