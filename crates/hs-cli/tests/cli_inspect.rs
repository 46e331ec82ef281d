use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use hs_root::fixture::{HistogramSpec, RootFileBuilder};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_hepstack"))
}

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("hepstack_cli_{}_{}_{}", std::process::id(), nanos, name));
    std::fs::create_dir_all(&p).unwrap();
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

#[test]
fn inspect_reports_mismatched_binning() {
    let dir = tmp_dir("inspect");
    let files = [("TBChannel_WR2000.root", 400), ("DYJets.root", 200), ("TTLJ_powheg.root", 200)];
    for (name, n) in files {
        RootFileBuilder::new()
            .histogram("Central", HistogramSpec::th1d("WRMass", 0.0, 8000.0, vec![1.0; n]))
            .write(dir.join(name))
            .unwrap();
    }
    // Missing the histogram: skipped with a warning.
    RootFileBuilder::new()
        .histogram("Central", HistogramSpec::th1d("Other", 0.0, 1.0, vec![1.0]))
        .write(dir.join("QCD.root"))
        .unwrap();

    let out = run(&["inspect", "--input-dir", dir.to_string_lossy().as_ref(), "--hist-name", "WRMass"]);
    assert!(out.status.success(), "stderr={}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("[S] TBChannel_WR2000"), "stdout={}", stdout);
    assert!(stdout.contains("same bin count: NO"));
    assert!(stdout.contains("signal bin counts: [400], background bin counts: [200]"));
    assert!(stdout.contains("background samples (first 2)"));
    assert!(!stdout.contains("QCD"));
    assert!(String::from_utf8_lossy(&out.stderr).contains("skipping"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn inspect_without_histograms_fails() {
    let dir = tmp_dir("inspect_empty");
    let out = run(&["inspect", "--input-dir", dir.to_string_lossy().as_ref(), "--hist-name", "WRMass"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("no histogram 'WRMass'"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn presets_list_and_dump() {
    let out = run(&["presets"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    for name in ["dy", "ttbar", "signal", "cr"] {
        assert!(stdout.lines().any(|l| l.starts_with(name)), "missing {} in {}", name, stdout);
    }

    let out = run(&["presets", "--dump", "cr"]);
    assert!(out.status.success());
    let yaml = String::from_utf8_lossy(&out.stdout);
    assert!(yaml.contains("histogram: Topjetnum"), "yaml={}", yaml);

    let out = run(&["presets", "--dump", "nope"]);
    assert!(!out.status.success());
}

#[test]
fn dumped_preset_loads_as_config() {
    let dir = tmp_dir("dump");
    let out = run(&["presets", "--dump", "ttbar"]);
    assert!(out.status.success());
    let cfg = dir.join("ttbar.yaml");
    std::fs::write(&cfg, &out.stdout).unwrap();

    // Config file replaces the preset; the directory is still missing so the run fails late.
    let out = run(&[
        "plot",
        "--preset",
        "dy",
        "--config",
        cfg.to_string_lossy().as_ref(),
        "--input-dir",
        dir.join("none").to_string_lossy().as_ref(),
        "--format",
        "svg",
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("TTbarTransverseMass_v2"));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_package_version() {
    let out = run(&["version"]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), format!("hepstack {}", env!("CARGO_PKG_VERSION")));
}
