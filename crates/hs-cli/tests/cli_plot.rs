use std::path::{Path, PathBuf};
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

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(path).unwrap())
        .unwrap_or_else(|e| panic!("invalid JSON at {}: {}", path.display(), e))
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

/// A small ttbar-like sample directory: one data stream, signal, two backgrounds
/// and one excluded sample, 20 bins over [0, 2000].
fn write_samples(dir: &Path) {
    let shape = |scale: f64| -> Vec<f64> { (0..20).map(|i| scale * (20 - i) as f64).collect() };
    let files = [
        ("Muon_C.root", shape(3.0)),
        ("TTLJ_powheg.root", shape(2.0)),
        ("TTLL_powheg.root", shape(0.6)),
        ("DYJets.root", shape(0.3)),
        ("WJets.root", shape(0.2)),
    ];
    for (name, contents) in files {
        RootFileBuilder::new()
            .compress(true)
            .histogram("Central", HistogramSpec::th1d("TTbarTransverseMass_v2", 0.0, 2000.0, contents))
            .write(dir.join(name))
            .unwrap();
    }
}

#[test]
fn plot_writes_requested_formats_and_artifact() {
    let dir = tmp_dir("plot");
    write_samples(&dir);
    let prefix = dir.join("out").join("ttbar");

    let out = run(&[
        "plot",
        "--preset",
        "ttbar",
        "--input-dir",
        dir.to_string_lossy().as_ref(),
        "--output",
        prefix.to_string_lossy().as_ref(),
        "--format",
        "svg,png",
        "--emit-json",
    ]);
    assert!(out.status.success(), "plot should succeed, stderr={}", stderr(&out));

    let svg = std::fs::read_to_string(prefix.with_extension("svg")).unwrap();
    assert!(svg.starts_with("<svg"));
    let png = std::fs::read(prefix.with_extension("png")).unwrap();
    assert_eq!(&png[..4], b"\x89PNG");

    let json = read_json(&prefix.with_extension("json"));
    assert_eq!(json["schema_version"], "hepstack_stack_plot_v1");
    assert_eq!(json["bin_edges"].as_array().unwrap().len(), 5, "rebin 5 of 20 bins");
    let stack = json["stack"].as_array().unwrap();
    assert!(!stack.is_empty());
    assert!(json["data"].is_object());
    assert!(json["ratio"].is_object());
    let err = stderr(&out);
    assert!(err.contains("loaded"), "info logs expected, stderr={}", err);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn flags_override_the_preset() {
    let dir = tmp_dir("flags");
    write_samples(&dir);
    let prefix = dir.join("custom");

    let out = run(&[
        "plot",
        "--preset",
        "ttbar",
        "--input-dir",
        dir.to_string_lossy().as_ref(),
        "--output",
        prefix.to_string_lossy().as_ref(),
        "--bin-edges",
        "1000,0,500,2000",
        "--logy",
        "--ymax",
        "5000",
        "--format",
        "svg",
        "--emit-json",
    ]);
    assert!(out.status.success(), "stderr={}", stderr(&out));

    let json = read_json(&prefix.with_extension("json"));
    let edges: Vec<f64> = json["bin_edges"].as_array().unwrap().iter().map(|v| v.as_f64().unwrap()).collect();
    assert_eq!(edges, vec![0.0, 500.0, 1000.0, 2000.0]);
    assert_eq!(json["axes"]["logy"], true);
    assert_eq!(json["axes"]["y_range"][1].as_f64(), Some(5000.0));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn render_saved_artifact() {
    let dir = tmp_dir("render");
    write_samples(&dir);
    let prefix = dir.join("plot");
    let out = run(&[
        "plot",
        "--preset",
        "ttbar",
        "--input-dir",
        dir.to_string_lossy().as_ref(),
        "--output",
        prefix.to_string_lossy().as_ref(),
        "--format",
        "svg",
        "--emit-json",
        "--log-level",
        "warn",
    ]);
    assert!(out.status.success(), "stderr={}", stderr(&out));

    let style = dir.join("style.yaml");
    std::fs::write(&style, "theme: minimal\noutput:\n  dpi: 72\n").unwrap();
    let pdf = dir.join("again.pdf");
    let out = run(&[
        "render",
        "--artifact",
        prefix.with_extension("json").to_string_lossy().as_ref(),
        "--output",
        pdf.to_string_lossy().as_ref(),
        "--style",
        style.to_string_lossy().as_ref(),
    ]);
    assert!(out.status.success(), "render should succeed, stderr={}", stderr(&out));
    assert!(std::fs::read(&pdf).unwrap().starts_with(b"%PDF-"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_input_dir_fails() {
    let dir = tmp_dir("missing");
    let out = run(&[
        "plot",
        "--preset",
        "dy",
        "--input-dir",
        dir.join("nope").to_string_lossy().as_ref(),
        "--output",
        dir.join("x").to_string_lossy().as_ref(),
        "--format",
        "svg",
    ]);
    assert!(!out.status.success());
    assert!(!dir.join("x.svg").exists());
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn no_loadable_histograms_fails() {
    let dir = tmp_dir("empty");
    RootFileBuilder::new()
        .histogram("Central", HistogramSpec::th1d("Other", 0.0, 1.0, vec![1.0]))
        .write(dir.join("Muon_C.root"))
        .unwrap();
    let out = run(&["plot", "--preset", "ttbar", "--input-dir", dir.to_string_lossy().as_ref(), "--format", "svg"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("Error"), "stderr={}", stderr(&out));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_flags_fail() {
    let out = run(&["plot", "--preset", "ttbar", "--bin-edges", "0,abc,10"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("'abc' is not a number"), "stderr={}", stderr(&out));

    let out = run(&["plot", "--preset", "nosuch"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("unknown preset"), "stderr={}", stderr(&out));

    let out = run(&["plot", "--preset", "ttbar", "--format", "bmp"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("unsupported format"), "stderr={}", stderr(&out));
}
