use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use approx::assert_relative_eq;
use hs_core::artifact::{LegendKind, RatioStyle};
use hs_core::config::{EdgeMethod, PlotKind};
use hs_core::{AnalysisConfig, StackPlotArtifact, plot};
use hs_root::fixture::{HistogramSpec, RootFileBuilder};

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("hs_core_pipeline_{}_{}_{}", std::process::id(), nanos, name));
    std::fs::create_dir_all(&p).unwrap();
    p
}

fn write(dir: &PathBuf, file: &str, hist: &str, contents: Vec<f64>) {
    RootFileBuilder::new()
        .compress(true)
        .histogram("Central", HistogramSpec::th1d(hist, 0.0, 80.0, contents))
        .write(dir.join(file))
        .unwrap();
}

#[test]
fn dy_preset_end_to_end() {
    let dir = tmp_dir("dy");
    write(&dir, "Muon_E.root", "DileptonMass", vec![10.0, 12.0, 30.0, 28.0, 6.0, 4.0, 1.0, 1.0]);
    write(&dir, "Muon_F.root", "DileptonMass", vec![5.0, 5.0, 10.0, 10.0, 2.0, 2.0, 0.0, 0.0]);
    write(&dir, "Muon_C.root", "DileptonMass", vec![100.0; 8]);
    write(&dir, "DYJets.root", "DileptonMass", vec![12.0, 14.0, 35.0, 33.0, 5.0, 5.0, 0.5, 0.5]);
    write(&dir, "TTLJ_powheg.root", "DileptonMass", vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
    write(&dir, "TTLL_powheg.root", "DileptonMass", vec![1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 0.0, 0.0]);
    write(&dir, "WW_pythia.root", "DileptonMass", vec![0.5, 0.5, 0.5, 0.5, 0.0, 0.0, 0.0, -0.5]);
    write(&dir, "WJets.root", "DileptonMass", vec![0.5; 8]);
    write(&dir, "QCD.root", "MET", vec![1.0; 8]);

    let mut cfg = AnalysisConfig::preset("dy").unwrap();
    cfg.input_dir = dir.clone();
    let plots = plot::run(&cfg).unwrap();
    assert_eq!(plots.len(), 1);
    assert_eq!(plots[0].output_prefix, "DY_DileptonZMass_comparison_2022");

    let a = &plots[0].artifact;
    assert_eq!(a.bin_edges, vec![0.0, 20.0, 40.0, 60.0, 80.0]);

    let data = a.data.as_ref().unwrap();
    assert_eq!(data.y, vec![32.0, 78.0, 14.0, 2.0]);
    assert_relative_eq!(data.yerr_lo[0], 32.0_f64.sqrt());

    assert_eq!(a.stack_order, vec!["DYJets", "TT", "Others", "VV"]);
    let others = a.stack.iter().find(|s| s.name == "Others").unwrap();
    assert_eq!((others.n_samples, others.integral), (1, 4.0));
    let dy = a.stack.iter().find(|s| s.name == "DYJets").unwrap();
    assert_eq!(dy.label, "Drell-Yan");
    assert_eq!(dy.color, "#e42536");
    assert_eq!(dy.y, vec![26.0, 68.0, 10.0, 1.0]);
    let vv = a.stack.iter().find(|s| s.name == "VV").unwrap();
    // Negative simulation bins are kept as they are.
    assert_eq!(vv.y, vec![1.0, 1.0, 0.0, -0.5]);
    assert_eq!(a.total_y, vec![32.0, 76.0, 15.0, 3.5]);

    let ratio = a.ratio.as_ref().unwrap();
    assert_eq!(ratio.style, RatioStyle::Points);
    assert_relative_eq!(ratio.y[1], 78.0 / 76.0);
    assert!(a.ratio_band.is_some());

    assert_eq!(a.legend[0].kind, LegendKind::Marker);
    assert_eq!(a.legend[1].label, "Drell-Yan");
    assert!(a.axes.logy);
    assert_eq!(a.axes.y_range, (0.1, 1e6));
    assert_eq!(a.label.lumi_text, "26.6717 fb^{-1} (13.6 TeV)");
    assert!(a.axes.custom_x_ticks.is_none());

    let json = a.to_json_pretty().unwrap();
    let back = StackPlotArtifact::from_json_str(&json).unwrap();
    assert_eq!(back.stack_order, a.stack_order);
    assert_eq!(back.total_y, a.total_y);
    assert_eq!(back.legend, a.legend);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn signal_preset_per_mass_point() {
    let dir = tmp_dir("signal");
    let spec = |c: Vec<f64>| HistogramSpec::th1d("WRMass_Central", 0.0, 8000.0, c);
    let flat = |v: f64| vec![v; 16];
    let mut sig = vec![0.0; 16];
    sig[8] = 3.0;
    sig[9] = 1.0;
    RootFileBuilder::new().histogram("Central", spec(sig)).write(dir.join("TBChannel_WR4000_N100.root")).unwrap();
    RootFileBuilder::new().histogram("Central", spec(flat(2.0))).write(dir.join("TTLJ_powheg.root")).unwrap();
    RootFileBuilder::new().histogram("Central", spec(flat(1.0))).write(dir.join("TTLL_powheg.root")).unwrap();
    RootFileBuilder::new().histogram("Central", spec(flat(0.5))).write(dir.join("DYJets.root")).unwrap();

    let mut cfg = AnalysisConfig::preset("signal").unwrap();
    assert_eq!(cfg.kind, PlotKind::SignalVsBackground);
    assert_eq!(cfg.binning.edge_method, EdgeMethod::Exact);
    assert!(cfg.stack.per_signal);
    cfg.input_dir = dir.clone();

    let plots = plot::run(&cfg).unwrap();
    assert_eq!(plots.len(), 1);
    assert_eq!(plots[0].output_prefix, "WRMass_Central_WR4000_N100_vs_backgrounds");
    let a = &plots[0].artifact;
    assert_eq!(a.n_bins(), 14);
    assert_eq!(a.axes.x_range, (0.0, 8000.0));
    // 500 GeV input bins; [0, 1000) merges two of them.
    assert_eq!(a.stack_order, vec!["TTLJ_powheg", "TTLL_powheg", "DYJets"]);
    assert_eq!(a.stack[2].y[0], 4.0);
    let signal = a.signal.as_ref().unwrap();
    assert_eq!(signal.label, "WR4000_N100");
    assert_eq!(signal.y[6], 3.0);
    assert_eq!(signal.y[7], 1.0);
    let ratio = a.ratio.as_ref().unwrap();
    assert_relative_eq!(ratio.y[6], 3.0 / 3.5);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn empty_directory_is_an_error() {
    let dir = tmp_dir("empty");
    let mut cfg = AnalysisConfig::preset("ttbar").unwrap();
    cfg.input_dir = dir.clone();
    let err = plot::run(&cfg).unwrap_err();
    assert!(matches!(err, hs_core::Error::EmptyInput(_)), "{err}");
    let _ = std::fs::remove_dir_all(&dir);
}
