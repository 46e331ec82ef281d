//! # hs-core
//!
//! Histogram algebra and plot assembly for hepstack.
//!
//! The pipeline is: discover and classify sample files ([`sample`]), read one
//! histogram per file into [`Hist1D`], put everything on a common binning
//! ([`hist`], [`binning`]), merge simulated samples into stack components
//! ([`stack`]) and describe the result as a [`StackPlotArtifact`] that a
//! renderer turns into an image ([`plot`]). [`config`] holds the knobs and
//! the built-in analysis presets.
//!
//! ```no_run
//! use hs_core::{AnalysisConfig, plot};
//!
//! let mut cfg = AnalysisConfig::preset("dy").unwrap();
//! cfg.input_dir = "/data/2022EE".into();
//! for p in plot::run(&cfg).unwrap() {
//!     println!("{}: {} stack components", p.output_prefix, p.artifact.stack.len());
//! }
//! ```

#![warn(clippy::all)]

pub mod artifact;
pub mod binning;
pub mod config;
pub mod error;
pub mod hist;
pub mod plot;
pub mod sample;
pub mod stack;

pub use artifact::StackPlotArtifact;
pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use hist::{CommonBinning, Hist1D};
pub use plot::{PlannedPlot, build_plots};
pub use sample::{LoadedSamples, SampleRole, SampleRules};
pub use stack::{GroupRule, Stack};
