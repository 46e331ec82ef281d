//! # hs-root
//!
//! Native ROOT file reader for hepstack.
//!
//! Reads TH1 histograms (`TH1D`, `TH1F`, `TH1I`, `TH1S`) from `.root` files,
//! including histograms nested in `TDirectoryFile` subdirectories such as the
//! per-systematic `Central/` folder written by the analyzers. No ROOT
//! installation is needed. Supports zlib, LZ4, ZSTD, and XZ compression.
//!
//! ## Example
//!
//! ```no_run
//! use hs_root::RootFile;
//!
//! let f = RootFile::open("DYJets.root").unwrap();
//! for key in f.list_keys_in("Central").unwrap() {
//!     println!("{} ({})", key.name, key.class_name);
//! }
//! let h = f.get_histogram("Central/DileptonMass").unwrap();
//! println!("bins: {}, entries: {}", h.n_bins, h.entries);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod datasource;
pub mod decompress;
pub mod directory;
pub mod error;
pub mod file;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
pub mod histogram;
pub mod key;
pub mod objects;
pub mod rbuffer;

pub use error::{Result, RootError};
pub use file::RootFile;
pub use histogram::{Histogram, HistogramWithFlows};
pub use key::KeyInfo;
