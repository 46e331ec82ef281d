//! ROOT object deserialization dispatch.

mod th1;

use crate::error::{Result, RootError};
use crate::histogram::HistogramWithFlows;

/// Classes [`read_histogram`] understands.
pub const SUPPORTED_HISTOGRAM_CLASSES: &[&str] = &["TH1D", "TH1F", "TH1I", "TH1S"];

/// Read a histogram (with flows) from a decompressed payload, given its class name.
pub fn read_histogram(payload: &[u8], class_name: &str) -> Result<HistogramWithFlows> {
    let cell_type = match class_name {
        "TH1D" => th1::CellType::F64,
        "TH1F" => th1::CellType::F32,
        "TH1I" => th1::CellType::I32,
        "TH1S" => th1::CellType::I16,
        _ => return Err(RootError::UnsupportedClass(class_name.to_string())),
    };
    th1::read_th1(payload, class_name, cell_type)
}
