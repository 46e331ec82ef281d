//! TH1D / TH1F / TH1I / TH1S deserialization.
//!
//! ```text
//! TH1x                       (version + byte count)
//!   ├─ TH1                   (version + byte count)
//!   │    ├─ TNamed           name, title
//!   │    ├─ TAttLine / TAttFill / TAttMarker   (skipped via byte count)
//!   │    ├─ fNcells          i32
//!   │    ├─ fXaxis           TAxis: TNamed, TAttAxis, fNbins, fXmin, fXmax, fXbins
//!   │    ├─ fYaxis, fZaxis   (skipped)
//!   │    ├─ fBarOffset, fBarWidth (i16), fEntries, fTsumw, fTsumw2, fTsumwx, fTsumwx2
//!   │    ├─ fMaximum, fMinimum (v >= 2), fNormFactor (v >= 3)
//!   │    ├─ fContour, fSumw2 TArrayD
//!   │    └─ fOption, fFunctions, fBuffer, ...  (skipped to the TH1 end)
//!   └─ TArrayD/F/I/S         cell contents, under/overflow included
//! ```

use crate::error::{Result, RootError};
use crate::histogram::{Histogram, HistogramWithFlows};
use crate::rbuffer::RBuffer;

/// Element type of the trailing cell array.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CellType {
    F64,
    F32,
    I32,
    I16,
}

struct AxisInfo {
    n_bins: usize,
    x_min: f64,
    x_max: f64,
    /// Variable-width edges; empty for uniform binning.
    edges: Vec<f64>,
}

struct Th1Base {
    name: String,
    title: String,
    n_cells: usize,
    axis: AxisInfo,
    entries: f64,
    sumw2: Vec<f64>,
}

pub(crate) fn read_th1(data: &[u8], class_name: &str, cell_type: CellType) -> Result<HistogramWithFlows> {
    let mut r = RBuffer::new(data);

    let outer = r.read_version()?;
    if outer.version < 1 {
        return Err(RootError::Deserialization(format!(
            "unsupported {} version: {}",
            class_name, outer.version
        )));
    }

    let base = read_th1_base(&mut r)?;

    let cells = match cell_type {
        CellType::F64 => r.read_tarray_f64()?,
        CellType::F32 => r.read_tarray_f32()?,
        CellType::I32 => r.read_tarray_i32()?,
        CellType::I16 => r.read_tarray_i16()?,
    };
    if cells.len() != base.n_cells {
        return Err(RootError::Deserialization(format!(
            "{} array size {} != fNcells {}",
            class_name,
            cells.len(),
            base.n_cells
        )));
    }

    build_histogram(base, &cells)
}

fn read_th1_base(r: &mut RBuffer) -> Result<Th1Base> {
    let th1 = r.read_version()?;

    let (name, title) = r.read_tnamed()?;

    // TAttLine, TAttFill, TAttMarker
    for _ in 0..3 {
        r.skip_object()?;
    }

    let n_cells = r.read_i32()?;
    if n_cells < 2 {
        return Err(RootError::Deserialization(format!("invalid fNcells: {}", n_cells)));
    }

    let axis = read_taxis(r)?;
    r.skip_object()?; // fYaxis
    r.skip_object()?; // fZaxis

    let _bar_offset = r.read_i16()?;
    let _bar_width = r.read_i16()?;
    let entries = r.read_f64()?;
    // fTsumw, fTsumw2, fTsumwx, fTsumwx2
    r.skip(4 * 8)?;
    if th1.version >= 2 {
        r.skip(2 * 8)?; // fMaximum, fMinimum
    }
    if th1.version >= 3 {
        r.skip(8)?; // fNormFactor
    }

    let _contour = r.read_tarray_f64()?;
    let sumw2 = r.read_tarray_f64()?;

    if th1.end.is_some() {
        r.finish_object(th1)?;
    } else {
        let _option = r.read_string()?;
        r.skip_object()?; // fFunctions
    }

    Ok(Th1Base { name, title, n_cells: n_cells as usize, axis, entries, sumw2 })
}

fn read_taxis(r: &mut RBuffer) -> Result<AxisInfo> {
    let header = r.read_version()?;

    let (_name, _title) = r.read_tnamed()?;
    r.skip_object()?; // TAttAxis

    let n_bins = r.read_i32()?;
    if n_bins < 1 {
        return Err(RootError::Deserialization(format!("invalid axis fNbins: {}", n_bins)));
    }
    let x_min = r.read_f64()?;
    let x_max = r.read_f64()?;
    let edges = r.read_tarray_f64()?;

    r.finish_object(header)?;

    Ok(AxisInfo { n_bins: n_bins as usize, x_min, x_max, edges })
}

fn build_histogram(base: Th1Base, cells: &[f64]) -> Result<HistogramWithFlows> {
    let n_bins = base.axis.n_bins;
    if base.n_cells != n_bins + 2 {
        return Err(RootError::Deserialization(format!(
            "fNcells {} does not match {} bins + 2 flows",
            base.n_cells, n_bins
        )));
    }

    let bin_edges = if base.axis.edges.is_empty() {
        let width = (base.axis.x_max - base.axis.x_min) / n_bins as f64;
        (0..=n_bins).map(|i| base.axis.x_min + i as f64 * width).collect()
    } else if base.axis.edges.len() == n_bins + 1 {
        base.axis.edges
    } else {
        return Err(RootError::Deserialization(format!(
            "fXbins has {} edges for {} bins",
            base.axis.edges.len(),
            n_bins
        )));
    };

    let full_sumw2 = base.sumw2.len() == base.n_cells;
    let sumw2 = match base.sumw2.len() {
        0 => None,
        _ if full_sumw2 => Some(base.sumw2[1..=n_bins].to_vec()),
        _ => Some(base.sumw2.clone()),
    };
    let (underflow_sumw2, overflow_sumw2) = if full_sumw2 {
        (Some(base.sumw2[0]), Some(base.sumw2[n_bins + 1]))
    } else {
        (None, None)
    };

    Ok(HistogramWithFlows {
        histogram: Histogram {
            name: base.name,
            title: base.title,
            n_bins,
            x_min: base.axis.x_min,
            x_max: base.axis.x_max,
            bin_edges,
            bin_content: cells[1..=n_bins].to_vec(),
            sumw2,
            entries: base.entries,
        },
        underflow: cells[0],
        overflow: cells[n_bins + 1],
        underflow_sumw2,
        overflow_sumw2,
    })
}
