//! Byte storage behind a [`crate::RootFile`].

use std::fs::File;
use std::ops::Deref;

/// Backing storage for a ROOT file: either read-only mapped or owned.
pub enum DataSource {
    /// Bytes handed in by the caller (`RootFile::from_bytes`, test fixtures).
    Owned(Vec<u8>),
    /// Memory-mapped file; only the pages behind visited keys are touched.
    Mmap(memmap2::Mmap),
}

impl DataSource {
    /// Map `file` read-only.
    pub fn map(file: &File) -> std::io::Result<Self> {
        // SAFETY: the mapping is read-only. Histogram files are produced once by
        // the analyzers and not rewritten while plots are made from them.
        let mmap = unsafe { memmap2::Mmap::map(file)? };
        Ok(DataSource::Mmap(mmap))
    }

    /// Whether the bytes come from a memory map.
    pub fn is_mapped(&self) -> bool {
        matches!(self, DataSource::Mmap(_))
    }
}

impl Deref for DataSource {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        match self {
            DataSource::Owned(v) => v,
            DataSource::Mmap(m) => m,
        }
    }
}
