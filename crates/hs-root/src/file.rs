//! TFile header parsing and the top-level [`RootFile`] interface.

use std::fs;
use std::path::{Path, PathBuf};

use crate::datasource::DataSource;
use crate::decompress::decompress;
use crate::directory::{Directory, DirectoryRecord};
use crate::error::{Result, RootError};
use crate::histogram::{Histogram, HistogramWithFlows};
use crate::key::{Key, KeyInfo};
use crate::objects;
use crate::rbuffer::RBuffer;

const ROOT_MAGIC: &[u8; 4] = b"root";
/// Smallest byte count that can hold a complete file header.
const MIN_FILE_LEN: usize = 64;
/// File versions at or above this value use 64-bit seek pointers.
const LARGE_FILE_VERSION: u32 = 1_000_000;

/// Parsed TFile header.
#[derive(Debug, Clone, Copy)]
struct FileHeader {
    is_large: bool,
    top: DirectoryRecord,
}

/// A ROOT file opened for reading histograms.
pub struct RootFile {
    data: DataSource,
    header: FileHeader,
    path: PathBuf,
}

impl RootFile {
    /// Open and parse a ROOT file from disk using memory mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = fs::File::open(&path)?;
        Self::from_datasource(DataSource::map(&file)?, path)
    }

    /// Parse a ROOT file from bytes already in memory.
    pub fn from_bytes(data: Vec<u8>, path: PathBuf) -> Result<Self> {
        Self::from_datasource(DataSource::Owned(data), path)
    }

    fn from_datasource(data: DataSource, path: PathBuf) -> Result<Self> {
        if data.len() < MIN_FILE_LEN || &data[0..4] != ROOT_MAGIC {
            return Err(RootError::BadMagic);
        }
        let header = parse_header(&data)?;
        Ok(Self { data, header, path })
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file uses 64-bit seek pointers.
    pub fn is_large(&self) -> bool {
        self.header.is_large
    }

    /// List all keys in the top-level directory.
    pub fn list_keys(&self) -> Result<Vec<KeyInfo>> {
        let dir = self.top_directory()?;
        Ok(dir.keys().iter().map(KeyInfo::from).collect())
    }

    /// List the keys of the directory at `dir_path` (e.g. `"Central"`).
    pub fn list_keys_in(&self, dir_path: &str) -> Result<Vec<KeyInfo>> {
        let dir = self.walk(&split_path(dir_path), dir_path)?;
        Ok(dir.keys().iter().map(KeyInfo::from).collect())
    }

    /// Whether `dir_path` resolves to a directory.
    pub fn has_directory(&self, dir_path: &str) -> Result<bool> {
        match self.walk(&split_path(dir_path), dir_path) {
            Ok(_) => Ok(true),
            Err(RootError::KeyNotFound(_)) | Err(RootError::NotADirectory { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Get a histogram by its full path (e.g. `"Central/DileptonMass"`).
    pub fn get_histogram(&self, path: &str) -> Result<Histogram> {
        self.get_histogram_with_flows(path).map(HistogramWithFlows::into_histogram)
    }

    /// Get a histogram by its full path, preserving under/overflow cells.
    pub fn get_histogram_with_flows(&self, path: &str) -> Result<HistogramWithFlows> {
        let parts = split_path(path);
        let Some((name, dirs)) = parts.split_last() else {
            return Err(RootError::KeyNotFound(path.to_string()));
        };
        let dir = self.walk(dirs, path)?;
        let key = dir
            .find_key(name)
            .ok_or_else(|| RootError::KeyNotFound(format!("{} (in path {})", name, path)))?;
        let payload = self.read_key_payload(key)?;
        objects::read_histogram(&payload, &key.class_name)
    }

    fn top_directory(&self) -> Result<Directory> {
        Directory::read_key_list(&self.data, self.header.top, self.header.is_large)
    }

    /// Descend from the top directory through `parts`.
    fn walk(&self, parts: &[&str], full_path: &str) -> Result<Directory> {
        let mut dir = self.top_directory()?;
        for &part in parts {
            let key = dir
                .find_key(part)
                .ok_or_else(|| RootError::KeyNotFound(format!("{} (in path {})", part, full_path)))?;
            if !key.is_directory() {
                return Err(RootError::NotADirectory {
                    name: part.to_string(),
                    class_name: key.class_name.clone(),
                });
            }
            let payload = self.read_key_payload(key)?;
            dir = Directory::read_from_payload(&payload, &self.data, self.header.is_large)?;
        }
        Ok(dir)
    }

    /// Read and, if needed, decompress the object stored behind `key`.
    fn read_key_payload(&self, key: &Key) -> Result<Vec<u8>> {
        let start = key.seek_key as usize;
        let end = start.saturating_add(key.n_bytes as usize);
        let record = self.data.get(start..end).ok_or(RootError::BufferUnderflow {
            offset: start,
            need: key.n_bytes as usize,
            have: self.data.len().saturating_sub(start),
        })?;
        let object = record.get(key.key_len as usize..).ok_or_else(|| {
            RootError::Deserialization(format!("key '{}' shorter than its header", key.name))
        })?;

        if key.is_uncompressed() {
            Ok(object.to_vec())
        } else {
            decompress(object, key.obj_len as usize)
        }
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Parse the file header and the top directory record.
///
/// Small-file layout (version < 1000000; the four pointer fields widen to u64
/// for large files):
/// ```text
/// offset  size  field
///    0      4   magic "root"
///    4      4   fVersion
///    8      4   fBEGIN
///   12      4   fEND
///   16      4   fSeekFree
///   20      4   fNbytesFree
///   24      4   nfree
///   28      4   fNbytesName
///   32      1   fUnits
///   33      4   fCompress
///   37      4   fSeekInfo
///   41      4   fNbytesInfo
///   45     18   fUUID
/// ```
/// The top TDirectory streamer sits at `fBEGIN + fNbytesName`.
fn parse_header(data: &[u8]) -> Result<FileHeader> {
    let mut r = RBuffer::at(data, 4);
    let version = r.read_u32()?;
    let is_large = version >= LARGE_FILE_VERSION;
    let begin = r.read_u32()? as usize;
    let _end = r.read_seek(is_large)?;
    let _seek_free = r.read_seek(is_large)?;
    let _nbytes_free = r.read_u32()?;
    let _nfree = r.read_u32()?;
    let nbytes_name = r.read_u32()? as usize;

    let dir_offset = begin + nbytes_name;
    if dir_offset >= data.len() {
        return Err(RootError::Deserialization("TDirectory offset past end of file".into()));
    }
    let top = DirectoryRecord::read(&mut RBuffer::at(data, dir_offset))?;
    Ok(FileHeader { is_large, top })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{HistogramSpec, RootFileBuilder};
    use approx::assert_relative_eq;

    fn open(builder: RootFileBuilder) -> RootFile {
        RootFile::from_bytes(builder.build(), PathBuf::from("fixture.root")).unwrap()
    }

    fn mass_spec() -> HistogramSpec {
        HistogramSpec::th1d("DileptonMass", 0.0, 100.0, vec![1.0, 2.0, 3.0, 4.0])
            .with_flows(0.5, 7.0)
            .with_sumw2(vec![0.25, 1.0, 4.0, 9.0, 16.0, 49.0])
    }

    #[test]
    fn reject_non_root_file() {
        let result = RootFile::from_bytes(vec![0u8; 100], PathBuf::from("x.root"));
        assert!(matches!(result, Err(RootError::BadMagic)));
    }

    #[test]
    fn reject_too_small() {
        let result = RootFile::from_bytes(b"root".to_vec(), PathBuf::from("x.root"));
        assert!(matches!(result, Err(RootError::BadMagic)));
    }

    #[test]
    fn reads_histogram_inside_systematic_directory() {
        let f = open(RootFileBuilder::new().histogram("Central", mass_spec()));
        let h = f.get_histogram_with_flows("Central/DileptonMass").unwrap();
        assert_eq!(h.histogram.name, "DileptonMass");
        assert_eq!(h.histogram.n_bins, 4);
        assert_eq!(h.histogram.bin_edges, vec![0.0, 25.0, 50.0, 75.0, 100.0]);
        assert_eq!(h.histogram.bin_content, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(h.histogram.sumw2.as_deref(), Some(&[1.0, 4.0, 9.0, 16.0][..]));
        assert_relative_eq!(h.underflow, 0.5);
        assert_relative_eq!(h.overflow, 7.0);
        assert_eq!(h.underflow_sumw2, Some(0.25));
        assert_eq!(h.overflow_sumw2, Some(49.0));
    }

    #[test]
    fn reads_compressed_payloads() {
        let f = open(RootFileBuilder::new().compress(true).histogram("Central", mass_spec()));
        let h = f.get_histogram("Central/DileptonMass").unwrap();
        assert_eq!(h.bin_content, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn reads_th1f_with_variable_edges_at_top_level() {
        let spec = HistogramSpec::th1f_variable("WRMass", vec![0.0, 1000.0, 2500.0], vec![3.5, 1.25]);
        let f = open(RootFileBuilder::new().histogram("", spec));
        let h = f.get_histogram("WRMass").unwrap();
        assert_eq!(h.bin_edges, vec![0.0, 1000.0, 2500.0]);
        assert_eq!(h.bin_content, vec![3.5, 1.25]);
        assert!(h.sumw2.is_none());
    }

    #[test]
    fn lists_keys_per_directory() {
        let f = open(
            RootFileBuilder::new()
                .histogram("Central", mass_spec())
                .histogram("Central", HistogramSpec::th1d("Topjetnum", 0.0, 5.0, vec![1.0; 5]))
                .histogram("JESUp", mass_spec()),
        );
        let top: Vec<String> = f.list_keys().unwrap().into_iter().map(|k| k.name).collect();
        assert_eq!(top, vec!["Central", "JESUp"]);
        let central = f.list_keys_in("Central").unwrap();
        assert_eq!(central.len(), 2);
        assert!(central.iter().all(|k| k.class_name == "TH1D"));
        assert!(f.has_directory("JESUp").unwrap());
        assert!(!f.has_directory("JESDown").unwrap());
    }

    #[test]
    fn missing_histogram_and_non_directory_are_distinguished() {
        let f = open(RootFileBuilder::new().histogram("Central", mass_spec()));
        assert!(matches!(f.get_histogram("Central/Nope"), Err(RootError::KeyNotFound(_))));
        assert!(matches!(f.get_histogram("Missing/DileptonMass"), Err(RootError::KeyNotFound(_))));
        assert!(matches!(
            f.get_histogram("Central/DileptonMass/x"),
            Err(RootError::NotADirectory { .. })
        ));
        assert!(matches!(f.get_histogram(""), Err(RootError::KeyNotFound(_))));
    }

    #[test]
    fn unsupported_class_is_reported() {
        let f = open(RootFileBuilder::new().raw_object("", "cfg", "TObjString", vec![0u8; 16]));
        assert!(matches!(f.get_histogram("cfg"), Err(RootError::UnsupportedClass(c)) if c == "TObjString"));
    }
}
