//! TKey records: the headers ROOT uses to locate objects in a file.

use crate::error::Result;
use crate::rbuffer::RBuffer;

/// Key versions above this value store 64-bit seek pointers.
pub(crate) const LARGE_KEY_VERSION: u16 = 1000;

/// A parsed TKey header.
#[derive(Debug, Clone)]
pub struct Key {
    /// Bytes on disk: key header plus (possibly compressed) object.
    pub n_bytes: u32,
    /// Key class version.
    pub version: u16,
    /// Uncompressed object length.
    pub obj_len: u32,
    /// Length of the key header itself.
    pub key_len: u16,
    /// Cycle number within the directory.
    pub cycle: u16,
    /// Absolute position of this key in the file.
    pub seek_key: u64,
    /// Class name of the stored object.
    pub class_name: String,
    /// Object name.
    pub name: String,
    /// Object title.
    pub title: String,
}

/// Public description of a key, as returned by `RootFile::list_keys`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Object name.
    pub name: String,
    /// Object class name (e.g. "TH1D", "TDirectoryFile").
    pub class_name: String,
    /// Cycle number.
    pub cycle: u16,
}

impl From<&Key> for KeyInfo {
    fn from(key: &Key) -> Self {
        Self { name: key.name.clone(), class_name: key.class_name.clone(), cycle: key.cycle }
    }
}

impl Key {
    /// Read a TKey header at the cursor.
    ///
    /// `large_file` forces 64-bit seeks even for small key versions.
    pub fn read(r: &mut RBuffer, large_file: bool) -> Result<Self> {
        let n_bytes = r.read_u32()?;
        let version = r.read_u16()?;
        let obj_len = r.read_u32()?;
        let _datime = r.read_u32()?;
        let key_len = r.read_u16()?;
        let cycle = r.read_u16()?;

        let wide = large_file || version > LARGE_KEY_VERSION;
        let seek_key = r.read_seek(wide)?;
        let _seek_pdir = r.read_seek(wide)?;

        let class_name = r.read_string()?;
        let name = r.read_string()?;
        let title = r.read_string()?;

        Ok(Key { n_bytes, version, obj_len, key_len, cycle, seek_key, class_name, name, title })
    }

    /// Whether this key holds a directory.
    pub fn is_directory(&self) -> bool {
        matches!(self.class_name.as_str(), "TDirectoryFile" | "TDirectory")
    }

    /// Whether the payload is stored without compression.
    pub fn is_uncompressed(&self) -> bool {
        self.obj_len as usize == (self.n_bytes as usize).saturating_sub(self.key_len as usize)
    }
}
