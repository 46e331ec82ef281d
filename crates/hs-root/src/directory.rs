//! TDirectory key lists and navigation.

use crate::error::Result;
use crate::key::{Key, LARGE_KEY_VERSION};
use crate::rbuffer::RBuffer;

/// Location of a directory's key list, as stored in a TDirectory streamer.
#[derive(Debug, Clone, Copy)]
pub struct DirectoryRecord {
    /// Absolute position of the key list.
    pub seek_keys: u64,
    /// Size of the key list record.
    pub nbytes_keys: u32,
}

impl DirectoryRecord {
    /// Parse a TDirectory streamer at the cursor.
    ///
    /// ```text
    /// version u16, datime_c u32, datime_m u32, nbytes_keys u32, nbytes_name u32,
    /// seek_dir, seek_parent, seek_keys   (u64 when version > 1000, else u32)
    /// ```
    pub fn read(r: &mut RBuffer) -> Result<Self> {
        let version = r.read_u16()?;
        let _datime_c = r.read_u32()?;
        let _datime_m = r.read_u32()?;
        let nbytes_keys = r.read_u32()?;
        let _nbytes_name = r.read_u32()?;
        let wide = version > LARGE_KEY_VERSION;
        let _seek_dir = r.read_seek(wide)?;
        let _seek_parent = r.read_seek(wide)?;
        let seek_keys = r.read_seek(wide)?;
        Ok(Self { seek_keys, nbytes_keys })
    }
}

/// The keys of one directory, in on-disk order.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    keys: Vec<Key>,
}

impl Directory {
    /// Read the key list stored at `record.seek_keys`.
    ///
    /// The list is itself a TKey, followed by a u32 `nkeys` and that many
    /// key headers.
    pub fn read_key_list(file_data: &[u8], record: DirectoryRecord, large_file: bool) -> Result<Self> {
        if record.seek_keys == 0 {
            return Ok(Self::default());
        }
        let mut r = RBuffer::new(file_data);
        r.seek(record.seek_keys as usize)?;

        let _list_key = Key::read(&mut r, large_file)?;
        let nkeys = r.read_u32()? as usize;

        let mut keys = Vec::with_capacity(nkeys.min(r.remaining()));
        for _ in 0..nkeys {
            keys.push(Key::read(&mut r, large_file)?);
        }
        Ok(Directory { keys })
    }

    /// Read a subdirectory from the payload of its `TDirectoryFile` key.
    pub fn read_from_payload(payload: &[u8], file_data: &[u8], large_file: bool) -> Result<Self> {
        let record = DirectoryRecord::read(&mut RBuffer::new(payload))?;
        Self::read_key_list(file_data, record, large_file)
    }

    /// All keys, in on-disk order.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Find a key by name. With several cycles, the highest one wins.
    pub fn find_key(&self, name: &str) -> Option<&Key> {
        self.keys.iter().filter(|k| k.name == name).max_by_key(|k| k.cycle)
    }
}
