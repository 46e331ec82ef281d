//! Cursor over ROOT's big-endian streamer encoding.

use crate::error::{Result, RootError};

/// `kByteCountMask`: set on the leading u32 when a byte count precedes the version.
const BYTE_COUNT_MASK: u32 = 0x4000_0000;
/// `kIsReferenced`: the TObject carries an extra 2-byte process id.
const IS_REFERENCED: u32 = 1 << 4;

macro_rules! read_be {
    ($(#[$doc:meta] $name:ident -> $ty:ty;)*) => {
        $(
            #[$doc]
            pub fn $name(&mut self) -> Result<$ty> {
                const N: usize = std::mem::size_of::<$ty>();
                let b = self.read_bytes(N)?;
                let mut raw = [0u8; N];
                raw.copy_from_slice(b);
                Ok(<$ty>::from_be_bytes(raw))
            }
        )*
    };
}

/// Header of a streamed object: its class version and, when ROOT wrote a
/// byte count, the absolute position right after the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamerHeader {
    /// Class version.
    pub version: u16,
    /// Absolute end position, if a byte count was present.
    pub end: Option<usize>,
}

/// A read cursor over a byte slice.
pub struct RBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RBuffer<'a> {
    /// Create a new reader over the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Create a reader positioned at `pos`.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    /// Current read position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Total length of the underlying buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Remaining bytes from the current position.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Move to an absolute position. Positions past the end are rejected.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(RootError::BufferUnderflow {
                offset: self.pos,
                need: pos.saturating_sub(self.pos),
                have: self.remaining(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Skip `n` bytes forward.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    read_be! {
        /// Read a big-endian u16.
        read_u16 -> u16;
        /// Read a big-endian i16.
        read_i16 -> i16;
        /// Read a big-endian u32.
        read_u32 -> u32;
        /// Read a big-endian i32.
        read_i32 -> i32;
        /// Read a big-endian u64.
        read_u64 -> u64;
        /// Read a big-endian f32.
        read_f32 -> f32;
        /// Read a big-endian f64.
        read_f64 -> f64;
    }

    /// Read a seek pointer: u64 when `wide`, u32 otherwise.
    pub fn read_seek(&mut self, wide: bool) -> Result<u64> {
        if wide { self.read_u64() } else { Ok(self.read_u32()? as u64) }
    }

    /// Read a ROOT string: one length byte, or 255 followed by a u32 length.
    pub fn read_string(&mut self) -> Result<String> {
        let len = match self.read_u8()? {
            255 => self.read_u32()? as usize,
            n => n as usize,
        };
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a streamer version header.
    ///
    /// The byte count (when flagged by `kByteCountMask`) spans from right after
    /// the leading u32 to the end of the object, version included.
    pub fn read_version(&mut self) -> Result<StreamerHeader> {
        let start = self.pos;
        let raw = self.read_u32()?;
        if raw & BYTE_COUNT_MASK != 0 {
            let count = (raw & !BYTE_COUNT_MASK) as usize;
            let version = self.read_u16()?;
            Ok(StreamerHeader { version, end: Some(start + 4 + count) })
        } else {
            // Old layout: only the 2-byte version was written.
            self.pos = start + 2;
            Ok(StreamerHeader { version: (raw >> 16) as u16, end: None })
        }
    }

    /// Skip a streamed object whose header carries a byte count.
    ///
    /// Objects written without a byte count are assumed to be version-only.
    pub fn skip_object(&mut self) -> Result<()> {
        let header = self.read_version()?;
        if let Some(end) = header.end {
            self.seek(end)?;
        }
        Ok(())
    }

    /// Jump to the end of `header`'s object if it is still ahead of the cursor.
    pub fn finish_object(&mut self, header: StreamerHeader) -> Result<()> {
        if let Some(end) = header.end
            && end > self.pos
        {
            self.seek(end)?;
        }
        Ok(())
    }

    /// Read a `TObject`: version, fUniqueID, fBits (plus pidf when referenced).
    pub fn read_tobject(&mut self) -> Result<(u32, u32)> {
        let _version = self.read_u16()?;
        let unique_id = self.read_u32()?;
        let bits = self.read_u32()?;
        if bits & IS_REFERENCED != 0 {
            self.skip(2)?;
        }
        Ok((unique_id, bits))
    }

    /// Read a `TNamed`: TObject + fName + fTitle.
    pub fn read_tnamed(&mut self) -> Result<(String, String)> {
        let header = self.read_version()?;
        self.read_tobject()?;
        let name = self.read_string()?;
        let title = self.read_string()?;
        self.finish_object(header)?;
        Ok((name, title))
    }

    /// Read a `TArrayD`: u32 length followed by f64 values.
    pub fn read_tarray_f64(&mut self) -> Result<Vec<f64>> {
        let n = self.read_u32()? as usize;
        self.read_array(n, Self::read_f64)
    }

    /// Read a `TArrayF`, widened to f64.
    pub fn read_tarray_f32(&mut self) -> Result<Vec<f64>> {
        let n = self.read_u32()? as usize;
        self.read_array(n, |r| r.read_f32().map(f64::from))
    }

    /// Read a `TArrayI`, widened to f64.
    pub fn read_tarray_i32(&mut self) -> Result<Vec<f64>> {
        let n = self.read_u32()? as usize;
        self.read_array(n, |r| r.read_i32().map(f64::from))
    }

    /// Read a `TArrayS`, widened to f64.
    pub fn read_tarray_i16(&mut self) -> Result<Vec<f64>> {
        let n = self.read_u32()? as usize;
        self.read_array(n, |r| r.read_i16().map(f64::from))
    }

    fn read_array(
        &mut self,
        n: usize,
        mut read_one: impl FnMut(&mut Self) -> Result<f64>,
    ) -> Result<Vec<f64>> {
        // Reject absurd lengths before allocating.
        self.ensure(n)?;
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(read_one(self)?);
        }
        Ok(out)
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if self.pos.saturating_add(n) > self.data.len() {
            return Err(RootError::BufferUnderflow {
                offset: self.pos,
                need: n,
                have: self.remaining(),
            });
        }
        Ok(())
    }
}
