//! ROOT compression blocks (ZL = zlib, L4 = LZ4, ZS = ZSTD, XZ = LZMA).
//!
//! A compressed payload is a sequence of blocks, each with a 9-byte header:
//! ```text
//! bytes 0-1:  algorithm tag ("ZL", "XZ", "L4", "ZS")
//! byte  2:    method
//! bytes 3-5:  compressed size   (3-byte little-endian)
//! bytes 6-8:  uncompressed size (3-byte little-endian)
//! ```

use std::io::Read;

use crate::error::{Result, RootError};

/// Size of a compression block header.
pub const BLOCK_HEADER_LEN: usize = 9;

std::thread_local! {
    static ZSTD_DECODER: std::cell::RefCell<ruzstd::decoding::FrameDecoder> =
        std::cell::RefCell::new(ruzstd::decoding::FrameDecoder::new());
}

/// Compression algorithm named by a block tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// `ZL`
    Zlib,
    /// `L4`
    Lz4,
    /// `ZS`
    Zstd,
    /// `XZ`
    Xz,
}

impl Algorithm {
    fn from_tag(tag: &[u8]) -> Result<Self> {
        match tag {
            b"ZL" => Ok(Algorithm::Zlib),
            b"L4" => Ok(Algorithm::Lz4),
            b"ZS" => Ok(Algorithm::Zstd),
            b"XZ" => Ok(Algorithm::Xz),
            other => Err(RootError::Decompression(format!(
                "unsupported compression algorithm: {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    /// Two-byte tag as written in the block header.
    pub fn tag(self) -> &'static [u8; 2] {
        match self {
            Algorithm::Zlib => b"ZL",
            Algorithm::Lz4 => b"L4",
            Algorithm::Zstd => b"ZS",
            Algorithm::Xz => b"XZ",
        }
    }
}

/// Decompress a ROOT-compressed payload into exactly `expected_len` bytes.
pub fn decompress(src: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    let mut offset = 0;

    while out.len() < expected_len && offset + BLOCK_HEADER_LEN <= src.len() {
        let header = &src[offset..offset + BLOCK_HEADER_LEN];
        let algorithm = Algorithm::from_tag(&header[0..2])?;
        let c_size = read_le24(&header[3..6]);
        let u_size = read_le24(&header[6..9]);
        offset += BLOCK_HEADER_LEN;

        let block = src.get(offset..offset + c_size).ok_or_else(|| {
            RootError::Decompression(format!(
                "compressed block claims {} bytes but only {} remain",
                c_size,
                src.len() - offset
            ))
        })?;

        let chunk = match algorithm {
            Algorithm::Zlib => decompress_zlib(block, u_size)?,
            Algorithm::Lz4 => decompress_lz4(block, u_size)?,
            Algorithm::Zstd => decompress_zstd(block, u_size)?,
            Algorithm::Xz => decompress_xz(block, u_size)?,
        };
        if chunk.len() != u_size {
            return Err(RootError::Decompression(format!(
                "{:?} block: expected {} uncompressed bytes, got {}",
                algorithm,
                u_size,
                chunk.len()
            )));
        }

        out.extend_from_slice(&chunk);
        offset += c_size;
    }

    if out.len() != expected_len {
        return Err(RootError::Decompression(format!(
            "total decompressed length {} != expected {}",
            out.len(),
            expected_len
        )));
    }
    Ok(out)
}

/// Write a block header for `algorithm` in front of `compressed`.
pub fn frame_block(algorithm: Algorithm, method: u8, compressed: &[u8], u_len: usize) -> Vec<u8> {
    let mut block = Vec::with_capacity(BLOCK_HEADER_LEN + compressed.len());
    block.extend_from_slice(algorithm.tag());
    block.push(method);
    block.extend_from_slice(&write_le24(compressed.len()));
    block.extend_from_slice(&write_le24(u_len));
    block.extend_from_slice(compressed);
    block
}

fn decompress_zlib(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    flate2::read::ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| RootError::Decompression(format!("zlib: {e}")))?;
    Ok(out)
}

fn decompress_lz4(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    // ROOT prefixes LZ4 payloads with an 8-byte xxhash64 checksum (not verified).
    let payload = data
        .get(8..)
        .ok_or_else(|| RootError::Decompression("LZ4 block too small for checksum header".into()))?;
    lz4_flex::decompress(payload, expected).map_err(|e| RootError::Decompression(format!("lz4: {e}")))
}

fn decompress_zstd(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; expected];
    let written = ZSTD_DECODER
        .with(|cell| cell.borrow_mut().decode_all(data, &mut out))
        .map_err(|e| RootError::Decompression(format!("zstd: {e}")))?;
    out.truncate(written);
    Ok(out)
}

fn decompress_xz(data: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut input = std::io::BufReader::new(data);
    let mut out = Vec::with_capacity(expected);
    lzma_rs::xz_decompress(&mut input, &mut out)
        .map_err(|e| RootError::Decompression(format!("xz: {e}")))?;
    Ok(out)
}

fn read_le24(b: &[u8]) -> usize {
    b[0] as usize | (b[1] as usize) << 8 | (b[2] as usize) << 16
}

fn write_le24(v: usize) -> [u8; 3] {
    [(v & 0xFF) as u8, ((v >> 8) & 0xFF) as u8, ((v >> 16) & 0xFF) as u8]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PAYLOAD: &[u8] = b"TH1D DileptonMass payload: 0000000000 1111111111 0000000000";

    #[test]
    fn le24_round_trip() {
        for v in [0, 16, 256, 70_000, 0xFF_FFFF] {
            assert_eq!(read_le24(&write_le24(v)), v);
        }
    }

    #[test]
    fn zlib_block() {
        let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(PAYLOAD).unwrap();
        let block = frame_block(Algorithm::Zlib, 8, &enc.finish().unwrap(), PAYLOAD.len());
        assert_eq!(decompress(&block, PAYLOAD.len()).unwrap(), PAYLOAD);
    }

    #[test]
    fn lz4_block_skips_checksum() {
        let mut body = vec![0u8; 8];
        body.extend(lz4_flex::compress(PAYLOAD));
        let block = frame_block(Algorithm::Lz4, 1, &body, PAYLOAD.len());
        assert_eq!(decompress(&block, PAYLOAD.len()).unwrap(), PAYLOAD);
    }

    #[test]
    fn zstd_block() {
        let compressed =
            ruzstd::encoding::compress_to_vec(PAYLOAD, ruzstd::encoding::CompressionLevel::Fastest);
        let block = frame_block(Algorithm::Zstd, 4, &compressed, PAYLOAD.len());
        assert_eq!(decompress(&block, PAYLOAD.len()).unwrap(), PAYLOAD);
    }

    #[test]
    fn xz_block() {
        let mut compressed = Vec::new();
        lzma_rs::xz_compress(&mut std::io::BufReader::new(PAYLOAD), &mut compressed).unwrap();
        let block = frame_block(Algorithm::Xz, 5, &compressed, PAYLOAD.len());
        assert_eq!(decompress(&block, PAYLOAD.len()).unwrap(), PAYLOAD);
    }

    #[test]
    fn two_blocks_concatenate() {
        let (a, b) = PAYLOAD.split_at(20);
        let mut src = Vec::new();
        for part in [a, b] {
            let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
            enc.write_all(part).unwrap();
            src.extend(frame_block(Algorithm::Zlib, 8, &enc.finish().unwrap(), part.len()));
        }
        assert_eq!(decompress(&src, PAYLOAD.len()).unwrap(), PAYLOAD);
    }

    #[test]
    fn unknown_tag_and_short_output_are_errors() {
        let block = frame_block(Algorithm::Zlib, 8, &[], 0);
        let mut bad = block.clone();
        bad[0..2].copy_from_slice(b"QQ");
        assert!(matches!(decompress(&bad, 1), Err(RootError::Decompression(_))));
        assert!(decompress(&block, 10).is_err());
    }
}
