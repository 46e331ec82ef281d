//! Minimal ROOT writer for synthesizing test fixtures.
//!
//! Produces small-format files (32-bit seeks) with TH1D/TH1F objects laid out
//! in nested `TDirectoryFile`s, optionally zlib-compressed. The output carries
//! exactly the records [`crate::RootFile`] reads; it has no streamer info and
//! is not meant to be opened by ROOT itself.

use std::io::Write;
use std::path::Path;

use crate::decompress::{Algorithm, frame_block};

const BEGIN: usize = 100;
const FILE_VERSION: u32 = 62_206;
const KEY_VERSION: u16 = 4;
const DIR_VERSION: u16 = 5;
const BYTE_COUNT_MASK: u32 = 0x4000_0000;
/// kNotDeleted | kIsOnHeap
const TOBJECT_BITS: u32 = 0x0300_0000;

/// Description of one TH1 to write.
#[derive(Debug, Clone)]
pub struct HistogramSpec {
    class_name: &'static str,
    name: String,
    title: String,
    x_min: f64,
    x_max: f64,
    edges: Vec<f64>,
    contents: Vec<f64>,
    underflow: f64,
    overflow: f64,
    sumw2: Vec<f64>,
    entries: Option<f64>,
}

impl HistogramSpec {
    fn new(class_name: &'static str, name: &str, x_min: f64, x_max: f64, edges: Vec<f64>, contents: Vec<f64>) -> Self {
        Self {
            class_name,
            name: name.to_string(),
            title: name.to_string(),
            x_min,
            x_max,
            edges,
            contents,
            underflow: 0.0,
            overflow: 0.0,
            sumw2: Vec::new(),
            entries: None,
        }
    }

    /// Uniformly binned TH1D over `[x_min, x_max)`.
    pub fn th1d(name: &str, x_min: f64, x_max: f64, contents: Vec<f64>) -> Self {
        Self::new("TH1D", name, x_min, x_max, Vec::new(), contents)
    }

    /// TH1D with explicit (variable) bin edges.
    pub fn th1d_variable(name: &str, edges: Vec<f64>, contents: Vec<f64>) -> Self {
        let (lo, hi) = edge_range(&edges);
        Self::new("TH1D", name, lo, hi, edges, contents)
    }

    /// Uniformly binned TH1F.
    pub fn th1f(name: &str, x_min: f64, x_max: f64, contents: Vec<f64>) -> Self {
        Self::new("TH1F", name, x_min, x_max, Vec::new(), contents)
    }

    /// TH1F with explicit bin edges.
    pub fn th1f_variable(name: &str, edges: Vec<f64>, contents: Vec<f64>) -> Self {
        let (lo, hi) = edge_range(&edges);
        Self::new("TH1F", name, lo, hi, edges, contents)
    }

    /// Set underflow and overflow contents.
    pub fn with_flows(mut self, underflow: f64, overflow: f64) -> Self {
        self.underflow = underflow;
        self.overflow = overflow;
        self
    }

    /// Set `fSumw2`, normally `n_bins + 2` values including flows.
    pub fn with_sumw2(mut self, sumw2: Vec<f64>) -> Self {
        self.sumw2 = sumw2;
        self
    }

    /// Set the histogram title.
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Set `fEntries` (defaults to the sum of in-range contents).
    pub fn with_entries(mut self, entries: f64) -> Self {
        self.entries = Some(entries);
        self
    }

    fn payload(&self) -> Vec<u8> {
        let n = self.contents.len();
        let mut w = WBuffer::default();

        let outer = w.begin_object(3);
        let th1 = w.begin_object(8);
        w.tnamed(&self.name, &self.title);
        // TAttLine, TAttFill, TAttMarker
        let o = w.begin_object(2);
        w.i16(602);
        w.i16(1);
        w.i16(1);
        w.end_object(o);
        let o = w.begin_object(2);
        w.i16(0);
        w.i16(1001);
        w.end_object(o);
        let o = w.begin_object(2);
        w.i16(1);
        w.i16(1);
        w.f32(1.0);
        w.end_object(o);

        w.i32((n + 2) as i32);
        w.taxis("xaxis", n, self.x_min, self.x_max, &self.edges);
        w.taxis("yaxis", 1, 0.0, 1.0, &[]);
        w.taxis("zaxis", 1, 0.0, 1.0, &[]);

        let sum: f64 = self.contents.iter().sum();
        w.i16(0);
        w.i16(1000);
        w.f64(self.entries.unwrap_or(sum));
        for v in [sum, 0.0, 0.0, 0.0] {
            w.f64(v);
        }
        w.f64(-1111.0);
        w.f64(-1111.0);
        w.f64(0.0);
        w.tarray_f64(&[]);
        w.tarray_f64(&self.sumw2);
        w.string("");
        // fFunctions: empty TList
        let list = w.begin_object(5);
        w.tobject();
        w.string("");
        w.i32(0);
        w.end_object(list);
        w.i32(0); // fBufferSize
        w.i32(0); // fBinStatErrOpt
        w.i32(2); // fStatOverflows
        w.end_object(th1);

        let mut cells = Vec::with_capacity(n + 2);
        cells.push(self.underflow);
        cells.extend_from_slice(&self.contents);
        cells.push(self.overflow);
        if self.class_name == "TH1F" {
            w.u32(cells.len() as u32);
            for v in cells {
                w.f32(v as f32);
            }
        } else {
            w.tarray_f64(&cells);
        }
        w.end_object(outer);
        w.bytes
    }
}

fn edge_range(edges: &[f64]) -> (f64, f64) {
    (edges.first().copied().unwrap_or(0.0), edges.last().copied().unwrap_or(1.0))
}

#[derive(Debug, Clone)]
struct Object {
    name: String,
    class_name: String,
    title: String,
    payload: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
struct DirNode {
    name: String,
    subdirs: Vec<DirNode>,
    objects: Vec<Object>,
}

impl DirNode {
    fn descend(&mut self, path: &str) -> &mut DirNode {
        let mut node = self;
        for part in path.split('/').filter(|s| !s.is_empty()) {
            let idx = match node.subdirs.iter().position(|d| d.name == part) {
                Some(i) => i,
                None => {
                    node.subdirs.push(DirNode { name: part.to_string(), ..Default::default() });
                    node.subdirs.len() - 1
                }
            };
            node = &mut node.subdirs[idx];
        }
        node
    }
}

/// Builder for an in-memory ROOT file.
#[derive(Debug, Clone, Default)]
pub struct RootFileBuilder {
    root: DirNode,
    compress: bool,
}

impl RootFileBuilder {
    /// Empty file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Zlib-compress object payloads.
    pub fn compress(mut self, on: bool) -> Self {
        self.compress = on;
        self
    }

    /// Add a histogram under `dir` (`""` for the top directory, `"a/b"` nests).
    pub fn histogram(mut self, dir: &str, spec: HistogramSpec) -> Self {
        let object = Object {
            name: spec.name.clone(),
            class_name: spec.class_name.to_string(),
            title: spec.title.clone(),
            payload: spec.payload(),
        };
        self.root.descend(dir).objects.push(object);
        self
    }

    /// Add an arbitrary object payload under `dir`.
    pub fn raw_object(mut self, dir: &str, name: &str, class_name: &str, payload: Vec<u8>) -> Self {
        let object = Object {
            name: name.to_string(),
            class_name: class_name.to_string(),
            title: String::new(),
            payload,
        };
        self.root.descend(dir).objects.push(object);
        self
    }

    /// Serialize the file.
    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0u8; BEGIN];

        let name_record = {
            let mut w = WBuffer::default();
            w.tnamed("fixture.root", "");
            let header = key_header(0, 0, BEGIN as u64, 0, "TFile", "fixture.root", "");
            let mut rec = header;
            rec.extend(w.bytes);
            rec
        };
        let nbytes_name = name_record.len();
        out.extend_from_slice(&name_record);

        let top_dir_pos = out.len();
        out.extend_from_slice(&[0u8; DIR_RECORD_LEN]);

        let (seek_keys, nbytes_keys) = self.write_directory(&mut out, &self.root, BEGIN as u64);

        let top_record = dir_record(nbytes_keys, nbytes_name as u32, BEGIN as u64, 0, seek_keys);
        out[top_dir_pos..top_dir_pos + DIR_RECORD_LEN].copy_from_slice(&top_record);

        let mut h = WBuffer::default();
        h.bytes.extend_from_slice(b"root");
        h.u32(FILE_VERSION);
        h.u32(BEGIN as u32);
        h.u32(out.len() as u32); // fEND
        h.u32(0); // fSeekFree
        h.u32(0); // fNbytesFree
        h.u32(0); // nfree
        h.u32(nbytes_name as u32);
        h.u8(4); // fUnits
        h.u32(if self.compress { 101 } else { 0 });
        h.u32(0); // fSeekInfo
        h.u32(0); // fNbytesInfo
        h.bytes.extend_from_slice(&[0u8; 18]);
        out[..h.bytes.len()].copy_from_slice(&h.bytes);
        out
    }

    /// Serialize the file to `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let mut f = std::fs::File::create(path)?;
        f.write_all(&self.build())
    }

    /// Write `node`'s children and key list; returns `(seek_keys, nbytes_keys)`.
    fn write_directory(&self, out: &mut Vec<u8>, node: &DirNode, seek_dir: u64) -> (u64, u32) {
        let mut headers = Vec::new();

        for sub in &node.subdirs {
            let (sub_keys, sub_nbytes) = self.write_directory(out, sub, seek_dir);
            let pos = out.len() as u64;
            let payload = dir_record(sub_nbytes, 0, pos, seek_dir, sub_keys);
            headers.push(write_record(out, "TDirectoryFile", &sub.name, "", &payload, false));
        }
        for obj in &node.objects {
            headers.push(write_record(out, &obj.class_name, &obj.name, &obj.title, &obj.payload, self.compress));
        }

        let mut body = WBuffer::default();
        body.u32(headers.len() as u32);
        for h in &headers {
            body.bytes.extend_from_slice(h);
        }
        let pos = out.len() as u64;
        let header = key_header(body.bytes.len(), body.bytes.len(), pos, seek_dir, "TDirectory", &node.name, "");
        let nbytes = (header.len() + body.bytes.len()) as u32;
        out.extend_from_slice(&header);
        out.extend_from_slice(&body.bytes);
        (pos, nbytes)
    }
}

/// version u16 + 4 × u32 + 3 × u32 seeks
const DIR_RECORD_LEN: usize = 2 + 4 * 4 + 3 * 4;

fn dir_record(nbytes_keys: u32, nbytes_name: u32, seek_dir: u64, seek_parent: u64, seek_keys: u64) -> Vec<u8> {
    let mut w = WBuffer::default();
    w.u16(DIR_VERSION);
    w.u32(0);
    w.u32(0);
    w.u32(nbytes_keys);
    w.u32(nbytes_name);
    w.u32(seek_dir as u32);
    w.u32(seek_parent as u32);
    w.u32(seek_keys as u32);
    w.bytes
}

/// Append a key + object record at the end of `out`; returns the key header.
fn write_record(out: &mut Vec<u8>, class_name: &str, name: &str, title: &str, payload: &[u8], compress: bool) -> Vec<u8> {
    let mut stored = payload.to_vec();
    if compress && !payload.is_empty() {
        let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        // Writing into a Vec cannot fail.
        let compressed = enc.write_all(payload).and_then(|_| enc.finish()).unwrap_or_default();
        let block = frame_block(Algorithm::Zlib, 8, &compressed, payload.len());
        if !compressed.is_empty() && block.len() < payload.len() {
            stored = block;
        }
    }
    let pos = out.len() as u64;
    let header = key_header(stored.len(), payload.len(), pos, 0, class_name, name, title);
    out.extend_from_slice(&header);
    out.extend_from_slice(&stored);
    header
}

fn key_header(stored_len: usize, obj_len: usize, seek_key: u64, seek_pdir: u64, class_name: &str, name: &str, title: &str) -> Vec<u8> {
    let strings = [class_name, name, title];
    let key_len = 26 + strings.iter().map(|s| string_len(s)).sum::<usize>();
    let mut w = WBuffer::default();
    w.u32((key_len + stored_len) as u32);
    w.u16(KEY_VERSION);
    w.u32(obj_len as u32);
    w.u32(0); // datime
    w.u16(key_len as u16);
    w.u16(1); // cycle
    w.u32(seek_key as u32);
    w.u32(seek_pdir as u32);
    for s in strings {
        w.string(s);
    }
    w.bytes
}

fn string_len(s: &str) -> usize {
    if s.len() < 255 { 1 + s.len() } else { 5 + s.len() }
}

#[derive(Default)]
struct WBuffer {
    bytes: Vec<u8>,
}

impl WBuffer {
    fn u8(&mut self, v: u8) {
        self.bytes.push(v);
    }
    fn u16(&mut self, v: u16) {
        self.bytes.extend_from_slice(&v.to_be_bytes());
    }
    fn i16(&mut self, v: i16) {
        self.bytes.extend_from_slice(&v.to_be_bytes());
    }
    fn u32(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_be_bytes());
    }
    fn i32(&mut self, v: i32) {
        self.bytes.extend_from_slice(&v.to_be_bytes());
    }
    fn f32(&mut self, v: f32) {
        self.bytes.extend_from_slice(&v.to_be_bytes());
    }
    fn f64(&mut self, v: f64) {
        self.bytes.extend_from_slice(&v.to_be_bytes());
    }

    fn string(&mut self, s: &str) {
        if s.len() < 255 {
            self.u8(s.len() as u8);
        } else {
            self.u8(255);
            self.u32(s.len() as u32);
        }
        self.bytes.extend_from_slice(s.as_bytes());
    }

    fn tarray_f64(&mut self, values: &[f64]) {
        self.u32(values.len() as u32);
        for &v in values {
            self.f64(v);
        }
    }

    fn begin_object(&mut self, version: u16) -> usize {
        let start = self.bytes.len();
        self.u32(0);
        self.u16(version);
        start
    }

    fn end_object(&mut self, start: usize) {
        let count = (self.bytes.len() - start - 4) as u32;
        self.bytes[start..start + 4].copy_from_slice(&(count | BYTE_COUNT_MASK).to_be_bytes());
    }

    fn tobject(&mut self) {
        self.u16(1);
        self.u32(0);
        self.u32(TOBJECT_BITS);
    }

    fn tnamed(&mut self, name: &str, title: &str) {
        let o = self.begin_object(1);
        self.tobject();
        self.string(name);
        self.string(title);
        self.end_object(o);
    }

    fn taxis(&mut self, name: &str, n_bins: usize, x_min: f64, x_max: f64, edges: &[f64]) {
        let axis = self.begin_object(10);
        self.tnamed(name, "");
        let att = self.begin_object(4);
        self.i32(510); // fNdivisions
        self.i16(1);
        self.i16(1);
        self.i16(42);
        self.f32(0.005);
        self.f32(0.035);
        self.f32(0.035);
        self.f32(1.0);
        self.i16(42);
        self.end_object(att);
        self.i32(n_bins as i32);
        self.f64(x_min);
        self.f64(x_max);
        self.tarray_f64(edges);
        self.i32(0); // fFirst
        self.i32(0); // fLast
        self.u16(0); // fBits2
        self.u8(0); // fTimeDisplay
        self.string(""); // fTimeFormat
        self.end_object(axis);
    }
}
