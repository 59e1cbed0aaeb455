//! Reader / writer for the OBF ("OMAS_BF") microscopy container.
//!
//! Layout (all little-endian):
//!
//! ```text
//! file header   "OMAS_BF\n\xff\xff" version:u32 first_stack:u64
//!               descr_len:u32 descr[..] (v>=2: meta_pos:u64)
//! stack header  "OMAS_BF_STACK\n\xff\xff" version:u32 rank:u32
//!               res[15]:u32 len[15]:f64 off[15]:f64 dt:u32
//!               compression:u32 level:u32 name_len:u32 descr_len:u32
//!               reserved:u64 data_len_disk:u64 next_stack:u64
//!               name[..] descr[..] data[data_len_disk]
//! ```
//!
//! Stacks form a chain through `next_stack`; 0 terminates it. Anything a
//! stack carries after its sample data (footers, labels) is skipped.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use ndarray::Array3;

pub const MAX_DIMS: usize = 15;
const FILE_MAGIC: &[u8; 10] = b"OMAS_BF\n\xff\xff";
const STACK_MAGIC: &[u8; 16] = b"OMAS_BF_STACK\n\xff\xff";
const FILE_VERSION: u32 = 2;
/// Fixed part of a stack header, before name and description.
const STACK_HEADER_LEN: u64 = 16 + 4 + 4 + 4 * 15 + 8 * 15 + 8 * 15 + 4 * 5 + 8 * 3;

#[derive(Debug, thiserror::Error)]
pub enum ObfError {
    #[error("not an OBF file (bad magic)")]
    BadMagic,
    #[error("bad stack magic at offset {0}")]
    BadStackMagic(u64),
    #[error("file is truncated")]
    Truncated,
    #[error("stack '{name}': unsupported rank {rank}")]
    InvalidRank { name: String, rank: u32 },
    #[error("stack '{name}': unsupported sample type 0x{code:x}")]
    UnsupportedSampleType { name: String, code: u32 },
    #[error("stack '{name}': unsupported compression type {code}")]
    UnsupportedCompression { name: String, code: u32 },
    #[error("stack '{name}': expected {expected} bytes of samples, found {found}")]
    SizeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("stack chain loops back to offset {0}")]
    CyclicChain(u64),
    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for ObfError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            ObfError::Truncated
        } else {
            ObfError::Io(e)
        }
    }
}

// ---------------------------------------------------------------------------
// Sample types & compression
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl SampleType {
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0x01 => SampleType::U8,
            0x02 => SampleType::I8,
            0x04 => SampleType::U16,
            0x08 => SampleType::I16,
            0x10 => SampleType::U32,
            0x20 => SampleType::I32,
            0x40 => SampleType::F32,
            0x80 => SampleType::F64,
            _ => return None,
        })
    }

    pub fn code(self) -> u32 {
        match self {
            SampleType::U8 => 0x01,
            SampleType::I8 => 0x02,
            SampleType::U16 => 0x04,
            SampleType::I16 => 0x08,
            SampleType::U32 => 0x10,
            SampleType::I32 => 0x20,
            SampleType::F32 => 0x40,
            SampleType::F64 => 0x80,
        }
    }

    /// Bytes per sample.
    pub fn size(self) -> usize {
        match self {
            SampleType::U8 | SampleType::I8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }

    /// Widen little-endian samples to `f64`.
    fn decode(self, raw: &[u8]) -> Vec<f64> {
        let n = self.size();
        let chunks = raw.chunks_exact(n);
        match self {
            SampleType::U8 => raw.iter().map(|&v| v as f64).collect(),
            SampleType::I8 => raw.iter().map(|&v| v as i8 as f64).collect(),
            SampleType::U16 => chunks.map(|c| LittleEndian::read_u16(c) as f64).collect(),
            SampleType::I16 => chunks.map(|c| LittleEndian::read_i16(c) as f64).collect(),
            SampleType::U32 => chunks.map(|c| LittleEndian::read_u32(c) as f64).collect(),
            SampleType::I32 => chunks.map(|c| LittleEndian::read_i32(c) as f64).collect(),
            SampleType::F32 => chunks.map(|c| LittleEndian::read_f32(c) as f64).collect(),
            SampleType::F64 => chunks.map(LittleEndian::read_f64).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Zlib,
}

impl Compression {
    fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Compression::None),
            1 => Some(Compression::Zlib),
            _ => None,
        }
    }

    fn code(self) -> u32 {
        match self {
            Compression::None => 0,
            Compression::Zlib => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Parsed structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StackHeader {
    pub format_version: u32,
    /// Pixel counts per used dimension (x first).
    pub res: Vec<u32>,
    /// Physical extent per used dimension.
    pub lengths: Vec<f64>,
    pub offsets: Vec<f64>,
    pub sample_type: SampleType,
    pub compression: Compression,
    pub name: String,
    pub description: String,
    pub data_len_disk: u64,
    pub next_stack_pos: u64,
}

impl StackHeader {
    /// (depth, height, width); dimensions past y are folded into depth.
    pub fn shape(&self) -> (usize, usize, usize) {
        let dim = |i: usize| self.res.get(i).map_or(1, |&r| r as usize);
        let depth = self.res.iter().skip(2).map(|&r| r as usize).product();
        (depth, dim(1), dim(0))
    }
}

#[derive(Debug, Clone)]
pub struct ObfStack {
    pub header: StackHeader,
    /// Samples widened to `f64`, shaped (depth, height, width).
    pub data: Array3<f64>,
}

#[derive(Debug, Clone)]
pub struct ObfFile {
    pub format_version: u32,
    pub description: String,
    pub stacks: Vec<ObfStack>,
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

pub fn read_obf_path(path: &Path) -> Result<ObfFile, ObfError> {
    let file = File::open(path).map_err(ObfError::Io)?;
    read_obf(BufReader::new(file))
}

pub fn read_obf<R: Read + Seek>(mut reader: R) -> Result<ObfFile, ObfError> {
    let mut magic = [0u8; 10];
    reader.read_exact(&mut magic)?;
    if &magic != FILE_MAGIC {
        return Err(ObfError::BadMagic);
    }

    let format_version = reader.read_u32::<LittleEndian>()?;
    let first_stack_pos = reader.read_u64::<LittleEndian>()?;
    let descr_len = reader.read_u32::<LittleEndian>()?;
    let description = read_string(&mut reader, descr_len as usize)?;
    if format_version >= 2 {
        // XML metadata position; not needed for pixel data.
        let _meta_pos = reader.read_u64::<LittleEndian>()?;
    }

    let mut stacks = Vec::new();
    let mut visited = HashSet::new();
    let mut pos = first_stack_pos;
    while pos != 0 {
        if !visited.insert(pos) {
            return Err(ObfError::CyclicChain(pos));
        }
        reader.seek(SeekFrom::Start(pos))?;
        let stack = read_stack(&mut reader, pos)?;
        log::debug!(
            "OBF stack '{}' {:?} {:?} at offset {pos}",
            stack.header.name,
            stack.header.res,
            stack.header.sample_type
        );
        pos = stack.header.next_stack_pos;
        stacks.push(stack);
    }

    Ok(ObfFile {
        format_version,
        description,
        stacks,
    })
}

fn read_stack<R: Read>(reader: &mut R, pos: u64) -> Result<ObfStack, ObfError> {
    let mut magic = [0u8; 16];
    reader.read_exact(&mut magic)?;
    if &magic != STACK_MAGIC {
        return Err(ObfError::BadStackMagic(pos));
    }

    let format_version = reader.read_u32::<LittleEndian>()?;
    let rank = reader.read_u32::<LittleEndian>()?;
    let mut res = [0u32; MAX_DIMS];
    reader.read_u32_into::<LittleEndian>(&mut res)?;
    let mut lengths = [0f64; MAX_DIMS];
    reader.read_f64_into::<LittleEndian>(&mut lengths)?;
    let mut offsets = [0f64; MAX_DIMS];
    reader.read_f64_into::<LittleEndian>(&mut offsets)?;
    let dt = reader.read_u32::<LittleEndian>()?;
    let compression_code = reader.read_u32::<LittleEndian>()?;
    let _compression_level = reader.read_u32::<LittleEndian>()?;
    let name_len = reader.read_u32::<LittleEndian>()?;
    let descr_len = reader.read_u32::<LittleEndian>()?;
    let _reserved = reader.read_u64::<LittleEndian>()?;
    let data_len_disk = reader.read_u64::<LittleEndian>()?;
    let next_stack_pos = reader.read_u64::<LittleEndian>()?;
    let name = read_string(reader, name_len as usize)?;
    let description = read_string(reader, descr_len as usize)?;

    if rank == 0 || rank as usize > MAX_DIMS {
        return Err(ObfError::InvalidRank { name, rank });
    }
    let Some(sample_type) = SampleType::from_code(dt) else {
        return Err(ObfError::UnsupportedSampleType { name, code: dt });
    };
    let Some(compression) = Compression::from_code(compression_code) else {
        return Err(ObfError::UnsupportedCompression {
            name,
            code: compression_code,
        });
    };

    let rank = rank as usize;
    let header = StackHeader {
        format_version,
        res: res[..rank].to_vec(),
        lengths: lengths[..rank].to_vec(),
        offsets: offsets[..rank].to_vec(),
        sample_type,
        compression,
        name,
        description,
        data_len_disk,
        next_stack_pos,
    };

    let mut on_disk = Vec::new();
    reader.by_ref().take(data_len_disk).read_to_end(&mut on_disk)?;
    if (on_disk.len() as u64) < data_len_disk {
        return Err(ObfError::Truncated);
    }

    let raw = match compression {
        Compression::None => on_disk,
        Compression::Zlib => {
            let mut inflated = Vec::new();
            ZlibDecoder::new(&on_disk[..]).read_to_end(&mut inflated)?;
            inflated
        }
    };

    let (depth, height, width) = header.shape();
    let expected = depth
        .checked_mul(height)
        .and_then(|n| n.checked_mul(width))
        .and_then(|n| n.checked_mul(sample_type.size()))
        .unwrap_or(usize::MAX);
    if raw.len() < expected {
        return Err(ObfError::SizeMismatch {
            name: header.name,
            expected,
            found: raw.len(),
        });
    }

    let samples = sample_type.decode(&raw[..expected]);
    let data = Array3::from_shape_vec((depth, height, width), samples).map_err(|_| {
        ObfError::SizeMismatch {
            name: header.name.clone(),
            expected,
            found: raw.len(),
        }
    })?;

    Ok(ObfStack { header, data })
}

fn read_string<R: Read>(reader: &mut R, len: usize) -> Result<String, ObfError> {
    let mut buf = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() < len {
        return Err(ObfError::Truncated);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// A sample type the writer can store.
pub trait Sample: Copy {
    const TYPE: SampleType;
    fn write_le<W: Write>(self, w: &mut W) -> io::Result<()>;
}

macro_rules! impl_sample {
    ($t:ty, $variant:ident, |$v:ident, $w:ident| $body:expr) => {
        impl Sample for $t {
            const TYPE: SampleType = SampleType::$variant;
            fn write_le<W: Write>(self, $w: &mut W) -> io::Result<()> {
                let $v = self;
                $body
            }
        }
    };
}

impl_sample!(u8, U8, |v, w| w.write_u8(v));
impl_sample!(u16, U16, |v, w| w.write_u16::<LittleEndian>(v));
impl_sample!(i16, I16, |v, w| w.write_i16::<LittleEndian>(v));
impl_sample!(f32, F32, |v, w| w.write_f32::<LittleEndian>(v));
impl_sample!(f64, F64, |v, w| w.write_f64::<LittleEndian>(v));

/// One stack to be written: slash-delimited name plus (depth, height, width) samples.
pub struct NewStack<'a, T> {
    pub name: &'a str,
    pub data: &'a Array3<T>,
}

pub fn write_obf_path<T: Sample>(
    path: &Path,
    description: &str,
    stacks: &[NewStack<'_, T>],
    compression: Compression,
) -> Result<(), ObfError> {
    let file = File::create(path).map_err(ObfError::Io)?;
    let mut writer = BufWriter::new(file);
    write_obf(&mut writer, description, stacks, compression)?;
    writer.flush().map_err(ObfError::Io)
}

/// Write a footer-less OBF file (stack format version 0).
pub fn write_obf<W: Write, T: Sample>(
    writer: &mut W,
    description: &str,
    stacks: &[NewStack<'_, T>],
    compression: Compression,
) -> Result<(), ObfError> {
    let header_len = (FILE_MAGIC.len() + 4 + 8 + 4 + description.len() + 8) as u64;

    writer.write_all(FILE_MAGIC).map_err(ObfError::Io)?;
    writer.write_u32::<LittleEndian>(FILE_VERSION).map_err(ObfError::Io)?;
    let first = if stacks.is_empty() { 0 } else { header_len };
    writer.write_u64::<LittleEndian>(first).map_err(ObfError::Io)?;
    writer
        .write_u32::<LittleEndian>(description.len() as u32)
        .map_err(ObfError::Io)?;
    writer.write_all(description.as_bytes()).map_err(ObfError::Io)?;
    writer.write_u64::<LittleEndian>(0).map_err(ObfError::Io)?;

    let mut pos = header_len;
    for (i, stack) in stacks.iter().enumerate() {
        let payload = encode_samples(stack.data, compression).map_err(ObfError::Io)?;
        let stack_len = STACK_HEADER_LEN + stack.name.len() as u64 + payload.len() as u64;
        let next = if i + 1 == stacks.len() { 0 } else { pos + stack_len };
        write_stack_header(writer, stack, T::TYPE, compression, payload.len() as u64, next)
            .map_err(ObfError::Io)?;
        writer.write_all(&payload).map_err(ObfError::Io)?;
        pos += stack_len;
    }
    Ok(())
}

fn write_stack_header<W: Write, T>(
    w: &mut W,
    stack: &NewStack<'_, T>,
    sample_type: SampleType,
    compression: Compression,
    data_len_disk: u64,
    next_stack_pos: u64,
) -> io::Result<()> {
    let (depth, height, width) = stack.data.dim();
    let mut res = [0u32; MAX_DIMS];
    res[0] = width as u32;
    res[1] = height as u32;
    res[2] = depth as u32;
    let mut lengths = [0f64; MAX_DIMS];
    for (len, &r) in lengths.iter_mut().zip(&res[..3]) {
        *len = r as f64;
    }

    w.write_all(STACK_MAGIC)?;
    w.write_u32::<LittleEndian>(0)?;
    w.write_u32::<LittleEndian>(3)?;
    for r in res {
        w.write_u32::<LittleEndian>(r)?;
    }
    for len in lengths {
        w.write_f64::<LittleEndian>(len)?;
    }
    for _ in 0..MAX_DIMS {
        w.write_f64::<LittleEndian>(0.0)?;
    }
    w.write_u32::<LittleEndian>(sample_type.code())?;
    w.write_u32::<LittleEndian>(compression.code())?;
    w.write_u32::<LittleEndian>(if compression == Compression::Zlib { 6 } else { 0 })?;
    w.write_u32::<LittleEndian>(stack.name.len() as u32)?;
    w.write_u32::<LittleEndian>(0)?;
    w.write_u64::<LittleEndian>(0)?;
    w.write_u64::<LittleEndian>(data_len_disk)?;
    w.write_u64::<LittleEndian>(next_stack_pos)?;
    w.write_all(stack.name.as_bytes())
}

fn encode_samples<T: Sample>(data: &Array3<T>, compression: Compression) -> io::Result<Vec<u8>> {
    let mut raw = Vec::with_capacity(data.len() * T::TYPE.size());
    // logical (z, y, x) order == x fastest
    for &v in data.iter() {
        v.write_le(&mut raw)?;
    }
    match compression {
        Compression::None => Ok(raw),
        Compression::Zlib => {
            let mut enc = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            enc.write_all(&raw)?;
            enc.finish()
        }
    }
}
