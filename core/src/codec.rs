//! Posting list codecs selected by the descriptor's compression dimension.

use crate::descriptor::Compression;
use crate::document::DocId;
use crate::index::Posting;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use std::io::{Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("truncated posting data")]
    Truncated,
    #[error("varint overflow")]
    Overflow,
    #[error("{0} trailing bytes after postings")]
    Trailing(usize),
    #[error("doc ids not ascending")]
    Unordered,
    #[error(transparent)]
    Bincode(#[from] bincode::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reversible encoding of one term's postings.
pub trait PostingCodec: Send + Sync {
    fn encode(&self, postings: &[Posting]) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Posting>, CodecError>;
}

pub fn for_compression(compression: Compression) -> Box<dyn PostingCodec> {
    match compression {
        Compression::None => Box::new(RawCodec),
        Compression::CodecA => Box::new(VarByteCodec),
        Compression::NativeCodec => Box::new(DeflateCodec),
    }
}

/// Plain bincode.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

/// Gaps between doc ids and between positions, each written as a LEB128 varint.
#[derive(Debug, Clone, Copy, Default)]
pub struct VarByteCodec;

/// The raw form run through deflate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeflateCodec;

impl PostingCodec for RawCodec {
    fn encode(&self, postings: &[Posting]) -> Result<Vec<u8>, CodecError> {
        Ok(bincode::serialize(postings)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Posting>, CodecError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl PostingCodec for VarByteCodec {
    fn encode(&self, postings: &[Posting]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(postings.len() * 4);
        write_varint(&mut out, postings.len() as u64);
        let mut prev_doc: Option<DocId> = None;
        for p in postings {
            let gap = match prev_doc {
                Some(prev) if p.doc_id <= prev => return Err(CodecError::Unordered),
                Some(prev) => p.doc_id - prev,
                None => p.doc_id,
            };
            prev_doc = Some(p.doc_id);
            write_varint(&mut out, gap as u64);
            write_varint(&mut out, p.positions.len() as u64);
            let mut prev_pos = 0u32;
            for (i, &pos) in p.positions.iter().enumerate() {
                let delta = if i == 0 { pos } else { pos.wrapping_sub(prev_pos) };
                write_varint(&mut out, delta as u64);
                prev_pos = pos;
            }
        }
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Posting>, CodecError> {
        let mut cursor = 0usize;
        let count = read_varint(bytes, &mut cursor)? as usize;
        let mut postings = Vec::with_capacity(count.min(bytes.len()));
        let mut doc: u64 = 0;
        for i in 0..count {
            let gap = read_varint(bytes, &mut cursor)?;
            if i > 0 && gap == 0 {
                return Err(CodecError::Unordered);
            }
            doc = doc.checked_add(gap).filter(|d| *d <= DocId::MAX as u64).ok_or(CodecError::Overflow)?;
            let n = read_varint(bytes, &mut cursor)? as usize;
            let mut positions = Vec::with_capacity(n.min(bytes.len()));
            let mut pos = 0u32;
            for j in 0..n {
                let delta = read_varint(bytes, &mut cursor)?;
                let delta = u32::try_from(delta).map_err(|_| CodecError::Overflow)?;
                pos = if j == 0 { delta } else { pos.wrapping_add(delta) };
                positions.push(pos);
            }
            postings.push(Posting { doc_id: doc as DocId, positions });
        }
        if cursor != bytes.len() {
            return Err(CodecError::Trailing(bytes.len() - cursor));
        }
        Ok(postings)
    }
}

impl PostingCodec for DeflateCodec {
    fn encode(&self, postings: &[Posting]) -> Result<Vec<u8>, CodecError> {
        let raw = RawCodec.encode(postings)?;
        let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&raw)?;
        Ok(encoder.finish()?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Posting>, CodecError> {
        let mut raw = Vec::new();
        DeflateDecoder::new(bytes).read_to_end(&mut raw)?;
        RawCodec.decode(&raw)
    }
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
}

fn read_varint(bytes: &[u8], cursor: &mut usize) -> Result<u64, CodecError> {
    let mut result = 0u64;
    let mut shift = 0;
    loop {
        let byte = *bytes.get(*cursor).ok_or(CodecError::Truncated)?;
        *cursor += 1;
        if shift >= 64 {
            return Err(CodecError::Overflow);
        }
        result |= ((byte & 0x7F) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
    }
}
