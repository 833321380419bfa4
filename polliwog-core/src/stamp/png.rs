//! PNG chunk rewriting
//!
//! A PNG file is the 8-byte signature followed by chunks of
//! `length | type | data | crc32`. Creation time is recorded by inserting a
//! `tEXt` chunk keyed `Creation Time` immediately before the terminating
//! `IEND` chunk. Existing chunks are carried through byte-for-byte; a
//! pre-existing creation-time chunk is not replaced, so stamping is additive
//! at the chunk level.

use crate::error::{Error, Result};

const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

const TEXT_KEYWORD: &[u8] = b"Creation Time";

fn malformed(message: impl Into<String>) -> Error {
    Error::Format {
        format: "PNG",
        message: message.into(),
    }
}

/// One chunk, CRC recomputed on encode.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Chunk {
    chunk_type: [u8; 4],
    data: Vec<u8>,
}

impl Chunk {
    fn is(&self, name: &[u8; 4]) -> bool {
        &self.chunk_type == name
    }
}

/// CRC-32 (ISO 3309) over the chunk type and data, as PNG requires.
fn crc32(chunk_type: &[u8], data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in chunk_type.iter().chain(data) {
        crc ^= byte as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
        }
    }
    !crc
}

/// Split a PNG byte stream into its chunks, verifying structure and CRCs.
fn parse_chunks(png: &[u8]) -> Result<Vec<Chunk>> {
    if !png.starts_with(&SIGNATURE) {
        return Err(malformed("missing PNG signature"));
    }

    let mut chunks = Vec::new();
    let mut offset = SIGNATURE.len();

    loop {
        if png.len() < offset + 8 {
            return Err(malformed("truncated chunk header"));
        }
        let length =
            u32::from_be_bytes([png[offset], png[offset + 1], png[offset + 2], png[offset + 3]])
                as usize;
        let mut chunk_type = [0u8; 4];
        chunk_type.copy_from_slice(&png[offset + 4..offset + 8]);

        let data_start = offset + 8;
        let crc_start = data_start
            .checked_add(length)
            .ok_or_else(|| malformed("chunk length overflow"))?;
        if png.len() < crc_start + 4 {
            return Err(malformed("truncated chunk data"));
        }

        let data = png[data_start..crc_start].to_vec();
        let declared_crc = u32::from_be_bytes([
            png[crc_start],
            png[crc_start + 1],
            png[crc_start + 2],
            png[crc_start + 3],
        ]);
        if crc32(&chunk_type, &data) != declared_crc {
            return Err(malformed(format!(
                "CRC mismatch in {} chunk",
                String::from_utf8_lossy(&chunk_type)
            )));
        }

        let is_end = &chunk_type == b"IEND";
        chunks.push(Chunk { chunk_type, data });
        offset = crc_start + 4;

        if is_end {
            return Ok(chunks);
        }
    }
}

/// Serialize chunks back to a full PNG byte stream.
fn encode_chunks(chunks: &[Chunk]) -> Vec<u8> {
    let mut out = SIGNATURE.to_vec();
    for chunk in chunks {
        out.extend_from_slice(&(chunk.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&chunk.chunk_type);
        out.extend_from_slice(&chunk.data);
        out.extend_from_slice(&crc32(&chunk.chunk_type, &chunk.data).to_be_bytes());
    }
    out
}

/// Insert a `tEXt` "Creation Time" chunk before `IEND` and return the
/// rewritten byte stream.
pub fn insert_creation_time(png: &[u8], timestamp: &str) -> Result<Vec<u8>> {
    let mut chunks = parse_chunks(png)?;

    let end = chunks
        .iter()
        .position(|c| c.is(b"IEND"))
        .ok_or_else(|| malformed("missing IEND chunk"))?;

    let mut data = TEXT_KEYWORD.to_vec();
    data.push(0);
    data.extend_from_slice(timestamp.as_bytes());

    chunks.insert(
        end,
        Chunk {
            chunk_type: *b"tEXt",
            data,
        },
    );

    Ok(encode_chunks(&chunks))
}
