//! JPEG Exif rewriting
//!
//! A JPEG is a sequence of marker segments up to `SOS`, after which the
//! entropy-coded image data runs to `EOI`. Exif metadata lives in an `APP1`
//! segment holding a little TIFF file: a header plus linked IFD tables of
//! 12-byte tag entries, with values over four bytes stored out-of-line at
//! absolute offsets.
//!
//! Setting `DateTimeOriginal` therefore means re-serializing the whole TIFF
//! block with recomputed offsets. The rewrite carries the 0th, Exif and GPS
//! IFDs through entry-for-entry in the source byte order; the thumbnail IFD
//! and the interoperability pointer are dropped because their out-of-line
//! data is not copied. Image segments and the entropy tail are untouched.

use crate::error::{Error, Result};

const MARKER_SOI: u8 = 0xD8;
const MARKER_EOI: u8 = 0xD9;
const MARKER_SOS: u8 = 0xDA;
const MARKER_APP1: u8 = 0xE1;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const TIFF_MAGIC: u16 = 42;

const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_GPS_IFD: u16 = 0x8825;
const TAG_INTEROP_IFD: u16 = 0xA005;
const TAG_DATETIME_ORIGINAL: u16 = 0x9003;

const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;

/// Largest TIFF block that still fits an APP1 segment.
const MAX_TIFF_LEN: usize = 0xFFFF - 2 - EXIF_HEADER.len();

fn malformed(message: impl Into<String>) -> Error {
    Error::Format {
        format: "JPEG",
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// JPEG segment layer
// ---------------------------------------------------------------------------

/// One marker segment between `SOI` and `SOS`.
#[derive(Debug, Clone)]
struct Segment {
    marker: u8,
    payload: Vec<u8>,
}

impl Segment {
    fn is_exif_app1(&self) -> bool {
        self.marker == MARKER_APP1 && self.payload.starts_with(EXIF_HEADER)
    }
}

/// Split a JPEG into its leading marker segments and the raw tail from `SOS`
/// (or `EOI`) onward.
fn split_segments(jpeg: &[u8]) -> Result<(Vec<Segment>, Vec<u8>)> {
    if jpeg.len() < 2 || jpeg[0] != 0xFF || jpeg[1] != MARKER_SOI {
        return Err(malformed("missing SOI marker"));
    }

    let mut segments = Vec::new();
    let mut pos = 2;

    loop {
        if pos >= jpeg.len() {
            return Ok((segments, Vec::new()));
        }
        if jpeg[pos] != 0xFF {
            return Err(malformed(format!("expected marker at offset {}", pos)));
        }
        // Skip fill bytes between segments.
        while pos + 1 < jpeg.len() && jpeg[pos + 1] == 0xFF {
            pos += 1;
        }
        if pos + 1 >= jpeg.len() {
            return Err(malformed("truncated marker"));
        }

        let marker = jpeg[pos + 1];
        if marker == MARKER_SOS || marker == MARKER_EOI {
            return Ok((segments, jpeg[pos..].to_vec()));
        }
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            return Err(malformed("unexpected standalone marker before SOS"));
        }

        if pos + 4 > jpeg.len() {
            return Err(malformed("truncated segment header"));
        }
        let length = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        if length < 2 || pos + 2 + length > jpeg.len() {
            return Err(malformed("segment length out of bounds"));
        }

        segments.push(Segment {
            marker,
            payload: jpeg[pos + 4..pos + 2 + length].to_vec(),
        });
        pos += 2 + length;
    }
}

/// Reassemble marker segments plus the untouched tail into a JPEG stream.
fn join_segments(segments: &[Segment], tail: &[u8]) -> Vec<u8> {
    let mut out = vec![0xFF, MARKER_SOI];
    for segment in segments {
        out.push(0xFF);
        out.push(segment.marker);
        out.extend_from_slice(&((segment.payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&segment.payload);
    }
    out.extend_from_slice(tail);
    out
}

// ---------------------------------------------------------------------------
// TIFF layer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    fn u16(self, bytes: &[u8]) -> u16 {
        let pair = [bytes[0], bytes[1]];
        match self {
            ByteOrder::Little => u16::from_le_bytes(pair),
            ByteOrder::Big => u16::from_be_bytes(pair),
        }
    }

    fn u32(self, bytes: &[u8]) -> u32 {
        let quad = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::Little => u32::from_le_bytes(quad),
            ByteOrder::Big => u32::from_be_bytes(quad),
        }
    }

    fn put_u16(self, out: &mut Vec<u8>, value: u16) {
        match self {
            ByteOrder::Little => out.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::Big => out.extend_from_slice(&value.to_be_bytes()),
        }
    }

    fn put_u32(self, out: &mut Vec<u8>, value: u32) {
        match self {
            ByteOrder::Little => out.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::Big => out.extend_from_slice(&value.to_be_bytes()),
        }
    }
}

/// Size in bytes of one element of a TIFF field type. Unknown types yield
/// `None` and the entry is skipped rather than guessed at.
fn type_size(typ: u16) -> Option<usize> {
    match typ {
        1 | 2 | 6 | 7 => Some(1),
        3 | 8 => Some(2),
        4 | 9 | 11 => Some(4),
        5 | 10 | 12 => Some(8),
        _ => None,
    }
}

/// One IFD entry with its raw (source-byte-order) value bytes.
#[derive(Debug, Clone)]
struct IfdEntry {
    tag: u16,
    typ: u16,
    count: u32,
    value: Vec<u8>,
}

/// Parsed Exif metadata: the IFDs the rewrite carries through.
#[derive(Debug)]
struct TiffData {
    order: ByteOrder,
    ifd0: Vec<IfdEntry>,
    exif: Vec<IfdEntry>,
    gps: Vec<IfdEntry>,
}

impl TiffData {
    fn empty() -> Self {
        Self {
            order: ByteOrder::Little,
            ifd0: Vec::new(),
            exif: Vec::new(),
            gps: Vec::new(),
        }
    }

    /// Set or replace an ASCII entry in the Exif IFD.
    fn set_exif_ascii(&mut self, tag: u16, text: &str) {
        let mut value = text.as_bytes().to_vec();
        value.push(0);
        let entry = IfdEntry {
            tag,
            typ: TYPE_ASCII,
            count: value.len() as u32,
            value,
        };

        match self.exif.iter_mut().find(|e| e.tag == tag) {
            Some(existing) => *existing = entry,
            None => self.exif.push(entry),
        }
    }
}

/// Parse one IFD's entries. The next-IFD pointer is deliberately ignored.
fn parse_ifd(tiff: &[u8], offset: usize, order: ByteOrder) -> Result<Vec<IfdEntry>> {
    if offset + 2 > tiff.len() {
        return Err(malformed("IFD offset out of bounds"));
    }
    let count = order.u16(&tiff[offset..]) as usize;
    let entries_end = offset + 2 + count * 12;
    if entries_end + 4 > tiff.len() {
        return Err(malformed("IFD entries out of bounds"));
    }

    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let at = offset + 2 + i * 12;
        let tag = order.u16(&tiff[at..]);
        let typ = order.u16(&tiff[at + 2..]);
        let value_count = order.u32(&tiff[at + 4..]);
        let field = &tiff[at + 8..at + 12];

        let Some(elem_size) = type_size(typ) else {
            tracing::debug!(tag, typ, "Skipping IFD entry with unknown type");
            continue;
        };
        let size = elem_size
            .checked_mul(value_count as usize)
            .ok_or_else(|| malformed("IFD value size overflow"))?;

        let value = if size <= 4 {
            field[..size].to_vec()
        } else {
            let value_offset = order.u32(field) as usize;
            let end = value_offset
                .checked_add(size)
                .ok_or_else(|| malformed("IFD value offset overflow"))?;
            if end > tiff.len() {
                return Err(malformed(format!("value for tag {:#06x} out of bounds", tag)));
            }
            tiff[value_offset..end].to_vec()
        };

        entries.push(IfdEntry {
            tag,
            typ,
            count: value_count,
            value,
        });
    }

    Ok(entries)
}

/// Remove a sub-IFD pointer entry and parse the IFD it points at.
fn take_sub_ifd(
    tiff: &[u8],
    parent: &mut Vec<IfdEntry>,
    tag: u16,
    order: ByteOrder,
) -> Result<Vec<IfdEntry>> {
    let Some(index) = parent.iter().position(|e| e.tag == tag) else {
        return Ok(Vec::new());
    };
    let pointer = parent.remove(index);
    if pointer.value.len() < 4 {
        return Err(malformed("sub-IFD pointer too short"));
    }
    parse_ifd(tiff, order.u32(&pointer.value) as usize, order)
}

fn parse_tiff(tiff: &[u8]) -> Result<TiffData> {
    if tiff.len() < 8 {
        return Err(malformed("TIFF header too short"));
    }
    let order = match &tiff[0..2] {
        b"II" => ByteOrder::Little,
        b"MM" => ByteOrder::Big,
        _ => return Err(malformed("unknown TIFF byte order")),
    };
    if order.u16(&tiff[2..]) != TIFF_MAGIC {
        return Err(malformed("bad TIFF magic"));
    }

    let mut ifd0 = parse_ifd(tiff, order.u32(&tiff[4..]) as usize, order)?;
    let mut exif = take_sub_ifd(tiff, &mut ifd0, TAG_EXIF_IFD, order)?;
    let gps = take_sub_ifd(tiff, &mut ifd0, TAG_GPS_IFD, order)?;

    // The interop IFD's out-of-line data is not carried over, so its pointer
    // must not survive the rewrite either.
    exif.retain(|e| e.tag != TAG_INTEROP_IFD);

    Ok(TiffData {
        order,
        ifd0,
        exif,
        gps,
    })
}

/// Serialized size of one IFD block plus its out-of-line value area.
fn ifd_size(entries: &[IfdEntry]) -> usize {
    let values: usize = entries
        .iter()
        .map(|e| {
            if e.value.len() > 4 {
                e.value.len() + e.value.len() % 2
            } else {
                0
            }
        })
        .sum();
    2 + entries.len() * 12 + 4 + values
}

/// Write one IFD block followed by its value area at the current end of
/// `out`. Entry order follows the TIFF requirement of ascending tags.
fn write_ifd(out: &mut Vec<u8>, entries: &[IfdEntry], order: ByteOrder) {
    let mut sorted: Vec<&IfdEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.tag);

    let base = out.len();
    let block = 2 + sorted.len() * 12 + 4;
    let mut values: Vec<u8> = Vec::new();

    order.put_u16(out, sorted.len() as u16);
    for entry in &sorted {
        order.put_u16(out, entry.tag);
        order.put_u16(out, entry.typ);
        order.put_u32(out, entry.count);
        if entry.value.len() <= 4 {
            let mut field = entry.value.clone();
            field.resize(4, 0);
            out.extend_from_slice(&field);
        } else {
            order.put_u32(out, (base + block + values.len()) as u32);
            values.extend_from_slice(&entry.value);
            if entry.value.len() % 2 == 1 {
                values.push(0);
            }
        }
    }
    order.put_u32(out, 0); // no next IFD (thumbnail IFD dropped)
    out.extend_from_slice(&values);
}

fn serialize_tiff(data: &TiffData) -> Vec<u8> {
    let order = data.order;

    // Pointer entries are synthesized fresh with recomputed offsets.
    let mut pointer_tags = vec![TAG_EXIF_IFD];
    if !data.gps.is_empty() {
        pointer_tags.push(TAG_GPS_IFD);
    }

    let ifd0_total = ifd_size(&data.ifd0) + pointer_tags.len() * 12;
    let exif_offset = 8 + ifd0_total;
    let gps_offset = exif_offset + ifd_size(&data.exif);

    let mut ifd0 = data.ifd0.clone();
    for tag in pointer_tags {
        let offset = if tag == TAG_EXIF_IFD {
            exif_offset
        } else {
            gps_offset
        };
        let mut value = Vec::with_capacity(4);
        order.put_u32(&mut value, offset as u32);
        ifd0.push(IfdEntry {
            tag,
            typ: TYPE_LONG,
            count: 1,
            value,
        });
    }

    let mut out = Vec::with_capacity(gps_offset + ifd_size(&data.gps));
    out.extend_from_slice(match order {
        ByteOrder::Little => b"II",
        ByteOrder::Big => b"MM",
    });
    order.put_u16(&mut out, TIFF_MAGIC);
    order.put_u32(&mut out, 8);

    write_ifd(&mut out, &ifd0, order);
    debug_assert_eq!(out.len(), exif_offset);
    write_ifd(&mut out, &data.exif, order);
    if !data.gps.is_empty() {
        debug_assert_eq!(out.len(), gps_offset);
        write_ifd(&mut out, &data.gps, order);
    }
    out
}

// ---------------------------------------------------------------------------
// Public surface
// ---------------------------------------------------------------------------

/// Rewrite a JPEG byte stream so its Exif `DateTimeOriginal` equals
/// `datetime` (format `YYYY:MM:DD HH:MM:SS`).
///
/// An existing Exif block is parsed and carried through; a missing one is
/// created. The APP1 segment is replaced in place, or inserted right after
/// `SOI` when absent.
pub fn set_datetime_original(jpeg: &[u8], datetime: &str) -> Result<Vec<u8>> {
    let (mut segments, tail) = split_segments(jpeg)?;

    let existing = segments.iter().position(Segment::is_exif_app1);
    let mut tiff = match existing {
        Some(index) => parse_tiff(&segments[index].payload[EXIF_HEADER.len()..])?,
        None => TiffData::empty(),
    };

    tiff.set_exif_ascii(TAG_DATETIME_ORIGINAL, datetime);

    let tiff_bytes = serialize_tiff(&tiff);
    if tiff_bytes.len() > MAX_TIFF_LEN {
        return Err(malformed("Exif block does not fit an APP1 segment"));
    }

    let mut payload = EXIF_HEADER.to_vec();
    payload.extend_from_slice(&tiff_bytes);
    let segment = Segment {
        marker: MARKER_APP1,
        payload,
    };

    match existing {
        Some(index) => segments[index] = segment,
        None => segments.insert(0, segment),
    }

    Ok(join_segments(&segments, &tail))
}

/// Read back the Exif `DateTimeOriginal` value, if present.
pub fn datetime_original(jpeg: &[u8]) -> Result<Option<String>> {
    let (segments, _) = split_segments(jpeg)?;
    let Some(segment) = segments.iter().find(|s| s.is_exif_app1()) else {
        return Ok(None);
    };

    let tiff = parse_tiff(&segment.payload[EXIF_HEADER.len()..])?;
    Ok(tiff
        .exif
        .iter()
        .find(|e| e.tag == TAG_DATETIME_ORIGINAL)
        .map(|e| {
            String::from_utf8_lossy(&e.value)
                .trim_end_matches('\0')
                .to_string()
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A structurally valid JPEG with an APP0, a scan, and no Exif.
    fn minimal_jpeg() -> Vec<u8> {
        let mut jpeg = vec![0xFF, 0xD8];
        // APP0 / JFIF
        let app0: &[u8] = b"JFIF\x00\x01\x02\x00\x00\x01\x00\x01\x00\x00";
        jpeg.extend_from_slice(&[0xFF, 0xE0]);
        jpeg.extend_from_slice(&((app0.len() + 2) as u16).to_be_bytes());
        jpeg.extend_from_slice(app0);
        // SOS header plus fake entropy data and EOI
        jpeg.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 1, 0, 0, 63, 0, 0]);
        jpeg.extend_from_slice(&[0x12, 0x34, 0x56, 0x78]);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }

    const STAMP: &str = "2019:01:01 12:30:00";

    #[test]
    fn test_stamp_jpeg_without_exif() {
        let jpeg = minimal_jpeg();
        let stamped = set_datetime_original(&jpeg, STAMP).unwrap();

        assert_eq!(datetime_original(&stamped).unwrap().as_deref(), Some(STAMP));

        // Entropy tail and EOI are untouched.
        assert!(stamped.ends_with(&[0x12, 0x34, 0x56, 0x78, 0xFF, 0xD9]));
        // APP0 survived alongside the new APP1.
        let (segments, _) = split_segments(&stamped).unwrap();
        assert!(segments.iter().any(|s| s.marker == 0xE0));
    }

    #[test]
    fn test_restamp_replaces_not_duplicates() {
        let once = set_datetime_original(&minimal_jpeg(), STAMP).unwrap();
        let twice = set_datetime_original(&once, "2020:06:15 08:00:00").unwrap();

        assert_eq!(
            datetime_original(&twice).unwrap().as_deref(),
            Some("2020:06:15 08:00:00")
        );

        let (segments, _) = split_segments(&twice).unwrap();
        let exif_count = segments.iter().filter(|s| s.is_exif_app1()).count();
        assert_eq!(exif_count, 1);
    }

    #[test]
    fn test_existing_big_endian_entries_survive() {
        // Hand-built big-endian TIFF: IFD0 with one Make entry whose ASCII
        // value is out-of-line.
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"MM");
        tiff.extend_from_slice(&42u16.to_be_bytes());
        tiff.extend_from_slice(&8u32.to_be_bytes()); // IFD0 at 8
        tiff.extend_from_slice(&1u16.to_be_bytes()); // one entry
        tiff.extend_from_slice(&0x010Fu16.to_be_bytes()); // Make
        tiff.extend_from_slice(&2u16.to_be_bytes()); // ASCII
        tiff.extend_from_slice(&6u32.to_be_bytes()); // "Canon\0"
        tiff.extend_from_slice(&26u32.to_be_bytes()); // value offset
        tiff.extend_from_slice(&0u32.to_be_bytes()); // no next IFD
        tiff.extend_from_slice(b"Canon\0");

        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        jpeg.extend_from_slice(&((EXIF_HEADER.len() + tiff.len() + 2) as u16).to_be_bytes());
        jpeg.extend_from_slice(EXIF_HEADER);
        jpeg.extend_from_slice(&tiff);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);

        let stamped = set_datetime_original(&jpeg, STAMP).unwrap();
        assert_eq!(datetime_original(&stamped).unwrap().as_deref(), Some(STAMP));

        let (segments, _) = split_segments(&stamped).unwrap();
        let exif = segments.iter().find(|s| s.is_exif_app1()).unwrap();
        let parsed = parse_tiff(&exif.payload[EXIF_HEADER.len()..]).unwrap();

        assert_eq!(parsed.order, ByteOrder::Big);
        let make = parsed.ifd0.iter().find(|e| e.tag == 0x010F).unwrap();
        assert_eq!(make.value, b"Canon\0");
    }

    #[test]
    fn test_rejects_non_jpeg() {
        assert!(set_datetime_original(b"not a jpeg", STAMP).is_err());
        assert!(set_datetime_original(&[0xFF, 0xD8, 0x00], STAMP).is_err());
    }

    #[test]
    fn test_read_back_without_exif() {
        assert_eq!(datetime_original(&minimal_jpeg()).unwrap(), None);
    }
}
