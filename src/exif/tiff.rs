//! TIFF IFD0 reader
//!
//! EXIF is a TIFF structure: an 8-byte header (byte order, magic 42, offset
//! of the first IFD) followed by IFDs of 12-byte entries:
//!
//! ```text
//! tag(2) type(2) count(4) value-or-offset(4)
//! ```
//!
//! Only IFD0 is walked. That is where cameras put Make/Model/Software.

use std::collections::BTreeMap;

pub const TAG_MAKE: u16 = 0x010F;
pub const TAG_MODEL: u16 = 0x0110;
pub const TAG_SOFTWARE: u16 = 0x0131;

const TYPE_ASCII: u16 = 2;
const MAX_ENTRIES: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    fn u16(&self, b: &[u8]) -> u16 {
        match self {
            ByteOrder::Little => u16::from_le_bytes([b[0], b[1]]),
            ByteOrder::Big => u16::from_be_bytes([b[0], b[1]]),
        }
    }

    fn u32(&self, b: &[u8]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            ByteOrder::Big => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
        }
    }
}

/// IFD0 contents: entry count plus every ASCII tag, keyed by tag id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ifd {
    pub entry_count: usize,
    pub ascii: BTreeMap<u16, String>,
}

impl Ifd {
    pub fn ascii_tag(&self, tag: u16) -> Option<&str> {
        self.ascii.get(&tag).map(|s| s.as_str())
    }
}

/// Parse byte order and magic; returns the order and IFD0 offset
pub fn parse_header(data: &[u8]) -> Option<(ByteOrder, usize)> {
    if data.len() < 8 {
        return None;
    }
    let order = match &data[0..2] {
        b"II" => ByteOrder::Little,
        b"MM" => ByteOrder::Big,
        _ => return None,
    };
    if order.u16(&data[2..4]) != 42 {
        return None;
    }
    Some((order, order.u32(&data[4..8]) as usize))
}

/// Read IFD0. `None` if the header or the IFD is malformed.
pub fn read_ifd0(data: &[u8]) -> Option<Ifd> {
    let (order, offset) = parse_header(data)?;
    if offset + 2 > data.len() {
        return None;
    }

    let count = order.u16(&data[offset..offset + 2]) as usize;
    if count > MAX_ENTRIES {
        return None;
    }

    let mut ifd = Ifd::default();
    for i in 0..count {
        let pos = offset + 2 + i * 12;
        if pos + 12 > data.len() {
            // Truncated table: keep what was readable
            break;
        }
        let entry = &data[pos..pos + 12];
        let tag = order.u16(&entry[0..2]);
        let typ = order.u16(&entry[2..4]);
        let n = order.u32(&entry[4..8]) as usize;
        ifd.entry_count += 1;

        if typ == TYPE_ASCII {
            if let Some(s) = read_ascii(data, entry, order, n) {
                ifd.ascii.insert(tag, s);
            }
        }
    }

    Some(ifd)
}

fn read_ascii(data: &[u8], entry: &[u8], order: ByteOrder, n: usize) -> Option<String> {
    let raw: &[u8] = if n <= 4 {
        &entry[8..8 + n]
    } else {
        let off = order.u32(&entry[8..12]) as usize;
        data.get(off..off.checked_add(n)?)?
    };
    let trimmed: Vec<u8> = raw.iter().copied().take_while(|&b| b != 0).collect();
    let s = String::from_utf8_lossy(&trimmed).trim().to_string();
    Some(s)
}

/// Test/fixture helper: build a little-endian TIFF with the given ASCII tags in IFD0
pub fn build_ascii_ifd(tags: &[(u16, &str)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());

    let table_len = 2 + tags.len() * 12 + 4;
    let mut heap: Vec<u8> = Vec::new();
    let heap_start = 8 + table_len;

    out.extend_from_slice(&(tags.len() as u16).to_le_bytes());
    for (tag, value) in tags {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&TYPE_ASCII.to_le_bytes());
        out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
        if bytes.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..bytes.len()].copy_from_slice(&bytes);
            out.extend_from_slice(&inline);
        } else {
            let off = (heap_start + heap.len()) as u32;
            out.extend_from_slice(&off.to_le_bytes());
            heap.extend_from_slice(&bytes);
        }
    }
    // No next IFD
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&heap);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_little_and_big_endian() {
        assert_eq!(
            parse_header(b"II\x2a\x00\x08\x00\x00\x00"),
            Some((ByteOrder::Little, 8))
        );
        assert_eq!(
            parse_header(b"MM\x00\x2a\x00\x00\x00\x08"),
            Some((ByteOrder::Big, 8))
        );
    }

    #[test]
    fn test_header_rejects_bad_magic() {
        assert_eq!(parse_header(b"II\x2b\x00\x08\x00\x00\x00"), None);
        assert_eq!(parse_header(b"XX\x2a\x00\x08\x00\x00\x00"), None);
        assert_eq!(parse_header(b"II"), None);
    }

    #[test]
    fn test_read_model_and_software() {
        let data = build_ascii_ifd(&[
            (TAG_MODEL, "Canon EOS 5D Mark IV"),
            (TAG_SOFTWARE, "Adobe Lightroom"),
        ]);
        let ifd = read_ifd0(&data).unwrap();
        assert_eq!(ifd.entry_count, 2);
        assert_eq!(ifd.ascii_tag(TAG_MODEL), Some("Canon EOS 5D Mark IV"));
        assert_eq!(ifd.ascii_tag(TAG_SOFTWARE), Some("Adobe Lightroom"));
        assert_eq!(ifd.ascii_tag(TAG_MAKE), None);
    }

    #[test]
    fn test_inline_short_string() {
        // "X1" + NUL fits in the 4-byte value field
        let data = build_ascii_ifd(&[(TAG_MODEL, "X1")]);
        let ifd = read_ifd0(&data).unwrap();
        assert_eq!(ifd.ascii_tag(TAG_MODEL), Some("X1"));
    }

    #[test]
    fn test_empty_ifd() {
        let data = build_ascii_ifd(&[]);
        let ifd = read_ifd0(&data).unwrap();
        assert_eq!(ifd.entry_count, 0);
        assert!(ifd.ascii.is_empty());
    }

    #[test]
    fn test_out_of_range_offset_is_skipped() {
        let mut data = build_ascii_ifd(&[(TAG_SOFTWARE, "Stable Diffusion XL")]);
        // Point the string offset past the end of the buffer
        let bogus = 10_000u32.to_le_bytes();
        data[8 + 2 + 8..8 + 2 + 12].copy_from_slice(&bogus);
        let ifd = read_ifd0(&data).unwrap();
        assert_eq!(ifd.entry_count, 1);
        assert_eq!(ifd.ascii_tag(TAG_SOFTWARE), None);
    }

    #[test]
    fn test_ifd_offset_past_end() {
        let data = b"II\x2a\x00\xff\x00\x00\x00";
        assert_eq!(read_ifd0(data), None);
    }
}
