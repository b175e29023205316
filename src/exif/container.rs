//! Locate the raw EXIF (TIFF) payload inside an image container
//!
//! - JPEG: APP1 segment whose payload starts with `Exif\0\0`
//! - PNG: `eXIf` chunk
//! - WebP: `EXIF` chunk inside the RIFF container
//! - TIFF: the file itself is the TIFF structure

const EXIF_PREFIX: &[u8] = b"Exif\0\0";
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

pub fn find_exif_payload(data: &[u8]) -> Option<&[u8]> {
    if data.starts_with(&[0xFF, 0xD8]) {
        jpeg_exif(data)
    } else if data.starts_with(PNG_SIGNATURE) {
        png_exif(data)
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        webp_exif(data)
    } else if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
        Some(data)
    } else {
        None
    }
}

fn jpeg_exif(data: &[u8]) -> Option<&[u8]> {
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // Fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // Standalone markers carry no length
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }
        // Start of scan / end of image: metadata segments are all before this
        if marker == 0xDA || marker == 0xD9 {
            return None;
        }

        let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if len < 2 {
            return None;
        }
        let start = pos + 4;
        let end = (pos + 2 + len).min(data.len());
        if marker == 0xE1 && data[start..end].starts_with(EXIF_PREFIX) {
            return Some(&data[start + EXIF_PREFIX.len()..end]);
        }
        pos += 2 + len;
    }
    None
}

fn png_exif(data: &[u8]) -> Option<&[u8]> {
    let mut pos = PNG_SIGNATURE.len();
    while pos + 8 <= data.len() {
        let len = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
            as usize;
        let kind = &data[pos + 4..pos + 8];
        let start = pos + 8;
        let end = start.checked_add(len)?;
        if end > data.len() {
            return None;
        }
        match kind {
            b"eXIf" => return Some(strip_prefix(&data[start..end])),
            b"IEND" => return None,
            _ => {}
        }
        // data + CRC
        pos = end + 4;
    }
    None
}

fn webp_exif(data: &[u8]) -> Option<&[u8]> {
    let mut pos = 12;
    while pos + 8 <= data.len() {
        let kind = &data[pos..pos + 4];
        let len = u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
            as usize;
        let start = pos + 8;
        let end = start.checked_add(len)?;
        if end > data.len() {
            return None;
        }
        if kind == b"EXIF" {
            return Some(strip_prefix(&data[start..end]));
        }
        // Chunks are padded to even length
        pos = end + (len & 1);
    }
    None
}

/// Some writers keep the JPEG-style `Exif\0\0` prefix in PNG/WebP chunks
fn strip_prefix(payload: &[u8]) -> &[u8] {
    payload.strip_prefix(EXIF_PREFIX).unwrap_or(payload)
}

/// Wrap a TIFF payload into a minimal JPEG APP1 segment (fixtures only)
pub fn jpeg_with_exif(tiff: &[u8], jpeg: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(jpeg.len() + tiff.len() + 10);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    let len = (2 + EXIF_PREFIX.len() + tiff.len()) as u16;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(EXIF_PREFIX);
    out.extend_from_slice(tiff);
    out.extend_from_slice(&jpeg[2..]);
    out
}
