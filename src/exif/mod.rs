//! Minimal EXIF reader
//!
//! Only what the metadata check needs: does the file carry EXIF at all,
//! and if so, what do IFD0's Model and Software tags say.

pub mod container;
pub mod tiff;

pub use tiff::{TAG_MAKE, TAG_MODEL, TAG_SOFTWARE};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExifTags {
    pub make: Option<String>,
    pub model: Option<String>,
    pub software: Option<String>,
    pub entry_count: usize,
}

impl ExifTags {
    pub fn has_model(&self) -> bool {
        self.model.as_deref().is_some_and(|m| !m.is_empty())
    }
}

/// Extract IFD0 tags. `None` when the container has no EXIF payload, the
/// payload is not valid TIFF, or IFD0 holds no entries.
pub fn extract(data: &[u8]) -> Option<ExifTags> {
    let payload = container::find_exif_payload(data)?;
    let ifd = tiff::read_ifd0(payload)?;
    if ifd.entry_count == 0 {
        return None;
    }

    let tag = |t: u16| ifd.ascii_tag(t).map(str::to_string);
    Some(ExifTags {
        make: tag(TAG_MAKE),
        model: tag(TAG_MODEL),
        software: tag(TAG_SOFTWARE),
        entry_count: ifd.entry_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg_shell() -> Vec<u8> {
        vec![0xFF, 0xD8, 0xFF, 0xD9]
    }

    #[test]
    fn test_extract_camera_tags() {
        let tiff = tiff::build_ascii_ifd(&[
            (TAG_MAKE, "NIKON CORPORATION"),
            (TAG_MODEL, "NIKON D850"),
        ]);
        let jpeg = container::jpeg_with_exif(&tiff, &jpeg_shell());
        let tags = extract(&jpeg).unwrap();
        assert_eq!(tags.make.as_deref(), Some("NIKON CORPORATION"));
        assert_eq!(tags.model.as_deref(), Some("NIKON D850"));
        assert_eq!(tags.software, None);
        assert!(tags.has_model());
        assert_eq!(tags.entry_count, 2);
    }

    #[test]
    fn test_extract_software_only() {
        let tiff = tiff::build_ascii_ifd(&[(TAG_SOFTWARE, "Midjourney v6")]);
        let jpeg = container::jpeg_with_exif(&tiff, &jpeg_shell());
        let tags = extract(&jpeg).unwrap();
        assert_eq!(tags.software.as_deref(), Some("Midjourney v6"));
        assert!(!tags.has_model());
    }

    #[test]
    fn test_empty_ifd_counts_as_absent() {
        let tiff = tiff::build_ascii_ifd(&[]);
        let jpeg = container::jpeg_with_exif(&tiff, &jpeg_shell());
        assert_eq!(extract(&jpeg), None);
    }

    #[test]
    fn test_no_exif() {
        assert_eq!(extract(&jpeg_shell()), None);
        assert_eq!(extract(b"not an image"), None);
    }
}
