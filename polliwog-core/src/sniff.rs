//! Magic-byte media type detection and extension correction
//!
//! The feed is known to mislabel PNG payloads as `image/jpeg`. Trusting the
//! declared type would hand a PNG to the Exif rewriter and corrupt it, so
//! image files are re-checked against their leading bytes and renamed when
//! the extension lies.

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::retry::{with_retries, WRITE_ATTEMPTS};

/// PNG file signature (8 bytes).
const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Image formats the sniffer can identify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }
}

/// Identify an image format from its leading bytes.
pub fn detect(head: &[u8]) -> Option<ImageFormat> {
    if head.starts_with(&PNG_SIGNATURE) {
        Some(ImageFormat::Png)
    } else if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else {
        None
    }
}

/// Correct a file's extension to match its actual content.
///
/// Only files currently named `.jpg` or `.png` are inspected; every other
/// extension passes through untouched. A rename is retried up to
/// [`WRITE_ATTEMPTS`] times; exhaustion is fatal.
pub fn correct_extension(path: &Path) -> Result<PathBuf> {
    let current_ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext @ ("jpg" | "png")) => ext,
        _ => return Ok(path.to_path_buf()),
    };

    let mut file = std::fs::File::open(path)?;
    let mut head = [0u8; 8];
    let mut n = 0;
    // Fill the header buffer; a single read may legally come up short.
    while n < head.len() {
        match file.read(&mut head[n..]) {
            Ok(0) => break,
            Ok(read) => n += read,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let Some(format) = detect(&head[..n]) else {
        tracing::debug!(path = %path.display(), "Unrecognized image content, leaving as-is");
        return Ok(path.to_path_buf());
    };

    if format.extension() == current_ext {
        return Ok(path.to_path_buf());
    }

    let corrected = path.with_extension(format.extension());
    tracing::info!(
        from = %path.display(),
        to = %corrected.display(),
        "Extension disagrees with content, renaming"
    );

    with_retries("rename", WRITE_ATTEMPTS, || {
        std::fs::rename(path, &corrected)
    })?;

    Ok(corrected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Smallest byte sequence our detector treats as PNG.
    fn png_bytes() -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(b"rest-of-image");
        bytes
    }

    fn jpeg_bytes() -> Vec<u8> {
        vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]
    }

    #[test]
    fn test_detect() {
        assert_eq!(detect(&png_bytes()), Some(ImageFormat::Png));
        assert_eq!(detect(&jpeg_bytes()), Some(ImageFormat::Jpeg));
        assert_eq!(detect(b"GIF89a"), None);
        assert_eq!(detect(b""), None);
    }

    #[test]
    fn test_mislabeled_png_is_renamed_and_unmodified() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.jpg");
        std::fs::write(&path, png_bytes()).unwrap();

        let corrected = correct_extension(&path).unwrap();

        assert_eq!(corrected, tmp.path().join("photo.png"));
        assert!(!path.exists());
        assert_eq!(std::fs::read(&corrected).unwrap(), png_bytes());
    }

    #[test]
    fn test_genuine_jpeg_is_untouched() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.jpg");
        std::fs::write(&path, jpeg_bytes()).unwrap();

        let corrected = correct_extension(&path).unwrap();

        assert_eq!(corrected, path);
        assert!(path.exists());
    }

    #[test]
    fn test_non_image_extension_passes_through() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clip.mp4");
        std::fs::write(&path, b"not inspected").unwrap();

        assert_eq!(correct_extension(&path).unwrap(), path);
    }

    #[test]
    fn test_file_shorter_than_header_still_detected() {
        // Three bytes are enough to identify a JPEG even though the header
        // buffer is eight.
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tiny.png");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF]).unwrap();

        let corrected = correct_extension(&path).unwrap();
        assert_eq!(corrected, tmp.path().join("tiny.jpg"));
    }

    #[test]
    fn test_unrecognized_content_left_alone() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("odd.jpg");
        std::fs::write(&path, b"GIF89a-pretending").unwrap();

        assert_eq!(correct_extension(&path).unwrap(), path);
        assert!(path.exists());
    }
}
