//! LC-3 object image format.
//!
//! An object image is a flat run of big-endian 16-bit words:
//! - Word 0 is the load address
//! - Every following word is placed at the next address
//!
//! There is no header, magic number or checksum.

use crate::bits::swap16;
use std::path::Path;
use thiserror::Error;

/// A parsed object image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectImage {
    /// Address of the first data word.
    pub origin: u16,
    /// Data words in host order.
    pub words: Vec<u16>,
}

impl ObjectImage {
    /// Build an image from host-order words.
    pub fn new(origin: u16, words: Vec<u16>) -> Self {
        Self { origin, words }
    }

    /// Parse the on-disk byte format.
    pub fn parse(bytes: &[u8]) -> Result<Self, LoadError> {
        if bytes.len() % 2 != 0 {
            return Err(LoadError::Malformed(format!(
                "odd image length of {} bytes",
                bytes.len()
            )));
        }

        // Each pair is read as a little-endian word and swapped into place.
        let mut words = bytes
            .chunks_exact(2)
            .map(|pair| swap16(u16::from_le_bytes([pair[0], pair[1]])));

        let origin = words
            .next()
            .ok_or_else(|| LoadError::Malformed("image has no load address".into()))?;

        Ok(Self {
            origin,
            words: words.collect(),
        })
    }

    /// Serialize back to the on-disk byte format.
    pub fn to_bytes(&self) -> Vec<u8> {
        std::iter::once(self.origin)
            .chain(self.words.iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect()
    }

    /// Number of data words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Read an object image from disk.
pub fn read_object<P: AsRef<Path>>(path: P) -> Result<ObjectImage, LoadError> {
    let bytes = std::fs::read(path.as_ref()).map_err(|e| LoadError::Io(e.to_string()))?;
    ObjectImage::parse(&bytes)
}

/// Errors that can occur while reading or loading an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("image of {len} words at {origin:#06x} does not fit below 0xFFFF")]
    InputTooLarge { origin: u16, len: usize },

    #[error("malformed image: {0}")]
    Malformed(String),

    #[error("no operating system image configured")]
    NoOperatingSystem,

    #[error("I/O error: {0}")]
    Io(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_big_endian() {
        let image = ObjectImage::parse(&[0x30, 0x00, 0x11, 0x11, 0x22, 0x22, 0x12, 0x34]).unwrap();

        assert_eq!(image.origin, 0x3000);
        assert_eq!(image.words, vec![0x1111, 0x2222, 0x1234]);
        assert_eq!(image.len(), 3);
    }

    #[test]
    fn test_parse_origin_only() {
        let image = ObjectImage::parse(&[0x40, 0x00]).unwrap();
        assert_eq!(image.origin, 0x4000);
        assert!(image.is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(ObjectImage::parse(&[]), Err(LoadError::Malformed(_))));
        assert!(matches!(ObjectImage::parse(&[0x30, 0x00, 0x11]), Err(LoadError::Malformed(_))));
    }

    #[test]
    fn test_to_bytes() {
        let image = ObjectImage::new(0x3000, vec![0x1025, 0xF025]);
        assert_eq!(image.to_bytes(), vec![0x30, 0x00, 0x10, 0x25, 0xF0, 0x25]);
    }

    #[test]
    fn test_read_object_missing_file() {
        let err = read_object("/nonexistent/program.obj").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
