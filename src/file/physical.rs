//! Memory-mapped template backend.
//!
//! Large templates (scanned forms, embedded fonts) are mapped rather than read, so only the
//! pages touched by the cross-reference lookup and the field tree walk are paged in. The
//! mapping is read-only and the template file must not be truncated while a [`Physical`] is
//! alive.

use super::Backend;
use crate::{
    Error::{Error, FileError, OutOfBounds},
    Result,
};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A template file mapped into memory.
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Map the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or
    /// [`crate::Error::Error`] if memory mapping fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path).map_err(FileError)?;

        // The mapping stays valid as long as nobody truncates the file underneath us
        let mmap = unsafe { Mmap::map(&file) }.map_err(|error| Error(error.to_string()))?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let end = offset.checked_add(len).ok_or(OutOfBounds)?;
        self.data.get(offset..end).ok_or(OutOfBounds)
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn maps_template() {
        let data = crate::test::forms::inline_acroform();
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(&data).unwrap();
        temp.flush().unwrap();

        let physical = Physical::new(temp.path()).unwrap();
        assert_eq!(physical.len(), data.len());
        assert_eq!(physical.data(), data.as_slice());
        assert_eq!(physical.data_slice(0, 5).unwrap(), b"%PDF-");
        assert!(matches!(
            physical.data_slice(data.len() - 1, 2),
            Err(OutOfBounds)
        ));
    }

    #[test]
    fn missing_file() {
        match Physical::new("/nonexistent/path/to/template.pdf") {
            Err(FileError(error)) => assert_eq!(error.kind(), std::io::ErrorKind::NotFound),
            other => panic!("Expected FileError, got {other:?}"),
        }
    }

    #[test]
    fn empty_file() {
        let temp = tempfile::NamedTempFile::new().unwrap();

        let physical = Physical::new(temp.path()).unwrap();
        assert_eq!(physical.len(), 0);
        assert!(physical.data_slice(0, 1).is_err());
    }
}
