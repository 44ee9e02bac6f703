//! In-memory template backend.

use super::Backend;
use crate::{Error::OutOfBounds, Result};

/// Template bytes owned in a buffer, for templates that were generated or downloaded rather
/// than read from disk.
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create a new memory backend
    ///
    /// ## Arguments
    /// * 'data' - The PDF bytes to consume
    pub fn new(data: Vec<u8>) -> Memory {
        Memory { data }
    }
}

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let end = offset.checked_add(len).ok_or(OutOfBounds)?;
        self.data.get(offset..end).ok_or(OutOfBounds)
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
