//! PDF template access and loading.
//!
//! This module ties a source of bytes to a parsed [`crate::pdf::Document`]. It abstracts over
//! where the template comes from (a file on disk or a buffer in memory) and offers the
//! form-level entry points on top of the parsed document.
//!
//! # Architecture
//!
//! - **Backend system** - Pluggable data sources (disk files, memory buffers)
//! - **Self-referencing file** - The parsed document borrows from the backend it lives next to,
//!   so a template is parsed once and can be filled any number of times
//! - **Lexer** - [`crate::file::parser::Parser`], the byte-level PDF tokenizer every other layer
//!   builds on
//!
//! # Key Components
//!
//! ## Core Types
//! - [`crate::file::File`] - A loaded template with its parsed document
//! - [`crate::file::Backend`] - Trait for different data sources (disk files, memory buffers)
//!
//! ## Parsing Infrastructure
//! - [`crate::file::parser::Parser`] - Cursor-based lexer and object parser
//!
//! ## Backend Implementations
//! - `Physical` - Memory-mapped file backend for disk access
//! - `Memory` - In-memory buffer backend
//!
//! # Usage Examples
//!
//! ## Filling a template from disk
//!
//! ```rust,no_run
//! use acroscope::{File, FillOptions, FillRequest};
//! use std::path::Path;
//!
//! let template = File::from_file(Path::new("template.pdf"))?;
//! let request = FillRequest::new()
//!     .with("person.name", "Ada Lovelace")
//!     .with("agree", true);
//!
//! let output = template.fill(&request, &FillOptions::default())?;
//! std::fs::write("filled.pdf", output)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Inspecting a template held in memory
//!
//! ```rust,no_run
//! use acroscope::File;
//!
//! let data = std::fs::read("template.pdf")?;
//! let template = File::from_mem(data)?;
//! for field in template.fields()? {
//!     println!("{}: {:?}", field.name, field.kind);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Thread Safety
//!
//! [`crate::file::File`] is [`Send`] and [`Sync`]. Filling never mutates the template, so one
//! loaded file can serve concurrent fills from several threads.

pub mod parser;

mod memory;
mod physical;

use std::path::Path;

use crate::{
    form::{fill_document, list_fields, FieldInfo, FillOptions, FillReport, FillRequest},
    pdf::Document,
    Error::Empty,
    Result,
};
use memory::Memory;
use ouroboros::self_referencing;
use physical::Physical;

/// Backend trait for a source of template bytes.
///
/// Implementations provide bounds-checked access to the raw bytes a [`File`] parses.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the length of the data in bytes.
    fn len(&self) -> usize;
}

/// A loaded PDF template.
///
/// The template is parsed once when it is loaded. Every fill appends an incremental update to a
/// copy of the original bytes, which stay untouched.
///
/// # Examples
///
/// ```rust,no_run
/// use acroscope::{File, FillOptions, FillRequest, TextOptions};
///
/// let template = File::from_mem(std::fs::read("template.pdf")?)?;
/// let options = FillOptions::with_text(TextOptions::helvetica(10.0));
///
/// let (output, report) = template.fill_with_report(
///     &FillRequest::new().with("city", "Vienna"),
///     &options,
/// )?;
/// println!("{report}");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[self_referencing]
pub struct File {
    /// The underlying data source
    data: Box<dyn Backend>,
    /// The parsed document referencing `data`
    #[borrows(data)]
    #[not_covariant]
    document: Document<'this>,
}

impl File {
    /// Loads a template from disk through a memory map.
    ///
    /// # Arguments
    /// * `file` - Path to the PDF on disk
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be read, [`crate::Error::Empty`]
    /// if it is empty and [`crate::Error::Malformed`] if it is not a parseable PDF.
    pub fn from_file(file: &Path) -> Result<File> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Loads a template from a memory buffer.
    ///
    /// # Arguments
    /// * `data` - The PDF bytes to consume
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] if `data` is empty and [`crate::Error::Malformed`] if it
    /// is not a parseable PDF.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        let data = Box::new(data);

        File::try_new(data, |data| Document::parse(data.data()))
    }

    /// Returns the total size of the template in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the template has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the raw bytes of the template.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.with_data(|data| data.data())
    }

    /// Returns a slice of the template bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the template.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.with_data(|data| data.data_slice(offset, len))
    }

    /// Fills the template and returns the updated document.
    ///
    /// # Errors
    /// See [`crate::fill_with_report`].
    pub fn fill(&self, request: &FillRequest, options: &FillOptions) -> Result<Vec<u8>> {
        self.fill_with_report(request, options)
            .map(|(output, _)| output)
    }

    /// Fills the template and returns the updated document along with a [`FillReport`].
    ///
    /// # Errors
    /// See [`crate::fill_with_report`].
    pub fn fill_with_report(
        &self,
        request: &FillRequest,
        options: &FillOptions,
    ) -> Result<(Vec<u8>, FillReport)> {
        self.with_document(|document| fill_document(document, request, options))
    }

    /// Lists the terminal fields of the template.
    ///
    /// # Errors
    /// See [`crate::list_fields`].
    pub fn fields(&self) -> Result<Vec<FieldInfo>> {
        self.with_document(|document| list_fields(document))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{form::FieldValue, test::forms, Error};

    #[test]
    fn load_memory() {
        let data = forms::kitchen_sink();
        let file = File::from_mem(data.clone()).unwrap();

        assert_eq!(file.len(), data.len());
        assert!(!file.is_empty());
        assert_eq!(file.data(), data.as_slice());
        assert_eq!(file.data_slice(0, 5).unwrap(), b"%PDF-");
        assert!(file.data_slice(data.len(), 1).is_err());
    }

    #[test]
    fn load_physical() {
        let data = forms::hierarchy();
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        temp.write_all(&data).unwrap();
        temp.flush().unwrap();

        let file = File::from_file(temp.path()).unwrap();
        assert_eq!(file.len(), data.len());

        let names: Vec<_> = file
            .fields()
            .unwrap()
            .into_iter()
            .map(|field| field.name)
            .collect();
        assert_eq!(names, vec!["person.name.first", "person.name.last", "note"]);
    }

    #[test]
    fn load_invalid() {
        assert!(matches!(File::from_mem(Vec::new()), Err(Error::Empty)));
        assert!(matches!(
            File::from_mem(b"this is not a pdf".to_vec()),
            Err(Error::Malformed { .. })
        ));
        assert!(matches!(
            File::from_file(Path::new("/nonexistent/template.pdf")),
            Err(Error::FileError(_))
        ));
    }

    #[test]
    fn fill_twice() {
        let file = File::from_mem(forms::kitchen_sink()).unwrap();
        let request = FillRequest::new().with("name", FieldValue::from("Ada"));

        let first = file.fill(&request, &FillOptions::default()).unwrap();
        let second = file.fill(&request, &FillOptions::default()).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with(file.data()));
    }

    #[test]
    fn fill_report() {
        let file = File::from_mem(forms::kitchen_sink()).unwrap();
        let request = FillRequest::new().with("name", "Ada").with("missing", "x");

        let (_, report) = file
            .fill_with_report(&request, &FillOptions::default())
            .unwrap();
        assert_eq!(report.filled, vec!["name".to_string()]);
        assert_eq!(report.unmatched, vec!["missing".to_string()]);
    }

    #[test]
    fn send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<File>();
    }
}
