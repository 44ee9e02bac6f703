//! PDF object model, cross-reference handling and incremental output.
//!
//! This module contains everything the form layer needs from the container format:
//!
//! - [`object`] - The tagged object model with verbatim source encodings
//! - [`xref`] - Cross-reference tables and streams, including `/Prev` chains
//! - [`document`] - Object lookup, reference resolution and stream decoding
//! - [`filter`] - Stream filters (`FlateDecode`, `ASCIIHexDecode`)
//! - [`text`] - Text-string and WinAnsi encodings
//! - [`writer`] - The append-only [`IncrementalWriter`]
//!
//! # Examples
//!
//! ```rust,no_run
//! use acroscope::pdf::Document;
//!
//! let data = std::fs::read("template.pdf")?;
//! let doc = Document::parse(&data)?;
//! let (root, catalog) = doc.catalog()?;
//! println!("catalog {} has {} entries", root, catalog.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod document;
pub mod filter;
pub mod object;
pub mod text;
pub mod writer;
pub mod xref;

pub use document::Document;
pub use object::{Dictionary, Name, Object, ObjectId, PdfString, Stream, Value};
pub use writer::IncrementalWriter;
