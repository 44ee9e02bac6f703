// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a template into memory

//! # acroscope
//!
//! [![Crates.io](https://img.shields.io/crates/v/acroscope.svg)](https://crates.io/crates/acroscope)
//! [![Documentation](https://docs.rs/acroscope/badge.svg)](https://docs.rs/acroscope)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/BinFlip/acroscope/blob/main/LICENSE-APACHE)
//!
//! Incremental, minimal-diff filling of PDF interactive forms (AcroForm), in pure Rust.
//!
//! `acroscope` takes a PDF template and a set of named values and produces a new PDF with the
//! form fields filled in. The template bytes are never rewritten: the result is the original
//! file followed by a single incremental update that holds exactly the objects that changed,
//! plus fresh appearance streams so viewers display the new values.
//!
//! ## Features
//!
//! - **📎 Byte-preserving** - The output starts with the unmodified template, so existing
//!   signatures over earlier revisions stay verifiable
//! - **🔍 Verbatim copy** - Untouched dictionary entries are copied from their source bytes,
//!   never re-serialized
//! - **🌳 Full field trees** - Hierarchical names, inherited attributes, inline kids and merged
//!   field/widget dictionaries
//! - **🔘 Every fillable kind** - Text (including rich text), check boxes, radio groups and
//!   choice lists
//! - **🖋️ Appearance generation** - Regenerated `/Tx` marked content, optionally measured with
//!   built-in Helvetica or Courier metrics
//! - **🗂️ Modern and classic files** - Cross-reference tables and streams, object streams,
//!   Flate-compressed content
//!
//! ## Quick Start
//!
//! Add `acroscope` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! acroscope = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! ```rust,no_run
//! use acroscope::prelude::*;
//!
//! let template = File::from_file("template.pdf".as_ref())?;
//! for field in template.fields()? {
//!     println!("{} ({:?})", field.name, field.kind);
//! }
//! # Ok::<(), acroscope::Error>(())
//! ```
//!
//! ### Filling a form
//!
//! ```rust,no_run
//! use acroscope::{fill_with_report, FieldValue, FillOptions, FillRequest, TextOptions};
//!
//! let template = std::fs::read("template.pdf")?;
//! let request = FillRequest::new()
//!     .with("person.name.first", "Ada")
//!     .with("person.name.last", "Lovelace")
//!     .with("newsletter", true)
//!     .with("plan", FieldValue::Selected(Some(1)));
//!
//! let options = FillOptions::with_text(TextOptions::helvetica(11.0));
//! let (output, report) = fill_with_report(&template, &request, &options)?;
//!
//! for name in &report.unmatched {
//!     eprintln!("no field named {name}");
//! }
//! std::fs::write("filled.pdf", output)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - Template loading (memory map or buffer) and the byte-level [`Parser`]
//! - [`pdf`] - Objects, cross-reference resolution, stream filters and the incremental writer
//! - [`form`] - Field tree traversal, value updates and appearance generation
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result`]. Structural problems in the template surface as
//! [`Error::Malformed`] with the source location that detected them; templates without a form
//! as [`Error::MissingForm`]. Requested names that match no field are not errors and are
//! listed in [`FillReport::unmatched`].
//!
//! ## Logging
//!
//! The crate emits [`tracing`](https://docs.rs/tracing) events: `warn` for input it had to
//! work around, `debug` per filled field and `info` once per fill. Install any subscriber to
//! see them.

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Template loading and the byte-level PDF lexer.
///
/// # Key Types
///
/// - [`File`] - A loaded template
/// - [`Parser`] - Cursor-based lexer and object parser
pub mod file;

/// PDF object model, cross-reference resolution and incremental writing.
///
/// # Key Types
///
/// - [`pdf::Document`] - Parsed cross-reference structure with lazy object resolution
/// - [`pdf::Value`] - A parsed object paired with its source bytes
/// - [`pdf::IncrementalWriter`] - Appends an incremental update to a document
///
/// # Examples
///
/// ```rust
/// use acroscope::pdf::Document;
///
/// let data = acroscope::pdf::writer::minimal_document();
/// let doc = Document::parse(&data)?;
/// let (_, catalog) = doc.catalog()?;
/// assert!(catalog.get_name("Type").is_some_and(|name| name.is("Catalog")));
/// # Ok::<(), acroscope::Error>(())
/// ```
pub mod pdf;

/// AcroForm field trees, value updates and appearance streams.
///
/// See [`fill_with_report`] for the main entry point and [`list_fields`] for inspection.
pub mod form;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use acroscope::prelude::*;
///
/// let template = File::from_mem(std::fs::read("template.pdf")?)?;
/// let output = template.fill(&FillRequest::new().with("city", "Vienna"), &FillOptions::default())?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub mod prelude;

/// `acroscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
///
/// # Examples
///
/// ```rust,no_run
/// use acroscope::{File, Result};
///
/// fn load_template(path: &str) -> Result<File> {
///     File::from_file(std::path::Path::new(path))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `acroscope` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use acroscope::{fill, Error, FillOptions, FillRequest};
///
/// let template = std::fs::read("template.pdf").unwrap_or_default();
/// match fill(&template, &FillRequest::new(), &FillOptions::default()) {
///     Ok(output) => println!("{} bytes", output.len()),
///     Err(Error::MissingForm) => println!("Template has no form"),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {}", message),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

pub use file::{parser::Parser, File};

pub use form::{
    fill, fill_with_report, list_fields, FieldFlags, FieldInfo, FieldKind, FieldType, FieldValue,
    FillOptions, FillReport, FillRequest, FontMetrics, Quadding, StandardFont, TextOptions,
};
