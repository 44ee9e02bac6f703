//! Interactive form filling.
//!
//! This module writes caller-supplied values into the AcroForm field tree of a template and
//! returns the template followed by one incremental update. Objects the fill does not touch are
//! carried forward unmodified; rewritten objects keep their ids and every entry that does not
//! change.
//!
//! # Architecture
//!
//! - [`field`] - field types, flags, quadding and attribute inheritance
//! - [`request`] - the values to write ([`FillRequest`], [`FieldValue`])
//! - [`options`] - configuration ([`FillOptions`], [`TextOptions`])
//! - [`font`] - font metrics for measured appearances
//! - [`rewrite`] - minimal-diff dictionary rewriting
//! - [`walker`] - field tree traversal with an explicit work queue
//! - [`states`] - on-state discovery for checkboxes and radio buttons
//! - [`appearance`] - appearance stream regeneration
//! - [`fields`] - read-only listing of terminal fields
//! - [`report`] - the outcome of a fill
//!
//! # Examples
//!
//! ```rust,no_run
//! use acroscope::{fill_with_report, FillOptions, FillRequest, TextOptions};
//!
//! let template = std::fs::read("template.pdf")?;
//! let request = FillRequest::new()
//!     .with("applicant.name", "Jane Doe")
//!     .with("applicant.agree", true);
//! let options = FillOptions::with_text(TextOptions::helvetica(10.0));
//!
//! let (filled, report) = fill_with_report(&template, &request, &options)?;
//! std::fs::write("filled.pdf", filled)?;
//! println!("{report}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod appearance;
pub mod field;
pub mod fields;
pub mod font;
pub mod options;
pub mod report;
pub mod request;
pub mod rewrite;
pub mod states;
mod value;
pub mod walker;

pub use field::{FieldFlags, FieldKind, FieldType, Quadding};
pub use fields::{list_fields, FieldInfo};
pub use font::{FontMetrics, StandardFont};
pub use options::{FillOptions, TextOptions};
pub use report::FillReport;
pub use request::{FieldValue, FillRequest};

use tracing::info;

use crate::{
    form::{rewrite::start_rewrite, walker::Walker},
    pdf::{Document, IncrementalWriter, Object},
    Error::MissingForm,
    Result,
};

/// Fill `template` with `request` and return the updated document.
///
/// # Errors
/// See [`fill_with_report`].
pub fn fill(template: &[u8], request: &FillRequest, options: &FillOptions) -> Result<Vec<u8>> {
    fill_with_report(template, request, options).map(|(output, _)| output)
}

/// Fill `template` with `request` and return the updated document and a [`FillReport`].
///
/// # Errors
/// - [`crate::Error::Empty`] or [`crate::Error::Malformed`] if the template cannot be parsed
/// - [`crate::Error::NotSupported`] if the template is encrypted
/// - [`crate::Error::MissingForm`] if the catalog has no `/AcroForm`
/// - [`crate::Error::RecursionLimit`] if the field tree is deeper than
///   [`FillOptions::max_depth`]
pub fn fill_with_report(
    template: &[u8],
    request: &FillRequest,
    options: &FillOptions,
) -> Result<(Vec<u8>, FillReport)> {
    let doc = Document::parse(template)?;
    fill_document(&doc, request, options)
}

/// Fill an already parsed document.
///
/// # Errors
/// See [`fill_with_report`].
pub fn fill_document(
    doc: &Document<'_>,
    request: &FillRequest,
    options: &FillOptions,
) -> Result<(Vec<u8>, FillReport)> {
    let writer = IncrementalWriter::new(doc)?;
    let (catalog_id, catalog) = doc.catalog()?;

    let Some(entry) = catalog.get("AcroForm") else {
        return Err(MissingForm);
    };
    let form = doc.resolve(entry)?;
    if matches!(form.object, Object::Null) {
        return Err(MissingForm);
    }
    let acroform = form.expect_dict()?;

    let mut walker = Walker::new(doc, writer, request, options, acroform)?;
    let form_id = match entry.as_reference() {
        Some(id) => id,
        None => {
            // Inline form: the catalog points to a fresh object holding it
            let writer = walker.writer_mut();
            let id = writer.allocate_id();
            writer.start_object(catalog_id)?;
            start_rewrite(writer, &catalog, &["AcroForm"])?;
            writer.write_key("AcroForm")?;
            writer.write_reference(id)?;
            writer.end_dictionary()?;
            writer.end_object()?;
            id
        }
    };

    walker.write_form(form_id, acroform)?;
    let (output, report) = walker.finish()?;
    info!(
        filled = report.filled.len(),
        skipped = report.skipped.len(),
        unmatched = report.unmatched.len(),
        appended = output.len() - doc.data().len(),
        "form filled"
    );
    Ok((output, report))
}
