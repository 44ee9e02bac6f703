//! # acroscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types from the
//! acroscope library. Import it to get quick access to everything needed to inspect and fill
//! a form.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all acroscope operations
pub use crate::Error;

/// The result type used throughout acroscope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Fill a template held in memory
pub use crate::{fill, fill_with_report};

/// Loaded templates and low-level parsing
pub use crate::{File, Parser};

/// Read-only field listing
pub use crate::form::{list_fields, FieldInfo};

// ================================================================================================
// Requests, Options and Results
// ================================================================================================

/// Values to write, keyed by fully-qualified field name
pub use crate::form::{FieldValue, FillRequest};

/// Fill configuration and text layout
pub use crate::form::{FillOptions, FontMetrics, StandardFont, TextOptions};

/// Outcome of a fill
pub use crate::form::FillReport;

// ================================================================================================
// Field Model
// ================================================================================================

/// Field types, flags and alignment
pub use crate::form::{FieldFlags, FieldKind, FieldType, Quadding};

// ================================================================================================
// PDF Object Model
// ================================================================================================

/// Parsed documents and objects
pub use crate::pdf::{Dictionary, Document, Name, Object, ObjectId, PdfString, Value};

/// Incremental update writer
pub use crate::pdf::IncrementalWriter;
