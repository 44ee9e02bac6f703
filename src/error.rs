use thiserror::Error;

use crate::pdf::ObjectId;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! write_order_error {
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        crate::Error::WriteOrder(format!($fmt $(, $arg)*))
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Errors fall into three groups. Structural errors mean the template could not be understood
/// and abort a fill before any output is returned. Unsupported-input errors mean the template
/// uses a feature this crate deliberately does not handle. [`Error::WriteOrder`] signals a
/// violation of the append-only output discipline and indicates a bug in the caller of
/// [`crate::pdf::IncrementalWriter`].
///
/// Fields that cannot hold a value (push-buttons, signatures, untyped fields) are **not**
/// errors; they are copied through and reported in [`crate::FillReport::skipped`].
///
/// # Error Categories
///
/// ## Structural Errors
/// - [`Error::Malformed`] - Corrupted or invalid PDF syntax or structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of the data
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::MissingForm`] - The document catalog has no `/AcroForm`
/// - [`Error::MissingObject`] - A reference points to an object that does not exist
/// - [`Error::TypeMismatch`] - An object has a different kind than the structure requires
/// - [`Error::RecursionLimit`] - Nesting or reference chains are deeper than allowed
///
/// ## Unsupported Input
/// - [`Error::NotSupported`] - Document feature outside the crate's scope (e.g. encryption)
/// - [`Error::UnsupportedFilter`] - Stream uses a filter that cannot be decoded
/// - [`Error::Decode`] - Stream data could not be decoded
///
/// ## I/O and Output
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::WriteOrder`] - Append-only output ordering violated
///
/// # Examples
///
/// ```rust,no_run
/// use acroscope::{Error, File, FillOptions, FillRequest};
/// use std::path::Path;
///
/// let file = File::from_file(Path::new("template.pdf"))?;
/// match file.fill(&FillRequest::new(), &FillOptions::default()) {
///     Ok(bytes) => println!("wrote {} bytes", bytes.len()),
///     Err(Error::MissingForm) => eprintln!("template has no interactive form"),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("malformed template: {} ({}:{})", message, file, line)
///     }
///     Err(e) => eprintln!("other error: {}", e),
/// }
/// # Ok::<(), acroscope::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The document is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the data.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// The document catalog does not contain an interactive form.
    #[error("Document catalog has no /AcroForm dictionary")]
    MissingForm,

    /// A reference could not be resolved through the cross-reference data.
    #[error("Object {0} is not present in the cross-reference data")]
    MissingObject(ObjectId),

    /// An object has a different kind than the surrounding structure requires.
    ///
    /// `expected` and `found` are object kind names such as `"Dictionary"` or `"Array"`.
    #[error("Expected {expected}, found {found}")]
    TypeMismatch {
        /// The kind the structure requires
        expected: &'static str,
        /// The kind that was actually encountered
        found: &'static str,
    },

    /// Recursion limit reached.
    ///
    /// Guards nested arrays/dictionaries, reference chains and field tree depth. The associated
    /// value shows the limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// The document uses a feature this crate does not support.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// A stream uses a filter that cannot be decoded.
    #[error("Unsupported stream filter /{0}")]
    UnsupportedFilter(String),

    /// Stream data could not be decoded.
    #[error("Failed to decode stream data: {0}")]
    Decode(String),

    /// The append-only output discipline was violated.
    ///
    /// Raised when an object write is started while another is open, when an object number is
    /// written twice, or when containers are left unbalanced.
    #[error("Write order violated: {0}")]
    WriteOrder(String),

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
