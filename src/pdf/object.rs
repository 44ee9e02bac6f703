//! Tagged-variant PDF object model with verbatim encodings.
//!
//! Every value produced by [`crate::file::parser::Parser`] is a [`Value`]: the decoded
//! [`Object`] together with the exact bytes it was parsed from. Dictionaries and arrays hold
//! `Value`s as well, so any nested entry can be written back byte-for-byte with
//! [`crate::pdf::IncrementalWriter::copy_verbatim`] without being re-encoded. This is what makes
//! minimal-diff rewriting possible.
//!
//! # Key Types
//!
//! - [`ObjectId`] - Object number and generation of an indirect object
//! - [`Object`] - The decoded object, one variant per PDF object kind
//! - [`Value`] - An `Object` plus its raw encoding
//! - [`Dictionary`] - Ordered key/value list preserving the source order
//! - [`Name`] / [`PdfString`] / [`Stream`] - Leaf and stream payloads

use std::{fmt, ops::Deref};

use strum::IntoStaticStr;

use crate::{pdf::text::decode_text_string, Error, Result};

/// Identifier of an indirect object: object number plus generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    /// The object number
    pub number: u32,
    /// The generation number
    pub generation: u16,
}

impl ObjectId {
    /// Create a new identifier.
    #[must_use]
    pub fn new(number: u32, generation: u16) -> Self {
        ObjectId { number, generation }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// A PDF name, stored decoded (after `#xx` escapes are resolved) without the leading slash.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Vec<u8>);

impl Name {
    /// Create a name from its decoded bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Name(bytes.into())
    }

    /// The decoded bytes of the name.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The name as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn to_str_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    /// Compare against a string without allocating.
    #[must_use]
    pub fn is(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }

    /// Encode the name in PDF syntax, including the leading `/`.
    ///
    /// Bytes outside the printable regular range, `#`, and delimiters are written as `#xx`.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.0.len() + 1);
        out.push(b'/');
        for &byte in &self.0 {
            let regular = (0x21..=0x7E).contains(&byte)
                && byte != b'#'
                && !crate::file::parser::is_delimiter(byte);
            if regular {
                out.push(byte);
            } else {
                out.extend_from_slice(format!("#{byte:02X}").as_bytes());
            }
        }
        out
    }
}

impl From<&str> for Name {
    fn from(value: &str) -> Self {
        Name(value.as_bytes().to_vec())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.to_str_lossy())
    }
}

/// A PDF string object. `hex` records whether the source used `<...>` syntax.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PdfString {
    /// The decoded string bytes
    pub bytes: Vec<u8>,
    /// `true` if the string was written in hexadecimal form
    pub hex: bool,
}

impl PdfString {
    /// Interpret the bytes as a PDF text string (PDFDocEncoding, UTF-16BE or UTF-8 with BOM).
    #[must_use]
    pub fn to_text(&self) -> String {
        decode_text_string(&self.bytes)
    }
}

/// A stream: its dictionary plus the still-encoded data between `stream` and `endstream`.
#[derive(Clone, Debug, PartialEq)]
pub struct Stream {
    /// The stream dictionary
    pub dict: Dictionary,
    /// Raw (filtered) stream data
    pub data: Vec<u8>,
}

/// An ordered dictionary. Source order is preserved so rewrites keep the original layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dictionary {
    entries: Vec<(Name, Value)>,
}

impl Dictionary {
    /// Create an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Dictionary::default()
    }

    /// Append an entry. A later duplicate key shadows an earlier one in lookups.
    pub fn push(&mut self, key: Name, value: Value) {
        self.entries.push((key, value));
    }

    /// Look up a key. When a key appears more than once, the last occurrence wins.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|(name, _)| name.is(key))
            .map(|(_, value)| value)
    }

    /// `true` if the key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over the entries in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&Name, &Value)> {
        self.entries.iter().map(|(name, value)| (name, value))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the dictionary has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convenience lookup of a name-valued key, without resolving references.
    #[must_use]
    pub fn get_name(&self, key: &str) -> Option<&Name> {
        self.get(key).and_then(|value| value.as_name())
    }

    /// `true` if `/Subtype` is `/Widget`.
    #[must_use]
    pub fn is_widget(&self) -> bool {
        self.get_name("Subtype").is_some_and(|name| name.is("Widget"))
    }
}

/// A decoded PDF object.
#[derive(Clone, Debug, PartialEq, IntoStaticStr)]
pub enum Object {
    /// `null`
    Null,
    /// `true` / `false`
    Boolean(bool),
    /// Integer number
    Integer(i64),
    /// Real number
    Real(f64),
    /// `/Name`
    Name(Name),
    /// Literal or hexadecimal string
    String(PdfString),
    /// `[ ... ]`
    Array(Vec<Value>),
    /// `<< ... >>`
    Dictionary(Dictionary),
    /// Dictionary followed by stream data; only valid as an indirect object body
    Stream(Stream),
    /// `N G R`
    Reference(ObjectId),
}

impl Object {
    /// The variant name, e.g. `"Dictionary"`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// The dictionary of a `Dictionary`, or the stream dictionary of a `Stream`.
    #[must_use]
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(&stream.dict),
            _ => None,
        }
    }

    /// The items of an `Array`.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Object::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The payload of a `Stream`.
    #[must_use]
    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    /// The payload of a `Name`.
    #[must_use]
    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Object::Name(name) => Some(name),
            _ => None,
        }
    }

    /// The payload of a `String`.
    #[must_use]
    pub fn as_string(&self) -> Option<&PdfString> {
        match self {
            Object::String(string) => Some(string),
            _ => None,
        }
    }

    /// The target of a `Reference`.
    #[must_use]
    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            Object::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// The value of an `Integer`; reals are truncated.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Object::Integer(value) => Some(*value),
            #[allow(clippy::cast_possible_truncation)]
            Object::Real(value) => Some(*value as i64),
            _ => None,
        }
    }

    /// The value of any number.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Object::Integer(value) => Some(*value as f64),
            Object::Real(value) => Some(*value),
            _ => None,
        }
    }

    /// Dictionary access that reports a [`Error::TypeMismatch`] for other kinds.
    ///
    /// # Errors
    /// Returns [`Error::TypeMismatch`] if the object is neither a dictionary nor a stream.
    pub fn expect_dict(&self) -> Result<&Dictionary> {
        self.as_dict().ok_or(Error::TypeMismatch {
            expected: "Dictionary",
            found: self.kind(),
        })
    }

    /// Array access that reports a [`Error::TypeMismatch`] for other kinds.
    ///
    /// # Errors
    /// Returns [`Error::TypeMismatch`] if the object is not an array.
    pub fn expect_array(&self) -> Result<&[Value]> {
        self.as_array().ok_or(Error::TypeMismatch {
            expected: "Array",
            found: self.kind(),
        })
    }
}

/// An [`Object`] together with the exact bytes it was parsed from.
///
/// `raw` never includes leading whitespace. For an indirect object it is the body between
/// `N G obj` and `endobj`. Values built in memory (e.g. in tests) carry an encoding produced by
/// [`Value::synthetic`].
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    /// The decoded object
    pub object: Object,
    /// The source encoding of the object
    pub raw: Vec<u8>,
}

impl Value {
    /// Pair an object with its encoding.
    #[must_use]
    pub fn new(object: Object, raw: Vec<u8>) -> Self {
        Value { object, raw }
    }

    /// Build a value for an object that has no source encoding, e.g. a reference created in
    /// memory. Only leaf objects and references are supported.
    #[must_use]
    pub fn synthetic(object: Object) -> Self {
        let raw = match &object {
            Object::Null => b"null".to_vec(),
            Object::Boolean(value) => value.to_string().into_bytes(),
            Object::Integer(value) => value.to_string().into_bytes(),
            Object::Real(value) => crate::pdf::writer::format_number(*value).into_bytes(),
            Object::Name(name) => name.encode(),
            Object::String(string) => crate::pdf::text::escape_literal(&string.bytes),
            Object::Reference(id) => id.to_string().into_bytes(),
            Object::Array(_) | Object::Dictionary(_) | Object::Stream(_) => Vec::new(),
        };
        Value { object, raw }
    }
}

impl Deref for Value {
    type Target = Object;

    fn deref(&self) -> &Object {
        &self.object
    }
}
