//! Append-only writer for incremental updates.
//!
//! [`IncrementalWriter`] starts from a copy of the template bytes and appends new object bodies,
//! one at a time, followed by a cross-reference section and trailer in [`IncrementalWriter::finish`].
//!
//! # Write Discipline
//!
//! The writer enforces the ordering constraints an incremental update needs. Violations are
//! reported as [`crate::Error::WriteOrder`]:
//!
//! - Only one object may be open at a time; an object must be ended before the next starts
//! - An object number may be written at most once per update
//! - Containers (dictionaries, arrays) must be balanced before an object ends
//! - `finish` requires that no object is open
//!
//! # Example
//!
//! ```rust
//! use acroscope::pdf::{Document, IncrementalWriter, ObjectId};
//!
//! # let template = acroscope::pdf::writer::minimal_document();
//! let doc = Document::parse(&template)?;
//! let mut writer = IncrementalWriter::new(&doc)?;
//!
//! let id = writer.allocate_id();
//! writer.start_object(id)?;
//! writer.start_dictionary()?;
//! writer.write_key("Answer")?;
//! writer.write_integer(42)?;
//! writer.end_dictionary()?;
//! writer.end_object()?;
//!
//! let output = writer.finish()?;
//! assert!(output.starts_with(&template));
//! # Ok::<(), acroscope::Error>(())
//! ```

use std::collections::BTreeMap;

use md5::{Digest, Md5};
use tracing::trace;

use crate::{
    file::parser::is_whitespace,
    pdf::{text::escape_literal, Document, Name, Object, ObjectId, Value},
    Error::NotSupported,
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Container {
    Dictionary,
    Array,
}

/// Format a number for content streams and object bodies.
///
/// Integral values are written without a decimal point; others with at most four decimals and
/// no trailing zeros.
#[must_use]
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation)]
        return format!("{}", rounded as i64);
    }
    let text = format!("{rounded:.4}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn hex(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() * 2 + 2);
    out.push(b'<');
    for byte in bytes {
        out.extend_from_slice(format!("{byte:02X}").as_bytes());
    }
    out.push(b'>');
    out
}

/// Serialize a value, preferring its source bytes.
fn encode(value: &Value) -> Vec<u8> {
    if !value.raw.is_empty() {
        return value.raw.clone();
    }
    match &value.object {
        Object::Array(items) => {
            let mut out = vec![b'['];
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(b' ');
                }
                out.extend(encode(item));
            }
            out.push(b']');
            out
        }
        Object::Dictionary(dict) => {
            let mut out = b"<<".to_vec();
            for (key, item) in dict.iter() {
                out.push(b' ');
                out.extend(key.encode());
                out.push(b' ');
                out.extend(encode(item));
            }
            out.extend_from_slice(b" >>");
            out
        }
        Object::Stream(_) => b"null".to_vec(),
        other => Value::synthetic(other.clone()).raw,
    }
}

/// Append-only writer producing one incremental-update section.
pub struct IncrementalWriter {
    out: Vec<u8>,
    original_len: usize,
    body_start: usize,
    next_number: u32,
    offsets: BTreeMap<u32, (usize, u16)>,
    open: Option<(ObjectId, usize)>,
    containers: Vec<Container>,
    prev: usize,
    xref_stream: bool,
    root: Option<Vec<u8>>,
    info: Option<Vec<u8>>,
    first_id: Option<Vec<u8>>,
}

impl IncrementalWriter {
    /// Create a writer for an update of `doc`.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if the document is encrypted.
    pub fn new(doc: &Document<'_>) -> Result<IncrementalWriter> {
        if doc.is_encrypted() {
            return Err(NotSupported(
                "encrypted documents cannot be updated".to_string(),
            ));
        }

        let data = doc.data();
        let mut out = Vec::with_capacity(data.len() + 4096);
        out.extend_from_slice(data);
        let original_len = out.len();
        if !matches!(out.last(), Some(b'\n' | b'\r')) {
            out.push(b'\n');
        }

        let trailer = doc.trailer();
        let first_id = trailer
            .get("ID")
            .and_then(|value| value.as_array())
            .and_then(|ids| ids.first())
            .filter(|first| first.as_string().is_some())
            .map(encode);

        Ok(IncrementalWriter {
            body_start: out.len(),
            out,
            original_len,
            next_number: doc.next_object_number(),
            offsets: BTreeMap::new(),
            open: None,
            containers: Vec::new(),
            prev: doc.startxref(),
            xref_stream: doc.uses_xref_stream(),
            root: trailer.get("Root").map(encode),
            info: trailer.get("Info").map(encode),
            first_id,
        })
    }

    /// Reserve a fresh object id. Ids are handed out in increasing order.
    pub fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId::new(self.next_number, 0);
        self.next_number += 1;
        id
    }

    /// Begin the body of object `id`.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] if another object is open or `id` was already
    /// written in this update.
    pub fn start_object(&mut self, id: ObjectId) -> Result<()> {
        if let Some((open, _)) = self.open {
            return Err(write_order_error!(
                "cannot start object {} while object {} is open",
                id,
                open
            ));
        }
        if self.offsets.contains_key(&id.number) {
            return Err(write_order_error!("object {} written twice", id));
        }

        self.offsets.insert(id.number, (self.out.len(), id.generation));
        self.out
            .extend_from_slice(format!("{} {} obj\n", id.number, id.generation).as_bytes());
        self.open = Some((id, self.out.len()));
        if id.number >= self.next_number {
            self.next_number = id.number + 1;
        }
        Ok(())
    }

    /// Finish the open object.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] if no object is open or containers are unbalanced.
    pub fn end_object(&mut self) -> Result<ObjectId> {
        let Some((id, _)) = self.open else {
            return Err(write_order_error!("end_object without an open object"));
        };
        if !self.containers.is_empty() {
            return Err(write_order_error!(
                "object {} ended with {} open container(s)",
                id,
                self.containers.len()
            ));
        }

        self.out.extend_from_slice(b"\nendobj\n");
        self.open = None;
        trace!(object = %id, "object written");
        Ok(id)
    }

    /// The currently open object, if any.
    #[must_use]
    pub fn open_object(&self) -> Option<ObjectId> {
        self.open.map(|(id, _)| id)
    }

    /// `true` if an object is open and nothing has been written to its body yet.
    #[must_use]
    pub fn at_body_start(&self) -> bool {
        self.open
            .is_some_and(|(_, body_start)| body_start == self.out.len())
    }

    /// `true` if `number` has been written in this update.
    #[must_use]
    pub fn is_written(&self, number: u32) -> bool {
        self.offsets.contains_key(&number)
    }

    fn require_open(&self, what: &str) -> Result<()> {
        if self.open.is_none() {
            return Err(write_order_error!("{} outside of an object body", what));
        }
        Ok(())
    }

    fn token(&mut self, bytes: &[u8]) {
        let separate = match (self.out.last(), bytes.first()) {
            (Some(&last), Some(&first)) => {
                !is_whitespace(last) && last != b'[' && first != b']'
            }
            _ => false,
        };
        if separate {
            self.out.push(b' ');
        }
        self.out.extend_from_slice(bytes);
    }

    /// Open a dictionary (`<<`).
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] outside of an object body.
    pub fn start_dictionary(&mut self) -> Result<()> {
        self.require_open("dictionary")?;
        self.token(b"<<");
        self.containers.push(Container::Dictionary);
        Ok(())
    }

    /// Close the innermost dictionary (`>>`).
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] if the innermost container is not a dictionary.
    pub fn end_dictionary(&mut self) -> Result<()> {
        if self.containers.last() != Some(&Container::Dictionary) {
            return Err(write_order_error!("end_dictionary without matching start"));
        }
        self.containers.pop();
        self.token(b">>");
        Ok(())
    }

    /// Open an array (`[`).
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] outside of an object body.
    pub fn start_array(&mut self) -> Result<()> {
        self.require_open("array")?;
        self.token(b"[");
        self.containers.push(Container::Array);
        Ok(())
    }

    /// Close the innermost array (`]`).
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] if the innermost container is not an array.
    pub fn end_array(&mut self) -> Result<()> {
        if self.containers.last() != Some(&Container::Array) {
            return Err(write_order_error!("end_array without matching start"));
        }
        self.containers.pop();
        self.token(b"]");
        Ok(())
    }

    /// Write a dictionary key.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] unless the innermost container is a dictionary.
    pub fn write_key(&mut self, key: &str) -> Result<()> {
        self.write_key_name(&Name::from(key))
    }

    /// Write a dictionary key given as a [`Name`].
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] unless the innermost container is a dictionary.
    pub fn write_key_name(&mut self, key: &Name) -> Result<()> {
        if self.containers.last() != Some(&Container::Dictionary) {
            return Err(write_order_error!("key {} outside of a dictionary", key));
        }
        self.token(&key.encode());
        Ok(())
    }

    /// Write a name value.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] outside of an object body.
    pub fn write_name(&mut self, name: &str) -> Result<()> {
        self.write_name_value(&Name::from(name))
    }

    /// Write a name value given as a [`Name`].
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] outside of an object body.
    pub fn write_name_value(&mut self, name: &Name) -> Result<()> {
        self.require_open("name")?;
        self.token(&name.encode());
        Ok(())
    }

    /// Write an indirect reference `N G R`.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] outside of an object body.
    pub fn write_reference(&mut self, id: ObjectId) -> Result<()> {
        self.require_open("reference")?;
        self.token(id.to_string().as_bytes());
        Ok(())
    }

    /// Write an integer.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] outside of an object body.
    pub fn write_integer(&mut self, value: i64) -> Result<()> {
        self.require_open("integer")?;
        self.token(value.to_string().as_bytes());
        Ok(())
    }

    /// Write a real number using [`format_number`].
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] outside of an object body.
    pub fn write_real(&mut self, value: f64) -> Result<()> {
        self.require_open("real")?;
        self.token(format_number(value).as_bytes());
        Ok(())
    }

    /// Write a literal string `( ... )` with the required escapes.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] outside of an object body.
    pub fn write_literal_string(&mut self, bytes: &[u8]) -> Result<()> {
        self.require_open("string")?;
        self.token(&escape_literal(bytes));
        Ok(())
    }

    /// Write a hexadecimal string `< ... >`.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] outside of an object body.
    pub fn write_hex_string(&mut self, bytes: &[u8]) -> Result<()> {
        self.require_open("string")?;
        self.token(&hex(bytes));
        Ok(())
    }

    /// Write a value byte-for-byte as it appeared in the source.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] outside of an object body.
    pub fn copy_verbatim(&mut self, value: &Value) -> Result<()> {
        self.require_open("value")?;
        self.token(&encode(value));
        Ok(())
    }

    /// Write stream data after the (already closed) stream dictionary.
    ///
    /// The caller is responsible for a matching `/Length` entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] outside of an object body or with open containers.
    pub fn write_stream_data(&mut self, data: &[u8]) -> Result<()> {
        self.require_open("stream")?;
        if !self.containers.is_empty() {
            return Err(write_order_error!("stream data inside an open container"));
        }
        self.out.extend_from_slice(b"\nstream\n");
        self.out.extend_from_slice(data);
        self.out.extend_from_slice(b"\nendstream");
        Ok(())
    }

    /// Number of objects written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.offsets.len()
    }

    /// Append the cross-reference section and trailer and return the complete document.
    ///
    /// If nothing was written the template bytes are returned unchanged.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] if an object is still open.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        if let Some((id, _)) = self.open {
            return Err(write_order_error!("finish while object {} is open", id));
        }

        if self.offsets.is_empty() {
            self.out.truncate(self.original_len);
            return Ok(self.out);
        }

        let digest = Md5::digest(&self.out[self.body_start..]);
        let mut ids = b"[".to_vec();
        match &self.first_id {
            Some(first) => ids.extend_from_slice(first),
            None => ids.extend(hex(&digest)),
        }
        ids.push(b' ');
        ids.extend(hex(&digest));
        ids.push(b']');

        let mut trailer_entries = Vec::new();
        if let Some(root) = &self.root {
            trailer_entries.extend_from_slice(b" /Root ");
            trailer_entries.extend_from_slice(root);
        }
        if let Some(info) = &self.info {
            trailer_entries.extend_from_slice(b" /Info ");
            trailer_entries.extend_from_slice(info);
        }
        trailer_entries.extend_from_slice(format!(" /Prev {}", self.prev).as_bytes());
        trailer_entries.extend_from_slice(b" /ID ");
        trailer_entries.extend(ids);

        let xref_offset = if self.xref_stream {
            self.write_xref_stream(&trailer_entries)
        } else {
            self.write_xref_table(&trailer_entries)
        };

        self.out
            .extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());
        Ok(self.out)
    }

    fn size(&self) -> u32 {
        let written = self
            .offsets
            .keys()
            .next_back()
            .map_or(0, |number| number + 1);
        self.next_number.max(written)
    }

    /// Consecutive runs of written object numbers: `(first, count)`.
    fn runs(&self) -> Vec<(u32, u32)> {
        let mut runs: Vec<(u32, u32)> = Vec::new();
        for &number in self.offsets.keys() {
            match runs.last_mut() {
                Some((first, count)) if *first + *count == number => *count += 1,
                _ => runs.push((number, 1)),
            }
        }
        runs
    }

    fn write_xref_table(&mut self, trailer_entries: &[u8]) -> usize {
        let xref_offset = self.out.len();
        let mut section = b"xref\n".to_vec();
        for (first, count) in self.runs() {
            section.extend_from_slice(format!("{first} {count}\n").as_bytes());
            for number in first..first + count {
                if let Some((offset, generation)) = self.offsets.get(&number) {
                    section.extend_from_slice(
                        format!("{offset:010} {generation:05} n\r\n").as_bytes(),
                    );
                }
            }
        }
        section.extend_from_slice(format!("trailer\n<< /Size {}", self.size()).as_bytes());
        section.extend_from_slice(trailer_entries);
        section.extend_from_slice(b" >>\n");
        self.out.extend(section);
        xref_offset
    }

    fn write_xref_stream(&mut self, trailer_entries: &[u8]) -> usize {
        let id = self.allocate_id();
        let xref_offset = self.out.len();
        self.offsets.insert(id.number, (xref_offset, 0));

        let width = {
            let bits = usize::BITS - xref_offset.leading_zeros();
            (bits.div_ceil(8)).max(1) as usize
        };

        let mut rows = Vec::new();
        for (first, count) in self.runs() {
            for number in first..first + count {
                if let Some((offset, generation)) = self.offsets.get(&number) {
                    rows.push(1_u8);
                    rows.extend_from_slice(&offset.to_be_bytes()[usize::BITS as usize / 8 - width..]);
                    rows.extend_from_slice(&generation.to_be_bytes());
                }
            }
        }

        let index = self
            .runs()
            .iter()
            .map(|(first, count)| format!("{first} {count}"))
            .collect::<Vec<_>>()
            .join(" ");

        let mut object = format!(
            "{} 0 obj\n<< /Type /XRef /Size {} /W [1 {} 2] /Index [{}]",
            id.number,
            self.size(),
            width,
            index
        )
        .into_bytes();
        object.extend_from_slice(trailer_entries);
        object.extend_from_slice(format!(" /Length {} >>\nstream\n", rows.len()).as_bytes());
        object.extend(rows);
        object.extend_from_slice(b"\nendstream\nendobj\n");
        self.out.extend(object);
        xref_offset
    }
}

/// A one-page document without a form, used in documentation examples.
#[doc(hidden)]
#[must_use]
pub fn minimal_document() -> Vec<u8> {
    let mut data = b"%PDF-1.4\n".to_vec();
    let catalog = data.len();
    data.extend_from_slice(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n");
    let xref = data.len();
    data.extend_from_slice(
        format!(
            "xref\n0 2\n0000000000 65535 f\r\n{catalog:010} 00000 n\r\ntrailer\n<< /Size 2 /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n"
        )
        .as_bytes(),
    );
    data
}
