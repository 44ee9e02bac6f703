//! Read access to the object graph of a parsed PDF.
//!
//! [`Document`] borrows the file bytes and answers object lookups through the merged
//! cross-reference data. Top-level objects are parsed on demand from their offsets. Objects
//! stored in object streams are served from a per-document cache of decoded streams.
//!
//! # Thread Safety
//!
//! `Document` is `Send + Sync`. The object-stream cache is a [`DashMap`], so concurrent fills of
//! the same template share decoded streams without external locking.

use std::{borrow::Cow, sync::Arc};

use dashmap::DashMap;
use tracing::debug;

use crate::{
    file::parser::Parser,
    pdf::{
        filter,
        xref::{Xref, XrefEntry},
        Dictionary, Object, ObjectId, Stream, Value,
    },
    Error::{Empty, MissingObject, RecursionLimit},
    Result,
};

/// Maximum number of references followed by [`Document::resolve`].
pub const MAX_REFERENCE_CHAIN: usize = 32;

/// A decoded object stream: `(object number, value)` in index order.
#[derive(Debug)]
struct ObjectStream {
    objects: Vec<(u32, Value)>,
}

/// A parsed PDF document borrowing its bytes.
pub struct Document<'a> {
    data: &'a [u8],
    xref: Xref,
    object_streams: DashMap<u32, Arc<ObjectStream>>,
}

impl<'a> Document<'a> {
    /// Parse the cross-reference structure of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] for empty input and [`crate::Error::Malformed`] if the
    /// cross-reference data cannot be read.
    pub fn parse(data: &'a [u8]) -> Result<Document<'a>> {
        if data.is_empty() {
            return Err(Empty);
        }

        let xref = Xref::parse(data)?;
        debug!(
            objects = xref.len(),
            startxref = xref.startxref(),
            xref_stream = xref.is_stream(),
            "parsed document structure"
        );

        Ok(Document {
            data,
            xref,
            object_streams: DashMap::new(),
        })
    }

    /// The complete file bytes.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The trailer of the newest cross-reference section.
    #[must_use]
    pub fn trailer(&self) -> &Dictionary {
        self.xref.trailer()
    }

    /// Offset of the newest cross-reference section.
    #[must_use]
    pub fn startxref(&self) -> usize {
        self.xref.startxref()
    }

    /// `true` if the newest cross-reference section is a stream.
    #[must_use]
    pub fn uses_xref_stream(&self) -> bool {
        self.xref.is_stream()
    }

    /// `true` if the trailer declares an `/Encrypt` dictionary.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.trailer().contains("Encrypt")
    }

    /// The first object number not used by the document.
    ///
    /// This is the larger of the trailer's `/Size` and one past the highest number present in the
    /// cross-reference data.
    #[must_use]
    pub fn next_object_number(&self) -> u32 {
        let size = self
            .trailer()
            .get("Size")
            .and_then(|value| value.as_i64())
            .and_then(|size| u32::try_from(size).ok())
            .unwrap_or(0);
        let used = self
            .xref
            .max_number()
            .map_or(0, |number| number.saturating_add(1));
        size.max(used).max(1)
    }

    /// Fetch an indirect object by id.
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingObject`] if the object is free, absent, or has a different
    /// generation. Returns [`crate::Error::Malformed`] if the object body cannot be parsed.
    pub fn get(&self, id: ObjectId) -> Result<Value> {
        match self.xref.get(id.number) {
            Some(XrefEntry::InUse { offset, generation }) if generation == id.generation => {
                self.parse_at(id, offset)
            }
            Some(XrefEntry::Compressed { stream, index }) if id.generation == 0 => {
                let objects = self.object_stream(stream)?;
                let found = usize::try_from(index)
                    .ok()
                    .and_then(|index| objects.objects.get(index))
                    .filter(|(number, _)| *number == id.number)
                    .or_else(|| objects.objects.iter().find(|(number, _)| *number == id.number));
                match found {
                    Some((_, value)) => Ok(value.clone()),
                    None => Err(MissingObject(id)),
                }
            }
            _ => Err(MissingObject(id)),
        }
    }

    /// Follow references until a direct object is reached.
    ///
    /// # Errors
    /// Returns [`crate::Error::RecursionLimit`] if the chain is longer than
    /// [`MAX_REFERENCE_CHAIN`], or any error from [`Document::get`].
    pub fn resolve<'v>(&self, value: &'v Value) -> Result<Cow<'v, Value>> {
        let mut current = Cow::Borrowed(value);
        for _ in 0..MAX_REFERENCE_CHAIN {
            let Some(id) = current.as_reference() else {
                return Ok(current);
            };
            current = Cow::Owned(self.get(id)?);
        }
        Err(RecursionLimit(MAX_REFERENCE_CHAIN))
    }

    /// Resolve a dictionary entry, returning `None` if the key is absent.
    ///
    /// # Errors
    /// Returns any error from [`Document::resolve`].
    pub fn resolve_key<'v>(&self, dict: &'v Dictionary, key: &str) -> Result<Option<Cow<'v, Value>>> {
        dict.get(key).map(|value| self.resolve(value)).transpose()
    }

    /// The document catalog (`/Root`).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the trailer has no `/Root` and
    /// [`crate::Error::TypeMismatch`] if it is not a dictionary.
    pub fn catalog(&self) -> Result<(ObjectId, Dictionary)> {
        let root = self
            .trailer()
            .get("Root")
            .ok_or_else(|| malformed_error!("Trailer has no /Root"))?;
        let id = root
            .as_reference()
            .ok_or_else(|| malformed_error!("Trailer /Root is not a reference"))?;
        let catalog = self.get(id)?;
        Ok((id, catalog.expect_dict()?.clone()))
    }

    /// Decode a stream's data through its `/Filter` chain.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnsupportedFilter`] or [`crate::Error::Decode`] if the data cannot
    /// be decoded.
    pub fn stream_data(&self, stream: &Stream) -> Result<Vec<u8>> {
        let filters: Vec<_> = match self.resolve_key(&stream.dict, "Filter")? {
            Some(value) => match &value.object {
                Object::Name(name) => vec![name.clone()],
                Object::Array(items) => items
                    .iter()
                    .map(|item| {
                        self.resolve(item)?.as_name().cloned().ok_or_else(|| {
                            malformed_error!("Stream /Filter array contains a non-name")
                        })
                    })
                    .collect::<Result<_>>()?,
                Object::Null => Vec::new(),
                other => return Err(malformed_error!("Invalid stream /Filter {}", other.kind())),
            },
            None => Vec::new(),
        };

        if filters.is_empty() {
            return Ok(stream.data.clone());
        }

        let params = self.resolve_key(&stream.dict, "DecodeParms")?;
        let mut data = stream.data.clone();
        for (index, name) in filters.iter().enumerate() {
            let entry = match params.as_deref().map(|value| &value.object) {
                Some(Object::Dictionary(dict)) if index == 0 => Some(Cow::Borrowed(dict)),
                Some(Object::Array(items)) => match items.get(index) {
                    Some(item) => match self.resolve(item)?.into_owned().object {
                        Object::Dictionary(dict) => Some(Cow::Owned(dict)),
                        _ => None,
                    },
                    None => None,
                },
                _ => None,
            };
            data = filter::apply(name, &data, entry.as_deref())?;
        }
        Ok(data)
    }

    fn parse_at(&self, id: ObjectId, offset: usize) -> Result<Value> {
        let mut parser = Parser::new(self.data);
        parser.seek(offset)?;
        let (found, value) = parser.parse_indirect(&|length| self.stream_length(length))?;
        if found.number != id.number {
            return Err(malformed_error!(
                "Offset {} holds object {} instead of {}",
                offset,
                found,
                id
            ));
        }
        Ok(value)
    }

    fn stream_length(&self, id: ObjectId) -> Option<i64> {
        match self.xref.get(id.number)? {
            XrefEntry::InUse { offset, .. } => {
                let mut parser = Parser::new(self.data);
                parser.seek(offset).ok()?;
                let (_, value) = parser.parse_indirect(&|_| None).ok()?;
                value.as_i64()
            }
            // Lengths inside object streams would need the stream being parsed
            XrefEntry::Compressed { .. } | XrefEntry::Free => None,
        }
    }

    fn object_stream(&self, number: u32) -> Result<Arc<ObjectStream>> {
        if let Some(cached) = self.object_streams.get(&number) {
            return Ok(Arc::clone(cached.value()));
        }

        let id = ObjectId::new(number, 0);
        let value = match self.xref.get(number) {
            Some(XrefEntry::InUse { offset, .. }) => self.parse_at(id, offset)?,
            _ => return Err(MissingObject(id)),
        };
        let Object::Stream(stream) = &value.object else {
            return Err(malformed_error!("Object stream {} is not a stream", id));
        };

        let count = stream
            .dict
            .get("N")
            .and_then(|value| value.as_i64())
            .and_then(|count| usize::try_from(count).ok())
            .ok_or_else(|| malformed_error!("Object stream {} lacks /N", id))?;
        let first = stream
            .dict
            .get("First")
            .and_then(|value| value.as_i64())
            .and_then(|first| usize::try_from(first).ok())
            .ok_or_else(|| malformed_error!("Object stream {} lacks /First", id))?;

        let data = self.stream_data(stream)?;
        let mut header = Parser::new(&data);
        let mut offsets = Vec::with_capacity(count.min(data.len()));
        for _ in 0..count {
            let object = u32::try_from(header.read_unsigned()?)
                .map_err(|_| malformed_error!("Object number out of range in {}", id))?;
            let relative = usize::try_from(header.read_unsigned()?)
                .map_err(|_| malformed_error!("Offset out of range in {}", id))?;
            offsets.push((object, relative));
        }

        let mut objects = Vec::with_capacity(offsets.len());
        for (object, relative) in offsets {
            let mut parser = Parser::new(&data);
            parser.seek(first.saturating_add(relative).min(data.len()))?;
            objects.push((object, parser.parse_object()?));
        }

        debug!(stream = number, objects = objects.len(), "decoded object stream");

        let decoded = Arc::new(ObjectStream { objects });
        self.object_streams.insert(number, Arc::clone(&decoded));
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test::PdfBuilder, Error};

    #[test]
    fn get_and_resolve() {
        let data = PdfBuilder::new()
            .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
            .object(2, "<< /Type /Pages /Kids [] /Count 0 /Alias 3 0 R >>")
            .object(3, "4 0 R")
            .object(4, "(end)")
            .build(1);
        let doc = Document::parse(&data).unwrap();

        let (root_id, catalog) = doc.catalog().unwrap();
        assert_eq!(root_id, ObjectId::new(1, 0));
        let pages = doc.resolve(catalog.get("Pages").unwrap()).unwrap();
        let alias = pages.expect_dict().unwrap().get("Alias").unwrap().clone();
        let end = doc.resolve(&alias).unwrap();
        assert_eq!(end.as_string().unwrap().bytes, b"end".to_vec());
        assert_eq!(doc.next_object_number(), 5);
    }

    #[test]
    fn missing_and_wrong_generation() {
        let data = PdfBuilder::new().object(1, "<< >>").build(1);
        let doc = Document::parse(&data).unwrap();
        assert!(matches!(
            doc.get(ObjectId::new(9, 0)),
            Err(Error::MissingObject(_))
        ));
        assert!(matches!(
            doc.get(ObjectId::new(1, 3)),
            Err(Error::MissingObject(_))
        ));
    }

    #[test]
    fn reference_cycle_hits_limit() {
        let data = PdfBuilder::new()
            .object(1, "<< >>")
            .object(2, "3 0 R")
            .object(3, "2 0 R")
            .build(1);
        let doc = Document::parse(&data).unwrap();
        let start = Value::synthetic(Object::Reference(ObjectId::new(2, 0)));
        assert!(matches!(
            doc.resolve(&start),
            Err(Error::RecursionLimit(MAX_REFERENCE_CHAIN))
        ));
    }

    #[test]
    fn compressed_objects() {
        let data = PdfBuilder::new()
            .object(1, "<< /Type /Catalog >>")
            .object_stream(5, &[(6, "<< /T (inside) >>"), (7, "42")])
            .build(1);
        let doc = Document::parse(&data).unwrap();
        assert!(doc.uses_xref_stream());

        let inside = doc.get(ObjectId::new(6, 0)).unwrap();
        let dict = inside.expect_dict().unwrap();
        assert_eq!(dict.get("T").unwrap().raw, b"(inside)".to_vec());
        assert_eq!(doc.get(ObjectId::new(7, 0)).unwrap().as_i64(), Some(42));
        // Second lookup is served from the cache
        assert_eq!(doc.get(ObjectId::new(7, 0)).unwrap().as_i64(), Some(42));
    }

    #[test]
    fn hybrid_xref_stream() {
        let mut data = b"%PDF-1.5\n".to_vec();
        let catalog = data.len();
        data.extend_from_slice(b"1 0 obj\n<< /Type /Catalog >>\nendobj\n");
        let table_copy = data.len();
        data.extend_from_slice(b"2 0 obj\n7\nendobj\n");

        // Object stream 5 holds 3, plus a stale copy of 2
        let content = "3 0 2 3 42\n8\n";
        let object_stream = data.len();
        data.extend_from_slice(
            format!(
                "5 0 obj\n<< /Type /ObjStm /N 2 /First 8 /Length {} >>\nstream\n{content}\nendstream\nendobj\n",
                content.len()
            )
            .as_bytes(),
        );

        let hidden = data.len();
        let mut rows = Vec::new();
        for (kind, second, third) in [
            (0_u8, 0_u32, 0xFFFF_u16),
            (0, 0, 0),
            (2, 5, 1),
            (2, 5, 0),
            (0, 0, 0),
            (1, object_stream as u32, 0),
            (1, hidden as u32, 0),
        ] {
            rows.push(kind);
            rows.extend_from_slice(&second.to_be_bytes());
            rows.extend_from_slice(&third.to_be_bytes());
        }
        data.extend_from_slice(
            format!(
                "6 0 obj\n<< /Type /XRef /Size 7 /W [1 4 2] /Length {} >>\nstream\n",
                rows.len()
            )
            .as_bytes(),
        );
        data.extend_from_slice(&rows);
        data.extend_from_slice(b"\nendstream\nendobj\n");

        let table = data.len();
        data.extend_from_slice(
            format!(
                "xref\n0 3\n0000000000 65535 f\r\n{catalog:010} 00000 n\r\n{table_copy:010} 00000 n\r\ntrailer\n<< /Size 7 /Root 1 0 R /XRefStm {hidden} >>\nstartxref\n{table}\n%%EOF\n"
            )
            .as_bytes(),
        );

        let doc = Document::parse(&data).unwrap();
        assert!(!doc.uses_xref_stream());
        assert_eq!(doc.catalog().unwrap().0, ObjectId::new(1, 0));
        // Only the object stream knows about 3
        assert_eq!(doc.get(ObjectId::new(3, 0)).unwrap().as_i64(), Some(42));
        // The table's in-use entry beats the compressed one
        assert_eq!(doc.get(ObjectId::new(2, 0)).unwrap().as_i64(), Some(7));
        assert!(matches!(
            doc.get(ObjectId::new(4, 0)),
            Err(Error::MissingObject(_))
        ));
    }

    #[test]
    fn flate_stream_data() {
        let data = PdfBuilder::new()
            .object(1, "<< >>")
            .flate_stream(2, "", b"q 1 0 0 1 0 0 cm Q")
            .build(1);
        let doc = Document::parse(&data).unwrap();
        let value = doc.get(ObjectId::new(2, 0)).unwrap();
        let decoded = doc.stream_data(value.as_stream().unwrap()).unwrap();
        assert_eq!(decoded, b"q 1 0 0 1 0 0 cm Q".to_vec());
    }

    #[test]
    fn encrypted_trailer() {
        let data = PdfBuilder::new()
            .object(1, "<< >>")
            .trailer_entry("/Encrypt << /Filter /Standard >>")
            .build(1);
        let doc = Document::parse(&data).unwrap();
        assert!(doc.is_encrypted());
    }

    #[test]
    fn empty_input() {
        assert!(matches!(Document::parse(&[]), Err(Error::Empty)));
    }
}
