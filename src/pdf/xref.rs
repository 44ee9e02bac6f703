//! Cross-reference parsing.
//!
//! A PDF file that has been updated incrementally carries several cross-reference sections,
//! linked newest-first through `/Prev`. Each section is either a classic `xref` table followed by
//! a `trailer` dictionary, or a cross-reference stream (PDF 1.5+). Hybrid files add an
//! `/XRefStm` to a classic trailer. [`Xref::parse`] walks the whole chain and merges it so that
//! the entry seen first, i.e. in the newest section, wins.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::{
    file::parser::{rfind, Parser},
    pdf::{filter, Dictionary, Object},
    Result,
};

/// Where an object lives, according to the cross-reference data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum XrefEntry {
    /// The object number is free
    Free,
    /// A top-level indirect object at `offset`
    InUse {
        /// Byte offset of `N G obj`
        offset: usize,
        /// The generation number
        generation: u16,
    },
    /// An object stored inside an object stream
    Compressed {
        /// Object number of the containing object stream
        stream: u32,
        /// Index of the object within the stream
        index: u32,
    },
}

/// The merged cross-reference data of a document.
#[derive(Debug, Default)]
pub struct Xref {
    entries: BTreeMap<u32, XrefEntry>,
    trailer: Dictionary,
    startxref: usize,
    stream_section: bool,
}

impl Xref {
    /// Locate `startxref` and parse the whole section chain.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `startxref` is missing or the newest section cannot
    /// be parsed. Broken older sections are skipped with a debug event.
    pub fn parse(data: &[u8]) -> Result<Xref> {
        let Some(keyword) = rfind(data, b"startxref") else {
            return Err(malformed_error!("No startxref keyword found"));
        };

        let mut parser = Parser::new(data);
        parser.seek(keyword + 9)?;
        let startxref = usize::try_from(parser.read_unsigned()?)
            .map_err(|_| malformed_error!("startxref offset out of range"))?;
        if startxref >= data.len() {
            return Err(malformed_error!(
                "startxref offset {} beyond end of file ({} bytes)",
                startxref,
                data.len()
            ));
        }

        let mut xref = Xref {
            startxref,
            ..Xref::default()
        };

        let mut visited = HashSet::new();
        let mut next = Some(startxref);
        let mut newest = true;

        while let Some(offset) = next.take() {
            if !visited.insert(offset) {
                debug!(offset, "xref /Prev chain loops, stopping");
                break;
            }

            let section = match Section::parse(data, offset) {
                Ok(section) => section,
                Err(error) if !newest => {
                    debug!(offset, %error, "skipping unreadable older xref section");
                    break;
                }
                Err(error) => return Err(error),
            };

            debug!(
                offset,
                entries = section.entries.len(),
                stream = section.is_stream,
                "parsed xref section"
            );

            next = section
                .trailer
                .get("Prev")
                .and_then(|value| value.as_i64())
                .and_then(|prev| usize::try_from(prev).ok());

            for (number, entry) in section.entries {
                xref.entries.entry(number).or_insert(entry);
            }

            if newest {
                xref.trailer = section.trailer;
                xref.stream_section = section.is_stream;
                newest = false;
            }
        }

        Ok(xref)
    }

    /// Look up an object number.
    #[must_use]
    pub fn get(&self, number: u32) -> Option<XrefEntry> {
        self.entries.get(&number).copied()
    }

    /// The trailer of the newest section (the stream dictionary for xref streams).
    #[must_use]
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// Offset of the newest section.
    #[must_use]
    pub fn startxref(&self) -> usize {
        self.startxref
    }

    /// `true` if the newest section is a cross-reference stream.
    #[must_use]
    pub fn is_stream(&self) -> bool {
        self.stream_section
    }

    /// Highest object number with an entry.
    #[must_use]
    pub fn max_number(&self) -> Option<u32> {
        self.entries.keys().next_back().copied()
    }

    /// Number of entries in the merged table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no entries were found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

struct Section {
    entries: Vec<(u32, XrefEntry)>,
    trailer: Dictionary,
    is_stream: bool,
}

impl Section {
    fn parse(data: &[u8], offset: usize) -> Result<Section> {
        let mut parser = Parser::new(data);
        parser.seek(offset)?;
        parser.skip_whitespace();

        if data[parser.pos()..].starts_with(b"xref") {
            Self::parse_table(data, &mut parser)
        } else {
            Self::parse_stream(&mut parser)
        }
    }

    fn parse_table(data: &[u8], parser: &mut Parser<'_>) -> Result<Section> {
        parser.expect_keyword(b"xref")?;

        let mut entries = Vec::new();
        loop {
            parser.skip_whitespace();
            if data[parser.pos()..].starts_with(b"trailer") {
                parser.expect_keyword(b"trailer")?;
                break;
            }

            let first = u32::try_from(parser.read_unsigned()?)
                .map_err(|_| malformed_error!("xref subsection start out of range"))?;
            let count = parser.read_unsigned()?;

            for index in 0..count {
                let position = parser.read_unsigned()?;
                let generation = parser.read_unsigned()?;
                let kind = parser.read_keyword()?;
                let number = u32::try_from(index)
                    .ok()
                    .and_then(|index| first.checked_add(index))
                    .ok_or_else(|| malformed_error!("xref object number overflow"))?;

                let entry = match kind {
                    b"n" => XrefEntry::InUse {
                        offset: usize::try_from(position)
                            .map_err(|_| malformed_error!("xref offset out of range"))?,
                        generation: u16::try_from(generation).unwrap_or(u16::MAX),
                    },
                    b"f" => XrefEntry::Free,
                    other => {
                        return Err(malformed_error!(
                            "Invalid xref entry type '{}'",
                            String::from_utf8_lossy(other)
                        ))
                    }
                };
                entries.push((number, entry));
            }
        }

        let trailer = parser.parse_object()?.expect_dict()?.clone();

        if let Some(stm) = trailer
            .get("XRefStm")
            .and_then(|value| value.as_i64())
            .and_then(|offset| usize::try_from(offset).ok())
        {
            // Hybrid file: in-use table entries win, the stream fills in everything else
            let mut stream_parser = Parser::new(data);
            stream_parser.seek(stm)?;
            let hidden = Self::parse_stream(&mut stream_parser)?;
            let mut merged: BTreeMap<u32, XrefEntry> = hidden.entries.into_iter().collect();
            for (number, entry) in entries {
                if matches!(entry, XrefEntry::InUse { .. }) || !merged.contains_key(&number) {
                    merged.insert(number, entry);
                }
            }
            entries = merged.into_iter().collect();
        }

        Ok(Section {
            entries,
            trailer,
            is_stream: false,
        })
    }

    fn parse_stream(parser: &mut Parser<'_>) -> Result<Section> {
        let (_, value) = parser.parse_indirect(&|_| None)?;
        let Object::Stream(stream) = value.object else {
            return Err(malformed_error!(
                "Expected an xref table or stream, found {}",
                value.kind()
            ));
        };

        if !stream
            .dict
            .get_name("Type")
            .is_some_and(|name| name.is("XRef"))
        {
            return Err(malformed_error!("Cross-reference stream lacks /Type /XRef"));
        }

        let mut decoded = stream.data.clone();
        let filters: Vec<_> = match stream.dict.get("Filter").map(|value| &value.object) {
            Some(Object::Name(name)) => vec![name.clone()],
            Some(Object::Array(items)) => items.iter().filter_map(|v| v.as_name().cloned()).collect(),
            _ => Vec::new(),
        };
        for (index, name) in filters.iter().enumerate() {
            let params = match stream.dict.get("DecodeParms").map(|value| &value.object) {
                Some(Object::Dictionary(dict)) if index == 0 => Some(dict),
                Some(Object::Array(items)) => items.get(index).and_then(|v| v.as_dict()),
                _ => None,
            };
            decoded = filter::apply(name, &decoded, params)?;
        }

        let widths: Vec<usize> = stream
            .dict
            .get("W")
            .and_then(|value| value.as_array())
            .ok_or_else(|| malformed_error!("Cross-reference stream lacks /W"))?
            .iter()
            .map(|value| {
                value
                    .as_i64()
                    .and_then(|width| usize::try_from(width).ok())
                    .filter(|&width| width <= 8)
                    .ok_or_else(|| malformed_error!("Invalid /W entry"))
            })
            .collect::<Result<_>>()?;
        if widths.len() != 3 {
            return Err(malformed_error!("/W must have three entries"));
        }

        let size = stream
            .dict
            .get("Size")
            .and_then(|value| value.as_i64())
            .ok_or_else(|| malformed_error!("Cross-reference stream lacks /Size"))?;
        let ranges: Vec<(i64, i64)> = match stream.dict.get("Index").and_then(|v| v.as_array()) {
            Some(items) => items
                .chunks_exact(2)
                .filter_map(|pair| Some((pair[0].as_i64()?, pair[1].as_i64()?)))
                .collect(),
            None => vec![(0, size)],
        };

        let row = widths.iter().sum::<usize>();
        if row == 0 {
            return Err(malformed_error!("/W describes empty rows"));
        }

        let mut rows = decoded.chunks_exact(row);
        let mut entries = Vec::new();
        for (first, count) in ranges {
            for index in 0..count {
                let Some(bytes) = rows.next() else {
                    return Err(malformed_error!("Cross-reference stream is truncated"));
                };
                let number = u32::try_from(first + index)
                    .map_err(|_| malformed_error!("xref object number out of range"))?;

                let (kind_bytes, rest) = bytes.split_at(widths[0]);
                let (second, third) = rest.split_at(widths[1]);
                let kind = if widths[0] == 0 { 1 } else { read_be(kind_bytes) };
                let second = read_be(second);
                let third = read_be(third);

                let entry = match kind {
                    0 => XrefEntry::Free,
                    1 => XrefEntry::InUse {
                        offset: usize::try_from(second)
                            .map_err(|_| malformed_error!("xref offset out of range"))?,
                        generation: u16::try_from(third).unwrap_or(u16::MAX),
                    },
                    2 => XrefEntry::Compressed {
                        stream: u32::try_from(second)
                            .map_err(|_| malformed_error!("object stream number out of range"))?,
                        index: u32::try_from(third)
                            .map_err(|_| malformed_error!("object stream index out of range"))?,
                    },
                    // Unknown types are treated as null references
                    _ => XrefEntry::Free,
                };
                entries.push((number, entry));
            }
        }

        Ok(Section {
            entries,
            trailer: stream.dict,
            is_stream: true,
        })
    }
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0_u64, |acc, &byte| (acc << 8) | u64::from(byte))
}
