//! Cursor-based lexer and object parser for PDF syntax.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a bounds-checked cursor over a
//! byte slice that understands the token grammar of PDF files. It is used for the top-level file
//! structure (indirect objects, cross-reference tables, trailers) as well as for the contents of
//! decoded object streams.
//!
//! # Architecture
//!
//! The parser keeps a single position into the borrowed data. Every successfully parsed object is
//! returned as a [`crate::pdf::Value`], which pairs the decoded [`crate::pdf::Object`] with the
//! exact source bytes it occupied. Nested dictionary and array members carry their own raw spans,
//! so any member can later be copied back into an incremental update without re-encoding.
//!
//! # Key Components
//!
//! ## Navigation Methods
//! - [`crate::file::parser::Parser::seek`] - Move to a specific position
//! - [`crate::file::parser::Parser::advance`] / [`crate::file::parser::Parser::advance_by`]
//! - [`crate::file::parser::Parser::pos`] - Current position
//! - [`crate::file::parser::Parser::skip_whitespace`] - Skip whitespace and comments
//!
//! ## Token Methods
//! - [`crate::file::parser::Parser::read_keyword`] - Read a run of regular characters
//! - [`crate::file::parser::Parser::read_unsigned`] - Read an unsigned decimal integer
//! - [`crate::file::parser::Parser::expect_keyword`] - Require a specific keyword
//!
//! ## Object Methods
//! - [`crate::file::parser::Parser::parse_object`] - Parse any direct object
//! - [`crate::file::parser::Parser::parse_indirect`] - Parse `N G obj ... endobj`, including streams
//!
//! # Usage Examples
//!
//! ```rust
//! use acroscope::Parser;
//!
//! let mut parser = Parser::new(b"<< /FT /Tx /T (name) /Kids [3 0 R] >>");
//! let value = parser.parse_object()?;
//! let dict = value.expect_dict()?;
//! assert!(dict.get_name("FT").is_some_and(|name| name.is("Tx")));
//! assert_eq!(value.raw.len(), 37);
//! # Ok::<(), acroscope::Error>(())
//! ```
//!
//! # Robustness
//!
//! - Nesting of arrays and dictionaries is limited to [`MAX_NESTING_DEPTH`]
//! - A stream whose `/Length` is missing, indirect and unresolvable, or simply wrong is recovered
//!   by scanning for the `endstream` keyword
//! - A missing `endobj` after a complete object body is tolerated

use tracing::trace;

use crate::{
    pdf::{Dictionary, Name, Object, ObjectId, PdfString, Stream, Value},
    Error::{OutOfBounds, RecursionLimit},
    Result,
};

/// Maximum nesting depth of arrays and dictionaries accepted by the parser.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Returns `true` for the six PDF whitespace characters.
#[must_use]
pub fn is_whitespace(byte: u8) -> bool {
    matches!(byte, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

/// Returns `true` for the PDF delimiter characters.
#[must_use]
pub fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Returns `true` for regular characters, i.e. neither whitespace nor delimiter.
#[must_use]
pub fn is_regular(byte: u8) -> bool {
    !is_whitespace(byte) && !is_delimiter(byte)
}

/// Callback used to resolve an indirect stream `/Length`.
///
/// Returns `None` if the length object cannot be found, in which case the parser falls back to
/// scanning for `endstream`.
pub type LengthResolver<'r> = &'r dyn Fn(ObjectId) -> Option<i64>;

/// A bounds-checked cursor over PDF bytes.
///
/// `Parser` reads tokens and objects starting at the current position and leaves the cursor
/// directly behind what it consumed. Errors never move the cursor to an unspecified place when
/// the operation was wrapped in [`Parser::transactional`].
///
/// # Examples
///
/// ```rust
/// use acroscope::Parser;
///
/// let mut parser = Parser::new(b"12 0 obj\n(Hello) \nendobj");
/// let (id, value) = parser.parse_indirect(&|_| None)?;
/// assert_eq!(id.number, 12);
/// assert_eq!(value.raw, b"(Hello)".to_vec());
/// # Ok::<(), acroscope::Error>(())
/// ```
pub struct Parser<'a> {
    /// The data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Total length of the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` while the cursor has not reached the end of the data.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the cursor to an absolute position. Seeking to the end of the data is allowed.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` lies beyond the data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Move the cursor forward by one byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the cursor is already at the end.
    pub fn advance(&mut self) -> Result<()> {
        self.advance_by(1)
    }

    /// Move the cursor forward by `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(end) if end <= self.data.len() => {
                self.position = end;
                Ok(())
            }
            _ => Err(OutOfBounds),
        }
    }

    /// The current position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// The complete underlying data.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Number of bytes between the cursor and the end of the data.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// The byte under the cursor, without advancing.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data.get(self.position).copied().ok_or(OutOfBounds)
    }

    /// Read `length` bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let start = self.position;
        self.advance_by(length)?;
        Ok(&self.data[start..self.position])
    }

    /// Run `f`, restoring the cursor if it fails.
    ///
    /// # Errors
    /// Returns whatever error `f` returns.
    pub fn transactional<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let saved_position = self.position;
        let result = f(self);
        if result.is_err() {
            self.position = saved_position;
        }
        result
    }

    /// Skip whitespace and `%` comments.
    pub fn skip_whitespace(&mut self) {
        while let Some(&byte) = self.data.get(self.position) {
            if is_whitespace(byte) {
                self.position += 1;
            } else if byte == b'%' {
                while let Some(&byte) = self.data.get(self.position) {
                    if byte == b'\r' || byte == b'\n' {
                        break;
                    }
                    self.position += 1;
                }
            } else {
                break;
            }
        }
    }

    /// Skip whitespace and comments, then read a run of regular characters.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if no regular character follows, or
    /// [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn read_keyword(&mut self) -> Result<&'a [u8]> {
        self.skip_whitespace();
        let start = self.position;
        while self.data.get(self.position).is_some_and(|&b| is_regular(b)) {
            self.position += 1;
        }

        if start == self.position {
            if start >= self.data.len() {
                return Err(OutOfBounds);
            }
            return Err(malformed_error!(
                "Expected a keyword at offset {}, found byte 0x{:02X}",
                start,
                self.data[start]
            ));
        }

        Ok(&self.data[start..self.position])
    }

    /// Read a keyword and require it to equal `keyword`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if a different token is found.
    pub fn expect_keyword(&mut self, keyword: &[u8]) -> Result<()> {
        let start = self.position;
        let found = self.read_keyword()?;
        if found != keyword {
            return Err(malformed_error!(
                "Expected '{}' at offset {}, found '{}'",
                String::from_utf8_lossy(keyword),
                start,
                String::from_utf8_lossy(found)
            ));
        }
        Ok(())
    }

    /// Read an unsigned decimal integer (after skipping whitespace).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the token is not a plain unsigned integer.
    pub fn read_unsigned(&mut self) -> Result<u64> {
        let token = self.read_keyword()?;
        parse_unsigned(token).ok_or_else(|| {
            malformed_error!(
                "Expected an unsigned integer, found '{}'",
                String::from_utf8_lossy(token)
            )
        })
    }

    /// Parse one direct object at the cursor.
    ///
    /// References (`N G R`) are recognised. Streams are not: they are only valid as indirect
    /// object bodies, see [`Parser::parse_indirect`].
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] on invalid syntax and
    /// [`crate::Error::RecursionLimit`] when containers nest deeper than [`MAX_NESTING_DEPTH`].
    pub fn parse_object(&mut self) -> Result<Value> {
        self.parse_value(0)
    }

    /// Parse an indirect object `N G obj <body> endobj` at the cursor.
    ///
    /// The returned value's `raw` bytes span the body only. For a stream it covers the dictionary
    /// through `endstream`. `length` resolves an indirect `/Length`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the object header or body is invalid.
    pub fn parse_indirect(&mut self, length: LengthResolver<'_>) -> Result<(ObjectId, Value)> {
        let number = self.read_unsigned()?;
        let generation = self.read_unsigned()?;
        self.expect_keyword(b"obj")?;

        let id = ObjectId::new(
            u32::try_from(number)
                .map_err(|_| malformed_error!("Object number {} out of range", number))?,
            u16::try_from(generation)
                .map_err(|_| malformed_error!("Generation {} out of range", generation))?,
        );

        self.skip_whitespace();
        let body_start = self.position;
        let mut value = self.parse_value(0)?;

        if let Object::Dictionary(dict) = &value.object {
            let after_dict = self.position;
            self.skip_whitespace();
            if self.data[self.position..].starts_with(b"stream") {
                self.position += 6;
                let data = self.read_stream_data(dict, length)?;
                value = Value::new(
                    Object::Stream(Stream {
                        dict: dict.clone(),
                        data,
                    }),
                    self.data[body_start..self.position].to_vec(),
                );
            } else {
                self.position = after_dict;
            }
        }

        let body_end = self.position;
        if self
            .transactional(|parser| parser.expect_keyword(b"endobj"))
            .is_err()
        {
            trace!(object = %id, position = body_end, "missing endobj tolerated");
        }

        if !matches!(value.object, Object::Stream(_)) {
            value.raw = self.data[body_start..body_end].to_vec();
        }

        Ok((id, value))
    }

    fn read_stream_data(&mut self, dict: &Dictionary, length: LengthResolver<'_>) -> Result<Vec<u8>> {
        match self.data.get(self.position) {
            Some(b'\r') => {
                self.position += 1;
                if self.data.get(self.position) == Some(&b'\n') {
                    self.position += 1;
                }
            }
            Some(b'\n') => self.position += 1,
            _ => {}
        }

        let start = self.position;
        let declared = match dict.get("Length").map(|value| &value.object) {
            Some(Object::Integer(len)) => Some(*len),
            Some(Object::Reference(id)) => length(*id),
            _ => None,
        };

        if let Some(len) = declared.and_then(|len| usize::try_from(len).ok()) {
            if let Some(end) = start.checked_add(len).filter(|&end| end <= self.data.len()) {
                let mut lookahead = Parser {
                    data: self.data,
                    position: end,
                };
                lookahead.skip_whitespace();
                if self.data[lookahead.position..].starts_with(b"endstream") {
                    self.position = lookahead.position + 9;
                    return Ok(self.data[start..end].to_vec());
                }
            }
        }

        let Some(keyword) = find(self.data, b"endstream", start) else {
            return Err(malformed_error!(
                "Stream starting at offset {} has no endstream",
                start
            ));
        };

        let mut end = keyword;
        if end > start && self.data[end - 1] == b'\n' {
            end -= 1;
        }
        if end > start && self.data[end - 1] == b'\r' {
            end -= 1;
        }

        self.position = keyword + 9;
        Ok(self.data[start..end].to_vec())
    }

    fn parse_value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_NESTING_DEPTH {
            return Err(RecursionLimit(MAX_NESTING_DEPTH));
        }

        self.skip_whitespace();
        let start = self.position;
        let object = match self.peek_byte()? {
            b'/' => Object::Name(self.parse_name()?),
            b'(' => Object::String(self.parse_literal_string()?),
            b'<' => {
                if self.data.get(self.position + 1) == Some(&b'<') {
                    Object::Dictionary(self.parse_dictionary(depth)?)
                } else {
                    Object::String(self.parse_hex_string()?)
                }
            }
            b'[' => Object::Array(self.parse_array(depth)?),
            b'0'..=b'9' | b'+' | b'-' | b'.' => self.parse_number_or_reference()?,
            _ => {
                let keyword = self.read_keyword()?;
                match keyword {
                    b"true" => Object::Boolean(true),
                    b"false" => Object::Boolean(false),
                    b"null" => Object::Null,
                    other => {
                        return Err(malformed_error!(
                            "Unexpected token '{}' at offset {}",
                            String::from_utf8_lossy(other),
                            start
                        ))
                    }
                }
            }
        };

        Ok(Value::new(object, self.data[start..self.position].to_vec()))
    }

    fn parse_name(&mut self) -> Result<Name> {
        self.advance()?;
        let mut bytes = Vec::new();
        while let Some(&byte) = self.data.get(self.position) {
            if !is_regular(byte) {
                break;
            }
            if byte == b'#' {
                let hex = self
                    .data
                    .get(self.position + 1..self.position + 3)
                    .and_then(|pair| Some((hex_value(pair[0])?, hex_value(pair[1])?)));
                if let Some((high, low)) = hex {
                    bytes.push(high << 4 | low);
                    self.position += 3;
                    continue;
                }
            }
            bytes.push(byte);
            self.position += 1;
        }
        Ok(Name::new(bytes))
    }

    fn parse_literal_string(&mut self) -> Result<PdfString> {
        self.advance()?;
        let mut bytes = Vec::new();
        let mut nesting = 0_usize;

        loop {
            let Some(&byte) = self.data.get(self.position) else {
                return Err(malformed_error!("Unterminated literal string"));
            };
            self.position += 1;

            match byte {
                b'(' => {
                    nesting += 1;
                    bytes.push(byte);
                }
                b')' => {
                    if nesting == 0 {
                        break;
                    }
                    nesting -= 1;
                    bytes.push(byte);
                }
                b'\r' => {
                    if self.data.get(self.position) == Some(&b'\n') {
                        self.position += 1;
                    }
                    bytes.push(b'\n');
                }
                b'\\' => {
                    let Some(&escaped) = self.data.get(self.position) else {
                        return Err(malformed_error!("Unterminated literal string"));
                    };
                    self.position += 1;
                    match escaped {
                        b'n' => bytes.push(b'\n'),
                        b'r' => bytes.push(b'\r'),
                        b't' => bytes.push(b'\t'),
                        b'b' => bytes.push(0x08),
                        b'f' => bytes.push(0x0C),
                        b'0'..=b'7' => {
                            let mut code = u32::from(escaped - b'0');
                            for _ in 0..2 {
                                match self.data.get(self.position) {
                                    Some(&digit @ b'0'..=b'7') => {
                                        code = code * 8 + u32::from(digit - b'0');
                                        self.position += 1;
                                    }
                                    _ => break,
                                }
                            }
                            bytes.push((code & 0xFF) as u8);
                        }
                        b'\r' => {
                            if self.data.get(self.position) == Some(&b'\n') {
                                self.position += 1;
                            }
                        }
                        b'\n' => {}
                        other => bytes.push(other),
                    }
                }
                other => bytes.push(other),
            }
        }

        Ok(PdfString { bytes, hex: false })
    }

    fn parse_hex_string(&mut self) -> Result<PdfString> {
        self.advance()?;
        let mut bytes = Vec::new();
        let mut pending: Option<u8> = None;

        loop {
            let Some(&byte) = self.data.get(self.position) else {
                return Err(malformed_error!("Unterminated hex string"));
            };
            self.position += 1;

            if byte == b'>' {
                break;
            }
            if is_whitespace(byte) {
                continue;
            }
            let Some(nibble) = hex_value(byte) else {
                return Err(malformed_error!(
                    "Invalid character 0x{:02X} in hex string",
                    byte
                ));
            };
            match pending.take() {
                Some(high) => bytes.push(high << 4 | nibble),
                None => pending = Some(nibble),
            }
        }

        if let Some(high) = pending {
            bytes.push(high << 4);
        }

        Ok(PdfString { bytes, hex: true })
    }

    fn parse_array(&mut self, depth: usize) -> Result<Vec<Value>> {
        self.advance()?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek_byte() {
                Ok(b']') => {
                    self.position += 1;
                    return Ok(items);
                }
                Ok(_) => items.push(self.parse_value(depth + 1)?),
                Err(_) => return Err(malformed_error!("Unterminated array")),
            }
        }
    }

    fn parse_dictionary(&mut self, depth: usize) -> Result<Dictionary> {
        self.advance_by(2)?;
        let mut dict = Dictionary::new();
        loop {
            self.skip_whitespace();
            match self.peek_byte() {
                Ok(b'>') => {
                    if self.data.get(self.position + 1) != Some(&b'>') {
                        return Err(malformed_error!(
                            "Expected '>>' at offset {}",
                            self.position
                        ));
                    }
                    self.position += 2;
                    return Ok(dict);
                }
                Ok(b'/') => {
                    let key = self.parse_name()?;
                    let value = self.parse_value(depth + 1)?;
                    dict.push(key, value);
                }
                Ok(other) => {
                    return Err(malformed_error!(
                        "Dictionary key must be a name, found byte 0x{:02X} at offset {}",
                        other,
                        self.position
                    ))
                }
                Err(_) => return Err(malformed_error!("Unterminated dictionary")),
            }
        }
    }

    fn parse_number_or_reference(&mut self) -> Result<Object> {
        let start = self.position;
        let token = self.read_keyword()?;
        let number = parse_number(token).ok_or_else(|| {
            malformed_error!(
                "Invalid number '{}' at offset {}",
                String::from_utf8_lossy(token),
                start
            )
        })?;

        if let Object::Integer(value) = number {
            if value >= 0 {
                let reference = self.transactional(|parser| {
                    let generation = parser.read_unsigned()?;
                    parser.expect_keyword(b"R")?;
                    Ok(generation)
                });
                if let Ok(generation) = reference {
                    if let (Ok(number), Ok(generation)) =
                        (u32::try_from(value), u16::try_from(generation))
                    {
                        return Ok(Object::Reference(ObjectId::new(number, generation)));
                    }
                }
            }
        }

        Ok(number)
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn parse_unsigned(token: &[u8]) -> Option<u64> {
    if token.is_empty() || !token.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(token).ok()?.parse().ok()
}

fn parse_number(token: &[u8]) -> Option<Object> {
    let text = std::str::from_utf8(token).ok()?;
    if text.contains('.') {
        // Accepts forms like "-.5" and "4." that str::parse handles
        text.parse::<f64>().ok().map(Object::Real)
    } else {
        let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        text.parse::<i64>().ok().map(Object::Integer)
    }
}

/// Find the first occurrence of `needle` in `data` at or after `from`.
#[must_use]
pub fn find(data: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= data.len() {
        return None;
    }
    data[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Find the last occurrence of `needle` in `data`.
#[must_use]
pub fn rfind(data: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > data.len() {
        return None;
    }
    data.windows(needle.len())
        .rposition(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_values() {
        let mut parser = Parser::new(b"  true false null 42 -7 3.5 -.25 /Name");
        assert_eq!(parser.parse_object().unwrap().object, Object::Boolean(true));
        assert_eq!(parser.parse_object().unwrap().object, Object::Boolean(false));
        assert_eq!(parser.parse_object().unwrap().object, Object::Null);
        assert_eq!(parser.parse_object().unwrap().object, Object::Integer(42));
        assert_eq!(parser.parse_object().unwrap().object, Object::Integer(-7));
        assert_eq!(parser.parse_object().unwrap().object, Object::Real(3.5));
        assert_eq!(parser.parse_object().unwrap().object, Object::Real(-0.25));
        let name = parser.parse_object().unwrap();
        assert_eq!(name.object, Object::Name(Name::from("Name")));
        assert_eq!(name.raw, b"/Name".to_vec());
        assert!(!parser.has_more_data());
    }

    #[test]
    fn parse_reference_vs_integers() {
        let mut parser = Parser::new(b"[1 0 R 2 3 4]");
        let value = parser.parse_object().unwrap();
        let items = value.expect_array().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].as_reference(), Some(ObjectId::new(1, 0)));
        assert_eq!(items[0].raw, b"1 0 R".to_vec());
        assert_eq!(items[1].object, Object::Integer(2));
        assert_eq!(items[3].object, Object::Integer(4));
    }

    #[test]
    fn parse_name_escapes() {
        let mut parser = Parser::new(b"/A#20B#2f");
        let value = parser.parse_object().unwrap();
        assert_eq!(value.as_name().unwrap().as_bytes(), b"A B/");
    }

    #[test]
    fn parse_literal_string_escapes() {
        let mut parser = Parser::new(b"(a\\(b\\) (nested) \\101\\n\\\r\nc\rd)");
        let value = parser.parse_object().unwrap();
        let string = value.as_string().unwrap();
        assert_eq!(string.bytes, b"a(b) (nested) A\nc\nd".to_vec());
        assert!(!string.hex);
    }

    #[test]
    fn parse_hex_string_odd_digits() {
        let mut parser = Parser::new(b"<48 65 6C6C 6F7>");
        let value = parser.parse_object().unwrap();
        let string = value.as_string().unwrap();
        assert_eq!(string.bytes, b"Hellop".to_vec());
        assert!(string.hex);
    }

    #[test]
    fn dictionary_preserves_raw_members() {
        let source = b"<< /DA (/Helv 0 Tf 0 g)  /Rect [ 0 0 100.5 20 ] /P 4 0 R >>";
        let mut parser = Parser::new(source);
        let value = parser.parse_object().unwrap();
        assert_eq!(value.raw, source.to_vec());
        let dict = value.expect_dict().unwrap();
        assert_eq!(dict.get("DA").unwrap().raw, b"(/Helv 0 Tf 0 g)".to_vec());
        assert_eq!(dict.get("Rect").unwrap().raw, b"[ 0 0 100.5 20 ]".to_vec());
        assert_eq!(dict.get("P").unwrap().as_reference(), Some(ObjectId::new(4, 0)));
    }

    #[test]
    fn comments_are_skipped() {
        let mut parser = Parser::new(b"% header\n<< /A 1 % trailing\n /B 2 >>");
        let value = parser.parse_object().unwrap();
        let dict = value.expect_dict().unwrap();
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn indirect_stream_with_direct_length() {
        let source = b"5 0 obj\n<< /Length 5 >>\nstream\nhello\nendstream\nendobj\n";
        let mut parser = Parser::new(source);
        let (id, value) = parser.parse_indirect(&|_| None).unwrap();
        assert_eq!(id, ObjectId::new(5, 0));
        let stream = value.as_stream().unwrap();
        assert_eq!(stream.data, b"hello".to_vec());
        assert!(value.raw.starts_with(b"<< /Length 5 >>"));
        assert!(value.raw.ends_with(b"endstream"));
    }

    #[test]
    fn indirect_stream_with_wrong_length() {
        let source = b"5 0 obj\n<< /Length 99 >>\nstream\r\nhello\r\nendstream\nendobj\n";
        let mut parser = Parser::new(source);
        let (_, value) = parser.parse_indirect(&|_| None).unwrap();
        assert_eq!(value.as_stream().unwrap().data, b"hello".to_vec());
    }

    #[test]
    fn indirect_stream_with_resolved_length() {
        let source = b"5 0 obj\n<< /Length 6 0 R >>\nstream\nhello world\nendstream\nendobj\n";
        let mut parser = Parser::new(source);
        let (_, value) = parser
            .parse_indirect(&|id| (id == ObjectId::new(6, 0)).then_some(5))
            .unwrap();
        // Length 5 does not land on endstream, so the scan fallback wins
        assert_eq!(value.as_stream().unwrap().data, b"hello world".to_vec());

        let mut parser = Parser::new(source);
        let (_, value) = parser.parse_indirect(&|_| Some(11)).unwrap();
        assert_eq!(value.as_stream().unwrap().data, b"hello world".to_vec());
    }

    #[test]
    fn indirect_raw_excludes_keywords() {
        let source = b"7 0 obj <</T (a)>> endobj";
        let mut parser = Parser::new(source);
        let (_, value) = parser.parse_indirect(&|_| None).unwrap();
        assert_eq!(value.raw, b"<</T (a)>>".to_vec());
    }

    #[test]
    fn indirect_without_endobj() {
        let source = b"4 0 obj\n<< /T (a) >>\n5 0 obj\n(next)\nendobj";
        let mut parser = Parser::new(source);
        let (id, value) = parser.parse_indirect(&|_| None).unwrap();
        assert_eq!(id, ObjectId::new(4, 0));
        assert_eq!(value.raw, b"<< /T (a) >>".to_vec());

        // The cursor stays on the next object
        let (next, value) = parser.parse_indirect(&|_| None).unwrap();
        assert_eq!(next, ObjectId::new(5, 0));
        assert_eq!(value.raw, b"(next)".to_vec());
    }

    #[test]
    fn nesting_limit() {
        let mut source = vec![b'['; MAX_NESTING_DEPTH + 5];
        source.extend(vec![b']'; MAX_NESTING_DEPTH + 5]);
        let mut parser = Parser::new(&source);
        assert!(matches!(
            parser.parse_object(),
            Err(RecursionLimit(MAX_NESTING_DEPTH))
        ));
    }

    #[test]
    fn malformed_inputs() {
        assert!(Parser::new(b"(unterminated").parse_object().is_err());
        assert!(Parser::new(b"<< /A 1").parse_object().is_err());
        assert!(Parser::new(b"<< 1 2 >>").parse_object().is_err());
        assert!(Parser::new(b"bogus").parse_object().is_err());
        assert!(matches!(Parser::new(b"   ").parse_object(), Err(OutOfBounds)));
    }

    #[test]
    fn find_helpers() {
        assert_eq!(find(b"abcabc", b"bc", 0), Some(1));
        assert_eq!(find(b"abcabc", b"bc", 2), Some(4));
        assert_eq!(rfind(b"abcabc", b"ab"), Some(3));
        assert_eq!(rfind(b"ab", b"abc"), None);
    }
}
