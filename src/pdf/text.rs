//! PDF text-string and content-string encodings.
//!
//! Field names (`/T`) and values (`/V`, `/RV`) are *text strings*: PDFDocEncoding, or UTF-16BE
//! prefixed with a byte order mark (PDF 2.0 also allows UTF-8 with a BOM). Text drawn in an
//! appearance stream with the standard Type1 fonts uses WinAnsiEncoding instead.

use widestring::U16Str;

/// PDFDocEncoding code points for bytes `0x18..=0x1F`.
const PDFDOC_LOW: [char; 8] = ['\u{02D8}', '\u{02C7}', '\u{02C6}', '\u{02D9}', '\u{02DD}', '\u{02DB}', '\u{02DA}', '\u{02DC}'];

/// PDFDocEncoding code points for bytes `0x80..=0x9F`. `\0` marks an undefined byte.
const PDFDOC_HIGH: [char; 32] = [
    '\u{2022}', '\u{2020}', '\u{2021}', '\u{2026}', '\u{2014}', '\u{2013}', '\u{0192}', '\u{2044}',
    '\u{2039}', '\u{203A}', '\u{2212}', '\u{2030}', '\u{201E}', '\u{201C}', '\u{201D}', '\u{2018}',
    '\u{2019}', '\u{201A}', '\u{2122}', '\u{FB01}', '\u{FB02}', '\u{0141}', '\u{0152}', '\u{0160}',
    '\u{0178}', '\u{017D}', '\u{0131}', '\u{0142}', '\u{0153}', '\u{0161}', '\u{017E}', '\0',
];

/// WinAnsiEncoding (cp1252) code points for bytes `0x80..=0x9F`. `\0` marks an undefined byte.
const WIN_ANSI_HIGH: [char; 32] = [
    '\u{20AC}', '\0', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\0', '\u{017D}', '\0',
    '\0', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\0', '\u{017E}', '\u{0178}',
];

fn pdfdoc_char(byte: u8) -> char {
    match byte {
        0x18..=0x1F => PDFDOC_LOW[usize::from(byte - 0x18)],
        0x80..=0x9F => match PDFDOC_HIGH[usize::from(byte - 0x80)] {
            '\0' => char::REPLACEMENT_CHARACTER,
            c => c,
        },
        0xA0 => '\u{20AC}',
        0xAD => char::REPLACEMENT_CHARACTER,
        _ => char::from(byte),
    }
}

fn pdfdoc_byte(c: char) -> Option<u8> {
    let code = u32::from(c);
    match code {
        0x09 | 0x0A | 0x0D | 0x20..=0x7E | 0xA1..=0xAC | 0xAE..=0xFF => u8::try_from(code).ok(),
        0x20AC => Some(0xA0),
        _ => {
            if let Some(pos) = PDFDOC_LOW.iter().position(|&low| low == c) {
                return u8::try_from(pos).ok().map(|p| p + 0x18);
            }
            PDFDOC_HIGH
                .iter()
                .position(|&high| high == c && high != '\0')
                .and_then(|p| u8::try_from(p).ok())
                .map(|p| p + 0x80)
        }
    }
}

/// Decode a PDF text string into a Rust string.
///
/// Handles UTF-16BE (`FE FF` BOM), UTF-8 (`EF BB BF` BOM) and PDFDocEncoding.
#[must_use]
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return U16Str::from_slice(&units).to_string_lossy();
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| pdfdoc_char(b)).collect()
}

/// Encode a string as a PDF text string.
///
/// PDFDocEncoding is used when every character is representable, UTF-16BE with a BOM
/// otherwise. Single-byte output starting with a byte order mark would be read back as
/// UTF-16 or UTF-8, so such text is written as UTF-16BE as well.
#[must_use]
pub fn encode_text_string(text: &str) -> Vec<u8> {
    let single: Option<Vec<u8>> = text.chars().map(pdfdoc_byte).collect();
    match single {
        Some(bytes) if !has_bom(&bytes) => bytes,
        _ => {
            let mut out = vec![0xFE, 0xFF];
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_be_bytes());
            }
            out
        }
    }
}

fn has_bom(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0xFE, 0xFF]) || bytes.starts_with(&[0xEF, 0xBB, 0xBF])
}

/// Encode a string in WinAnsiEncoding for use with standard Type1 fonts.
///
/// Unrepresentable characters become `?`.
#[must_use]
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let code = u32::from(c);
            match code {
                0x20..=0x7E | 0xA0..=0xFF => u8::try_from(code).unwrap_or(b'?'),
                _ => WIN_ANSI_HIGH
                    .iter()
                    .position(|&high| high == c && high != '\0')
                    .and_then(|p| u8::try_from(p).ok())
                    .map_or(b'?', |p| p + 0x80),
            }
        })
        .collect()
}

/// Encode bytes as a PDF literal string, including the enclosing parentheses.
#[must_use]
pub fn escape_literal(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.push(b'(');
    for &byte in bytes {
        match byte {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(byte);
            }
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            _ => out.push(byte),
        }
    }
    out.push(b')');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_round_trip() {
        let encoded = encode_text_string("abc 123");
        assert_eq!(encoded, b"abc 123".to_vec());
        assert_eq!(decode_text_string(&encoded), "abc 123");
    }

    #[test]
    fn latin1_stays_single_byte() {
        let encoded = encode_text_string("Été");
        assert_eq!(encoded, vec![0xC9, b't', 0xE9]);
        assert_eq!(decode_text_string(&encoded), "Été");
    }

    #[test]
    fn pdfdoc_specials() {
        assert_eq!(encode_text_string("€"), vec![0xA0]);
        assert_eq!(encode_text_string("•"), vec![0x80]);
        assert_eq!(decode_text_string(&[0x80, 0xA0]), "•€");
    }

    #[test]
    fn utf16_fallback() {
        let encoded = encode_text_string("日本");
        assert_eq!(&encoded[..2], &[0xFE, 0xFF]);
        assert_eq!(encoded.len(), 6);
        assert_eq!(decode_text_string(&encoded), "日本");
    }

    #[test]
    fn bom_lookalike_prefix() {
        for text in ["þÿab", "ï»¿x"] {
            let encoded = encode_text_string(text);
            assert_eq!(&encoded[..2], &[0xFE, 0xFF]);
            assert_eq!(decode_text_string(&encoded), text);
        }
        assert_eq!(encode_text_string("abþÿ"), vec![b'a', b'b', 0xFE, 0xFF]);
    }

    #[test]
    fn utf8_bom() {
        let bytes = [0xEF, 0xBB, 0xBF, 0xE2, 0x82, 0xAC];
        assert_eq!(decode_text_string(&bytes), "€");
    }

    #[test]
    fn win_ansi() {
        assert_eq!(encode_win_ansi("a€é"), vec![b'a', 0x80, 0xE9]);
        assert_eq!(encode_win_ansi("日"), vec![b'?']);
    }

    #[test]
    fn literal_escaping() {
        assert_eq!(escape_literal(b"a(b)\\c\n"), b"(a\\(b\\)\\\\c\\n)".to_vec());
    }
}
