//! Shared functionality which is used in unit tests
//!
//! [`PdfBuilder`] assembles small but structurally valid documents with correct cross-reference
//! offsets, either as a classic table or as a cross-reference stream. Form templates used across
//! several test modules live in [`forms`].


use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};

enum Entry {
    Plain(u32, Vec<u8>),
    ObjectStream(u32, Vec<(u32, String)>),
}

/// Builder for test documents.
#[derive(Default)]
pub struct PdfBuilder {
    entries: Vec<Entry>,
    trailer: Vec<String>,
    xref_stream: bool,
}

impl PdfBuilder {
    pub fn new() -> Self {
        PdfBuilder::default()
    }

    /// Add `number 0 obj <body> endobj`.
    pub fn object(mut self, number: u32, body: &str) -> Self {
        self.entries
            .push(Entry::Plain(number, body.as_bytes().to_vec()));
        self
    }

    /// Add an unfiltered stream with a direct `/Length`.
    pub fn stream(mut self, number: u32, dict_entries: &str, data: &[u8]) -> Self {
        let mut body = format!("<< {dict_entries} /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.entries.push(Entry::Plain(number, body));
        self
    }

    /// Add a `FlateDecode` stream with a direct `/Length`.
    pub fn flate_stream(mut self, number: u32, dict_entries: &str, data: &[u8]) -> Self {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut body = format!(
            "<< {dict_entries} /Filter /FlateDecode /Length {} >>\nstream\n",
            compressed.len()
        )
        .into_bytes();
        body.extend_from_slice(&compressed);
        body.extend_from_slice(b"\nendstream");
        self.entries.push(Entry::Plain(number, body));
        self
    }

    /// Add an object stream holding `objects`. Forces a cross-reference stream.
    pub fn object_stream(mut self, number: u32, objects: &[(u32, &str)]) -> Self {
        self.entries.push(Entry::ObjectStream(
            number,
            objects
                .iter()
                .map(|(object, body)| (*object, (*body).to_string()))
                .collect(),
        ));
        self.xref_stream = true;
        self
    }

    /// Emit a cross-reference stream instead of a classic table.
    pub fn xref_stream(mut self) -> Self {
        self.xref_stream = true;
        self
    }

    /// Add a raw `/Key value` pair to the trailer.
    pub fn trailer_entry(mut self, entry: &str) -> Self {
        self.trailer.push(entry.to_string());
        self
    }

    /// Serialize the document with `/Root root 0 R`.
    pub fn build(self, root: u32) -> Vec<u8> {
        // (number, kind, field2, field3): kind 1 = offset/gen, kind 2 = stream/index
        let mut rows: Vec<(u32, u8, usize, usize)> = Vec::new();
        let mut data = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec();

        for entry in &self.entries {
            match entry {
                Entry::Plain(number, body) => {
                    rows.push((*number, 1, data.len(), 0));
                    data.extend_from_slice(format!("{number} 0 obj\n").as_bytes());
                    data.extend_from_slice(body);
                    data.extend_from_slice(b"\nendobj\n");
                }
                Entry::ObjectStream(number, objects) => {
                    let mut header = String::new();
                    let mut content = String::new();
                    for (index, (object, body)) in objects.iter().enumerate() {
                        header.push_str(&format!("{object} {} ", content.len()));
                        content.push_str(body);
                        content.push('\n');
                        rows.push((*object, 2, *number as usize, index));
                    }
                    rows.push((*number, 1, data.len(), 0));
                    data.extend_from_slice(
                        format!(
                            "{number} 0 obj\n<< /Type /ObjStm /N {} /First {} /Length {} >>\nstream\n{header}{content}\nendstream\nendobj\n",
                            objects.len(),
                            header.len(),
                            header.len() + content.len()
                        )
                        .as_bytes(),
                    );
                }
            }
        }

        let max = rows.iter().map(|row| row.0).max().unwrap_or(0);
        let extra = self.trailer.join(" ");

        if self.xref_stream {
            let xref_number = max + 1;
            let size = xref_number + 1;
            let offset = data.len();
            rows.push((xref_number, 1, offset, 0));

            let mut table = Vec::new();
            for number in 0..size {
                match rows.iter().find(|row| row.0 == number) {
                    Some(&(_, kind, second, third)) => {
                        table.push(kind);
                        table.extend_from_slice(&(second as u32).to_be_bytes());
                        table.extend_from_slice(&(third as u16).to_be_bytes());
                    }
                    None => table.extend_from_slice(&[0, 0, 0, 0, 0, 0xFF, 0xFF]),
                }
            }

            data.extend_from_slice(
                format!(
                    "{xref_number} 0 obj\n<< /Type /XRef /Size {size} /W [1 4 2] /Root {root} 0 R {extra} /Length {} >>\nstream\n",
                    table.len()
                )
                .as_bytes(),
            );
            data.extend_from_slice(&table);
            data.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{offset}\n%%EOF\n").as_bytes());
        } else {
            let size = max + 1;
            let offset = data.len();
            data.extend_from_slice(format!("xref\n0 {size}\n").as_bytes());
            for number in 0..size {
                match rows.iter().find(|row| row.0 == number) {
                    Some(&(_, _, position, _)) => {
                        data.extend_from_slice(format!("{position:010} 00000 n\r\n").as_bytes())
                    }
                    None if number == 0 => data.extend_from_slice(b"0000000000 65535 f\r\n"),
                    None => data.extend_from_slice(b"0000000000 00000 f\r\n"),
                }
            }
            data.extend_from_slice(
                format!(
                    "trailer\n<< /Size {size} /Root {root} 0 R {extra} >>\nstartxref\n{offset}\n%%EOF\n"
                )
                .as_bytes(),
            );
        }

        data
    }
}

/// Return the object body text of `number` from the appended section of `output`.
///
/// Looks at the last definition, so it sees the incremental update rather than the original.
pub fn updated_body(output: &[u8], number: u32) -> Option<String> {
    let text = String::from_utf8_lossy(output);
    let header = format!("\n{number} 0 obj\n");
    let start = text.rfind(&header)? + header.len();
    let end = text[start..].find("\nendobj")? + start;
    Some(text[start..end].to_string())
}
