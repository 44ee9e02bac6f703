//! Template construction shared by the integration tests.
#![allow(dead_code)]

use std::io::Write;

use acroscope::pdf::{Document, ObjectId, Value};
use flate2::{write::ZlibEncoder, Compression};

/// Builder for small templates with correct cross-reference offsets.
#[derive(Default)]
pub struct Template {
    objects: Vec<(u32, Vec<u8>)>,
    xref_stream: bool,
}

impl Template {
    pub fn new() -> Self {
        Template::default()
    }

    pub fn object(mut self, number: u32, body: &str) -> Self {
        self.objects.push((number, body.as_bytes().to_vec()));
        self
    }

    pub fn stream(mut self, number: u32, entries: &str, data: &[u8]) -> Self {
        let mut body = format!("<< {entries} /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.objects.push((number, body));
        self
    }

    pub fn flate_stream(mut self, number: u32, entries: &str, data: &[u8]) -> Self {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut body = format!(
            "<< {entries} /Filter /FlateDecode /Length {} >>\nstream\n",
            compressed.len()
        )
        .into_bytes();
        body.extend_from_slice(&compressed);
        body.extend_from_slice(b"\nendstream");
        self.objects.push((number, body));
        self
    }

    pub fn xref_stream(mut self) -> Self {
        self.xref_stream = true;
        self
    }

    pub fn build(self, root: u32) -> Vec<u8> {
        let mut data = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::new();
        for (number, body) in &self.objects {
            offsets.push((*number, data.len()));
            data.extend_from_slice(format!("{number} 0 obj\n").as_bytes());
            data.extend_from_slice(body);
            data.extend_from_slice(b"\nendobj\n");
        }
        let max = offsets.iter().map(|(number, _)| *number).max().unwrap_or(0);
        let offset_of = |number: u32| {
            offsets
                .iter()
                .find(|(n, _)| *n == number)
                .map(|(_, offset)| *offset)
        };

        if self.xref_stream {
            let xref_number = max + 1;
            let size = xref_number + 1;
            let start = data.len();
            let mut table = Vec::new();
            for number in 0..size {
                let offset = if number == xref_number {
                    Some(start)
                } else {
                    offset_of(number)
                };
                match offset {
                    Some(offset) => {
                        table.push(1);
                        table.extend_from_slice(&(offset as u32).to_be_bytes());
                        table.extend_from_slice(&[0, 0]);
                    }
                    None => table.extend_from_slice(&[0, 0, 0, 0, 0, 0xFF, 0xFF]),
                }
            }
            data.extend_from_slice(
                format!(
                    "{xref_number} 0 obj\n<< /Type /XRef /Size {size} /W [1 4 2] /Root {root} 0 R /Length {} >>\nstream\n",
                    table.len()
                )
                .as_bytes(),
            );
            data.extend_from_slice(&table);
            data.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{start}\n%%EOF\n").as_bytes());
        } else {
            let size = max + 1;
            let start = data.len();
            data.extend_from_slice(format!("xref\n0 {size}\n").as_bytes());
            for number in 0..size {
                match offset_of(number) {
                    Some(offset) => data.extend_from_slice(format!("{offset:010} 00000 n\r\n").as_bytes()),
                    None => data.extend_from_slice(b"0000000000 65535 f\r\n"),
                }
            }
            data.extend_from_slice(
                format!("trailer\n<< /Size {size} /Root {root} 0 R >>\nstartxref\n{start}\n%%EOF\n")
                    .as_bytes(),
            );
        }
        data
    }
}

/// An application form.
///
/// | object | content                                                    |
/// |--------|------------------------------------------------------------|
/// | 3      | AcroForm                                                   |
/// | 4      | `applicant`, `/FT /Tx` with kids `first` (7), `last` (8)   |
/// | 5      | `plan`: radio, kids 9, 13, 14 (`/Basic`, `/Plus`, `/Pro`)  |
/// | 6      | `newsletter`: checkbox, on-state `/On`                     |
/// | 10     | `toppings`: multi-select list                              |
/// | 11     | empty appearance stream                                    |
/// | 12     | existing appearance of `last`                              |
/// | 15     | Helvetica                                                  |
pub fn application() -> Template {
    Template::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R /AcroForm 3 0 R >>")
        .object(2, "<< /Type /Pages /Kids [] /Count 0 >>")
        .object(
            3,
            "<< /Fields [4 0 R 5 0 R 6 0 R 10 0 R] /DA (/Helv 0 Tf 0 g) /DR << /Font << /Helv 15 0 R >> >> >>",
        )
        .object(4, "<< /T (applicant) /FT /Tx /DA (/Helv 10 Tf 0 g) /Kids [7 0 R 8 0 R] >>")
        .object(5, "<< /T (plan) /FT /Btn /Ff 49152 /V /Off /Kids [9 0 R 13 0 R 14 0 R] >>")
        .object(
            6,
            "<< /T (newsletter) /FT /Btn /Subtype /Widget /Rect [0 0 12 12] /V /Off /AS /Off /AP << /N << /Off 11 0 R /On 11 0 R >> >> >>",
        )
        .object(
            7,
            "<< /T (first) /Parent 4 0 R /Subtype /Widget /Rect [10 10 210 30] /Q 1 >>",
        )
        .object(
            8,
            "<< /T (last) /Parent 4 0 R /Subtype /Widget /Rect [10 40 210 60] /V (Smith) /AP << /N 12 0 R >> >>",
        )
        .object(
            9,
            "<< /Parent 5 0 R /Subtype /Widget /Rect [0 0 12 12] /AS /Off /AP << /N << /Basic 11 0 R /Off 11 0 R >> >> >>",
        )
        .object(
            10,
            "<< /T (toppings) /FT /Ch /Ff 2097152 /Subtype /Widget /Rect [0 0 100 60] /Opt [(a) (b) (c)] >>",
        )
        .stream(11, "/Type /XObject /Subtype /Form /BBox [0 0 12 12]", b"")
        .stream(
            12,
            "/Type /XObject /Subtype /Form /BBox [0 0 200 20]",
            b"0.9 g 0 0 200 20 re f /Tx BMC BT /Helv 10 Tf 2 6 Td (Smith) Tj ET EMC 0 G 0 0 200 20 re S",
        )
        .object(
            13,
            "<< /Parent 5 0 R /Subtype /Widget /Rect [0 20 12 32] /AS /Off /AP << /N << /Off 11 0 R /Plus 11 0 R >> >> >>",
        )
        .object(
            14,
            "<< /Parent 5 0 R /Subtype /Widget /Rect [0 40 12 52] /AS /Off /AP << /N << /Pro 11 0 R /Off 11 0 R >> >> >>",
        )
        .object(15, "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>")
}

/// Fetch object `number` from `doc`.
pub fn object(doc: &Document<'_>, number: u32) -> Value {
    doc.get(ObjectId::new(number, 0)).unwrap()
}

/// The name stored under `key` in object `number`.
pub fn name_entry(doc: &Document<'_>, number: u32, key: &str) -> Option<String> {
    object(doc, number)
        .expect_dict()
        .unwrap()
        .get_name(key)
        .map(|name| name.to_str_lossy())
}

/// The text string stored under `key` in object `number`.
pub fn text_entry(doc: &Document<'_>, number: u32, key: &str) -> Option<String> {
    object(doc, number)
        .expect_dict()
        .unwrap()
        .get(key)
        .and_then(|value| value.as_string().map(|string| string.to_text()))
}

/// The decoded normal appearance of widget `number`.
pub fn appearance(doc: &Document<'_>, number: u32) -> String {
    let widget = object(doc, number);
    let ap = widget.expect_dict().unwrap().get("AP").unwrap();
    let ap = doc.resolve(ap).unwrap();
    let normal = doc.resolve(ap.expect_dict().unwrap().get("N").unwrap()).unwrap();
    let stream = normal.as_stream().unwrap();
    String::from_utf8_lossy(&doc.stream_data(stream).unwrap()).into_owned()
}
