//! Appearance stream regeneration for text and choice fields.
//!
//! A regenerated appearance is a new form XObject. The drawing program of the template's
//! existing normal appearance is kept around a marked-content region (`/Tx BMC ... EMC`) and
//! only the region itself is replaced with the new text.
//!
//! Two drawing strategies exist:
//!
//! - **Measured**: with [`TextOptions`] the text is measured with the configured
//!   [`crate::FontMetrics`], centered vertically and aligned horizontally by the field's
//!   quadding. All measured appearances share one Type1 font object, written once at the end of
//!   the update.
//! - **Default appearance**: without text options the field's raw `/DA` string sets up the text
//!   state and the text is drawn at the origin. Viewers that regenerate appearances will fix the
//!   placement; others show the text unpositioned.
//!
//! Appearances are planned while the owning dictionary is written (the stream's id must be
//! known to write `/AP`) and written afterwards as their own object.

use tracing::warn;

use crate::{
    file::parser::find,
    form::{
        field::{self, Inherited, Quadding},
        options::TextOptions,
    },
    pdf::{
        text::{encode_win_ansi, escape_literal},
        writer::format_number,
        Dictionary, Document, IncrementalWriter, Name, ObjectId,
    },
    Result,
};

const MARKER_START: &[u8] = b"/Tx BMC";
const MARKER_END: &[u8] = b"EMC";

/// A planned appearance stream: id, box and finished content.
#[derive(Clone, Debug, PartialEq)]
pub struct Appearance {
    /// The id reserved for the stream object
    pub id: ObjectId,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
    /// Content stream bytes
    pub content: Vec<u8>,
}

/// Split an existing appearance program around its `/Tx BMC ... EMC` region.
///
/// Without a start marker the whole program is kept in front of the new region. Without an end
/// marker nothing is kept after it.
#[must_use]
pub fn split_marked_content(content: &[u8]) -> (&[u8], &[u8]) {
    let Some(start) = find(content, MARKER_START, 0) else {
        return (content, &[]);
    };
    let before = &content[..start];
    match find(content, MARKER_END, start + MARKER_START.len()) {
        Some(end) => (before, &content[end + MARKER_END.len()..]),
        None => (before, &[]),
    }
}

/// Plans and writes appearance streams and the shared fill font.
#[derive(Debug)]
pub struct AppearanceBuilder {
    text: Option<TextOptions>,
    resources: Option<Dictionary>,
    font: Option<ObjectId>,
}

impl AppearanceBuilder {
    /// Create a builder using the AcroForm's `/DR` as the resource source.
    ///
    /// # Errors
    /// Returns an error if `/DR` cannot be resolved.
    pub fn new(
        doc: &Document<'_>,
        acroform: &Dictionary,
        text: Option<TextOptions>,
    ) -> Result<AppearanceBuilder> {
        let resources = doc
            .resolve_key(acroform, "DR")?
            .and_then(|dr| dr.as_dict().cloned());
        Ok(AppearanceBuilder {
            text,
            resources,
            font: None,
        })
    }

    /// The id of the shared font, once a measured appearance has been planned.
    #[must_use]
    pub fn font(&self) -> Option<ObjectId> {
        self.font
    }

    /// Plan the appearance of `owner` showing `text`.
    ///
    /// `inherited` supplies `/DA` and `/Q` where `owner` has none. `field` is the
    /// fully-qualified name, used for diagnostics only.
    ///
    /// # Errors
    /// Returns an error if the owner's entries cannot be resolved.
    pub fn plan(
        &mut self,
        doc: &Document<'_>,
        writer: &mut IncrementalWriter,
        owner: &Dictionary,
        inherited: &Inherited,
        text: &str,
        field: &str,
    ) -> Result<Appearance> {
        let (width, height) = match rect(doc, owner)? {
            Some(size) => size,
            None => {
                warn!(field, "widget has no usable /Rect, using an empty box");
                (0.0, 0.0)
            }
        };
        let da = field::da(doc, owner)?.or_else(|| inherited.da.clone());
        let quadding = field::quadding(doc, owner)?
            .or(inherited.quadding)
            .unwrap_or_default();

        let existing = existing_content(doc, owner, field)?;
        let (before, after) = split_marked_content(&existing);

        let id = writer.allocate_id();
        if self.text.is_some() && self.font.is_none() {
            self.font = Some(writer.allocate_id());
        }

        let mut content = before.to_vec();
        content.extend_from_slice(MARKER_START);
        content.extend_from_slice(b"\nq\nBT\n");
        match &self.text {
            Some(options) => {
                measured(&mut content, options, quadding, width, height, text);
            }
            None => {
                if let Some(da) = &da {
                    content.extend_from_slice(&da.bytes);
                    content.push(b'\n');
                }
            }
        }
        content.extend(escape_literal(&encode_win_ansi(text)));
        content.extend_from_slice(b" Tj\nET\nQ\n");
        content.extend_from_slice(MARKER_END);
        content.extend_from_slice(after);

        Ok(Appearance {
            id,
            width,
            height,
            content,
        })
    }

    /// Write a planned appearance as a form XObject.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] if another object is open.
    pub fn write(&self, writer: &mut IncrementalWriter, appearance: &Appearance) -> Result<()> {
        writer.start_object(appearance.id)?;
        writer.start_dictionary()?;
        writer.write_key("Type")?;
        writer.write_name("XObject")?;
        writer.write_key("Subtype")?;
        writer.write_name("Form")?;
        writer.write_key("FormType")?;
        writer.write_integer(1)?;
        writer.write_key("BBox")?;
        writer.start_array()?;
        writer.write_integer(0)?;
        writer.write_integer(0)?;
        writer.write_real(appearance.width)?;
        writer.write_real(appearance.height)?;
        writer.end_array()?;
        writer.write_key("Matrix")?;
        writer.start_array()?;
        for component in [1, 0, 0, 1, 0, 0] {
            writer.write_integer(component)?;
        }
        writer.end_array()?;

        writer.write_key("Resources")?;
        writer.start_dictionary()?;
        writer.write_key("ProcSet")?;
        writer.start_array()?;
        writer.write_name("PDF")?;
        writer.write_name("Text")?;
        writer.end_array()?;
        if let Some(resources) = &self.resources {
            for (category, value) in resources.iter() {
                if category.is("ProcSet") || (self.text.is_some() && category.is("Font")) {
                    continue;
                }
                writer.write_key_name(category)?;
                writer.copy_verbatim(value)?;
            }
        }
        if let (Some(options), Some(font)) = (&self.text, self.font) {
            writer.write_key("Font")?;
            writer.start_dictionary()?;
            writer.write_key_name(&Name::from(options.resource_name.as_str()))?;
            writer.write_reference(font)?;
            writer.end_dictionary()?;
        }
        writer.end_dictionary()?;

        writer.write_key("Length")?;
        writer.write_integer(i64::try_from(appearance.content.len()).unwrap_or(i64::MAX))?;
        writer.end_dictionary()?;
        writer.write_stream_data(&appearance.content)?;
        writer.end_object()?;
        Ok(())
    }

    /// Write the shared font object if any appearance used it.
    ///
    /// # Errors
    /// Returns [`crate::Error::WriteOrder`] if another object is open.
    pub fn write_font(&self, writer: &mut IncrementalWriter) -> Result<()> {
        let (Some(options), Some(font)) = (&self.text, self.font) else {
            return Ok(());
        };
        writer.start_object(font)?;
        writer.start_dictionary()?;
        writer.write_key("Type")?;
        writer.write_name("Font")?;
        writer.write_key("Subtype")?;
        writer.write_name("Type1")?;
        writer.write_key("BaseFont")?;
        writer.write_name(options.font.base_font())?;
        writer.write_key("Encoding")?;
        writer.write_name("WinAnsiEncoding")?;
        writer.end_dictionary()?;
        writer.end_object()?;
        Ok(())
    }
}

/// Write `/AP << /N id R >>` into the open dictionary.
///
/// # Errors
/// Returns [`crate::Error::WriteOrder`] outside of a dictionary.
pub fn write_appearance_entry(writer: &mut IncrementalWriter, id: ObjectId) -> Result<()> {
    writer.write_key("AP")?;
    writer.start_dictionary()?;
    writer.write_key("N")?;
    writer.write_reference(id)?;
    writer.end_dictionary()
}

fn measured(
    content: &mut Vec<u8>,
    options: &TextOptions,
    quadding: Quadding,
    width: f64,
    height: f64,
    text: &str,
) {
    let text_width = options.font.text_width(text, options.size);
    let text_height = options.font.text_height(options.size);
    let x = quadding.offset(width, text_width);
    let y = (height - text_height) / 2.0;

    content.extend(Name::from(options.resource_name.as_str()).encode());
    content.extend_from_slice(format!(" {} Tf\n", format_number(options.size)).as_bytes());
    if let Some([r, g, b]) = options.color {
        content.extend_from_slice(
            format!(
                "{} {} {} rg\n",
                format_number(r),
                format_number(g),
                format_number(b)
            )
            .as_bytes(),
        );
    }
    content.extend_from_slice(format!("{} {} Td\n", format_number(x), format_number(y)).as_bytes());
}

/// Width and height of a dictionary's normalized `/Rect`.
fn rect(doc: &Document<'_>, dict: &Dictionary) -> Result<Option<(f64, f64)>> {
    let Some(rect) = doc.resolve_key(dict, "Rect")? else {
        return Ok(None);
    };
    let Some(items) = rect.as_array() else {
        return Ok(None);
    };
    if items.len() != 4 {
        return Ok(None);
    }

    let mut coords = [0.0; 4];
    for (coord, item) in coords.iter_mut().zip(items) {
        match doc.resolve(item)?.as_f64() {
            Some(value) => *coord = value,
            None => return Ok(None),
        }
    }
    let [x1, y1, x2, y2] = coords;
    Ok(Some(((x2 - x1).abs(), (y2 - y1).abs())))
}

/// The decoded normal appearance of `owner`, or nothing.
fn existing_content(doc: &Document<'_>, owner: &Dictionary, field: &str) -> Result<Vec<u8>> {
    let Some(ap) = doc.resolve_key(owner, "AP")? else {
        return Ok(Vec::new());
    };
    let Some(ap) = ap.as_dict() else {
        return Ok(Vec::new());
    };
    let Some(normal) = doc.resolve_key(ap, "N")? else {
        return Ok(Vec::new());
    };
    let Some(stream) = normal.as_stream() else {
        return Ok(Vec::new());
    };

    match doc.stream_data(stream) {
        Ok(data) => Ok(data),
        Err(error) => {
            warn!(field, %error, "existing appearance cannot be decoded, replacing it entirely");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        file::parser::Parser,
        form::font::StandardFont,
        test::{updated_body, PdfBuilder},
    };

    fn dict(source: &str) -> Dictionary {
        Parser::new(source.as_bytes())
            .parse_object()
            .unwrap()
            .expect_dict()
            .unwrap()
            .clone()
    }

    fn template() -> Vec<u8> {
        PdfBuilder::new()
            .object(1, "<< /Type /Catalog >>")
            .flate_stream(
                2,
                "/Type /XObject /Subtype /Form /BBox [0 0 200 20]",
                b"0.9 g 0 0 200 20 re f /Tx BMC BT (old) Tj ET EMC 1 0 0 RG",
            )
            .object(3, "<< /Font << /Helv 4 0 R >> /ProcSet [/PDF] /ColorSpace << /CS0 5 0 R >> >>")
            .build(1)
    }

    #[test]
    fn marked_content_split() {
        assert_eq!(
            split_marked_content(b"a /Tx BMC b EMC c"),
            (&b"a "[..], &b" c"[..])
        );
        assert_eq!(split_marked_content(b"a b"), (&b"a b"[..], &b""[..]));
        assert_eq!(split_marked_content(b"a /Tx BMC b"), (&b"a "[..], &b""[..]));
        assert_eq!(split_marked_content(b""), (&b""[..], &b""[..]));
    }

    #[test]
    fn measured_plan_keeps_decoration() {
        let data = template();
        let doc = Document::parse(&data).unwrap();
        let mut writer = IncrementalWriter::new(&doc).unwrap();
        let acroform = dict("<< /DR 3 0 R >>");
        let mut builder = AppearanceBuilder::new(
            &doc,
            &acroform,
            Some(TextOptions::new(Arc::new(StandardFont::Courier), 10.0)),
        )
        .unwrap();

        // Courier: "abc" is 18 wide, cap height 5.62
        let owner = dict("<< /Rect [10 10 210 30] /Q 1 /AP << /N 2 0 R >> >>");
        let plan = builder
            .plan(&doc, &mut writer, &owner, &Inherited::default(), "abc", "f")
            .unwrap();

        assert_eq!(plan.id, ObjectId::new(4, 0));
        assert_eq!(builder.font(), Some(ObjectId::new(5, 0)));
        assert_eq!((plan.width, plan.height), (200.0, 20.0));
        assert_eq!(
            String::from_utf8(plan.content.clone()).unwrap(),
            "0.9 g 0 0 200 20 re f /Tx BMC\nq\nBT\n/ACFillFont 10 Tf\n91 7.19 Td\n(abc) Tj\nET\nQ\nEMC 1 0 0 RG"
        );

        builder.write(&mut writer, &plan).unwrap();
        builder.write_font(&mut writer).unwrap();
        let output = writer.finish().unwrap();

        let stream = updated_body(&output, 4).unwrap();
        assert!(stream.starts_with(
            "<< /Type /XObject /Subtype /Form /FormType 1 /BBox [0 0 200 20] /Matrix [1 0 0 1 0 0]"
        ));
        assert!(stream.contains(
            "/Resources << /ProcSet [/PDF /Text] /ColorSpace << /CS0 5 0 R >> /Font << /ACFillFont 5 0 R >> >>"
        ));
        assert!(stream.contains(&format!("/Length {} >>", plan.content.len())));
        assert_eq!(
            updated_body(&output, 5).unwrap(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Courier /Encoding /WinAnsiEncoding >>"
        );
    }

    #[test]
    fn default_appearance_fallback() {
        let data = template();
        let doc = Document::parse(&data).unwrap();
        let mut writer = IncrementalWriter::new(&doc).unwrap();
        let acroform = dict("<< /DR 3 0 R /DA (/Helv 0 Tf 0 g) >>");
        let inherited = Inherited::from_form(&doc, &acroform).unwrap();
        let mut builder = AppearanceBuilder::new(&doc, &acroform, None).unwrap();

        let plan = builder
            .plan(&doc, &mut writer, &dict("<< /T (x) >>"), &inherited, "a(b)", "x")
            .unwrap();
        assert_eq!((plan.width, plan.height), (0.0, 0.0));
        assert_eq!(builder.font(), None);
        assert_eq!(
            String::from_utf8(plan.content.clone()).unwrap(),
            "/Tx BMC\nq\nBT\n/Helv 0 Tf 0 g\n(a\\(b\\)) Tj\nET\nQ\nEMC"
        );

        builder.write(&mut writer, &plan).unwrap();
        builder.write_font(&mut writer).unwrap();
        let output = writer.finish().unwrap();
        let stream = updated_body(&output, plan.id.number).unwrap();
        assert!(stream.contains("/Font << /Helv 4 0 R >>"));
        assert!(!stream.contains("ACFillFont"));
    }

    #[test]
    fn own_da_overrides_inherited() {
        let data = template();
        let doc = Document::parse(&data).unwrap();
        let mut writer = IncrementalWriter::new(&doc).unwrap();
        let acroform = dict("<< /DA (/Helv 0 Tf) >>");
        let inherited = Inherited::from_form(&doc, &acroform).unwrap();
        let mut builder = AppearanceBuilder::new(&doc, &acroform, None).unwrap();

        let owner = dict("<< /Rect [0 0 50 10] /DA (/Cour 8 Tf) >>");
        let plan = builder
            .plan(&doc, &mut writer, &owner, &inherited, "z", "z")
            .unwrap();
        let content = String::from_utf8(plan.content).unwrap();
        assert!(content.contains("/Cour 8 Tf\n(z) Tj"));
    }
}
