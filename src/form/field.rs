//! Field attributes: type, flags, quadding and inheritance.
//!
//! A field's behaviour is determined by `/FT` and `/Ff`, both of which may be omitted on the node
//! itself and inherited from an ancestor. [`Inherited`] carries the inheritable attributes down
//! the tree explicitly, seeded with the AcroForm's own `/DA` and `/Q`.

use std::str::FromStr;

use bitflags::bitflags;
use strum::{Display, EnumString, FromRepr, IntoStaticStr};

use crate::{
    pdf::{Dictionary, Document, PdfString, Value},
    Result,
};

/// The `/FT` field type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, IntoStaticStr, Display)]
pub enum FieldType {
    /// Push-buttons, checkboxes and radio buttons
    #[strum(serialize = "Btn")]
    Button,
    /// Text fields
    #[strum(serialize = "Tx")]
    Text,
    /// List boxes and combo boxes
    #[strum(serialize = "Ch")]
    Choice,
    /// Signature fields
    #[strum(serialize = "Sig")]
    Signature,
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    /// The `/Ff` field flags. Bit positions are 1-based in the PDF reference.
    pub struct FieldFlags : u32 {
        /// The user may not change the value
        const READ_ONLY = 1 << 0;
        /// The field must have a value when exported
        const REQUIRED = 1 << 1;
        /// The field must not be exported
        const NO_EXPORT = 1 << 2;
        /// Text: multiple lines
        const MULTILINE = 1 << 12;
        /// Text: password entry
        const PASSWORD = 1 << 13;
        /// Radio: exactly one button must be selected at all times
        const NO_TOGGLE_TO_OFF = 1 << 14;
        /// Button: radio button group
        const RADIO = 1 << 15;
        /// Button: push-button without a value
        const PUSHBUTTON = 1 << 16;
        /// Choice: combo box instead of list box
        const COMBO = 1 << 17;
        /// Choice: combo box with an editable text box
        const EDIT = 1 << 18;
        /// Choice: options are sorted
        const SORT = 1 << 19;
        /// Text: the value is a file path
        const FILE_SELECT = 1 << 20;
        /// Choice: more than one option may be selected
        const MULTI_SELECT = 1 << 21;
        /// Text and choice: no spell checking
        const DO_NOT_SPELL_CHECK = 1 << 22;
        /// Text: no scrolling
        const DO_NOT_SCROLL = 1 << 23;
        /// Text: comb of `/MaxLen` characters
        const COMB = 1 << 24;
        /// Text: the value is rich text (`/RV`)
        const RICH_TEXT = 1 << 25;
        /// Choice: commit on selection change
        const COMMIT_ON_SEL_CHANGE = 1 << 26;
    }
}

/// The `/Q` quadding (horizontal alignment) of variable text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum Quadding {
    /// Left-justified
    #[default]
    Left = 0,
    /// Centered
    Center = 1,
    /// Right-justified
    Right = 2,
}

impl Quadding {
    /// Horizontal text offset inside a box of `box_width` for text of `text_width`.
    #[must_use]
    pub fn offset(self, box_width: f64, text_width: f64) -> f64 {
        match self {
            Quadding::Left => 0.0,
            Quadding::Center => (box_width - text_width) / 2.0,
            Quadding::Right => box_width - text_width,
        }
    }
}

/// How a field behaves when filled, derived from its type and flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoStaticStr)]
pub enum FieldKind {
    /// A push-button; it has no value
    PushButton,
    /// A checkbox
    CheckBox,
    /// A radio button group
    Radio,
    /// A text field
    Text {
        /// `true` if the rich-text flag is set
        rich: bool,
    },
    /// A list or combo box
    Choice,
    /// A signature field; it cannot be filled
    Signature,
    /// No `/FT` anywhere in the ancestry, or an unknown type
    Unknown,
}

impl FieldKind {
    /// Resolve the behaviour from the effective field type and flags.
    #[must_use]
    pub fn resolve(field_type: Option<FieldType>, flags: FieldFlags) -> FieldKind {
        match field_type {
            Some(FieldType::Button) if flags.contains(FieldFlags::PUSHBUTTON) => {
                FieldKind::PushButton
            }
            Some(FieldType::Button) if flags.contains(FieldFlags::RADIO) => FieldKind::Radio,
            Some(FieldType::Button) => FieldKind::CheckBox,
            Some(FieldType::Text) => FieldKind::Text {
                rich: flags.contains(FieldFlags::RICH_TEXT),
            },
            Some(FieldType::Choice) => FieldKind::Choice,
            Some(FieldType::Signature) => FieldKind::Signature,
            None => FieldKind::Unknown,
        }
    }

    /// `true` for kinds that accept a value.
    #[must_use]
    pub fn is_fillable(self) -> bool {
        !matches!(
            self,
            FieldKind::PushButton | FieldKind::Signature | FieldKind::Unknown
        )
    }
}

/// The inheritable attributes in effect at a node.
#[derive(Clone, Debug, Default)]
pub struct Inherited {
    /// Effective `/FT`
    pub field_type: Option<FieldType>,
    /// Effective `/Ff`
    pub flags: FieldFlags,
    /// Effective `/DA`
    pub da: Option<PdfString>,
    /// Effective `/Q`
    pub quadding: Option<Quadding>,
    /// Effective `/Opt`, resolved to a direct array
    pub options: Option<Value>,
}

impl Inherited {
    /// Seed the chain from the AcroForm dictionary's `/DA` and `/Q`.
    ///
    /// # Errors
    /// Returns an error if a referenced value cannot be resolved.
    pub fn from_form(doc: &Document<'_>, acroform: &Dictionary) -> Result<Inherited> {
        Ok(Inherited {
            da: da(doc, acroform)?,
            quadding: quadding(doc, acroform)?,
            ..Inherited::default()
        })
    }

    /// Attributes in effect at `dict`: its own values override the inherited ones.
    ///
    /// # Errors
    /// Returns an error if a referenced value cannot be resolved.
    pub fn merge(&self, doc: &Document<'_>, dict: &Dictionary) -> Result<Inherited> {
        let field_type = match doc.resolve_key(dict, "FT")? {
            Some(value) => value
                .as_name()
                .and_then(|name| FieldType::from_str(&name.to_str_lossy()).ok()),
            None => self.field_type,
        };
        let flags = match doc.resolve_key(dict, "Ff")? {
            Some(value) => value
                .as_i64()
                .and_then(|bits| u32::try_from(bits & 0xFFFF_FFFF).ok())
                .map_or(self.flags, FieldFlags::from_bits_retain),
            None => self.flags,
        };
        let options = match doc.resolve_key(dict, "Opt")? {
            Some(value) => Some(value.into_owned()),
            None => self.options.clone(),
        };

        Ok(Inherited {
            field_type,
            flags,
            da: da(doc, dict)?.or_else(|| self.da.clone()),
            quadding: quadding(doc, dict)?.or(self.quadding),
            options,
        })
    }

    /// The resolved field kind.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        FieldKind::resolve(self.field_type, self.flags)
    }
}

/// A dictionary's own `/DA`, if it is a string.
///
/// # Errors
/// Returns an error if the value cannot be resolved.
pub fn da(doc: &Document<'_>, dict: &Dictionary) -> Result<Option<PdfString>> {
    Ok(doc
        .resolve_key(dict, "DA")?
        .and_then(|value| value.as_string().cloned()))
}

/// A dictionary's own `/Q`, if it is a valid quadding.
///
/// # Errors
/// Returns an error if the value cannot be resolved.
pub fn quadding(doc: &Document<'_>, dict: &Dictionary) -> Result<Option<Quadding>> {
    Ok(doc
        .resolve_key(dict, "Q")?
        .and_then(|value| value.as_i64())
        .and_then(|q| u8::try_from(q).ok())
        .and_then(Quadding::from_repr))
}

/// A node's own partial name (`/T`), decoded as a text string.
///
/// # Errors
/// Returns an error if the value cannot be resolved.
pub fn partial_name(doc: &Document<'_>, dict: &Dictionary) -> Result<Option<String>> {
    Ok(doc
        .resolve_key(dict, "T")?
        .and_then(|value| value.as_string().map(PdfString::to_text)))
}
