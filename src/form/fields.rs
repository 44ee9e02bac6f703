//! Read-only listing of a form's terminal fields.

use std::collections::HashSet;

use tracing::warn;

use crate::{
    form::field::{partial_name, FieldFlags, FieldKind, Inherited},
    pdf::{Document, Object, ObjectId, Value},
    Error::{MissingForm, RecursionLimit},
    Result,
};

/// Maximum field tree depth followed by [`list_fields`].
const MAX_DEPTH: usize = 64;

/// A terminal field as declared by a template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    /// Fully-qualified name
    pub name: String,
    /// Resolved kind
    pub kind: FieldKind,
    /// Effective flags
    pub flags: FieldFlags,
    /// Current value as display text
    pub value: Option<String>,
    /// Number of widget annotations
    pub widgets: usize,
}

impl FieldInfo {
    /// `true` if a fill request for this field would be written.
    #[must_use]
    pub fn is_fillable(&self) -> bool {
        self.kind.is_fillable()
    }
}

/// List the terminal fields of `doc` in tree order.
///
/// Names and inherited attributes follow the same rules as filling. A node is terminal when it
/// has no kids or none of its kids carries a partial name (its kids are then its widgets).
///
/// # Errors
/// Returns [`crate::Error::MissingForm`] if the catalog has no `/AcroForm` and
/// [`crate::Error::RecursionLimit`] if the tree is deeper than 64 levels.
///
/// A node reached a second time (a shared kid or a cycle) is listed only once.
///
/// # Examples
///
/// ```rust,no_run
/// use acroscope::File;
/// use std::path::Path;
///
/// let file = File::from_file(Path::new("template.pdf"))?;
/// for field in file.fields()? {
///     println!("{} ({:?}) = {:?}", field.name, field.kind, field.value);
/// }
/// # Ok::<(), acroscope::Error>(())
/// ```
pub fn list_fields(doc: &Document<'_>) -> Result<Vec<FieldInfo>> {
    let (_, catalog) = doc.catalog()?;
    let Some(form) = doc.resolve_key(&catalog, "AcroForm")? else {
        return Err(MissingForm);
    };
    if matches!(form.object, Object::Null) {
        return Err(MissingForm);
    }
    let form = form.expect_dict()?;
    let Some(fields) = doc.resolve_key(form, "Fields")? else {
        return Ok(Vec::new());
    };

    let root = Inherited::from_form(doc, form)?;
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut stack: Vec<(Value, String, Inherited, usize)> = fields
        .expect_array()?
        .iter()
        .rev()
        .map(|field| (field.clone(), String::new(), root.clone(), 0))
        .collect();
    let mut found = Vec::new();

    while let Some((node, prefix, inherited, depth)) = stack.pop() {
        if depth > MAX_DEPTH {
            return Err(RecursionLimit(MAX_DEPTH));
        }
        if let Some(id) = node.as_reference() {
            if !visited.insert(id) {
                warn!(object = %id, "field tree reaches object again, skipped");
                continue;
            }
        }
        let node = doc.resolve(&node)?;
        let Some(dict) = node.as_dict() else {
            continue;
        };

        let attributes = inherited.merge(doc, dict)?;
        let name = format!("{prefix}{}", partial_name(doc, dict)?.unwrap_or_default());

        let mut kids = Vec::new();
        if let Some(items) = doc.resolve_key(dict, "Kids")? {
            for kid in items.expect_array()? {
                let resolved = doc.resolve(kid)?;
                if let Some(kid_dict) = resolved.as_dict() {
                    kids.push((kid.clone(), kid_dict.contains("T")));
                }
            }
        }

        if kids.iter().any(|(_, named)| *named) {
            let prefix = format!("{name}.");
            for (kid, _) in kids.into_iter().rev() {
                stack.push((kid, prefix.clone(), attributes.clone(), depth + 1));
            }
            continue;
        }

        let widgets = if kids.is_empty() {
            usize::from(dict.is_widget())
        } else {
            kids.len()
        };
        found.push(FieldInfo {
            name,
            kind: attributes.kind(),
            flags: attributes.flags,
            value: display_value(doc, dict.get("V"))?,
            widgets,
        });
    }

    Ok(found)
}

fn display_value(doc: &Document<'_>, value: Option<&Value>) -> Result<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = doc.resolve(value)?;
    Ok(match &value.object {
        Object::String(string) => Some(string.to_text()),
        Object::Name(name) => Some(name.to_str_lossy()),
        Object::Array(items) => {
            let mut texts = Vec::with_capacity(items.len());
            for item in items {
                if let Some(string) = doc.resolve(item)?.as_string() {
                    texts.push(string.to_text());
                }
            }
            Some(texts.join(", "))
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::forms;

    #[test]
    fn lists_terminal_fields() {
        let data = forms::kitchen_sink();
        let doc = Document::parse(&data).unwrap();
        let fields = list_fields(&doc).unwrap();
        let names: Vec<_> = fields.iter().map(|field| field.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["name", "agree", "color", "fruits", "notes", "submit", "sig", "untyped"]
        );

        let color = &fields[2];
        assert_eq!(color.kind, FieldKind::Radio);
        assert_eq!(color.widgets, 3);
        assert_eq!(color.value.as_deref(), Some("Off"));

        assert_eq!(fields[0].value.as_deref(), Some("Old"));
        assert_eq!(fields[3].kind, FieldKind::Choice);
        assert_eq!(fields[4].kind, FieldKind::Text { rich: true });
        assert!(!fields[5].is_fillable());
        assert_eq!(fields[7].kind, FieldKind::Unknown);
    }

    #[test]
    fn hierarchy_names() {
        let data = forms::hierarchy();
        let doc = Document::parse(&data).unwrap();
        let names: Vec<_> = list_fields(&doc)
            .unwrap()
            .into_iter()
            .map(|field| field.name)
            .collect();
        assert_eq!(names, vec!["person.name.first", "person.name.last", "note"]);
    }

    #[test]
    fn revisits_are_listed_once() {
        let data = forms::cyclic();
        let doc = Document::parse(&data).unwrap();
        assert!(list_fields(&doc).unwrap().is_empty());

        let data = forms::shared_kid();
        let doc = Document::parse(&data).unwrap();
        let names: Vec<_> = list_fields(&doc)
            .unwrap()
            .into_iter()
            .map(|field| field.name)
            .collect();
        assert_eq!(names, vec!["city"]);
    }

    #[test]
    fn missing_form() {
        let data = crate::pdf::writer::minimal_document();
        let doc = Document::parse(&data).unwrap();
        assert!(matches!(list_fields(&doc), Err(MissingForm)));
    }
}
