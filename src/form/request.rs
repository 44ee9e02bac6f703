//! Fill requests: the values to write, keyed by fully-qualified field name.

use std::collections::HashMap;

/// A value for one field.
///
/// Which variants make sense depends on the field: text and choice fields display text,
/// checkboxes and radio groups read a selection (see [`FieldValue::selection`]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    /// Plain text, or the single selection of a choice field
    Text(String),
    /// Rich text: `/V` receives `plain`, `/RV` receives `rich`
    RichText {
        /// Plain-text value
        plain: String,
        /// XHTML rich-text value
        rich: String,
    },
    /// The selections of a multi-select choice field
    Choices(Vec<String>),
    /// A checkbox state
    Checked(bool),
    /// The index of the radio kid to select; `None` unselects all
    Selected(Option<usize>),
}

impl FieldValue {
    /// The selected index for checkboxes and radio groups.
    ///
    /// `Checked(true)` selects index 0 and `Checked(false)` nothing. Text and list values count
    /// as selecting index 0 unless they are empty or `"Off"`.
    #[must_use]
    pub fn selection(&self) -> Option<usize> {
        match self {
            FieldValue::Checked(checked) => checked.then_some(0),
            FieldValue::Selected(index) => *index,
            FieldValue::Text(text) | FieldValue::RichText { plain: text, .. } => {
                (!text.is_empty() && text != "Off").then_some(0)
            }
            FieldValue::Choices(items) => match items.first() {
                Some(first) if !first.is_empty() && first != "Off" => Some(0),
                _ => None,
            },
        }
    }

    /// The text shown in a regenerated appearance.
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::RichText { plain, .. } => plain.clone(),
            FieldValue::Choices(items) => items.first().cloned().unwrap_or_default(),
            FieldValue::Checked(checked) => checked.to_string(),
            FieldValue::Selected(index) => index.map(|i| i.to_string()).unwrap_or_default(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Checked(value)
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        FieldValue::Selected(Some(value))
    }
}

impl From<Option<usize>> for FieldValue {
    fn from(value: Option<usize>) -> Self {
        FieldValue::Selected(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::Choices(value)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(value: Vec<&str>) -> Self {
        FieldValue::Choices(value.into_iter().map(str::to_string).collect())
    }
}

/// An immutable mapping from fully-qualified field name to [`FieldValue`].
///
/// Presence of a name is what makes a field match; the value itself may be empty or `false`.
///
/// # Examples
///
/// ```rust
/// use acroscope::{FieldValue, FillRequest};
///
/// let request = FillRequest::new()
///     .with("applicant.name", "Jane Doe")
///     .with("applicant.agree", true)
///     .with("payment.method", 1_usize)
///     .with("interests", vec!["music", "sports"]);
///
/// assert_eq!(request.len(), 4);
/// assert_eq!(request.get("applicant.agree"), Some(&FieldValue::Checked(true)));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FillRequest {
    values: HashMap<String, FieldValue>,
}

impl FillRequest {
    /// Create an empty request.
    #[must_use]
    pub fn new() -> Self {
        FillRequest::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace the value for `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// The value requested for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// `true` if `name` is requested.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of requested fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` if nothing is requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over the requested names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K, V> FromIterator<(K, V)> for FillRequest
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        FillRequest {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, FieldValue>> for FillRequest {
    fn from(values: HashMap<String, FieldValue>) -> Self {
        FillRequest { values }
    }
}
