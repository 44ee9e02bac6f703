//! On-state discovery for checkboxes and radio buttons.
//!
//! A button's appearance dictionary maps state names to appearance streams. Exactly one state is
//! `/Off`; the other one is the name that `/V` and `/AS` must carry when the button is selected.

use crate::{
    pdf::{Dictionary, Document, Name},
    Result,
};

/// Return the one non-`Off` state name of an appearance dictionary.
///
/// The normal appearances (`/N`) are searched first, then the down appearances (`/D`). Returns
/// `None` if neither holds a state other than `Off`.
///
/// # Errors
/// Returns an error if a referenced sub-dictionary cannot be resolved.
pub fn on_state_name(doc: &Document<'_>, ap: &Dictionary) -> Result<Option<Name>> {
    for key in ["N", "D"] {
        let Some(states) = doc.resolve_key(ap, key)? else {
            continue;
        };
        // A stream here is a single appearance without states
        let Some(states) = states.as_dict().filter(|_| states.as_stream().is_none()) else {
            continue;
        };
        let found = states
            .iter()
            .find(|(name, _)| !name.is("Off"))
            .map(|(name, _)| name.clone());
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

/// The on-state of a widget or field dictionary, looked up through its `/AP`.
///
/// # Errors
/// Returns an error if `/AP` or one of its entries cannot be resolved.
pub fn widget_on_state(doc: &Document<'_>, dict: &Dictionary) -> Result<Option<Name>> {
    match doc.resolve_key(dict, "AP")? {
        Some(ap) => match ap.as_dict() {
            Some(ap) => on_state_name(doc, ap),
            None => Ok(None),
        },
        None => Ok(None),
    }
}
