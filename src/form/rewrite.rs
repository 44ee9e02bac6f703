//! Minimal-diff dictionary rewriting.
//!
//! A rewritten object keeps its id and every entry the fill does not change, each copied from
//! the template byte-for-byte. Only the excluded keys are written afresh by the caller.

use crate::{
    pdf::{Dictionary, IncrementalWriter},
    Result,
};

/// Open a rewrite of `original` as the body of the currently open object.
///
/// Every entry whose key is not in `excluded` is copied verbatim, in source order. The output
/// dictionary is left open; the caller writes the excluded keys it wants to keep and then
/// closes it with [`IncrementalWriter::end_dictionary`].
///
/// # Errors
/// Returns [`crate::Error::WriteOrder`] unless this is the first write of the open object's
/// body.
pub fn start_rewrite(
    writer: &mut IncrementalWriter,
    original: &Dictionary,
    excluded: &[&str],
) -> Result<()> {
    if !writer.at_body_start() {
        return Err(write_order_error!(
            "rewrite must be the first write of an object body (open: {:?})",
            writer.open_object()
        ));
    }

    writer.start_dictionary()?;
    for (key, value) in original.iter() {
        if excluded.iter().any(|excluded| key.is(excluded)) {
            continue;
        }
        writer.write_key_name(key)?;
        writer.copy_verbatim(value)?;
    }
    Ok(())
}
