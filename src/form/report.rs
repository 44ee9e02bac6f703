//! Outcome of a fill operation.

use std::fmt;

/// Which requested names were filled, skipped, or never found.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Names whose value was written, in tree order
    pub filled: Vec<String>,
    /// Names matched to a push-button, signature or untyped field, in tree order
    pub skipped: Vec<String>,
    /// Requested names not present in the field tree, sorted
    pub unmatched: Vec<String>,
}

impl FillReport {
    /// `true` if every requested name was filled.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.unmatched.is_empty()
    }
}

impl fmt::Display for FillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} filled, {} skipped, {} unmatched",
            self.filled.len(),
            self.skipped.len(),
            self.unmatched.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary() {
        let report = FillReport {
            filled: vec!["a".into(), "b".into()],
            skipped: vec![],
            unmatched: vec!["z".into()],
        };
        assert_eq!(report.to_string(), "2 filled, 0 skipped, 1 unmatched");
        assert!(!report.is_complete());
        assert!(FillReport::default().is_complete());
    }
}
