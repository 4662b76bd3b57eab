use std::fmt;
use std::sync::Arc;

use regex::Regex;

/// Decides which lines of a file are routed at all. Rejected lines are neither
/// published nor written to a fallback file.
#[derive(Clone, Default)]
pub enum LineFilter {
    #[default]
    AcceptAll,
    Matching(Regex),
    Custom(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl LineFilter {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        LineFilter::Custom(Arc::new(predicate))
    }

    pub fn accepts(&self, line: &str) -> bool {
        match self {
            LineFilter::AcceptAll => true,
            LineFilter::Matching(regex) => regex.is_match(line),
            LineFilter::Custom(predicate) => predicate(line),
        }
    }
}

impl fmt::Debug for LineFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineFilter::AcceptAll => f.write_str("AcceptAll"),
            LineFilter::Matching(regex) => {
                f.debug_tuple("Matching").field(&regex.as_str()).finish()
            }
            LineFilter::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_all_is_the_default() {
        let filter = LineFilter::default();
        assert!(filter.accepts(""));
        assert!(filter.accepts("anything"));
    }

    #[test]
    fn custom_predicate() {
        let filter = LineFilter::custom(|line| line.len() > 3);
        assert!(filter.accepts("long line"));
        assert!(!filter.accepts("no"));
        assert_eq!(format!("{filter:?}"), "Custom(..)");
    }
}
