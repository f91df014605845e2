//! Search filters.

/// Property selecting the per-format search table to query; never part of
/// the generic predicate.
pub const FORMAT_PROPERTY: &str = "format";

/// Property selecting the repositories to search; extracted unparsed for the
/// caller to resolve, never part of the generic predicate.
pub const REPOSITORY_NAME_PROPERTY: &str = "repository_name";

/// One free-form search filter: a property name and a raw value string.
/// Transient, supplied per query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchFilter {
    pub property: String,
    pub value: String,
}

impl SearchFilter {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}
