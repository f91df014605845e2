//! Mutable query builder state shared across contributions.

use crate::filter::SearchFilter;
use std::collections::BTreeMap;

/// Accumulates the composed predicate: an ordered list of condition
/// fragments, a name→value parameter map, and the extracted special filters.
///
/// One builder is created per search call and passed by mutable reference to
/// every contribution. Parameter names are made unique by a builder-wide
/// sequence number, so two filters touching the same logical column never
/// collide.
#[derive(Debug, Default)]
pub struct SearchQueryBuilder {
    conditions: Vec<String>,
    parameters: BTreeMap<String, String>,
    parameter_seq: usize,
    format: Option<String>,
    repository_filter: Option<SearchFilter>,
}

impl SearchQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one condition fragment. Fragments are AND-combined in
    /// [`where_clause`](Self::where_clause).
    pub fn add_condition(&mut self, condition: impl Into<String>) {
        self.conditions.push(condition.into());
    }

    /// Register a parameter value and return its unique placeholder name
    /// (`hint` suffixed with the occurrence sequence number). Conditions
    /// reference it as `:{name}`.
    pub fn bind(&mut self, hint: &str, value: impl Into<String>) -> String {
        let name = format!("{hint}_{}", self.parameter_seq);
        self.parameter_seq += 1;
        self.parameters.insert(name.clone(), value.into());
        name
    }

    /// The composed WHERE-clause fragment, or `None` when no generic
    /// condition was contributed.
    pub fn where_clause(&self) -> Option<String> {
        if self.conditions.is_empty() {
            None
        } else {
            Some(self.conditions.join(" AND "))
        }
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    /// The extracted `format` filter value, if one was supplied.
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// The extracted `repository_name` filter, left unparsed for the caller
    /// to resolve into repository identifiers.
    pub fn repository_filter(&self) -> Option<&SearchFilter> {
        self.repository_filter.as_ref()
    }

    pub(crate) fn set_format(&mut self, format: String) {
        self.format = Some(format);
    }

    pub(crate) fn set_repository_filter(&mut self, filter: SearchFilter) {
        self.repository_filter = Some(filter);
    }
}
