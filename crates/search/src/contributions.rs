//! Pluggable per-property query contributions.

use crate::builder::SearchQueryBuilder;
use crate::error::{SearchError, SearchResult};
use crate::filter::SearchFilter;
use depot_core::compare_versions;
use std::cmp::Ordering;

/// A contribution translates one recognized filter property into query
/// clause(s) on the shared builder. Contributions must not mutate filters or
/// touch storage.
pub trait SearchContribution: Send + Sync {
    fn contribute(
        &self,
        builder: &mut SearchQueryBuilder,
        filter: &SearchFilter,
    ) -> SearchResult<()>;
}

/// Map a filter property to a column identifier: lowercased, `.` and `-`
/// become `_`, anything outside `[a-z0-9_]` is dropped. An empty result is a
/// malformed filter — this is what keeps contributed fragments free of
/// injected SQL.
pub fn column_name(property: &str) -> SearchResult<String> {
    let column: String = property
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c == '.' || c == '-' { '_' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();
    if column.is_empty() || column.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(SearchError::invalid_filter(
            property,
            "property does not map to a column name",
        ));
    }
    Ok(column)
}

/// Escape LIKE metacharacters so filter tokens match literally.
fn escape_like(token: &str) -> String {
    token
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Fallback contribution for any property without a registered handler.
///
/// Splits the raw value on whitespace; every token must match the property's
/// column as a case-insensitive substring. Tokens are AND-combined within
/// the filter, and filters are AND-combined with each other.
#[derive(Debug, Default)]
pub struct DefaultContribution;

impl SearchContribution for DefaultContribution {
    fn contribute(
        &self,
        builder: &mut SearchQueryBuilder,
        filter: &SearchFilter,
    ) -> SearchResult<()> {
        let column = column_name(&filter.property)?;
        let mut terms = Vec::new();
        for token in filter.value.split_whitespace() {
            let pattern = format!("%{}%", escape_like(&token.to_ascii_lowercase()));
            let name = builder.bind(&column, pattern);
            terms.push(format!("lower({column}) LIKE :{name} ESCAPE '\\'"));
        }
        if !terms.is_empty() {
            builder.add_condition(format!("({})", terms.join(" AND ")));
        }
        Ok(())
    }
}

/// Contribution for the `version` property: exact values and bracketed
/// ranges (`[1.0,2.0]`, `(1.0,2.0)`, half-open variants).
///
/// An unparsable range is a per-filter data-validation failure and does not
/// corrupt clauses already contributed by other filters.
#[derive(Debug, Default)]
pub struct VersionContribution;

impl SearchContribution for VersionContribution {
    fn contribute(
        &self,
        builder: &mut SearchQueryBuilder,
        filter: &SearchFilter,
    ) -> SearchResult<()> {
        let column = column_name(&filter.property)?;
        let mut terms = Vec::new();
        for token in filter.value.split_whitespace() {
            if token.starts_with(['[', '(']) {
                terms.push(range_condition(builder, &column, &filter.property, token)?);
            } else {
                let name = builder.bind(&column, token);
                terms.push(format!("{column} = :{name}"));
            }
        }
        if !terms.is_empty() {
            builder.add_condition(format!("({})", terms.join(" AND ")));
        }
        Ok(())
    }
}

fn range_condition(
    builder: &mut SearchQueryBuilder,
    column: &str,
    property: &str,
    token: &str,
) -> SearchResult<String> {
    let malformed = |reason: &str| SearchError::invalid_filter(property, format!("{reason}: {token}"));

    let lower_inclusive = match token.as_bytes().first() {
        Some(b'[') => true,
        Some(b'(') => false,
        _ => return Err(malformed("range must start with [ or (")),
    };
    let upper_inclusive = match token.as_bytes().last() {
        Some(b']') => true,
        Some(b')') => false,
        _ => return Err(malformed("range must end with ] or )")),
    };

    let inner = &token[1..token.len() - 1];
    let Some((low, high)) = inner.split_once(',') else {
        return Err(malformed("range needs a comma-separated pair"));
    };
    let (low, high) = (low.trim(), high.trim());
    if low.is_empty() && high.is_empty() {
        return Err(malformed("range needs at least one bound"));
    }
    if !low.is_empty() && !high.is_empty() && compare_versions(low, high) == Ordering::Greater {
        return Err(malformed("range lower bound is above its upper bound"));
    }

    let mut bounds = Vec::new();
    if !low.is_empty() {
        let name = builder.bind(column, low);
        let op = if lower_inclusive { ">=" } else { ">" };
        bounds.push(format!("{column} {op} :{name}"));
    }
    if !high.is_empty() {
        let name = builder.bind(column, high);
        let op = if upper_inclusive { "<=" } else { "<" };
        bounds.push(format!("{column} {op} :{name}"));
    }
    Ok(format!("({})", bounds.join(" AND ")))
}
