//! Search query composition: filter dispatch and special-filter extraction.

use crate::builder::SearchQueryBuilder;
use crate::contributions::{DefaultContribution, SearchContribution, VersionContribution};
use crate::error::SearchResult;
use crate::filter::{FORMAT_PROPERTY, REPOSITORY_NAME_PROPERTY, SearchFilter};
use std::collections::HashMap;

/// Assembles search filters into one parameterized predicate, dispatching
/// per-property semantics to registered contributions.
///
/// This is the data layer's one pluggability point: format-specific search
/// extensions register contributions here. Properties without a registered
/// contribution fall back to the default substring-match contribution, so an
/// unrecognized property is never an error by itself.
pub struct SearchQueryComposer {
    contributions: HashMap<String, Box<dyn SearchContribution>>,
    default: Box<dyn SearchContribution>,
}

impl SearchQueryComposer {
    /// Composer with the built-in contributions registered.
    pub fn new() -> Self {
        let mut composer = Self::empty();
        composer.register("version", VersionContribution);
        composer
    }

    /// Composer with only the default contribution.
    pub fn empty() -> Self {
        Self {
            contributions: HashMap::new(),
            default: Box::new(DefaultContribution),
        }
    }

    /// Register a contribution for a property, replacing any previous one.
    pub fn register(
        &mut self,
        property: impl Into<String>,
        contribution: impl SearchContribution + 'static,
    ) {
        self.contributions
            .insert(property.into(), Box::new(contribution));
    }

    /// Compose the filters into a query builder.
    ///
    /// The `format` and `repository_name` filters are extracted into the
    /// builder instead of contributing clauses. Composition is
    /// all-or-nothing: the first contribution failure aborts the call, since
    /// a conjunctive predicate missing one conjunct would silently widen the
    /// result set.
    pub fn build_query(&self, filters: &[SearchFilter]) -> SearchResult<SearchQueryBuilder> {
        let mut builder = SearchQueryBuilder::new();

        if let Some(format) = self.get_format(filters) {
            builder.set_format(format);
        }
        if let Some(repository) = self.get_repository_filter(filters) {
            builder.set_repository_filter(repository);
        }

        for filter in filters {
            if filter.property == FORMAT_PROPERTY || filter.property == REPOSITORY_NAME_PROPERTY {
                continue;
            }
            self.contribution_for(&filter.property)
                .contribute(&mut builder, filter)?;
        }
        Ok(builder)
    }

    /// Extract the format selector, if the filters carry one.
    pub fn get_format(&self, filters: &[SearchFilter]) -> Option<String> {
        filters
            .iter()
            .find(|filter| filter.property == FORMAT_PROPERTY)
            .map(|filter| filter.value.clone())
    }

    /// Extract the repository-name filter, unparsed, if the filters carry one.
    pub fn get_repository_filter(&self, filters: &[SearchFilter]) -> Option<SearchFilter> {
        filters
            .iter()
            .find(|filter| filter.property == REPOSITORY_NAME_PROPERTY)
            .cloned()
    }

    fn contribution_for(&self, property: &str) -> &dyn SearchContribution {
        match self.contributions.get(property) {
            Some(contribution) => contribution.as_ref(),
            None => self.default.as_ref(),
        }
    }
}

impl Default for SearchQueryComposer {
    fn default() -> Self {
        Self::new()
    }
}
