//! Aggregated partial failures.

use crate::error::IndexError;
use std::fmt;

/// One failed document write.
#[derive(Debug)]
pub struct Failure {
    pub path: String,
    pub error: IndexError,
}

/// Collects individual document-write failures across a rebuild pass so the
/// traversal can finish before surfacing them together.
#[derive(Debug, Default)]
pub struct MultipleFailures {
    failures: Vec<Failure>,
}

impl MultipleFailures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: impl Into<String>, error: IndexError) {
        self.failures.push(Failure {
            path: path.into(),
            error,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Failure> {
        self.failures.iter()
    }

    pub fn into_failures(self) -> Vec<Failure> {
        self.failures
    }
}

impl fmt::Display for MultipleFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure(s)", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "; {}: {}", failure.path, failure.error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_and_reports_failures() {
        let mut failures = MultipleFailures::new();
        assert!(failures.is_empty());

        failures.add("/a/index.json", IndexError::Content("backend down".into()));
        failures.add("/b/index.json", IndexError::Content("backend down".into()));

        assert_eq!(failures.len(), 2);
        let text = failures.to_string();
        assert!(text.starts_with("2 failure(s)"));
        assert!(text.contains("/a/index.json"));
    }
}
