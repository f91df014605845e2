//! Derived index document rebuilds for the depot data layer.
//!
//! Recomputes per-coordinate metadata summaries from the live
//! asset/component graph: a depth-first traversal over (namespace, name,
//! base-version) coordinates with enter/exit aggregation, checksum
//! memoization, cooperative cancellation, and aggregated partial failures.

pub mod builder;
pub mod cancel;
pub mod content_access;
pub mod document;
pub mod error;
pub mod failures;
pub mod rebuild;

pub use builder::{IndexBuilder, plugin_prefix};
pub use cancel::CancelToken;
pub use content_access::ContentAccess;
pub use document::{IndexDocument, PluginDescriptor};
pub use error::{IndexError, IndexResult};
pub use failures::{Failure, MultipleFailures};
pub use rebuild::{IndexRebuilder, RebuildOutcome, RebuildRequest};
