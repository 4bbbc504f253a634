//! Global constants used throughout the crate.
//!
//! Concurrency bounds are the defaults of [`CascadeConfig`](crate::config::CascadeConfig);
//! the configuration can lower or raise them per engine.

/// Suffix appended to an internal-mode field key when no `to` is given.
pub const DEFAULT_SUFFIX: &str = "Data";

/// Denormalized fields of one record recomputed at the same time.
///
/// Each recompute may fetch related records, so this bounds the number of
/// fetches a single save keeps in flight.
pub const DEFAULT_FIELD_CONCURRENCY: usize = 2;

/// Join bindings of one dependency edge queried at the same time.
pub const DEFAULT_BINDING_CONCURRENCY: usize = 2;

/// Related records of one sequence or keyed relation fetched at the same time.
pub const RELATED_FETCH_CONCURRENCY: usize = 2;
