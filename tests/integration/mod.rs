//! Integration test suite for denorm-cascade
//!
//! End-to-end propagation scenarios run against the in-memory store. Every
//! test declares its collections, seeds the store, saves or removes through a
//! [`CascadeEngine`](denorm_cascade::cascade::CascadeEngine) and inspects both
//! the stored records and the returned report.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! RUST_LOG=denorm_cascade=debug cargo test --test integration -- --nocapture
//! ```
//!
//! # Test Organization
//!
//! - **casting**: cast failures and what they leave behind
//! - **config**: engine configuration files
//! - **end_to_end**: the Author/Book snapshot scenario
//! - **failures**: store failures in the middle of a cascade
//! - **internal_fields**: fields storing their own references
//! - **propagation**: cycles, diamonds, enforced and voluntary recompute
//! - **remove**: cascades triggered by removal

mod casting;
mod failures;
mod internal_fields;
mod propagation;
mod remove;
