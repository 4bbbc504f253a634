//! Core types shared by every layer of the crate.
//!
//! - [`error`] - the [`DenormError`] taxonomy and helpers for locating it in
//!   an [`anyhow::Error`] chain
//! - [`record`] - [`Record`], [`RecordId`], [`InstanceKey`] and
//!   [`RelatedValue`], the in-memory form of stored documents

pub mod error;
pub mod record;

pub use error::{DenormError, find_denorm_error};
pub use record::{InstanceKey, Record, RecordId, RelatedValue};
