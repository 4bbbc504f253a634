//! Unit test suite for denorm-cascade
//!
//! Exercises the declaration side of the crate through its public API: path
//! compilation, field validation and collection registration. Nothing here
//! touches a store.
//!
//! ```bash
//! cargo test --test unit
//! ```

mod path_compiler;
