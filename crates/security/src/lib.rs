//! Security policy for Stepwise tools.
//!
//! The file tool may touch the host filesystem directly, so every path it
//! receives goes through [`PathPolicy`] first.

pub mod path;

pub use path::{PathPolicy, PathValidationError};
