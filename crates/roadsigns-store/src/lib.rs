//! Storage layer: the persisted JSON snapshot and the manual overrides file.

mod error;
mod json;

pub use error::StoreError;
pub use json::{JsonStore, load_overrides};
