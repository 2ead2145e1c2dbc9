//! Serialization of evaluation reports.

pub(crate) mod float;
mod json;

pub use json::{to_json, to_json_pretty};
