//! Deterministic JSON for files written by the client.
//!
//! Output uses 2-space indentation, sorted keys (via `BTreeMap` in the
//! source types) and a trailing newline.

mod json;

pub use json::{SerializationError, from_json_bytes, to_json_stable_bytes};
