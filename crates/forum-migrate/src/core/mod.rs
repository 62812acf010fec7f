//! Core abstractions shared by every layer of the engine.
//!
//! - [`value`]: SQL value and row representation
//! - [`identifier`]: identifier validation and quoting

pub mod identifier;
pub mod value;

pub use value::{Row, Value};
