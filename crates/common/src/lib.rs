//! Shared types and naming conventions used across all relay crates.

pub mod naming;
pub mod types;

pub use types::Message;
