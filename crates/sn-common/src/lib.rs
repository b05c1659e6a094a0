//! sn-common — shared types, error taxonomy, and enums used across all
//! Signal/Noise crates.

pub mod error;
pub mod enums;

pub use error::{SnError, SnResult};
