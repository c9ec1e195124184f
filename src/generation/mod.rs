//! Generation deduplication and caching.
//!
//! [`GenerationManager`] keys each generation on [`build_key`] and makes
//! sure identical concurrent requests share one producer run.

pub mod key;
pub mod manager;

pub use key::build_key;
pub use manager::{GenerationManager, GenerationStats};
