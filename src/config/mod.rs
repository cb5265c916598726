//! Configuration module for the converter
//!
//! Provides types and parsing for `vipp2dfa.toml` configuration.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
