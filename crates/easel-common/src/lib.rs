//! Common utilities for the Easel style engine.
//!
//! This crate provides shared infrastructure used by the engine crates:
//! - **Warning System** - deduplicated warnings for unsupported constructs
//! - **URI Resolution** - resolving stylesheet references against a document home

pub mod url;
pub mod warning;
