//! CLI command implementations.

pub mod common;
pub mod coverage;
pub mod decode;
pub mod fetch;
