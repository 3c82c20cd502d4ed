//! CLI command handlers

pub mod commands;

pub use commands::{generate, ranges, subscripts, GenerateOptions};
