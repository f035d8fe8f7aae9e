//! Core orchestration logic: documents, merging, resolution, state, commands.

pub mod dependency;
pub mod error;
pub mod executor;
pub mod loader;
pub mod merge;
pub mod parser;
pub mod resolver;
pub mod state;
pub mod types;
