//! strata: orchestration for Terraform-style infrastructure modules.
//!
//! Multi-file module documents, bounded-depth dependency resolution through
//! engine outputs, cached lifecycle hooks, and init/destroy ordering.

pub mod cli;
pub mod core;
pub mod engine;
pub mod getter;
pub mod hooks;
pub mod provenance;
pub mod transport;
