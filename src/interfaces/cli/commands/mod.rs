//! CLI command implementations
//!
//! This module re-exports all CLI command functions.

mod config_gen;
mod create_admin;
mod purge;

pub use config_gen::config_generate;
pub use create_admin::run_create_admin;
pub use purge::run_purge;
