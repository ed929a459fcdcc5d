//! Shared error model, pattern lists, and configuration for mdcc.
//!
//! This crate is the foundation depended on by all other mdcc crates.
//! It provides:
//! - [`MdccError`], the unified error type
//! - [`PatternList`], compiled "match any" regex lists
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod patterns;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, INSTRUCTION_PLACEHOLDER, InstructionsConfig, config_dir,
    config_file_path, init_config, init_config_in, load_config, load_config_from,
};
pub use error::{MdccError, Result};
pub use patterns::PatternList;
