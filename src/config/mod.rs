//! Run Configuration Module
//!
//! Provides per-run analysis configuration loaded from TOML files.
//!
//! ## Loading Order
//!
//! 1. `COSMIC_TIMELINE_CONFIG` environment variable (path to TOML file)
//! 2. `timeline.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! The loaded config is passed by reference to every component; there is no
//! global instance.
//!
//! ```ignore
//! let config = RunConfig::load();
//! let report = pipeline::analyze_run(&inputs, &config)?;
//! ```

mod run_config;
pub mod validation;

pub use run_config::*;
