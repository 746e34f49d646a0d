//! Configuration module for Sumi-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every setting has a default, so a configuration file is optional.
//!
//! # Example
//!
//! ```no_run
//! use sumi_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvester will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, HttpConfig, OutputConfig, DEFAULT_SEED_URL, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
