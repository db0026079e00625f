//! Configuration management
//!
//! Settings are loaded from several sources and merged in priority order,
//! highest first:
//!
//! 1. Environment variables (`DEPOT_*`)
//! 2. Project `depot.json`
//! 3. Global `<config dir>/depot/config.json` (or `$DEPOT_HOME/config.json`)
//! 4. Built-in defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use depot_pm::config::Config;
//! use std::path::Path;
//!
//! let config = Config::build(Some(Path::new("/path/to/project")), true).unwrap();
//! println!("Package root: {:?}", config.get_package_root());
//! ```

mod config;
mod source;

pub use config::{Config, DEFAULT_REPOSITORY, DEFAULT_VCS_URL_TEMPLATE};
pub use source::{ConfigLoader, ConfigSource, RawConfig, PROJECT_CONFIG_FILE};
