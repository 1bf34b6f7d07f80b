//! Configuration system for graphwork.
//!
//! Provides TOML-based configuration with:
//! - One section per credential flow (`[app]`, `[delegated]`, `[exchange]`)
//! - The SharePoint site and workbook range used by the workflow (`[site]`)
//! - Config file layering (user config dir + project-local overrides)
//! - `GRAPH_API_*` environment overrides
//! - Secret resolution (env var → config file, with a warning)

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, apply_env_overrides, load_config, load_config_file,
    load_config_with_options, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use secrets::{EnvLookup, ResolvedSecret, SecretSource, process_env, resolve_secret};
pub use types::*;
