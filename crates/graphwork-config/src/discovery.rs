//! Config file discovery, layered merging and environment overrides.
//!
//! Resolution order (later overrides earlier):
//! 1. `<config dir>/config.toml` (user config)
//! 2. `./graphwork.toml` (project-local)
//! 3. `GRAPH_API_*` environment variables
//! 4. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::secrets::{EnvLookup, process_env};
use crate::{
    AppConfig, ConfigError, DelegatedConfig, ExchangeConfig, GraphConfig, Result, SiteConfig,
};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "graphwork.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for platform directory resolution.
const APP_NAME: &str = "graphwork";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "GRAPHWORK_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration.
    pub config: GraphConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Environment variables that overrode a file value.
    pub env_overrides: Vec<&'static str>,
    /// Warnings generated during loading (e.g. plaintext secrets).
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration from the default locations and the process environment.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None, &process_env)
}

/// Load configuration with explicit control over the user config directory
/// and the environment.
///
/// `config_dir` overrides both `GRAPHWORK_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
    env: EnvLookup<'_>,
) -> Result<LoadedConfig> {
    let mut config = GraphConfig::new();
    let mut sources = Vec::new();
    let mut warnings = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_path(),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path, &mut warnings));
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path, &mut warnings));

    for section in config.plaintext_secret_sections() {
        warnings.push(format!(
            "[{}] contains a plaintext client_secret. \
             Consider using an environment variable instead.",
            section
        ));
    }

    let env_overrides = apply_env_overrides(&mut config, env);

    Ok(LoadedConfig {
        config,
        sources,
        env_overrides,
        warnings,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<GraphConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    GraphConfig::from_toml(&contents)
}

/// Path of the user config file.
pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// The user config directory.
///
/// Checks `GRAPHWORK_CONFIG_DIR` first, then falls back to the platform default
/// (`~/.config/graphwork` on Linux).
pub fn user_config_dir() -> Option<PathBuf> {
    if let Some(dir) = process_env(CONFIG_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Apply `GRAPH_API_*` overrides. Returns the variables that were applied.
///
/// | Variable | Field |
/// |---|---|
/// | `GRAPH_API_TENANT_ID` | `delegated.tenant_id` |
/// | `GRAPH_API_CLIENT_ID` | `delegated.client_id` |
/// | `GRAPH_API_SITE_ID` | `site.site_id` |
/// | `GRAPH_API_APP_TENANT_ID` | `app.tenant_id` |
/// | `GRAPH_API_APP_CLIENT_ID` | `app.client_id` |
/// | `GRAPH_API_EXCHANGE_TENANT_ID` | `exchange.tenant_id` |
/// | `GRAPH_API_EXCHANGE_CLIENT_ID` | `exchange.client_id` |
///
/// Client secrets are not copied into the config; they are resolved when the
/// settings are read.
pub fn apply_env_overrides(config: &mut GraphConfig, env: EnvLookup<'_>) -> Vec<&'static str> {
    let mut applied = Vec::new();
    let mut set = |var: &'static str, slot: &mut Option<String>| {
        if let Some(value) = env(var).filter(|v| !v.trim().is_empty()) {
            *slot = Some(value);
            applied.push(var);
        }
    };

    let delegated = config.delegated.get_or_insert_with(DelegatedConfig::default);
    set("GRAPH_API_TENANT_ID", &mut delegated.tenant_id);
    set("GRAPH_API_CLIENT_ID", &mut delegated.client_id);

    let site = config.site.get_or_insert_with(SiteConfig::default);
    set("GRAPH_API_SITE_ID", &mut site.site_id);

    let app = config.app.get_or_insert_with(AppConfig::default);
    set("GRAPH_API_APP_TENANT_ID", &mut app.tenant_id);
    set("GRAPH_API_APP_CLIENT_ID", &mut app.client_id);

    let exchange = config.exchange.get_or_insert_with(ExchangeConfig::default);
    set("GRAPH_API_EXCHANGE_TENANT_ID", &mut exchange.tenant_id);
    set("GRAPH_API_EXCHANGE_CLIENT_ID", &mut exchange.client_id);

    applied
}

/// Try to load a config file and merge it into the existing config.
fn load_layer(config: &mut GraphConfig, path: &Path, warnings: &mut Vec<String>) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        };
    }

    match load_config_file(path) {
        Ok(layer) => {
            config.merge(layer);
            ConfigSource {
                path: path.to_path_buf(),
                loaded: true,
            }
        }
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource {
                path: path.to_path_buf(),
                loaded: false,
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
