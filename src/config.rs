use crate::error::{Result, SidecarError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidecarConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub models: ModelAliases,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            backend: BackendConfig::default(),
            models: ModelAliases::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

fn default_api_key_env() -> String {
    "BACKEND_API_KEY".to_string()
}

/// Client-model-name to backend-model-id lookup table.
///
/// Names without a mapping are valid and pass through unchanged; resolution
/// never fails.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelAliases(HashMap<String, String>);

impl ModelAliases {
    /// Parse a `{"client-name": "backend-id"}` JSON object, the format of
    /// the `MODEL_NAME_MAP` environment variable.
    pub fn from_json(json: &str) -> Result<Self> {
        let map: HashMap<String, String> = serde_json::from_str(json)
            .map_err(|e| SidecarError::config(format!("Invalid model map JSON: {e}")))?;
        Ok(Self(map))
    }

    pub fn resolve(&self, model: &str) -> String {
        self.0
            .get(model)
            .cloned()
            .unwrap_or_else(|| model.to_string())
    }

    /// Client-facing model names, for the `/v1/models` listing.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for ModelAliases {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl SidecarConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SidecarError::config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file.
    /// Priority: CLI arg > CWD > XDG config > home dir. When no file exists
    /// anywhere, fall back to defaults; an environment-only deployment
    /// (`PORT`, `BACKEND_BASE_URL`, `MODEL_NAME_MAP`) needs no file.
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(&candidate);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Apply container-style environment overrides on top of the file config.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("PORT") {
            self.port = port
                .parse()
                .map_err(|_| SidecarError::config(format!("Invalid PORT value '{port}'")))?;
        }

        if let Ok(url) = std::env::var("BACKEND_BASE_URL") {
            self.backend.base_url = Some(url);
        }

        if let Ok(map) = std::env::var("MODEL_NAME_MAP") {
            self.models = ModelAliases::from_json(&map)?;
        }

        Ok(())
    }

    /// The backend base URL; required, from config file or environment.
    pub fn effective_base_url(&self) -> Result<String> {
        self.backend
            .base_url
            .clone()
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                SidecarError::config(
                    "No backend base URL configured. Set [backend].base_url or BACKEND_BASE_URL",
                )
            })
    }

    /// Resolve the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Result<String> {
        std::env::var(&self.backend.api_key_env).map_err(|_| {
            SidecarError::config(format!(
                "Environment variable '{}' not set. Set it with your backend API key.",
                self.backend.api_key_env
            ))
        })
    }
}

fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("converse-sidecar.toml"));

    // XDG / platform config dir
    if cfg!(target_os = "macos") {
        if let Some(home) = home_dir() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join("converse-sidecar")
                    .join("config.toml"),
            );
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(
                PathBuf::from(xdg)
                    .join("converse-sidecar")
                    .join("config.toml"),
            );
        }
        if let Some(home) = home_dir() {
            paths.push(
                home.join(".config")
                    .join("converse-sidecar")
                    .join("config.toml"),
            );
        }
    }

    // Home directory fallback
    if let Some(home) = home_dir() {
        paths.push(home.join(".converse-sidecar.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
