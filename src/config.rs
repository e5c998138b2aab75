use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("HOME is not set, pass --config explicitly")]
    NoHome,
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Client configuration persisted between invocations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub api: String,
    #[serde(default)]
    pub scope_filter: ScopeFilterSettings,
}

/// Commands whose input may be run through the scope filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTarget {
    DomainAdd,
    ScopeRemoval,
}

/// When domain input is checked against the company scope before submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFilterSettings {
    /// Filter unless `--no-filter` is given. When false, `--filter` is required.
    #[serde(default = "default_enabled_by_default")]
    pub enabled_by_default: bool,
    /// Also filter the input of `remove-inscope` / `remove-outscope`.
    #[serde(default)]
    pub apply_to_scope_removals: bool,
}

fn default_enabled_by_default() -> bool {
    true
}

impl Default for ScopeFilterSettings {
    fn default() -> Self {
        Self {
            enabled_by_default: default_enabled_by_default(),
            apply_to_scope_removals: false,
        }
    }
}

impl ScopeFilterSettings {
    /// Whether filtering runs for `target`, given an optional per-invocation
    /// override (`--filter` = Some(true), `--no-filter` = Some(false)).
    pub fn is_active(&self, target: FilterTarget, cli_override: Option<bool>) -> bool {
        match target {
            FilterTarget::ScopeRemoval if !self.apply_to_scope_removals => false,
            _ => cli_override.unwrap_or(self.enabled_by_default),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }
}

impl Config {
    /// `$HOME/.bbrf/config.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::NoHome)?;
        Ok(PathBuf::from(home).join(".bbrf").join("config.json"))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if content.trim().is_empty() {
            return Ok(Config::default());
        }

        let config = match ConfigFormat::for_path(path) {
            ConfigFormat::Json => serde_json::from_str(&content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(&content)?,
        };
        Ok(config)
    }

    /// Load the configuration, falling back to defaults when the file is absent.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "Configuration file '{}' not found, using defaults",
                path.display()
            );
            Ok(Config::default())
        }
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))
                    .map_err(io_err)?;
            }
        }

        let content = match ConfigFormat::for_path(path) {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Yaml => serde_yaml::to_string(self)?,
        };
        std::fs::write(path, content).map_err(io_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }

        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        !self.token.is_empty() && !self.api.is_empty()
    }
}
