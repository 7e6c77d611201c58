//! Application configuration using Figment
//!
//! Configuration is layered (later wins):
//! 1. Built-in defaults
//! 2. `front-desk.toml` (or the file passed with `--config`)
//! 3. Environment variables prefixed with `FRONT_DESK_`, `__` between levels
//!
//! # Example
//! ```no_run
//! use front_desk::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! println!("Record file: {}", config.storage.record_file.display());
//! # Ok::<(), figment::Error>(())
//! ```
//!
//! `FRONT_DESK_SERVER__PORT=8080` overrides `server.port`.

use crate::importer::{ColumnLayout, SpreadsheetImporter};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "front-desk.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub web: WebConfig,
    /// trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Only origin allowed by CORS
    pub cors_origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON record file, rewritten on every new registration
    pub record_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Spreadsheet merged at startup. Unset or missing file = no import.
    pub spreadsheet: Option<PathBuf>,
    pub skip_rows: usize,
    pub first_name_column: usize,
    pub last_name_column: usize,
    pub bank_column: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub static_dir: PathBuf,
    /// Language tag when the request has no `?lang=`
    pub default_lang: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            import: ImportConfig::default(),
            web: WebConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origin: "http://127.0.0.1:3000".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            record_file: PathBuf::from("public/people_list.json"),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        let layout = ColumnLayout::default();
        ImportConfig {
            spreadsheet: None,
            skip_rows: 3,
            first_name_column: layout.first_name,
            last_name_column: layout.last_name,
            bank_column: layout.bank,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        WebConfig {
            static_dir: PathBuf::from("public"),
            default_lang: "th".to_string(),
        }
    }
}

impl From<&ImportConfig> for SpreadsheetImporter {
    fn from(config: &ImportConfig) -> Self {
        SpreadsheetImporter::new(
            config.skip_rows,
            ColumnLayout {
                first_name: config.first_name_column,
                last_name: config.last_name_column,
                bank: config.bank_column,
            },
        )
    }
}

impl AppConfig {
    /// Load from `front-desk.toml` and environment variables
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from a specific file. A missing file just means defaults + env.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("FRONT_DESK_").split("__"))
            .extract()
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.server.port == 0 {
            return Err("server.port must be non-zero".to_string());
        }

        let import = &self.import;
        if import.first_name_column == import.last_name_column
            || import.first_name_column == import.bank_column
            || import.last_name_column == import.bank_column
        {
            return Err(format!(
                "Import columns must be distinct (first={}, last={}, bank={})",
                import.first_name_column, import.last_name_column, import.bank_column
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
