//! Application configuration management.

use std::path::{Path, PathBuf};

use asset_report::emit::Backend;
use serde::Deserialize;

/// Prefix of environment overrides, e.g. `ASSET_REPORT__SERVER__PORT=8080`.
pub const ENV_PREFIX: &str = "ASSET_REPORT";

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Where asset records are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Firestore,
    File,
}

/// Record store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,
    /// Google Cloud project; taken from the credentials file when absent.
    pub project_id: Option<String>,
    /// Service account key file; `GOOGLE_APPLICATION_CREDENTIALS` is used when absent.
    pub credentials_path: Option<PathBuf>,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// `host:port` of a Firestore emulator.  No credentials are needed then.
    pub emulator_host: Option<String>,
    /// JSON file with an array of records, for the `file` store.
    pub path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            project_id: None,
            credentials_path: None,
            collection: default_collection(),
            emulator_host: None,
            path: None,
        }
    }
}

fn default_collection() -> String {
    "patrimonios".to_string()
}

/// Report rendering configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub backend: Backend,
    /// Directory receiving the generated files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Font directory for the table backend.
    pub fonts_dir: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            output_dir: default_output_dir(),
            fonts_dir: None,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl AppConfig {
    /// Loads configuration from config files and the environment.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`, the explicit file
    /// when given, then `ASSET_REPORT__*` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be read or the result does not deserialize.
    pub fn load(explicit: Option<&Path>) -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
