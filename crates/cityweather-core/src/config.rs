use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "CITYWEATHER_CONFIG";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Upstream weather provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Durable weather table
    #[serde(default)]
    pub store: StoreConfig,

    /// In-process cache timings
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Realtime weather endpoint
    #[serde(default = "default_provider_url")]
    pub base_url: String,

    /// API key sent as the `apikey` query parameter.
    /// Normally supplied through `WEATHER_API_KEY` rather than the file.
    #[serde(default)]
    pub api_key: String,
}

fn default_provider_url() -> String {
    "https://api.tomorrow.io/v4/weather/realtime".to_string()
}

impl ProviderConfig {
    /// Check if an API key is configured
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_url(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file holding the weather table
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Table name (one row per city)
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cityweather")
        .join("weather.db")
}

fn default_table_name() -> String {
    "WeatherData".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            table_name: default_table_name(),
        }
    }
}

/// Returns true if `name` can be interpolated into SQL as a table name.
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a cached record is served (default: 300)
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// How often expired entries are purged (default: 600)
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_ttl_seconds() -> u64 {
    5 * 60
}

fn default_sweep_interval_seconds() -> u64 {
    10 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Config {
    /// Load configuration from the config file (if any) and the environment.
    ///
    /// Missing files are not an error: serverless hosts usually configure
    /// everything through environment variables.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) if std::env::var_os(CONFIG_PATH_ENV).is_some() => {
                anyhow::bail!("Configuration file not found: {}", path.display())
            }
            _ => Self::default(),
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("WEATHER_API_KEY") {
            self.provider.api_key = key;
        }
        if let Some(url) = lookup("CITYWEATHER_PROVIDER_URL") {
            self.provider.base_url = url;
        }
        if let Some(table) = lookup("DB_TABLE_NAME") {
            self.store.table_name = table;
        }
        if let Some(path) = lookup("CITYWEATHER_DB_PATH") {
            self.store.database_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup("CITYWEATHER_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.provider.base_url, "provider.base_url", &mut result);

        // A missing key fails each request, not startup
        if !self.provider.is_configured() {
            result.add_warning(
                "provider.api_key",
                "Weather API key not configured - every lookup will fail",
            );
        }

        if self.store.table_name.is_empty() {
            result.add_error("store.table_name", "Table name must not be empty");
        } else if !is_valid_table_name(&self.store.table_name) {
            result.add_error(
                "store.table_name",
                format!(
                    "Table name must match [A-Za-z_][A-Za-z0-9_]*, got: {}",
                    self.store.table_name
                ),
            );
        }

        if self.store.database_path.as_os_str().is_empty() {
            result.add_error("store.database_path", "Database path must not be empty");
        }

        if self.cache.ttl_seconds == 0 {
            result.add_error("cache.ttl_seconds", "Cache TTL must be greater than 0");
        }
        if self.cache.sweep_interval_seconds == 0 {
            result.add_error(
                "cache.sweep_interval_seconds",
                "Sweep interval must be greater than 0",
            );
        } else if self.cache.sweep_interval_seconds < self.cache.ttl_seconds {
            result.add_warning(
                "cache.sweep_interval_seconds",
                "Sweep interval is shorter than the cache TTL",
            );
        }

        if self.server.bind_addr.parse::<SocketAddr>().is_err() {
            result.add_error(
                "server.bind_addr",
                format!("Invalid listen address: {}", self.server.bind_addr),
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Get the path to the configuration file
    fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }

        dirs::config_dir().map(|dir| dir.join("cityweather").join("config.toml"))
    }
}
