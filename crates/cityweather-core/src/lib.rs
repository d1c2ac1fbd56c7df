pub mod config;
pub mod error;

pub use config::{
    is_valid_table_name, CacheConfig, Config, ProviderConfig, ServerConfig, StoreConfig,
    ValidationResult,
};
pub use error::{
    AppError, ConfigError, PersistenceError, ReqwestErrorExt, RusqliteErrorExt, UpstreamError,
};

use anyhow::Result;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Initialize logging.
///
/// Warnings and errors go to stderr, everything else to stdout. Each line
/// carries level, timestamp and source location.
pub fn init() -> Result<()> {
    let writer = std::io::stderr
        .with_max_level(tracing::Level::WARN)
        .or_else(std::io::stdout);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;

    tracing::info!("CityWeather core initialized");
    Ok(())
}
