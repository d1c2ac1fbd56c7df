//! Process-wide service context: builds the components once and owns their lifecycle.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use cityweather_core::{AppError, Config, ConfigError};
use cityweather_store::{SqliteWeatherStore, WeatherStore};
use cityweather_weather::{WeatherCache, WeatherProvider, WeatherSource};
use tokio::task::JoinHandle;

use crate::handler::RequestHandler;
use crate::routes;

/// Process-wide service state and lifecycle.
///
/// Owns the single cache for this process. Build it once on start (inside a
/// Tokio runtime, since it starts the cache sweeper) and share the router.
pub struct ServiceContext {
    config: Arc<Config>,
    handler: Arc<RequestHandler>,
    sweeper: JoinHandle<()>,
}

impl ServiceContext {
    /// Build every component from configuration.
    ///
    /// Fails with `AppError::Config` if the configuration has errors.
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let validation = config.validate();
        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        let provider = WeatherProvider::new(&config.provider)?;
        let store = SqliteWeatherStore::from_config(&config.store)?;

        tracing::info!(
            "Using weather table {} in {}",
            store.table_name(),
            config.store.database_path.display()
        );

        Ok(Self::with_components(config, Arc::new(provider), Arc::new(store)))
    }

    /// Build around an explicit upstream source and store.
    pub fn with_components(
        config: Config,
        source: Arc<dyn WeatherSource>,
        store: Arc<dyn WeatherStore>,
    ) -> Self {
        let cache = Arc::new(WeatherCache::new(
            Duration::from_secs(config.cache.ttl_seconds),
            Duration::from_secs(config.cache.sweep_interval_seconds),
        ));
        let sweeper = WeatherCache::spawn_sweeper(&cache);

        tracing::info!(
            "Service initialized (cache ttl {:?}, sweep every {:?})",
            cache.ttl(),
            cache.sweep_interval()
        );

        let handler = Arc::new(RequestHandler::new(cache, source, store));

        Self {
            config: Arc::new(config),
            handler,
            sweeper,
        }
    }

    /// Get reference to service config
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn handler(&self) -> Arc<RequestHandler> {
        self.handler.clone()
    }

    /// HTTP router bound to this context's handler.
    pub fn router(&self) -> Router {
        routes::router(self.handler.clone())
    }

    /// Stop background work.
    pub fn shutdown(self) {
        tracing::info!("Shutting down service");
        self.sweeper.abort();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_from_config_opens_store() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.store.database_path = dir.path().join("weather.db");
        config.cache.ttl_seconds = 60;

        let context = ServiceContext::from_config(config).unwrap();
        assert_eq!(context.config().cache.ttl_seconds, 60);
        assert_eq!(context.handler().cache().ttl(), Duration::from_secs(60));
        assert!(dir.path().join("weather.db").exists());

        context.shutdown();
    }

    #[tokio::test]
    async fn test_from_config_rejects_bad_table() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.store.database_path = dir.path().join("weather.db");
        config.store.table_name = "no spaces allowed".to_string();

        let err = ServiceContext::from_config(config).err().unwrap();
        assert!(matches!(err, AppError::Config(ConfigError::Invalid(_))), "{err:?}");
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_from_config_rejects_zero_ttl() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.store.database_path = dir.path().join("weather.db");
        config.cache.ttl_seconds = 0;

        let err = ServiceContext::from_config(config).err().unwrap();
        assert!(matches!(err, AppError::Config(_)), "{err:?}");
        // Nothing is opened for an invalid config
        assert!(!dir.path().join("weather.db").exists());
    }
}
