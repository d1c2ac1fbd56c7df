//! Request pipeline: validate, cache lookup, fetch, persist, cache, respond.

use std::sync::Arc;

use cityweather_core::AppError;
use cityweather_store::WeatherStore;
use cityweather_weather::{CityKey, WeatherCache, WeatherRecord, WeatherReport, WeatherSource};

/// Status code and optional JSON body for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status: u16,
    pub body: Option<String>,
}

impl HandlerResponse {
    fn ok(body: String) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }

    fn from_error(err: &AppError) -> Self {
        Self {
            status: err.status_code(),
            body: None,
        }
    }
}

/// Orchestrates one weather lookup per call.
///
/// The cache is shared by every request in the process. Persistence gates
/// cache population: a record that failed to save is never cached.
pub struct RequestHandler {
    cache: Arc<WeatherCache>,
    source: Arc<dyn WeatherSource>,
    store: Arc<dyn WeatherStore>,
}

impl RequestHandler {
    pub fn new(
        cache: Arc<WeatherCache>,
        source: Arc<dyn WeatherSource>,
        store: Arc<dyn WeatherStore>,
    ) -> Self {
        Self {
            cache,
            source,
            store,
        }
    }

    pub fn cache(&self) -> &Arc<WeatherCache> {
        &self.cache
    }

    /// Handle a request carrying the raw `city` query parameter.
    pub async fn handle(&self, city: Option<&str>) -> HandlerResponse {
        let result = self
            .lookup(city)
            .await
            .and_then(|record| serde_json::to_string(&record).map_err(AppError::from));

        match result {
            Ok(body) => HandlerResponse::ok(body),
            Err(err) => {
                if err.is_client_error() {
                    tracing::warn!("Rejected request: {}", err);
                } else if let AppError::Serialization(e) = &err {
                    tracing::error!("Error marshalling response data: {}", e);
                }
                HandlerResponse::from_error(&err)
            }
        }
    }

    /// Resolve a city to its current record.
    ///
    /// Side effects run strictly in order: cache read, then on a miss fetch,
    /// persist and cache write. Nothing is retried.
    pub async fn lookup(&self, city: Option<&str>) -> Result<WeatherRecord, AppError> {
        let key = city
            .and_then(CityKey::parse)
            .ok_or_else(|| AppError::validation("city parameter is required"))?;

        if let Some(record) = self.cache.get(key.as_str()) {
            tracing::info!("Returning cached data for city: {}", key);
            return Ok(record);
        }

        let response = self.source.fetch(&key).await.map_err(|e| {
            tracing::error!("Error fetching weather data for city {}: {}", key, e);
            AppError::from(e)
        })?;

        let report = WeatherReport::from_upstream(&key, response);

        self.store.save(&report).await.map_err(|e| {
            tracing::error!("Error saving weather data for city {}: {}", key, e);
            AppError::from(e)
        })?;

        self.cache.set(key.as_str(), report.record.clone());

        tracing::info!("Returning new data for city: {}", key);
        Ok(report.record)
    }
}

impl std::fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandler")
            .field("cached_entries", &self.cache.len())
            .finish()
    }
}
