//! Realtime weather provider client.

use std::sync::Arc;

use async_trait::async_trait;
use cityweather_core::{ConfigError, ProviderConfig, ReqwestErrorExt, UpstreamError};
use reqwest::header::ACCEPT;
use reqwest::Client;

use crate::key::CityKey;
use crate::types::UpstreamWeatherResponse;

const USER_AGENT: &str = concat!("cityweather/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Source of current weather for a city.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Fetch current conditions. One attempt, no retry.
    async fn fetch(&self, city: &CityKey) -> Result<UpstreamWeatherResponse, UpstreamError>;
}

/// HTTP client for the provider's realtime endpoint.
#[derive(Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl WeatherProvider {
    /// Build a provider client.
    ///
    /// An empty API key is accepted here and reported on each fetch, so the
    /// process can still start and answer health checks.
    pub fn new(config: &ProviderConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(ReqwestErrorExt::into_upstream_error)?;

        Ok(Self {
            client: Arc::new(client),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.trim().to_string(),
        })
    }

    fn request_url(&self, city: &CityKey) -> String {
        let separator = if self.base_url.contains('?') { '&' } else { '?' };
        // `city` is already percent-encoded
        format!(
            "{}{}location={}&apikey={}",
            self.base_url,
            separator,
            city,
            urlencoding::encode(&self.api_key)
        )
    }
}

#[async_trait]
impl WeatherSource for WeatherProvider {
    async fn fetch(&self, city: &CityKey) -> Result<UpstreamWeatherResponse, UpstreamError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::MissingSetting("provider.api_key (WEATHER_API_KEY)".into()).into());
        }

        tracing::info!("Fetching weather data for city: {}", city);

        let response = self
            .client
            .get(self.request_url(city))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(ReqwestErrorExt::into_upstream_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(ReqwestErrorExt::into_upstream_error)?;

        let weather: UpstreamWeatherResponse =
            serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Decode(e.to_string()))?;

        tracing::info!("Successfully fetched weather data for city: {}", city);
        Ok(weather)
    }
}

impl std::fmt::Debug for WeatherProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .finish()
    }
}
