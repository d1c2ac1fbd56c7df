use serde::{Deserialize, Serialize};

use crate::key::CityKey;

/// Current conditions for one city.
///
/// This is what the cache holds and what callers receive. A record is never
/// mutated after construction; a fresh fetch produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeatherRecord {
    pub city: String,
    pub temperature: f64,
    pub humidity: u8,
}

/// A freshly fetched observation, ready to be persisted.
///
/// Carries the provider-reported location name and observation time
/// alongside the record. The record itself is always keyed by the
/// canonical city key, never by the provider's name.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub record: WeatherRecord,
    pub location_name: Option<String>,
    pub observed_at: Option<String>,
}

impl WeatherReport {
    /// Project an upstream payload onto the fields we keep.
    pub fn from_upstream(key: &CityKey, response: UpstreamWeatherResponse) -> Self {
        let values = response.data.values;
        Self {
            record: WeatherRecord {
                city: key.as_str().to_string(),
                temperature: values.temperature,
                humidity: humidity_percent(values.humidity),
            },
            location_name: response.location.name.filter(|n| !n.is_empty()),
            observed_at: response.data.time,
        }
    }
}

/// Round a provider humidity reading to a whole percentage.
fn humidity_percent(raw: f64) -> u8 {
    raw.round().clamp(0.0, 100.0) as u8
}

/// Full realtime payload from the weather provider.
///
/// Only temperature, humidity and the location name survive projection;
/// the rest is decoded so structural mismatches are caught early.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamWeatherResponse {
    pub data: UpstreamData,
    #[serde(default)]
    pub location: UpstreamLocation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamData {
    pub time: Option<String>,
    pub values: UpstreamValues,
}

/// Measured values. The provider reports `null` for readings it does not
/// have (cloud base and ceiling on clear days, for example), so everything
/// except temperature and humidity is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamValues {
    pub temperature: f64,
    pub humidity: f64,
    pub temperature_apparent: Option<f64>,
    pub dew_point: Option<f64>,
    pub cloud_base: Option<f64>,
    pub cloud_ceiling: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub precipitation_probability: Option<f64>,
    pub rain_intensity: Option<f64>,
    pub freezing_rain_intensity: Option<f64>,
    pub sleet_intensity: Option<f64>,
    pub snow_intensity: Option<f64>,
    pub pressure_surface_level: Option<f64>,
    pub visibility: Option<f64>,
    pub wind_direction: Option<f64>,
    pub wind_gust: Option<f64>,
    pub wind_speed: Option<f64>,
    pub uv_index: Option<u32>,
    pub uv_health_concern: Option<u32>,
    pub weather_code: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamLocation {
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}
