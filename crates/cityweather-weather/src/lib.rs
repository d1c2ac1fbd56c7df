//! Weather data for CityWeather
//!
//! Provides the record types, canonical city keys, the realtime provider
//! client, and the in-process TTL cache.

pub mod cache;
pub mod key;
pub mod provider;
pub mod types;

pub use cache::{TtlCache, WeatherCache};
pub use key::CityKey;
pub use provider::{WeatherProvider, WeatherSource};
pub use types::*;
