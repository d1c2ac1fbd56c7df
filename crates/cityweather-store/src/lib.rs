//! Durable weather table.
//!
//! One row per city, fully replaced on every fresh fetch. The table lives in
//! SQLite; its name comes from configuration.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cityweather_core::{
    is_valid_table_name, ConfigError, PersistenceError, RusqliteErrorExt, StoreConfig,
};
use cityweather_weather::WeatherReport;
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

/// Sink for freshly fetched weather.
#[async_trait]
pub trait WeatherStore: Send + Sync {
    /// Upsert one report keyed by its city. Last write wins; no retry.
    async fn save(&self, report: &WeatherReport) -> Result<(), PersistenceError>;
}

/// A persisted row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredWeather {
    pub city: String,
    pub temperature: f64,
    pub humidity: u8,
    pub location_name: Option<String>,
    pub observed_at: Option<String>,
    pub saved_at: DateTime<Utc>,
}

/// SQLite-backed weather table.
#[derive(Clone)]
pub struct SqliteWeatherStore {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

impl SqliteWeatherStore {
    /// Open the store described by `config`.
    pub fn from_config(config: &StoreConfig) -> Result<Self, PersistenceError> {
        Self::open(&config.database_path, &config.table_name)
    }

    /// Open or create the database and table.
    pub fn open(path: &Path, table: &str) -> Result<Self, PersistenceError> {
        let table = checked_table_name(table)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PersistenceError::ConnectionFailed(format!(
                    "Failed to create {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| e.into_persistence_error())?;
        Self::with_connection(conn, table)
    }

    /// Create an in-memory store. Contents vanish with the process.
    pub fn in_memory(table: &str) -> Result<Self, PersistenceError> {
        let table = checked_table_name(table)?;
        let conn = Connection::open_in_memory().map_err(|e| e.into_persistence_error())?;
        Self::with_connection(conn, table)
    }

    fn with_connection(conn: Connection, table: String) -> Result<Self, PersistenceError> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            table,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), PersistenceError> {
        self.conn
            .lock()
            .execute_batch(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS "{}" (
                    city TEXT PRIMARY KEY,
                    temperature REAL NOT NULL,
                    humidity INTEGER NOT NULL,
                    location_name TEXT,
                    observed_at TEXT,
                    saved_at TEXT NOT NULL
                );
                "#,
                self.table
            ))
            .map_err(|e| e.into_persistence_error())
    }

    /// Insert or fully replace the row for `report.record.city`.
    pub fn upsert(&self, report: &WeatherReport) -> Result<(), PersistenceError> {
        let record = &report.record;
        let saved_at = Utc::now().to_rfc3339();

        self.conn
            .lock()
            .execute(
                &format!(
                    r#"INSERT INTO "{}" (city, temperature, humidity, location_name, observed_at, saved_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(city) DO UPDATE SET
                        temperature = excluded.temperature,
                        humidity = excluded.humidity,
                        location_name = excluded.location_name,
                        observed_at = excluded.observed_at,
                        saved_at = excluded.saved_at"#,
                    self.table
                ),
                params![
                    record.city,
                    record.temperature,
                    record.humidity,
                    report.location_name,
                    report.observed_at,
                    saved_at,
                ],
            )
            .map_err(|e| e.into_persistence_error())?;

        Ok(())
    }

    /// Get the row for a city key.
    pub fn get(&self, city: &str) -> Result<Option<StoredWeather>, PersistenceError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                r#"SELECT city, temperature, humidity, location_name, observed_at, saved_at
                 FROM "{}" WHERE city = ?1"#,
                self.table
            ))
            .map_err(|e| e.into_persistence_error())?;

        let row = stmt
            .query_row([city], |row| {
                let saved_at_str: String = row.get(5)?;
                Ok(StoredWeather {
                    city: row.get(0)?,
                    temperature: row.get(1)?,
                    humidity: row.get(2)?,
                    location_name: row.get(3)?,
                    observed_at: row.get(4)?,
                    saved_at: DateTime::parse_from_rfc3339(&saved_at_str)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                        })?,
                })
            })
            .optional()
            .map_err(|e| e.into_persistence_error())?;

        Ok(row)
    }

    /// Number of rows in the table.
    pub fn count(&self) -> Result<usize, PersistenceError> {
        let count: i64 = self
            .conn
            .lock()
            .query_row(&format!(r#"SELECT COUNT(*) FROM "{}""#, self.table), [], |row| {
                row.get(0)
            })
            .map_err(|e| e.into_persistence_error())?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl WeatherStore for SqliteWeatherStore {
    async fn save(&self, report: &WeatherReport) -> Result<(), PersistenceError> {
        let store = self.clone();
        let report = report.clone();

        tokio::task::spawn_blocking(move || {
            store.upsert(&report)?;
            tracing::info!("Successfully saved weather data for city: {}", report.record.city);
            Ok::<(), PersistenceError>(())
        })
        .await
        .map_err(|e| PersistenceError::TaskFailed(e.to_string()))?
    }
}

impl std::fmt::Debug for SqliteWeatherStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteWeatherStore")
            .field("table", &self.table)
            .finish()
    }
}

fn checked_table_name(table: &str) -> Result<String, PersistenceError> {
    let table = table.trim();
    if table.is_empty() {
        return Err(ConfigError::MissingSetting("store.table_name (DB_TABLE_NAME)".into()).into());
    }
    if !is_valid_table_name(table) {
        return Err(ConfigError::Invalid(format!("table name not allowed: {}", table)).into());
    }
    Ok(table.to_string())
}
