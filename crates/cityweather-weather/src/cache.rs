//! In-process weather cache with per-entry TTL.
//!
//! One instance lives for the whole process and is shared by every request.
//! Expired entries are never served; they are purged by a periodic sweep,
//! either lazily on access or by the background sweeper task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::types::WeatherRecord;

/// Cache of weather records keyed by canonical city key.
pub type WeatherCache = TtlCache<WeatherRecord>;

/// Cache entry with expiration.
#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    last_sweep: Instant,
}

/// Map with a fixed time-to-live per entry and periodic purge.
#[derive(Debug)]
pub struct TtlCache<V> {
    state: Mutex<CacheState<V>>,
    ttl: Duration,
    sweep_interval: Duration,
}

impl<V: Clone> TtlCache<V> {
    /// Create an empty cache.
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            ttl,
            sweep_interval,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Get a value if present and not expired.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Insert or overwrite a value, restarting its TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_at(key.into(), value, Instant::now());
    }

    /// Purge every expired entry now. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        Self::purge(&mut state, now)
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut state = self.state.lock();
        self.sweep_if_due(&mut state, now);

        match state.entries.get(key) {
            Some(entry) if now < entry.expires_at => {
                tracing::debug!("Cache hit for key: {}", key);
                Some(entry.value.clone())
            }
            _ => {
                tracing::debug!("Cache miss for key: {}", key);
                None
            }
        }
    }

    fn set_at(&self, key: String, value: V, now: Instant) {
        let mut state = self.state.lock();
        self.sweep_if_due(&mut state, now);

        tracing::debug!("Setting cache for key: {}", key);
        state.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    fn sweep_if_due(&self, state: &mut CacheState<V>, now: Instant) {
        if now.saturating_duration_since(state.last_sweep) >= self.sweep_interval {
            Self::purge(state, now);
        }
    }

    fn purge(state: &mut CacheState<V>, now: Instant) -> usize {
        let before = state.entries.len();
        state.entries.retain(|_, entry| now < entry.expires_at);
        state.last_sweep = now;
        before - state.entries.len()
    }
}

impl<V: Clone + Send + 'static> TtlCache<V> {
    /// Start a background task that sweeps every `sweep_interval`.
    ///
    /// The task holds a weak reference and stops once the cache is dropped.
    pub fn spawn_sweeper(cache: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(cache);
        // `interval` panics on a zero period
        let period = cache.sweep_interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else {
                    break;
                };
                let removed = cache.sweep();
                if removed > 0 {
                    tracing::debug!("Swept {} expired cache entries", removed);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    const TTL: Duration = Duration::from_secs(5 * 60);
    const SWEEP: Duration = Duration::from_secs(10 * 60);

    fn record(city: &str) -> WeatherRecord {
        WeatherRecord {
            city: city.to_string(),
            temperature: 18.5,
            humidity: 60,
        }
    }

    #[test]
    fn test_get_missing_key() {
        let cache = WeatherCache::new(TTL, SWEEP);
        assert!(cache.get("Seattle").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_retrievable_within_ttl() {
        let cache = WeatherCache::new(TTL, SWEEP);
        let t0 = Instant::now();
        cache.set_at("Seattle".to_string(), record("Seattle"), t0);

        assert_eq!(cache.get_at("Seattle", t0), Some(record("Seattle")));
        assert_eq!(
            cache.get_at("Seattle", t0 + TTL - Duration::from_millis(1)),
            Some(record("Seattle"))
        );
    }

    #[test]
    fn test_not_retrievable_at_ttl_boundary() {
        let cache = WeatherCache::new(TTL, SWEEP);
        let t0 = Instant::now();
        cache.set_at("Seattle".to_string(), record("Seattle"), t0);

        assert!(cache.get_at("Seattle", t0 + TTL).is_none());
        assert!(cache.get_at("Seattle", t0 + TTL + Duration::from_secs(1)).is_none());
    }

    #[test]
    fn test_set_overwrites_and_restarts_ttl() {
        let cache = WeatherCache::new(TTL, SWEEP);
        let t0 = Instant::now();
        cache.set_at("Seattle".to_string(), record("Seattle"), t0);

        let t1 = t0 + Duration::from_secs(4 * 60);
        let mut newer = record("Seattle");
        newer.temperature = 21.0;
        cache.set_at("Seattle".to_string(), newer.clone(), t1);

        // Past the first entry's TTL but within the second's
        assert_eq!(cache.get_at("Seattle", t0 + TTL + Duration::from_secs(1)), Some(newer));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lazy_sweep_purges_expired_entries() {
        let cache = WeatherCache::new(TTL, SWEEP);
        let t0 = Instant::now();
        cache.set_at("Seattle".to_string(), record("Seattle"), t0);
        cache.set_at("Portland".to_string(), record("Portland"), t0);

        // Expired but not yet swept
        assert!(cache.get_at("Seattle", t0 + TTL).is_none());
        assert_eq!(cache.len(), 2);

        // Any access after the sweep interval purges both
        assert!(cache.get_at("Boise", t0 + SWEEP + Duration::from_secs(1)).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_sweep_keeps_live_entries() {
        let cache = WeatherCache::new(Duration::from_secs(60), Duration::from_secs(60));
        cache.set("Seattle", record("Seattle"));
        assert_eq!(cache.sweep(), 0);
        assert_eq!(cache.get("Seattle"), Some(record("Seattle")));
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(WeatherCache::new(TTL, SWEEP));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        let key = format!("city-{}", (i + j) % 10);
                        cache.set(key.clone(), record(&key));
                        if let Some(found) = cache.get(&key) {
                            assert_eq!(found.city, key);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 10);
    }

    #[tokio::test]
    async fn test_background_sweeper_purges() {
        let cache = Arc::new(WeatherCache::new(
            Duration::from_millis(10),
            Duration::from_millis(20),
        ));
        cache.set("Seattle", record("Seattle"));
        let handle = WeatherCache::spawn_sweeper(&cache);

        tokio::time::sleep(Duration::from_millis(150)).await;
        // len() does not sweep, so only the background task could have emptied it
        assert!(cache.is_empty());

        drop(cache);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
