use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Process-local cache with a fixed time-to-live per entry.
#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: tokio::sync::Mutex<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let guard = self.entries.lock().await;
        let (stored_at, value) = guard.get(key)?;
        if stored_at.elapsed() < self.ttl {
            Some(value.clone())
        } else {
            None
        }
    }

    pub async fn insert(&self, key: impl Into<String>, value: V) {
        let mut guard = self.entries.lock().await;
        // Expired entries are dropped on write.
        let ttl = self.ttl;
        guard.retain(|_, (stored_at, _)| stored_at.elapsed() < ttl);
        guard.insert(key.into(), (Instant::now(), value));
    }
}
