//! Fixed-window rate limiting keyed by identity and route.
//!
//! The counter store is a trait so deployments can swap the in-process map
//! for a shared backend without touching admission logic. Expired windows
//! are swept opportunistically: at most once per sweep interval, piggybacked
//! on an admission check, so an idle limiter holds stale entries but a busy
//! one stays bounded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

/// Counter state backing the limiter.
///
/// Implementations must be safe under concurrent admission checks for the
/// same key; `hit` is a single atomic read-modify-write per call.
pub trait CounterStore: Send + Sync {
    /// Record one hit against `key` and return `(count, window_start_ms)`
    /// for the window containing `now_ms`. A window older than `window_ms`
    /// restarts fresh at `now_ms` before counting.
    fn hit(&self, key: &str, now_ms: u64, window_ms: u64) -> (u32, u64);

    /// Drop every window that ended before `now_ms`.
    fn purge(&self, now_ms: u64, window_ms: u64);
}

struct Window {
    start_ms: u64,
    count: u32,
}

/// In-process [`CounterStore`] on a mutex-guarded map.
#[derive(Default)]
pub struct MemoryStore {
    windows: Mutex<HashMap<String, Window>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl CounterStore for MemoryStore {
    fn hit(&self, key: &str, now_ms: u64, window_ms: u64) -> (u32, u64) {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let window = windows.entry(key.to_string()).or_insert(Window {
            start_ms: now_ms,
            count: 0,
        });

        if now_ms.saturating_sub(window.start_ms) >= window_ms {
            window.start_ms = now_ms;
            window.count = 0;
        }

        window.count = window.count.saturating_add(1);
        (window.count, window.start_ms)
    }

    fn purge(&self, now_ms: u64, window_ms: u64) {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let before = windows.len();
        windows.retain(|_, w| now_ms.saturating_sub(w.start_ms) < window_ms);
        let dropped = before - windows.len();
        if dropped > 0 {
            debug!(dropped, "purged expired rate limit windows");
        }
    }
}

/// Limiter configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Admissions allowed per key per window.
    pub max_requests: u32,
    /// Window length.
    pub window: Duration,
    /// Minimum spacing between opportunistic sweeps.
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

/// Outcome of one admission check, with everything needed to build the
/// response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Epoch seconds at which the current window ends.
    pub reset_at: u64,
    /// How long the caller should wait; present only when rejected.
    pub retry_after: Option<Duration>,
}

impl Admission {
    /// Rate limit headers for the response. `Retry-After` appears only on
    /// rejection; the `X-RateLimit-*` trio is always present.
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("X-RateLimit-Limit", self.limit.to_string()),
            ("X-RateLimit-Remaining", self.remaining.to_string()),
            ("X-RateLimit-Reset", self.reset_at.to_string()),
        ];
        if let Some(wait) = self.retry_after {
            // Whole seconds, rounded up so the client never retries early
            let secs = wait.as_millis().div_ceil(1000);
            headers.push(("Retry-After", secs.to_string()));
        }
        headers
    }
}

/// Fixed-window limiter over a [`CounterStore`].
pub struct RateLimiter<S: CounterStore> {
    store: S,
    config: RateLimitConfig,
    last_sweep_ms: AtomicU64,
}

impl RateLimiter<MemoryStore> {
    pub fn in_memory(config: RateLimitConfig) -> Self {
        Self::new(MemoryStore::new(), config)
    }
}

impl<S: CounterStore> RateLimiter<S> {
    pub fn new(store: S, config: RateLimitConfig) -> Self {
        Self {
            store,
            config,
            last_sweep_ms: AtomicU64::new(0),
        }
    }

    /// Check and record one request for `(identity, route)`.
    pub fn admit(&self, identity: &str, route: &str) -> Admission {
        self.admit_at(identity, route, now_ms())
    }

    /// [`admit`](Self::admit) with an explicit clock reading.
    pub fn admit_at(&self, identity: &str, route: &str, now_ms: u64) -> Admission {
        self.maybe_sweep(now_ms);

        let window_ms = self.config.window.as_millis() as u64;
        let key = format!("{}:{}", identity, route);
        let (count, start_ms) = self.store.hit(&key, now_ms, window_ms);

        let allowed = count <= self.config.max_requests;
        let window_end_ms = start_ms + window_ms;
        Admission {
            allowed,
            limit: self.config.max_requests,
            remaining: self.config.max_requests.saturating_sub(count),
            reset_at: window_end_ms / 1000,
            retry_after: (!allowed)
                .then(|| Duration::from_millis(window_end_ms.saturating_sub(now_ms))),
        }
    }

    fn maybe_sweep(&self, now_ms: u64) {
        let interval_ms = self.config.sweep_interval.as_millis() as u64;
        let last = self.last_sweep_ms.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) < interval_ms {
            return;
        }
        // One thread wins the slot; losers skip and move on
        if self
            .last_sweep_ms
            .compare_exchange(last, now_ms, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            self.store
                .purge(now_ms, self.config.window.as_millis() as u64);
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
