// ============================
// crates/backend-lib/src/middleware/rate_limit.rs
// ============================
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use metrics::counter;

use crate::metrics::RATE_LIMITED;
use crate::storage::Storage;
use crate::{error::AppError, AppState};

/// Rate limit entry for a client
#[derive(Debug)]
struct RateLimitEntry {
    requests: u32,
    window_start: Instant,
}

/// Fixed-window request counter keyed by client address
#[derive(Debug)]
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            entries: DashMap::new(),
            window,
            max_requests,
        }
    }

    /// Create a shared limiter.
    ///
    /// Inside a tokio runtime this also starts a task that prunes stale
    /// clients once per window, so the table only holds clients seen recently.
    /// The task stops once the last `Arc` is dropped.
    pub fn shared(window: Duration, max_requests: u32) -> Arc<Self> {
        let limiter = Arc::new(Self::new(window, max_requests));
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(prune_task(Arc::downgrade(&limiter), window));
        }
        limiter
    }

    pub fn tracked_clients(&self) -> usize {
        self.entries.len()
    }

    /// Count a request from `key`. Returns false once the client is over its limit.
    pub fn check(&self, key: &str) -> bool {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| RateLimitEntry {
                requests: 0,
                window_start: Instant::now(),
            });

        // Check if window has expired
        if entry.window_start.elapsed() > self.window {
            entry.requests = 0;
            entry.window_start = Instant::now();
        }

        if entry.requests >= self.max_requests {
            return false;
        }
        entry.requests += 1;
        true
    }

    /// Forget clients whose window has passed
    pub fn prune(&self) {
        let window = self.window;
        self.entries
            .retain(|_, entry| entry.window_start.elapsed() <= window);
    }
}

/// Forgets stale clients once per window
async fn prune_task(limiter: Weak<RateLimiter>, window: Duration) {
    loop {
        tokio::time::sleep(window).await;
        let Some(limiter) = limiter.upgrade() else {
            break;
        };
        limiter.prune();
    }
}

/// Rate limiter middleware
pub async fn rate_limit<S: Storage + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_ip = request
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown");

    if !state.rate_limiter.check(client_ip) {
        counter!(RATE_LIMITED).increment(1);
        tracing::warn!(client = client_ip, "rate limit exceeded");
        return Err(AppError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}
