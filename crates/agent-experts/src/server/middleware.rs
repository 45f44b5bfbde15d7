use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Query, Request, State};
use axum::http::HeaderName;
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;

use super::{ApiError, AppState};

static API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Paths reachable without an API key.
const PUBLIC_PATHS: &[&str] = &["/", "/health"];

/// Sliding-window request limiter keyed by client.
///
/// Clients whose requests all left the window are forgotten, at most one
/// window after their last request.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    state: Mutex<LimiterState>,
}

#[derive(Debug, Default)]
struct LimiterState {
    requests: HashMap<String, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

impl LimiterState {
    /// Drops clients without requests in the window ending at `now`.
    fn sweep(&mut self, now: Instant, window: Duration) {
        self.requests.retain(|_, log| {
            log.back()
                .is_some_and(|t| now.saturating_duration_since(*t) < window)
        });
        self.last_sweep = Some(now);
    }
}

impl RateLimiter {
    /// Allows `max_requests` per client within any `window`.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Mutex::default(),
        }
    }

    /// Records a request of `client` and returns whether it is allowed.
    #[inline]
    pub fn check(&self, client: &str) -> bool {
        self.check_at(client, Instant::now())
    }

    /// Returns the number of clients currently remembered.
    pub fn tracked_clients(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_at(&self, client: &str, now: Instant) -> bool {
        let mut state = self.lock();
        let sweep_due = state
            .last_sweep
            .is_none_or(|t| now.saturating_duration_since(t) >= self.window);
        if sweep_due {
            state.sweep(now, self.window);
        }

        let log = state.requests.entry(client.to_owned()).or_default();
        while log
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= self.window)
        {
            log.pop_front();
        }
        if log.len() >= self.max_requests {
            return false;
        }
        log.push_back(now);
        true
    }
}

fn client_ip(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

/// Rejects clients that exceeded their rate limit with 429.
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_ip(&request);
    if !state.rate_limiter.check(&client) {
        warn!("rate limit exceeded for client: {client}");
        return Err(ApiError::rate_limited());
    }
    Ok(next.run(request).await)
}

#[derive(Deserialize)]
struct ApiKeyQuery {
    api_key: Option<String>,
}

/// Rejects requests without a known API key with 401, when keys are
/// required.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let settings = &state.settings;
    if !settings.require_api_key
        || PUBLIC_PATHS.contains(&request.uri().path())
    {
        return Ok(next.run(request).await);
    }

    let key = request
        .headers()
        .get(&API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
        .or_else(|| {
            Query::<ApiKeyQuery>::try_from_uri(request.uri())
                .ok()
                .and_then(|Query(q)| q.api_key)
        });
    match key {
        Some(key) if settings.api_keys.contains(&key) => {
            Ok(next.run(request).await)
        }
        _ => {
            warn!(
                "rejected request to {} without a valid API key",
                request.uri().path()
            );
            Err(ApiError::unauthorized())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_per_client() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.check_at("10.0.0.1", now));
        assert!(limiter.check_at("10.0.0.1", now));
        assert!(!limiter.check_at("10.0.0.1", now));
        assert!(limiter.check_at("10.0.0.2", now));
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();
        assert!(limiter.check_at("client", start));
        assert!(limiter.check_at("client", start + Duration::from_secs(30)));
        assert!(!limiter.check_at("client", start + Duration::from_secs(59)));

        // The first request left the window, the second has not.
        assert!(limiter.check_at("client", start + Duration::from_secs(60)));
        assert!(!limiter.check_at("client", start + Duration::from_secs(61)));
        assert!(limiter.check_at("client", start + Duration::from_secs(90)));
    }

    #[test]
    fn test_idle_clients_are_forgotten() {
        let limiter = RateLimiter::new(5, Duration::from_secs(1));
        let start = Instant::now();
        for i in 0..1000 {
            let client = format!("10.0.{}.{}", i / 256, i % 256);
            assert!(limiter.check_at(&client, start));
        }
        assert_eq!(limiter.tracked_clients(), 1000);

        let later = start + Duration::from_secs(3600);
        assert!(limiter.check_at("10.9.9.9", later));
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_active_clients_survive_sweeps() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();
        assert!(limiter.check_at("a", start));
        assert!(limiter.check_at("b", start + Duration::from_secs(5)));

        // Sweeps at 10s: "a" expired, "b" is still limited.
        assert!(limiter.check_at("c", start + Duration::from_secs(10)));
        assert_eq!(limiter.tracked_clients(), 2);
        assert!(!limiter.check_at("b", start + Duration::from_secs(11)));
    }

    #[test]
    fn test_rejected_requests_are_not_counted() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();
        assert!(limiter.check_at("client", start));
        assert!(!limiter.check_at("client", start + Duration::from_secs(5)));
        assert!(limiter.check_at("client", start + Duration::from_secs(10)));
    }
}
