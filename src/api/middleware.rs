//! API Middleware (Rate Limiting, Logging)

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{Html, IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::handlers::{status_of, AppState};
use super::types::{ApiError, ApiResponse};
use super::views;
use crate::models::errors::ErrorCode;
use crate::utils::constants::{DEFAULT_RATE_LIMIT_PER_MINUTE, RATE_LIMIT_CLEANUP_INTERVAL_SECS};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests per window
    pub requests_per_window: u32,
    /// Window duration
    pub window_duration: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: DEFAULT_RATE_LIMIT_PER_MINUTE,
            window_duration: Duration::from_secs(60),
        }
    }
}

/// Fixed-window in-memory rate limiter keyed by client
pub struct RateLimiter {
    /// Request count and window start per client
    requests: DashMap<String, (u32, Instant)>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            requests: DashMap::new(),
            config,
        }
    }

    /// Check if request is allowed, returns (allowed, remaining, reset_seconds)
    pub fn check(&self, key: &str) -> (bool, u32, u64) {
        let now = Instant::now();

        let mut entry = self.requests.entry(key.to_string()).or_insert((0, now));

        // Reset window if expired
        if now.duration_since(entry.1) > self.config.window_duration {
            entry.0 = 0;
            entry.1 = now;
        }

        let remaining = self.config.requests_per_window.saturating_sub(entry.0);
        let reset_secs = self
            .config
            .window_duration
            .saturating_sub(now.duration_since(entry.1))
            .as_secs();

        if entry.0 >= self.config.requests_per_window {
            return (false, 0, reset_secs);
        }

        entry.0 += 1;
        (true, remaining - 1, reset_secs)
    }

    /// Drop entries idle for more than two windows, returns how many
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.requests.len();
        self.requests.retain(|_, (_, started)| {
            now.duration_since(*started) < self.config.window_duration * 2
        });
        before.saturating_sub(self.requests.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.requests.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

/// Periodically prune idle rate limiter entries
pub fn start_cleanup_task(limiter: Arc<RateLimiter>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(RATE_LIMIT_CLEANUP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let removed = limiter.cleanup();
            if removed > 0 {
                debug!(removed, tracked = limiter.tracked_clients(), "Rate limiter cleanup");
            }
        }
    })
}

/// Client key: first X-Forwarded-For hop, then X-Real-IP, then the peer address
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Browser-facing routes get HTML errors; everything else gets the JSON envelope
fn wants_html(path: &str) -> bool {
    path == "/" || path == "/predict"
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    // Skip rate limiting for health check
    let path = request.uri().path();
    if path == "/health" || path == "/v1/health" {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let rate_key = client_key(request.headers(), peer);
    let (allowed, remaining, reset) = state.rate_limiter.check(&rate_key);

    if !allowed {
        warn!(key = %rate_key, path = %path, "Rate limit exceeded");
        let status = status_of(ErrorCode::ApiRateLimited);
        return if wants_html(path) {
            (status, Html(views::rate_limited_page(reset))).into_response()
        } else {
            (
                status,
                Json(ApiResponse::error(ApiError::rate_limited(reset), 0.0)),
            )
                .into_response()
        };
    }

    let mut response = next.run(request).await;

    // Add rate limit headers
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Remaining", remaining.into());
    headers.insert("X-RateLimit-Reset", reset.into());

    response
}

/// Request logging middleware
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        latency_ms = %latency.as_millis(),
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(requests_per_window: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            requests_per_window,
            window_duration: Duration::from_secs(60),
        })
    }

    #[test]
    fn test_rate_limit_window() {
        let limiter = limiter(3);
        assert_eq!(limiter.check("a").1, 2);
        assert_eq!(limiter.check("a").1, 1);
        let (allowed, remaining, reset) = limiter.check("a");
        assert!(allowed);
        assert_eq!(remaining, 0);
        assert!(reset <= 60);
        assert!(!limiter.check("a").0);
        assert!(limiter.check("b").0);
        // other clients unaffected
        assert!(limiter.check("c").0);
        assert_eq!(limiter.tracked_clients(), 3);
    }

    #[test]
    fn test_cleanup_keeps_fresh_entries() {
        let limiter = limiter(10);
        limiter.check("a");
        assert_eq!(limiter.cleanup(), 0);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_client_key() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_key(&headers, None), "unknown");
        let peer: SocketAddr = "192.168.1.7:51000".parse().unwrap();
        assert_eq!(client_key(&headers, Some(peer)), "192.168.1.7");
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        assert_eq!(client_key(&headers, Some(peer)), "10.0.0.2");
        headers.insert("x-forwarded-for", "1.2.3.4, 10.0.0.1".parse().unwrap());
        assert_eq!(client_key(&headers, Some(peer)), "1.2.3.4");
    }

    #[test]
    fn test_distinct_peers_get_distinct_buckets() {
        let limiter = limiter(1);
        let headers = HeaderMap::new();
        let first = client_key(&headers, Some("10.1.1.1:4000".parse().unwrap()));
        let second = client_key(&headers, Some("10.1.1.2:4000".parse().unwrap()));
        assert!(limiter.check(&first).0);
        assert!(!limiter.check(&first).0);
        assert!(limiter.check(&second).0);
    }

    #[test]
    fn test_html_routes() {
        assert!(wants_html("/"));
        assert!(wants_html("/predict"));
        assert!(!wants_html("/v1/score"));
    }
}
