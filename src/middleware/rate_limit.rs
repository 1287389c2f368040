//! Rate limiting middleware for the credential endpoints.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    num::NonZeroU32,
    sync::{Arc, RwLock},
    time::Duration,
};

/// Per-IP rate limiter using Governor.
pub type IpRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// State for rate limiting signup/login attempts.
#[derive(Clone)]
pub struct RateLimitState {
    limiters: Arc<RwLock<HashMap<String, Arc<IpRateLimiter>>>>,
    requests_per_minute: u32,
}

impl RateLimitState {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            limiters: Arc::new(RwLock::new(HashMap::new())),
            requests_per_minute,
        }
    }

    /// Get or create a rate limiter for the given IP.
    fn get_or_create_limiter(&self, ip: &str) -> Arc<IpRateLimiter> {
        {
            let read_guard = self.limiters.read().unwrap();
            if let Some(limiter) = read_guard.get(ip) {
                return limiter.clone();
            }
        }

        let mut write_guard = self.limiters.write().unwrap();

        // Double-check after acquiring write lock
        if let Some(limiter) = write_guard.get(ip) {
            return limiter.clone();
        }

        let quota =
            Quota::per_minute(NonZeroU32::new(self.requests_per_minute).unwrap_or(NonZeroU32::MIN));
        let limiter = Arc::new(RateLimiter::direct(quota));
        write_guard.insert(ip.to_string(), limiter.clone());
        limiter
    }

    /// Check if a request from this IP is allowed.
    pub fn check(&self, ip: &str) -> bool {
        self.get_or_create_limiter(ip).check().is_ok()
    }

    /// Drop limiters nobody references anymore.
    pub fn cleanup(&self) {
        let mut guard = self.limiters.write().unwrap();
        guard.retain(|_, v| Arc::strong_count(v) > 1);
    }

    /// Start a background task to periodically clean up old entries.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(300)).await;
                self.cleanup();
            }
        });
    }
}

/// Extract client IP from request.
fn get_client_ip(req: &Request<Body>) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next() {
            return ip.trim().to_string();
        }
    }

    if let Some(real_ip) = req.headers().get("X-Real-IP").and_then(|v| v.to_str().ok()) {
        return real_ip.to_string();
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// Rate limiting middleware for signup/login.
pub async fn auth_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = get_client_ip(&req);

    if !state.check(&ip) {
        tracing::warn!(ip = %ip, "Auth rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests from this IP, please try again later",
        )
            .into_response();
    }

    next.run(req).await
}
