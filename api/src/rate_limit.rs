//! Per-IP fixed-window rate limiting
//!
//! Requests over the cap are rejected with 429 rather than queued. Every
//! response on a limited route carries `RateLimit-*` headers.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use pokedex_core::RateLimitSettings;

use crate::error::AppError;

/// Buckets are swept once the table grows past this size
const PRUNE_THRESHOLD: usize = 10_000;

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32, reset_after: Duration },
    Limited { reset_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by client IP
#[derive(Debug)]
pub struct RateLimiter {
    settings: RateLimitSettings,
    buckets: DashMap<IpAddr, Window>,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            settings,
            buckets: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &RateLimitSettings {
        &self.settings
    }

    /// Count a request from `ip` now
    pub fn check(&self, ip: IpAddr) -> RateDecision {
        self.check_at(ip, Instant::now())
    }

    /// Count a request from `ip` at the given instant
    pub fn check_at(&self, ip: IpAddr, now: Instant) -> RateDecision {
        if self.buckets.len() > PRUNE_THRESHOLD {
            self.prune(now);
        }

        let window = self.settings.window();
        let mut bucket = self.buckets.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(bucket.started) >= window {
            bucket.started = now;
            bucket.count = 0;
        }

        let reset_after = window.saturating_sub(now.duration_since(bucket.started));
        if bucket.count >= self.settings.max_requests {
            return RateDecision::Limited { reset_after };
        }

        bucket.count += 1;
        RateDecision::Allowed {
            remaining: self.settings.max_requests - bucket.count,
            reset_after,
        }
    }

    /// Drop buckets whose window has elapsed
    pub fn prune(&self, now: Instant) {
        let window = self.settings.window();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.started) < window);
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }
}

fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn set_header(headers: &mut HeaderMap, name: &'static str, value: u64) {
    headers.insert(name, HeaderValue::from(value));
}

/// Round up so a client never retries a moment too early
fn reset_seconds(reset_after: Duration) -> u64 {
    reset_after.as_secs() + u64::from(reset_after.subsec_nanos() > 0)
}

/// Middleware gating every API route
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    let limit = u64::from(limiter.settings().max_requests);

    match limiter.check(ip) {
        RateDecision::Allowed {
            remaining,
            reset_after,
        } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            set_header(headers, "ratelimit-limit", limit);
            set_header(headers, "ratelimit-remaining", u64::from(remaining));
            set_header(headers, "ratelimit-reset", reset_seconds(reset_after));
            response
        }
        RateDecision::Limited { reset_after } => {
            warn!("Rate limit exceeded for {ip}");
            let reset = reset_seconds(reset_after);
            let mut response =
                AppError::RateLimited(limiter.settings().message.clone()).into_response();
            let headers = response.headers_mut();
            set_header(headers, "ratelimit-limit", limit);
            set_header(headers, "ratelimit-remaining", 0);
            set_header(headers, "ratelimit-reset", reset);
            headers.insert(RETRY_AFTER, HeaderValue::from(reset));
            response
        }
    }
}
