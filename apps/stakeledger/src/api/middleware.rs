//! # Middleware Module
//!
//! Rate limiting for the stakeledger HTTP API.
//!
//! `STAKELEDGER_RATE_LIMIT`: requests per second (default: 100, 0 disables).

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

const DEFAULT_RATE_LIMIT: u32 = 100;

/// Default rate limit: 100 requests per second.
const DEFAULT_RPS: NonZeroU32 = NonZeroU32::new(DEFAULT_RATE_LIMIT).unwrap();

/// Process-wide rate limiter.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Create a limiter allowing `requests_per_second`; zero falls back to the default.
pub fn create_rate_limiter(requests_per_second: u32) -> GlobalRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(DEFAULT_RPS);
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

/// Parse a rate limit value, falling back to the default when unset or invalid.
fn parse_rate_limit(value: Option<&str>) -> u32 {
    value
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_RATE_LIMIT)
}

/// Read `STAKELEDGER_RATE_LIMIT`.
pub fn get_rate_limit_from_env() -> u32 {
    parse_rate_limit(std::env::var("STAKELEDGER_RATE_LIMIT").ok().as_deref())
}

/// Reject with 429 once the global limiter is exhausted.
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    match limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(_) => {
            tracing::warn!(event = "rate_limited", "Rate limit exceeded");
            Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rate_limiter() {
        let limiter = create_rate_limiter(50);
        assert!(limiter.check().is_ok());
    }

    #[test]
    fn test_single_request_quota_exhausts() {
        let limiter = create_rate_limiter(1);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_parse_rate_limit() {
        assert_eq!(parse_rate_limit(None), 100);
        assert_eq!(parse_rate_limit(Some("25")), 25);
        assert_eq!(parse_rate_limit(Some("0")), 0);
        assert_eq!(parse_rate_limit(Some("fast")), 100);
    }
}
