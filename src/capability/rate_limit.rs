// file: src/capability/rate_limit.rs
// description: shared request pacing for capability calls
// reference: https://docs.rs/governor

use crate::capability::CapabilityError;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Paces every outbound capability request. Clones share one budget.
#[derive(Clone)]
pub struct CapabilityLimiter {
    limiter: Arc<DirectLimiter>,
    requests_per_minute: u32,
}

impl CapabilityLimiter {
    /// `None` when `requests_per_minute` is zero, which leaves requests unpaced.
    pub fn per_minute(requests_per_minute: u32) -> Option<Self> {
        let rate = NonZeroU32::new(requests_per_minute)?;
        Some(Self {
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(rate))),
            requests_per_minute,
        })
    }

    /// Waits until the shared budget allows one more request.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }
}

impl std::fmt::Debug for CapabilityLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityLimiter")
            .field("requests_per_minute", &self.requests_per_minute)
            .finish()
    }
}

/// Maps a 429 response to `RateLimited`, honoring `Retry-After`.
pub fn check_rate_limit_response(resp: &reqwest::Response) -> Result<(), CapabilityError> {
    if resp.status().as_u16() == 429 {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        Err(CapabilityError::RateLimited { retry_after })
    } else {
        Ok(())
    }
}

/// Parses a Retry-After value given in seconds. HTTP dates fall back to a
/// fixed short wait.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(secs) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    if value.contains(',') || value.contains("GMT") {
        return Some(Duration::from_secs(5));
    }
    None
}
