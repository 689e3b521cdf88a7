//! Rate limiting and venue cool-downs
//!
//! Two independent mechanisms live here. [`RateLimiter`] paces outgoing requests on the client
//! side with a token bucket. [`Cooldown`] reacts to what the venue says: when a response maps to
//! a throttling error code the client records how long it should stay quiet, according to the
//! venue's [`CooldownPolicy`]. Nothing retries automatically.

use governor::{DefaultDirectRateLimiter, Quota};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use types::{ErrorCode, VenueId};

/// Client-side request pacing per venue
#[derive(Clone, Default)]
pub struct RateLimiter {
    limiters: HashMap<VenueId, Arc<DefaultDirectRateLimiter>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure rate limit for a venue
    pub fn configure_venue(&mut self, venue: VenueId, requests_per_minute: u32) {
        match NonZeroU32::new(requests_per_minute) {
            Some(rate) => {
                let limiter = Arc::new(DefaultDirectRateLimiter::direct(Quota::per_minute(rate)));
                self.limiters.insert(venue, limiter);
            }
            None => tracing::warn!(%venue, "Ignoring zero requests-per-minute limit"),
        }
    }

    /// Check if request is allowed (non-blocking)
    pub fn check(&self, venue: VenueId) -> bool {
        self.limiters
            .get(&venue)
            .map(|limiter| limiter.check().is_ok())
            .unwrap_or(true)
    }

    /// Wait until a request is allowed
    pub async fn wait(&self, venue: VenueId) {
        if let Some(limiter) = self.limiters.get(&venue) {
            limiter.until_ready().await;
        }
    }

    pub fn is_limited(&self, venue: VenueId) -> bool {
        self.limiters.contains_key(&venue)
    }
}

/// How a venue's throttling errors translate into a quiet period
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CooldownPolicy {
    /// Never cool down
    Disabled,
    /// Delay grows with each consecutive throttled response; any other response resets it
    Escalating {
        /// Base delay for [`ErrorCode::RateLimit`]
        rate_limit: Duration,
        /// Base delay for [`ErrorCode::IpBan`]
        ip_ban: Duration,
    },
    /// Use the venue's `Retry-After` header, falling back to a fixed delay
    RetryAfter {
        /// Delay when the header is missing
        fallback: Duration,
    },
    /// Same delay for every rate-limit response
    Fixed {
        /// Delay for [`ErrorCode::RateLimit`]
        rate_limit: Duration,
    },
}

impl CooldownPolicy {
    /// Escalating policy with the usual 120 s / 300 s steps
    pub fn escalating() -> Self {
        CooldownPolicy::Escalating {
            rate_limit: Duration::from_secs(120),
            ip_ban: Duration::from_secs(300),
        }
    }

    /// Delay owed after a response with error `code`, updating the consecutive count
    fn delay(&self, code: Option<&ErrorCode>, retry_after: Option<Duration>, streak: &mut u32) -> Duration {
        match self {
            CooldownPolicy::Disabled => Duration::ZERO,
            CooldownPolicy::Escalating { rate_limit, ip_ban } => match code {
                Some(ErrorCode::RateLimit) => {
                    *streak += 1;
                    *rate_limit * *streak
                }
                Some(ErrorCode::IpBan) => {
                    *streak += 1;
                    *ip_ban * *streak
                }
                _ => {
                    *streak = 0;
                    Duration::ZERO
                }
            },
            CooldownPolicy::RetryAfter { fallback } => match code {
                Some(code) if code.is_throttling() => retry_after.unwrap_or(*fallback),
                _ => Duration::ZERO,
            },
            CooldownPolicy::Fixed { rate_limit } => match code {
                Some(ErrorCode::RateLimit) => *rate_limit,
                _ => Duration::ZERO,
            },
        }
    }
}

#[derive(Debug, Default)]
struct CooldownState {
    until: Option<Instant>,
    streak: u32,
}

/// Cool-down state of one client
#[derive(Debug)]
pub struct Cooldown {
    policy: CooldownPolicy,
    state: Mutex<CooldownState>,
}

impl Cooldown {
    pub fn new(policy: CooldownPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(CooldownState::default()),
        }
    }

    /// Feed one response outcome; returns the newly recorded delay, zero if none
    pub fn on_response(&self, code: Option<&ErrorCode>, retry_after: Option<Duration>) -> Duration {
        let mut state = self.state.lock();
        let delay = self.policy.delay(code, retry_after, &mut state.streak);
        if !delay.is_zero() {
            state.until = Some(Instant::now() + delay);
        }
        delay
    }

    /// Time left before the venue should be called again
    pub fn remaining(&self) -> Duration {
        self.state
            .lock()
            .until
            .map(|until| until.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_cooling_down(&self) -> bool {
        !self.remaining().is_zero()
    }

    /// Consecutive throttled responses so far
    pub fn streak(&self) -> u32 {
        self.state.lock().streak
    }
}

/// Rate limit tracker for monitoring
pub struct RateLimitTracker {
    requests: Arc<dashmap::DashMap<VenueId, RequestStats>>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self {
            requests: Arc::new(dashmap::DashMap::new()),
        }
    }

    /// Record a request; `throttled` when the venue answered with a throttling code
    pub fn record_request(&self, venue: VenueId, throttled: bool) {
        let now = Instant::now();
        let mut stats = self.requests.entry(venue).or_insert_with(|| RequestStats {
            total: 0,
            successful: 0,
            rate_limited: 0,
            last_request: now,
        });
        stats.total += 1;
        if throttled {
            stats.rate_limited += 1;
        } else {
            stats.successful += 1;
        }
        stats.last_request = now;
    }

    pub fn stats(&self, venue: VenueId) -> Option<RequestStats> {
        self.requests.get(&venue).map(|entry| entry.value().clone())
    }

    /// Reset statistics
    pub fn reset(&self) {
        self.requests.clear();
    }
}

impl Default for RateLimitTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Request statistics for monitoring
#[derive(Debug, Clone)]
pub struct RequestStats {
    /// Total requests attempted
    pub total: u64,
    /// Requests that were not throttled
    pub successful: u64,
    /// Requests answered with a throttling code
    pub rate_limited: u64,
    /// Time of last request
    pub last_request: Instant,
}

impl RequestStats {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.successful as f64 / self.total as f64
        }
    }

    /// Check if we're being rate limited heavily
    pub fn is_heavily_limited(&self) -> bool {
        self.rate_limited > self.successful
    }
}
