//! Client-side rate limiting for outbound API calls.
//!
//! Each API name gets its own trailing-minute window (and optionally a
//! trailing-day window) of request instants. Windows are process-local and
//! advisory: they keep us under the upstream quota, the upstream 429 is
//! still handled by [`retry`].

pub mod retry;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

pub use retry::{BackoffStrategy, RetryHint, RetryPolicy, Retryable, Throttled};

const MINUTE: Duration = Duration::from_secs(60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Quota for one API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub per_minute: u32,
    pub per_day: Option<u32>,
}

impl RateLimits {
    pub fn per_minute(per_minute: u32) -> Self {
        Self {
            per_minute,
            per_day: None,
        }
    }

    pub fn with_daily(mut self, per_day: u32) -> Self {
        self.per_day = Some(per_day);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Throttled { retry_after: Duration },
}

/// Point-in-time view of a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateUsage {
    pub api: String,
    pub window_used: u32,
    pub window_limit: u32,
    pub day_used: u32,
    pub day_limit: Option<u32>,
}

#[derive(Debug)]
struct RateWindow {
    limits: RateLimits,
    minute: VecDeque<Instant>,
    day: VecDeque<Instant>,
}

impl RateWindow {
    fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            minute: VecDeque::new(),
            day: VecDeque::new(),
        }
    }

    fn prune(&mut self, now: Instant) {
        prune_older_than(&mut self.minute, now, MINUTE);
        prune_older_than(&mut self.day, now, DAY);
    }

    fn check_and_reserve(&mut self, now: Instant) -> RateDecision {
        self.prune(now);

        if self.minute.len() >= self.limits.per_minute as usize {
            return RateDecision::Throttled {
                retry_after: until_expiry(&self.minute, now, MINUTE),
            };
        }
        if let Some(per_day) = self.limits.per_day {
            if self.day.len() >= per_day as usize {
                return RateDecision::Throttled {
                    retry_after: until_expiry(&self.day, now, DAY),
                };
            }
        }

        self.minute.push_back(now);
        if self.limits.per_day.is_some() {
            self.day.push_back(now);
        }
        RateDecision::Allowed
    }
}

fn prune_older_than(window: &mut VecDeque<Instant>, now: Instant, span: Duration) {
    while let Some(&oldest) = window.front() {
        if now.duration_since(oldest) >= span {
            window.pop_front();
        } else {
            break;
        }
    }
}

/// Time until the oldest entry leaves the window.
fn until_expiry(window: &VecDeque<Instant>, now: Instant, span: Duration) -> Duration {
    window
        .front()
        .map(|&oldest| (oldest + span).saturating_duration_since(now))
        .unwrap_or(Duration::ZERO)
}

/// Shared limiter; cheap to clone behind an `Arc`.
///
/// The outer lock only guards the API-name map. Each API has its own lock so
/// unrelated APIs never contend.
#[derive(Debug)]
pub struct RateLimiter {
    default_limits: RateLimits,
    overrides: HashMap<String, RateLimits>,
    windows: Mutex<HashMap<String, Arc<Mutex<RateWindow>>>>,
}

impl RateLimiter {
    pub fn new(default_limits: RateLimits) -> Self {
        Self {
            default_limits,
            overrides: HashMap::new(),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Use `limits` for `api` instead of the default.
    pub fn with_api(mut self, api: impl Into<String>, limits: RateLimits) -> Self {
        self.overrides.insert(api.into(), limits);
        self
    }

    pub fn limits_for(&self, api: &str) -> RateLimits {
        self.overrides
            .get(api)
            .copied()
            .unwrap_or(self.default_limits)
    }

    fn window(&self, api: &str) -> Arc<Mutex<RateWindow>> {
        let mut windows = match self.windows.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        windows
            .entry(api.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(RateWindow::new(self.limits_for(api)))))
            .clone()
    }

    /// Reserve a slot for one call to `api`, or report how long to wait.
    pub fn check_and_reserve(&self, api: &str) -> RateDecision {
        let window = self.window(api);
        let mut window = match window.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        window.check_and_reserve(Instant::now())
    }

    pub fn usage(&self, api: &str) -> RateUsage {
        let window = self.window(api);
        let mut window = match window.lock() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        };
        window.prune(Instant::now());
        RateUsage {
            api: api.to_string(),
            window_used: window.minute.len() as u32,
            window_limit: window.limits.per_minute,
            day_used: window.day.len() as u32,
            day_limit: window.limits.per_day,
        }
    }
}
