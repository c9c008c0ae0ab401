//! Per-remote-address sliding-window rate limits.
//!
//! The limits are data, not behavior: chat allows a 15-request burst per
//! 10 s under a 60/min sustained cap (screener click-throughs arrive fast),
//! session starts 10/min, pause/resume 20/min.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

// ── Sliding window ───────────────────────────────────────────────────────────

/// A sliding-window counter for rate limiting.
struct SlidingWindow {
    window_secs: i64,
    max_count: usize,
    events: VecDeque<DateTime<Utc>>,
}

impl SlidingWindow {
    fn new(window_secs: i64, max_count: usize) -> Self {
        Self {
            window_secs,
            max_count,
            events: VecDeque::new(),
        }
    }

    /// Discard events older than the window boundary.
    fn evict(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::seconds(self.window_secs);
        while self.events.front().is_some_and(|t| *t <= cutoff) {
            self.events.pop_front();
        }
    }

    /// Record the event if the window has room; otherwise return the time
    /// until the oldest event expires.
    fn try_record(&mut self, now: DateTime<Utc>) -> Result<(), Duration> {
        self.evict(now);
        if self.events.len() >= self.max_count {
            let retry_after = self
                .events
                .front()
                .map(|oldest| (*oldest + Duration::seconds(self.window_secs)) - now)
                .unwrap_or_else(Duration::zero);
            return Err(retry_after);
        }
        self.events.push_back(now);
        Ok(())
    }
}

// ── Endpoint classes ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Chat,
    Start,
    PauseResume,
}

impl Endpoint {
    /// `(window seconds, max requests)` pairs; every window must have room.
    fn rules(self) -> &'static [(i64, usize)] {
        match self {
            Endpoint::Chat => &[(10, 15), (60, 60)],
            Endpoint::Start => &[(60, 10)],
            Endpoint::PauseResume => &[(60, 20)],
        }
    }
}

// ── Limiter ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<(IpAddr, Endpoint), Vec<SlidingWindow>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit or reject one request. On rejection returns the suggested
    /// `Retry-After` duration.
    pub async fn check(&self, ip: IpAddr, endpoint: Endpoint) -> Result<(), Duration> {
        let now = Utc::now();
        let mut windows = self.windows.lock().await;
        let entry = windows.entry((ip, endpoint)).or_insert_with(|| {
            endpoint
                .rules()
                .iter()
                .map(|(secs, max)| SlidingWindow::new(*secs, *max))
                .collect()
        });

        // Check every window before recording in any, so a rejected request
        // does not consume burst budget.
        let mut worst: Option<Duration> = None;
        for window in entry.iter_mut() {
            window.evict(now);
            if window.events.len() >= window.max_count {
                let retry = window
                    .events
                    .front()
                    .map(|oldest| (*oldest + Duration::seconds(window.window_secs)) - now)
                    .unwrap_or_else(Duration::zero);
                worst = Some(worst.map_or(retry, |w: Duration| w.max(retry)));
            }
        }
        if let Some(retry_after) = worst {
            return Err(retry_after);
        }
        for window in entry.iter_mut() {
            // Full windows were ruled out above.
            let _ = window.try_record(now);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    #[tokio::test]
    async fn start_limit_is_ten_per_minute() {
        let limiter = RateLimiter::new();
        for _ in 0..10 {
            assert!(limiter.check(ip(), Endpoint::Start).await.is_ok());
        }
        let retry = limiter.check(ip(), Endpoint::Start).await.unwrap_err();
        assert!(retry.num_seconds() <= 60);
    }

    #[tokio::test]
    async fn chat_burst_caps_at_fifteen() {
        let limiter = RateLimiter::new();
        for _ in 0..15 {
            assert!(limiter.check(ip(), Endpoint::Chat).await.is_ok());
        }
        assert!(limiter.check(ip(), Endpoint::Chat).await.is_err());
    }

    #[tokio::test]
    async fn addresses_are_tracked_independently() {
        let limiter = RateLimiter::new();
        for _ in 0..10 {
            limiter.check(ip(), Endpoint::Start).await.unwrap();
        }
        let other: IpAddr = "10.0.0.9".parse().unwrap();
        assert!(limiter.check(other, Endpoint::Start).await.is_ok());
    }

    #[tokio::test]
    async fn rejected_requests_do_not_consume_budget() {
        let limiter = RateLimiter::new();
        for _ in 0..10 {
            limiter.check(ip(), Endpoint::Start).await.unwrap();
        }
        for _ in 0..5 {
            assert!(limiter.check(ip(), Endpoint::Start).await.is_err());
        }
    }
}
