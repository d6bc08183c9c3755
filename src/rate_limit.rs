//! Sliding-window request limits per client IP and route.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::warn;

use crate::error::{AppError, Result};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const PRUNE_EVERY: u64 = 1000;

#[derive(Debug, Clone, Copy)]
pub struct RateRule {
    pub max_requests: usize,
    pub window: Duration,
}

impl RateRule {
    pub const fn new(max_requests: usize, window: Duration) -> Self {
        Self { max_requests, window }
    }
}

/// Groups of routes sharing a quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Suggestions,
    GenerateList,
    ItemDetails,
    Default,
}

impl RouteClass {
    pub fn rules(self) -> &'static [RateRule] {
        const SUGGESTIONS: [RateRule; 1] = [RateRule::new(10, MINUTE)];
        const GENERATE_LIST: [RateRule; 2] = [RateRule::new(5, MINUTE), RateRule::new(20, HOUR)];
        const ITEM_DETAILS: [RateRule; 1] = [RateRule::new(30, MINUTE)];
        const DEFAULT: [RateRule; 1] = [RateRule::new(100, HOUR)];
        match self {
            RouteClass::Suggestions => &SUGGESTIONS,
            RouteClass::GenerateList => &GENERATE_LIST,
            RouteClass::ItemDetails => &ITEM_DETAILS,
            RouteClass::Default => &DEFAULT,
        }
    }

    fn longest_window(self) -> Duration {
        self.rules()
            .iter()
            .map(|rule| rule.window)
            .max()
            .unwrap_or(MINUTE)
    }
}

#[derive(Default)]
struct LimiterState {
    hits: HashMap<(RouteClass, String), VecDeque<Instant>>,
    checks: u64,
}

#[derive(Default)]
pub struct RateLimiter {
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request, or rejects it with the seconds until a slot frees up.
    pub fn check(&self, class: RouteClass, ip: &str) -> Result<()> {
        self.check_at(class, ip, Instant::now())
    }

    pub fn check_at(&self, class: RouteClass, ip: &str, now: Instant) -> Result<()> {
        let mut state = self.state.lock();
        state.checks += 1;
        if state.checks % PRUNE_EVERY == 0 {
            prune(&mut state.hits, now);
        }

        let longest = class.longest_window();
        let hits = state.hits.entry((class, ip.to_string())).or_default();
        while let Some(front) = hits.front() {
            if now.saturating_duration_since(*front) >= longest {
                hits.pop_front();
            } else {
                break;
            }
        }

        for rule in class.rules() {
            let in_window: Vec<&Instant> = hits
                .iter()
                .filter(|hit| now.saturating_duration_since(**hit) < rule.window)
                .collect();
            if in_window.len() >= rule.max_requests {
                let oldest = in_window.first().map(|hit| **hit).unwrap_or(now);
                let frees_in = rule.window.saturating_sub(now.saturating_duration_since(oldest));
                let retry_after = frees_in.as_secs().max(1);
                warn!(?class, %ip, limit = rule.max_requests, window_secs = rule.window.as_secs(), "Rate limit exceeded");
                return Err(AppError::RateLimited { retry_after });
            }
        }

        hits.push_back(now);
        Ok(())
    }
}

fn prune(hits: &mut HashMap<(RouteClass, String), VecDeque<Instant>>, now: Instant) {
    hits.retain(|(class, _), times| {
        times
            .back()
            .is_some_and(|last| now.saturating_duration_since(*last) < class.longest_window())
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_quota_then_rejects() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..10 {
            assert!(limiter.check_at(RouteClass::Suggestions, "1.1.1.1", now).is_ok());
        }
        let rejected = limiter.check_at(RouteClass::Suggestions, "1.1.1.1", now);
        match rejected {
            Err(AppError::RateLimited { retry_after }) => assert!(retry_after >= 1 && retry_after <= 60),
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[test]
    fn quotas_are_per_ip_and_per_route() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        for _ in 0..5 {
            limiter.check_at(RouteClass::GenerateList, "1.1.1.1", now).unwrap();
        }
        assert!(limiter.check_at(RouteClass::GenerateList, "1.1.1.1", now).is_err());
        assert!(limiter.check_at(RouteClass::GenerateList, "2.2.2.2", now).is_ok());
        assert!(limiter.check_at(RouteClass::ItemDetails, "1.1.1.1", now).is_ok());
    }

    #[test]
    fn window_slides() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        for _ in 0..5 {
            limiter.check_at(RouteClass::GenerateList, "1.1.1.1", start).unwrap();
        }
        assert!(limiter.check_at(RouteClass::GenerateList, "1.1.1.1", start).is_err());
        let later = start + Duration::from_secs(61);
        assert!(limiter.check_at(RouteClass::GenerateList, "1.1.1.1", later).is_ok());
    }

    #[test]
    fn hourly_quota_applies_after_minute_windows_pass() {
        let limiter = RateLimiter::new();
        let start = Instant::now();
        for batch in 0..4u64 {
            let at = start + Duration::from_secs(batch * 61);
            for _ in 0..5 {
                limiter.check_at(RouteClass::GenerateList, "1.1.1.1", at).unwrap();
            }
        }
        let at = start + Duration::from_secs(4 * 61);
        assert!(limiter.check_at(RouteClass::GenerateList, "1.1.1.1", at).is_err());
    }
}
