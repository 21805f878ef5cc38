//! Per-client request admission over rolling windows.
//!
//! Every endpoint class has a list of [`LimitRule`]s. For each client address
//! and endpoint the limiter keeps the instants of admitted requests, one log
//! per rule, and admits a new request only while every rule still has room
//! inside its trailing window.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;

mod guard;
mod rule;
mod sweep;

pub use guard::*;
pub use rule::{LimitRule, Per, RuleParseError};
pub use sweep::sweeper;

/// Routes with their own counters. Each endpoint is counted separately,
/// including those that fall back to the default rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Dashboard,
    Game,
    SaveScore,
    TopScores,
    TotalPlayers,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LimitPolicy {
    default: Vec<LimitRule>,
    overrides: HashMap<Endpoint, Vec<LimitRule>>,
}

impl LimitPolicy {
    pub fn new(default: Vec<LimitRule>) -> Self {
        Self {
            default,
            overrides: HashMap::new(),
        }
    }

    /// Replaces the rules used by endpoints without an override.
    pub fn with_default(mut self, rules: Vec<LimitRule>) -> Self {
        self.default = rules;
        self
    }

    /// Replaces the default rules for `endpoint`.
    pub fn with_override(mut self, endpoint: Endpoint, rules: Vec<LimitRule>) -> Self {
        self.overrides.insert(endpoint, rules);
        self
    }

    pub fn rules_for(&self, endpoint: Endpoint) -> &[LimitRule] {
        self.overrides
            .get(&endpoint)
            .unwrap_or(&self.default)
    }
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self::new(vec![
            LimitRule::new(200, 1, Per::Day),
            LimitRule::new(50, 1, Per::Hour),
        ])
        .with_override(Endpoint::SaveScore, vec![LimitRule::new(30, 1, Per::Minute)])
        .with_override(Endpoint::TopScores, vec![LimitRule::new(60, 1, Per::Minute)])
        .with_override(Endpoint::TotalPlayers, vec![LimitRule::new(60, 1, Per::Minute)])
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("rate limit exceeded: {rule}")]
pub struct RateLimitExceeded {
    pub rule: LimitRule,
    /// Time until the oldest counted request leaves the window.
    pub retry_after: Duration,
}

type WindowKey = (IpAddr, Endpoint);

/// Process-local limiter state. Cloning shares the same counters.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    policy: Arc<LimitPolicy>,
    enabled: bool,
    windows: Arc<DashMap<WindowKey, Vec<VecDeque<Instant>>>>,
}

impl RateLimiter {
    pub fn new(policy: LimitPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            enabled: true,
            windows: Arc::new(DashMap::new()),
        }
    }

    /// A limiter that admits everything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new(LimitPolicy::default())
        }
    }

    pub fn check(&self, client: IpAddr, endpoint: Endpoint) -> Result<(), RateLimitExceeded> {
        self.check_at(client, endpoint, Instant::now())
    }

    /// Admits or rejects a request arriving at `now`. Only admitted requests
    /// are counted. The map entry stays locked for the whole check, so
    /// concurrent requests from one client are counted one at a time.
    pub fn check_at(
        &self,
        client: IpAddr,
        endpoint: Endpoint,
        now: Instant,
    ) -> Result<(), RateLimitExceeded> {
        let rules = self.policy.rules_for(endpoint);
        if !self.enabled || rules.is_empty() {
            return Ok(());
        }

        let mut windows = self
            .windows
            .entry((client, endpoint))
            .or_insert_with(|| vec![VecDeque::new(); rules.len()]);

        for (rule, hits) in rules.iter().zip(windows.iter_mut()) {
            expire(hits, rule.window(), now);
            if hits.len() >= rule.count as usize {
                let oldest = hits.front().copied().unwrap_or(now);
                return Err(RateLimitExceeded {
                    rule: *rule,
                    retry_after: rule
                        .window()
                        .saturating_sub(now.saturating_duration_since(oldest)),
                });
            }
        }

        for hits in windows.iter_mut() {
            hits.push_back(now);
        }
        Ok(())
    }

    /// Forgets clients whose windows have all run out.
    pub fn purge_expired(&self, now: Instant) {
        self.windows.retain(|(_, endpoint), windows| {
            let rules = self.policy.rules_for(*endpoint);
            for (rule, hits) in rules.iter().zip(windows.iter_mut()) {
                expire(hits, rule.window(), now);
            }
            windows.iter().any(|hits| !hits.is_empty())
        });
    }

    /// Number of (client, endpoint) pairs currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}

fn expire(hits: &mut VecDeque<Instant>, window: Duration, now: Instant) {
    while let Some(&oldest) = hits.front() {
        if now.saturating_duration_since(oldest) < window {
            break;
        }
        hits.pop_front();
    }
}
