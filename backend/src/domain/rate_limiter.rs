//! Per-(child, action) crediting limits.
//!
//! All limiter state is derived from the event log itself; there is no
//! separate counter cache to drift out of sync. The check must run inside
//! the same per-child exclusive scope as the event append that follows it,
//! otherwise two concurrent taps could both pass and exceed the cap.

use chrono::{DateTime, Duration, Local, Utc};
use tracing::debug;

use crate::domain::calendar;
use crate::domain::models::Action;
use crate::errors::Result;
use crate::storage::EventRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    /// The previous credit for this (child, action) is too recent.
    Cooldown,
    /// The child already reached the action's cap for the local day.
    DailyLimit,
}

#[derive(Clone)]
pub struct RateLimiter {
    events: EventRepository,
}

impl RateLimiter {
    pub fn new(events: EventRepository) -> Self {
        Self { events }
    }

    /// Decide whether one more credit of `action` is allowed for the child
    /// at `now`. Caller holds the child's lock.
    pub async fn check(&self, child_id: &str, action: &Action, now: DateTime<Local>) -> Result<RateLimitDecision> {
        if let Some(last_ts) = self.events.last_credit_timestamp(child_id, &action.id).await? {
            let last = calendar::parse_timestamp(&last_ts)?;
            let elapsed = now.with_timezone(&Utc) - last;
            if elapsed < Duration::seconds(action.cooldown_secs) {
                debug!("cooldown: {} on {} ({}s elapsed)", child_id, action.id, elapsed.num_seconds());
                return Ok(RateLimitDecision::Cooldown);
            }
        }

        let (day_start, day_end) = calendar::local_day_window(now)?;
        let used = self
            .events
            .count_credits_between(child_id, &action.id, &day_start, &day_end)
            .await?;
        if used >= action.daily_cap {
            debug!("daily limit: {} on {} ({} used)", child_id, action.id, used);
            return Ok(RateLimitDecision::DailyLimit);
        }

        Ok(RateLimitDecision::Allowed)
    }
}
