//! The reward engine: one gameplay interaction in, at most one credit out.
//!
//! The cooldown/cap check, the balance read and the event append all
//! happen under the child's exclusive lock, so two concurrent taps can
//! never both pass the check or compute conflicting balances. A refused
//! interaction writes nothing.
//!
//! The contract carries no idempotency key: a client retry after a
//! dropped response credits again. Accepted behavior — the cooldown
//! already throttles rapid repeats.

use chrono::{DateTime, Local};
use tracing::info;

use crate::domain::calendar;
use crate::domain::commands::{InteractionOutcome, RefusalReason};
use crate::domain::models::{Action, Event};
use crate::domain::rate_limiter::{RateLimitDecision, RateLimiter};
use crate::errors::{LedgerError, Result};
use crate::storage::{ActionRepository, ChildRepository, Db, EventRepository};

#[derive(Clone)]
pub struct RewardService {
    db: Db,
    children: ChildRepository,
    actions: ActionRepository,
    events: EventRepository,
    limiter: RateLimiter,
}

impl RewardService {
    pub fn new(db: Db) -> Self {
        let events = EventRepository::new(db.clone());
        Self {
            children: ChildRepository::new(db.clone()),
            actions: ActionRepository::new(db.clone()),
            limiter: RateLimiter::new(events.clone()),
            events,
            db,
        }
    }

    /// The crediting rules catalog, as shown to the game client.
    pub async fn list_actions(&self) -> Result<Vec<Action>> {
        self.actions.list().await
    }

    /// Process one button press.
    pub async fn interact(&self, child_id: &str, action_id: &str) -> Result<InteractionOutcome> {
        self.interact_at(child_id, action_id, Local::now()).await
    }

    /// Like [`interact`](Self::interact) with an explicit clock.
    pub async fn interact_at(
        &self,
        child_id: &str,
        action_id: &str,
        now: DateTime<Local>,
    ) -> Result<InteractionOutcome> {
        let action = self
            .actions
            .get(action_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("action", action_id))?;

        let lock = self.db.child_lock(child_id);
        let _guard = lock.lock().await;

        let child = self
            .children
            .get(child_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("child", child_id))?;

        match self.limiter.check(child_id, &action, now).await? {
            RateLimitDecision::Cooldown => {
                return Ok(InteractionOutcome::Refused {
                    reason: RefusalReason::Cooldown,
                    balance: child.balance,
                })
            }
            RateLimitDecision::DailyLimit => {
                return Ok(InteractionOutcome::Refused {
                    reason: RefusalReason::DailyLimit,
                    balance: child.balance,
                })
            }
            RateLimitDecision::Allowed => {}
        }

        let new_balance = child.balance + action.credit;
        let event = Event::action_credit(&child, &action, calendar::timestamp(now), new_balance);
        self.events.append(&event).await?;

        info!(
            "credited {} x{} to {} (balance {})",
            action.id, action.credit, child.id, new_balance
        );
        Ok(InteractionOutcome::Credited {
            credited: action.credit,
            new_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Child;
    use crate::storage::connection::test_support::open_test_db;
    use chrono::{Duration, TimeZone};

    async fn setup(db: &Db) -> (RewardService, Child) {
        let service = RewardService::new(db.clone());
        // Tighter crediting rules than the shipped catalog entry.
        let battery = Action {
            id: "battery".to_string(),
            name: "Battery drop-off".to_string(),
            credit: 5,
            cooldown_secs: 60,
            daily_cap: 3,
        };
        ActionRepository::new(db.clone()).upsert(&battery).await.unwrap();

        let child = Child::new("Masha Ivanova", None);
        ChildRepository::new(db.clone()).store(&child).await.unwrap();
        (service, child)
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 10, h, m, s).single().unwrap()
    }

    #[tokio::test]
    async fn successful_interaction_credits_and_returns_balance() {
        let handle = open_test_db().await;
        let (service, child) = setup(&handle.db).await;

        let outcome = service.interact_at(&child.id, "battery", at(10, 0, 0)).await.unwrap();
        assert_eq!(
            outcome,
            InteractionOutcome::Credited { credited: 5, new_balance: 5 }
        );
    }

    #[tokio::test]
    async fn immediate_repeat_hits_cooldown_and_writes_nothing() {
        let handle = open_test_db().await;
        let (service, child) = setup(&handle.db).await;
        let events = EventRepository::new(handle.db.clone());

        service.interact_at(&child.id, "battery", at(10, 0, 0)).await.unwrap();
        let outcome = service.interact_at(&child.id, "battery", at(10, 0, 30)).await.unwrap();

        assert_eq!(
            outcome,
            InteractionOutcome::Refused { reason: RefusalReason::Cooldown, balance: 5 }
        );
        assert_eq!(events.list_filtered(None, None, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fourth_same_day_attempt_hits_the_daily_limit() {
        let handle = open_test_db().await;
        let (service, child) = setup(&handle.db).await;

        // Three spaced-out successes...
        let mut now = at(10, 0, 0);
        for expected in [5, 10, 15] {
            let outcome = service.interact_at(&child.id, "battery", now).await.unwrap();
            assert_eq!(
                outcome,
                InteractionOutcome::Credited { credited: 5, new_balance: expected }
            );
            now += Duration::seconds(61);
        }

        // ...then the cap: balance stays at 15 and nothing is appended.
        let outcome = service.interact_at(&child.id, "battery", now).await.unwrap();
        assert_eq!(
            outcome,
            InteractionOutcome::Refused { reason: RefusalReason::DailyLimit, balance: 15 }
        );

        let events = EventRepository::new(handle.db.clone());
        assert_eq!(events.list_filtered(None, None, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unknown_ids_fail_without_writing() {
        let handle = open_test_db().await;
        let (service, child) = setup(&handle.db).await;
        let events = EventRepository::new(handle.db.clone());

        assert!(matches!(
            service.interact_at("child::ghost", "battery", at(10, 0, 0)).await,
            Err(LedgerError::NotFound { entity: "child", .. })
        ));
        assert!(matches!(
            service.interact_at(&child.id, "recycling", at(10, 0, 0)).await,
            Err(LedgerError::NotFound { entity: "action", .. })
        ));
        assert!(events.list_filtered(None, None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn balance_always_equals_the_event_sum() {
        let handle = open_test_db().await;
        let (service, child) = setup(&handle.db).await;
        let events = EventRepository::new(handle.db.clone());
        let children = ChildRepository::new(handle.db.clone());

        let mut now = at(9, 0, 0);
        for _ in 0..3 {
            service.interact_at(&child.id, "battery", now).await.unwrap();
            now += Duration::seconds(90);
        }

        let cached = children.get(&child.id).await.unwrap().unwrap().balance;
        let derived = events.sum_credited_after(&child.id, None).await.unwrap();
        assert_eq!(cached, derived);
        assert_eq!(cached, 15);
    }

    #[tokio::test]
    async fn concurrent_taps_cannot_exceed_the_cap() {
        let handle = open_test_db().await;
        let (service, child) = setup(&handle.db).await;
        // cap 1, no cooldown: the race is decided purely by the cap check
        let one_shot = Action {
            id: "battery".to_string(),
            name: "Battery drop-off".to_string(),
            credit: 5,
            cooldown_secs: 0,
            daily_cap: 1,
        };
        ActionRepository::new(handle.db.clone()).upsert(&one_shot).await.unwrap();

        let now = at(10, 0, 0);
        let (a, b) = tokio::join!(
            service.interact_at(&child.id, "battery", now),
            service.interact_at(&child.id, "battery", now),
        );

        let outcomes = [a.unwrap(), b.unwrap()];
        let credits = outcomes
            .iter()
            .filter(|o| matches!(o, InteractionOutcome::Credited { .. }))
            .count();
        let refusals = outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    InteractionOutcome::Refused { reason: RefusalReason::DailyLimit, .. }
                )
            })
            .count();
        assert_eq!((credits, refusals), (1, 1));

        let events = EventRepository::new(handle.db.clone());
        assert_eq!(events.list_filtered(None, None, None).await.unwrap().len(), 1);
    }
}
