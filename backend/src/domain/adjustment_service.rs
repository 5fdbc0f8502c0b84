//! Administrator balance adjustments.
//!
//! Every adjustment lands in the event log as a `ManualAdjustment` with
//! the mandatory comment and the acting administrator, so it stays
//! distinguishable from gameplay credits in every listing and audit.

use chrono::{DateTime, Local};
use tracing::info;

use crate::domain::calendar;
use crate::domain::commands::AdjustBalanceCommand;
use crate::domain::models::Event;
use crate::errors::{LedgerError, Result};
use crate::storage::{ChildRepository, Db, EventRepository};

#[derive(Clone)]
pub struct AdjustmentService {
    db: Db,
    children: ChildRepository,
    events: EventRepository,
}

impl AdjustmentService {
    pub fn new(db: Db) -> Self {
        Self {
            children: ChildRepository::new(db.clone()),
            events: EventRepository::new(db.clone()),
            db,
        }
    }

    /// Apply a signed delta to a child's balance. Returns the new balance.
    pub async fn adjust(&self, command: AdjustBalanceCommand) -> Result<i64> {
        self.adjust_at(command, Local::now()).await
    }

    pub async fn adjust_at(&self, command: AdjustBalanceCommand, now: DateTime<Local>) -> Result<i64> {
        if command.delta == 0 {
            return Err(LedgerError::InvalidAmount("adjustment delta must be nonzero".to_string()));
        }
        let comment = command.comment.trim();
        if comment.is_empty() {
            return Err(LedgerError::InvalidInput("adjustment comment is required".to_string()));
        }

        let lock = self.db.child_lock(&command.child_id);
        let _guard = lock.lock().await;

        let child = self
            .children
            .get(&command.child_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("child", &command.child_id))?;

        let new_balance = child.balance + command.delta;
        if new_balance < 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "adjustment of {} would drop balance below zero (current {})",
                command.delta, child.balance
            )));
        }

        let event = Event::manual_adjustment(
            &child,
            command.delta,
            comment.to_string(),
            command.actor.clone(),
            calendar::timestamp(now),
            new_balance,
        );
        self.events.append(&event).await?;

        info!(
            "adjusted {} by {} (balance {}, by {})",
            child.id, command.delta, new_balance, command.actor
        );
        Ok(new_balance)
    }
}
