//! Monthly rollover: freeze every child's working balance into an
//! immutable monthly result, then start the new month from zero.
//!
//! The whole procedure is safe to invoke repeatedly and concurrently. The
//! month is considered closed once its result header exists; before that,
//! each child is frozen+reset atomically under the child's own lock, one
//! child at a time, so gameplay for other children never blocks. A crash
//! mid-run resumes cleanly: already-frozen children are skipped, so their
//! snapshot survives and their new-month credits are never wiped.

use chrono::{DateTime, Local};
use tracing::info;

use crate::domain::calendar;
use crate::domain::commands::RolloverOutcome;
use crate::errors::Result;
use crate::storage::{ChildRepository, Db, MonthlyResultRepository};

#[derive(Clone)]
pub struct RolloverService {
    db: Db,
    children: ChildRepository,
    monthly: MonthlyResultRepository,
}

impl RolloverService {
    pub fn new(db: Db) -> Self {
        Self {
            children: ChildRepository::new(db.clone()),
            monthly: MonthlyResultRepository::new(db.clone()),
            db,
        }
    }

    /// Close the month preceding `now`'s month, unless already closed.
    pub async fn close_month_if_due(&self) -> Result<RolloverOutcome> {
        self.close_month_if_due_at(Local::now()).await
    }

    pub async fn close_month_if_due_at(&self, now: DateTime<Local>) -> Result<RolloverOutcome> {
        let (year, month) = calendar::previous_month(now);
        if self.monthly.header_exists(year, month).await? {
            return Ok(RolloverOutcome::AlreadyClosed);
        }

        info!("closing month {}-{:02}", year, month);
        let frozen_at = calendar::timestamp(now);
        let roster = self.children.list().await?;
        let mut frozen = 0usize;
        for child in &roster {
            let lock = self.db.child_lock(&child.id);
            let _guard = lock.lock().await;
            // Re-read under the lock: the roster row may predate a
            // concurrent credit.
            if let Some(current) = self.children.get(&child.id).await? {
                if self.monthly.freeze_child(year, month, &current, &frozen_at).await? {
                    frozen += 1;
                }
            }
        }

        let total_sum = self.monthly.month_total(year, month).await?;
        self.monthly.insert_header(year, month, total_sum, &frozen_at).await?;

        info!(
            "closed month {}-{:02}: {} children frozen, total {}",
            year, month, frozen, total_sum
        );
        Ok(RolloverOutcome::Closed { year, month, children: frozen, total_sum })
    }
}
