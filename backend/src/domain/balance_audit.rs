//! Derive-or-cache reconciliation for balances.
//!
//! The cached per-child balance exists for fast reads; the event log is
//! the source of truth. A child's derived balance is the credited sum of
//! events after the child's latest rollover boundary (or all events).
//! On startup the two are compared and the cache is repaired on mismatch.

use tracing::{info, warn};

use crate::errors::Result;
use crate::storage::{ChildRepository, Db, EventRepository, MonthlyResultRepository};

#[derive(Clone)]
pub struct BalanceAudit {
    children: ChildRepository,
    events: EventRepository,
    monthly: MonthlyResultRepository,
}

impl BalanceAudit {
    pub fn new(db: Db) -> Self {
        Self {
            children: ChildRepository::new(db.clone()),
            events: EventRepository::new(db.clone()),
            monthly: MonthlyResultRepository::new(db),
        }
    }

    async fn derived_balance(&self, child_id: &str) -> Result<i64> {
        let boundary = self.monthly.latest_frozen_at(child_id).await?;
        self.events.sum_credited_after(child_id, boundary.as_deref()).await
    }

    /// Diagnostic pass: report every child whose cached balance disagrees
    /// with the event log, without changing anything.
    pub async fn validate_all(&self) -> Result<Vec<String>> {
        let mut mismatches = Vec::new();
        for child in self.children.list().await? {
            let derived = self.derived_balance(&child.id).await?;
            if derived != child.balance {
                mismatches.push(format!(
                    "child {} has cached balance {}, event log says {}",
                    child.id, child.balance, derived
                ));
            }
        }
        Ok(mismatches)
    }

    /// Repair pass, run at startup: rewrite every mismatched cached
    /// balance from the event log. Returns the number of repairs.
    pub async fn reconcile_all(&self) -> Result<usize> {
        let mut repaired = 0;
        for child in self.children.list().await? {
            let derived = self.derived_balance(&child.id).await?;
            if derived != child.balance {
                warn!(
                    "repairing balance of {}: cached {} -> derived {}",
                    child.id, child.balance, derived
                );
                self.children.set_balance(&child.id, derived).await?;
                repaired += 1;
            }
        }
        if repaired > 0 {
            info!("reconciled {} balances from the event log", repaired);
        }
        Ok(repaired)
    }
}
