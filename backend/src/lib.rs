//! # ecoledger backend
//!
//! Reward ledger and rate-limited incentive engine for the eco-actions
//! game: children earn coin credits for ecological actions subject to
//! per-action cooldowns and daily caps, administrators adjust balances
//! with an audit trail, balances roll into immutable monthly results, and
//! statistics are served over arbitrary date ranges.
//!
//! The REST facade in [`rest`] is deliberately thin; all behavior lives in
//! [`domain`] over the SQLite [`storage`] layer.

pub mod config;
pub mod domain;
pub mod errors;
pub mod rest;
pub mod storage;

use tracing::warn;

use crate::domain::{
    AdjustmentService, BalanceAudit, ChildService, GroupService, RewardService, RolloverService,
    StatsService,
};
use crate::errors::Result;
use crate::storage::Db;

/// The assembled engine: every service over one shared database handle.
pub struct Ledger {
    pub children: ChildService,
    pub groups: GroupService,
    pub rewards: RewardService,
    pub adjustments: AdjustmentService,
    pub rollover: RolloverService,
    pub stats: StatsService,
    pub audit: BalanceAudit,
}

impl Ledger {
    pub fn with_db(db: Db) -> Self {
        Self {
            children: ChildService::new(db.clone()),
            groups: GroupService::new(db.clone()),
            rewards: RewardService::new(db.clone()),
            adjustments: AdjustmentService::new(db.clone()),
            rollover: RolloverService::new(db.clone()),
            stats: StatsService::new(db.clone()),
            audit: BalanceAudit::new(db),
        }
    }

    /// Open the database, then reconcile cached balances against the
    /// event log before serving anything.
    pub async fn open(database_url: &str) -> Result<Self> {
        let db = Db::open(database_url).await?;
        let ledger = Self::with_db(db);
        let repaired = ledger.audit.reconcile_all().await?;
        if repaired > 0 {
            warn!("startup reconciliation repaired {} balances", repaired);
        }
        Ok(ledger)
    }
}
