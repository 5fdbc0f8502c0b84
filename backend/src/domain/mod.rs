//! Domain layer: the ledger's services and models.
//!
//! Writes to a child's balance only ever happen through `RewardService`,
//! `AdjustmentService` and `RolloverService`, each of which takes the
//! child's exclusive lock before touching anything; reads go through
//! `StatsService` without locking.

pub mod adjustment_service;
pub mod balance_audit;
pub mod calendar;
pub mod child_service;
pub mod commands;
pub mod group_service;
pub mod models;
pub mod rate_limiter;
pub mod reward_service;
pub mod rollover_service;
pub mod stats_service;

pub use adjustment_service::AdjustmentService;
pub use balance_audit::BalanceAudit;
pub use child_service::ChildService;
pub use group_service::GroupService;
pub use rate_limiter::{RateLimitDecision, RateLimiter};
pub use reward_service::RewardService;
pub use rollover_service::RolloverService;
pub use stats_service::StatsService;
