//! Command and outcome types for the ledger operations.

use serde::{Deserialize, Serialize};

/// Role of the authenticated principal, as asserted by the boundary.
/// The core trusts the flag but enforces what each role may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Educator,
}

impl Role {
    /// Parse a role flag; anything unrecognized gets the least privilege.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::Educator
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateChildCommand {
    pub full_name: String,
    pub group_id: Option<String>,
}

/// `full_name: None` keeps the current name; `group_id` always replaces the
/// membership (`None` moves the child out of any group).
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateChildCommand {
    pub child_id: String,
    pub full_name: Option<String>,
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdjustBalanceCommand {
    pub child_id: String,
    /// Signed, nonzero delta.
    pub delta: i64,
    /// Mandatory audit comment.
    pub comment: String,
    /// Administrator issuing the adjustment.
    pub actor: String,
}

/// Why a gameplay interaction was refused. Expected, frequent outcomes,
/// not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefusalReason {
    Cooldown,
    DailyLimit,
}

impl RefusalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefusalReason::Cooldown => "cooldown",
            RefusalReason::DailyLimit => "daily_limit",
        }
    }
}

/// Result of `RewardService::interact`.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionOutcome {
    /// Exactly one event was appended.
    Credited { credited: i64, new_balance: i64 },
    /// Nothing was written.
    Refused { reason: RefusalReason, balance: i64 },
}

/// Result of `RolloverService::close_month_if_due`.
#[derive(Debug, Clone, PartialEq)]
pub enum RolloverOutcome {
    /// The preceding month already has a result; nothing was done.
    AlreadyClosed,
    Closed { year: i32, month: u32, children: usize, total_sum: i64 },
}

/// Filters for the per-child stats rollup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildStatsFilter {
    pub group_id: Option<String>,
    /// Case-insensitive substring match on the full name.
    pub name_query: Option<String>,
    /// Inclusive local day, `YYYY-MM-DD`.
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Filters for raw event listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub group_id: Option<String>,
    pub child_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}
