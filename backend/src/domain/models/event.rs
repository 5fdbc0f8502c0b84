//! The append-only ledger event. Events are the sole source of truth for
//! balance history; a child's working balance is the sum of `credited`
//! over its events since the last rollover boundary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Action, Child};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Credit earned through gameplay. Always carries an action id.
    ActionCredit,
    /// Administrator-issued delta. Always carries a comment.
    ManualAdjustment,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ActionCredit => "action_credit",
            EventKind::ManualAdjustment => "manual_adjustment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "action_credit" => Some(EventKind::ActionCredit),
            "manual_adjustment" => Some(EventKind::ManualAdjustment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub child_id: String,
    /// Set for `ActionCredit`, `None` for manual adjustments.
    pub action_id: Option<String>,
    /// Signed credited amount.
    pub credited: i64,
    /// Fixed-width UTC RFC 3339 timestamp (see `calendar::timestamp`).
    pub timestamp: String,
    pub kind: EventKind,
    /// Required for manual adjustments.
    pub comment: Option<String>,
    /// Administrator who issued a manual adjustment.
    pub actor: Option<String>,
    /// Balance recorded right after this event was applied (audit data).
    pub balance_after: i64,
}

impl Event {
    pub fn generate_id() -> String {
        format!("event::{}", Uuid::new_v4())
    }

    pub fn action_credit(child: &Child, action: &Action, timestamp: String, balance_after: i64) -> Self {
        Self {
            id: Self::generate_id(),
            child_id: child.id.clone(),
            action_id: Some(action.id.clone()),
            credited: action.credit,
            timestamp,
            kind: EventKind::ActionCredit,
            comment: None,
            actor: None,
            balance_after,
        }
    }

    pub fn manual_adjustment(
        child: &Child,
        delta: i64,
        comment: String,
        actor: String,
        timestamp: String,
        balance_after: i64,
    ) -> Self {
        Self {
            id: Self::generate_id(),
            child_id: child.id.clone(),
            action_id: None,
            credited: delta,
            timestamp,
            kind: EventKind::ManualAdjustment,
            comment: Some(comment),
            actor: Some(actor),
            balance_after,
        }
    }
}
