use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A child enrolled in the program. The cached `balance` is maintained
/// alongside the event log; the log stays authoritative (see
/// `BalanceAudit`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: String,
    pub full_name: String,
    /// A child belongs to at most one group at a time.
    pub group_id: Option<String>,
    /// Working coin balance since the last monthly rollover. Never negative.
    pub balance: i64,
}

impl Child {
    pub fn new(full_name: impl Into<String>, group_id: Option<String>) -> Self {
        Self {
            id: Self::generate_id(),
            full_name: full_name.into(),
            group_id,
            balance: 0,
        }
    }

    pub fn generate_id() -> String {
        format!("child::{}", Uuid::new_v4())
    }
}
