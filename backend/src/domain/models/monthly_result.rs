use serde::{Deserialize, Serialize};

/// One frozen per-child balance inside a closed month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyResultRow {
    pub child_id: String,
    pub full_name: String,
    /// Group membership at the moment of the snapshot.
    pub group_id: Option<String>,
    pub balance: i64,
}

/// Immutable record of one closed month. Written exactly once per
/// (year, month) by the rollover; never overwritten or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyResult {
    pub year: i32,
    pub month: u32,
    pub children: Vec<MonthlyResultRow>,
    pub total_sum: i64,
}
