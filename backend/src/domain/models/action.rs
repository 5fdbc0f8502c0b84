use serde::{Deserialize, Serialize};

/// One entry of the fixed action catalog: what an ecological action is
/// worth and how often it may be credited. Read-mostly reference data,
/// seeded at startup and never mutated by ordinary play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub name: String,
    /// Coins credited per successful interaction.
    pub credit: i64,
    /// Minimum seconds between two credited uses by the same child.
    pub cooldown_secs: i64,
    /// Maximum credited uses per child per local calendar day.
    pub daily_cap: i64,
}
