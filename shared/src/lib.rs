//! Wire types shared between the ecoledger backend and its clients.
//!
//! Everything here is a plain serde DTO; the backend owns all behavior.
//! Field names follow the JSON contract of the game and admin clients
//! (camelCase), so these types serialize directly onto the wire.

use serde::{Deserialize, Serialize};

/// A group of children (e.g. a kindergarten class).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDto {
    pub id: String,
    pub name: String,
}

/// A child as shown on the roster and in the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildDto {
    pub id: String,
    pub full_name: String,
    pub group_id: Option<String>,
    pub balance: i64,
}

/// One entry of the fixed action catalog (crediting rules).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDto {
    pub id: String,
    pub name: String,
    /// Coins credited per successful interaction.
    pub credit: i64,
    /// Minimum seconds between two credited uses by the same child.
    pub cooldown_secs: i64,
    /// Maximum credited uses per child per calendar day.
    pub daily_cap: i64,
}

/// Body of `POST /api/v1/game/interaction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRequest {
    pub child_id: String,
    pub action_id: String,
}

/// Outcome of a game interaction.
///
/// `reason` is set only on refusals and is one of `cooldown` or
/// `daily_limit`; unknown ids are reported as an error response instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionResponse {
    pub success: bool,
    pub credited: i64,
    pub new_balance: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Body of `POST /api/v1/admin/child/:id/balance-adjust`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustBalanceRequest {
    pub delta: i64,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustBalanceResponse {
    pub new_balance: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChildRequest {
    pub full_name: String,
    pub group_id: Option<String>,
}

/// Partial update; `group_id: None` moves the child out of any group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChildRequest {
    pub full_name: Option<String>,
    pub group_id: Option<String>,
}

/// One ledger event as listed in the admin views. Child and action display
/// names are joined in by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    pub id: String,
    pub child_id: String,
    pub child_name: String,
    pub action_id: Option<String>,
    pub action_name: String,
    /// `action_credit` or `manual_adjustment`.
    pub kind: String,
    pub credited: i64,
    /// UTC RFC 3339 timestamp.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    pub balance_after: i64,
}

/// Per-group rollup for `GET /api/v1/admin/stats/groups`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPeriodStatsDto {
    pub group_id: String,
    pub group_name: String,
    pub children_count: i64,
    pub total_balance: i64,
    pub period_credited: i64,
}

/// Per-child rollup for `GET /api/v1/admin/stats/children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildPeriodStatsDto {
    pub id: String,
    pub full_name: String,
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub balance: i64,
    pub period_credited: i64,
    pub actions_count: i64,
}

/// One frozen per-child row inside a monthly result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyResultRowDto {
    pub child_id: String,
    pub full_name: String,
    pub group_id: Option<String>,
    pub balance: i64,
}

/// Immutable record of one closed month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyResultDto {
    pub year: i32,
    pub month: u32,
    pub children: Vec<MonthlyResultRowDto>,
    pub total_sum: i64,
}

/// Headline numbers of the monthly report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummaryDto {
    pub total_coins: i64,
    pub total_actions: i64,
    pub children_count: i64,
    pub avg_coins_per_child: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionBreakdownDto {
    pub action_id: String,
    pub action_name: String,
    pub count: i64,
    pub total_coins: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopChildDto {
    pub child_id: String,
    pub full_name: String,
    pub group_name: Option<String>,
    pub balance: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBreakdownDto {
    pub group_id: String,
    pub group_name: String,
    pub children_count: i64,
    pub total_coins: i64,
    pub avg_coins: f64,
}

/// Deep-dive report over one closed month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReportDto {
    pub year: i32,
    pub month: u32,
    pub summary: MonthlySummaryDto,
    pub by_action: Vec<ActionBreakdownDto>,
    pub top_children_by_coins: Vec<TopChildDto>,
    pub by_group: Vec<GroupBreakdownDto>,
}

/// Uniform error body for non-2xx responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
