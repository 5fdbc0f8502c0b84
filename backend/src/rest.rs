//! REST facade: axum handlers mapped 1:1 onto the core operations.
//!
//! This layer carries no session mechanics. The boundary in front of it
//! is trusted to have authenticated the caller and asserts the role via
//! the `x-role` header (`admin` or `educator`; anything else gets the
//! least privilege) and the acting administrator's name via `x-actor`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, info};

use shared::{
    ActionDto, AdjustBalanceRequest, AdjustBalanceResponse, ChildDto, CreateChildRequest,
    CreateGroupRequest, ErrorResponse, GroupDto, InteractionRequest, InteractionResponse,
    UpdateChildRequest, UpdateGroupRequest,
};

use crate::domain::commands::{
    AdjustBalanceCommand, ChildStatsFilter, CreateChildCommand, EventFilter, InteractionOutcome,
    Role, UpdateChildCommand,
};
use crate::domain::models::{Action, Child, Group};
use crate::errors::LedgerError;
use crate::Ledger;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/groups", get(list_groups))
        .route("/children", get(list_children))
        .route("/game/actions", get(list_actions))
        .route("/game/interaction", post(game_interaction))
        .route("/admin/stats/groups", get(stats_groups))
        .route("/admin/stats/children", get(stats_children))
        .route("/admin/events", get(list_events))
        .route("/admin/monthly-results", get(monthly_results))
        .route("/admin/monthly-stats", get(monthly_report))
        .route("/admin/groups", get(admin_groups).post(create_group))
        .route("/admin/group/:id", put(update_group).delete(delete_group))
        .route("/admin/children", post(create_child))
        .route("/admin/child/:id", put(update_child).delete(delete_child))
        .route("/admin/child/:id/events", get(child_events))
        .route("/admin/child/:id/balance-adjust", post(adjust_balance));

    Router::new().nest("/api/v1", api).with_state(state)
}

fn caller_role(headers: &HeaderMap) -> Role {
    headers
        .get("x-role")
        .and_then(|v| v.to_str().ok())
        .map(Role::parse)
        .unwrap_or(Role::Educator)
}

fn caller_actor(headers: &HeaderMap) -> String {
    headers
        .get("x-actor")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("admin")
        .to_string()
}

fn error_response(err: LedgerError) -> Response {
    let status = match &err {
        LedgerError::NotFound { .. } => StatusCode::NOT_FOUND,
        LedgerError::InvalidAmount(_) | LedgerError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        LedgerError::Conflict(_) => StatusCode::CONFLICT,
        LedgerError::Forbidden(_) => StatusCode::FORBIDDEN,
        LedgerError::Storage(_) => {
            error!("storage failure: {:?}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse { error: err.to_string() })).into_response()
}

fn group_dto(group: Group) -> GroupDto {
    GroupDto { id: group.id, name: group.name }
}

fn child_dto(child: Child) -> ChildDto {
    ChildDto {
        id: child.id,
        full_name: child.full_name,
        group_id: child.group_id,
        balance: child.balance,
    }
}

fn action_dto(action: Action) -> ActionDto {
    ActionDto {
        id: action.id,
        name: action.name,
        credit: action.credit,
        cooldown_secs: action.cooldown_secs,
        daily_cap: action.daily_cap,
    }
}

#[derive(Deserialize, Debug)]
pub struct PeriodQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChildStatsQuery {
    pub group_id: Option<String>,
    pub q: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub group_id: Option<String>,
    pub child_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyResultsQuery {
    pub group_id: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReportQuery {
    pub year: i32,
    pub month: u32,
    pub group_id: Option<String>,
}

/// GET /api/v1/groups
async fn list_groups(State(state): State<AppState>) -> impl IntoResponse {
    match state.ledger.groups.list_groups().await {
        Ok(groups) => {
            let dtos: Vec<GroupDto> = groups.into_iter().map(group_dto).collect();
            (StatusCode::OK, Json(dtos)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/children — also the rollover trigger on first access in a
/// new month.
async fn list_children(State(state): State<AppState>) -> impl IntoResponse {
    match state.ledger.children.list_children().await {
        Ok(children) => {
            let dtos: Vec<ChildDto> = children.into_iter().map(child_dto).collect();
            (StatusCode::OK, Json(dtos)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/game/actions
async fn list_actions(State(state): State<AppState>) -> impl IntoResponse {
    match state.ledger.rewards.list_actions().await {
        Ok(actions) => {
            let dtos: Vec<ActionDto> = actions.into_iter().map(action_dto).collect();
            (StatusCode::OK, Json(dtos)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/game/interaction
async fn game_interaction(
    State(state): State<AppState>,
    Json(request): Json<InteractionRequest>,
) -> impl IntoResponse {
    info!("POST /game/interaction child={} action={}", request.child_id, request.action_id);
    match state.ledger.rewards.interact(&request.child_id, &request.action_id).await {
        Ok(InteractionOutcome::Credited { credited, new_balance }) => (
            StatusCode::OK,
            Json(InteractionResponse { success: true, credited, new_balance, reason: None }),
        )
            .into_response(),
        Ok(InteractionOutcome::Refused { reason, balance }) => (
            StatusCode::OK,
            Json(InteractionResponse {
                success: false,
                credited: 0,
                new_balance: balance,
                reason: Some(reason.as_str().to_string()),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/admin/stats/groups?from&to
async fn stats_groups(
    State(state): State<AppState>,
    Query(query): Query<PeriodQuery>,
) -> impl IntoResponse {
    if let Err(e) = state.ledger.rollover.close_month_if_due().await {
        return error_response(e);
    }
    match state
        .ledger
        .stats
        .groups_in_period(query.from.as_deref(), query.to.as_deref())
        .await
    {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/admin/stats/children?groupId&q&from&to
async fn stats_children(
    State(state): State<AppState>,
    Query(query): Query<ChildStatsQuery>,
) -> impl IntoResponse {
    if let Err(e) = state.ledger.rollover.close_month_if_due().await {
        return error_response(e);
    }
    let filter = ChildStatsFilter {
        group_id: query.group_id,
        name_query: query.q,
        from: query.from,
        to: query.to,
    };
    match state.ledger.stats.children_in_period(filter).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/admin/events?groupId&childId&from&to
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let filter = EventFilter {
        group_id: query.group_id,
        child_id: query.child_id,
        from: query.from,
        to: query.to,
    };
    match state.ledger.stats.events_in_period(filter).await {
        Ok(events) => (StatusCode::OK, Json(events)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/admin/child/:id/events?from&to
async fn child_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> impl IntoResponse {
    match state
        .ledger
        .stats
        .child_history(&id, query.from.as_deref(), query.to.as_deref())
        .await
    {
        Ok(events) => (StatusCode::OK, Json(events)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/admin/child/:id/balance-adjust
async fn adjust_balance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<AdjustBalanceRequest>,
) -> impl IntoResponse {
    let command = AdjustBalanceCommand {
        child_id: id,
        delta: request.delta,
        comment: request.comment,
        actor: caller_actor(&headers),
    };
    match state.ledger.adjustments.adjust(command).await {
        Ok(new_balance) => (StatusCode::OK, Json(AdjustBalanceResponse { new_balance })).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/admin/monthly-results?groupId
async fn monthly_results(
    State(state): State<AppState>,
    Query(query): Query<MonthlyResultsQuery>,
) -> impl IntoResponse {
    if let Err(e) = state.ledger.rollover.close_month_if_due().await {
        return error_response(e);
    }
    match state.ledger.stats.monthly_results(query.group_id.as_deref()).await {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/admin/monthly-stats?year&month&groupId
async fn monthly_report(
    State(state): State<AppState>,
    Query(query): Query<MonthlyReportQuery>,
) -> impl IntoResponse {
    match state
        .ledger
        .stats
        .monthly_report(query.year, query.month, query.group_id.as_deref())
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/admin/groups
async fn admin_groups(State(state): State<AppState>) -> impl IntoResponse {
    list_groups(State(state)).await.into_response()
}

/// POST /api/v1/admin/groups
async fn create_group(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateGroupRequest>,
) -> impl IntoResponse {
    match state.ledger.groups.create_group(&request.name, caller_role(&headers)).await {
        Ok(group) => (StatusCode::CREATED, Json(group_dto(group))).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT /api/v1/admin/group/:id
async fn update_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateGroupRequest>,
) -> impl IntoResponse {
    match state.ledger.groups.update_group(&id, &request.name).await {
        Ok(group) => (StatusCode::OK, Json(group_dto(group))).into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/v1/admin/group/:id
async fn delete_group(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    match state.ledger.groups.delete_group(&id, caller_role(&headers)).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "ok": true }))).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/v1/admin/children
async fn create_child(
    State(state): State<AppState>,
    Json(request): Json<CreateChildRequest>,
) -> impl IntoResponse {
    let command = CreateChildCommand {
        full_name: request.full_name,
        group_id: request.group_id,
    };
    match state.ledger.children.create_child(command).await {
        Ok(child) => (StatusCode::CREATED, Json(child_dto(child))).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT /api/v1/admin/child/:id
async fn update_child(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateChildRequest>,
) -> impl IntoResponse {
    let command = UpdateChildCommand {
        child_id: id,
        full_name: request.full_name,
        group_id: request.group_id,
    };
    match state.ledger.children.update_child(command).await {
        Ok(child) => (StatusCode::OK, Json(child_dto(child))).into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/v1/admin/child/:id
async fn delete_child(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.ledger.children.delete_child(&id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "ok": true }))).into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::connection::test_support::{open_test_db, TestDb};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn test_app() -> (Router, TestDb) {
        let handle = open_test_db().await;
        let ledger = Ledger::with_db(handle.db.clone());
        (router(AppState { ledger: Arc::new(ledger) }), handle)
    }

    fn json_request(method: &str, uri: &str, role: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-role", role)
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn interaction_flow_over_http() {
        let (app, _db) = test_app().await;

        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/admin/children",
                "admin",
                serde_json::json!({ "fullName": "Masha Ivanova", "groupId": null }),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let child = body_json(created).await;
        let child_id = child["id"].as_str().unwrap().to_string();

        let interaction = serde_json::json!({ "childId": child_id, "actionId": "battery" });
        let first = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/game/interaction", "educator", interaction.clone()))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let first = body_json(first).await;
        assert_eq!(first["success"], true);
        assert_eq!(first["credited"], 5);
        assert_eq!(first["new_balance"], 5);

        // Immediate repeat trips the cooldown; balance is unchanged.
        let second = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/game/interaction", "educator", interaction))
            .await
            .unwrap();
        let second = body_json(second).await;
        assert_eq!(second["success"], false);
        assert_eq!(second["reason"], "cooldown");
        assert_eq!(second["new_balance"], 5);
    }

    #[tokio::test]
    async fn interaction_with_unknown_child_is_not_found() {
        let (app, _db) = test_app().await;

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/v1/game/interaction",
                "educator",
                serde_json::json!({ "childId": "child::ghost", "actionId": "battery" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn group_deletion_is_admin_only() {
        let (app, _db) = test_app().await;

        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/admin/groups",
                "admin",
                serde_json::json!({ "name": "Sunshine" }),
            ))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let group = body_json(created).await;
        let uri = format!("/api/v1/admin/group/{}", group["id"].as_str().unwrap());

        let forbidden = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(&uri)
                    .header("x-role", "educator")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let deleted = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(&uri)
                    .header("x-role", "admin")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn adjustment_validation_surfaces_as_bad_request() {
        let (app, _db) = test_app().await;

        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/admin/children",
                "admin",
                serde_json::json!({ "fullName": "Petya", "groupId": null }),
            ))
            .await
            .unwrap();
        let child = body_json(created).await;
        let uri = format!("/api/v1/admin/child/{}/balance-adjust", child["id"].as_str().unwrap());

        let overdraw = app
            .clone()
            .oneshot(json_request(
                "POST",
                &uri,
                "admin",
                serde_json::json!({ "delta": -10, "comment": "oops" }),
            ))
            .await
            .unwrap();
        assert_eq!(overdraw.status(), StatusCode::BAD_REQUEST);

        let credited = app
            .clone()
            .oneshot(json_request(
                "POST",
                &uri,
                "admin",
                serde_json::json!({ "delta": 10, "comment": "prize" }),
            ))
            .await
            .unwrap();
        assert_eq!(credited.status(), StatusCode::OK);
        let body = body_json(credited).await;
        assert_eq!(body["new_balance"], 10);
    }
}
