use super::dto::{
    ActionRequest, AddPointsRequest, AdminActionResponse, ItemResponse, ListQuery, Pagination,
    SwapResponse, UserSummaryResponse,
};
use super::{ApiJson, ApiPath, ApiQuery, ApiResult, AuthUser, SharedState, blocking};
use crate::error::MarketError;
use crate::service::Decision;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::HashMap;

const REPORT_LIMIT: usize = 20;

pub(super) fn routes() -> Router<SharedState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/items/pending", get(pending_items))
        .route("/items/{id}/moderate", post(moderate))
        .route("/users", get(users))
        .route("/users/{id}/toggle-admin", post(toggle_admin))
        .route("/users/{id}/add-points", post(add_points))
        .route("/reports", get(reports))
}

async fn dashboard(State(state): State<SharedState>, admin: AuthUser) -> ApiResult<Json<Value>> {
    let stats = blocking(&state, move |service| service.dashboard(&admin.id)).await?;

    let recent_items: Vec<_> = stats
        .recent_items
        .iter()
        .map(|item| ItemResponse::new(item, None))
        .collect();
    let recent_swaps: Vec<_> = stats.recent_swaps.iter().map(SwapResponse::from).collect();
    let category_stats: Vec<_> = stats
        .category_counts
        .iter()
        .map(|(category, count)| json!({ "category": category, "count": count }))
        .collect();

    Ok(Json(json!({
        "success": true,
        "stats": {
            "total_users": stats.total_users,
            "total_items": stats.total_items,
            "pending_items": stats.pending_items,
            "total_swaps": stats.total_swaps,
            "completed_swaps": stats.completed_swaps,
        },
        "recent_items": recent_items,
        "recent_swaps": recent_swaps,
        "category_stats": category_stats,
    })))
}

async fn pending_items(
    State(state): State<SharedState>,
    admin: AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Value>> {
    let page = state.page(query.page, query.per_page);
    let (page, owners) = blocking(&state, move |service| {
        let page = service.pending_items(&admin.id, page)?;
        let owners: HashMap<_, _> = service
            .store()
            .accounts()?
            .into_iter()
            .map(|account| (account.id.clone(), account))
            .collect();
        Ok((page, owners))
    })
    .await?;

    let items: Vec<_> = page
        .items
        .iter()
        .map(|item| ItemResponse::new(item, owners.get(&item.owner)))
        .collect();
    let pagination = Pagination::from(&page);

    Ok(Json(json!({
        "success": true,
        "items": items,
        "pagination": pagination,
    })))
}

async fn moderate(
    State(state): State<SharedState>,
    admin: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<ActionRequest>,
) -> ApiResult<Json<Value>> {
    let reason = body.reason.filter(|r| !r.trim().is_empty());
    let item = if body.action == "remove" {
        blocking(&state, move |service| service.remove_item(&admin.id, &id, reason)).await?
    } else {
        let decision: Decision = body.action.parse()?;
        blocking(&state, move |service| service.moderate(&admin.id, &id, decision, reason)).await?
    };

    Ok(Json(json!({
        "success": true,
        "message": format!("Item {} successfully", past_tense(&body.action)),
        "item": ItemResponse::new(&item, None),
    })))
}

fn past_tense(action: &str) -> &'static str {
    match action {
        "approve" => "approved",
        "reject" => "rejected",
        _ => "removed",
    }
}

async fn users(
    State(state): State<SharedState>,
    admin: AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<Value>> {
    let page = state.page(query.page, query.per_page);
    let page = blocking(&state, move |service| service.list_users(&admin.id, page)).await?;

    let users: Vec<_> = page.items.iter().map(UserSummaryResponse::from).collect();
    let pagination = Pagination::from(&page);
    Ok(Json(json!({
        "success": true,
        "users": users,
        "pagination": pagination,
    })))
}

async fn toggle_admin(
    State(state): State<SharedState>,
    admin: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    let account = blocking(&state, move |service| service.toggle_admin(&admin.id, &id)).await?;
    let status = if account.is_admin { "enabled" } else { "disabled" };

    Ok(Json(json!({
        "success": true,
        "message": format!("User admin status {status}"),
        "is_admin": account.is_admin,
    })))
}

async fn add_points(
    State(state): State<SharedState>,
    admin: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<AddPointsRequest>,
) -> ApiResult<Json<Value>> {
    let points = u64::try_from(body.points)
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| MarketError::Validation("points must be a positive integer".into()))?;

    let account = blocking(&state, move |service| service.grant_points(&admin.id, &id, points)).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("{points} points added to user"),
        "new_balance": account.points_balance,
    })))
}

async fn reports(State(state): State<SharedState>, admin: AuthUser) -> ApiResult<Json<Value>> {
    let (records, accounts, items) = blocking(&state, move |service| {
        let records = service.recent_actions(&admin.id, REPORT_LIMIT)?;
        let accounts: HashMap<_, _> = service
            .store()
            .accounts()?
            .into_iter()
            .map(|a| (a.id.clone(), a.username))
            .collect();
        let items: HashMap<_, _> = service
            .store()
            .items()?
            .into_iter()
            .map(|i| (i.id.clone(), i.title))
            .collect();
        Ok((records, accounts, items))
    })
    .await?;

    let actions: Vec<_> = records
        .iter()
        .map(|record| {
            json!({
                "action": AdminActionResponse::from(record),
                "admin": accounts.get(&record.actor_id),
                "item_title": items.get(&record.subject_id),
            })
        })
        .collect();

    Ok(Json(json!({ "success": true, "recent_actions": actions })))
}
