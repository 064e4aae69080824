use super::dto::{ActionRequest, CreateSwapRequest, SwapDetailsResponse, SwapResponse};
use super::{ApiJson, ApiPath, ApiResult, AuthUser, SharedState, blocking};
use crate::swap::SwapAction;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

pub(super) fn routes() -> Router<SharedState> {
    Router::new()
        .route("/request", post(create))
        .route("/my-requests", get(my_requests))
        .route("/received-requests", get(received_requests))
        .route("/{id}/respond", post(respond))
        .route("/{id}/cancel", post(cancel))
}

async fn create(
    State(state): State<SharedState>,
    user: AuthUser,
    ApiJson(body): ApiJson<CreateSwapRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let kind = body.kind()?;
    let target = body.requested_item_id;
    let swap = blocking(&state, move |service| service.create_swap(&user.id, &target, kind)).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Swap request created successfully",
            "swap_id": swap.id,
            "swap": SwapResponse::from(&swap),
        })),
    ))
}

async fn respond(
    State(state): State<SharedState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<ActionRequest>,
) -> ApiResult<Json<Value>> {
    let action: SwapAction = body.action.parse()?;
    let swap = blocking(&state, move |service| service.respond_swap(&user.id, &id, action)).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Swap request {} successfully", swap.status.as_str()),
        "swap": SwapResponse::from(&swap),
    })))
}

async fn cancel(
    State(state): State<SharedState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    let swap = blocking(&state, move |service| service.cancel_swap(&user.id, &id)).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Swap request cancelled successfully",
        "swap": SwapResponse::from(&swap),
    })))
}

async fn my_requests(State(state): State<SharedState>, user: AuthUser) -> ApiResult<Json<Value>> {
    let swaps = blocking(&state, move |service| service.my_requests(&user.id)).await?;
    let swaps: Vec<_> = swaps.iter().map(SwapDetailsResponse::from).collect();
    Ok(Json(json!({ "success": true, "swaps": swaps })))
}

async fn received_requests(State(state): State<SharedState>, user: AuthUser) -> ApiResult<Json<Value>> {
    let swaps = blocking(&state, move |service| service.received_requests(&user.id)).await?;
    let swaps: Vec<_> = swaps.iter().map(SwapDetailsResponse::from).collect();
    Ok(Json(json!({ "success": true, "swaps": swaps })))
}
