use super::dto::{AccountResponse, LedgerEntryResponse, LoginRequest, RegisterRequest};
use super::{ApiJson, ApiResult, AuthUser, SharedState, blocking};
use crate::service::NewAccount;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

pub(super) fn routes() -> Router<SharedState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/me/ledger", get(ledger))
}

async fn register(
    State(state): State<SharedState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let new = NewAccount {
        username: body.username,
        name: body.name,
        email: body.email,
        password: body.password,
    };
    let account = blocking(&state, move |service| service.register(new)).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "user": AccountResponse::from(&account),
        })),
    ))
}

async fn login(State(state): State<SharedState>, ApiJson(body): ApiJson<LoginRequest>) -> ApiResult<Json<Value>> {
    let account = blocking(&state, move |service| service.login(&body.email, &body.password)).await?;
    let access_token = state.tokens.issue(&account.id)?;

    Ok(Json(json!({
        "success": true,
        "access_token": access_token,
        "user": AccountResponse::from(&account),
    })))
}

async fn me(State(state): State<SharedState>, user: AuthUser) -> ApiResult<Json<Value>> {
    let account = blocking(&state, move |service| service.account(&user.id)).await?;
    Ok(Json(json!({ "success": true, "user": AccountResponse::from(&account) })))
}

async fn ledger(State(state): State<SharedState>, user: AuthUser) -> ApiResult<Json<Value>> {
    let entries = blocking(&state, move |service| service.ledger_history(&user.id)).await?;
    let entries: Vec<_> = entries.iter().map(LedgerEntryResponse::from).collect();
    Ok(Json(json!({ "success": true, "entries": entries })))
}
