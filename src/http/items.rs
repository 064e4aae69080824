use super::dto::{ItemResponse, ListQuery, Pagination, UploadItemRequest};
use super::{ApiJson, ApiPath, ApiQuery, ApiResult, AuthUser, SharedState, blocking};
use crate::error::MarketError;
use crate::item::ItemDetails;
use crate::service::BrowseQuery;
use crate::types::Condition;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::HashMap;

pub(super) fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", get(list))
        .route("/upload", post(upload))
        .route("/my-items", get(my_items))
        .route("/acquired", get(acquired))
        .route("/{id}", get(detail).delete(remove))
}

async fn list(State(state): State<SharedState>, ApiQuery(query): ApiQuery<ListQuery>) -> ApiResult<Json<Value>> {
    let page = state.page(query.page, query.per_page);
    let browse = BrowseQuery {
        search: query.search,
        category: query.category,
    };

    let (page, owners) = blocking(&state, move |service| {
        let page = service.browse(&browse, page)?;
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

async fn detail(State(state): State<SharedState>, ApiPath(id): ApiPath<String>) -> ApiResult<Json<Value>> {
    let (item, owner) = blocking(&state, move |service| {
        let item = service.item(&id)?;
        let owner = service.store().account(&item.owner)?;
        Ok((item, owner))
    })
    .await?;

    Ok(Json(json!({
        "success": true,
        "item": ItemResponse::new(&item, owner.as_ref()),
    })))
}

async fn upload(
    State(state): State<SharedState>,
    user: AuthUser,
    ApiJson(body): ApiJson<UploadItemRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let condition: Condition = body.condition.parse().map_err(MarketError::Validation)?;
    let details = body.images.iter().fold(
        ItemDetails::new()
            .set_title(&body.title)
            .set_description(&body.description)
            .set_category(&body.category)
            .set_type(&body.item_type)
            .set_condition(condition)
            .set_size(&body.size)
            .set_tags(&body.tags),
        |details, image| details.add_image(image),
    );

    let item = blocking(&state, move |service| service.list_item(&user.id, details)).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Item uploaded successfully",
            "item_id": item.id,
            "images": item.images,
        })),
    ))
}

async fn remove(
    State(state): State<SharedState>,
    user: AuthUser,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Json<Value>> {
    let item = blocking(&state, move |service| service.delete_item(&user.id, &id)).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Item deleted successfully",
        "item_id": item.id,
    })))
}

async fn my_items(State(state): State<SharedState>, user: AuthUser) -> ApiResult<Json<Value>> {
    let items = blocking(&state, move |service| service.my_items(&user.id)).await?;
    let items: Vec<_> = items.iter().map(|item| ItemResponse::new(item, None)).collect();
    Ok(Json(json!({ "success": true, "items": items })))
}

async fn acquired(State(state): State<SharedState>, user: AuthUser) -> ApiResult<Json<Value>> {
    let items = blocking(&state, move |service| service.acquired_items(&user.id)).await?;
    let items: Vec<_> = items.iter().map(|item| ItemResponse::new(item, None)).collect();
    Ok(Json(json!({ "success": true, "items": items })))
}
