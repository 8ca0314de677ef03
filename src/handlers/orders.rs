use crate::{
    auth::CurrentActor,
    services::{
        availability::ConflictResult,
        orders::{AvailabilityQuery, CreateOrderRequest, OrderDetail, UpdateOrderRequest},
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};

pub async fn create_order(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderDetail>>), crate::errors::ServiceError> {
    let actor = actor.required()?;
    let created = state.order_service().create_order(payload, &actor).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<OrderDetail> {
    let order = state.order_service().get_order(id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn update_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    actor: CurrentActor,
    Json(payload): Json<UpdateOrderRequest>,
) -> ApiResult<OrderDetail> {
    let actor = actor.required()?;
    let updated = state
        .order_service()
        .update_order(id, payload, Some(&actor))
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    actor: CurrentActor,
) -> ApiResult<Value> {
    let actor = actor.required()?;
    state.order_service().delete_order(id, &actor).await?;
    Ok(Json(ApiResponse::with_message(
        json!({ "order_id": id, "deleted": true }),
        "Order deleted",
    )))
}

pub async fn confirm_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    actor: CurrentActor,
) -> ApiResult<OrderDetail> {
    let actor = actor.required()?;
    let order = state.order_service().confirm_order(id, &actor).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn execute_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    actor: CurrentActor,
) -> ApiResult<OrderDetail> {
    let actor = actor.required()?;
    let order = state.order_service().execute_order(id, &actor).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn send_for_review(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    actor: CurrentActor,
) -> ApiResult<OrderDetail> {
    let actor = actor.required()?;
    let order = state.order_service().send_for_review(id, &actor).await?;
    Ok(Json(ApiResponse::with_message(order, "Order sent for review")))
}

pub async fn approve_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    actor: CurrentActor,
) -> ApiResult<OrderDetail> {
    let actor = actor.required()?;
    let order = state.order_service().approve_order(id, &actor).await?;
    Ok(Json(ApiResponse::with_message(order, "Order approved")))
}

pub async fn check_availability(
    State(state): State<AppState>,
    Json(query): Json<AvailabilityQuery>,
) -> ApiResult<ConflictResult> {
    let result = state.order_service().check_availability(&query).await?;
    Ok(Json(ApiResponse::success(result)))
}
