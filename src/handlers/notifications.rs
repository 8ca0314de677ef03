use crate::{
    auth::CurrentActor, entities::notification, notifications, ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize, Default)]
pub struct NotificationListQuery {
    /// Page size (max 100)
    pub limit: Option<u64>,
}

/// The acting user's feed, newest first
pub async fn list_notifications(
    State(state): State<AppState>,
    actor: CurrentActor,
    Query(query): Query<NotificationListQuery>,
) -> ApiResult<Vec<notification::Model>> {
    let actor = actor.required()?;
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let items = notifications::list_for_user(&state.db, actor.id, limit).await?;
    Ok(Json(ApiResponse::success(items)))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    actor: CurrentActor,
) -> ApiResult<notification::Model> {
    let actor = actor.required()?;
    let item = notifications::mark_as_read(&state.db, actor.id, id).await?;
    Ok(Json(ApiResponse::success(item)))
}
