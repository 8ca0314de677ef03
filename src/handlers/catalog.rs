use crate::{
    entities::{customer, department, event, package, venue},
    errors::ServiceError,
    services::{
        catalog::{
            CreateDepartmentRequest, CreateEventRequest, CreatePackageRequest, CreateUserRequest,
            CreateVenueRequest, UserWithRoles,
        },
        orders::NewCustomer,
    },
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ServiceError>;

fn created<T>(data: T) -> Created<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

#[derive(Debug, Deserialize, Default)]
pub struct PackageListQuery {
    pub department_id: Option<i32>,
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<CreateEventRequest>,
) -> Created<event::Model> {
    created(state.catalog_service().create_event(payload).await?)
}

pub async fn list_events(State(state): State<AppState>) -> ApiResult<Vec<event::Model>> {
    Ok(Json(ApiResponse::success(
        state.catalog_service().list_events().await?,
    )))
}

pub async fn create_venue(
    State(state): State<AppState>,
    Json(payload): Json<CreateVenueRequest>,
) -> Created<venue::Model> {
    created(state.catalog_service().create_venue(payload).await?)
}

pub async fn list_venues(State(state): State<AppState>) -> ApiResult<Vec<venue::Model>> {
    Ok(Json(ApiResponse::success(
        state.catalog_service().list_venues().await?,
    )))
}

pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<NewCustomer>,
) -> Created<customer::Model> {
    created(state.catalog_service().create_customer(payload).await?)
}

pub async fn list_customers(State(state): State<AppState>) -> ApiResult<Vec<customer::Model>> {
    Ok(Json(ApiResponse::success(
        state.catalog_service().list_customers().await?,
    )))
}

pub async fn create_department(
    State(state): State<AppState>,
    Json(payload): Json<CreateDepartmentRequest>,
) -> Created<department::Model> {
    created(state.catalog_service().create_department(payload).await?)
}

pub async fn list_departments(State(state): State<AppState>) -> ApiResult<Vec<department::Model>> {
    Ok(Json(ApiResponse::success(
        state.catalog_service().list_departments().await?,
    )))
}

pub async fn create_package(
    State(state): State<AppState>,
    Json(payload): Json<CreatePackageRequest>,
) -> Created<package::Model> {
    created(state.catalog_service().create_package(payload).await?)
}

pub async fn list_packages(
    State(state): State<AppState>,
    Query(query): Query<PackageListQuery>,
) -> ApiResult<Vec<package::Model>> {
    Ok(Json(ApiResponse::success(
        state
            .catalog_service()
            .list_packages(query.department_id)
            .await?,
    )))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Created<UserWithRoles> {
    created(state.catalog_service().create_user(payload).await?)
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<UserWithRoles>> {
    Ok(Json(ApiResponse::success(
        state.catalog_service().list_users().await?,
    )))
}
