//! Venue booking and banquet event order (BEO) backend
//!
//! Orders reserve venues for date ranges, collect department work lines and
//! go through a review cycle that ends in a generated BEO document.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod locks;
pub mod migrator;
pub mod notifications;
pub mod rendering;
pub mod services;
pub mod storage;

use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn order_service(&self) -> Arc<services::orders::OrderService> {
        self.services.orders.clone()
    }

    pub fn catalog_service(&self) -> Arc<services::catalog::CatalogService> {
        self.services.catalog.clone()
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    let orders = Router::new()
        .route(
            "/orders",
            post(handlers::orders::create_order),
        )
        .route(
            "/orders/:id",
            get(handlers::orders::get_order)
                .put(handlers::orders::update_order)
                .delete(handlers::orders::delete_order),
        )
        .route("/orders/:id/confirm", post(handlers::orders::confirm_order))
        .route("/orders/:id/execute", post(handlers::orders::execute_order))
        .route(
            "/orders/:id/send-for-review",
            post(handlers::orders::send_for_review),
        )
        .route("/orders/:id/approve", post(handlers::orders::approve_order))
        .route(
            "/availability",
            post(handlers::orders::check_availability),
        );

    let notifications = Router::new()
        .route(
            "/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/notifications/:id/read",
            post(handlers::notifications::mark_notification_read),
        );

    let catalog = Router::new()
        .route(
            "/events",
            get(handlers::catalog::list_events).post(handlers::catalog::create_event),
        )
        .route(
            "/venues",
            get(handlers::catalog::list_venues).post(handlers::catalog::create_venue),
        )
        .route(
            "/customers",
            get(handlers::catalog::list_customers).post(handlers::catalog::create_customer),
        )
        .route(
            "/departments",
            get(handlers::catalog::list_departments).post(handlers::catalog::create_department),
        )
        .route(
            "/packages",
            get(handlers::catalog::list_packages).post(handlers::catalog::create_package),
        )
        .route(
            "/users",
            get(handlers::catalog::list_users).post(handlers::catalog::create_user),
        );

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(orders)
        .merge(notifications)
        .merge(catalog)
}

/// Full application router: `/api/v1` plus HTTP tracing
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
