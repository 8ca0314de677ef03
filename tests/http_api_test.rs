mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use beo_api::auth::ACTOR_HEADER;
use common::TestContext;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn call(router: &Router, method: Method, uri: &str, actor: Option<i32>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = actor {
        builder = builder.header(ACTOR_HEADER, id.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn order_body(ctx: &TestContext, venue_id: i32, start: &str, end: &str) -> Value {
    json!({
        "event_id": ctx.fixtures.conference.id,
        "event_name": "Product Launch Night",
        "start_date": start,
        "end_date": end,
        "venue_ids": [venue_id],
        "customer_id": ctx.fixtures.customer.id,
        "schedules": [{
            "start_date": start,
            "end_date": start,
            "time_start": "08:00:00",
            "time_end": "17:00:00",
            "function": "show",
            "people": 120
        }]
    })
}

#[tokio::test]
async fn health_reports_database_up() {
    let ctx = TestContext::new().await;
    let (status, body) = call(&ctx.router(), Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["checks"]["database"]["status"], "up");
}

#[tokio::test]
async fn order_lifecycle_over_http() {
    let ctx = TestContext::new().await;
    let router = ctx.router();
    let f = &ctx.fixtures;

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/v1/orders",
        Some(f.sales.id),
        Some(order_body(&ctx, f.hall_a.id, "2025-05-01", "2025-05-02")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["custom_code"], "CNF00001");
    assert_eq!(body["data"]["status"], "inquiry");
    assert_eq!(body["data"]["schedules"][0]["function"], "show");
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, _) = call(
        &router,
        Method::POST,
        &format!("/api/v1/orders/{}/send-for-review", id),
        Some(f.sales.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &router,
        Method::POST,
        &format!("/api/v1/orders/{}/approve", id),
        Some(f.kanit.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status_beo"], "approved");
    assert!(body["data"]["file"]["url"].as_str().unwrap().contains("/storage/beo/"));

    let (status, body) = call(&router, Method::GET, &format!("/api/v1/orders/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["venues"][0]["name"], "Hall A");
}

#[tokio::test]
async fn booking_conflict_is_409_with_venue_details() {
    let ctx = TestContext::new().await;
    let router = ctx.router();
    let f = &ctx.fixtures;

    let (status, _) = call(
        &router,
        Method::POST,
        "/api/v1/orders",
        Some(f.sales.id),
        Some(order_body(&ctx, f.hall_a.id, "2025-03-11", "2025-03-11")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/v1/orders",
        Some(f.sales.id),
        Some(order_body(&ctx, f.hall_a.id, "2025-03-10", "2025-03-12")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"], json!(["Hall A"]));

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/v1/availability",
        None,
        Some(json!({
            "venue_ids": [f.hall_a.id, f.hall_b.id],
            "start_date": "2025-03-11",
            "end_date": "2025-03-20"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let conflicts = body["data"]["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["venue_name"], "Hall A");
    assert_eq!(conflicts[0]["custom_code"], "CNF00001");
}

#[tokio::test]
async fn missing_actor_and_wrong_role_are_forbidden() {
    let ctx = TestContext::new().await;
    let router = ctx.router();
    let f = &ctx.fixtures;

    let (status, _) = call(
        &router,
        Method::POST,
        "/api/v1/orders",
        None,
        Some(order_body(&ctx, f.hall_a.id, "2025-05-01", "2025-05-02")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &router,
        Method::POST,
        "/api/v1/orders",
        Some(f.pic.id),
        Some(order_body(&ctx, f.hall_a.id, "2025-05-01", "2025-05-02")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn editing_over_http_requires_a_known_actor() {
    let ctx = TestContext::new().await;
    let router = ctx.router();
    let f = &ctx.fixtures;

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/v1/orders",
        Some(f.sales.id),
        Some(order_body(&ctx, f.hall_a.id, "2025-05-01", "2025-05-02")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/v1/orders/{}", body["data"]["id"].as_i64().unwrap());
    let edit = json!({ "event_name": "Renamed Launch" });

    let (status, _) = call(&router, Method::PUT, &uri, None, Some(edit.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&router, Method::PUT, &uri, Some(9_999), Some(edit.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&router, Method::PUT, &uri, Some(f.pic.id), Some(edit.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&router, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["event_name"], "Product Launch Night");

    let (status, body) = call(&router, Method::PUT, &uri, Some(f.sales.id), Some(edit)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["event_name"], "Renamed Launch");
}

#[tokio::test]
async fn notification_feed_lists_and_marks_read() {
    let ctx = TestContext::new().await;
    let f = &ctx.fixtures;

    // The recording notifier keeps nothing in the table; write one entry the
    // way the database channel does.
    let notifier = beo_api::notifications::DatabaseNotifier::new(
        ctx.db.clone(),
        std::sync::Arc::new(beo_api::notifications::LogMailer::new("test@venue.local")),
        "http://localhost".into(),
    );
    let notification = beo_api::notifications::OrderNotification::SentToKanit {
        order: beo_api::notifications::OrderRef {
            order_id: 1,
            custom_code: "CNF00001".into(),
            event_name: "Summit".into(),
        },
        sent_by: beo_api::notifications::ActorRef {
            id: f.sales.id,
            name: f.sales.name.clone(),
        },
    };
    let recipient = beo_api::notifications::Recipient {
        user_id: f.kanit.id,
        name: f.kanit.name.clone(),
        email: f.kanit.email.clone(),
    };
    beo_api::notifications::Notifier::send(
        &notifier,
        &notification,
        &[recipient],
        notification.channels(),
    )
    .await
    .unwrap();

    let router = ctx.router();
    let (status, body) = call(&router, Method::GET, "/api/v1/notifications", Some(f.kanit.id), None).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["kind"], "order_sent_to_kanit");
    assert!(items[0]["read_at"].is_null());
    let id = items[0]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &router,
        Method::POST,
        &format!("/api/v1/notifications/{}/read", id),
        Some(f.kanit.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["data"]["read_at"].is_null());

    let (status, _) = call(
        &router,
        Method::POST,
        &format!("/api/v1/notifications/{}/read", id),
        Some(f.sales.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_endpoints_create_and_reject_duplicates() {
    let ctx = TestContext::new().await;
    let router = ctx.router();

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/v1/events",
        None,
        Some(json!({ "event_type": "Wedding" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["code"], "WED");

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/v1/events",
        None,
        Some(json!({ "event_type": "Robot Battle" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["code"], "EVT");

    let (status, _) = call(
        &router,
        Method::POST,
        "/api/v1/departments",
        None,
        Some(json!({ "name": "Catering" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/v1/packages",
        None,
        Some(json!({ "department_id": ctx.fixtures.catering.id, "name": "Coffee Break A" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["department_id"], ctx.fixtures.catering.id);

    let (status, body) = call(
        &router,
        Method::GET,
        &format!("/api/v1/packages?department_id={}", ctx.fixtures.catering.id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = call(&router, Method::GET, "/api/v1/users", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let kanit = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["name"] == "Kartika")
        .unwrap();
    assert_eq!(kanit["roles"], json!(["kanit"]));
}
