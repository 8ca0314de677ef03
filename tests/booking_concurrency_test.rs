mod common;

use std::collections::BTreeSet;

use beo_api::errors::ServiceError;
use beo_api::services::orders::{AvailabilityQuery, UpdateOrderRequest};
use chrono::{Datelike, Utc};
use common::{date, TestContext};

const POOL_SIZE: u32 = 4;

#[tokio::test]
async fn concurrent_overlapping_bookings_admit_exactly_one() {
    let ctx = TestContext::with_pool_size(POOL_SIZE).await;
    let f = &ctx.fixtures;

    let mut tasks = Vec::new();
    for i in 0..8u32 {
        let orders = ctx.orders.clone();
        let sales = f.sales.clone();
        // Every range contains 2025-10-05
        let request = ctx.order_request(vec![f.hall_a.id], date(2025, 10, 5 - i % 3), date(2025, 10, 5 + i % 2));
        tasks.push(tokio::spawn(async move { orders.create_order(request, &sales).await }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => created += 1,
            Err(ServiceError::BookingConflict { venues }) => {
                assert_eq!(venues, vec!["Hall A".to_string()]);
                conflicts += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1, "exactly one overlapping booking should succeed");
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn concurrent_creations_get_distinct_codes() {
    let ctx = TestContext::with_pool_size(POOL_SIZE).await;
    let f = &ctx.fixtures;

    let mut tasks = Vec::new();
    for i in 1..=8u32 {
        let orders = ctx.orders.clone();
        let sales = f.sales.clone();
        let request = ctx.order_request(vec![f.hall_b.id], date(2025, 11, i * 3), date(2025, 11, i * 3 + 1));
        tasks.push(tokio::spawn(async move { orders.create_order(request, &sales).await }));
    }

    let mut codes = BTreeSet::new();
    for task in tasks {
        let detail = task.await.unwrap().expect("disjoint bookings succeed");
        codes.insert(detail.order.custom_code);
    }
    let expected: BTreeSet<String> = (1..=8).map(|n| format!("CNF{:05}", n)).collect();
    assert_eq!(codes, expected);
}

#[tokio::test]
async fn concurrent_approvals_get_distinct_file_codes() {
    let ctx = TestContext::with_pool_size(POOL_SIZE).await;
    let f = &ctx.fixtures;

    let mut ids = Vec::new();
    for i in 1..=5u32 {
        let order = ctx
            .orders
            .create_order(ctx.order_request(vec![f.hall_c.id], date(2025, 12, i * 4), date(2025, 12, i * 4)), &f.sales)
            .await
            .unwrap();
        ctx.orders.send_for_review(order.order.id, &f.sales).await.unwrap();
        ids.push(order.order.id);
    }

    let mut tasks = Vec::new();
    for id in ids {
        let orders = ctx.orders.clone();
        let kanit = f.kanit.clone();
        tasks.push(tokio::spawn(async move { orders.approve_order(id, &kanit).await }));
    }

    let mut codes = BTreeSet::new();
    for task in tasks {
        let detail = task.await.unwrap().expect("approval succeeds");
        codes.insert(detail.file.expect("live file").file.file_code);
    }

    let now = Utc::now();
    let expected: BTreeSet<String> = (1..=5)
        .map(|n| format!("BEO-{:03}/PPKGBK/JICC/{:02}/{:04}", n, now.month(), now.year()))
        .collect();
    assert_eq!(codes, expected);
}

#[tokio::test]
async fn concurrent_approvals_of_one_order_produce_one_file() {
    let ctx = TestContext::with_pool_size(POOL_SIZE).await;
    let f = &ctx.fixtures;

    let order = ctx
        .orders
        .create_order(ctx.order_request(vec![f.hall_a.id], date(2025, 12, 1), date(2025, 12, 2)), &f.sales)
        .await
        .unwrap();
    ctx.orders.send_for_review(order.order.id, &f.sales).await.unwrap();

    let mut tasks = Vec::new();
    for kanit in [f.kanit.clone(), f.kanit2.clone(), f.admin.clone()] {
        let orders = ctx.orders.clone();
        let id = order.order.id;
        tasks.push(tokio::spawn(async move { orders.approve_order(id, &kanit).await }));
    }

    let mut approved = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => approved += 1,
            Err(ServiceError::InvalidStatus(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(approved, 1);

    let detail = ctx.orders.get_order(order.order.id).await.unwrap();
    assert!(detail.file.is_some());
}

#[tokio::test]
async fn edits_racing_creates_never_double_book() {
    let ctx = TestContext::with_pool_size(POOL_SIZE).await;
    let f = &ctx.fixtures;

    for month in 1..=6u32 {
        let moving = ctx
            .orders
            .create_order(ctx.order_request(vec![f.hall_a.id], date(2026, month, 1), date(2026, month, 2)), &f.sales)
            .await
            .unwrap();
        let order_id = moving.order.id;

        let move_task = {
            let orders = ctx.orders.clone();
            let sales = f.sales.clone();
            let request = UpdateOrderRequest {
                venue_ids: Some(vec![f.hall_b.id]),
                ..Default::default()
            };
            tokio::spawn(async move { orders.update_order(order_id, request, Some(&sales)).await })
        };
        let stretch_task = {
            let orders = ctx.orders.clone();
            let sales = f.sales.clone();
            let request = UpdateOrderRequest {
                end_date: Some(date(2026, month, 3)),
                ..Default::default()
            };
            tokio::spawn(async move { orders.update_order(order_id, request, Some(&sales)).await })
        };
        let create_task = {
            let orders = ctx.orders.clone();
            let sales = f.sales.clone();
            let request = ctx.order_request(vec![f.hall_b.id], date(2026, month, 3), date(2026, month, 3));
            tokio::spawn(async move { orders.create_order(request, &sales).await })
        };

        let mut live = vec![order_id];
        for result in [move_task.await.unwrap(), stretch_task.await.unwrap()] {
            match result {
                Ok(_) | Err(ServiceError::BookingConflict { .. }) => {}
                Err(other) => panic!("unexpected edit error: {other}"),
            }
        }
        match create_task.await.unwrap() {
            Ok(created) => live.push(created.order.id),
            Err(ServiceError::BookingConflict { .. }) => {}
            Err(other) => panic!("unexpected create error: {other}"),
        }

        for id in live {
            let detail = ctx.orders.get_order(id).await.unwrap();
            let overlap = ctx
                .orders
                .check_availability(&AvailabilityQuery {
                    venue_ids: detail.venues.iter().map(|v| v.id).collect(),
                    start_date: detail.order.start_date,
                    end_date: detail.order.end_date,
                    exclude_order_id: Some(id),
                })
                .await
                .unwrap();
            assert!(
                overlap.conflicts.is_empty(),
                "order {} double booked in month {}: {:?}",
                detail.order.custom_code,
                month,
                overlap.conflicts
            );
        }
    }
}
