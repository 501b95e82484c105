//! End-to-end loyalty flows against PostgreSQL
//!
//! Set `TEST_DATABASE_URL` to a disposable database to run these; without it
//! every test returns early.

use std::sync::Arc;

use chrono::Utc;
use crab_loyalty::config::LoyaltySettings;
use crab_loyalty::db::gifts;
use crab_loyalty::services::ledger::{self, GiftRef};
use crab_loyalty::services::submission::{self, SubmitOrder};
use crab_loyalty::services::{allocator, projector, session_tracker};
use crab_loyalty::stripe::{Checkout, CheckoutProvider, CheckoutRequest, DisabledCheckout};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{GiftStatus, OrderItem, OrderType, PaymentMethod, UiState};
use shared::util::{now_millis, snowflake_id};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn setup() -> Option<PgPool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .expect("connect test database");
    crab_loyalty::db::run_migrations(&pool)
        .await
        .expect("run migrations");
    Some(pool)
}

/// Restaurant with a unique name; returns (id, name)
async fn create_restaurant(pool: &PgPool) -> (i64, String) {
    let id = snowflake_id();
    let name = format!("Casa Crab {id}");
    sqlx::query(
        "INSERT INTO restaurants (id, name, owner_account_id, timezone, loyalty_config, created_at)
         VALUES ($1, $2, 'owner-1', 'Europe/Madrid', '{}'::jsonb, $3)",
    )
    .bind(id)
    .bind(&name)
    .bind(now_millis())
    .execute(pool)
    .await
    .unwrap();
    (id, name)
}

async fn create_gift(pool: &PgPool, restaurant_id: i64, device_id: &str, status: GiftStatus) -> i64 {
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO gifts (id, restaurant_id, device_id, gift_type, euro_value, status, created_at)
         VALUES ($1, $2, $3, 'FIXED_VALUE', 5.00, $4, $5)",
    )
    .bind(id)
    .bind(restaurant_id)
    .bind(device_id)
    .bind(status)
    .bind(now_millis())
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn gift_status(pool: &PgPool, gift_id: i64) -> GiftStatus {
    gifts::find(pool, gift_id).await.unwrap().unwrap().status
}

async fn count(pool: &PgPool, sql: &str, restaurant_id: i64) -> i64 {
    let (n,): (i64,) = sqlx::query_as(sql)
        .bind(restaurant_id)
        .fetch_one(pool)
        .await
        .unwrap();
    n
}

fn order_request(restaurant_name: &str, device_id: Option<&str>) -> SubmitOrder {
    SubmitOrder {
        restaurant_name: Some(restaurant_name.to_string()),
        order_type: Some(OrderType::Takeaway),
        items: Some(vec![OrderItem {
            product_id: Some(1),
            name: "Croquetas".into(),
            quantity: 2,
            unit_price: Decimal::new(600, 2),
            options: vec![],
            note: None,
        }]),
        total_price: Some(Decimal::new(1200, 2)),
        payment_method: Some(PaymentMethod::Cash),
        loyalty_device_id: device_id.map(str::to_string),
        ..SubmitOrder::default()
    }
}

fn code(err: crab_loyalty::error::ServiceError) -> ErrorCode {
    AppError::from(err).code
}

#[tokio::test]
async fn concurrent_allocations_get_distinct_numbers() {
    let Some(pool) = setup().await else { return };
    let (restaurant_id, _) = create_restaurant(&pool).await;
    sqlx::query(
        "INSERT INTO order_number_configs (restaurant_id, starting_number, current_number, reset_period)
         VALUES ($1, 1, 7, 'never')",
    )
    .bind(restaurant_id)
    .execute(&pool)
    .await
    .unwrap();

    let allocate = |pool: PgPool| async move {
        let mut tx = pool.begin().await.unwrap();
        let n = allocator::next_order_number(&mut *tx, restaurant_id, "Europe/Madrid", Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();
        n
    };
    let mut numbers = futures::future::join_all([
        tokio::spawn(allocate(pool.clone())),
        tokio::spawn(allocate(pool.clone())),
    ])
    .await
    .into_iter()
    .map(|r| r.unwrap())
    .collect::<Vec<_>>();
    numbers.sort();
    assert_eq!(numbers, vec![7, 8]);

    let current = count(
        &pool,
        "SELECT current_number FROM order_number_configs WHERE restaurant_id = $1",
        restaurant_id,
    )
    .await;
    assert_eq!(current, 9);
}

#[tokio::test]
async fn concurrent_submissions_never_share_a_number() {
    let Some(pool) = setup().await else { return };
    let (restaurant_id, name) = create_restaurant(&pool).await;
    let settings = LoyaltySettings::default();

    let handles = (0..10).map(|i| {
        let pool = pool.clone();
        let name = name.clone();
        tokio::spawn(async move {
            let device = format!("device-{}", i % 3);
            let order = order_request(&name, Some(&device)).validate(None).unwrap();
            submission::submit(&pool, &settings, &DisabledCheckout, order)
                .await
                .map(|s| s.order.order_number)
        })
    });
    let mut numbers: Vec<i64> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap().map_err(code).unwrap())
        .collect();
    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers.len(), 10);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM orders WHERE restaurant_id = $1", restaurant_id).await,
        10
    );
}

#[tokio::test]
async fn convert_then_revert_restores_gift() {
    let Some(pool) = setup().await else { return };
    let (restaurant_id, _) = create_restaurant(&pool).await;
    let gift_id = create_gift(&pool, restaurant_id, "device-a", GiftStatus::Unused).await;
    let gift = GiftRef {
        gift_id,
        device_id: "device-a",
        restaurant_id,
    };

    let converted = ledger::convert_gift(&pool, gift).await.unwrap();
    assert_eq!(converted.converted_points, 50);
    assert_eq!(converted.total_points, 50);
    assert_eq!(gift_status(&pool, gift_id).await, GiftStatus::Converted);
    assert_eq!(
        count(
            &pool,
            "SELECT COUNT(*) FROM points_transactions WHERE restaurant_id = $1 AND tx_type = 'CONVERT_GIFT'",
            restaurant_id
        )
        .await,
        1
    );

    let reverted = ledger::revert_conversion(&pool, gift).await.unwrap();
    assert_eq!(reverted, 50);
    assert_eq!(gift_status(&pool, gift_id).await, GiftStatus::Unused);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM points_transactions WHERE restaurant_id = $1", restaurant_id).await,
        0
    );
    assert_eq!(
        count(&pool, "SELECT total_points FROM visitors WHERE restaurant_id = $1", restaurant_id).await,
        0
    );
}

#[tokio::test]
async fn revert_floors_points_at_zero() {
    let Some(pool) = setup().await else { return };
    let (restaurant_id, _) = create_restaurant(&pool).await;
    let gift_id = create_gift(&pool, restaurant_id, "device-a", GiftStatus::Unused).await;
    let gift = GiftRef {
        gift_id,
        device_id: "device-a",
        restaurant_id,
    };
    ledger::convert_gift(&pool, gift).await.unwrap();
    ledger::redeem_points(&pool, restaurant_id, "device-a", 30)
        .await
        .unwrap();

    assert_eq!(ledger::revert_conversion(&pool, gift).await.unwrap(), 50);
    assert_eq!(
        count(&pool, "SELECT total_points FROM visitors WHERE restaurant_id = $1", restaurant_id).await,
        0
    );
}

#[tokio::test]
async fn revert_of_unconverted_gift_writes_nothing() {
    let Some(pool) = setup().await else { return };
    let (restaurant_id, _) = create_restaurant(&pool).await;
    let gift_id = create_gift(&pool, restaurant_id, "device-a", GiftStatus::Unused).await;

    let err = ledger::revert_conversion(
        &pool,
        GiftRef {
            gift_id,
            device_id: "device-a",
            restaurant_id,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(code(err), ErrorCode::GiftInvalidState);
    assert_eq!(gift_status(&pool, gift_id).await, GiftStatus::Unused);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM visitors WHERE restaurant_id = $1", restaurant_id).await,
        0
    );

    let err = ledger::revert_conversion(
        &pool,
        GiftRef {
            gift_id: gift_id + 1,
            device_id: "device-a",
            restaurant_id,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(code(err), ErrorCode::GiftNotFound);
}

#[tokio::test]
async fn redeem_rejects_overdraft() {
    let Some(pool) = setup().await else { return };
    let (restaurant_id, _) = create_restaurant(&pool).await;
    let gift_id = create_gift(&pool, restaurant_id, "device-a", GiftStatus::Unused).await;
    ledger::convert_gift(
        &pool,
        GiftRef {
            gift_id,
            device_id: "device-a",
            restaurant_id,
        },
    )
    .await
    .unwrap();

    let err = ledger::redeem_points(&pool, restaurant_id, "device-a", 51)
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::InsufficientPoints);

    let redeemed = ledger::redeem_points(&pool, restaurant_id, "device-a", 50)
        .await
        .unwrap();
    assert_eq!(redeemed.total_points, 0);
}

#[tokio::test]
async fn submission_consumes_gift() {
    let Some(pool) = setup().await else { return };
    let (restaurant_id, name) = create_restaurant(&pool).await;
    let gift_id = create_gift(&pool, restaurant_id, "device-a", GiftStatus::Unused).await;

    let mut req = order_request(&name, Some("device-a"));
    req.loyalty_gift_id = Some(gift_id);
    let order = req.validate(None).unwrap();
    let submitted = submission::submit(&pool, &LoyaltySettings::default(), &DisabledCheckout, order)
        .await
        .unwrap();
    assert_eq!(submitted.order.order_number, 1);
    assert!(!submitted.replayed);

    assert_eq!(gift_status(&pool, gift_id).await, GiftStatus::Consumed);
    let (order_id,): (Option<i64>,) = sqlx::query_as("SELECT order_id FROM gifts WHERE id = $1")
        .bind(gift_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(order_id, Some(submitted.order.order_id));
}

#[tokio::test]
async fn consumed_gift_rolls_back_submission() {
    let Some(pool) = setup().await else { return };
    let (restaurant_id, name) = create_restaurant(&pool).await;
    let gift_id = create_gift(&pool, restaurant_id, "device-a", GiftStatus::Consumed).await;

    let mut req = order_request(&name, Some("device-a"));
    req.loyalty_gift_id = Some(gift_id);
    let order = req.validate(None).unwrap();
    let err = submission::submit(&pool, &LoyaltySettings::default(), &DisabledCheckout, order)
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::OrderSubmissionFailed);

    for sql in [
        "SELECT COUNT(*) FROM orders WHERE restaurant_id = $1",
        "SELECT COUNT(*) FROM visitors WHERE restaurant_id = $1",
        "SELECT COUNT(*) FROM order_number_configs WHERE restaurant_id = $1",
    ] {
        assert_eq!(count(&pool, sql, restaurant_id).await, 0, "{sql}");
    }
}

#[tokio::test]
async fn idempotency_key_replays_first_submission() {
    let Some(pool) = setup().await else { return };
    let (restaurant_id, name) = create_restaurant(&pool).await;
    let settings = LoyaltySettings::default();

    let mut req = order_request(&name, Some("device-a"));
    req.idempotency_key = Some("retry-1".into());

    let first = submission::submit(&pool, &settings, &DisabledCheckout, req.clone().validate(None).unwrap())
        .await
        .unwrap();
    let second = submission::submit(&pool, &settings, &DisabledCheckout, req.validate(None).unwrap())
        .await
        .unwrap();

    assert!(!first.replayed);
    assert!(second.replayed);
    assert_eq!(first.order, second.order);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM orders WHERE restaurant_id = $1", restaurant_id).await,
        1
    );
    assert_eq!(
        count(
            &pool,
            "SELECT orders_in_current_session::BIGINT FROM visitors WHERE restaurant_id = $1",
            restaurant_id
        )
        .await,
        1
    );
}

#[tokio::test]
async fn idle_gap_opens_new_session() {
    let Some(pool) = setup().await else { return };
    let (restaurant_id, _) = create_restaurant(&pool).await;
    let idle = LoyaltySettings::default().session_idle_timeout_ms;
    let t0 = now_millis();

    let touch = |now: i64| {
        let pool = pool.clone();
        async move {
            let mut tx = pool.begin().await.unwrap();
            let v = session_tracker::touch(&mut *tx, restaurant_id, "device-a", now, idle)
                .await
                .unwrap();
            tx.commit().await.unwrap();
            v
        }
    };

    let first = touch(t0).await;
    let second = touch(t0 + 1_000).await;
    assert_eq!(second.orders_in_current_session, 2);
    assert_eq!(second.current_session_id, first.current_session_id);

    let third = touch(t0 + 1_000 + idle + 1).await;
    assert_eq!(third.orders_in_current_session, 1);
    assert_ne!(third.current_session_id, first.current_session_id);
}

#[tokio::test]
async fn status_tracks_visits_across_sessions() {
    let Some(pool) = setup().await else { return };
    let (_, name) = create_restaurant(&pool).await;
    let device = format!("device-{}", snowflake_id());

    let welcome = projector::loyalty_status(&pool, &LoyaltySettings::default(), &name, &device)
        .await
        .unwrap();
    assert_eq!(welcome.ui_state, UiState::Welcome);
    assert!(welcome.eligibility.can_receive_gift);

    let settings = LoyaltySettings {
        session_idle_timeout_ms: 60_000,
        ..LoyaltySettings::default()
    };
    let order = order_request(&name, Some(&device)).validate(None).unwrap();
    submission::submit(&pool, &settings, &DisabledCheckout, order)
        .await
        .unwrap();

    let status = projector::loyalty_status(&pool, &settings, &name, &device)
        .await
        .unwrap();
    assert_eq!(status.total_visits, 0);
    assert_eq!(status.orders_in_current_visit, 1);

    let expired = LoyaltySettings {
        session_idle_timeout_ms: -1,
        ..settings
    };
    let status = projector::loyalty_status(&pool, &expired, &name, &device)
        .await
        .unwrap();
    assert_eq!(status.orders_in_current_visit, 0);
    assert_eq!(status.total_visits, 1);
    assert_eq!(status.ui_state, UiState::GiftAvailable);

    let order = order_request(&name, Some(&device)).validate(None).unwrap();
    submission::submit(&pool, &expired, &DisabledCheckout, order)
        .await
        .unwrap();
    let status = projector::loyalty_status(&pool, &settings, &name, &device)
        .await
        .unwrap();
    assert_eq!(status.total_visits, 1);
    assert_eq!(status.ui_state, UiState::ActiveEarning);
}

struct FailingCheckout;

#[async_trait::async_trait]
impl CheckoutProvider for FailingCheckout {
    async fn create_checkout(&self, _req: &CheckoutRequest<'_>) -> Result<Option<Checkout>, BoxError> {
        Err("payment provider unavailable".into())
    }
}

struct FixedCheckout;

#[async_trait::async_trait]
impl CheckoutProvider for FixedCheckout {
    async fn create_checkout(&self, req: &CheckoutRequest<'_>) -> Result<Option<Checkout>, BoxError> {
        Ok(Some(Checkout {
            reference: format!("cs_test_{}", req.order_id),
            url: "https://checkout.example/pay".into(),
        }))
    }
}

#[tokio::test]
async fn checkout_failure_keeps_order() {
    let Some(pool) = setup().await else { return };
    let (restaurant_id, name) = create_restaurant(&pool).await;

    let mut req = order_request(&name, None);
    req.payment_method = Some(PaymentMethod::Card);
    let failing: Arc<dyn CheckoutProvider> = Arc::new(FailingCheckout);
    let submitted = submission::submit(
        &pool,
        &LoyaltySettings::default(),
        failing.as_ref(),
        req.clone().validate(None).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(submitted.order.checkout_url, None);

    let submitted = submission::submit(
        &pool,
        &LoyaltySettings::default(),
        &FixedCheckout,
        req.validate(None).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(
        submitted.order.checkout_url.as_deref(),
        Some("https://checkout.example/pay")
    );
    assert_eq!(
        count(
            &pool,
            "SELECT COUNT(*) FROM orders WHERE restaurant_id = $1 AND checkout_reference IS NOT NULL",
            restaurant_id
        )
        .await,
        1
    );
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM orders WHERE restaurant_id = $1", restaurant_id).await,
        2
    );
}
