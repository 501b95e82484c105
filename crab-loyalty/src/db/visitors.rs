//! Visitor rows

use shared::models::Visitor;
use sqlx::{PgConnection, PgPool};

const COLUMNS: &str = "restaurant_id, device_id, total_points, orders_in_current_session, \
                       last_visit_at, current_session_id, created_at, updated_at";

pub async fn find(
    pool: &PgPool,
    restaurant_id: i64,
    device_id: &str,
) -> Result<Option<Visitor>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM visitors WHERE restaurant_id = $1 AND device_id = $2"
    ))
    .bind(restaurant_id)
    .bind(device_id)
    .fetch_optional(pool)
    .await
}

/// Lock the visitor row for the rest of the transaction
pub async fn lock(
    conn: &mut PgConnection,
    restaurant_id: i64,
    device_id: &str,
) -> Result<Option<Visitor>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM visitors WHERE restaurant_id = $1 AND device_id = $2 FOR UPDATE"
    ))
    .bind(restaurant_id)
    .bind(device_id)
    .fetch_optional(conn)
    .await
}

/// Insert a visitor unless one already exists; returns the row only when inserted
pub async fn insert_if_absent(
    conn: &mut PgConnection,
    visitor: &Visitor,
) -> Result<Option<Visitor>, sqlx::Error> {
    sqlx::query_as(&format!(
        "INSERT INTO visitors ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         ON CONFLICT (restaurant_id, device_id) DO NOTHING
         RETURNING {COLUMNS}"
    ))
    .bind(visitor.restaurant_id)
    .bind(&visitor.device_id)
    .bind(visitor.total_points)
    .bind(visitor.orders_in_current_session)
    .bind(visitor.last_visit_at)
    .bind(&visitor.current_session_id)
    .bind(visitor.created_at)
    .bind(visitor.updated_at)
    .fetch_optional(conn)
    .await
}

/// Persist session fields after a `touch`
pub async fn update_session(conn: &mut PgConnection, visitor: &Visitor) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE visitors
         SET orders_in_current_session = $3, last_visit_at = $4,
             current_session_id = $5, updated_at = $6
         WHERE restaurant_id = $1 AND device_id = $2",
    )
    .bind(visitor.restaurant_id)
    .bind(&visitor.device_id)
    .bind(visitor.orders_in_current_session)
    .bind(visitor.last_visit_at)
    .bind(&visitor.current_session_id)
    .bind(visitor.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Adjust the balance by `delta`, floored at zero; returns the new balance
/// (`None` when the visitor row does not exist)
pub async fn add_points(
    conn: &mut PgConnection,
    restaurant_id: i64,
    device_id: &str,
    delta: i64,
    now: i64,
) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "UPDATE visitors
         SET total_points = GREATEST(total_points + $3, 0), updated_at = $4
         WHERE restaurant_id = $1 AND device_id = $2
         RETURNING total_points",
    )
    .bind(restaurant_id)
    .bind(device_id)
    .bind(delta)
    .bind(now)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|(total,)| total))
}

/// Create a points-only visitor row if missing (no session is opened)
pub async fn ensure(
    conn: &mut PgConnection,
    restaurant_id: i64,
    device_id: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO visitors (restaurant_id, device_id, total_points, orders_in_current_session,
                               last_visit_at, current_session_id, created_at, updated_at)
         VALUES ($1, $2, 0, 0, $3, NULL, $3, $3)
         ON CONFLICT (restaurant_id, device_id) DO NOTHING",
    )
    .bind(restaurant_id)
    .bind(device_id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}
