//! Visit session tracking on the write path

use shared::models::Visitor;
use sqlx::PgConnection;

use crate::db::visitors;
use crate::error::ServiceResult;
use crate::loyalty::session;

/// Record one order for (restaurant, device), opening a new session when needed
///
/// Must run inside the submission transaction; the visitor row stays locked
/// until it commits.
pub async fn touch(
    conn: &mut PgConnection,
    restaurant_id: i64,
    device_id: &str,
    now: i64,
    idle_timeout_ms: i64,
) -> ServiceResult<Visitor> {
    let fresh = session::first_visit(restaurant_id, device_id, now);
    if let Some(created) = visitors::insert_if_absent(&mut *conn, &fresh).await? {
        tracing::debug!(restaurant_id, device_id, "First visit, session opened");
        return Ok(created);
    }

    let mut visitor = visitors::lock(&mut *conn, restaurant_id, device_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    let outcome = session::touch(&mut visitor, now, idle_timeout_ms);
    visitors::update_session(conn, &visitor).await?;

    tracing::debug!(
        restaurant_id,
        device_id,
        ?outcome,
        orders = visitor.orders_in_current_session,
        "Visit session touched"
    );
    Ok(visitor)
}
