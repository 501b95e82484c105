//! Visit session state machine
//!
//! A session is a run of orders from one visitor closed by an idle gap. Expiry
//! is evaluated lazily: on `touch` (write path) and by the status projection
//! (read path), never by a background sweep.

use shared::models::Visitor;

/// New visit session id
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Whether the visitor's session would be considered closed at `now`
pub fn is_expired(visitor: &Visitor, now: i64, idle_timeout_ms: i64) -> bool {
    visitor.current_session_id.is_none() || now - visitor.last_visit_at > idle_timeout_ms
}

/// Orders in the current session as seen at `now`, without mutating the row
pub fn orders_in_session(visitor: &Visitor, now: i64, idle_timeout_ms: i64) -> i32 {
    if is_expired(visitor, now, idle_timeout_ms) {
        0
    } else {
        visitor.orders_in_current_session
    }
}

/// Outcome of one `touch`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touch {
    /// A new session was opened for this order
    Opened,
    /// The order joined the open session
    Continued,
}

/// Apply one order to an existing visitor row
///
/// `now` may predate the stored visit when the caller read the clock before
/// waiting on the row lock; the visit clock never moves backwards.
pub fn touch(visitor: &mut Visitor, now: i64, idle_timeout_ms: i64) -> Touch {
    let now = now.max(visitor.last_visit_at);
    let outcome = if is_expired(visitor, now, idle_timeout_ms) {
        visitor.current_session_id = Some(new_session_id());
        visitor.orders_in_current_session = 1;
        Touch::Opened
    } else {
        visitor.orders_in_current_session = visitor.orders_in_current_session.saturating_add(1);
        Touch::Continued
    };
    visitor.last_visit_at = now;
    visitor.updated_at = now;
    outcome
}

/// Visitor row for a device ordering at a restaurant for the first time
pub fn first_visit(restaurant_id: i64, device_id: &str, now: i64) -> Visitor {
    Visitor {
        restaurant_id,
        device_id: device_id.to_string(),
        total_points: 0,
        orders_in_current_session: 1,
        last_visit_at: now,
        current_session_id: Some(new_session_id()),
        created_at: now,
        updated_at: now,
    }
}
