//! Loyalty status projection
//!
//! Turns a visitor row, its gifts and its order history into the snapshot
//! polled by ordering clients. No I/O here; the caller gathers the inputs.

use rust_decimal::Decimal;
use shared::models::{
    Gift, GiftStatus, LoyaltyConfig, LoyaltyEligibility, LoyaltyStatus, UiState, Visitor,
};

use super::session;

/// Order aggregates for one (restaurant, device)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderHistory {
    /// Distinct session ids among non-cancelled orders
    pub session_ids: Vec<String>,
    pub completed_count: i64,
    pub completed_spend: Decimal,
    pub active_count: i64,
    pub active_spend: Decimal,
}

/// Completed visits, excluding the open session once it produced an order
pub fn count_visits(history: &OrderHistory, current_session: Option<&str>, in_session: bool) -> i64 {
    let visits = history.session_ids.len() as i64;
    let open_counted = in_session
        && current_session.is_some_and(|id| history.session_ids.iter().any(|s| s == id));
    if open_counted {
        (visits - 1).max(0)
    } else {
        visits
    }
}

/// UI label from visits, open-session activity and gift availability
pub fn classify(total_visits: i64, in_session: bool, has_active_gifts: bool) -> UiState {
    match total_visits {
        0 => UiState::Welcome,
        1 if in_session => UiState::ActiveEarning,
        1 => UiState::GiftAvailable,
        _ if in_session || !has_active_gifts => UiState::PointsProgress,
        _ => UiState::GiftAvailable,
    }
}

/// Eligibility flags
///
/// Exactly one completed order does not qualify for a new gift.
pub fn eligibility(
    config: &LoyaltyConfig,
    completed_orders: i64,
    has_active_gifts: bool,
) -> LoyaltyEligibility {
    LoyaltyEligibility {
        can_earn_points: config.points_enabled,
        can_receive_gift: completed_orders == 0 || completed_orders >= 2,
        can_convert_gift: has_active_gifts,
    }
}

/// Build the status snapshot
pub fn project(
    visitor: Option<&Visitor>,
    gifts: Vec<Gift>,
    history: &OrderHistory,
    config: &LoyaltyConfig,
    now: i64,
    idle_timeout_ms: i64,
) -> LoyaltyStatus {
    let orders_in_current_visit = visitor
        .map(|v| session::orders_in_session(v, now, idle_timeout_ms))
        .unwrap_or(0);
    let in_session = orders_in_current_visit > 0;
    let current_session = visitor.and_then(|v| v.current_session_id.as_deref());

    let (active_gifts, converted_gifts): (Vec<Gift>, Vec<Gift>) = gifts
        .into_iter()
        .filter(|g| g.status != GiftStatus::Consumed)
        .partition(|g| g.status == GiftStatus::Unused);
    let has_active_gifts = !active_gifts.is_empty();

    let total_visits = count_visits(history, current_session, in_session);

    LoyaltyStatus {
        total_points: visitor.map(|v| v.total_points).unwrap_or(0),
        total_visits,
        orders_in_current_visit,
        active_gifts,
        converted_gifts,
        completed_orders: history.completed_count,
        active_orders: history.active_count,
        total_spending: history.completed_spend,
        total_potential_spending: history.completed_spend + history.active_spend,
        ui_state: classify(total_visits, in_session, has_active_gifts),
        eligibility: eligibility(config, history.completed_count, has_active_gifts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::GiftType;

    const IDLE: i64 = 60_000;

    fn visitor(session: &str, orders: i32, last_visit_at: i64) -> Visitor {
        Visitor {
            restaurant_id: 1,
            device_id: "device-a".into(),
            total_points: 120,
            orders_in_current_session: orders,
            last_visit_at,
            current_session_id: Some(session.into()),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn history(sessions: &[&str]) -> OrderHistory {
        OrderHistory {
            session_ids: sessions.iter().map(|s| s.to_string()).collect(),
            ..OrderHistory::default()
        }
    }

    fn gift(id: i64, status: GiftStatus) -> Gift {
        Gift {
            id,
            restaurant_id: 1,
            device_id: "device-a".into(),
            gift_type: GiftType::FixedValue,
            euro_value: Some(Decimal::new(500, 2)),
            percentage_value: None,
            status,
            order_id: None,
            created_at: 0,
        }
    }

    #[test]
    fn test_classify_table() {
        assert_eq!(classify(0, false, false), UiState::Welcome);
        assert_eq!(classify(0, true, true), UiState::Welcome);
        assert_eq!(classify(1, true, false), UiState::ActiveEarning);
        assert_eq!(classify(1, false, false), UiState::GiftAvailable);
        assert_eq!(classify(2, true, true), UiState::PointsProgress);
        assert_eq!(classify(2, false, false), UiState::PointsProgress);
        assert_eq!(classify(5, false, true), UiState::GiftAvailable);
    }

    #[test]
    fn test_can_receive_gift_skips_single_completed_order() {
        let config = LoyaltyConfig::default();
        assert!(eligibility(&config, 0, false).can_receive_gift);
        assert!(!eligibility(&config, 1, false).can_receive_gift);
        assert!(eligibility(&config, 2, false).can_receive_gift);
        assert!(eligibility(&config, 2, true).can_convert_gift);
    }

    #[test]
    fn test_new_visitor_is_welcome() {
        let status = project(None, vec![], &OrderHistory::default(), &LoyaltyConfig::default(), 0, IDLE);
        assert_eq!(status.ui_state, UiState::Welcome);
        assert_eq!(status.total_visits, 0);
        assert_eq!(status.total_points, 0);
        assert!(status.eligibility.can_receive_gift);
    }

    #[test]
    fn test_open_session_is_not_a_visit_yet() {
        let v = visitor("s-1", 1, 1_000);
        let status = project(Some(&v), vec![], &history(&["s-1"]), &LoyaltyConfig::default(), 2_000, IDLE);
        assert_eq!(status.total_visits, 0);
        assert_eq!(status.orders_in_current_visit, 1);
        assert_eq!(status.ui_state, UiState::Welcome);
    }

    #[test]
    fn test_second_session_counts_first() {
        let v = visitor("s-2", 1, 100_000);
        let status = project(Some(&v), vec![], &history(&["s-1", "s-2"]), &LoyaltyConfig::default(), 100_500, IDLE);
        assert_eq!(status.total_visits, 1);
        assert_eq!(status.ui_state, UiState::ActiveEarning);
    }

    #[test]
    fn test_expired_session_counts_as_visit() {
        let v = visitor("s-1", 1, 1_000);
        let status = project(Some(&v), vec![], &history(&["s-1"]), &LoyaltyConfig::default(), 70_000, IDLE);
        assert_eq!(status.orders_in_current_visit, 0);
        assert_eq!(status.total_visits, 1);
        assert_eq!(status.ui_state, UiState::GiftAvailable);
    }

    #[test]
    fn test_gifts_split_by_status() {
        let gifts = vec![
            gift(1, GiftStatus::Unused),
            gift(2, GiftStatus::Converted),
            gift(3, GiftStatus::Consumed),
        ];
        let status = project(None, gifts, &OrderHistory::default(), &LoyaltyConfig::default(), 0, IDLE);
        assert_eq!(status.active_gifts.len(), 1);
        assert_eq!(status.converted_gifts.len(), 1);
        assert!(status.eligibility.can_convert_gift);
    }

    #[test]
    fn test_spending_totals() {
        let h = OrderHistory {
            completed_count: 2,
            completed_spend: Decimal::new(3000, 2),
            active_count: 1,
            active_spend: Decimal::new(1250, 2),
            ..history(&["s-1", "s-2", "s-3"])
        };
        let status = project(None, vec![], &h, &LoyaltyConfig::default(), 0, IDLE);
        assert_eq!(status.total_spending, Decimal::new(3000, 2));
        assert_eq!(status.total_potential_spending, Decimal::new(4250, 2));
        assert_eq!(status.active_orders, 1);
        assert_eq!(status.total_visits, 3);
        assert_eq!(status.ui_state, UiState::PointsProgress);
    }
}
