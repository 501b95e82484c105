//! Order number allocation
//!
//! Pure counter arithmetic. The caller holds the config row lock and persists
//! the returned config inside the same transaction.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use shared::error::{AppError, ErrorCode};
use shared::models::{OrderNumberConfig, ResetPeriod};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocatorError {
    #[error("order number counter overflow at {0}")]
    CounterOverflow(i64),
    #[error("unknown timezone: {0}")]
    InvalidTimezone(String),
}

impl From<AllocatorError> for AppError {
    fn from(e: AllocatorError) -> Self {
        match &e {
            AllocatorError::CounterOverflow(at) => {
                AppError::with_message(ErrorCode::ValueOutOfRange, e.to_string())
                    .with_detail("currentNumber", *at)
            }
            AllocatorError::InvalidTimezone(tz) => {
                AppError::validation(e.to_string()).with_detail("timezone", tz.as_str())
            }
        }
    }
}

/// Result of one allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub order_number: i64,
    /// Config to persist under the row lock
    pub config: OrderNumberConfig,
    pub reset: bool,
}

/// Most recent `start_day` (0 = Sunday) on or before `today`
fn week_start(today: NaiveDate, start_day: i16) -> NaiveDate {
    let weekday = today.weekday().num_days_from_sunday() as i64;
    let back = (weekday - i64::from(start_day)).rem_euclid(7) as u64;
    today
        .checked_sub_days(Days::new(back))
        .unwrap_or(NaiveDate::MIN)
}

/// Whether `today` lies in a later reset epoch than `last_reset`
pub fn crosses_boundary(
    period: ResetPeriod,
    weekly_start_day: i16,
    last_reset: Option<NaiveDate>,
    today: NaiveDate,
) -> bool {
    if period == ResetPeriod::Never {
        return false;
    }
    let Some(last) = last_reset else {
        return true;
    };
    match period {
        ResetPeriod::Never => false,
        ResetPeriod::Daily => last != today,
        ResetPeriod::Weekly => last < week_start(today, weekly_start_day),
        ResetPeriod::Monthly => (last.year(), last.month()) != (today.year(), today.month()),
    }
}

/// Hand out the next order number for `today`
pub fn allocate(
    config: &OrderNumberConfig,
    today: NaiveDate,
) -> Result<Allocation, AllocatorError> {
    let mut next = config.clone();
    let reset = crosses_boundary(
        config.reset_period,
        config.weekly_start_day,
        config.last_reset_date,
        today,
    );

    let order_number = if reset {
        next.last_reset_date = Some(today);
        config.starting_number
    } else {
        config.current_number
    };
    next.current_number = order_number
        .checked_add(1)
        .ok_or(AllocatorError::CounterOverflow(order_number))?;

    Ok(Allocation {
        order_number,
        config: next,
        reset,
    })
}

/// Calendar date of `now` in the restaurant's timezone
pub fn business_date(now: DateTime<Utc>, timezone: &str) -> Result<NaiveDate, AllocatorError> {
    let tz: Tz = timezone
        .parse()
        .map_err(|_| AllocatorError::InvalidTimezone(timezone.to_string()))?;
    Ok(now.with_timezone(&tz).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config(period: ResetPeriod, current: i64, last: Option<NaiveDate>) -> OrderNumberConfig {
        OrderNumberConfig {
            starting_number: 1,
            current_number: current,
            reset_period: period,
            last_reset_date: last,
            ..OrderNumberConfig::new(1)
        }
    }

    #[test]
    fn test_never_keeps_counting() {
        let cfg = config(ResetPeriod::Never, 7, None);
        let first = allocate(&cfg, date(2025, 3, 1)).unwrap();
        assert_eq!(first.order_number, 7);
        assert!(!first.reset);
        let second = allocate(&first.config, date(2030, 1, 1)).unwrap();
        assert_eq!(second.order_number, 8);
        assert_eq!(second.config.current_number, 9);
        assert_eq!(second.config.last_reset_date, None);
    }

    #[test]
    fn test_daily_resets_on_new_date() {
        let cfg = config(ResetPeriod::Daily, 42, Some(date(2025, 3, 1)));
        let same_day = allocate(&cfg, date(2025, 3, 1)).unwrap();
        assert_eq!(same_day.order_number, 42);

        let next_day = allocate(&cfg, date(2025, 3, 2)).unwrap();
        assert!(next_day.reset);
        assert_eq!(next_day.order_number, 1);
        assert_eq!(next_day.config.current_number, 2);
        assert_eq!(next_day.config.last_reset_date, Some(date(2025, 3, 2)));
    }

    #[test]
    fn test_monthly_compares_month_and_year() {
        let cfg = config(ResetPeriod::Monthly, 10, Some(date(2025, 3, 1)));
        assert!(!allocate(&cfg, date(2025, 3, 31)).unwrap().reset);
        assert!(allocate(&cfg, date(2025, 4, 1)).unwrap().reset);
        assert!(allocate(&cfg, date(2026, 3, 15)).unwrap().reset);
    }

    #[test]
    fn test_weekly_resets_after_start_day() {
        // 2025-03-03 is a Monday
        let mut cfg = config(ResetPeriod::Weekly, 5, Some(date(2025, 3, 3)));
        cfg.weekly_start_day = 1;
        assert!(!allocate(&cfg, date(2025, 3, 9)).unwrap().reset);
        assert!(allocate(&cfg, date(2025, 3, 10)).unwrap().reset);
    }

    #[test]
    fn test_weekly_last_reset_mid_week() {
        // last reset on Wednesday, next Monday crosses, Sunday before does not
        let mut cfg = config(ResetPeriod::Weekly, 5, Some(date(2025, 3, 5)));
        cfg.weekly_start_day = 1;
        assert!(!allocate(&cfg, date(2025, 3, 9)).unwrap().reset);
        assert!(allocate(&cfg, date(2025, 3, 10)).unwrap().reset);
    }

    #[test]
    fn test_weekly_sunday_start() {
        // 2025-03-09 is a Sunday
        let mut cfg = config(ResetPeriod::Weekly, 5, Some(date(2025, 3, 8)));
        cfg.weekly_start_day = 0;
        assert!(allocate(&cfg, date(2025, 3, 9)).unwrap().reset);
    }

    #[test]
    fn test_missing_last_reset_starts_new_epoch() {
        let cfg = config(ResetPeriod::Daily, 99, None);
        let alloc = allocate(&cfg, date(2025, 3, 1)).unwrap();
        assert!(alloc.reset);
        assert_eq!(alloc.order_number, 1);
    }

    #[test]
    fn test_counter_overflow() {
        let cfg = config(ResetPeriod::Never, i64::MAX, None);
        assert_eq!(
            allocate(&cfg, date(2025, 3, 1)),
            Err(AllocatorError::CounterOverflow(i64::MAX))
        );
    }

    #[test]
    fn test_allocator_errors_carry_codes() {
        let err = AppError::from(AllocatorError::CounterOverflow(i64::MAX));
        assert_eq!(err.code, ErrorCode::ValueOutOfRange);
        assert_eq!(err.details.unwrap()["currentNumber"], i64::MAX);

        let err = AppError::from(AllocatorError::InvalidTimezone("Mars/Olympus".into()));
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_business_date_uses_timezone() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 23, 30, 0).unwrap();
        assert_eq!(business_date(now, "UTC").unwrap(), date(2025, 3, 1));
        assert_eq!(business_date(now, "Europe/Madrid").unwrap(), date(2025, 3, 2));
        assert!(business_date(now, "Mars/Olympus").is_err());
    }
}
