//! Pure business rules shared by the attendance and leave endpoints:
//! inclusive day spans, calendar-month windows, the monthly leave quota
//! and the values derived from ledger rows (duration, balance, presence).
//!
//! Nothing in here touches storage. Derived values are recomputed from the
//! ledgers on every request and are never persisted.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use std::collections::HashSet;

/// Maximum leave-days an employee may have Pending + Approved within one
/// calendar month.
pub const MAX_LEAVE_DAYS_PER_MONTH: i64 = 5;

/// Inclusive day count of a leave range. Symmetric in its arguments;
/// a single-day leave counts as 1.
pub fn leave_day_span(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days().abs() + 1
}

/// UTC calendar-month window as `[first-of-month, first-of-next-month)`.
/// `month` is 1-based; returns `None` for an out-of-range month.
pub fn month_window(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, end))
}

/// Month window containing `day`. The leave quota is charged against the
/// window of a request's *start* date only, so a leave spanning a month
/// boundary is never charged to the following month.
pub fn month_window_of(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    month_window(day.year(), day.month()).expect("a valid date has a valid month window")
}

/// Sum of inclusive day spans over a set of leave ranges.
pub fn total_leave_days(ranges: &[(NaiveDate, NaiveDate)]) -> i64 {
    ranges.iter().map(|(s, e)| leave_day_span(*s, *e)).sum()
}

/// Whether a new request of `requested` days fits on top of `used`
/// Pending + Approved days in the same month.
pub fn quota_exceeded(used: i64, requested: i64) -> bool {
    used + requested > MAX_LEAVE_DAYS_PER_MONTH
}

/// Remaining leave balance for the month, floored at zero.
pub fn leave_balance(days_used: i64) -> i64 {
    (MAX_LEAVE_DAYS_PER_MONTH - days_used).max(0)
}

/// Minutes worked in a closed attendance session.
pub fn duration_minutes(clock_in: DateTime<Utc>, clock_out: DateTime<Utc>) -> i64 {
    (clock_out - clock_in).num_minutes()
}

/// UTC calendar day of an instant. Clock-in/out and the daily snapshot
/// all normalize to this.
pub fn utc_today(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// Employees with no clock-in on the day, preserving input order.
/// Together with the present set this partitions the employee set.
pub fn absentees<T>(all: Vec<T>, present: &HashSet<i64>, id: impl Fn(&T) -> i64) -> Vec<T> {
    all.into_iter().filter(|e| !present.contains(&id(e))).collect()
}
