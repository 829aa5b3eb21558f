use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::accounting;

/// One row per user per UTC calendar day. A row is created on the first
/// clock-in of the day and closed by the clock-out; it is never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub clock_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub enum AttendanceStatus {
    Open,
    Complete,
    None,
}

impl AttendanceRecord {
    /// Derived from the two timestamps, never stored.
    pub fn status(&self) -> AttendanceStatus {
        match (self.clock_in, self.clock_out) {
            (Some(_), Some(_)) => AttendanceStatus::Complete,
            (Some(_), None) => AttendanceStatus::Open,
            _ => AttendanceStatus::None,
        }
    }

    pub fn duration_minutes(&self) -> Option<i64> {
        Some(accounting::duration_minutes(self.clock_in?, self.clock_out?))
    }
}
