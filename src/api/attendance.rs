use crate::api::error::ApiError;
use crate::auth::auth::AuthUser;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use crate::models::EmployeeSummary;
use crate::accounting::{self, month_window};
use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct MonthQuery {
    /// 1-based calendar month; both month and year must be given to filter
    pub month: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminAttendanceQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<i64>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = 7)]
    pub user_id: i64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "2026-01-01T09:00:00Z", format = "date-time", value_type = Option<String>)]
    pub clock_in_time: Option<DateTime<Utc>>,
    #[schema(example = "2026-01-01T17:30:00Z", format = "date-time", value_type = Option<String>)]
    pub clock_out_time: Option<DateTime<Utc>>,
    /// Derived, never stored: clockOutTime - clockInTime
    #[schema(example = 510)]
    pub duration_minutes: Option<i64>,
    pub status: AttendanceStatus,
}

impl From<AttendanceRecord> for AttendanceResponse {
    fn from(record: AttendanceRecord) -> Self {
        Self {
            duration_minutes: record.duration_minutes(),
            status: record.status(),
            id: record.id,
            user_id: record.user_id,
            date: record.date,
            clock_in_time: record.clock_in,
            clock_out_time: record.clock_out,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UserIdentity {
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(rename = "employeeId")]
    pub employee_code: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminAttendanceEntry {
    pub id: i64,
    pub user_id: i64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub clock_in_time: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub clock_out_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub status: AttendanceStatus,
    pub user: UserIdentity,
}

#[derive(sqlx::FromRow)]
struct AttendanceWithUserRow {
    id: i64,
    user_id: i64,
    date: NaiveDate,
    clock_in: Option<DateTime<Utc>>,
    clock_out: Option<DateTime<Utc>>,
    name: String,
    email: String,
    role: String,
    employee_code: String,
}

impl From<AttendanceWithUserRow> for AdminAttendanceEntry {
    fn from(row: AttendanceWithUserRow) -> Self {
        let record = AttendanceRecord {
            id: row.id,
            user_id: row.user_id,
            date: row.date,
            clock_in: row.clock_in,
            clock_out: row.clock_out,
        };
        Self {
            duration_minutes: record.duration_minutes(),
            status: record.status(),
            id: record.id,
            user_id: record.user_id,
            date: record.date,
            clock_in_time: record.clock_in,
            clock_out_time: record.clock_out,
            user: UserIdentity {
                name: row.name,
                email: row.email,
                role: row.role,
                employee_code: row.employee_code,
            },
        }
    }
}

// Helper enum for typed SQLx binding
enum FilterValue {
    I64(i64),
    Date(NaiveDate),
}

fn window_from_query(month: Option<u32>, year: Option<i32>) -> Result<Option<(NaiveDate, NaiveDate)>, ApiError> {
    match (month, year) {
        (Some(m), Some(y)) => month_window(y, m)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest("Invalid month/year".into())),
        _ => Ok(None),
    }
}

async fn fetch_today(
    user_id: i64,
    today: NaiveDate,
    pool: &SqlitePool,
) -> Result<AttendanceRecord, ApiError> {
    sqlx::query_as::<_, AttendanceRecord>(
        "SELECT id, user_id, date, clock_in, clock_out FROM attendance WHERE user_id = ? AND date = ?",
    )
    .bind(user_id)
    .bind(today)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id, "Failed to fetch today's attendance");
        ApiError::Internal
    })
}

/// Clock-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/clock-in",
    responses(
        (status = 201, description = "Clocked in", body = AttendanceResponse),
        (status = 400, description = "Already clocked in today"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn clock_in(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let now = Utc::now();
    let today = accounting::utc_today(now);

    // Single conditional upsert: two concurrent clock-ins race on the
    // (user_id, date) uniqueness constraint and the loser changes no row.
    let result = sqlx::query(
        r#"
        INSERT INTO attendance (user_id, date, clock_in)
        VALUES (?, ?, ?)
        ON CONFLICT (user_id, date) DO UPDATE SET clock_in = excluded.clock_in
        WHERE attendance.clock_in IS NULL
        "#,
    )
    .bind(auth.user_id)
    .bind(today)
    .bind(now)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Clock-in failed");
        ApiError::Internal
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest("Already clocked in today".into()));
    }

    let record = fetch_today(auth.user_id, today, pool.get_ref()).await?;
    Ok(HttpResponse::Created().json(AttendanceResponse::from(record)))
}

/// Clock-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/clock-out",
    responses(
        (status = 200, description = "Clocked out", body = AttendanceResponse),
        (status = 400, description = "No open clock-in found for today"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn clock_out(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let now = Utc::now();
    let today = accounting::utc_today(now);

    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET clock_out = ?
        WHERE user_id = ?
          AND date = ?
          AND clock_in IS NOT NULL
          AND clock_out IS NULL
        "#,
    )
    .bind(now)
    .bind(auth.user_id)
    .bind(today)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Clock-out failed");
        ApiError::Internal
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::BadRequest("No open clock-in found".into()));
    }

    let record = fetch_today(auth.user_id, today, pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(AttendanceResponse::from(record)))
}

/// Own attendance log, optionally windowed to one calendar month
#[utoipa::path(
    get,
    path = "/api/attendance/me",
    params(MonthQuery),
    responses(
        (status = 200, description = "Own attendance records, newest first", body = [AttendanceResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_attendance(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, ApiError> {
    let window = window_from_query(query.month, query.year)?;

    let mut sql = String::from(
        "SELECT id, user_id, date, clock_in, clock_out FROM attendance WHERE user_id = ?",
    );
    if window.is_some() {
        sql.push_str(" AND date >= ? AND date < ?");
    }
    sql.push_str(" ORDER BY date DESC");

    let mut q = sqlx::query_as::<_, AttendanceRecord>(&sql).bind(auth.user_id);
    if let Some((start, end)) = window {
        q = q.bind(start).bind(end);
    }

    let records = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to fetch attendance");
        ApiError::Internal
    })?;

    let response: Vec<AttendanceResponse> =
        records.into_iter().map(AttendanceResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// Org-wide attendance log with user identity joined (admin)
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AdminAttendanceQuery),
    responses(
        (status = 200, description = "Attendance records with user identity", body = [AdminAttendanceEntry]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn all_attendance(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<AdminAttendanceQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let window = window_from_query(query.month, query.year)?;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(user_id) = query.user_id {
        where_sql.push_str(" AND a.user_id = ?");
        args.push(FilterValue::I64(user_id));
    }

    if let Some((start, end)) = window {
        where_sql.push_str(" AND a.date >= ? AND a.date < ?");
        args.push(FilterValue::Date(start));
        args.push(FilterValue::Date(end));
    }

    let sql = format!(
        r#"
        SELECT a.id, a.user_id, a.date, a.clock_in, a.clock_out,
               u.name, u.email, u.role, u.employee_code
        FROM attendance a
        JOIN users u ON u.id = a.user_id
        {}
        ORDER BY a.date DESC
        "#,
        where_sql
    );

    let mut q = sqlx::query_as::<_, AttendanceWithUserRow>(&sql);
    for arg in args {
        q = match arg {
            FilterValue::I64(v) => q.bind(v),
            FilterValue::Date(d) => q.bind(d),
        };
    }

    let rows = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch attendance list");
        ApiError::Internal
    })?;

    let response: Vec<AdminAttendanceEntry> =
        rows.into_iter().map(AdminAttendanceEntry::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// Employee directory (admin)
#[utoipa::path(
    get,
    path = "/api/attendance/employees",
    responses(
        (status = 200, description = "All employee users", body = [EmployeeSummary]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn employees(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let employees = sqlx::query_as::<_, EmployeeSummary>(
        r#"
        SELECT id, name, email, employee_code
        FROM users
        WHERE role = 'employee'
        ORDER BY employee_code
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch employee directory");
        ApiError::Internal
    })?;

    Ok(HttpResponse::Ok().json(employees))
}
