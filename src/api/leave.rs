use crate::accounting;
use crate::api::attendance::UserIdentity;
use crate::api::error::ApiError;
use crate::auth::auth::AuthUser;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use utoipa::{IntoParams, ToSchema};

const MAX_REASON_LEN: usize = 500;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyLeave {
    #[schema(example = "2026-01-10", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-12", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family function")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct DecideLeave {
    #[schema(example = "Approved")]
    pub status: LeaveStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LeaveFilter {
    /// Filter by leave status (Pending, Approved, Rejected)
    pub status: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = 7)]
    pub user_id: i64,
    #[schema(example = "2026-01-10", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-12", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub reason: String,
    #[schema(example = "Pending")]
    pub status: String,
    /// Derived inclusive day count, never stored
    #[schema(example = 3)]
    pub days_requested: i64,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<LeaveRequest> for LeaveResponse {
    fn from(leave: LeaveRequest) -> Self {
        Self {
            days_requested: accounting::leave_day_span(leave.start_date, leave.end_date),
            id: leave.id,
            user_id: leave.user_id,
            start_date: leave.start_date,
            end_date: leave.end_date,
            reason: leave.reason,
            status: leave.status,
            created_at: leave.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminLeaveEntry {
    pub id: i64,
    pub user_id: i64,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub reason: String,
    pub status: String,
    pub days_requested: i64,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    pub user: UserIdentity,
}

#[derive(sqlx::FromRow)]
struct LeaveWithUserRow {
    id: i64,
    user_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: String,
    status: String,
    created_at: DateTime<Utc>,
    name: String,
    email: String,
    role: String,
    employee_code: String,
}

impl From<LeaveWithUserRow> for AdminLeaveEntry {
    fn from(row: LeaveWithUserRow) -> Self {
        Self {
            days_requested: accounting::leave_day_span(row.start_date, row.end_date),
            id: row.id,
            user_id: row.user_id,
            start_date: row.start_date,
            end_date: row.end_date,
            reason: row.reason,
            status: row.status,
            created_at: row.created_at,
            user: UserIdentity {
                name: row.name,
                email: row.email,
                role: row.role,
                employee_code: row.employee_code,
            },
        }
    }
}

/// Pending + Approved day usage in the month containing `month_day`.
/// The window is anchored on request *start* dates, so a leave spanning
/// a month boundary charges only its start month.
async fn month_usage(
    user_id: i64,
    month_day: NaiveDate,
    pool: &SqlitePool,
) -> Result<i64, ApiError> {
    let (month_start, month_end) = accounting::month_window_of(month_day);

    let ranges: Vec<(NaiveDate, NaiveDate)> = sqlx::query_as(
        r#"
        SELECT start_date, end_date
        FROM leave_requests
        WHERE user_id = ?
          AND status IN ('Pending', 'Approved')
          AND start_date >= ?
          AND start_date < ?
        "#,
    )
    .bind(user_id)
    .bind(month_start)
    .bind(month_end)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id, "Failed to sum monthly leave usage");
        ApiError::Internal
    })?;

    Ok(accounting::total_leave_days(&ranges))
}

/// Apply for leave
#[utoipa::path(
    post,
    path = "/api/leaves",
    request_body = ApplyLeave,
    responses(
        (status = 201, description = "Leave applied; body carries the updated balance"),
        (status = 400, description = "Validation failure or monthly quota exceeded"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn apply_leave(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    payload: web::Json<ApplyLeave>,
) -> Result<HttpResponse, ApiError> {
    let reason = payload.reason.trim();
    if reason.is_empty() {
        return Err(ApiError::BadRequest("Reason is required".into()));
    }
    if reason.chars().count() > MAX_REASON_LEN {
        return Err(ApiError::BadRequest("Reason too long".into()));
    }

    if payload.end_date < payload.start_date {
        return Err(ApiError::BadRequest(
            "End date must be after or equal to start date".into(),
        ));
    }

    let today = accounting::utc_today(Utc::now());
    if payload.start_date < today {
        return Err(ApiError::BadRequest("Cannot apply leave for past dates".into()));
    }

    let requested = accounting::leave_day_span(payload.start_date, payload.end_date);
    let used = month_usage(auth.user_id, payload.start_date, pool.get_ref()).await?;

    if accounting::quota_exceeded(used, requested) {
        return Err(ApiError::QuotaExceeded {
            used,
            requested,
            quota: accounting::MAX_LEAVE_DAYS_PER_MONTH,
        });
    }

    let leave = sqlx::query_as::<_, LeaveRequest>(
        r#"
        INSERT INTO leave_requests (user_id, start_date, end_date, reason)
        VALUES (?, ?, ?, ?)
        RETURNING id, user_id, start_date, end_date, reason, status, created_at
        "#,
    )
    .bind(auth.user_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(reason)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to create leave request");
        ApiError::Internal
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Leave applied successfully",
        "leave": LeaveResponse::from(leave),
        "leaveBalance": accounting::leave_balance(used + requested),
    })))
}

/// Own leave requests, newest first
#[utoipa::path(
    get,
    path = "/api/leaves/me",
    responses(
        (status = 200, description = "Own leave requests", body = [LeaveResponse]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn my_leaves(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let leaves = sqlx::query_as::<_, LeaveRequest>(
        r#"
        SELECT id, user_id, start_date, end_date, reason, status, created_at
        FROM leave_requests
        WHERE user_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to fetch leaves");
        ApiError::Internal
    })?;

    let response: Vec<LeaveResponse> = leaves.into_iter().map(LeaveResponse::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// Org-wide leave requests with user identity joined (admin)
#[utoipa::path(
    get,
    path = "/api/leaves",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Leave requests with user identity", body = [AdminLeaveEntry]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn all_leaves(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let status = match query.status.as_deref() {
        Some(raw) => Some(raw.parse::<LeaveStatus>().map_err(|_| {
            ApiError::BadRequest("Invalid status. Allowed: Pending, Approved, Rejected".into())
        })?),
        None => None,
    };

    let mut sql = String::from(
        r#"
        SELECT l.id, l.user_id, l.start_date, l.end_date, l.reason, l.status, l.created_at,
               u.name, u.email, u.role, u.employee_code
        FROM leave_requests l
        JOIN users u ON u.id = l.user_id
        "#,
    );
    if status.is_some() {
        sql.push_str(" WHERE l.status = ?");
    }
    sql.push_str(" ORDER BY l.created_at DESC, l.id DESC");

    let mut q = sqlx::query_as::<_, LeaveWithUserRow>(&sql);
    if let Some(status) = status {
        q = q.bind(status.to_string());
    }

    let rows = q.fetch_all(pool.get_ref()).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch leave list");
        ApiError::Internal
    })?;

    let response: Vec<AdminLeaveEntry> = rows.into_iter().map(AdminLeaveEntry::from).collect();
    Ok(HttpResponse::Ok().json(response))
}

/// Decide a pending leave request (admin)
#[utoipa::path(
    patch,
    path = "/api/leaves/{leave_id}/status",
    params(("leave_id" = i64, Path, description = "Leave request id")),
    request_body = DecideLeave,
    responses(
        (status = 200, description = "Decision recorded"),
        (status = 400, description = "Invalid target status"),
        (status = 404, description = "No such leave request"),
        (status = 409, description = "Request already decided"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn decide_leave(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
    path: web::Path<i64>,
    payload: web::Json<DecideLeave>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let leave_id = path.into_inner();
    let decision = payload.status;

    if !decision.is_terminal() {
        return Err(ApiError::BadRequest(
            "Invalid status. Must be Approved or Rejected".into(),
        ));
    }

    let leave = sqlx::query_as::<_, LeaveRequest>(
        "SELECT id, user_id, start_date, end_date, reason, status, created_at FROM leave_requests WHERE id = ?",
    )
    .bind(leave_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, leave_id, "Failed to fetch leave request");
        ApiError::Internal
    })?
    .ok_or_else(|| ApiError::NotFound("Leave not found".into()))?;

    if leave.status().is_some_and(|s| s.is_terminal()) {
        return Err(ApiError::Conflict(format!(
            "Leave request already {}",
            leave.status.to_lowercase()
        )));
    }

    // Conditional update re-checks Pending so a concurrent decision
    // surfaces as a conflict, not a silent overwrite.
    let result = sqlx::query(
        "UPDATE leave_requests SET status = ? WHERE id = ? AND status = 'Pending'",
    )
    .bind(decision.to_string())
    .bind(leave_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, leave_id, "Failed to update leave status");
        ApiError::Internal
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict("Leave request already processed".into()));
    }

    let updated = sqlx::query_as::<_, LeaveRequest>(
        "SELECT id, user_id, start_date, end_date, reason, status, created_at FROM leave_requests WHERE id = ?",
    )
    .bind(leave_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, leave_id, "Failed to re-fetch leave request");
        ApiError::Internal
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Leave {} successfully", updated.status.to_lowercase()),
        "leave": LeaveResponse::from(updated),
    })))
}
