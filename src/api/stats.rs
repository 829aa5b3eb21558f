use crate::accounting;
use crate::api::error::ApiError;
use crate::auth::auth::AuthUser;
use crate::models::EmployeeSummary;
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashSet;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeStats {
    pub days_worked_this_month: i64,
    pub approved_leaves_this_month: i64,
    pub pending_leaves_this_month: i64,
    pub total_approved_leave_days: i64,
    pub total_pending_leave_days: i64,
    pub total_leave_days_used: i64,
    pub leave_balance: i64,
    pub max_leaves_per_month: i64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrgSnapshot {
    /// Employees with no clock-in record today
    pub absent_today: Vec<EmployeeSummary>,
    pub pending_leaves_count: i64,
}

async fn leave_ranges_in_window(
    user_id: i64,
    status: &str,
    window: (NaiveDate, NaiveDate),
    pool: &SqlitePool,
) -> Result<Vec<(NaiveDate, NaiveDate)>, ApiError> {
    sqlx::query_as(
        r#"
        SELECT start_date, end_date
        FROM leave_requests
        WHERE user_id = ? AND status = ? AND start_date >= ? AND start_date < ?
        "#,
    )
    .bind(user_id)
    .bind(status)
    .bind(window.0)
    .bind(window.1)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id, status, "Failed to fetch leave ranges");
        ApiError::Internal
    })
}

/// Monthly accounting summary for the calling employee
#[utoipa::path(
    get,
    path = "/api/stats/me",
    responses(
        (status = 200, description = "Current-month attendance and leave accounting", body = EmployeeStats),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Stats"
)]
pub async fn my_stats(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    let today = accounting::utc_today(Utc::now());
    let window = accounting::month_window_of(today);

    let days_worked: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM attendance
        WHERE user_id = ? AND date >= ? AND date < ? AND clock_in IS NOT NULL
        "#,
    )
    .bind(auth.user_id)
    .bind(window.0)
    .bind(window.1)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to count worked days");
        ApiError::Internal
    })?;

    let approved = leave_ranges_in_window(auth.user_id, "Approved", window, pool.get_ref()).await?;
    let pending = leave_ranges_in_window(auth.user_id, "Pending", window, pool.get_ref()).await?;

    let total_approved_leave_days = accounting::total_leave_days(&approved);
    let total_pending_leave_days = accounting::total_leave_days(&pending);
    let total_leave_days_used = total_approved_leave_days + total_pending_leave_days;

    Ok(HttpResponse::Ok().json(EmployeeStats {
        days_worked_this_month: days_worked,
        approved_leaves_this_month: approved.len() as i64,
        pending_leaves_this_month: pending.len() as i64,
        total_approved_leave_days,
        total_pending_leave_days,
        total_leave_days_used,
        leave_balance: accounting::leave_balance(total_leave_days_used),
        max_leaves_per_month: accounting::MAX_LEAVE_DAYS_PER_MONTH,
    }))
}

/// Today's org-wide presence snapshot (admin)
#[utoipa::path(
    get,
    path = "/api/stats/admin",
    responses(
        (status = 200, description = "Absent employees and pending leave count", body = OrgSnapshot),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Stats"
)]
pub async fn admin_stats(
    auth: AuthUser,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_admin()?;

    let today = accounting::utc_today(Utc::now());

    let employees = sqlx::query_as::<_, EmployeeSummary>(
        "SELECT id, name, email, employee_code FROM users WHERE role = 'employee'",
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch employees");
        ApiError::Internal
    })?;

    let present: HashSet<i64> = sqlx::query_scalar::<_, i64>(
        "SELECT user_id FROM attendance WHERE date = ? AND clock_in IS NOT NULL",
    )
    .bind(today)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to fetch today's attendance");
        ApiError::Internal
    })?
    .into_iter()
    .collect();

    let absent_today = accounting::absentees(employees, &present, |e| e.id);

    let pending_leaves_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM leave_requests WHERE status = 'Pending'")
            .fetch_one(pool.get_ref())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to count pending leaves");
                ApiError::Internal
            })?;

    Ok(HttpResponse::Ok().json(OrgSnapshot {
        absent_today,
        pending_leaves_count,
    }))
}
