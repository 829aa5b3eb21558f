use crate::api::attendance::{
    AdminAttendanceEntry, AttendanceResponse, UserIdentity,
};
use crate::api::leave::{AdminLeaveEntry, ApplyLeave, DecideLeave, LeaveResponse};
use crate::api::stats::{EmployeeStats, OrgSnapshot};
use crate::model::attendance::AttendanceStatus;
use crate::model::leave_request::LeaveStatus;
use crate::models::EmployeeSummary;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Roll Call API",
        version = "1.0.0",
        description = r#"
## Workforce Attendance & Leave Tracker

This API powers a workforce attendance tracker: employees clock in and
out and request leave; administrators review absentees and decide leave
requests.

### Key Features
- **Attendance Ledger**
  - Daily clock-in / clock-out, one record per user per UTC day
  - Derived duration and Open/Complete status, monthly filtering
- **Leave Management**
  - Apply for leave against a monthly quota, approve/reject as admin
- **Accounting**
  - Per-employee monthly statistics and an org-wide daily
    present/absent snapshot

### Security
All endpoints except registration and login require **JWT Bearer
authentication**. Admin-only endpoints check the caller's role on every
request.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::clock_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::my_attendance,
        crate::api::attendance::all_attendance,
        crate::api::attendance::employees,

        crate::api::leave::apply_leave,
        crate::api::leave::my_leaves,
        crate::api::leave::all_leaves,
        crate::api::leave::decide_leave,

        crate::api::stats::my_stats,
        crate::api::stats::admin_stats
    ),
    components(
        schemas(
            AttendanceResponse,
            AdminAttendanceEntry,
            AttendanceStatus,
            UserIdentity,
            ApplyLeave,
            DecideLeave,
            LeaveResponse,
            AdminLeaveEntry,
            LeaveStatus,
            EmployeeStats,
            OrgSnapshot,
            EmployeeSummary
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Clock-in/out and attendance listings"),
        (name = "Leave", description = "Leave requests and admin decisions"),
        (name = "Stats", description = "Derived monthly and daily accounting"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
