//! End-to-end tests over the HTTP surface, running against an in-memory
//! database with the real routing, auth middleware and rate limiters.

use actix_web::test::{self, TestRequest};
use actix_web::web::Data;
use actix_web::{App, http::StatusCode};
use chrono::{Datelike, Duration, Utc};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;

use crate::accounting;
use crate::config::Config;
use crate::db;
use crate::routes;

const ADMIN_KEY: &str = "letmein";

async fn test_pool() -> SqlitePool {
    // A single connection keeps every query on the same :memory: database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    db::run_migrations(&pool).await.expect("migrations");
    pool
}

fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".into(),
        jwt_secret: "test-secret".into(),
        server_addr: "127.0.0.1:0".into(),
        access_token_ttl: 900,
        refresh_token_ttl: 604_800,
        allowed_origin: "*".into(),
        admin_registration_key: Some(ADMIN_KEY.into()),
        rate_login_per_min: 600,
        rate_register_per_min: 600,
        rate_refresh_per_min: 600,
        rate_protected_per_min: 6000,
        api_prefix: "/api".into(),
    }
}

macro_rules! test_app {
    ($pool:expr) => {{
        let config = test_config();
        let routes_config = config.clone();
        test::init_service(
            App::new()
                .app_data(Data::new($pool.clone()))
                .app_data(Data::new(config))
                .configure(move |cfg| routes::configure(cfg, routes_config)),
        )
        .await
    }};
}

fn peer() -> SocketAddr {
    "127.0.0.1:8080".parse().unwrap()
}

fn post(path: &str, body: Value) -> TestRequest {
    TestRequest::post().uri(path).set_json(body).peer_addr(peer())
}

fn post_empty(path: &str) -> TestRequest {
    TestRequest::post().uri(path).peer_addr(peer())
}

fn get(path: &str) -> TestRequest {
    TestRequest::get().uri(path).peer_addr(peer())
}

fn patch(path: &str, body: Value) -> TestRequest {
    TestRequest::patch().uri(path).set_json(body).peer_addr(peer())
}

fn bearer(req: TestRequest, token: &str) -> TestRequest {
    req.insert_header(("Authorization", format!("Bearer {token}")))
}

macro_rules! register_employee {
    ($app:expr, $name:expr, $email:expr) => {{
        let resp = test::call_service(
            $app,
            post(
                "/auth/register",
                json!({"name": $name, "email": $email, "password": "password123"}),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body
    }};
}

macro_rules! register_admin {
    ($app:expr, $name:expr, $email:expr) => {{
        let resp = test::call_service(
            $app,
            post(
                "/auth/register",
                json!({
                    "name": $name,
                    "email": $email,
                    "password": "password123",
                    "role": "admin",
                    "key": ADMIN_KEY
                }),
            )
            .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body
    }};
}

fn token_of(body: &Value) -> String {
    body["token"].as_str().expect("token").to_string()
}

/// First day of next month: guarantees quota tests stay inside one
/// calendar month and never trip the past-date check.
fn next_month_start() -> chrono::NaiveDate {
    accounting::month_window_of(Utc::now().date_naive()).1
}

#[actix_web::test]
async fn register_clock_in_out_round_trip() {
    let pool = test_pool().await;
    let app = test_app!(&pool);

    let body = register_employee!(&app, "Asha", "asha.roundtrip@example.com");
    assert_eq!(body["user"]["employeeId"], "EMP-1000");
    assert_eq!(body["user"]["role"], "employee");
    assert_eq!(body["user"]["email"], "asha.roundtrip@example.com");
    let token = token_of(&body);

    let resp = test::call_service(
        &app,
        bearer(post_empty("/api/attendance/clock-in"), &token).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let record: Value = test::read_body_json(resp).await;
    assert_eq!(record["status"], "Open");
    assert!(record["clockInTime"].is_string());
    assert!(record["clockOutTime"].is_null());
    assert!(record["durationMinutes"].is_null());

    // Second clock-in on the same day is rejected.
    let resp = test::call_service(
        &app,
        bearer(post_empty("/api/attendance/clock-in"), &token).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["message"], "Already clocked in today");

    let resp = test::call_service(
        &app,
        bearer(post_empty("/api/attendance/clock-out"), &token).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let record: Value = test::read_body_json(resp).await;
    assert_eq!(record["status"], "Complete");
    assert!(record["clockOutTime"].is_string());
    assert!(record["durationMinutes"].is_i64());

    // No open session left to close.
    let resp = test::call_service(
        &app,
        bearer(post_empty("/api/attendance/clock-out"), &token).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["message"], "No open clock-in found");

    // Exactly one record for the day.
    let resp = test::call_service(&app, bearer(get("/api/attendance/me"), &token).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let records: Value = test::read_body_json(resp).await;
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["status"], "Complete");

    // Month filter: the current month matches, a different month does not.
    let today = Utc::now().date_naive();
    let path = format!(
        "/api/attendance/me?month={}&year={}",
        today.month(),
        today.year()
    );
    let resp = test::call_service(&app, bearer(get(&path), &token).to_request()).await;
    let records: Value = test::read_body_json(resp).await;
    assert_eq!(records.as_array().unwrap().len(), 1);

    let other_month = if today.month() == 1 { 2 } else { today.month() - 1 };
    let path = format!(
        "/api/attendance/me?month={}&year={}",
        other_month,
        today.year()
    );
    let resp = test::call_service(&app, bearer(get(&path), &token).to_request()).await;
    let records: Value = test::read_body_json(resp).await;
    assert_eq!(records.as_array().unwrap().len(), 0);

    let path = format!("/api/attendance/me?month=13&year={}", today.year());
    let resp = test::call_service(&app, bearer(get(&path), &token).to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn clock_out_without_open_session_fails() {
    let pool = test_pool().await;
    let app = test_app!(&pool);

    let body = register_employee!(&app, "Noor", "noor.noclockin@example.com");
    let token = token_of(&body);

    let resp = test::call_service(
        &app,
        bearer(post_empty("/api/attendance/clock-out"), &token).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn duplicate_email_is_rejected_without_consuming_ids() {
    let pool = test_pool().await;
    let app = test_app!(&pool);

    let body = register_employee!(&app, "First", "dup.first@example.com");
    assert_eq!(body["user"]["employeeId"], "EMP-1000");

    let resp = test::call_service(
        &app,
        post(
            "/auth/register",
            json!({"name": "Again", "email": "Dup.First@Example.com", "password": "password123"}),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["message"], "Email already exists");

    // The rejected registration consumed no id: the next user gets 1001.
    let body = register_employee!(&app, "Second", "dup.second@example.com");
    assert_eq!(body["user"]["employeeId"], "EMP-1001");
}

#[actix_web::test]
async fn login_by_email_or_employee_code() {
    let pool = test_pool().await;
    let app = test_app!(&pool);

    let body = register_employee!(&app, "Asha", "asha.login@example.com");
    let code = body["user"]["employeeId"].as_str().unwrap().to_string();

    // Case-insensitive email.
    let resp = test::call_service(
        &app,
        post(
            "/auth/login",
            json!({"emailOrId": "Asha.Login@Example.com", "password": "password123"}),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["token"].is_string());
    assert!(body["refreshToken"].is_string());

    // Case-insensitive human-readable id.
    let resp = test::call_service(
        &app,
        post(
            "/auth/login",
            json!({"emailOrId": code.to_lowercase(), "password": "password123"}),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        post(
            "/auth/login",
            json!({"emailOrId": "asha.login@example.com", "password": "wrong"}),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["message"], "Invalid credentials");

    let resp = test::call_service(
        &app,
        post(
            "/auth/login",
            json!({"emailOrId": "nobody@example.com", "password": "password123"}),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn leave_quota_five_days_per_month() {
    let pool = test_pool().await;
    let app = test_app!(&pool);

    let body = register_employee!(&app, "Quota", "quota.emp@example.com");
    let token = token_of(&body);
    let base = next_month_start();

    // 3 days: balance drops to 2.
    let resp = test::call_service(
        &app,
        bearer(
            post(
                "/api/leaves",
                json!({
                    "startDate": base,
                    "endDate": base + Duration::days(2),
                    "reason": "Family function"
                }),
            ),
            &token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["leaveBalance"], 2);
    assert_eq!(body["leave"]["daysRequested"], 3);
    assert_eq!(body["leave"]["status"], "Pending");

    // 2 more days: exactly at the quota.
    let resp = test::call_service(
        &app,
        bearer(
            post(
                "/api/leaves",
                json!({
                    "startDate": base + Duration::days(3),
                    "endDate": base + Duration::days(4),
                    "reason": "Travel"
                }),
            ),
            &token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["leaveBalance"], 0);

    // A sixth day in the same month is rejected.
    let resp = test::call_service(
        &app,
        bearer(
            post(
                "/api/leaves",
                json!({
                    "startDate": base + Duration::days(5),
                    "endDate": base + Duration::days(5),
                    "reason": "One more"
                }),
            ),
            &token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: Value = test::read_body_json(resp).await;
    assert!(err["message"].as_str().unwrap().contains("Leave limit exceeded"));
    assert_eq!(err["leaveBalance"], 0);
    assert_eq!(err["requested"], 1);

    // The rejected request was not stored.
    let resp = test::call_service(&app, bearer(get("/api/leaves/me"), &token).to_request()).await;
    let leaves: Value = test::read_body_json(resp).await;
    assert_eq!(leaves.as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn leave_validation_rules() {
    let pool = test_pool().await;
    let app = test_app!(&pool);

    let body = register_employee!(&app, "Val", "val.emp@example.com");
    let token = token_of(&body);
    let base = next_month_start();
    let today = Utc::now().date_naive();

    let resp = test::call_service(
        &app,
        bearer(
            post(
                "/api/leaves",
                json!({"startDate": base + Duration::days(2), "endDate": base, "reason": "Backwards"}),
            ),
            &token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["message"], "End date must be after or equal to start date");

    let resp = test::call_service(
        &app,
        bearer(
            post(
                "/api/leaves",
                json!({
                    "startDate": today - Duration::days(2),
                    "endDate": today - Duration::days(1),
                    "reason": "Too late"
                }),
            ),
            &token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["message"], "Cannot apply leave for past dates");

    let resp = test::call_service(
        &app,
        bearer(
            post(
                "/api/leaves",
                json!({"startDate": base, "endDate": base, "reason": "   "}),
            ),
            &token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["message"], "Reason is required");

    let resp = test::call_service(
        &app,
        bearer(
            post(
                "/api/leaves",
                json!({"startDate": base, "endDate": base, "reason": "x".repeat(501)}),
            ),
            &token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: Value = test::read_body_json(resp).await;
    assert_eq!(err["message"], "Reason too long");
}

#[actix_web::test]
async fn admin_decides_leave_exactly_once() {
    let pool = test_pool().await;
    let app = test_app!(&pool);

    let admin = register_admin!(&app, "Root", "root.decide@example.com");
    assert_eq!(admin["user"]["employeeId"], "ADM-5000");
    let admin_token = token_of(&admin);

    let emp = register_employee!(&app, "Asha", "asha.decide@example.com");
    let emp_token = token_of(&emp);
    let base = next_month_start();

    let resp = test::call_service(
        &app,
        bearer(
            post(
                "/api/leaves",
                json!({"startDate": base, "endDate": base + Duration::days(1), "reason": "Trip"}),
            ),
            &emp_token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Admin sees the pending request with the owner's identity joined.
    let resp = test::call_service(
        &app,
        bearer(get("/api/leaves?status=Pending"), &admin_token).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let list: Value = test::read_body_json(resp).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["user"]["email"], "asha.decide@example.com");
    let leave_id = list[0]["id"].as_i64().unwrap();

    // Employees cannot decide.
    let resp = test::call_service(
        &app,
        bearer(
            patch(
                &format!("/api/leaves/{leave_id}/status"),
                json!({"status": "Approved"}),
            ),
            &emp_token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Pending is not a decision.
    let resp = test::call_service(
        &app,
        bearer(
            patch(
                &format!("/api/leaves/{leave_id}/status"),
                json!({"status": "Pending"}),
            ),
            &admin_token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = test::call_service(
        &app,
        bearer(
            patch(
                &format!("/api/leaves/{leave_id}/status"),
                json!({"status": "Approved"}),
            ),
            &admin_token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["leave"]["status"], "Approved");

    // A decision on an already-terminal request conflicts.
    let resp = test::call_service(
        &app,
        bearer(
            patch(
                &format!("/api/leaves/{leave_id}/status"),
                json!({"status": "Rejected"}),
            ),
            &admin_token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = test::call_service(
        &app,
        bearer(
            patch("/api/leaves/99999/status", json!({"status": "Approved"})),
            &admin_token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(
        &app,
        bearer(get("/api/leaves?status=Approved"), &admin_token).to_request(),
    )
    .await;
    let list: Value = test::read_body_json(resp).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let resp = test::call_service(
        &app,
        bearer(get("/api/leaves?status=Bogus"), &admin_token).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn admin_registration_requires_key() {
    let pool = test_pool().await;
    let app = test_app!(&pool);

    let resp = test::call_service(
        &app,
        post(
            "/auth/register",
            json!({
                "name": "Mallory",
                "email": "mallory.key@example.com",
                "password": "password123",
                "role": "admin",
                "key": "wrong"
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = test::call_service(
        &app,
        post(
            "/auth/register",
            json!({
                "name": "Mallory",
                "email": "mallory.nokey@example.com",
                "password": "password123",
                "role": "admin"
            }),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body = register_admin!(&app, "Root", "root.key@example.com");
    assert_eq!(body["user"]["employeeId"], "ADM-5000");
    assert_eq!(body["user"]["role"], "admin");
}

#[actix_web::test]
async fn protected_routes_enforce_auth_and_role() {
    let pool = test_pool().await;
    let app = test_app!(&pool);

    let resp = test::call_service(&app, get("/api/attendance/me").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
        &app,
        bearer(get("/api/attendance/me"), "not-a-jwt").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let emp = register_employee!(&app, "Plain", "plain.emp@example.com");
    let token = token_of(&emp);

    for path in ["/api/attendance", "/api/attendance/employees", "/api/stats/admin", "/api/leaves"] {
        let resp = test::call_service(&app, bearer(get(path), &token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "expected 403 for {path}");
    }
}

#[actix_web::test]
async fn stats_reflect_current_month_activity() {
    let pool = test_pool().await;
    let app = test_app!(&pool);

    let body = register_employee!(&app, "Stats", "stats.emp@example.com");
    let token = token_of(&body);

    let resp = test::call_service(
        &app,
        bearer(post_empty("/api/attendance/clock-in"), &token).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Two pending days starting today, charged to this month.
    let today = Utc::now().date_naive();
    let resp = test::call_service(
        &app,
        bearer(
            post(
                "/api/leaves",
                json!({
                    "startDate": today,
                    "endDate": today + Duration::days(1),
                    "reason": "Errand"
                }),
            ),
            &token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(&app, bearer(get("/api/stats/me"), &token).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let stats: Value = test::read_body_json(resp).await;
    assert_eq!(stats["daysWorkedThisMonth"], 1);
    assert_eq!(stats["pendingLeavesThisMonth"], 1);
    assert_eq!(stats["approvedLeavesThisMonth"], 0);
    assert_eq!(stats["totalPendingLeaveDays"], 2);
    assert_eq!(stats["totalApprovedLeaveDays"], 0);
    assert_eq!(stats["totalLeaveDaysUsed"], 2);
    assert_eq!(stats["leaveBalance"], 3);
    assert_eq!(stats["maxLeavesPerMonth"], 5);
}

#[actix_web::test]
async fn org_snapshot_partitions_employees() {
    let pool = test_pool().await;
    let app = test_app!(&pool);

    let admin = register_admin!(&app, "Root", "root.snapshot@example.com");
    let admin_token = token_of(&admin);

    let present = register_employee!(&app, "Here", "here.snapshot@example.com");
    let present_token = token_of(&present);
    let absent = register_employee!(&app, "Away", "away.snapshot@example.com");
    let absent_token = token_of(&absent);
    let absent_id = absent["user"]["id"].as_i64().unwrap();

    let resp = test::call_service(
        &app,
        bearer(post_empty("/api/attendance/clock-in"), &present_token).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let base = next_month_start();
    let resp = test::call_service(
        &app,
        bearer(
            post(
                "/api/leaves",
                json!({"startDate": base, "endDate": base, "reason": "Checkup"}),
            ),
            &absent_token,
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(&app, bearer(get("/api/stats/admin"), &admin_token).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let snapshot: Value = test::read_body_json(resp).await;

    let absent_emails: Vec<&str> = snapshot["absentToday"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["email"].as_str().unwrap())
        .collect();
    assert_eq!(absent_emails, vec!["away.snapshot@example.com"]);
    assert_eq!(snapshot["pendingLeavesCount"], 1);

    // Absent + present partition the whole directory; admins are not
    // part of it.
    let resp = test::call_service(
        &app,
        bearer(get("/api/attendance/employees"), &admin_token).to_request(),
    )
    .await;
    let directory: Value = test::read_body_json(resp).await;
    assert_eq!(directory.as_array().unwrap().len(), 2);

    // Admin listing joins user identity onto the present employee's record.
    let resp = test::call_service(&app, bearer(get("/api/attendance"), &admin_token).to_request()).await;
    let entries: Value = test::read_body_json(resp).await;
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["user"]["email"], "here.snapshot@example.com");

    let resp = test::call_service(
        &app,
        bearer(get(&format!("/api/attendance?userId={absent_id}")), &admin_token).to_request(),
    )
    .await;
    let entries: Value = test::read_body_json(resp).await;
    assert_eq!(entries.as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn refresh_rotation_and_logout() {
    let pool = test_pool().await;
    let app = test_app!(&pool);

    let body = register_employee!(&app, "Rota", "rota.emp@example.com");
    let access = token_of(&body);
    let refresh = body["refreshToken"].as_str().unwrap().to_string();

    // Access tokens are not accepted by the refresh endpoint.
    let resp = test::call_service(
        &app,
        bearer(post_empty("/auth/refresh"), &access).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
        &app,
        bearer(post_empty("/auth/refresh"), &refresh).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rotated: Value = test::read_body_json(resp).await;
    let new_refresh = rotated["refreshToken"].as_str().unwrap().to_string();
    assert!(rotated["token"].is_string());

    // The presented refresh token was rotated out.
    let resp = test::call_service(
        &app,
        bearer(post_empty("/auth/refresh"), &refresh).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = test::call_service(
        &app,
        bearer(post_empty("/auth/logout"), &new_refresh).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = test::call_service(
        &app,
        bearer(post_empty("/auth/refresh"), &new_refresh).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
