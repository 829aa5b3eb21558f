use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::user::User;
use crate::models::TokenType;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;
use sqlx::SqlitePool;

fn unauthorized(req: ServiceRequest, message: &str) -> Result<ServiceResponse<BoxBody>, Error> {
    let resp = HttpResponse::Unauthorized().json(json!({ "message": message }));
    Ok(req.into_response(resp.map_into_boxed_body()))
}

/// Verifies the bearer token, then re-resolves the user from storage so
/// role or identity changes take effect on the very next request.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?
        .clone();
    let pool = req
        .app_data::<Data<SqlitePool>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Database pool missing"))?
        .clone();

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v,
            Err(_) => return unauthorized(req, "Invalid Authorization header encoding"),
        },
        None => return unauthorized(req, "Not authorized, no token"),
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t.to_owned(),
        None => return unauthorized(req, "Authorization header must start with Bearer"),
    };

    let claims = match verify_token(&token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return unauthorized(req, "Not authorized, token failed"),
    };

    if claims.token_type != TokenType::Access {
        return unauthorized(req, "Not authorized, token failed");
    }

    let user = match sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, role, employee_code, last_login_at, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(claims.user_id)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) => user,
        Ok(None) => return unauthorized(req, "User not found"),
        Err(e) => {
            tracing::error!(error = %e, user_id = claims.user_id, "Failed to resolve user");
            return Err(actix_web::error::ErrorInternalServerError("Internal Server Error"));
        }
    };

    let role = match user.role() {
        Some(role) => role,
        None => return unauthorized(req, "Invalid role"),
    };

    req.extensions_mut().insert(AuthUser {
        user_id: user.id,
        name: user.name,
        email: user.email,
        role,
        employee_code: user.employee_code,
    });

    next.call(req).await
}
