use crate::{
    api::error::ApiError,
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    model::{role::Role, user::User},
    models::{AuthResponse, LoginReq, RegisterReq, TokenType, UserResponse},
    utils::{email_cache, email_filter},
};
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument};

/// Mints the next human-readable id for the role and inserts the user,
/// all inside one transaction. The counter is only incremented after the
/// email-uniqueness check passes, so a rejected registration never
/// consumes an id.
async fn insert_user(
    name: &str,
    email: &str,
    password: &str,
    role: Role,
    pool: &SqlitePool,
) -> Result<User, ApiError> {
    let hashed = hash_password(password);

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open registration transaction");
        ApiError::Internal
    })?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)")
            .bind(email)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to check email uniqueness");
                ApiError::Internal
            })?;

    if exists {
        return Err(ApiError::BadRequest("Email already exists".into()));
    }

    let seq: i64 =
        sqlx::query_scalar("UPDATE counters SET seq = seq + 1 WHERE name = ? RETURNING seq")
            .bind(role.counter_name())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to advance id counter");
                ApiError::Internal
            })?;

    let employee_code = format!("{}-{}", role.code_prefix(), seq);

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password, role, employee_code)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, name, email, password, role, employee_code, last_login_at, created_at
        "#,
    )
    .bind(name)
    .bind(email)
    .bind(&hashed)
    .bind(role.to_string())
    .bind(&employee_code)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        // Loser of a concurrent registration race for the same email.
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return ApiError::BadRequest("Email already exists".into());
            }
        }
        error!(error = %e, "Failed to insert user");
        ApiError::Internal
    })?;

    tx.commit().await.map_err(|e| {
        error!(error = %e, "Failed to commit registration");
        ApiError::Internal
    })?;

    email_filter::insert(email);
    email_cache::mark_taken(email).await;

    Ok(user)
}

/// true  => email AVAILABLE
/// false => email TAKEN
///
/// Filter and cache answer the common cases without a storage
/// round-trip; the transactional check in `insert_user` stays
/// authoritative.
pub async fn is_email_available(email: &str, pool: &SqlitePool) -> bool {
    let email = email.to_lowercase();

    // Cuckoo filter: a negative answer is definite.
    if !email_filter::might_exist(&email) {
        return true;
    }

    // Moka cache: fast positive.
    if email_cache::is_taken(&email).await {
        return false;
    }

    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)")
            .bind(&email)
            .fetch_one(pool)
            .await
            .unwrap_or(true); // fail-safe

    !exists
}

async fn issue_tokens(
    user: &User,
    pool: &SqlitePool,
    config: &Config,
) -> Result<(String, String), ApiError> {
    let token = generate_access_token(
        user.id,
        user.email.clone(),
        user.role.clone(),
        &config.jwt_secret,
        config.access_token_ttl,
    );

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user.id,
        user.email.clone(),
        user.role.clone(),
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
        .bind(user.id)
        .bind(&refresh_claims.jti)
        .bind(refresh_claims.exp as i64)
        .execute(pool)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = user.id, "Failed to store refresh token");
            ApiError::Internal
        })?;

    Ok((token, refresh_token))
}

/// User registration handler
pub async fn register(
    payload: web::Json<RegisterReq>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let name = payload.name.trim();
    let email = payload.email.trim().to_lowercase();
    let password = &payload.password;

    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest(
            "Name, email and password are required".into(),
        ));
    }

    let role: Role = payload
        .role
        .as_deref()
        .unwrap_or("employee")
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid role. Allowed: admin, employee".into()))?;

    // The reference client only checked this in the browser; enforce it
    // here when a key is configured.
    if role == Role::Admin {
        if let Some(expected) = config.admin_registration_key.as_deref() {
            if payload.key.as_deref() != Some(expected) {
                return Err(ApiError::Forbidden("Invalid admin registration key".into()));
            }
        }
    }

    if !is_email_available(&email, pool.get_ref()).await {
        return Err(ApiError::BadRequest("Email already exists".into()));
    }

    let user = insert_user(name, &email, password, role, pool.get_ref()).await?;
    let (token, refresh_token) = issue_tokens(&user, pool.get_ref(), config.get_ref()).await?;

    info!(user_id = user.id, code = %user.employee_code, "User registered");

    Ok(HttpResponse::Created().json(AuthResponse {
        token,
        refresh_token,
        user: UserResponse::from(user),
    }))
}

#[instrument(
    name = "auth_login",
    skip(pool, config, payload),
    fields(identity = %payload.email_or_id)
)]
pub async fn login(
    payload: web::Json<LoginReq>,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    let identity = payload.email_or_id.trim();
    if identity.is_empty() || payload.password.is_empty() {
        info!("Validation failed: empty identity or password");
        return Err(ApiError::BadRequest("Email or id and password required".into()));
    }

    debug!("Fetching user from database");

    // Either the email (lowercased) or the human-readable id (uppercased).
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, role, employee_code, last_login_at, created_at
        FROM users
        WHERE email = ? OR employee_code = ?
        "#,
    )
    .bind(identity.to_lowercase())
    .bind(identity.to_uppercase())
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Database error while fetching user");
        ApiError::Internal
    })?;

    let Some(user) = user else {
        info!("Invalid credentials: user not found");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    };

    if !verify_password(&payload.password, &user.password) {
        info!("Invalid credentials: password mismatch");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let (token, refresh_token) = issue_tokens(&user, pool.get_ref(), config.get_ref()).await?;

    // Non-fatal; feeds the email-cache warmup window.
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");

    Ok(HttpResponse::Ok().json(AuthResponse {
        token,
        refresh_token,
        user: UserResponse::from(user),
    }))
}

pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("No token".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid token".into()))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::Unauthorized("Invalid token".into()))?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::Unauthorized("Invalid token".into()));
    }

    let record: Option<(i64, i64, bool)> =
        sqlx::query_as("SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ?")
            .bind(&claims.jti)
            .fetch_optional(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to look up refresh token");
                ApiError::Internal
            })?;

    let (record_id, user_id) = match record {
        Some((id, user_id, false)) => (id, user_id),
        _ => return Err(ApiError::Unauthorized("Invalid token".into())),
    };

    // Rotate: the presented refresh token is single-use.
    sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to revoke refresh token");
            ApiError::Internal
        })?;

    let (new_refresh_token, new_claims) = generate_refresh_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role.clone(),
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(&new_claims.jti)
        .bind(new_claims.exp as i64)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to store refresh token");
            ApiError::Internal
        })?;

    let token = generate_access_token(
        claims.user_id,
        claims.sub,
        claims.role,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "token": token,
        "refreshToken": new_refresh_token
    })))
}

pub async fn logout(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let Some(header) = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    else {
        return HttpResponse::NoContent().finish();
    };

    let Some(token) = header.strip_prefix("Bearer ") else {
        return HttpResponse::NoContent().finish();
    };

    let Ok(claims) = verify_token(token, &config.jwt_secret) else {
        return HttpResponse::NoContent().finish();
    };

    // Only refresh tokens are revocable.
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    // Idempotent: succeeds even if the token was never stored.
    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await;

    HttpResponse::NoContent().finish()
}
