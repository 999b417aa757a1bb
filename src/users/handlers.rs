use anyhow::Context;
use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    db::AppState,
    error::ApiError,
    users::{
        dto::{
            LoginRequest, LoginResponse, LogoutResponse, MeResponse, MessageResponse, PublicUser,
            SignupRequest, VerifyEmailRequest, VerifyEmailResponse,
        },
        jwt::{AuthUser, JwtKeys},
        password::{hash_password, verify_password},
        repo, tokens,
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", get(logout).post(logout))
        .route("/me", get(me))
        .route("/verifyemail", post(verify_email))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let username = payload
        .username
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_lowercase();
    let password = payload.password.unwrap_or_default();

    if username.is_empty() || email.is_empty() || password.is_empty() {
        warn!("signup missing required fields");
        return Err(ApiError::BadRequest("Missing required fields".into()));
    }
    if username.len() < 3 {
        warn!(username = %username, "signup username too short");
        return Err(ApiError::BadRequest("Username too short".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "signup invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if password.len() < 8 {
        warn!("signup password too short");
        return Err(ApiError::BadRequest("Password too short".into()));
    }

    match repo::find_by_username_or_email(&state.db, &username, &email).await {
        Ok(Some(_)) => {
            warn!(email = %email, "signup duplicate username or email");
            return Err(ApiError::Conflict("User already exists".into()));
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "signup duplicate check failed");
            return Err(ApiError::Internal(e));
        }
    }

    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("join password hashing task")??;

    // The token is stored pending delivery; a mail channel can pick it up.
    let verify_token = tokens::generate_verify_token();
    let verify_token_expiry = tokens::verify_token_expiry();

    match repo::create(
        &state.db,
        &username,
        &email,
        &hash,
        &verify_token,
        verify_token_expiry,
    )
    .await
    {
        Ok(user) => {
            info!(user_id = %user.id, email = %user.email, "user created");
            Ok((
                StatusCode::CREATED,
                Json(MessageResponse {
                    message: "User created".into(),
                }),
            ))
        }
        Err(e) if repo::is_unique_violation(&e) => {
            // Lost the race with a concurrent signup for the same identity.
            warn!(email = %email, "signup duplicate username or email");
            Err(ApiError::Conflict("User already exists".into()))
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            Err(ApiError::Internal(e))
        }
    }
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_lowercase();
    let password = payload.password.unwrap_or_default();

    if email.is_empty() || password.is_empty() {
        warn!("login missing required fields");
        return Err(ApiError::BadRequest("Email and password required".into()));
    }

    let user = match repo::find_by_email(&state.db, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::NotFound("User does not exist".into()));
        }
        Err(e) => {
            error!(error = %e, "login lookup failed");
            return Err(ApiError::Internal(e));
        }
    };

    let stored_hash = user.password_hash.clone();
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .context("join password verify task")?;

    if !ok {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid password".into()));
    }

    if payload.remember_me {
        // Accepted from the form, but the token lifetime does not vary on it.
        info!(email = %email, "rememberMe requested");
    }

    let keys = JwtKeys::from_ref(&state);
    let token = match keys.sign(&user) {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "jwt sign failed");
            return Err(ApiError::Internal(e));
        }
    };

    info!(user_id = %user.id, email = %user.email, "user logged in");
    let jar = jar.add(keys.session_cookie(token));
    Ok((
        jar,
        Json(LoginResponse {
            success: true,
            message: "Login successful".into(),
            user: PublicUser {
                id: user.id,
                username: user.username,
                email: user.email,
            },
        }),
    ))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    let keys = JwtKeys::from_ref(&state);
    let jar = jar.add(keys.clear_session_cookie());
    info!("user logged out");
    (
        jar,
        Json(LogoutResponse {
            message: "Logout successful".into(),
            success: true,
            redirect: "/login".into(),
        }),
    )
}

#[instrument(skip(state, claims))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    match repo::find_by_id(&state.db, claims.sub).await {
        Ok(Some(user)) => Ok(Json(MeResponse {
            message: "User found".into(),
            data: user.into(),
        })),
        Ok(None) => {
            // Token outlived the account.
            warn!(user_id = %claims.sub, "session user no longer exists");
            Err(ApiError::NotFound("User not found".into()))
        }
        Err(e) => {
            error!(error = %e, user_id = %claims.sub, "me lookup failed");
            Err(ApiError::Internal(e))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<Json<VerifyEmailResponse>, ApiError> {
    let token = payload.token.unwrap_or_default();
    if token.is_empty() {
        warn!("verifyemail missing token");
        return Err(ApiError::BadRequest("Missing token".into()));
    }

    match repo::consume_verify_token(&state.db, &token).await {
        Ok(Some(user)) => {
            info!(user_id = %user.id, "email verified");
            Ok(Json(VerifyEmailResponse {
                message: "Email verified successfully".into(),
                success: true,
            }))
        }
        // Wrong, already consumed, or expired: deliberately the same answer.
        Ok(None) => {
            warn!("verification token rejected");
            Err(ApiError::BadRequest("Invalid or expired token".into()))
        }
        Err(e) => {
            error!(error = %e, "verifyemail failed");
            Err(ApiError::Internal(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("alice@x.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a b@x.com"));
    }
}
