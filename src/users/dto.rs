use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo::User;

/// Request body for signup. Fields are optional so presence is checked in the
/// handler and answered with 400 rather than a body-decode rejection.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    // Sent by the login form; token lifetime does not vary on it.
    #[serde(default)]
    pub remember_me: bool,
}

/// Request body for email verification.
#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Public part of the user returned to the client on login.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
    pub success: bool,
    pub redirect: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    pub message: String,
    pub success: bool,
}

/// User as exposed by `/users/me`: everything except the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_verified: bool,
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub message: String,
    pub data: UserData,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_verified: user.is_verified,
            is_admin: user.is_admin,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_user() -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@x.com".into(),
            password_hash: "$2b$10$abcdefghijklmnopqrstuv".into(),
            is_verified: false,
            is_admin: false,
            forgot_password_token: None,
            forgot_password_token_expiry: None,
            verify_token: Some("pending".into()),
            verify_token_expiry: Some(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn user_data_uses_camel_case_and_omits_password() {
        let data = UserData::from(make_user());
        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("isVerified"));
        assert!(json.contains("isAdmin"));
        assert!(json.contains("createdAt"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn user_record_never_serializes_password_hash() {
        let json = serde_json::to_string(&make_user()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("$2b$"));
    }

    #[test]
    fn login_request_accepts_remember_me() {
        let parsed: LoginRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"pw","rememberMe":true}"#)
                .unwrap();
        assert!(parsed.remember_me);

        let parsed: LoginRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"pw"}"#).unwrap();
        assert!(!parsed.remember_me);
    }

    #[test]
    fn signup_request_tolerates_missing_fields() {
        let parsed: SignupRequest = serde_json::from_str("{}").unwrap();
        assert!(parsed.username.is_none());
        assert!(parsed.email.is_none());
        assert!(parsed.password.is_none());
    }
}
