//! Auth endpoints of the backend.

use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};

use super::client::ApiClient;
use super::error::{ApiError, ApiResult};
use crate::session::{TokenPair, UserProfile};

const LOGIN_PATH: &str = "/auth/login/phone_number";
const REGISTER_PATH: &str = "/auth/register/phone_number";
const VERIFY_LOGIN_PATH: &str = "/auth/verify/login/phone_number/otp";
const VERIFY_REGISTER_PATH: &str = "/auth/verify/register/phone_number/otp";
const FORGOT_PASSWORD_PATH: &str = "/auth/forgot-password";
const RESET_PASSWORD_PATH: &str = "/auth/reset-password";

/// Whether an OTP challenge logs in an existing account or registers a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Login => write!(f, "login"),
            AuthMode::Register => write!(f, "register"),
        }
    }
}

/// Body of an OTP initiation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitiateRequest {
    #[serde(skip)]
    pub mode: AuthMode,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// User and tokens extracted from a successful verify call.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyResponse {
    pub user: UserProfile,
    pub tokens: TokenPair,
}

impl VerifyResponse {
    /// Extracts user and tokens from a verify response body.
    ///
    /// Accepts the documented `{ data: { user, backend_tokens } }` shape as well
    /// as the unwrapped `{ user, backend_tokens }`. Returns a description of the
    /// first missing piece when the body does not carry a usable session.
    ///
    /// # Errors
    /// Returns a description of the missing or invalid field.
    pub fn from_value(body: &Value) -> Result<Self, String> {
        let payload = match body.get("data") {
            Some(data) if data.is_object() => data,
            _ => body,
        };

        let user = payload
            .get("user")
            .cloned()
            .and_then(UserProfile::from_value)
            .ok_or_else(|| "missing user".to_string())?;

        let tokens = payload
            .get("backend_tokens")
            .filter(|t| t.is_object())
            .ok_or_else(|| "missing backend_tokens".to_string())?;

        let token = |key: &str| -> Result<String, String> {
            tokens
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .ok_or_else(|| format!("missing backend_tokens.{key}"))
        };

        let access_token = token("access_token")?;
        let refresh_token = token("refresh_token")?;
        let expires_in = tokens.get("expires_in").and_then(Value::as_u64);

        Ok(Self {
            user,
            tokens: TokenPair {
                access_token,
                refresh_token,
                expires_in,
            },
        })
    }
}

/// Typed wrapper over the auth endpoints.
#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Asks the backend to send an OTP for login or registration.
    ///
    /// # Errors
    /// Propagates the backend or transport error.
    pub async fn initiate(&self, request: &InitiateRequest) -> ApiResult<Value> {
        let path = match request.mode {
            AuthMode::Login => LOGIN_PATH,
            AuthMode::Register => REGISTER_PATH,
        };
        tracing::info!(mode = %request.mode, "requesting OTP");
        match self.client.post(path, request).await {
            // The initiation body is unused; a non-JSON 2xx still means the OTP was sent.
            Err(ApiError::Decode(detail)) => {
                tracing::debug!(%detail, "ignoring non-JSON initiation body");
                Ok(Value::Null)
            }
            other => other,
        }
    }

    /// Submits an OTP code. Returns the raw body for the caller to validate.
    ///
    /// # Errors
    /// Propagates the backend or transport error.
    pub async fn verify(&self, mode: AuthMode, otp_code: &str) -> ApiResult<Value> {
        let path = match mode {
            AuthMode::Login => VERIFY_LOGIN_PATH,
            AuthMode::Register => VERIFY_REGISTER_PATH,
        };
        tracing::info!(%mode, "verifying OTP");
        self.client.post(path, &json!({ "otp_code": otp_code })).await
    }

    /// Starts password recovery for an email address.
    ///
    /// # Errors
    /// Propagates the backend or transport error.
    pub async fn forgot_password(&self, email: &str) -> ApiResult<Value> {
        self.client
            .post(FORGOT_PASSWORD_PATH, &json!({ "email": email }))
            .await
    }

    /// Sets a new password using a recovery token.
    ///
    /// # Errors
    /// Propagates the backend or transport error.
    pub async fn reset_password(&self, token: &str, password: &str) -> ApiResult<Value> {
        self.client
            .post(
                RESET_PASSWORD_PATH,
                &json!({ "token": token, "password": password }),
            )
            .await
    }
}
