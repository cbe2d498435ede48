//! User-facing auth errors.
//!
//! Every failure of the OTP flow ends up as one of these, and its `Display`
//! output is the message shown to the user.

use crate::api::{ApiError, AuthMode};

pub const INVALID_INPUT: &str = "Invalid input. Please check your details and try again.";
pub const NOT_REGISTERED: &str = "This phone number is not registered. Please sign up first.";
pub const ALREADY_EXISTS: &str = "An account with this phone number or email already exists.";
pub const SERVER_ERROR: &str = "Server error. Please try again later.";
pub const INVALID_CODE: &str = "Invalid code. Please check the code and try again.";
pub const CODE_EXPIRED: &str = "The code has expired. Please request a new code.";
pub const SESSION_NOT_FOUND: &str = "Verification session not found. Please start again.";
pub const UNEXPECTED: &str = "An unexpected error occurred. Please try again.";
pub const MALFORMED_RESPONSE: &str = "Malformed server response. Please try again.";

/// Input rejected before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a valid phone number (at least 8 digits).")]
    PhoneTooShort,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("You must accept the terms and conditions to register.")]
    TermsNotAccepted,
    #[error("Please enter the 6-digit code.")]
    InvalidOtp,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The backend answered with an error status.
    #[error("{message}")]
    Api { status: u16, message: String },
    /// The backend could not be reached.
    #[error("An unexpected error occurred. Please try again.")]
    Network { detail: String },
    /// 2xx response without the fields a session needs.
    #[error("Malformed server response. Please try again.")]
    MalformedResponse { detail: String },
}

impl AuthError {
    /// Maps a failed OTP initiation call to a user-facing error.
    pub fn from_initiate(mode: AuthMode, err: &ApiError) -> Self {
        match err {
            ApiError::Http { status, message } => {
                let text = match (*status, mode) {
                    (400, _) => INVALID_INPUT,
                    (404, AuthMode::Login) => NOT_REGISTERED,
                    (409, AuthMode::Register) => ALREADY_EXISTS,
                    (500..=599, _) => SERVER_ERROR,
                    _ => message.as_str(),
                };
                Self::api(*status, text)
            }
            ApiError::Network(detail) | ApiError::Decode(detail) => Self::Network {
                detail: detail.clone(),
            },
        }
    }

    /// Maps a failed OTP verification call to a user-facing error.
    pub fn from_verify(err: &ApiError) -> Self {
        match err {
            ApiError::Http { status, message } => {
                let text = match *status {
                    400 => INVALID_CODE,
                    401 => CODE_EXPIRED,
                    404 => SESSION_NOT_FOUND,
                    500..=599 => SERVER_ERROR,
                    _ => message.as_str(),
                };
                Self::api(*status, text)
            }
            ApiError::Network(detail) => Self::Network {
                detail: detail.clone(),
            },
            ApiError::Decode(detail) => Self::MalformedResponse {
                detail: detail.clone(),
            },
        }
    }

    fn api(status: u16, message: &str) -> Self {
        Self::Api {
            status,
            message: message.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
