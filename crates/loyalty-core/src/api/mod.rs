//! Backend REST API access.

mod client;
mod endpoints;
mod error;

pub use client::{ApiClient, ApiRequest, USER_AGENT};
pub use endpoints::{AuthApi, AuthMode, InitiateRequest, VerifyResponse};
pub use error::{ApiError, ApiResult};
