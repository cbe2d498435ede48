//! OTP flow reducer.
//!
//! All state mutations happen here. The runner calls `update(event)` and
//! executes the returned effects; results come back as new events.

use std::fmt;

use serde_json::Value;

use super::errors::{AuthError, ValidationError};
use super::validate;
use crate::api::{ApiError, ApiResult, AuthMode, InitiateRequest, VerifyResponse};
use crate::session::{TokenPair, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Collecting phone (and email/role when registering).
    Form,
    /// Initiation call in flight.
    Submitting,
    /// OTP sent; waiting for the user to enter it.
    OtpPending,
    /// Verification call in flight.
    Verifying,
    Authenticated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Form => "form",
            Phase::Submitting => "submitting",
            Phase::OtpPending => "otp_pending",
            Phase::Verifying => "verifying",
            Phase::Authenticated => "authenticated",
        };
        f.write_str(name)
    }
}

/// Raw form input as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthForm {
    pub phone: String,
    /// Registration only.
    pub email: String,
    /// Registration only.
    pub role: Option<String>,
    /// Registration only.
    pub accepted_terms: bool,
}

impl AuthForm {
    pub fn login(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            ..Self::default()
        }
    }

    pub fn register(
        phone: impl Into<String>,
        email: impl Into<String>,
        role: Option<String>,
        accepted_terms: bool,
    ) -> Self {
        Self {
            phone: phone.into(),
            email: email.into(),
            role,
            accepted_terms,
        }
    }
}

/// Data captured at submission time and reused for resend and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAuth {
    pub mode: AuthMode,
    /// Digits only; country code kept, `+` and separators dropped.
    pub phone_digits: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl PendingAuth {
    fn from_form(mode: AuthMode, form: &AuthForm) -> Result<Self, ValidationError> {
        let phone_digits = validate::validate_phone(&form.phone)?;
        match mode {
            AuthMode::Login => Ok(Self {
                mode,
                phone_digits,
                email: None,
                role: None,
            }),
            AuthMode::Register => {
                let email = validate::validate_email(&form.email)?;
                if !form.accepted_terms {
                    return Err(ValidationError::TermsNotAccepted);
                }
                let role = form
                    .role
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string);
                Ok(Self {
                    mode,
                    phone_digits,
                    email: Some(email),
                    role,
                })
            }
        }
    }

    pub fn initiate_request(&self) -> InitiateRequest {
        InitiateRequest {
            mode: self.mode,
            phone_number: self.phone_digits.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FlowEvent {
    /// Initial form submission.
    Submit(AuthForm),
    /// Result of an initiation (or resend) call.
    Initiated(ApiResult<()>),
    /// User entered an OTP code.
    SubmitOtp(String),
    /// Result of a verification call.
    Verified(ApiResult<Value>),
    /// Request a fresh code for the pending submission.
    Resend,
    /// Leave the OTP step and return to the form.
    Back,
    DismissError,
}

/// Work the runner must perform on behalf of the flow.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEffect {
    Initiate(InitiateRequest),
    Verify { mode: AuthMode, otp_code: String },
    SetSession { user: UserProfile, tokens: TokenPair },
}

/// Phone/OTP login or registration state machine.
#[derive(Debug, Clone)]
pub struct OtpFlow {
    mode: AuthMode,
    phase: Phase,
    /// Submission whose initiation call is in flight.
    submission: Option<PendingAuth>,
    pending: Option<PendingAuth>,
    otp_input: String,
    error: Option<AuthError>,
}

impl OtpFlow {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            phase: Phase::Form,
            submission: None,
            pending: None,
            otp_input: String::new(),
            error: None,
        }
    }

    pub fn login() -> Self {
        Self::new(AuthMode::Login)
    }

    pub fn register() -> Self {
        Self::new(AuthMode::Register)
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending(&self) -> Option<&PendingAuth> {
        self.pending.as_ref()
    }

    pub fn otp_input(&self) -> &str {
        &self.otp_input
    }

    pub fn error(&self) -> Option<&AuthError> {
        self.error.as_ref()
    }

    /// Message for the error banner, if any.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    /// True while a network call is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self.phase, Phase::Submitting | Phase::Verifying)
    }

    /// The reducer. Events that do not apply to the current phase are ignored.
    pub fn update(&mut self, event: FlowEvent) -> Vec<FlowEffect> {
        match (self.phase, event) {
            (_, FlowEvent::DismissError) => {
                self.error = None;
                vec![]
            }
            (Phase::Form, FlowEvent::Submit(form)) => self.handle_submit(&form),
            (Phase::Submitting, FlowEvent::Initiated(result)) => {
                self.handle_initiated(result);
                vec![]
            }
            (Phase::OtpPending, FlowEvent::SubmitOtp(code)) => self.handle_submit_otp(&code),
            (Phase::OtpPending, FlowEvent::Resend) => self.handle_resend(),
            (Phase::OtpPending, FlowEvent::Back) => {
                self.pending = None;
                self.otp_input.clear();
                self.error = None;
                self.phase = Phase::Form;
                vec![]
            }
            (Phase::Verifying, FlowEvent::Verified(result)) => self.handle_verified(result),
            (phase, event) => {
                tracing::debug!(%phase, ?event, "ignoring event not applicable to phase");
                vec![]
            }
        }
    }

    fn handle_submit(&mut self, form: &AuthForm) -> Vec<FlowEffect> {
        self.error = None;
        // A new submission always replaces whatever was pending before.
        self.pending = None;

        let submission = match PendingAuth::from_form(self.mode, form) {
            Ok(submission) => submission,
            Err(err) => {
                self.error = Some(err.into());
                return vec![];
            }
        };

        let request = submission.initiate_request();
        self.submission = Some(submission);
        self.phase = Phase::Submitting;
        vec![FlowEffect::Initiate(request)]
    }

    fn handle_initiated(&mut self, result: ApiResult<()>) {
        match result {
            Ok(()) => {
                self.pending = self.submission.take();
                self.otp_input.clear();
                self.error = None;
                self.phase = if self.pending.is_some() {
                    Phase::OtpPending
                } else {
                    Phase::Form
                };
            }
            Err(err) => {
                tracing::debug!(error = %err, "OTP initiation failed");
                self.submission = None;
                self.pending = None;
                self.error = Some(AuthError::from_initiate(self.mode, &err));
                self.phase = Phase::Form;
            }
        }
    }

    fn handle_resend(&mut self) -> Vec<FlowEffect> {
        let Some(pending) = self.pending.clone() else {
            self.phase = Phase::Form;
            return vec![];
        };
        let request = pending.initiate_request();
        self.submission = Some(pending);
        self.otp_input.clear();
        self.error = None;
        self.phase = Phase::Submitting;
        vec![FlowEffect::Initiate(request)]
    }

    fn handle_submit_otp(&mut self, code: &str) -> Vec<FlowEffect> {
        self.otp_input = code.trim().to_string();
        match validate::validate_otp(code) {
            Ok(otp_code) => {
                self.error = None;
                self.phase = Phase::Verifying;
                vec![FlowEffect::Verify {
                    mode: self.mode,
                    otp_code,
                }]
            }
            Err(err) => {
                self.error = Some(err.into());
                vec![]
            }
        }
    }

    fn handle_verified(&mut self, result: ApiResult<Value>) -> Vec<FlowEffect> {
        let body = match result {
            Ok(body) => body,
            Err(err) => {
                self.fail_verification(AuthError::from_verify(&err), &err);
                return vec![];
            }
        };

        match VerifyResponse::from_value(&body) {
            Ok(VerifyResponse { user, tokens }) => {
                self.pending = None;
                self.otp_input.clear();
                self.error = None;
                self.phase = Phase::Authenticated;
                vec![FlowEffect::SetSession { user, tokens }]
            }
            Err(detail) => {
                tracing::warn!(%detail, "verify succeeded but response lacks session data");
                self.error = Some(AuthError::MalformedResponse { detail });
                self.phase = Phase::OtpPending;
                vec![]
            }
        }
    }

    fn fail_verification(&mut self, error: AuthError, cause: &ApiError) {
        tracing::debug!(error = %cause, "OTP verification failed");
        self.error = Some(error);
        self.phase = Phase::OtpPending;
    }
}
