//! Phone/OTP authentication.
//!
//! [`OtpFlow`] is a pure state machine: it consumes [`FlowEvent`]s and returns
//! [`FlowEffect`]s. [`Authenticator`] executes those effects against the
//! backend and the session store, feeding results back as events.

pub mod errors;
mod flow;
mod runner;
pub mod validate;

pub use errors::{AuthError, ValidationError};
pub use flow::{AuthForm, FlowEffect, FlowEvent, OtpFlow, PendingAuth, Phase};
pub use runner::Authenticator;
