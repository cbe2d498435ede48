//! Core loyalty client library (session, API client, OTP auth flow, guard).

pub mod api;
pub mod auth;
pub mod config;
pub mod debug_log;
pub mod guard;
pub mod logging;
pub mod session;
pub mod storage;
