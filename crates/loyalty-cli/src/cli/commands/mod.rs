//! CLI command handlers.

pub mod auth;
pub mod config;
pub mod debug_log;
pub mod session;
