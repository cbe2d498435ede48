//! Access gate for privileged views.
//!
//! A guard starts in [`GuardState::Checking`] and only exposes the user once
//! the check has completed with [`GuardState::Granted`].

use std::fmt;

use crate::session::{SessionStore, UserProfile};

/// Entry point for unauthenticated users.
pub const LOGIN_PATH: &str = "/login";
/// Generic landing page for users lacking a privilege.
pub const LANDING_PATH: &str = "/";

/// What a protected view requires of the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Requirement {
    /// Any authenticated user.
    #[default]
    Authenticated,
    Admin,
    Staff,
}

impl Requirement {
    fn is_met_by(self, user: &UserProfile) -> bool {
        match self {
            Requirement::Authenticated => true,
            Requirement::Admin => user.is_admin(),
            Requirement::Staff => user.is_staff(),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Requirement::Authenticated => "authenticated",
            Requirement::Admin => "admin",
            Requirement::Staff => "staff",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    Login,
    Landing,
}

impl RedirectTarget {
    pub fn path(self) -> &'static str {
        match self {
            RedirectTarget::Login => LOGIN_PATH,
            RedirectTarget::Landing => LANDING_PATH,
        }
    }
}

impl fmt::Display for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardState {
    /// Check not completed yet; render a placeholder.
    Checking,
    Granted(UserProfile),
    Redirect(RedirectTarget),
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    requirement: Requirement,
    state: GuardState,
}

impl RouteGuard {
    pub fn new(requirement: Requirement) -> Self {
        Self {
            requirement,
            state: GuardState::Checking,
        }
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    /// Resolves the guard against the store, initializing it first if needed.
    pub fn check(&mut self, store: &mut SessionStore) -> &GuardState {
        store.ensure_initialized();

        self.state = match store.user() {
            None => GuardState::Redirect(RedirectTarget::Login),
            Some(user) if !self.requirement.is_met_by(user) => {
                GuardState::Redirect(RedirectTarget::Landing)
            }
            Some(user) => GuardState::Granted(user.clone()),
        };

        if let GuardState::Redirect(target) = &self.state {
            tracing::debug!(requirement = %self.requirement, %target, "access denied; redirecting");
        }
        &self.state
    }

    /// The user, only once access has been granted.
    pub fn protected_user(&self) -> Option<&UserProfile> {
        match &self.state {
            GuardState::Granted(user) => Some(user),
            GuardState::Checking | GuardState::Redirect(_) => None,
        }
    }

    pub fn redirect(&self) -> Option<RedirectTarget> {
        match self.state {
            GuardState::Redirect(target) => Some(target),
            GuardState::Checking | GuardState::Granted(_) => None,
        }
    }
}
