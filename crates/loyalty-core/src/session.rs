//! Session store.
//!
//! Holds the authenticated user and token pair for the current process and
//! mirrors it to [`Storage`] under [`SESSION_KEY`]. Storage failures never
//! surface as errors: they are logged and the store degrades to logged-out.
//! Tokens are never logged or displayed in full.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::Storage;

/// Storage key for the persisted session.
pub const SESSION_KEY: &str = "loyalty_session";

/// User profile as returned by the backend.
///
/// Kept as the raw JSON object; accessors read the fields the client cares
/// about without constraining the rest of the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Map<String, Value>);

impl UserProfile {
    /// Builds a profile from a JSON value. Returns `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// User id as a string (numeric ids are stringified).
    pub fn id(&self) -> Option<String> {
        self.string_field(&["id", "_id"])
    }

    pub fn email(&self) -> Option<String> {
        self.string_field(&["email"])
    }

    pub fn name(&self) -> Option<String> {
        self.string_field(&["name", "full_name", "fullName"])
    }

    pub fn phone(&self) -> Option<String> {
        self.string_field(&["phone_number", "phone", "phoneNumber"])
    }

    pub fn business_id(&self) -> Option<String> {
        self.string_field(&["business_id", "businessId"])
    }

    pub fn role(&self) -> Option<String> {
        self.string_field(&["role"])
    }

    pub fn is_admin(&self) -> bool {
        self.flag(&["is_admin", "isAdmin"]) || self.role_is("admin")
    }

    pub fn is_staff(&self) -> bool {
        self.flag(&["is_staff", "isStaff"]) || self.role_is("staff")
    }

    fn role_is(&self, expected: &str) -> bool {
        self.role()
            .is_some_and(|role| role.eq_ignore_ascii_case(expected))
    }

    fn flag(&self, keys: &[&str]) -> bool {
        keys.iter()
            .any(|key| self.0.get(*key).and_then(Value::as_bool).unwrap_or(false))
    }

    fn string_field(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| match self.0.get(*key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }
}

/// Access/refresh token pair issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds, if the backend sent one.
    pub expires_in: Option<u64>,
}

/// Authenticated identity and credentials for the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: UserProfile,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Builds a session, turning `expires_in` into an absolute expiry.
    pub fn new(user: UserProfile, tokens: TokenPair) -> Self {
        let expires_at = tokens
            .expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(Duration::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));

        Self {
            user,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at,
        }
    }

    /// Returns true once the access token has passed its expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

/// Mask a token for display (show first 8 and last 4 chars).
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Process-wide session cell over an injected storage backend.
pub struct SessionStore {
    storage: Box<dyn Storage>,
    session: Option<Session>,
    initialized: bool,
}

impl SessionStore {
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
            session: None,
            initialized: false,
        }
    }

    /// Loads the persisted session into memory.
    ///
    /// Safe to call repeatedly. Missing, unreadable, corrupt or expired entries
    /// leave the store logged-out.
    pub fn initialize(&mut self) {
        self.initialized = true;
        self.session = self.load_persisted();
    }

    /// Runs [`Self::initialize`] only if it has not run yet.
    pub fn ensure_initialized(&mut self) {
        if !self.initialized {
            self.initialize();
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Replaces the current session with a new one, in memory and in storage.
    pub fn set_auth(&mut self, user: UserProfile, tokens: TokenPair) {
        self.set_session(Session::new(user, tokens));
    }

    /// Replaces the current session with `session`.
    pub fn set_session(&mut self, session: Session) {
        self.initialized = true;
        match serde_json::to_string(&session) {
            Ok(json) => {
                if let Err(err) = self.storage.write(SESSION_KEY, &json) {
                    tracing::warn!(error = %format!("{err:#}"), "failed to persist session");
                }
            }
            Err(err) => tracing::warn!(error = %err, "failed to serialize session"),
        }
        tracing::debug!(user_id = ?session.user.id(), "session established");
        self.session = Some(session);
    }

    /// Drops the session from memory and storage. Always succeeds.
    pub fn clear_auth(&mut self) {
        self.initialized = true;
        self.session = None;
        if let Err(err) = self.storage.remove(SESSION_KEY) {
            tracing::warn!(error = %format!("{err:#}"), "failed to remove persisted session");
        }
        tracing::debug!("session cleared");
    }

    /// Current session, if present and not expired.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref().filter(|s| !s.is_expired())
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.session().map(|s| &s.user)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.session().map(|s| s.access_token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    fn load_persisted(&self) -> Option<Session> {
        let raw = match self.storage.read(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "failed to read persisted session; starting logged out");
                return None;
            }
        };

        let session: Session = match serde_json::from_str(&raw) {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = %err, "persisted session is corrupt; starting logged out");
                return None;
            }
        };

        if session.access_token.is_empty() || session.refresh_token.is_empty() {
            tracing::warn!("persisted session has empty tokens; starting logged out");
            return None;
        }
        if session.is_expired() {
            tracing::debug!("persisted session expired; starting logged out");
            return None;
        }
        Some(session)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("initialized", &self.initialized)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
