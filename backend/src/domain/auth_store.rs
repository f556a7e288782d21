//! Process-wide auth token store.
//!
//! The store owns the current [`AuthSession`] and broadcasts every change to
//! its observers. Validity is derived from the token on each read: a token is
//! valid while its JWT payload decodes and its `exp` claim, when present, lies
//! in the future.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use mockable::Clock;
use serde_json::{Map, Value};

use super::{AuthSession, Observable, Subscription, UserRecord};

/// Shared store for the authenticated session.
pub struct AuthStore {
    session: Observable<Option<AuthSession>>,
    clock: Arc<dyn Clock>,
}

impl AuthStore {
    /// Create an empty store evaluating expiry against `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            session: Observable::new(None),
            clock,
        }
    }

    /// Store `session`, replacing any previous one.
    pub fn save(&self, session: AuthSession) {
        self.session.set(Some(session));
    }

    /// Drop the stored session.
    pub fn clear(&self) {
        self.session.set(None);
    }

    /// Current raw token, if any.
    pub fn token(&self) -> Option<String> {
        self.session
            .with(|session| session.as_ref().map(|s| s.token().to_owned()))
    }

    /// Current user record, if any.
    pub fn record(&self) -> Option<UserRecord> {
        self.session
            .with(|session| session.as_ref().map(|s| s.record().clone()))
    }

    /// Copy of the stored session.
    pub fn session(&self) -> Option<AuthSession> {
        self.session.get()
    }

    /// Whether the stored token is present and unexpired.
    pub fn is_valid(&self) -> bool {
        self.session
            .with(|session| session.as_ref().is_some_and(|s| self.token_is_valid(s.token())))
    }

    /// Observe `(is_valid, record)`, starting with the current state.
    pub fn subscribe(
        &self,
        observer: impl Fn(bool, Option<&UserRecord>) + Send + Sync + 'static,
    ) -> Subscription {
        let clock = Arc::clone(&self.clock);
        self.session.subscribe(move |session| {
            notify(clock.as_ref(), session.as_ref(), &observer);
        })
    }

    /// Observe `(is_valid, record)` for changes only.
    pub fn on_change(
        &self,
        observer: impl Fn(bool, Option<&UserRecord>) + Send + Sync + 'static,
    ) -> Subscription {
        let clock = Arc::clone(&self.clock);
        self.session.on_change(move |session| {
            notify(clock.as_ref(), session.as_ref(), &observer);
        })
    }

    fn token_is_valid(&self, token: &str) -> bool {
        token_is_valid(self.clock.as_ref(), token)
    }
}

impl std::fmt::Debug for AuthStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthStore")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

fn notify(
    clock: &dyn Clock,
    session: Option<&AuthSession>,
    observer: &impl Fn(bool, Option<&UserRecord>),
) {
    let valid = session.is_some_and(|s| token_is_valid(clock, s.token()));
    observer(valid, session.map(AuthSession::record));
}

fn token_is_valid(clock: &dyn Clock, token: &str) -> bool {
    let Some(claims) = decode_claims(token) else {
        return false;
    };
    match claims.get("exp").and_then(Value::as_i64) {
        Some(exp) => exp > clock.utc().timestamp(),
        None => !claims.contains_key("exp"),
    }
}

/// Decode the payload segment of a JWT without verifying its signature.
fn decode_claims(token: &str) -> Option<Map<String, Value>> {
    let mut segments = token.split('.');
    let (_header, payload) = (segments.next()?, segments.next()?);
    segments.next()?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    match serde_json::from_slice::<Value>(&bytes).ok()? {
        Value::Object(claims) if !claims.is_empty() => Some(claims),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) fn test_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}
