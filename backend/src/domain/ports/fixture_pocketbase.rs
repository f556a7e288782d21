//! In-memory PocketBase stand-in.
//!
//! `FixturePocketBase` mimics the backend behaviour the gateway depends on:
//! unique emails, server-side password rules, password authentication, token
//! refresh, and the health endpoint. It backs the `pb-auth` demo mode and the
//! behaviour tests without a running PocketBase instance.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::json;
use zeroize::Zeroizing;

use super::{ClientResponseError, HealthCheckResponse, PocketBaseApi};
use crate::domain::auth_error::NOT_UNIQUE_CODE;
use crate::domain::{AuthSession, Credentials, MIN_PASSWORD_LENGTH, SignUpCredentials, UserRecord};

const FIXTURE_URL: &str = "http://fixture.pocketbase.invalid";
const FIXTURE_TIMESTAMP: &str = "2024-01-01 00:00:00.000Z";

struct StoredUser {
    record: UserRecord,
    password: Zeroizing<String>,
}

struct State {
    users: Vec<StoredUser>,
    tokens: HashMap<String, String>,
    issued: u64,
    health: HealthCheckResponse,
}

/// Which backend call a counter refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureCall {
    /// `create_account`.
    CreateAccount,
    /// `authenticate`.
    Authenticate,
    /// `refresh_auth`.
    RefreshAuth,
    /// `check_health`.
    CheckHealth,
    /// `email_registered`.
    EmailRegistered,
}

/// In-memory backend with call counters and an unreachable switch.
pub struct FixturePocketBase {
    base_url: String,
    state: Mutex<State>,
    unreachable: AtomicBool,
    calls: [AtomicUsize; 5],
}

impl Default for FixturePocketBase {
    fn default() -> Self {
        Self::new(FIXTURE_URL)
    }
}

impl FixturePocketBase {
    /// Create an empty, healthy fixture reporting `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            state: Mutex::new(State {
                users: Vec::new(),
                tokens: HashMap::new(),
                issued: 0,
                health: HealthCheckResponse {
                    code: 200,
                    message: "API is healthy.".to_owned(),
                },
            }),
            unreachable: AtomicBool::new(false),
            calls: Default::default(),
        }
    }

    /// Register an account directly, bypassing validation.
    pub fn with_user(self, email: &str, password: &str) -> Self {
        {
            let mut state = self.lock();
            let record = new_record(state.users.len(), email.to_owned());
            state.users.push(StoredUser {
                record,
                password: Zeroizing::new(password.to_owned()),
            });
        }
        self
    }

    /// Make every call fail as a transport error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Override the body served by the health endpoint.
    pub fn set_health(&self, code: u16, message: &str) {
        self.lock().health = HealthCheckResponse {
            code,
            message: message.to_owned(),
        };
    }

    /// Number of times `call` reached the fixture.
    pub fn calls(&self, call: FixtureCall) -> usize {
        self.counter(call).load(Ordering::SeqCst)
    }

    /// Number of stored accounts.
    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }

    fn counter(&self, call: FixtureCall) -> &AtomicUsize {
        let index = match call {
            FixtureCall::CreateAccount => 0,
            FixtureCall::Authenticate => 1,
            FixtureCall::RefreshAuth => 2,
            FixtureCall::CheckHealth => 3,
            FixtureCall::EmailRegistered => 4,
        };
        &self.calls[index]
    }

    fn enter(&self, call: FixtureCall, path: &str) -> Result<String, ClientResponseError> {
        self.counter(call).fetch_add(1, Ordering::SeqCst);
        let url = format!("{}{path}", self.base_url);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ClientResponseError::transport(url, "connection refused"));
        }
        Ok(url)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn new_record(index: usize, email: String) -> UserRecord {
    UserRecord {
        id: format!("fixture{index:08}"),
        email,
        verified: false,
        email_visibility: true,
        created: FIXTURE_TIMESTAMP.to_owned(),
        updated: FIXTURE_TIMESTAMP.to_owned(),
        collection_id: Some("_pb_users_auth_".to_owned()),
        collection_name: Some("users".to_owned()),
        username: None,
    }
}

/// Issue a JWT-shaped token without an `exp` claim.
fn issue_token(state: &mut State, record: &UserRecord) -> String {
    state.issued += 1;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = json!({ "id": record.id, "type": "auth", "n": state.issued });
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    let token = format!("{header}.{payload}.fixture");
    state.tokens.insert(token.clone(), record.id.clone());
    token
}

fn field_error(code: &str, message: &str) -> serde_json::Value {
    json!({ "code": code, "message": message })
}

#[async_trait]
impl PocketBaseApi for FixturePocketBase {
    fn base_url(&self) -> String {
        self.base_url.clone()
    }

    async fn create_account(
        &self,
        account: &SignUpCredentials,
    ) -> Result<UserRecord, ClientResponseError> {
        let url = self.enter(FixtureCall::CreateAccount, "/api/collections/users/records")?;
        let credentials = account.credentials();
        let mut data = serde_json::Map::new();
        if !credentials.email().contains('@') {
            data.insert(
                "email".to_owned(),
                field_error("validation_is_email", "Must be a valid email address."),
            );
        }
        if credentials.password().chars().count() < MIN_PASSWORD_LENGTH {
            data.insert(
                "password".to_owned(),
                field_error(
                    "validation_length_out_of_range",
                    "The length must be between 8 and 72.",
                ),
            );
        }
        if credentials.password() != account.password_confirm() {
            data.insert(
                "passwordConfirm".to_owned(),
                field_error("validation_values_mismatch", "Values don't match."),
            );
        }

        let mut state = self.lock();
        if state
            .users
            .iter()
            .any(|user| user.record.email == credentials.email())
        {
            data.insert(
                "email".to_owned(),
                field_error(NOT_UNIQUE_CODE, "Value must be unique."),
            );
        }
        if !data.is_empty() {
            return Err(ClientResponseError::new(url, 400)
                .with_message("Failed to create record.")
                .with_data(serde_json::Value::Object(data)));
        }

        let record = new_record(state.users.len(), credentials.email().to_owned());
        state.users.push(StoredUser {
            record: record.clone(),
            password: Zeroizing::new(credentials.password().to_owned()),
        });
        Ok(record)
    }

    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<AuthSession, ClientResponseError> {
        let url = self.enter(
            FixtureCall::Authenticate,
            "/api/collections/users/auth-with-password",
        )?;
        let mut state = self.lock();
        let record = state
            .users
            .iter()
            .find(|user| {
                user.record.email == credentials.email()
                    && user.password.as_str() == credentials.password()
            })
            .map(|user| user.record.clone())
            .ok_or_else(|| {
                ClientResponseError::new(url, 400).with_message("Failed to authenticate.")
            })?;
        let token = issue_token(&mut state, &record);
        Ok(AuthSession::new(token, record))
    }

    async fn refresh_auth(&self, token: &str) -> Result<AuthSession, ClientResponseError> {
        let url = self.enter(FixtureCall::RefreshAuth, "/api/collections/users/auth-refresh")?;
        let mut state = self.lock();
        let record = state
            .tokens
            .remove(token)
            .and_then(|id| {
                state
                    .users
                    .iter()
                    .find(|user| user.record.id == id)
                    .map(|user| user.record.clone())
            })
            .ok_or_else(|| {
                ClientResponseError::new(url, 401)
                    .with_message("The request requires valid record authorization token.")
            })?;
        let token = issue_token(&mut state, &record);
        Ok(AuthSession::new(token, record))
    }

    async fn check_health(&self) -> Result<HealthCheckResponse, ClientResponseError> {
        self.enter(FixtureCall::CheckHealth, "/api/health")?;
        Ok(self.lock().health.clone())
    }

    async fn email_registered(&self, email: &str) -> Result<bool, ClientResponseError> {
        self.enter(FixtureCall::EmailRegistered, "/api/collections/users/records")?;
        Ok(self.lock().users.iter().any(|user| user.record.email == email))
    }
}
