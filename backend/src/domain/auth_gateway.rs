//! Sign-in, sign-up and session lifecycle against the backend.
//!
//! Local validation runs before any network call. Backend failures are
//! classified here, once, and reach callers only as [`AuthError`] values.

use tracing::{debug, info, warn};

use super::auth_error::{classify_sign_in_error, classify_sign_up_error};
use super::{
    AuthError, AuthErrorCode, BackendHandle, Credentials, RawFailure, SignInFailureKind,
    SignUpCredentials, Subscription, UserRecord,
};

/// Authentication use-cases over a shared [`BackendHandle`].
#[derive(Debug, Clone)]
pub struct AuthGateway {
    backend: BackendHandle,
}

impl AuthGateway {
    /// Create a gateway over `backend`.
    pub fn new(backend: BackendHandle) -> Self {
        Self { backend }
    }

    /// Handle this gateway writes sessions into.
    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    /// Authenticate with email and password and store the session.
    ///
    /// The email is trimmed and lowercased before it reaches the backend.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserRecord, AuthError> {
        self.sign_in_with(&Credentials::new(email, password)).await
    }

    /// Create an account, then sign in with the same credentials.
    ///
    /// # Errors
    /// [`AuthError::PasswordTooShort`] and [`AuthError::PasswordsDoNotMatch`]
    /// are returned without contacting the backend. Creation failures are
    /// classified; a failure of the follow-up sign-in is returned as
    /// [`AuthError::SignInFailed`].
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<UserRecord, AuthError> {
        let account = SignUpCredentials::try_new(email, password, password_confirm)
            .inspect_err(|error| debug!(code = %error.code(), "sign-up rejected locally"))?;

        if let Err(failure) = self.backend.api().create_account(&account).await {
            let status = failure.status();
            let mut error = classify_sign_up_error(&RawFailure::from(failure));
            if error.code() == AuthErrorCode::Unknown
                && self.account_exists(account.credentials().email()).await
            {
                error = AuthError::user_exists();
            }
            warn!(code = %error.code(), status, "sign-up failed");
            return Err(error);
        }

        info!("account created");
        self.sign_in_with(account.credentials()).await
    }

    /// Drop the stored session. No backend round-trip.
    pub fn logout(&self) {
        self.backend.auth().clear();
        info!("signed out");
    }

    /// Observe `(is_valid, record)`: once now, then on every change.
    pub fn subscribe_auth(
        &self,
        observer: impl Fn(bool, Option<&UserRecord>) + Send + Sync + 'static,
    ) -> Subscription {
        self.backend.auth().subscribe(observer)
    }

    /// Exchange the stored token for a fresh session.
    ///
    /// Returns `Ok(None)` when no session is stored. A rejected token clears
    /// the store.
    pub async fn refresh(&self) -> Result<Option<UserRecord>, AuthError> {
        let Some(token) = self.backend.auth().token() else {
            return Ok(None);
        };
        match self.backend.api().refresh_auth(&token).await {
            Ok(session) => {
                let record = session.record().clone();
                self.backend.auth().save(session);
                debug!("session refreshed");
                Ok(Some(record))
            }
            Err(failure) => {
                let error = classify_sign_in_error(&failure);
                if matches!(
                    error,
                    AuthError::SignInFailed {
                        kind: SignInFailureKind::InvalidCredentials,
                        ..
                    }
                ) {
                    self.backend.auth().clear();
                }
                warn!(status = failure.status(), error = %error, "session refresh failed");
                Err(error)
            }
        }
    }

    async fn sign_in_with(&self, credentials: &Credentials) -> Result<UserRecord, AuthError> {
        match self.backend.api().authenticate(credentials).await {
            Ok(session) => {
                let record = session.record().clone();
                self.backend.auth().save(session);
                info!(user_id = %record.id, "signed in");
                Ok(record)
            }
            Err(failure) => {
                let error = classify_sign_in_error(&failure);
                warn!(status = failure.status(), error = %error, "sign-in failed");
                Err(error)
            }
        }
    }

    async fn account_exists(&self, email: &str) -> bool {
        match self.backend.api().email_registered(email).await {
            Ok(exists) => exists,
            Err(error) => {
                debug!(status = error.status(), "existing-account probe failed");
                false
            }
        }
    }
}
