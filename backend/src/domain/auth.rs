//! Authentication primitives: sign-in and sign-up credentials.
//!
//! Constructors normalise the email and run the local password checks, so an
//! invalid sign-up is rejected before any request reaches the backend.

use zeroize::Zeroizing;

use super::AuthError;

/// Minimum password length, counted in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Normalise an email address for backend lookups: trim, then lowercase.
///
/// # Examples
/// ```
/// use pocketgate::domain::normalize_email;
///
/// assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
/// ```
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Sign-in credentials with a normalised email.
///
/// ## Invariants
/// - `email` is trimmed and lowercased.
/// - `password` keeps caller-provided whitespace.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Build credentials from raw inputs.
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: normalize_email(email),
            password: Zeroizing::new(password.to_owned()),
        }
    }

    /// Normalised email used as the backend identity.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sign-up request that passed local validation.
///
/// # Examples
/// ```
/// use pocketgate::domain::{AuthError, SignUpCredentials};
///
/// let err = SignUpCredentials::try_new("a@b.c", "short", "short").unwrap_err();
/// assert_eq!(err, AuthError::PasswordTooShort);
///
/// let ok = SignUpCredentials::try_new(" A@B.c", "longenough1", "longenough1").unwrap();
/// assert_eq!(ok.credentials().email(), "a@b.c");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpCredentials {
    credentials: Credentials,
    password_confirm: Zeroizing<String>,
}

impl SignUpCredentials {
    /// Validate raw sign-up inputs.
    ///
    /// Length is checked before the confirmation match.
    pub fn try_new(email: &str, password: &str, password_confirm: &str) -> Result<Self, AuthError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::PasswordTooShort);
        }
        if password != password_confirm {
            return Err(AuthError::PasswordsDoNotMatch);
        }
        Ok(Self {
            credentials: Credentials::new(email, password),
            password_confirm: Zeroizing::new(password_confirm.to_owned()),
        })
    }

    /// Credentials used for the follow-up sign-in.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Confirmation value forwarded to the backend.
    pub fn password_confirm(&self) -> &str {
        self.password_confirm.as_str()
    }
}
