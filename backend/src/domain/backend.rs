//! Shared backend client handle.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use super::AuthStore;
use super::ports::PocketBaseApi;

/// The single handle to the PocketBase backend.
///
/// Built once at process start and passed explicitly to every component that
/// needs the backend. Clones share the same API client and auth store.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use pocketgate::domain::BackendHandle;
/// use pocketgate::domain::ports::FixturePocketBase;
///
/// let handle = BackendHandle::new(Arc::new(FixturePocketBase::default()));
/// assert!(!handle.auth().is_valid());
/// ```
#[derive(Clone)]
pub struct BackendHandle {
    api: Arc<dyn PocketBaseApi>,
    auth: Arc<AuthStore>,
}

impl BackendHandle {
    /// Wrap `api` with a fresh auth store on the system clock.
    pub fn new(api: Arc<dyn PocketBaseApi>) -> Self {
        Self::with_clock(api, Arc::new(DefaultClock))
    }

    /// Wrap `api` with a fresh auth store evaluating expiry on `clock`.
    pub fn with_clock(api: Arc<dyn PocketBaseApi>, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            auth: Arc::new(AuthStore::new(clock)),
        }
    }

    /// Backend port.
    pub fn api(&self) -> &Arc<dyn PocketBaseApi> {
        &self.api
    }

    /// Auth token store.
    pub fn auth(&self) -> &Arc<AuthStore> {
        &self.auth
    }

    /// Base URL of the backend.
    pub fn base_url(&self) -> String {
        self.api.base_url()
    }
}

impl std::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("base_url", &self.api.base_url())
            .field("auth", &self.auth)
            .finish()
    }
}
