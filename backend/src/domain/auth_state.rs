//! Read-only projection of the current authentication state.

use serde::Serialize;

use super::{AuthStore, Observable, Subscription, UserRecord};

/// Snapshot of who is signed in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthSnapshot {
    /// Signed-in user, if any.
    pub user: Option<UserRecord>,
}

impl AuthSnapshot {
    /// Whether a user is signed in. Derived from `user` on every call.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Process-wide auth state fed by the auth store's change notifications.
///
/// The observer has no write API; it changes only when the store does.
///
/// # Examples
/// ```
/// use std::sync::Arc;
///
/// use mockable::DefaultClock;
/// use pocketgate::domain::{AuthSession, AuthStateObserver, AuthStore, UserRecord};
///
/// let store = AuthStore::new(Arc::new(DefaultClock));
/// let state = AuthStateObserver::new(&store);
/// assert!(!state.is_authenticated());
///
/// store.save(AuthSession::new("token", UserRecord::default()));
/// assert!(state.is_authenticated());
/// ```
#[derive(Debug)]
pub struct AuthStateObserver {
    snapshot: Observable<AuthSnapshot>,
    _feed: Subscription,
}

impl AuthStateObserver {
    /// Start observing `store`, seeded with its current record.
    pub fn new(store: &AuthStore) -> Self {
        let snapshot = Observable::new(AuthSnapshot::default());
        let sink = snapshot.clone();
        // The immediate call seeds the snapshot before any later change.
        let feed = store.subscribe(move |_, user| {
            sink.set(AuthSnapshot {
                user: user.cloned(),
            });
        });
        Self {
            snapshot,
            _feed: feed,
        }
    }

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshot.get()
    }

    /// Current user, if any.
    pub fn user(&self) -> Option<UserRecord> {
        self.snapshot.with(|snapshot| snapshot.user.clone())
    }

    /// Whether a user is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.snapshot.with(AuthSnapshot::is_authenticated)
    }

    /// Observe snapshots, starting with the current one.
    pub fn subscribe(
        &self,
        observer: impl Fn(&AuthSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        self.snapshot.subscribe(observer)
    }
}
