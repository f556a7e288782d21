//! Framework-independent observable cell.
//!
//! An [`Observable`] holds one current value and notifies registered observers
//! whenever it changes. Reads are synchronous, so consumers can always ask for
//! the latest value without waiting for a notification.
//!
//! Notifications are serialised: observers see values in the order they were
//! set, and a subscriber registered with [`Observable::subscribe`] receives
//! the current value before any later change. Observers run with no lock held,
//! so they may set, subscribe to, or unsubscribe from the cell they observe.
//! A change made while notifications are being delivered is queued and
//! delivered once the earlier ones finish.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Entry<T> {
    id: u64,
    observer: Observer<T>,
    /// Set once the observer's registration has been processed in order.
    active: bool,
}

struct Registry<T> {
    next_id: u64,
    observers: Vec<Entry<T>>,
}

/// Pending notification work, processed strictly in order.
enum Job<T> {
    /// Deliver a new value to every active observer.
    Notify(T),
    /// Activate observer `id`, first handing it `initial` when present.
    Activate { id: u64, initial: Option<T> },
}

struct Emission<T> {
    pending: VecDeque<Job<T>>,
    draining: bool,
}

struct Shared<T> {
    value: RwLock<T>,
    registry: Mutex<Registry<T>>,
    emission: Mutex<Emission<T>>,
}

impl<T> Shared<T> {
    fn registry(&self) -> MutexGuard<'_, Registry<T>> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emission(&self) -> MutexGuard<'_, Emission<T>> {
        self.emission
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the drain role if an observer panics mid-delivery.
struct DrainReset<'a, T>(&'a Shared<T>);

impl<T> Drop for DrainReset<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut emission = self.0.emission();
            emission.pending.clear();
            emission.draining = false;
        }
    }
}

/// Shared, cloneable handle to an observable value.
///
/// # Examples
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use pocketgate::domain::Observable;
///
/// let cell = Observable::new(1_u32);
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// let subscription = cell.subscribe(move |value| sink.lock().unwrap().push(*value));
///
/// cell.set(2);
/// subscription.unsubscribe();
/// cell.set(3);
///
/// assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
/// assert_eq!(cell.get(), 3);
/// ```
pub struct Observable<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    /// Create a cell holding `initial`.
    pub fn new(initial: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                value: RwLock::new(initial),
                registry: Mutex::new(Registry {
                    next_id: 0,
                    observers: Vec::new(),
                }),
                emission: Mutex::new(Emission {
                    pending: VecDeque::new(),
                    draining: false,
                }),
            }),
        }
    }

    /// Return a copy of the current value.
    pub fn get(&self) -> T {
        self.shared
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, read: impl FnOnce(&T) -> R) -> R {
        let guard = self
            .shared
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        read(&guard)
    }

    /// Replace the current value and notify every observer.
    ///
    /// When called from an observer, or while another thread is delivering,
    /// the notification is queued behind the ones already pending.
    pub fn set(&self, value: T) {
        let mut emission = self.shared.emission();
        *self
            .shared
            .value
            .write()
            .unwrap_or_else(PoisonError::into_inner) = value.clone();
        emission.pending.push_back(Job::Notify(value));
        self.drain(emission);
    }

    /// Register `observer`, calling it with the current value first.
    ///
    /// The initial call precedes every change-triggered call. It happens
    /// before this method returns unless notifications are already being
    /// delivered, in which case it is queued behind them.
    pub fn subscribe(&self, observer: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.register(Arc::new(observer), true)
    }

    /// Register `observer` for future changes only.
    pub fn on_change(&self, observer: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.register(Arc::new(observer), false)
    }

    /// Number of observers currently registered.
    pub fn observer_count(&self) -> usize {
        self.shared.registry().observers.len()
    }

    fn register(&self, observer: Observer<T>, with_initial: bool) -> Subscription {
        let mut emission = self.shared.emission();
        let id = {
            let mut registry = self.shared.registry();
            let id = registry.next_id;
            registry.next_id = registry.next_id.wrapping_add(1);
            registry.observers.push(Entry {
                id,
                observer,
                active: false,
            });
            id
        };
        let initial = with_initial.then(|| self.get());
        emission.pending.push_back(Job::Activate { id, initial });
        self.drain(emission);

        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.registry().observers.retain(|entry| entry.id != id);
            }
        })
    }

    /// Deliver pending jobs unless another caller already is.
    ///
    /// Observers are called with neither lock held.
    fn drain(&self, mut emission: MutexGuard<'_, Emission<T>>) {
        if emission.draining {
            return;
        }
        emission.draining = true;
        drop(emission);

        let _reset = DrainReset(&self.shared);
        loop {
            let job = {
                let mut emission = self.shared.emission();
                match emission.pending.pop_front() {
                    Some(job) => job,
                    None => {
                        emission.draining = false;
                        return;
                    }
                }
            };
            self.run(job);
        }
    }

    fn run(&self, job: Job<T>) {
        match job {
            Job::Notify(value) => {
                let observers: Vec<Observer<T>> = self
                    .shared
                    .registry()
                    .observers
                    .iter()
                    .filter(|entry| entry.active)
                    .map(|entry| Arc::clone(&entry.observer))
                    .collect();
                for observer in observers {
                    observer(&value);
                }
            }
            Job::Activate { id, initial } => {
                let observer = self
                    .shared
                    .registry()
                    .observers
                    .iter_mut()
                    .find(|entry| entry.id == id)
                    .map(|entry| {
                        entry.active = true;
                        Arc::clone(&entry.observer)
                    });
                if let (Some(observer), Some(initial)) = (observer, initial) {
                    observer(&initial);
                }
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self
            .shared
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Observable").field("value", &*value).finish()
    }
}

/// Unsubscribe capability returned by observable sources.
///
/// Dropping the subscription unregisters the observer.
#[must_use = "dropping a Subscription unregisters its observer immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Stop receiving notifications.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
