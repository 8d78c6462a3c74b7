#![forbid(unsafe_code)]

//! Disposable subscription handles and the copy-on-write subscriber list
//! shared by every observable source in this crate.
//!
//! # Design
//!
//! A [`SubscriberList<E>`] stores its entries in an [`ArcSwap`] snapshot.
//! Notification loads the current snapshot without locking the list and
//! invokes each entry that is still active, so callbacks are free to
//! subscribe, dispose or push re-entrantly. Each entry records the threads
//! currently inside its callback so that disposal can wait for them.
//! Mutation (insert/remove/drain) replaces the snapshot via `rcu`.
//!
//! # Invariants
//!
//! 1. Entries are notified in insertion order.
//! 2. Once [`Subscription::dispose`] returns, the callback is not running on
//!    any other thread and no notification calls it again, including one
//!    already in flight.
//! 3. A callback may dispose its own subscription; disposal from inside the
//!    callback does not wait for itself.
//! 4. Disposal is idempotent and safe after the source is gone.
//!
//! # Failure Modes
//!
//! - **Cross-thread disposal cycles**: a callback that disposes a second
//!   subscription while another thread, inside that second callback, disposes
//!   the first will deadlock. Each side waits for the other to return.

use std::any::type_name;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

use arc_swap::ArcSwap;

type Callback<E> = Box<dyn Fn(&E) + Send + Sync>;
type Cancel = Box<dyn FnOnce() + Send>;

struct Entry<E> {
    id: u64,
    active: AtomicBool,
    /// Threads currently inside `callback`. A thread appears once per
    /// nested call.
    running: Mutex<Vec<ThreadId>>,
    idle: Condvar,
    callback: Callback<E>,
}

impl<E> Entry<E> {
    fn new(id: u64, callback: Callback<E>) -> Self {
        Self {
            id,
            active: AtomicBool::new(true),
            running: Mutex::new(Vec::new()),
            idle: Condvar::new(),
            callback,
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }

    fn running(&self) -> MutexGuard<'_, Vec<ThreadId>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admission check and registration as one step under `running`.
    fn enter(&self, admit: impl FnOnce(&Self) -> bool) -> Option<Call<'_, E>> {
        let mut running = self.running();
        if !admit(self) {
            return None;
        }
        running.push(thread::current().id());
        Some(Call { entry: self })
    }

    /// Run the callback if the entry is still active.
    fn invoke(&self, event: &E) {
        if let Some(_call) = self.enter(Self::is_active) {
            (self.callback)(event);
        }
    }

    /// Deactivate, running the callback one last time if this call was the
    /// one that deactivated.
    fn invoke_last(&self, event: &E) {
        if let Some(_call) = self.enter(Self::deactivate) {
            (self.callback)(event);
        }
    }

    /// Deactivate, then wait until no other thread is inside the callback.
    fn shut(&self) {
        self.deactivate();
        let me = thread::current().id();
        let running = self.running();
        let _idle = self
            .idle
            .wait_while(running, |running| running.iter().any(|id| *id != me))
            .unwrap_or_else(PoisonError::into_inner);
    }
}

/// One thread's presence inside an entry's callback. Removed on return or
/// unwind.
struct Call<'a, E> {
    entry: &'a Entry<E>,
}

impl<E> Drop for Call<'_, E> {
    fn drop(&mut self) {
        let me = thread::current().id();
        let mut running = self.entry.running();
        if let Some(pos) = running.iter().position(|id| *id == me) {
            running.swap_remove(pos);
        }
        drop(running);
        self.entry.idle.notify_all();
    }
}

struct Shared<E> {
    entries: ArcSwap<Vec<Arc<Entry<E>>>>,
    next_id: AtomicU64,
}

/// Ordered, multicast list of callbacks receiving `&E`.
pub(crate) struct SubscriberList<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for SubscriberList<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: 'static> SubscriberList<E> {
    pub(crate) fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                entries: ArcSwap::from_pointee(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Append `callback` and return the handle that removes it.
    pub(crate) fn insert(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(Entry::new(id, Box::new(callback)));
        let weak_entry = Arc::downgrade(&entry);
        self.shared.entries.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&entry));
            next
        });

        let weak_list: Weak<Shared<E>> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(entry) = weak_entry.upgrade() {
                entry.shut();
            }
            if let Some(shared) = weak_list.upgrade() {
                SubscriberList { shared }.remove(id);
            }
        })
    }

    fn remove(&self, id: u64) {
        self.shared.entries.rcu(|current| {
            current
                .iter()
                .filter(|entry| entry.id != id)
                .cloned()
                .collect::<Vec<_>>()
        });
    }

    /// Invoke every active entry with `event`, in insertion order.
    pub(crate) fn notify(&self, event: &E) {
        let snapshot = self.shared.entries.load_full();
        for entry in snapshot.iter() {
            entry.invoke(event);
        }
    }

    /// Empty the list, then deliver `event` once to each entry that was
    /// active. Each drained entry is deactivated before its callback runs.
    pub(crate) fn drain_with(&self, event: &E) {
        let drained = self.shared.entries.swap(Arc::new(Vec::new()));
        for entry in drained.iter() {
            entry.invoke_last(event);
        }
    }

}

impl<E> SubscriberList<E> {
    pub(crate) fn len(&self) -> usize {
        self.shared.entries.load().len()
    }
}

impl<E> std::fmt::Debug for SubscriberList<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberList")
            .field("event", &type_name::<E>())
            .field("len", &self.len())
            .finish()
    }
}

/// RAII guard for a registered observer.
///
/// Dropping the `Subscription` disposes it. [`dispose`](Self::dispose) may
/// also be called explicitly through a shared reference; repeated calls are
/// no-ops. Use [`detach`](Self::detach) to leave the observer registered for
/// as long as its source lives.
#[must_use = "dropping a Subscription unsubscribes the observer"]
pub struct Subscription {
    cancel: Mutex<Option<Cancel>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// A subscription that is already disposed.
    ///
    /// Returned by sources that have completed.
    pub fn empty() -> Self {
        Self {
            cancel: Mutex::new(None),
        }
    }

    /// Remove the observer from its source. Idempotent.
    ///
    /// Blocks while the observer is running on another thread. When called
    /// from inside the observer itself it returns without waiting.
    pub fn dispose(&self) {
        let cancel = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Whether this subscription has been disposed (or detached).
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Give up the handle without unsubscribing.
    ///
    /// The observer stays registered until its source completes or is dropped.
    pub fn detach(self) {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
