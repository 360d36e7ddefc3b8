// File: rusty-forms/src/watch.rs
// Purpose: Change notification for watchers and async subscribers

use rusty_forms_types::{path, FieldPath, FieldValue};
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::broadcast;

use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::store::Form;

/// What kind of commit produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Value,
    Touched,
    Dirty,
    ArrayStructure,
    Reset,
    Validation,
    Submit,
}

/// One committed change
#[derive(Debug, Clone, Serialize)]
pub struct WatchEvent {
    /// Form values after the change
    pub values: FieldValue,
    /// Path the change was about, `None` for form-wide changes
    pub name: Option<FieldPath>,
    pub kind: ChangeKind,
    pub version: u64,
}

pub type WatchCallback = Arc<dyn Fn(&WatchEvent) -> anyhow::Result<()> + Send + Sync>;

/// Registered watchers plus the broadcast side of `subscribe()`
pub(crate) struct Watchers {
    next_id: u64,
    callbacks: Vec<(u64, WatchCallback)>,
    broadcast_tx: broadcast::Sender<WatchEvent>,
}

impl Watchers {
    pub(crate) fn new(capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(capacity);
        Self {
            next_id: 1,
            callbacks: Vec::new(),
            broadcast_tx,
        }
    }

    fn add(&mut self, callback: WatchCallback) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.callbacks.push((id, callback));
        id
    }

    fn remove(&mut self, id: u64) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        before != self.callbacks.len()
    }
}

pub(crate) fn lock_watchers(watchers: &Mutex<Watchers>) -> MutexGuard<'_, Watchers> {
    watchers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle returned by [`Form::watch`]
///
/// Dropping it keeps the watcher registered; call [`Subscription::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    watchers: Weak<Mutex<Watchers>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop receiving events; returns `false` if the form is already gone
    pub fn unsubscribe(self) -> bool {
        match self.watchers.upgrade() {
            Some(watchers) => lock_watchers(&watchers).remove(self.id),
            None => false,
        }
    }
}

impl Form {
    /// Call `callback` synchronously after every committed change
    ///
    /// Watchers run in registration order. One that errors or panics is
    /// reported to the form's sink; the others still run.
    pub fn watch<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&WatchEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = lock_watchers(&self.inner.watchers).add(Arc::new(callback));
        tracing::debug!(subscription = id, "watcher added");
        Subscription {
            id,
            watchers: Arc::downgrade(&self.inner.watchers),
        }
    }

    /// Watch a single path; `callback` runs only when its value changes
    pub fn watch_value<P, F>(&self, name: P, callback: F) -> Result<Subscription>
    where
        P: TryInto<FieldPath, Error = rusty_forms_types::PathError>,
        F: Fn(&FieldValue) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let name = name.try_into()?;
        let last = Mutex::new(self.get_value(&name)?);

        Ok(self.watch(move |event| {
            let current = path::get(&event.values, &name)?;
            let mut last = last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if *last == current {
                return Ok(());
            }
            *last = current.clone();
            drop(last);
            callback(&current)
        }))
    }

    /// Receive every event on a broadcast channel
    ///
    /// A receiver that falls behind sees `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        lock_watchers(&self.inner.watchers).broadcast_tx.subscribe()
    }

    /// Deliver `event` to watchers and subscribers
    ///
    /// Must be called without the state lock held.
    pub(crate) fn emit(&self, event: WatchEvent) {
        let callbacks = {
            let watchers = lock_watchers(&self.inner.watchers);
            // No receivers is fine
            let _ = watchers.broadcast_tx.send(event.clone());
            watchers.callbacks.clone()
        };

        for (id, callback) in callbacks {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| callback(&event)))
                .unwrap_or_else(|panic| Err(rusty_forms_validation::panic_error(panic)));
            if let Err(error) = result {
                self.inner.sink.report(Diagnostic::WatcherFault {
                    subscription: id,
                    error,
                });
            }
        }
    }

    pub(crate) fn emit_all(&self, events: impl IntoIterator<Item = WatchEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

