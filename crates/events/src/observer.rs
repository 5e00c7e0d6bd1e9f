//! Typed observer subject.
//!
//! Subscribers are either objects implementing [`Observer`] or plain closures;
//! both are stored behind the same trait object and removed through the
//! [`SubscriptionId`] returned at subscription time.

use std::sync::Arc;

use thiserror::Error;

/// A subscriber callback failed while handling an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    #[error("callback for '{target}' failed: {message}")]
    Execution { target: String, message: String },
}

impl CallbackError {
    pub fn execution(target: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::Execution {
            target: target.into(),
            message: format!("{err:#}"),
        }
    }
}

/// Receives events of type `E`.
///
/// Closures of the shape `Fn(&E) -> anyhow::Result<()>` implement this trait
/// directly.
pub trait Observer<E>: Send + Sync {
    fn update(&self, event: &E) -> anyhow::Result<()>;
}

impl<E, F> Observer<E> for F
where
    F: Fn(&E) -> anyhow::Result<()> + Send + Sync,
{
    fn update(&self, event: &E) -> anyhow::Result<()> {
        self(event)
    }
}

/// Handle returned by [`ObserverSubject::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Set of subscribers notified in subscription order.
pub struct ObserverSubject<E> {
    name: &'static str,
    observers: Vec<(SubscriptionId, Arc<dyn Observer<E>>)>,
    next_id: u64,
}

impl<E> ObserverSubject<E> {
    /// `name` identifies the subject in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            observers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn Observer<E>>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, observer));
        tracing::debug!(subject = self.name, subscribers = self.observers.len(), "observer subscribed");
        id
    }

    pub fn subscribe_fn<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(callback))
    }

    /// Remove a subscriber. Returns false if the handle was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub_id, _)| *sub_id != id);
        self.observers.len() != before
    }

    /// Deliver `event` to every subscriber.
    ///
    /// A failing subscriber is logged and skipped; the others still run.
    /// Returns the failures, in subscription order.
    pub fn notify(&self, event: &E) -> Vec<CallbackError> {
        let mut failures = Vec::new();

        for (id, observer) in &self.observers {
            if let Err(e) = observer.update(event) {
                let error = CallbackError::execution(format!("{}#{}", self.name, id.0), &e);
                tracing::warn!(subject = self.name, error = %error, "observer failed");
                failures.push(error);
            }
        }

        failures
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn clear(&mut self) {
        self.observers.clear();
    }
}

impl<E> std::fmt::Debug for ObserverSubject<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSubject")
            .field("name", &self.name)
            .field("subscribers", &self.observers.len())
            .finish()
    }
}
