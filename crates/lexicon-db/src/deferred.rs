//! Single-slot deferred results.
//!
//! A [`Deferred`] is handed back to the caller before the store operation
//! behind it has finished. It has two channels, success and error, and each
//! channel accepts at most one value and at most one consumer. Whichever
//! side shows up first waits for the other:
//!
//! ```text
//! success(v) then on_success(f)  -->  f(v) runs inside on_success
//! on_success(f) then success(v)  -->  f(v) runs inside success
//! ```
//!
//! There are no combinators and no cancellation. Callers that prefer
//! `async`/`.await` can await the handle directly through [`IntoFuture`];
//! that subscribes both channels and resolves with whichever fires.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::error::DbError;

/// Consumer callback for one channel.
type Callback<V> = Box<dyn FnOnce(V) + Send + 'static>;

/// State of one channel of a [`Deferred`].
enum Channel<V> {
    /// Neither a value nor a consumer yet.
    Empty,
    /// The producer delivered before anyone subscribed.
    Stored(V),
    /// A consumer subscribed before the producer delivered.
    Waiting(Callback<V>),
    /// The value has been handed to its consumer.
    Delivered,
}

/// A value and the consumer it must be passed to.
type Handoff<V> = (Callback<V>, V);

impl<V> Channel<V> {
    /// Record a produced value. Returns the pending hand-off if a consumer
    /// was already waiting.
    fn produce(&mut self, value: V, channel: &'static str) -> Option<Handoff<V>> {
        match std::mem::replace(self, Self::Delivered) {
            Self::Empty => {
                *self = Self::Stored(value);
                None
            }
            Self::Waiting(callback) => Some((callback, value)),
            Self::Stored(existing) => {
                *self = Self::Stored(existing);
                tracing::warn!(channel, "Deferred channel already holds a value; ignoring");
                None
            }
            Self::Delivered => {
                tracing::warn!(channel, "Deferred channel already delivered; ignoring");
                None
            }
        }
    }

    /// Register the consumer. Returns the pending hand-off if a value was
    /// already stored.
    fn subscribe(&mut self, callback: Callback<V>, channel: &'static str) -> Option<Handoff<V>> {
        match std::mem::replace(self, Self::Delivered) {
            Self::Empty => {
                *self = Self::Waiting(callback);
                None
            }
            Self::Stored(value) => Some((callback, value)),
            Self::Waiting(existing) => {
                *self = Self::Waiting(existing);
                tracing::warn!(channel, "Deferred channel already has a consumer; ignoring");
                None
            }
            Self::Delivered => {
                tracing::warn!(channel, "Deferred channel already delivered; ignoring");
                None
            }
        }
    }
}

/// Both channels of a [`Deferred`].
struct Slots<T> {
    success: Channel<T>,
    error: Channel<DbError>,
}

/// Eventual outcome of one asynchronous data-layer operation.
///
/// Cloning yields another handle to the same slots; the usual split is one
/// clone moved into the producing task and one kept by the consumer.
pub struct Deferred<T> {
    slots: Arc<Mutex<Slots<T>>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<T> core::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

impl<T: Send + 'static> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> Deferred<T> {
    /// Create an empty deferred result.
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                success: Channel::Empty,
                error: Channel::Empty,
            })),
        }
    }

    /// Create a deferred result that is already settled with `outcome`.
    pub fn from_result(outcome: Result<T, DbError>) -> Self {
        let deferred = Self::new();
        deferred.complete(outcome);
        deferred
    }

    /// Drive `future` on the current Tokio runtime and settle the returned
    /// handle with its output.
    ///
    /// The handle is returned immediately. The future runs as a task on the
    /// runtime, not on a dedicated thread, and keeps running even if every
    /// consumer drops its handle.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, DbError>> + Send + 'static,
    {
        let deferred = Self::new();
        let producer = deferred.clone();
        tokio::spawn(async move {
            producer.complete(future.await);
        });
        deferred
    }

    /// Register the success consumer.
    ///
    /// Runs `callback` right away if the value is already here.
    pub fn on_success<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        let handoff = self.lock().success.subscribe(Box::new(callback), "success");
        if let Some((callback, value)) = handoff {
            callback(value);
        }
        self
    }

    /// Register the error consumer.
    ///
    /// Runs `callback` right away if the error is already here.
    pub fn on_error<F>(&self, callback: F) -> &Self
    where
        F: FnOnce(DbError) + Send + 'static,
    {
        let handoff = self.lock().error.subscribe(Box::new(callback), "error");
        if let Some((callback, error)) = handoff {
            callback(error);
        }
        self
    }

    /// Settle the success channel with `value`.
    pub fn success(&self, value: T) {
        let handoff = self.lock().success.produce(value, "success");
        if let Some((callback, value)) = handoff {
            callback(value);
        }
    }

    /// Settle the error channel with `error`.
    pub fn fail(&self, error: DbError) {
        let handoff = self.lock().error.produce(error, "error");
        if let Some((callback, error)) = handoff {
            callback(error);
        }
    }

    /// Settle whichever channel `outcome` belongs to.
    pub fn complete(&self, outcome: Result<T, DbError>) {
        match outcome {
            Ok(value) => self.success(value),
            Err(error) => self.fail(error),
        }
    }

    // Callbacks never run while this guard is held, so a panicking consumer
    // cannot poison the slots mid-update.
    fn lock(&self) -> std::sync::MutexGuard<'_, Slots<T>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sender shared by the success and error consumers of an awaited handle.
type SharedSender<T> = Arc<Mutex<Option<oneshot::Sender<Result<T, DbError>>>>>;

fn deliver<T>(sender: &SharedSender<T>, outcome: Result<T, DbError>) {
    let sender = sender
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(sender) = sender {
        // The receiver is gone only if the awaiting caller stopped listening.
        let _ = sender.send(outcome);
    }
}

impl<T: Send + 'static> IntoFuture for Deferred<T> {
    type Output = Result<T, DbError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        let (tx, rx) = oneshot::channel();
        let on_ok: SharedSender<T> = Arc::new(Mutex::new(Some(tx)));
        let on_err = Arc::clone(&on_ok);

        self.on_success(move |value| deliver(&on_ok, Ok(value)))
            .on_error(move |error| deliver(&on_err, Err(error)));

        Box::pin(async move { rx.await.unwrap_or_else(|_closed| Err(DbError::Abandoned)) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Records every value a callback receives.
    fn recorder<V: Send + 'static>() -> (Arc<Mutex<Vec<V>>>, impl FnOnce(V) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |v| sink.lock().unwrap().push(v))
    }

    #[test]
    fn success_before_subscribe_delivers_once() {
        let deferred = Deferred::new();
        deferred.success(7_u64);

        let (seen, callback) = recorder::<u64>();
        deferred.on_success(callback);

        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[test]
    fn subscribe_before_success_delivers_once() {
        let deferred = Deferred::new();
        let (seen, callback) = recorder::<u64>();
        deferred.on_success(callback);
        assert!(seen.lock().unwrap().is_empty());

        deferred.success(7_u64);
        assert_eq!(*seen.lock().unwrap(), vec![7]);
    }

    #[test]
    fn zero_is_a_real_value() {
        let deferred = Deferred::new();
        deferred.success(0_u64);
        let (seen, callback) = recorder::<u64>();
        deferred.on_success(callback);
        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }

    #[test]
    fn error_channel_works_in_both_orders() {
        let early = Deferred::<u64>::new();
        early.fail(DbError::MissingId);
        let (seen_early, callback) = recorder::<DbError>();
        early.on_error(callback);

        let late = Deferred::<u64>::new();
        let (seen_late, callback) = recorder::<DbError>();
        late.on_error(callback);
        late.fail(DbError::MissingId);

        assert_eq!(seen_early.lock().unwrap().len(), 1);
        assert_eq!(seen_late.lock().unwrap().len(), 1);
    }

    #[test]
    fn fluent_registration_only_fires_matching_channel() {
        let hits = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let deferred = Deferred::new();
        {
            let hits = Arc::clone(&hits);
            let errors = Arc::clone(&errors);
            deferred
                .on_success(move |_: u64| {
                    hits.fetch_add(1, Ordering::SeqCst);
                })
                .on_error(move |_| {
                    errors.fetch_add(1, Ordering::SeqCst);
                });
        }
        deferred.success(1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn second_value_on_same_channel_is_ignored() {
        let deferred = Deferred::new();
        let (seen, callback) = recorder::<u64>();
        deferred.on_success(callback);
        deferred.success(1_u64);
        deferred.success(2_u64);
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[test]
    fn callback_may_reenter_the_same_handle() {
        let deferred = Deferred::new();
        let inner = deferred.clone();
        let (seen, callback) = recorder::<u64>();
        deferred.on_success(move |v: u64| {
            inner.on_error(|_| {});
            callback(v);
        });
        deferred.success(5);
        assert_eq!(*seen.lock().unwrap(), vec![5]);
    }

    #[tokio::test]
    async fn await_resolves_success() {
        let deferred = Deferred::spawn(async { Ok::<_, DbError>(String::from("done")) });
        assert_eq!(deferred.await.unwrap(), "done");
    }

    #[tokio::test]
    async fn await_resolves_error() {
        let deferred = Deferred::<u64>::spawn(async { Err(DbError::MissingId) });
        assert!(matches!(deferred.await, Err(DbError::MissingId)));
    }

    #[tokio::test]
    async fn await_after_settling() {
        let deferred = Deferred::from_result(Ok(3_u64));
        assert_eq!(deferred.await.unwrap(), 3);
    }

    #[tokio::test]
    async fn dropped_producer_is_reported_as_abandoned() {
        let deferred = Deferred::<u64>::new();
        assert!(matches!(deferred.await, Err(DbError::Abandoned)));
    }
}
