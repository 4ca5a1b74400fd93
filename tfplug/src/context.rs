//! Context implementation for request-scoped data and cancellation
//!
//! Every provider entry point receives a [`Context`]. It carries a request id
//! for log correlation, an optional deadline and a cancellation signal.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tokio::time;
use uuid::Uuid;

/// Context carries request-scoped values like cancellation signals, timeouts, and metadata
/// CRITICAL: Pass this as first parameter to ALL async trait methods
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    request_id: String,
    deadline: Option<Instant>,
    values: RwLock<HashMap<String, Box<dyn Any + Send + Sync>>>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        Self::build(Uuid::new_v4().to_string(), None)
    }

    /// Returns a new context sharing this request id that is cancelled once
    /// `timeout` elapses. Must be called inside a tokio runtime.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let ctx = Self::build(self.inner.request_id.clone(), Some(deadline));

        let done_tx = ctx.inner.done_tx.clone();
        tokio::spawn(async move {
            time::sleep_until(deadline.into()).await;
            let _ = done_tx.send(true);
        });

        ctx
    }

    fn build(request_id: String, deadline: Option<Instant>) -> Self {
        let (done_tx, done_rx) = watch::channel(false);
        Self {
            inner: Arc::new(ContextInner {
                request_id,
                deadline,
                values: RwLock::new(HashMap::new()),
                done: done_rx,
                done_tx,
            }),
        }
    }

    pub async fn with_value<T: Send + Sync + 'static>(self, key: &str, value: T) -> Self {
        let mut values = self.inner.values.write().await;
        values.insert(key.to_string(), Box::new(value));
        drop(values);
        self
    }

    pub async fn get_value<T>(&self, key: &str) -> Option<T>
    where
        T: Send + Sync + Clone + 'static,
    {
        let values = self.inner.values.read().await;
        values.get(key).and_then(|v| v.downcast_ref::<T>()).cloned()
    }

    pub fn request_id(&self) -> &str {
        &self.inner.request_id
    }

    /// Span that tags log lines emitted while serving this request
    pub fn span(&self, operation: &str) -> tracing::Span {
        tracing::info_span!("tf_request", request_id = %self.inner.request_id, operation)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline, `None` when no deadline is set
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("request_id", &self.inner.request_id)
            .field("deadline", &self.inner.deadline)
            .finish()
    }
}
