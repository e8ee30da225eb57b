//! # Continuation
//!
//! The caller's suspended execution. The engine keeps the [`ContinuationHandle`]
//! (a future) parked while the release step hands the [`Continuation`] side to the
//! correlation registry. Whichever party resolves first wins; every later
//! resolution attempt returns `false` and changes nothing.
//!
//! ```text
//! Continuation::channel(job)
//!     ├─→ Continuation        (cloned into the registry and the execution)
//!     │       on_success() / on_failure()   first call wins
//!     └─→ ContinuationHandle  (awaited by the engine)
//! ```

use futures::{ready, FutureExt};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::ReleaseError;
use crate::models::ReleaseOutcome;

/// Outcome delivered to the caller
pub type StepResult = Result<ReleaseOutcome, ReleaseError>;

struct ContinuationInner {
    job_name: String,
    sender: Mutex<Option<oneshot::Sender<StepResult>>>,
}

/// Resolving side of a suspended caller; cheap to clone
#[derive(Clone)]
pub struct Continuation {
    inner: Arc<ContinuationInner>,
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation")
            .field("job_name", &self.inner.job_name)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

impl Continuation {
    /// Create a continuation for a release of `job_name` and the handle that awaits it
    pub fn channel(job_name: impl Into<String>) -> (Self, ContinuationHandle) {
        let job_name = job_name.into();
        let (sender, receiver) = oneshot::channel();
        let continuation = Self {
            inner: Arc::new(ContinuationInner {
                job_name: job_name.clone(),
                sender: Mutex::new(Some(sender)),
            }),
        };
        (continuation, ContinuationHandle { job_name, receiver })
    }

    pub fn job_name(&self) -> &str {
        &self.inner.job_name
    }

    /// Returns `true` if this call resolved the continuation
    pub fn on_success(&self, outcome: ReleaseOutcome) -> bool {
        self.resolve(Ok(outcome))
    }

    /// Returns `true` if this call resolved the continuation
    pub fn on_failure(&self, error: ReleaseError) -> bool {
        self.resolve(Err(error))
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.sender.lock().is_none()
    }

    fn resolve(&self, result: StepResult) -> bool {
        let sender = self.inner.sender.lock().take();
        match sender {
            Some(sender) => {
                // The engine may have given up on the handle; the resolution still counts.
                if sender.send(result).is_err() {
                    debug!(
                        job_name = %self.inner.job_name,
                        "Continuation handle dropped before resolution was delivered"
                    );
                }
                true
            }
            None => {
                debug!(
                    job_name = %self.inner.job_name,
                    "Continuation already resolved, ignoring duplicate resolution"
                );
                false
            }
        }
    }
}

/// Future the engine parks on until the release is resolved.
///
/// Yields `EngineCancelled` if every [`Continuation`] clone is dropped unresolved.
pub struct ContinuationHandle {
    job_name: String,
    receiver: oneshot::Receiver<StepResult>,
}

impl fmt::Debug for ContinuationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuationHandle")
            .field("job_name", &self.job_name)
            .finish()
    }
}

impl ContinuationHandle {
    pub fn job_name(&self) -> &str {
        &self.job_name
    }
}

impl Future for ContinuationHandle {
    type Output = StepResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let received = ready!(self.receiver.poll_unpin(cx));
        Poll::Ready(received.unwrap_or_else(|_| {
            Err(ReleaseError::EngineCancelled {
                job_name: self.job_name.clone(),
                reason: "continuation dropped before resolution".to_string(),
            })
        }))
    }
}
