//! # Handles - Deferred Results
//!
//! A [`Handle`] is a one-shot, move-only reference to a value being computed
//! on a Tokio task. It is what the `_async` combinators hand downstream
//! instead of a value.
//!
//! ## Retrieval
//!
//! | Method            | Context                              |
//! |-------------------|--------------------------------------|
//! | `handle.await`    | async code                           |
//! | `handle.join()`   | async code (method form)             |
//! | `handle.wait()`   | sync code on a multi-thread runtime or outside one |
//!
//! `wait` is refused on any thread of a current-thread runtime, including its
//! `spawn_blocking` threads.
//!
//! Every form consumes the handle, so a value can be retrieved at most once.
//! Dropping a handle detaches the task: it runs to completion and its result
//! is discarded.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::runtime::RuntimeFlavor;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::error::PipelineError;

/// A concurrently computed value that has not been retrieved yet.
#[derive(Debug)]
pub struct Handle<T> {
    inner: JoinHandle<Result<T, PipelineError>>,
    runtime: tokio::runtime::Handle,
}

impl<T> Handle<T>
where
    T: Send + 'static,
{
    /// Schedule `fut` on the current runtime.
    ///
    /// The task inherits the caller's tracing span.
    pub(crate) fn spawn<F>(fut: F) -> Result<Self, PipelineError>
    where
        F: Future<Output = Result<T, PipelineError>> + Send + 'static,
    {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| PipelineError::NoRuntime)?;
        let inner = runtime.spawn(fut.in_current_span());
        Ok(Self { inner, runtime })
    }
}

impl<T> Handle<T> {
    /// Wait for the value asynchronously.
    pub async fn join(self) -> Result<T, PipelineError> {
        self.await
    }

    /// Block the calling thread until the value is ready.
    ///
    /// Inside a multi-thread runtime the worker is handed over with
    /// `block_in_place`. A current-thread runtime has no spare worker to
    /// drive the task, so that case fails with
    /// [`PipelineError::BlockingWaitUnsupported`].
    ///
    /// The refusal covers every thread that sees a current-thread runtime
    /// as its context, including `spawn_blocking` threads, even though the
    /// runtime thread may be free there. Tokio does not tell those threads
    /// apart from the runtime thread itself. From such a thread, send the
    /// handle back to async code and `.await` it, or build the runtime with
    /// the multi-thread flavor.
    pub fn wait(self) -> Result<T, PipelineError> {
        match tokio::runtime::Handle::try_current() {
            Ok(current) => match current.runtime_flavor() {
                RuntimeFlavor::CurrentThread => Err(PipelineError::BlockingWaitUnsupported),
                _ => tokio::task::block_in_place(move || current.block_on(self)),
            },
            Err(_) => match self.runtime.runtime_flavor() {
                RuntimeFlavor::CurrentThread => Err(PipelineError::BlockingWaitUnsupported),
                _ => {
                    let runtime = self.runtime.clone();
                    runtime.block_on(self)
                }
            },
        }
    }

    /// True once the underlying task has finished.
    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }

    /// Await as branch `index` of a join point, logging the outcome.
    pub(crate) async fn join_branch(
        self,
        combinator: &'static str,
        index: usize,
    ) -> Result<T, PipelineError> {
        let outcome = self.await;
        match &outcome {
            Ok(_) => tracing::trace!(combinator, branch = index, "branch joined"),
            Err(err) => tracing::warn!(combinator, branch = index, error = %err, "branch failed"),
        }
        outcome
    }
}

impl<T> Future for Handle<T> {
    type Output = Result<T, PipelineError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.inner).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(join_err)) => Poll::Ready(Err(PipelineError::from_join(join_err))),
            Poll::Pending => Poll::Pending,
        }
    }
}

crate::scalar_shape!(impl<T> Handle<T>);
