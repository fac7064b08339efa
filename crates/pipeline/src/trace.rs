//! # Zero-Cost Tracing
//!
//! [`Traced`] wraps any node and reports how long it took and whether it
//! succeeded. Whether the wrapper does anything is a const generic:
//!
//! - `Traced<N, false>`: no tracing code is generated, the call goes
//!   straight to the inner node.
//! - `Traced<N, true>`: the invocation runs inside a `tracing` span carrying
//!   the label, emits a `debug!` event with the elapsed time, and optionally
//!   records a [`TraceNode`] into a shared [`TraceLog`].
//!
//! [`AutoTraced`] picks `true` in debug builds and `false` in release builds.
//! The output type never changes, so wrapping a node does not change how it
//! composes.
//!
//! ```rust
//! use compositional_pipeline::{stage, Compose, Node};
//! use compositional_pipeline::trace::TraceLog;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let log = TraceLog::new();
//! let square = stage(|x: i32| x * x).traced("square").with_log(log.clone());
//!
//! assert_eq!(square.invoke((12,)).await.unwrap(), 144);
//! assert_eq!(log.snapshot()[0].name, "square");
//! # }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::Instrument;

use crate::error::PipelineError;
use crate::node::{Compose, Node};

/// One completed, traced invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceNode {
    /// Label of the traced node.
    pub name: String,
    /// Wall-clock time spent in the invocation.
    pub duration: Duration,
    /// Whether the invocation succeeded.
    pub ok: bool,
}

impl TraceNode {
    pub fn new(name: impl Into<String>, duration: Duration, ok: bool) -> Self {
        Self {
            name: name.into(),
            duration,
            ok,
        }
    }
}

impl fmt::Display for TraceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.ok { "ok" } else { "failed" };
        write!(f, "[{:?}] {} ({})", self.duration, self.name, status)
    }
}

/// Shared record of traced invocations.
///
/// Entries appear in completion order. Clones share the same record.
///
/// A log from [`TraceLog::new`] keeps every entry until [`clear`](Self::clear)
/// is called, so a long-lived pipeline should either clear it periodically
/// or use [`TraceLog::bounded`], which keeps only the most recent entries.
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    entries: Arc<Mutex<Entries>>,
}

#[derive(Debug, Default)]
struct Entries {
    nodes: VecDeque<TraceNode>,
    limit: Option<usize>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log holding at most `limit` entries; the oldest are dropped first.
    pub fn bounded(limit: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Entries {
                nodes: VecDeque::with_capacity(limit),
                limit: Some(limit),
            })),
        }
    }

    /// Maximum number of entries kept, if bounded.
    pub fn limit(&self) -> Option<usize> {
        self.entries().limit
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        // A panicking stage cannot leave a half-written entry behind.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an entry, evicting the oldest one when the log is full.
    pub fn record(&self, node: TraceNode) {
        let mut entries = self.entries();
        entries.nodes.push_back(node);
        if let Some(limit) = entries.limit {
            while entries.nodes.len() > limit {
                entries.nodes.pop_front();
            }
        }
    }

    /// Copy of all entries currently held.
    pub fn snapshot(&self) -> Vec<TraceNode> {
        self.entries().nodes.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().nodes.is_empty()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries().nodes.clear();
    }

    /// One line per entry.
    pub fn display(&self) -> String {
        self.entries()
            .nodes
            .iter()
            .map(|node| format!("{}\n", node))
            .collect()
    }
}

/// A node wrapped with compile-time selectable tracing.
#[derive(Debug, Clone)]
pub struct Traced<N, const ENABLED: bool> {
    inner: N,
    label: &'static str,
    log: Option<TraceLog>,
}

impl<N, const ENABLED: bool> Traced<N, ENABLED> {
    pub fn new(inner: N, label: &'static str) -> Self {
        Self {
            inner,
            label,
            log: None,
        }
    }

    /// Also record every invocation into `log`.
    pub fn with_log(mut self, log: TraceLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }

    pub fn into_inner(self) -> N {
        self.inner
    }
}

// ============================================================================
// Tracing Disabled: Zero Overhead
// ============================================================================

impl<Args, N> Node<Args> for Traced<N, false>
where
    N: Node<Args>,
{
    type Output = N::Output;

    #[inline]
    fn invoke(&self, args: Args) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
        self.inner.invoke(args)
    }
}

// ============================================================================
// Tracing Enabled: Span + Timing
// ============================================================================

impl<Args, N> Node<Args> for Traced<N, true>
where
    Args: Send,
    N: Node<Args>,
{
    type Output = N::Output;

    fn invoke(&self, args: Args) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
        let label = self.label;
        let span = tracing::debug_span!("node", label);
        async move {
            let start = Instant::now();
            let outcome = self.inner.invoke(args).await;
            let elapsed = start.elapsed();

            match &outcome {
                Ok(_) => tracing::debug!(label, elapsed_us = elapsed.as_micros() as u64, "node finished"),
                Err(err) => tracing::warn!(label, elapsed_us = elapsed.as_micros() as u64, error = %err, "node failed"),
            }
            if let Some(log) = &self.log {
                log.record(TraceNode::new(label, elapsed, outcome.is_ok()));
            }
            outcome
        }
        .instrument(span)
    }
}

// ============================================================================
// Compile-Time Selection
// ============================================================================

/// Traced in debug builds, untraced in release builds.
#[cfg(debug_assertions)]
pub type AutoTraced<N> = Traced<N, true>;

/// Traced in debug builds, untraced in release builds.
#[cfg(not(debug_assertions))]
pub type AutoTraced<N> = Traced<N, false>;

impl<N, const ENABLED: bool> Compose for Traced<N, ENABLED> {}

impl<N, Rhs, const ENABLED: bool> std::ops::BitOr<Rhs> for Traced<N, ENABLED> {
    type Output = crate::pipe::Pipe<Self, Rhs>;

    fn bitor(self, rhs: Rhs) -> Self::Output {
        crate::pipe::pipe(self, rhs)
    }
}

impl<N, Rhs, const ENABLED: bool> std::ops::BitAnd<Rhs> for Traced<N, ENABLED> {
    type Output = crate::fork::Fork<(Self, Rhs)>;

    fn bitand(self, rhs: Rhs) -> Self::Output {
        crate::fork::fork((self, rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{async_stage, stage, try_stage};

    fn add_one(x: i32) -> i32 {
        x + 1
    }

    #[tokio::test]
    async fn test_traced_disabled_same_output() {
        let traced: Traced<_, false> = Traced::new(stage(add_one), "add_one");
        assert_eq!(traced.invoke((5,)).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_traced_enabled_same_output() {
        let log = TraceLog::new();
        let traced = stage(add_one).traced("add_one").with_log(log.clone());

        assert_eq!(traced.invoke((5,)).await.unwrap(), 6);
        let entries = log.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "add_one");
        assert!(entries[0].ok);
    }

    #[tokio::test]
    async fn test_trace_timing_accuracy() {
        let log = TraceLog::new();
        let slow = async_stage(|| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, PipelineError>(())
        })
        .traced("slow")
        .with_log(log.clone());

        slow.invoke(()).await.unwrap();
        let duration = log.snapshot()[0].duration;
        assert!(duration.as_millis() >= 45);
        assert!(duration.as_millis() < 500);
    }

    #[tokio::test]
    async fn test_failure_is_recorded() {
        let log = TraceLog::new();
        let failing = try_stage(|s: &'static str| s.parse::<u8>())
            .traced("parse")
            .with_log(log.clone());

        assert!(failing.invoke(("300",)).await.is_err());
        assert!(!log.snapshot()[0].ok);
        assert!(log.display().contains("parse (failed)"));
    }

    #[tokio::test]
    async fn test_traced_nodes_compose() {
        let log = TraceLog::new();
        let pipeline = stage(add_one).traced("first").with_log(log.clone())
            | stage(|x: i32| x * 10).traced("second").with_log(log.clone());

        assert_eq!(pipeline.invoke((1,)).await.unwrap(), 20);
        let names: Vec<_> = log.snapshot().into_iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["first", "second"]);

        log.clear();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_bounded_log_keeps_newest_entries() {
        let log = TraceLog::bounded(2);
        let traced = stage(add_one).traced("step").with_log(log.clone());

        for x in 0..5 {
            traced.invoke((x,)).await.unwrap();
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.limit(), Some(2));
        assert_eq!(TraceLog::new().limit(), None);

        log.record(TraceNode::new("last", Duration::ZERO, true));
        let names: Vec<_> = log.snapshot().into_iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["step", "last"]);
    }

    #[test]
    fn test_accessors() {
        let traced = stage::<_, crate::stage::Spread>(add_one).untraced();
        assert_eq!(traced.label(), "untraced");
        assert_eq!(traced.inner().label(), "add_one");
        assert_eq!(traced.into_inner().label(), "add_one");
    }

    #[test]
    fn test_trace_node_display() {
        let node = TraceNode::new("load", Duration::from_millis(100), true);
        assert_eq!(node.to_string(), "[100ms] load (ok)");
    }
}
