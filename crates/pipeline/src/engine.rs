//! # Engine - An Owned Worker Pool
//!
//! Async code invokes a pipeline directly with `node.invoke(args).await` on
//! whatever Tokio runtime it already runs on. Synchronous code has no
//! runtime, so [`Engine`] owns one and blocks the caller until the pipeline
//! finishes.
//!
//! ## Configuration
//!
//! | Variable                        | Field                  | Default           |
//! |---------------------------------|------------------------|-------------------|
//! | `PIPELINE_WORKER_THREADS`       | `worker_threads`       | one per core      |
//! | `PIPELINE_THREAD_NAME`          | `thread_name`          | `pipeline-worker` |
//! | `PIPELINE_MAX_BLOCKING_THREADS` | `max_blocking_threads` | Tokio's default   |
//!
//! ```rust
//! use compositional_pipeline::{bind, stage, Engine, EngineConfig};
//!
//! fn add(a: i32, b: i32) -> i32 { a + b }
//!
//! let engine = Engine::new(EngineConfig::default().worker_threads(2)).unwrap();
//! let p = bind(add, (5, 10)) | stage(|x: i32| x * x);
//! assert_eq!(engine.run(&p, ()).unwrap(), 225);
//! ```

use std::borrow::Cow;

use crate::error::PipelineError;
use crate::node::Node;

pub const ENV_WORKER_THREADS: &str = "PIPELINE_WORKER_THREADS";
pub const ENV_THREAD_NAME: &str = "PIPELINE_THREAD_NAME";
pub const ENV_MAX_BLOCKING_THREADS: &str = "PIPELINE_MAX_BLOCKING_THREADS";

const DEFAULT_THREAD_NAME: &str = "pipeline-worker";

/// Settings for the engine's runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Worker threads; `None` means one per core.
    pub worker_threads: Option<usize>,
    /// Name given to every worker thread.
    pub thread_name: String,
    /// Upper bound on threads used for blocking work.
    pub max_blocking_threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            max_blocking_threads: None,
        }
    }
}

impl EngineConfig {
    /// Read the configuration from `PIPELINE_*` environment variables.
    ///
    /// Unset variables keep their defaults; set but unusable ones fail with
    /// [`PipelineError::Config`].
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_WORKER_THREADS) {
            config.worker_threads = Some(parse_count(ENV_WORKER_THREADS, &raw)?);
        }
        if let Some(raw) = lookup(ENV_THREAD_NAME) {
            config.thread_name = raw;
        }
        if let Some(raw) = lookup(ENV_MAX_BLOCKING_THREADS) {
            config.max_blocking_threads = Some(parse_count(ENV_MAX_BLOCKING_THREADS, &raw)?);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn worker_threads(mut self, n: usize) -> Self {
        self.worker_threads = Some(n);
        self
    }

    pub fn thread_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.thread_name = name.into().into_owned();
        self
    }

    pub fn max_blocking_threads(mut self, n: usize) -> Self {
        self.max_blocking_threads = Some(n);
        self
    }

    /// Reject values the runtime builder would panic on.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.worker_threads == Some(0) {
            return Err(invalid(ENV_WORKER_THREADS, "0", "must be at least 1"));
        }
        if self.max_blocking_threads == Some(0) {
            return Err(invalid(ENV_MAX_BLOCKING_THREADS, "0", "must be at least 1"));
        }
        if self.thread_name.trim().is_empty() {
            return Err(invalid(ENV_THREAD_NAME, &self.thread_name, "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> PipelineError {
    PipelineError::Config {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_count(key: &'static str, raw: &str) -> Result<usize, PipelineError> {
    let n: usize = raw
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid(key, raw, e.to_string()))?;
    if n == 0 {
        return Err(invalid(key, raw, "must be at least 1"));
    }
    Ok(n)
}

/// A multi-thread Tokio runtime that runs pipelines for synchronous callers.
///
/// Dropping the engine shuts the pool down and cancels work still running
/// on it; handles to that work resolve to
/// [`PipelineError::BranchCancelled`]. From synchronous code the drop waits
/// for the workers to stop. Inside an async context it shuts down in the
/// background instead, since blocking there would panic.
#[derive(Debug)]
pub struct Engine {
    runtime: Option<tokio::runtime::Runtime>,
    handle: tokio::runtime::Handle,
    config: EngineConfig,
}

impl Engine {
    /// Start the worker pool.
    pub fn new(config: EngineConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.enable_all().thread_name(config.thread_name.clone());
        if let Some(n) = config.worker_threads {
            builder.worker_threads(n);
        }
        if let Some(n) = config.max_blocking_threads {
            builder.max_blocking_threads(n);
        }
        let runtime = builder.build()?;

        tracing::debug!(
            worker_threads = ?config.worker_threads,
            thread_name = %config.thread_name,
            "engine started"
        );
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            config,
        })
    }

    /// Start with configuration taken from the environment.
    pub fn from_env() -> Result<Self, PipelineError> {
        Self::new(EngineConfig::from_env()?)
    }

    /// Invoke `node` and block the calling thread until it finishes.
    ///
    /// Must be called from synchronous code. Inside an async context it
    /// fails with [`PipelineError::BlockingWaitUnsupported`]; await
    /// `node.invoke(args)` there instead.
    pub fn run<N, Args>(&self, node: &N, args: Args) -> Result<N::Output, PipelineError>
    where
        N: Node<Args>,
    {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(PipelineError::BlockingWaitUnsupported);
        }
        self.handle.block_on(node.invoke(args))
    }

    /// Handle to the owned runtime, for spawning or entering it directly.
    pub fn handle(&self) -> &tokio::runtime::Handle {
        &self.handle
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };
        if tokio::runtime::Handle::try_current().is_ok() {
            tracing::debug!("engine shutting down in the background");
            runtime.shutdown_background();
        } else {
            tracing::debug!("engine shutting down");
            drop(runtime);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fork::fork;
    use crate::stage::{bind, stage};
    use std::collections::HashMap;

    fn lookup(vars: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let vars: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.thread_name, "pipeline-worker");
    }

    #[test]
    fn test_reads_all_variables() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_WORKER_THREADS, "3"),
            (ENV_THREAD_NAME, "stage-pool"),
            (ENV_MAX_BLOCKING_THREADS, " 16 "),
        ]))
        .unwrap();
        assert_eq!(config.worker_threads, Some(3));
        assert_eq!(config.thread_name, "stage-pool");
        assert_eq!(config.max_blocking_threads, Some(16));
    }

    #[test]
    fn test_rejects_unparsable_count() {
        let err = EngineConfig::from_lookup(lookup(&[(ENV_WORKER_THREADS, "many")])).unwrap_err();
        match err {
            PipelineError::Config { key, value, .. } => {
                assert_eq!(key, ENV_WORKER_THREADS);
                assert_eq!(value, "many");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_zero_and_empty() {
        assert!(EngineConfig::from_lookup(lookup(&[(ENV_MAX_BLOCKING_THREADS, "0")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[(ENV_THREAD_NAME, "  ")])).is_err());
        assert!(Engine::new(EngineConfig::default().worker_threads(0)).is_err());
    }

    #[test]
    fn test_run_blocks_until_done() {
        let engine = Engine::new(EngineConfig::default().worker_threads(2)).unwrap();
        let p = bind(|a: i32, b: i32| a + b, (5, 10)) | stage(|x: i32| x * x);
        assert_eq!(engine.run(&p, ()).unwrap(), 225);
        assert_eq!(engine.config().worker_threads, Some(2));
    }

    #[test]
    fn test_run_spawns_on_owned_pool() {
        let engine = Engine::new(EngineConfig::default().worker_threads(2)).unwrap();
        let f = fork((stage(|a: i32, b: i32| a + b), stage(|a: i32, b: i32| a - b)));
        assert_eq!(engine.run(&f, (158 * 2, 33 * 2)).unwrap(), (382, 250));
    }

    #[tokio::test]
    async fn test_run_inside_async_context_is_rejected() {
        let engine = std::thread::spawn(|| Engine::new(EngineConfig::default().worker_threads(1)))
            .join()
            .unwrap()
            .unwrap();
        let result = engine.run(&stage(|x: i32| x), (1,));
        assert!(matches!(result, Err(PipelineError::BlockingWaitUnsupported)));
    }

    #[tokio::test]
    async fn test_drop_inside_async_context() {
        let engine = Engine::new(EngineConfig::default().worker_threads(1)).unwrap();
        let pending = engine.handle().spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        });
        drop(engine);

        let err = pending.await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
