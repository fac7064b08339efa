//! # Compositional Pipeline - Typed Function Composition
//!
//! This crate is a small engine for chaining, forking and distributing
//! computations, with concurrent fan-out and fan-in built in:
//!
//! - **Bundles**: tuples as fixed-arity argument lists ([`bundle`])
//! - **Shapes**: static Void / Scalar / Bundle classification of results ([`shape`])
//! - **Stages**: functions with pre-bound trailing arguments ([`stage`])
//! - **Pipe**: sequential composition, `a | b` ([`pipe`](mod@pipe))
//! - **Fork**: concurrent composition on one input, `a & b` ([`fork`](mod@fork))
//! - **Unzip**: one stage per bundle element ([`unzip`](mod@unzip))
//! - **For-each**: one task per collection element ([`for_each`](mod@for_each))
//! - **Handles**: deferred results for the `_async` variants ([`handle`])
//! - **Tracing**: zero-cost, compile-time selectable instrumentation ([`trace`])
//! - **Topology**: pipelines as inspectable graphs ([`topology`])
//! - **Engine**: an owned worker pool for synchronous callers ([`engine`])
//!
//! ## Design Philosophy
//!
//! A pipeline is a value. Composition builds a tree of combinators whose
//! types record exactly what flows between the stages, so wiring a pair into
//! a stage that takes three arguments is a compile error rather than a run
//! time surprise. Invoking the tree walks it, scheduling concurrent branches
//! on Tokio and merging their results by the rules in [`shape`].
//!
//! ```rust
//! use compositional_pipeline::{bind, fork, stage, Node};
//!
//! fn sum(a: i32, b: i32) -> i32 { a + b }
//! fn diff(a: i32, b: i32) -> i32 { a - b }
//! fn double(a: i32, b: i32) -> (i32, i32) { (a * 2, b * 2) }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let p = stage(double) | fork((stage(sum), stage(diff)));
//! assert_eq!(p.invoke((158, 33)).await.unwrap(), (382, 250));
//!
//! let q = bind(sum, (5, 10)) | stage(|x: i32| x * x);
//! assert_eq!(q.invoke(()).await.unwrap(), 225);
//! # }
//! ```

pub mod bundle;
pub mod callable;
pub mod engine;
pub mod error;
pub mod for_each;
pub mod fork;
pub mod handle;
pub mod node;
pub mod pipe;
pub mod shape;
pub mod stage;
pub mod topology;
pub mod trace;
pub mod unzip;

// Re-export key types at crate root for convenience
pub use engine::{Engine, EngineConfig};
pub use error::{BoxError, PipelineError};
pub use for_each::{for_each, for_each_async, ForEach, ForEachAsync};
pub use fork::{fork, fork_async, fork_into, Fork, ForkAsync, ForkInto};
pub use handle::Handle;
pub use node::{Compose, Node};
pub use pipe::{pipe, Pipe};
pub use shape::{Shape, ShapeKind};
pub use stage::{async_stage, bind, source, stage, try_stage, Source, Stage};
pub use topology::{Describe, Topology};
pub use trace::{AutoTraced, TraceLog, TraceNode, Traced};
pub use unzip::{unzip, unzip_async, unzip_into, Unzip, UnzipAsync, UnzipInto};
