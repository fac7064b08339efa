//! # Nodes - The Invocation Contract
//!
//! Every element of a combinator tree (stages, pipes, forks, unzips,
//! for-each fan-outs) implements [`Node`] for the argument bundles it can
//! take. Because the contract is the same at every level, trees compose
//! recursively to any depth and a whole pipeline is itself just a node.
//!
//! `Node<Args>` plays the role of the `accepts(ArgTypes...)` predicate:
//! `N: Node<(i32, String)>` holds exactly when `N` can be invoked with an
//! `i32` and a `String`. Combinators use it as a trait bound, so a tree that
//! does not type-check cannot be built into a running pipeline.
//!
//! ## Operators
//!
//! | Expression | Builds                | Meaning                   |
//! |------------|-----------------------|---------------------------|
//! | `a \| b`   | `Pipe<A, B>`          | run `a`, feed result to `b` |
//! | `a & b`    | `Fork<(A, B)>`        | run both on the same input |
//! | `a.then(b)`| `Pipe<A, B>`          | method form of `\|`        |
//!
//! `&` binds tighter than `|`, so `a | b & c | d` reads as
//! "a, then b and c concurrently, then d".

use std::future::Future;

use crate::error::PipelineError;
use crate::fork::Fork;
use crate::pipe::Pipe;
use crate::trace::{AutoTraced, Traced};

/// A composable, invocable unit of a pipeline.
///
/// Invocation is asynchronous so that concurrent combinators can schedule
/// work on the runtime and wait at their join points. Synchronous callers
/// use [`Engine::run`](crate::engine::Engine::run).
pub trait Node<Args>: Send + Sync {
    /// What this node produces: `()`, a scalar, or a bundle.
    type Output: Send;

    /// Invoke the node with an argument bundle.
    fn invoke(&self, args: Args)
        -> impl Future<Output = Result<Self::Output, PipelineError>> + Send;
}

/// Composition methods shared by every node type.
pub trait Compose: Sized {
    /// Sequential composition: `self` then `next`.
    fn then<N>(self, next: N) -> Pipe<Self, N> {
        crate::pipe::pipe(self, next)
    }

    /// Concurrent composition: run `self` and `other` on the same input.
    fn and<N>(self, other: N) -> Fork<(Self, N)> {
        crate::fork::fork((self, other))
    }

    /// Wrap with tracing enabled.
    fn traced(self, label: &'static str) -> Traced<Self, true> {
        Traced::new(self, label)
    }

    /// Wrap with tracing compiled out.
    fn untraced(self) -> Traced<Self, false> {
        Traced::new(self, "untraced")
    }

    /// Wrap with tracing on in debug builds and off in release builds.
    fn auto_traced(self, label: &'static str) -> AutoTraced<Self> {
        Traced::new(self, label)
    }
}

/// Implements `Compose`, `|` and (optionally) `&` for a node type.
macro_rules! impl_compose {
    ($name:ident<$($g:ident),*>) => {
        impl<$($g),*> $crate::node::Compose for $name<$($g),*> {}

        impl<$($g,)* Rhs> ::std::ops::BitOr<Rhs> for $name<$($g),*> {
            type Output = $crate::pipe::Pipe<Self, Rhs>;

            fn bitor(self, rhs: Rhs) -> Self::Output {
                $crate::pipe::pipe(self, rhs)
            }
        }
    };
    ($name:ident<$($g:ident),*>, fork) => {
        $crate::node::impl_compose!($name<$($g),*>);

        impl<$($g,)* Rhs> ::std::ops::BitAnd<Rhs> for $name<$($g),*> {
            type Output = $crate::fork::Fork<(Self, Rhs)>;

            fn bitand(self, rhs: Rhs) -> Self::Output {
                $crate::fork::fork((self, rhs))
            }
        }
    };
}

pub(crate) use impl_compose;
