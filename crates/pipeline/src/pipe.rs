//! # Pipe - Sequential Composition
//!
//! `pipe(a, b)` runs `a`, normalizes its result with
//! [`Shape::into_bundle`], and invokes `b` with that bundle. How the bundle
//! meets `b`'s parameters (spread, whole, or discarded) is decided by `b`'s
//! own `Node` implementation, so the pipe itself carries no routing logic.
//!
//! ```text
//!    args ──▶ [ a ] ──▶ normalize ──▶ [ b ] ──▶ result
//! ```
//!
//! Composition is associative: `pipe(pipe(a, b), c)` and
//! `pipe(a, pipe(b, c))` produce the same result for every input.

use std::future::Future;

use crate::error::PipelineError;
use crate::node::Node;
use crate::shape::Shape;

/// Two nodes run one after the other.
#[derive(Debug, Clone)]
pub struct Pipe<A, B> {
    first: A,
    second: B,
}

/// Sequential composition of two nodes.
pub fn pipe<A, B>(first: A, second: B) -> Pipe<A, B> {
    Pipe { first, second }
}

impl<A, B> Pipe<A, B> {
    /// The upstream node.
    pub fn first(&self) -> &A {
        &self.first
    }

    /// The downstream node.
    pub fn second(&self) -> &B {
        &self.second
    }

    /// Split back into the two halves.
    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<Args, A, B> Node<Args> for Pipe<A, B>
where
    Args: Send,
    A: Node<Args>,
    <A as Node<Args>>::Output: Shape,
    B: Node<<<A as Node<Args>>::Output as Shape>::Bundle>,
{
    type Output = <B as Node<<<A as Node<Args>>::Output as Shape>::Bundle>>::Output;

    fn invoke(&self, args: Args) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
        async move {
            let produced = self.first.invoke(args).await?;
            self.second.invoke(produced.into_bundle()).await
        }
    }
}

crate::node::impl_compose!(Pipe<A, B>, fork);

/// Left-fold any number of nodes into nested pipes.
///
/// ```rust
/// use compositional_pipeline::{bind, pipe, stage, Node};
///
/// fn add(a: i32, b: i32) -> i32 { a + b }
/// fn square(x: i32) -> i32 { x * x }
///
/// # #[tokio::main]
/// # async fn main() {
/// let p = pipe!(bind(add, (5, 10)), stage(square), stage(|x: i32| x.to_string()));
/// assert_eq!(p.invoke(()).await.unwrap(), "225");
/// # }
/// ```
#[macro_export]
macro_rules! pipe {
    ($only:expr $(,)?) => {
        $only
    };
    ($first:expr, $second:expr $(, $rest:expr)* $(,)?) => {
        $crate::pipe!($crate::pipe::pipe($first, $second) $(, $rest)*)
    };
}
