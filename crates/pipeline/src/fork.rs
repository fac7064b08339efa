//! # Fork - Concurrent Composition
//!
//! `fork((s1, .., sn))` runs every branch on its own Tokio task with a clone
//! of the same arguments, then merges the results left to right.
//!
//! ```text
//!               ┌──────┐
//!        ┌──────│  s1  │──────┐
//!        │      └──────┘      │
//!  args ─┤      ┌──────┐      ├─▶ flatten(s1 ++ s2 ++ s3)
//!        ├──────│  s2  │──────┤
//!        │      └──────┘      │
//!        │      ┌──────┐      │
//!        └──────│  s3  │──────┘
//!               └──────┘
//! ```
//!
//! ## Merging
//!
//! Each branch result is normalized by [`Shape`] and the bundles are
//! concatenated, so void branches vanish, scalars contribute one element and
//! bundles contribute all of theirs. A fork whose branches are all void
//! returns `()`.
//!
//! ## Variants
//!
//! | Combinator   | Branches                 | Returns                        |
//! |--------------|--------------------------|--------------------------------|
//! | [`fork`]     | tuple, 1 to 8            | merged bundle                  |
//! | [`fork_async`] | tuple, 1 to 8          | tuple of [`Handle`]s           |
//! | [`fork_into`] | `Vec<N>`, any length    | `Shape::Many` in branch order  |
//!
//! ## Failures
//!
//! Branches are awaited in declaration order and the first failure met is
//! returned. Remaining branches are not cancelled; they run to completion
//! and their results are dropped.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::bundle::{Bundle, Flatten};
use crate::error::PipelineError;
use crate::handle::Handle;
use crate::node::{Compose, Node};
use crate::shape::Shape;

/// A tuple of branches, each shared behind an `Arc` so spawned tasks can
/// own it.
pub trait Branches {
    /// The tuple with every element wrapped in `Arc`.
    type Shared: Clone;

    /// Wrap every element.
    fn share(self) -> Self::Shared;
}

macro_rules! impl_branches {
    ($($s:ident)+) => {
        impl<$($s,)+> Branches for ($($s,)+) {
            type Shared = ($(Arc<$s>,)+);

            #[inline]
            #[allow(non_snake_case)]
            fn share(self) -> Self::Shared {
                let ($($s,)+) = self;
                ($(Arc::new($s),)+)
            }
        }
    };
}

impl_branches!(S0);
impl_branches!(S0 S1);
impl_branches!(S0 S1 S2);
impl_branches!(S0 S1 S2 S3);
impl_branches!(S0 S1 S2 S3 S4);
impl_branches!(S0 S1 S2 S3 S4 S5);
impl_branches!(S0 S1 S2 S3 S4 S5 S6);
impl_branches!(S0 S1 S2 S3 S4 S5 S6 S7);

// ============================================================================
// fork
// ============================================================================

/// Branches run concurrently on the same input, joined and merged.
pub struct Fork<T: Branches> {
    pub(crate) branches: T::Shared,
}

/// Concurrent composition of a tuple of branches.
pub fn fork<T: Branches>(branches: T) -> Fork<T> {
    Fork {
        branches: branches.share(),
    }
}

/// Branches run concurrently; their handles are returned without waiting.
pub struct ForkAsync<T: Branches> {
    pub(crate) branches: T::Shared,
}

/// Like [`fork`], but returns a tuple of [`Handle`]s immediately.
///
/// A downstream [`async_stage`](crate::stage::async_stage) can retrieve the
/// handles in any order.
pub fn fork_async<T: Branches>(branches: T) -> ForkAsync<T> {
    ForkAsync {
        branches: branches.share(),
    }
}

macro_rules! impl_fork_common {
    ($name:ident) => {
        impl<T: Branches> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self {
                    branches: self.branches.clone(),
                }
            }
        }

        impl<T: Branches + Bundle> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("branches", &T::ARITY)
                    .finish()
            }
        }

        impl<T: Branches> Compose for $name<T> {}

        impl<T: Branches, Rhs> ::std::ops::BitOr<Rhs> for $name<T> {
            type Output = crate::pipe::Pipe<Self, Rhs>;

            fn bitor(self, rhs: Rhs) -> Self::Output {
                crate::pipe::pipe(self, rhs)
            }
        }
    };
}

impl_fork_common!(Fork);
impl_fork_common!(ForkAsync);

macro_rules! impl_fork {
    ($($s:ident $v:ident $idx:tt),+) => {
        impl<Args, $($s,)+> Node<Args> for Fork<($($s,)+)>
        where
            Args: Clone + Send + 'static,
            $(
                $s: Node<Args> + 'static,
                <$s as Node<Args>>::Output: Shape + 'static,
            )+
            ($(<<$s as Node<Args>>::Output as Shape>::Bundle,)+): Flatten,
            <($(<<$s as Node<Args>>::Output as Shape>::Bundle,)+) as Flatten>::Output: Send,
        {
            type Output =
                <($(<<$s as Node<Args>>::Output as Shape>::Bundle,)+) as Flatten>::Output;

            fn invoke(
                &self,
                args: Args,
            ) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
                let ($($v,)+) = self.branches.clone();
                async move {
                    let branches = <($($s,)+) as Bundle>::ARITY;
                    tracing::debug!(branches, "fork: spawning");
                    $(
                        let $v = {
                            let args = args.clone();
                            Handle::spawn(async move { $v.invoke(args).await })?
                        };
                    )+
                    $( let $v = $v.join_branch("fork", $idx).await?; )+
                    Ok(($(Shape::into_bundle($v),)+).flatten())
                }
            }
        }

        impl<Args, $($s,)+> Node<Args> for ForkAsync<($($s,)+)>
        where
            Args: Clone + Send + 'static,
            $( $s: Node<Args> + 'static, <$s as Node<Args>>::Output: 'static, )+
        {
            type Output = ($(Handle<<$s as Node<Args>>::Output>,)+);

            fn invoke(
                &self,
                args: Args,
            ) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
                let ($($v,)+) = self.branches.clone();
                async move {
                    let branches = <($($s,)+) as Bundle>::ARITY;
                    tracing::debug!(branches, "fork_async: spawning");
                    $(
                        let $v = {
                            let args = args.clone();
                            Handle::spawn(async move { $v.invoke(args).await })?
                        };
                    )+
                    Ok(($($v,)+))
                }
            }
        }
    };
}

impl_fork!(S0 s0 0);
impl_fork!(S0 s0 0, S1 s1 1);
impl_fork!(S0 s0 0, S1 s1 1, S2 s2 2);
impl_fork!(S0 s0 0, S1 s1 1, S2 s2 2, S3 s3 3);
impl_fork!(S0 s0 0, S1 s1 1, S2 s2 2, S3 s3 3, S4 s4 4);
impl_fork!(S0 s0 0, S1 s1 1, S2 s2 2, S3 s3 3, S4 s4 4, S5 s5 5);
impl_fork!(S0 s0 0, S1 s1 1, S2 s2 2, S3 s3 3, S4 s4 4, S5 s5 5, S6 s6 6);
impl_fork!(S0 s0 0, S1 s1 1, S2 s2 2, S3 s3 3, S4 s4 4, S5 s5 5, S6 s6 6, S7 s7 7);

// `fork & c` widens the fork instead of nesting it.
macro_rules! impl_fork_append {
    ($($s:ident $v:ident),+) => {
        impl<$($s,)+ Rhs> ::std::ops::BitAnd<Rhs> for Fork<($($s,)+)> {
            type Output = Fork<($($s,)+ Rhs,)>;

            fn bitand(self, rhs: Rhs) -> Self::Output {
                let ($($v,)+) = self.branches;
                Fork {
                    branches: ($($v,)+ Arc::new(rhs),),
                }
            }
        }
    };
}

impl_fork_append!(S0 s0);
impl_fork_append!(S0 s0, S1 s1);
impl_fork_append!(S0 s0, S1 s1, S2 s2);
impl_fork_append!(S0 s0, S1 s1, S2 s2, S3 s3);
impl_fork_append!(S0 s0, S1 s1, S2 s2, S3 s3, S4 s4);
impl_fork_append!(S0 s0, S1 s1, S2 s2, S3 s3, S4 s4, S5 s5);
impl_fork_append!(S0 s0, S1 s1, S2 s2, S3 s3, S4 s4, S5 s5, S6 s6);

// ============================================================================
// fork_into
// ============================================================================

/// Homogeneous branches, any number, collected in branch order.
pub struct ForkInto<N> {
    pub(crate) branches: Vec<Arc<N>>,
}

/// Run every node in `branches` concurrently on the same input.
///
/// Results are collected into [`Shape::Many`]: a `Vec` in branch order, or
/// `()` when the branches are void.
pub fn fork_into<N>(branches: impl IntoIterator<Item = N>) -> ForkInto<N> {
    ForkInto {
        branches: branches.into_iter().map(Arc::new).collect(),
    }
}

impl<N> ForkInto<N> {
    /// Number of branches.
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// True when there are no branches.
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

impl<N> Clone for ForkInto<N> {
    fn clone(&self) -> Self {
        Self {
            branches: self.branches.clone(),
        }
    }
}

impl<N> fmt::Debug for ForkInto<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForkInto")
            .field("branches", &self.branches.len())
            .finish()
    }
}

impl<Args, N> Node<Args> for ForkInto<N>
where
    Args: Clone + Send + 'static,
    N: Node<Args> + 'static,
    <N as Node<Args>>::Output: Shape + 'static,
    <<N as Node<Args>>::Output as Shape>::Many: Send,
{
    type Output = <<N as Node<Args>>::Output as Shape>::Many;

    fn invoke(&self, args: Args) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
        let branches = self.branches.clone();
        async move {
            tracing::debug!(branches = branches.len(), "fork_into: spawning");
            let mut handles = Vec::with_capacity(branches.len());
            for branch in branches {
                let args = args.clone();
                handles.push(Handle::spawn(async move { branch.invoke(args).await })?);
            }

            let mut results = Vec::with_capacity(handles.len());
            for (index, handle) in handles.into_iter().enumerate() {
                results.push(handle.join_branch("fork_into", index).await?);
            }
            Ok(Shape::collect_many(results))
        }
    }
}

crate::node::impl_compose!(ForkInto<N>, fork);
