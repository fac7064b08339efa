//! # Unzip - Distributing a Bundle Over Stages
//!
//! `unzip((f1, .., fn))` takes a bundle `(a1, .., am)` and hands each
//! element to its own stage:
//!
//! ```text
//!              ┌──────┐
//!   a1 ────────│  f1  │────┐
//!              └──────┘    │
//!              ┌──────┐    ├─▶ flatten(f1(a1) ++ f2(a2) ++ f3(a3))
//!   a2 ────────│  f2  │────┤
//!              └──────┘    │
//!              ┌──────┐    │
//!   a3 ────────│  f3  │────┘
//!              └──────┘
//! ```
//!
//! | Stages | Values | Behaviour                                    |
//! |--------|--------|----------------------------------------------|
//! | n      | n      | `fi(ai)`, pairwise                           |
//! | 1      | m      | broadcast: `f(ai)` for every element         |
//! | other  | other  | no `Node` impl, rejected at compile time     |
//!
//! Every pair runs as its own task; results merge like [`fork`](crate::fork::fork).
//!
//! A mismatched tuple form does not compile:
//!
//! ```compile_fail
//! use compositional_pipeline::{stage, unzip, Node};
//!
//! fn inc(x: i32) -> i32 { x + 1 }
//!
//! # async fn run() {
//! let u = unzip((stage(inc), stage(inc), stage(inc)));
//! let _ = u.invoke((1, 2)).await;
//! # }
//! ```
//!
//! [`unzip_into`] is the runtime-sized form. Its arity is checked on every
//! invocation and a mismatch fails with [`PipelineError::ArityMismatch`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::bundle::{Bundle, Flatten};
use crate::error::PipelineError;
use crate::fork::Branches;
use crate::handle::Handle;
use crate::node::{Compose, Node};
use crate::shape::Shape;

/// Stages applied element-wise to a bundle, joined and merged.
pub struct Unzip<T: Branches> {
    pub(crate) stages: T::Shared,
}

/// Distribute a bundle over a tuple of stages (or one broadcast stage).
pub fn unzip<T: Branches>(stages: T) -> Unzip<T> {
    Unzip {
        stages: stages.share(),
    }
}

/// Stages applied element-wise to a bundle; handles returned immediately.
pub struct UnzipAsync<T: Branches> {
    pub(crate) stages: T::Shared,
}

/// Like [`unzip`], but returns a bundle of [`Handle`]s without waiting.
pub fn unzip_async<T: Branches>(stages: T) -> UnzipAsync<T> {
    UnzipAsync {
        stages: stages.share(),
    }
}

macro_rules! impl_unzip_common {
    ($name:ident) => {
        impl<T: Branches> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self {
                    stages: self.stages.clone(),
                }
            }
        }

        impl<T: Branches + Bundle> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("stages", &T::ARITY)
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

        impl<T: Branches, Rhs> ::std::ops::BitAnd<Rhs> for $name<T> {
            type Output = crate::fork::Fork<(Self, Rhs)>;

            fn bitand(self, rhs: Rhs) -> Self::Output {
                crate::fork::fork((self, rhs))
            }
        }
    };
}

impl_unzip_common!(Unzip);
impl_unzip_common!(UnzipAsync);

// One stage per element.
macro_rules! impl_unzip_pairwise {
    ($($s:ident $a:ident $v:ident $x:ident $idx:tt),+) => {
        impl<$($s, $a,)+> Node<($($a,)+)> for Unzip<($($s,)+)>
        where
            $(
                $a: Send + 'static,
                $s: Node<($a,)> + 'static,
                <$s as Node<($a,)>>::Output: Shape + 'static,
            )+
            ($(<<$s as Node<($a,)>>::Output as Shape>::Bundle,)+): Flatten,
            <($(<<$s as Node<($a,)>>::Output as Shape>::Bundle,)+) as Flatten>::Output: Send,
        {
            type Output =
                <($(<<$s as Node<($a,)>>::Output as Shape>::Bundle,)+) as Flatten>::Output;

            fn invoke(
                &self,
                args: ($($a,)+),
            ) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
                let ($($v,)+) = self.stages.clone();
                async move {
                    let ($($x,)+) = args;
                    let pairs = <($($s,)+) as Bundle>::ARITY;
                    tracing::debug!(pairs, "unzip: spawning");
                    $( let $v = Handle::spawn(async move { $v.invoke(($x,)).await })?; )+
                    $( let $v = $v.join_branch("unzip", $idx).await?; )+
                    Ok(($(Shape::into_bundle($v),)+).flatten())
                }
            }
        }

        impl<$($s, $a,)+> Node<($($a,)+)> for UnzipAsync<($($s,)+)>
        where
            $(
                $a: Send + 'static,
                $s: Node<($a,)> + 'static,
                <$s as Node<($a,)>>::Output: 'static,
            )+
        {
            type Output = ($(Handle<<$s as Node<($a,)>>::Output>,)+);

            fn invoke(
                &self,
                args: ($($a,)+),
            ) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
                let ($($v,)+) = self.stages.clone();
                async move {
                    let ($($x,)+) = args;
                    let pairs = <($($s,)+) as Bundle>::ARITY;
                    tracing::debug!(pairs, "unzip_async: spawning");
                    $( let $v = Handle::spawn(async move { $v.invoke(($x,)).await })?; )+
                    Ok(($($v,)+))
                }
            }
        }
    };
}

impl_unzip_pairwise!(S0 A0 s0 a0 0, S1 A1 s1 a1 1);
impl_unzip_pairwise!(S0 A0 s0 a0 0, S1 A1 s1 a1 1, S2 A2 s2 a2 2);
impl_unzip_pairwise!(S0 A0 s0 a0 0, S1 A1 s1 a1 1, S2 A2 s2 a2 2, S3 A3 s3 a3 3);
impl_unzip_pairwise!(
    S0 A0 s0 a0 0, S1 A1 s1 a1 1, S2 A2 s2 a2 2, S3 A3 s3 a3 3, S4 A4 s4 a4 4
);
impl_unzip_pairwise!(
    S0 A0 s0 a0 0, S1 A1 s1 a1 1, S2 A2 s2 a2 2, S3 A3 s3 a3 3, S4 A4 s4 a4 4,
    S5 A5 s5 a5 5
);
impl_unzip_pairwise!(
    S0 A0 s0 a0 0, S1 A1 s1 a1 1, S2 A2 s2 a2 2, S3 A3 s3 a3 3, S4 A4 s4 a4 4,
    S5 A5 s5 a5 5, S6 A6 s6 a6 6
);
impl_unzip_pairwise!(
    S0 A0 s0 a0 0, S1 A1 s1 a1 1, S2 A2 s2 a2 2, S3 A3 s3 a3 3, S4 A4 s4 a4 4,
    S5 A5 s5 a5 5, S6 A6 s6 a6 6, S7 A7 s7 a7 7
);

// One stage for every element. Also covers the single-pair case.
macro_rules! impl_unzip_broadcast {
    ($($a:ident $x:ident $h:ident $idx:tt),+) => {
        impl<F, $($a,)+> Node<($($a,)+)> for Unzip<(F,)>
        where
            F: 'static $(+ Node<($a,)>)+,
            $(
                $a: Send + 'static,
                <F as Node<($a,)>>::Output: Shape + 'static,
            )+
            ($(<<F as Node<($a,)>>::Output as Shape>::Bundle,)+): Flatten,
            <($(<<F as Node<($a,)>>::Output as Shape>::Bundle,)+) as Flatten>::Output: Send,
        {
            type Output =
                <($(<<F as Node<($a,)>>::Output as Shape>::Bundle,)+) as Flatten>::Output;

            fn invoke(
                &self,
                args: ($($a,)+),
            ) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
                let (stage,) = self.stages.clone();
                async move {
                    let ($($x,)+) = args;
                    let values = <($($a,)+) as Bundle>::ARITY;
                    tracing::debug!(values, "unzip: broadcasting");
                    $(
                        let $h = {
                            let stage = Arc::clone(&stage);
                            Handle::spawn(async move {
                                <F as Node<($a,)>>::invoke(&stage, ($x,)).await
                            })?
                        };
                    )+
                    $( let $h = $h.join_branch("unzip", $idx).await?; )+
                    Ok(($(Shape::into_bundle($h),)+).flatten())
                }
            }
        }

        impl<F, $($a,)+> Node<($($a,)+)> for UnzipAsync<(F,)>
        where
            F: 'static $(+ Node<($a,)>)+,
            $(
                $a: Send + 'static,
                <F as Node<($a,)>>::Output: 'static,
            )+
        {
            type Output = ($(Handle<<F as Node<($a,)>>::Output>,)+);

            fn invoke(
                &self,
                args: ($($a,)+),
            ) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
                let (stage,) = self.stages.clone();
                async move {
                    let ($($x,)+) = args;
                    let values = <($($a,)+) as Bundle>::ARITY;
                    tracing::debug!(values, "unzip_async: broadcasting");
                    $(
                        let $h = {
                            let stage = Arc::clone(&stage);
                            Handle::spawn(async move {
                                <F as Node<($a,)>>::invoke(&stage, ($x,)).await
                            })?
                        };
                    )+
                    Ok(($($h,)+))
                }
            }
        }
    };
}

impl_unzip_broadcast!(A0 a0 h0 0);
impl_unzip_broadcast!(A0 a0 h0 0, A1 a1 h1 1);
impl_unzip_broadcast!(A0 a0 h0 0, A1 a1 h1 1, A2 a2 h2 2);
impl_unzip_broadcast!(A0 a0 h0 0, A1 a1 h1 1, A2 a2 h2 2, A3 a3 h3 3);
impl_unzip_broadcast!(A0 a0 h0 0, A1 a1 h1 1, A2 a2 h2 2, A3 a3 h3 3, A4 a4 h4 4);
impl_unzip_broadcast!(
    A0 a0 h0 0, A1 a1 h1 1, A2 a2 h2 2, A3 a3 h3 3, A4 a4 h4 4, A5 a5 h5 5
);
impl_unzip_broadcast!(
    A0 a0 h0 0, A1 a1 h1 1, A2 a2 h2 2, A3 a3 h3 3, A4 a4 h4 4, A5 a5 h5 5,
    A6 a6 h6 6
);
impl_unzip_broadcast!(
    A0 a0 h0 0, A1 a1 h1 1, A2 a2 h2 2, A3 a3 h3 3, A4 a4 h4 4, A5 a5 h5 5,
    A6 a6 h6 6, A7 a7 h7 7
);

// ============================================================================
// unzip_into
// ============================================================================

/// Runtime-sized distribution of a `Vec` of values over homogeneous stages.
pub struct UnzipInto<N> {
    pub(crate) stages: Vec<Arc<N>>,
}

/// Distribute a `Vec` of values over `stages`.
///
/// With as many stages as values each value goes to its own stage; with a
/// single stage every value goes to it. Anything else fails with
/// [`PipelineError::ArityMismatch`] before any work is scheduled.
pub fn unzip_into<N>(stages: impl IntoIterator<Item = N>) -> UnzipInto<N> {
    UnzipInto {
        stages: stages.into_iter().map(Arc::new).collect(),
    }
}

impl<N> UnzipInto<N> {
    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// True when there are no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    fn assign(&self, values: usize) -> Result<Vec<Arc<N>>, PipelineError> {
        match self.stages.len() {
            n if n == values => Ok(self.stages.clone()),
            1 => Ok(vec![Arc::clone(&self.stages[0]); values]),
            n => Err(PipelineError::ArityMismatch { stages: n, values }),
        }
    }
}

impl<N> Clone for UnzipInto<N> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
        }
    }
}

impl<N> fmt::Debug for UnzipInto<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnzipInto")
            .field("stages", &self.stages.len())
            .finish()
    }
}

impl<T, N> Node<(Vec<T>,)> for UnzipInto<N>
where
    T: Send + 'static,
    N: Node<(T,)> + 'static,
    <N as Node<(T,)>>::Output: Shape + 'static,
    <<N as Node<(T,)>>::Output as Shape>::Many: Send,
{
    type Output = <<N as Node<(T,)>>::Output as Shape>::Many;

    fn invoke(
        &self,
        args: (Vec<T>,),
    ) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
        let (values,) = args;
        let assigned = self.assign(values.len());
        async move {
            let assigned = assigned?;
            tracing::debug!(pairs = assigned.len(), "unzip_into: spawning");
            let mut handles = Vec::with_capacity(assigned.len());
            for (stage, value) in assigned.into_iter().zip(values) {
                handles.push(Handle::spawn(async move { stage.invoke((value,)).await })?);
            }

            let mut results = Vec::with_capacity(handles.len());
            for (index, handle) in handles.into_iter().enumerate() {
                results.push(handle.join_branch("unzip_into", index).await?);
            }
            Ok(Shape::collect_many(results))
        }
    }
}

crate::node::impl_compose!(UnzipInto<N>, fork);
