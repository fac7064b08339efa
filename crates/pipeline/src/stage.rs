//! # Stages - Wrapped Units of Work
//!
//! A [`Stage`] owns a callable and an ordered tuple of pre-bound trailing
//! arguments. Invoking it with leading arguments `L` calls the wrapped
//! function with `L ++ bound`, in that order.
//!
//! ## Calling Modes
//!
//! When a stage sits downstream of another node it receives that node's
//! result as an argument bundle. There are three ways the bundle can meet
//! the stage's parameter list, and the compiler picks exactly one from the
//! callable's signature:
//!
//! | Mode        | Callable takes           | Example for `(3, 4)`      |
//! |-------------|--------------------------|---------------------------|
//! | [`Spread`]  | `L ++ bound` as params   | `fn(a: i32, b: i32)`      |
//! | [`Whole`]   | `(L,) ++ bound`          | `fn(pair: (i32, i32))`    |
//! | [`Discard`] | `bound` only             | `fn()`                    |
//!
//! The mode is a marker type parameter `M`, inferred from use. A stage that
//! is built but never invoked in the same scope (for example one that is
//! only inspected with [`Topology`](crate::topology::Topology)) pins it with
//! a turbofish: `stage::<_, Spread>(f)`.
//!
//! Closures must annotate their parameter types so the signature is known
//! at the point where the mode is selected.

use std::borrow::Cow;
use std::future::Future;
use std::marker::PhantomData;

use crate::bundle::{Concat, NonEmpty};
use crate::callable::{AsyncFunc, Callable, Func, TryFunc};
use crate::error::PipelineError;
use crate::node::Node;

/// Calling mode: leading arguments are spread into parameters.
pub enum Spread {}

/// Calling mode: the incoming bundle is passed as a single argument.
pub enum Whole {}

/// Calling mode: the incoming bundle is dropped.
pub enum Discard {}

/// A callable with pre-bound trailing arguments.
pub struct Stage<C, B, M> {
    callable: C,
    bound: B,
    label: Cow<'static, str>,
    _mode: PhantomData<fn() -> M>,
}

impl<C, B, M> Stage<C, B, M> {
    fn from_parts(callable: C, bound: B, label: Cow<'static, str>) -> Self {
        Self {
            callable,
            bound,
            label,
            _mode: PhantomData,
        }
    }

    /// Replace the pre-bound trailing arguments.
    pub fn bind<B2>(self, bound: B2) -> Stage<C, B2, M> {
        Stage::from_parts(self.callable, bound, self.label)
    }

    /// Give the stage a human-readable label (used by tracing and topology).
    pub fn named(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    /// The stage's label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The pre-bound trailing arguments.
    pub fn bound(&self) -> &B {
        &self.bound
    }
}

impl<C: Clone, B: Clone, M> Clone for Stage<C, B, M> {
    fn clone(&self) -> Self {
        Stage::from_parts(self.callable.clone(), self.bound.clone(), self.label.clone())
    }
}

impl<C, B: std::fmt::Debug, M> std::fmt::Debug for Stage<C, B, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("label", &self.label)
            .field("bound", &self.bound)
            .finish()
    }
}

/// Last path segment of a type name, without generic arguments.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Wrap an infallible function as a stage.
pub fn stage<F, M>(f: F) -> Stage<Func<F>, (), M> {
    Stage::from_parts(Func(f), (), Cow::Borrowed(short_type_name::<F>()))
}

/// Wrap a function returning `Result` as a stage.
pub fn try_stage<F, M>(f: F) -> Stage<TryFunc<F>, (), M> {
    Stage::from_parts(TryFunc(f), (), Cow::Borrowed(short_type_name::<F>()))
}

/// Wrap a function returning a future of `Result` as a stage.
pub fn async_stage<F, M>(f: F) -> Stage<AsyncFunc<F>, (), M> {
    Stage::from_parts(AsyncFunc(f), (), Cow::Borrowed(short_type_name::<F>()))
}

/// Wrap an infallible function together with trailing arguments.
///
/// ```rust
/// use compositional_pipeline::{bind, Node};
///
/// fn scale(x: i32, factor: i32) -> i32 {
///     x * factor
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let triple = bind(scale, (3,));
/// assert_eq!(triple.invoke((7,)).await.unwrap(), 21);
/// # }
/// ```
pub fn bind<F, B, M>(f: F, bound: B) -> Stage<Func<F>, B, M> {
    Stage::from_parts(Func(f), bound, Cow::Borrowed(short_type_name::<F>()))
}

impl<C, B, L> Node<L> for Stage<C, B, Spread>
where
    L: Concat<B> + Send,
    B: Clone + Send + Sync,
    C: Callable<<L as Concat<B>>::Output>,
{
    type Output = C::Output;

    fn invoke(&self, args: L) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
        async move { self.callable.call(args.concat(self.bound.clone())).await }
    }
}

impl<C, B, L> Node<L> for Stage<C, B, Whole>
where
    L: NonEmpty + Send,
    (L,): Concat<B>,
    B: Clone + Send + Sync,
    C: Callable<<(L,) as Concat<B>>::Output>,
{
    type Output = C::Output;

    fn invoke(&self, args: L) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
        async move { self.callable.call((args,).concat(self.bound.clone())).await }
    }
}

impl<C, B, L> Node<L> for Stage<C, B, Discard>
where
    L: NonEmpty + Send,
    B: Clone + Send + Sync,
    C: Callable<B>,
{
    type Output = C::Output;

    fn invoke(&self, args: L) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
        drop(args);
        async move { self.callable.call(self.bound.clone()).await }
    }
}

// ============================================================================
// Source
// ============================================================================

/// A zero-argument producer yielding a clone of a fixed value.
///
/// The usual head of a pipeline whose input is known at composition time.
#[derive(Debug, Clone)]
pub struct Source<T> {
    value: T,
}

/// Start a pipeline from a value.
pub fn source<T>(value: T) -> Source<T> {
    Source { value }
}

impl<T> Source<T> {
    /// The value produced on every invocation.
    pub fn value(&self) -> &T {
        &self.value
    }
}

impl<T> Node<()> for Source<T>
where
    T: Clone + Send + Sync,
{
    type Output = T;

    fn invoke(&self, _args: ()) -> impl Future<Output = Result<T, PipelineError>> + Send {
        std::future::ready(Ok(self.value.clone()))
    }
}

crate::node::impl_compose!(Stage<C, B, M>, fork);
crate::node::impl_compose!(Source<T>, fork);
