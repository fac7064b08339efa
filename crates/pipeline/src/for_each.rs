//! # For-Each - Fan-out Over a Collection
//!
//! `for_each(f)` takes any `IntoIterator` and runs `f` on every element as
//! its own task. Results come back in input order regardless of the order
//! the tasks finish in.
//!
//! ```text
//!   [x1, x2, x3] ──▶ f(x1) ─┐
//!                   f(x2) ─┼──▶ [y1, y2, y3]
//!                   f(x3) ─┘
//! ```
//!
//! A void `f` collects into `()`, so `for_each` can end a pipeline with a
//! side effect per element. [`for_each_async`] returns the handles instead,
//! with handle `i` belonging to element `i`.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::PipelineError;
use crate::handle::Handle;
use crate::node::Node;
use crate::shape::Shape;

/// One task per element, joined in input order.
pub struct ForEach<F> {
    pub(crate) stage: Arc<F>,
}

/// Apply `stage` to every element of the incoming collection concurrently.
pub fn for_each<F>(stage: F) -> ForEach<F> {
    ForEach {
        stage: Arc::new(stage),
    }
}

/// One task per element; the handles are returned without waiting.
pub struct ForEachAsync<F> {
    pub(crate) stage: Arc<F>,
}

/// Like [`for_each`], but returns `Vec<Handle<R>>` immediately.
pub fn for_each_async<F>(stage: F) -> ForEachAsync<F> {
    ForEachAsync {
        stage: Arc::new(stage),
    }
}

macro_rules! impl_for_each_common {
    ($name:ident) => {
        impl<F> Clone for $name<F> {
            fn clone(&self) -> Self {
                Self {
                    stage: Arc::clone(&self.stage),
                }
            }
        }

        impl<F> fmt::Debug for $name<F> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name)).finish_non_exhaustive()
            }
        }

        crate::node::impl_compose!($name<F>, fork);
    };
}

impl_for_each_common!(ForEach);
impl_for_each_common!(ForEachAsync);

fn spawn_all<F, I>(stage: &Arc<F>, items: I) -> Result<Vec<Handle<F::Output>>, PipelineError>
where
    I: IntoIterator,
    I::Item: Send + 'static,
    F: Node<(I::Item,)> + 'static,
    F::Output: 'static,
{
    items
        .into_iter()
        .map(|item| {
            let stage = Arc::clone(stage);
            Handle::spawn(async move { stage.invoke((item,)).await })
        })
        .collect()
}

impl<F, I> Node<(I,)> for ForEach<F>
where
    I: IntoIterator + Send,
    I::Item: Send + 'static,
    F: Node<(I::Item,)> + 'static,
    <F as Node<(I::Item,)>>::Output: Shape + 'static,
    <<F as Node<(I::Item,)>>::Output as Shape>::Many: Send,
{
    type Output = <<F as Node<(I::Item,)>>::Output as Shape>::Many;

    fn invoke(&self, args: (I,)) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
        let stage = Arc::clone(&self.stage);
        async move {
            let (items,) = args;
            let handles = spawn_all(&stage, items)?;
            tracing::debug!(elements = handles.len(), "for_each: spawned");

            let mut results = Vec::with_capacity(handles.len());
            for (index, handle) in handles.into_iter().enumerate() {
                results.push(handle.join_branch("for_each", index).await?);
            }
            Ok(Shape::collect_many(results))
        }
    }
}

impl<F, I> Node<(I,)> for ForEachAsync<F>
where
    I: IntoIterator + Send,
    I::Item: Send + 'static,
    F: Node<(I::Item,)> + 'static,
    <F as Node<(I::Item,)>>::Output: 'static,
{
    type Output = Vec<Handle<<F as Node<(I::Item,)>>::Output>>;

    fn invoke(&self, args: (I,)) -> impl Future<Output = Result<Self::Output, PipelineError>> + Send {
        let stage = Arc::clone(&self.stage);
        async move {
            let (items,) = args;
            let handles = spawn_all(&stage, items)?;
            tracing::debug!(elements = handles.len(), "for_each_async: spawned");
            Ok(handles)
        }
    }
}
