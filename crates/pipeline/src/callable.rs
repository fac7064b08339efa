//! # Callables - Adapting Plain Functions
//!
//! A stage wraps user code, and user code comes in three flavours:
//!
//! - [`Func`]: `Fn(A..) -> R`, which cannot fail
//! - [`TryFunc`]: `Fn(A..) -> Result<R, E>`, a fallible sync function
//! - [`AsyncFunc`]: `Fn(A..) -> impl Future<Output = Result<R, E>>`
//!
//! All three implement [`Callable`] for a tuple of arguments, so a stage
//! can treat them uniformly. Arguments are spread from the tuple into the
//! function's parameter list; impls exist for 0 to 8 parameters.

use std::future::Future;

use crate::error::PipelineError;

/// Something that can be called with an argument bundle.
pub trait Callable<Args>: Send + Sync {
    /// The raw result of the call.
    type Output: Send;

    /// Call with the arguments spread into parameters.
    fn call(&self, args: Args)
        -> impl Future<Output = Result<Self::Output, PipelineError>> + Send;
}

/// An infallible synchronous function.
#[derive(Clone, Copy)]
pub struct Func<F>(pub F);

/// A synchronous function returning `Result`.
#[derive(Clone, Copy)]
pub struct TryFunc<F>(pub F);

/// A function returning a future of `Result`.
#[derive(Clone, Copy)]
pub struct AsyncFunc<F>(pub F);

macro_rules! impl_callable {
    ($($a:ident)*) => {
        impl<F, R, $($a,)*> Callable<($($a,)*)> for Func<F>
        where
            F: Fn($($a),*) -> R + Send + Sync,
            R: Send,
        {
            type Output = R;

            #[inline]
            #[allow(non_snake_case)]
            fn call(
                &self,
                args: ($($a,)*),
            ) -> impl Future<Output = Result<R, PipelineError>> + Send {
                let ($($a,)*) = args;
                std::future::ready(Ok((self.0)($($a),*)))
            }
        }

        impl<F, R, E, $($a,)*> Callable<($($a,)*)> for TryFunc<F>
        where
            F: Fn($($a),*) -> Result<R, E> + Send + Sync,
            R: Send,
            E: std::error::Error + Send + Sync + 'static,
        {
            type Output = R;

            #[inline]
            #[allow(non_snake_case)]
            fn call(
                &self,
                args: ($($a,)*),
            ) -> impl Future<Output = Result<R, PipelineError>> + Send {
                let ($($a,)*) = args;
                std::future::ready((self.0)($($a),*).map_err(PipelineError::stage))
            }
        }

        impl<F, Fut, R, E, $($a,)*> Callable<($($a,)*)> for AsyncFunc<F>
        where
            F: Fn($($a),*) -> Fut + Send + Sync,
            Fut: Future<Output = Result<R, E>> + Send,
            R: Send,
            E: std::error::Error + Send + Sync + 'static,
        {
            type Output = R;

            #[inline]
            #[allow(non_snake_case)]
            fn call(
                &self,
                args: ($($a,)*),
            ) -> impl Future<Output = Result<R, PipelineError>> + Send {
                let ($($a,)*) = args;
                let fut = (self.0)($($a),*);
                async move { fut.await.map_err(PipelineError::stage) }
            }
        }
    };
}

impl_callable!();
impl_callable!(A0);
impl_callable!(A0 A1);
impl_callable!(A0 A1 A2);
impl_callable!(A0 A1 A2 A3);
impl_callable!(A0 A1 A2 A3 A4);
impl_callable!(A0 A1 A2 A3 A4 A5);
impl_callable!(A0 A1 A2 A3 A4 A5 A6);
impl_callable!(A0 A1 A2 A3 A4 A5 A6 A7);

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::ParseIntError;

    fn add(a: i32, b: i32) -> i32 {
        a + b
    }

    fn parse(s: &'static str) -> Result<i32, ParseIntError> {
        s.parse()
    }

    #[tokio::test]
    async fn test_func_spreads_arguments() {
        let f = Func(add);
        assert_eq!(f.call((2, 3)).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_func_zero_arguments() {
        let f = Func(|| "ready");
        assert_eq!(f.call(()).await.unwrap(), "ready");
    }

    #[tokio::test]
    async fn test_try_func_propagates_error() {
        let f = TryFunc(parse);
        assert_eq!(f.call(("42",)).await.unwrap(), 42);

        let err = f.call(("forty-two",)).await.unwrap_err();
        assert!(err.stage_error::<ParseIntError>().is_some());
    }

    #[tokio::test]
    async fn test_async_func() {
        let f = AsyncFunc(|a: u64, b: u64| async move {
            tokio::task::yield_now().await;
            Ok::<_, PipelineError>(a * b)
        });
        assert_eq!(f.call((6u64, 7u64)).await.unwrap(), 42);
    }
}
