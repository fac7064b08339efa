//! # Shapes - Classifying Results
//!
//! Every value flowing between two stages has one of three shapes:
//!
//! | Shape  | Rust type           | Normalized argument bundle |
//! |--------|---------------------|----------------------------|
//! | Void   | `()`                | `()`                       |
//! | Scalar | `i32`, `String`, .. | `(T,)`                     |
//! | Bundle | `(T1, .., Tn)`      | itself                     |
//!
//! The classification is static: it is an associated constant on a trait,
//! so the compiler picks the routing for each composition and nothing is
//! inspected at run time.
//!
//! ## Design Choices
//!
//! Rust cannot express "any type that is not a tuple", so scalars are opted
//! in explicitly. The standard library's common types are covered here,
//! including arrays, `Cow` and smart pointers to unsized values such as
//! `Box<str>` or `Box<dyn Error + Send + Sync>`. Application types use
//! [`scalar_shape!`](crate::scalar_shape):
//!
//! ```rust
//! use compositional_pipeline::scalar_shape;
//! use compositional_pipeline::shape::{Shape, ShapeKind};
//!
//! struct Invoice { total: u64 }
//! scalar_shape!(Invoice);
//!
//! assert_eq!(<Invoice as Shape>::KIND, ShapeKind::Scalar);
//! ```
//!
//! The orphan rule keeps application crates from implementing `Shape` for
//! types they do not own. A foreign type that is not covered here has to
//! travel inside a local newtype:
//!
//! ```rust
//! use compositional_pipeline::scalar_shape;
//!
//! // `SocketAddr` is not covered; the newtype is.
//! struct Endpoint(std::net::SocketAddr);
//! scalar_shape!(Endpoint);
//! ```

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet, LinkedList, VecDeque};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use crate::bundle::Bundle;

/// The three shapes a result can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// No value (`()`).
    Void,
    /// A single value passed as one argument.
    Scalar,
    /// A fixed-arity tuple spread into several arguments.
    Bundle,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeKind::Void => write!(f, "void"),
            ShapeKind::Scalar => write!(f, "scalar"),
            ShapeKind::Bundle => write!(f, "bundle"),
        }
    }
}

/// Static shape of a result type.
pub trait Shape: Sized {
    /// Which of the three shapes this type has.
    const KIND: ShapeKind;

    /// The argument bundle this result becomes for the next stage.
    type Bundle: Bundle;

    /// How a homogeneous sequence of this result is collected.
    ///
    /// `()` for void results (nothing to collect), `Vec<Self>` otherwise.
    type Many;

    /// Normalize into an argument bundle.
    fn into_bundle(self) -> Self::Bundle;

    /// Collect ordered results of a fan-out.
    fn collect_many(items: Vec<Self>) -> Self::Many;
}

impl Shape for () {
    const KIND: ShapeKind = ShapeKind::Void;
    type Bundle = ();
    type Many = ();

    #[inline]
    fn into_bundle(self) -> Self::Bundle {}

    #[inline]
    fn collect_many(_items: Vec<Self>) -> Self::Many {}
}

macro_rules! impl_bundle_shape {
    ($($t:ident)+) => {
        impl<$($t,)+> Shape for ($($t,)+) {
            const KIND: ShapeKind = ShapeKind::Bundle;
            type Bundle = Self;
            type Many = Vec<Self>;

            #[inline]
            fn into_bundle(self) -> Self::Bundle {
                self
            }

            #[inline]
            fn collect_many(items: Vec<Self>) -> Self::Many {
                items
            }
        }
    };
}

impl_bundle_shape!(T0);
impl_bundle_shape!(T0 T1);
impl_bundle_shape!(T0 T1 T2);
impl_bundle_shape!(T0 T1 T2 T3);
impl_bundle_shape!(T0 T1 T2 T3 T4);
impl_bundle_shape!(T0 T1 T2 T3 T4 T5);
impl_bundle_shape!(T0 T1 T2 T3 T4 T5 T6);
impl_bundle_shape!(T0 T1 T2 T3 T4 T5 T6 T7);
impl_bundle_shape!(T0 T1 T2 T3 T4 T5 T6 T7 T8);
impl_bundle_shape!(T0 T1 T2 T3 T4 T5 T6 T7 T8 T9);
impl_bundle_shape!(T0 T1 T2 T3 T4 T5 T6 T7 T8 T9 T10);
impl_bundle_shape!(T0 T1 T2 T3 T4 T5 T6 T7 T8 T9 T10 T11);

/// Declare one or more types as scalar results.
///
/// ```rust
/// use compositional_pipeline::scalar_shape;
///
/// struct Celsius(f64);
/// struct Reading<T>(T);
///
/// scalar_shape!(Celsius);
/// scalar_shape!(impl<T> Reading<T>);
/// ```
///
/// Generic parameters may be `?Sized`: `scalar_shape!(impl<T: ?Sized> Wrapper<T>)`.
#[macro_export]
macro_rules! scalar_shape {
    (impl<$($g:ident $(: ?$unsized:ident)?),+ $(,)?> $ty:ty) => {
        impl<$($g $(: ?$unsized)?),+> $crate::shape::Shape for $ty {
            const KIND: $crate::shape::ShapeKind = $crate::shape::ShapeKind::Scalar;
            type Bundle = (Self,);
            type Many = ::std::vec::Vec<Self>;

            #[inline]
            fn into_bundle(self) -> Self::Bundle {
                (self,)
            }

            #[inline]
            fn collect_many(items: ::std::vec::Vec<Self>) -> Self::Many {
                items
            }
        }
    };
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::shape::Shape for $ty {
                const KIND: $crate::shape::ShapeKind = $crate::shape::ShapeKind::Scalar;
                type Bundle = (Self,);
                type Many = ::std::vec::Vec<Self>;

                #[inline]
                fn into_bundle(self) -> Self::Bundle {
                    (self,)
                }

                #[inline]
                fn collect_many(items: ::std::vec::Vec<Self>) -> Self::Many {
                    items
                }
            }
        )+
    };
}

scalar_shape!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, &'static str, PathBuf, OsString, Duration, Instant, SystemTime, Ordering,
);

scalar_shape!(impl<T> Vec<T>);
scalar_shape!(impl<T> VecDeque<T>);
scalar_shape!(impl<T> LinkedList<T>);
scalar_shape!(impl<T> BinaryHeap<T>);
scalar_shape!(impl<T> Option<T>);
scalar_shape!(impl<T: ?Sized> Box<T>);
scalar_shape!(impl<T: ?Sized> Arc<T>);
scalar_shape!(impl<T: ?Sized> Rc<T>);
scalar_shape!(impl<T> BTreeSet<T>);
scalar_shape!(impl<T, S> HashSet<T, S>);
scalar_shape!(impl<K, V> BTreeMap<K, V>);
scalar_shape!(impl<K, V, S> HashMap<K, V, S>);
scalar_shape!(impl<T, E> Result<T, E>);

impl<T, const N: usize> Shape for [T; N] {
    const KIND: ShapeKind = ShapeKind::Scalar;
    type Bundle = (Self,);
    type Many = Vec<Self>;

    #[inline]
    fn into_bundle(self) -> Self::Bundle {
        (self,)
    }

    #[inline]
    fn collect_many(items: Vec<Self>) -> Self::Many {
        items
    }
}

impl<'a, B: ?Sized + ToOwned> Shape for Cow<'a, B> {
    const KIND: ShapeKind = ShapeKind::Scalar;
    type Bundle = (Self,);
    type Many = Vec<Self>;

    #[inline]
    fn into_bundle(self) -> Self::Bundle {
        (self,)
    }

    #[inline]
    fn collect_many(items: Vec<Self>) -> Self::Many {
        items
    }
}

/// Runtime view of a type's shape, for diagnostics.
pub fn kind_of<T: Shape>() -> ShapeKind {
    T::KIND
}
