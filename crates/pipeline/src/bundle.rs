//! # Bundles - Tuples as Argument Lists
//!
//! A bundle is an ordered, fixed-arity, heterogeneous collection of values.
//! We use plain Rust tuples: `()` is the empty bundle, `(a,)` a bundle of
//! one, `(a, b)` a pair, and so on. Because arity and element types live in
//! the type, bundles can never be resized at run time.
//!
//! This module holds the type-level plumbing the rest of the crate builds on:
//!
//! - [`Bundle`]: arity of a tuple, known at compile time
//! - [`NonEmpty`]: tuples with at least one element
//! - [`Concat`]: `(a, b) ++ (c,) = (a, b, c)`, used to append pre-bound
//!   arguments and to merge branch results
//! - [`Flatten`]: folds a tuple of bundles into one bundle, left to right
//!
//! Everything is generated by macros for arities up to 12 (`Bundle`,
//! `NonEmpty`) and up to 8 on each side of a concatenation.

/// A tuple used as an argument or result bundle.
pub trait Bundle {
    /// Number of elements in the bundle.
    const ARITY: usize;
}

/// Marker for bundles with at least one element.
///
/// Used to keep the "whole bundle" and "discard" calling modes from ever
/// applying to an empty argument list.
pub trait NonEmpty: Bundle {}

/// Concatenation of two bundles, preserving left-then-right order.
pub trait Concat<Rhs> {
    /// The concatenated bundle.
    type Output;

    /// Append `rhs` after `self`.
    fn concat(self, rhs: Rhs) -> Self::Output;
}

/// Fold a tuple of bundles into a single bundle.
///
/// `((a,), (), (b, c)).flatten() == (a, b, c)`
pub trait Flatten {
    /// The merged bundle.
    type Output;

    /// Concatenate all inner bundles from left to right.
    fn flatten(self) -> Self::Output;
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_bundle {
    ($($t:ident)*) => {
        impl<$($t,)*> Bundle for ($($t,)*) {
            const ARITY: usize = count!($($t)*);
        }
    };
}

macro_rules! impl_non_empty {
    ($($t:ident)+) => {
        impl<$($t,)+> NonEmpty for ($($t,)+) {}
    };
}

impl_bundle!();
impl_bundle!(T0);
impl_bundle!(T0 T1);
impl_bundle!(T0 T1 T2);
impl_bundle!(T0 T1 T2 T3);
impl_bundle!(T0 T1 T2 T3 T4);
impl_bundle!(T0 T1 T2 T3 T4 T5);
impl_bundle!(T0 T1 T2 T3 T4 T5 T6);
impl_bundle!(T0 T1 T2 T3 T4 T5 T6 T7);
impl_bundle!(T0 T1 T2 T3 T4 T5 T6 T7 T8);
impl_bundle!(T0 T1 T2 T3 T4 T5 T6 T7 T8 T9);
impl_bundle!(T0 T1 T2 T3 T4 T5 T6 T7 T8 T9 T10);
impl_bundle!(T0 T1 T2 T3 T4 T5 T6 T7 T8 T9 T10 T11);

impl_non_empty!(T0);
impl_non_empty!(T0 T1);
impl_non_empty!(T0 T1 T2);
impl_non_empty!(T0 T1 T2 T3);
impl_non_empty!(T0 T1 T2 T3 T4);
impl_non_empty!(T0 T1 T2 T3 T4 T5);
impl_non_empty!(T0 T1 T2 T3 T4 T5 T6);
impl_non_empty!(T0 T1 T2 T3 T4 T5 T6 T7);
impl_non_empty!(T0 T1 T2 T3 T4 T5 T6 T7 T8);
impl_non_empty!(T0 T1 T2 T3 T4 T5 T6 T7 T8 T9);
impl_non_empty!(T0 T1 T2 T3 T4 T5 T6 T7 T8 T9 T10);
impl_non_empty!(T0 T1 T2 T3 T4 T5 T6 T7 T8 T9 T10 T11);

// ============================================================================
// Concatenation
// ============================================================================

macro_rules! impl_concat {
    ([$($l:ident)*] [$($r:ident)*]) => {
        impl<$($l,)* $($r,)*> Concat<($($r,)*)> for ($($l,)*) {
            type Output = ($($l,)* $($r,)*);

            #[inline]
            #[allow(non_snake_case, clippy::unused_unit)]
            fn concat(self, rhs: ($($r,)*)) -> Self::Output {
                let ($($l,)*) = self;
                let ($($r,)*) = rhs;
                ($($l,)* $($r,)*)
            }
        }
    };
}

macro_rules! impl_concat_row {
    ($l:tt; $($r:tt)*) => {
        $( impl_concat!($l $r); )*
    };
}

macro_rules! impl_concat_all {
    ($($l:tt)*) => {
        $(
            impl_concat_row!($l;
                []
                [R0]
                [R0 R1]
                [R0 R1 R2]
                [R0 R1 R2 R3]
                [R0 R1 R2 R3 R4]
                [R0 R1 R2 R3 R4 R5]
                [R0 R1 R2 R3 R4 R5 R6]
                [R0 R1 R2 R3 R4 R5 R6 R7]
            );
        )*
    };
}

impl_concat_all!(
    []
    [L0]
    [L0 L1]
    [L0 L1 L2]
    [L0 L1 L2 L3]
    [L0 L1 L2 L3 L4]
    [L0 L1 L2 L3 L4 L5]
    [L0 L1 L2 L3 L4 L5 L6]
    [L0 L1 L2 L3 L4 L5 L6 L7]
);

// ============================================================================
// Flattening
// ============================================================================

impl Flatten for () {
    type Output = ();

    #[inline]
    fn flatten(self) -> Self::Output {}
}

macro_rules! impl_flatten {
    () => {};
    ($head:ident $($tail:ident)*) => {
        impl<$head, $($tail,)*> Flatten for ($head, $($tail,)*)
        where
            ($($tail,)*): Flatten,
            $head: Concat<<($($tail,)*) as Flatten>::Output>,
        {
            type Output = <$head as Concat<<($($tail,)*) as Flatten>::Output>>::Output;

            #[inline]
            #[allow(non_snake_case)]
            fn flatten(self) -> Self::Output {
                let ($head, $($tail,)*) = self;
                $head.concat(($($tail,)*).flatten())
            }
        }

        impl_flatten!($($tail)*);
    };
}

impl_flatten!(B0 B1 B2 B3 B4 B5 B6 B7);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity() {
        assert_eq!(<() as Bundle>::ARITY, 0);
        assert_eq!(<(i32,) as Bundle>::ARITY, 1);
        assert_eq!(<(i32, String, bool) as Bundle>::ARITY, 3);
        assert_eq!(
            <(u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8, u8) as Bundle>::ARITY,
            12
        );
    }

    #[test]
    fn test_concat_preserves_order() {
        assert_eq!((1, 2).concat((3,)), (1, 2, 3));
        assert_eq!(().concat((5, 10)), (5, 10));
        assert_eq!(("a",).concat(()), ("a",));
        let () = ().concat(());
    }

    #[test]
    fn test_concat_mixed_types() {
        let merged = (1u8, "two").concat((3.0f64, String::from("four")));
        assert_eq!(merged, (1u8, "two", 3.0f64, String::from("four")));
    }

    #[test]
    fn test_flatten_drops_empty_bundles() {
        assert_eq!(((1,), (), (2, 3)).flatten(), (1, 2, 3));
        assert_eq!(((), (), ()).flatten(), ());
        assert_eq!(((), ("only",)).flatten(), ("only",));
    }

    #[test]
    fn test_flatten_eight_branches() {
        let merged = ((1,), (2,), (3,), (4,), (5,), (6,), (7,), (8,)).flatten();
        assert_eq!(merged, (1, 2, 3, 4, 5, 6, 7, 8));
    }
}
