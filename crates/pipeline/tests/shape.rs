//! # Shape Tests
//!
//! Tests for the result-shape algebra as seen through composition:
//! - Pipe routing: spread, whole bundle, discard, void
//! - Join merging across fork branches
//! - User types opting in as scalars
//!
//! Every routing decision here is made by the compiler; the assertions
//! check that the value that arrives is the one expected.

use compositional_pipeline::shape::kind_of;
use compositional_pipeline::{
    bind, fork, pipe, scalar_shape, source, stage, Node, Shape, ShapeKind,
};

#[derive(Debug, Clone, PartialEq)]
struct Invoice {
    total: u64,
}

scalar_shape!(Invoice);

fn pair(x: i32) -> (i32, i32) {
    (x, x + 1)
}

fn triple(x: i32) -> (i32, i32, i32) {
    (x, x * 10, x * 100)
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_classification() {
    assert_eq!(kind_of::<()>(), ShapeKind::Void);
    assert_eq!(kind_of::<String>(), ShapeKind::Scalar);
    assert_eq!(kind_of::<Option<u8>>(), ShapeKind::Scalar);
    assert_eq!(kind_of::<Invoice>(), ShapeKind::Scalar);
    assert_eq!(kind_of::<(Invoice, bool)>(), ShapeKind::Bundle);
}

#[test]
fn test_user_scalar_normalizes_to_single_bundle() {
    let bundle = Invoice { total: 9 }.into_bundle();
    assert_eq!(bundle, (Invoice { total: 9 },));
}

// ============================================================================
// Pipe Routing
// ============================================================================

#[tokio::test]
async fn test_scalar_is_single_argument() {
    let p = source(Invoice { total: 40 }) | stage(|inv: Invoice| inv.total + 2);
    assert_eq!(p.invoke(()).await.unwrap(), 42);
}

#[tokio::test]
async fn test_bundle_spread_into_parameters() {
    let p = pipe(stage(triple), stage(|a: i32, b: i32, c: i32| a + b + c));
    assert_eq!(p.invoke((1,)).await.unwrap(), 111);
}

#[tokio::test]
async fn test_bundle_passed_whole() {
    let p = pipe(stage(triple), stage(|t: (i32, i32, i32)| t.2));
    assert_eq!(p.invoke((2,)).await.unwrap(), 200);
}

#[tokio::test]
async fn test_bundle_spread_with_bound_trailing_argument() {
    let p = stage(pair) | bind(|a: i32, b: i32, scale: i32| (a + b) * scale, (3,));
    assert_eq!(p.invoke((4,)).await.unwrap(), 27);
}

#[tokio::test]
async fn test_bundle_discarded_for_zero_argument_stage() {
    let p = stage(triple) | stage(|| String::from("fresh"));
    assert_eq!(p.invoke((5,)).await.unwrap(), "fresh");
}

#[tokio::test]
async fn test_void_result_feeds_zero_argument_stage() {
    let p = stage(|_x: i32| {}) | stage(|| 1u8);
    assert_eq!(p.invoke((5,)).await.unwrap(), 1);
}

type DynError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::test]
async fn test_array_is_single_argument() {
    let p = stage(|x: i32| [x, x * 2, x * 3]) | stage(|a: [i32; 3]| a.iter().sum::<i32>());
    assert_eq!(p.invoke((2,)).await.unwrap(), 12);
}

#[tokio::test]
async fn test_boxed_error_and_unsized_pointer_flow_as_scalars() {
    let p = stage(|code: u16| -> DynError { format!("status {}", code).into() })
        | stage(|err: DynError| -> std::sync::Arc<str> { err.to_string().into() })
        | stage(|msg: std::sync::Arc<str>| msg.len());
    assert_eq!(p.invoke((404u16,)).await.unwrap(), 10);
}

// ============================================================================
// Join Merging
// ============================================================================

#[tokio::test]
async fn test_merge_bundle_and_bundle() {
    let f = fork((stage(pair), stage(pair)));
    assert_eq!(f.invoke((1,)).await.unwrap(), (1, 2, 1, 2));
}

#[tokio::test]
async fn test_merge_bundle_and_scalar() {
    let f = fork((stage(pair), stage(|x: i32| x * 7)));
    assert_eq!(f.invoke((3,)).await.unwrap(), (3, 4, 21));
}

#[tokio::test]
async fn test_merge_bundle_and_void() {
    let f = fork((stage(pair), stage(|_x: i32| {})));
    assert_eq!(f.invoke((3,)).await.unwrap(), (3, 4));
}

#[tokio::test]
async fn test_merge_scalar_and_scalar() {
    let f = fork((stage(|x: i32| x + 1), stage(|x: i32| x.to_string())));
    assert_eq!(f.invoke((9,)).await.unwrap(), (10, String::from("9")));
}

#[tokio::test]
async fn test_merge_void_and_void() {
    let f = fork((stage(|_x: i32| {}), stage(|_x: i32| {})));
    let () = f.invoke((0,)).await.unwrap();
}

#[tokio::test]
async fn test_merged_bundle_flows_on() {
    let p = fork((stage(pair), stage(|x: i32| x * 7))) | stage(|a: i32, b: i32, c: i32| a * b + c);
    assert_eq!(p.invoke((3,)).await.unwrap(), 33);
}
