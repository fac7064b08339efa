//! # Concurrency Tests
//!
//! Tests for the concurrent combinators:
//! - Results keep declaration / input order whatever the completion order
//! - Failure policy: first failure returned, siblings run to completion
//! - Panics captured as errors
//! - Handle retrieval on both runtime flavours
//! - Scheduling outside a runtime

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Wake, Waker};
use std::time::{Duration, Instant};

use compositional_pipeline::{
    async_stage, for_each, for_each_async, fork, fork_async, fork_into, stage, try_stage, unzip,
    Engine, EngineConfig, Handle, Node, PipelineError,
};

#[derive(Debug)]
struct Rejected(&'static str);

impl std::fmt::Display for Rejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rejected: {}", self.0)
    }
}

impl std::error::Error for Rejected {}

fn sleep_then<T: Send + 'static>(ms: u64, value: T) -> impl Future<Output = Result<T, PipelineError>> {
    async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(value)
    }
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fork_slow_middle_branch_keeps_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);

    let f = fork((
        stage(|x: i32| format!("S{}", x)),
        async_stage(|x: i32| sleep_then(80, format!("S{}", x + 1))),
        stage(move |x: i32| sink.lock().unwrap().push(x)),
    ));

    let (first, second) = f.invoke((1,)).await.unwrap();
    assert_eq!(first, "S1");
    assert_eq!(second, "S2");
    assert_eq!(*log.lock().unwrap(), vec![1]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_branches_run_concurrently() {
    let slow = || async_stage(|_x: u8| sleep_then(100, ()));
    let f = fork((slow(), slow(), slow(), slow()));

    let start = Instant::now();
    let () = f.invoke((0u8,)).await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(300));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_for_each_jittered_delays_keep_input_order() {
    let jittered = async_stage(|x: u64| {
        let delay = [50, 10, 40, 0, 20][(x % 5) as usize];
        sleep_then(delay, x * x)
    });
    let f = for_each(jittered);
    assert_eq!(
        f.invoke((vec![2u64, 4, 9, 10, 12],)).await.unwrap(),
        vec![4, 16, 81, 100, 144]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unzip_pairwise_and_broadcast_order() {
    let tagged = |tag: &'static str, ms: u64| {
        async_stage(move |x: i32| sleep_then(ms, format!("{}{}", tag, x)))
    };

    let pairwise = unzip((tagged("a", 60), tagged("b", 0), tagged("c", 30)));
    assert_eq!(
        pairwise.invoke((1, 2, 3)).await.unwrap(),
        (String::from("a1"), String::from("b2"), String::from("c3"))
    );

    let broadcast = unzip((async_stage(|x: u64| sleep_then(40 - x * 10, x)),));
    assert_eq!(broadcast.invoke((0u64, 1u64, 2u64, 3u64)).await.unwrap(), (0, 1, 2, 3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fork_into_order() {
    let f = fork_into((0..6u64).map(|k| {
        async_stage(move |x: u64| sleep_then((6 - k) * 10, x + k))
    }));
    assert_eq!(
        f.invoke((100u64,)).await.unwrap(),
        vec![100, 101, 102, 103, 104, 105]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_invocations_keep_their_own_arguments() {
    let f = fork((
        async_stage(|x: u64| sleep_then(50 - x, x * 10)),
        async_stage(|x: u64| sleep_then(x, x + 1)),
    ));

    let (first, second) = tokio::join!(f.invoke((10u64,)), f.invoke((40u64,)));
    assert_eq!(first.unwrap(), (100, 11));
    assert_eq!(second.unwrap(), (400, 41));
}

// ============================================================================
// Failure Policy
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_first_failure_returned_and_sibling_completes() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);

    let f = fork((
        try_stage(|_x: i32| Err::<i32, _>(Rejected("left"))),
        async_stage(move |x: i32| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                flag.store(true, Ordering::SeqCst);
                Ok::<_, PipelineError>(x)
            }
        }),
    ));

    let err = f.invoke((1,)).await.unwrap_err();
    assert_eq!(err.stage_error::<Rejected>().map(|r| r.0), Some("left"));

    // The sibling was not cancelled.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(finished.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failures_reported_in_declaration_order() {
    let f = fork((
        async_stage(|_x: i32| async {
            tokio::time::sleep(Duration::from_millis(60)).await;
            Err::<i32, _>(Rejected("slow"))
        }),
        try_stage(|_x: i32| Err::<i32, _>(Rejected("fast"))),
    ));
    let err = f.invoke((0,)).await.unwrap_err();
    assert_eq!(err.stage_error::<Rejected>().map(|r| r.0), Some("slow"));
}

#[tokio::test]
async fn test_panic_becomes_branch_panicked() {
    let f = for_each(stage(|x: i32| {
        if x == 3 {
            panic!("element {} exploded", x);
        }
        x
    }));
    match f.invoke((vec![1, 2, 3],)).await {
        Err(PipelineError::BranchPanicked { message }) => {
            assert_eq!(message, "element 3 exploded")
        }
        other => panic!("unexpected: {:?}", other),
    }
}

// ============================================================================
// Handles
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dropped_handles_detach() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);
    let f = for_each_async(stage(move |_x: u8| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let handles = f.invoke((vec![1u8, 2, 3],)).await.unwrap();
    drop(handles);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_wait_from_sync_stage_on_multi_thread_runtime() {
    let consume = stage(|a: Handle<i32>, b: Handle<i32>| -> i32 {
        let a = a.wait().unwrap_or(-1);
        let b = b.wait().unwrap_or(-1);
        a * b
    });
    let p = fork_async((stage(|x: i32| x + 1), stage(|x: i32| x + 2))) | consume;
    assert_eq!(p.invoke((4,)).await.unwrap(), 30);
}

#[tokio::test]
async fn test_wait_on_current_thread_runtime_is_an_error() {
    let p = fork_async((stage(|x: i32| x),))
        | stage(|h: Handle<i32>| matches!(h.wait(), Err(PipelineError::BlockingWaitUnsupported)));
    assert!(p.invoke((4,)).await.unwrap());
}

#[tokio::test]
async fn test_handles_retrieved_in_any_order() {
    let p = fork_async((
        async_stage(|x: i32| sleep_then(30, x)),
        async_stage(|x: i32| sleep_then(0, -x)),
    )) | async_stage(|a: Handle<i32>, b: Handle<i32>| async move {
        let b = b.join().await?;
        let a = a.join().await?;
        Ok::<_, PipelineError>((a, b))
    });
    assert_eq!(p.invoke((5,)).await.unwrap(), (5, -5));
}

#[test]
fn test_handle_outliving_its_engine_is_cancelled() {
    let engine = Engine::new(EngineConfig::default().worker_threads(1)).unwrap();
    let f = fork_async((async_stage(|x: i32| sleep_then(5_000, x)),));
    let (pending,) = engine.run(&f, (1,)).unwrap();

    drop(engine);
    assert!(matches!(pending.wait(), Err(PipelineError::BranchCancelled)));
}

// ============================================================================
// Runtime Availability
// ============================================================================

struct Noop;

impl Wake for Noop {
    fn wake(self: Arc<Self>) {}
}

#[test]
fn test_concurrent_work_outside_runtime() {
    let f = for_each(stage(|x: i32| x));
    let waker = Waker::from(Arc::new(Noop));
    let mut cx = Context::from_waker(&waker);

    let mut fut = std::pin::pin!(f.invoke((vec![1, 2],)));
    match fut.as_mut().poll(&mut cx) {
        Poll::Ready(Err(PipelineError::NoRuntime)) => {}
        Poll::Ready(other) => panic!("unexpected: {:?}", other),
        Poll::Pending => panic!("should fail before suspending"),
    }
}

#[test]
fn test_sequential_work_needs_no_runtime() {
    let p = stage(|x: i32| x + 1) | stage(|x: i32| x * 3);
    let waker = Waker::from(Arc::new(Noop));
    let mut cx = Context::from_waker(&waker);

    let mut fut = std::pin::pin!(p.invoke((1,)));
    assert!(matches!(fut.as_mut().poll(&mut cx), Poll::Ready(Ok(6))));
}
