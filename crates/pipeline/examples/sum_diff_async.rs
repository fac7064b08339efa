//! Sum and Difference with Handles
//!
//! Run with: cargo run -p compositional-pipeline --example sum_diff_async
//!
//! `fork_async` does not wait for its branches: the next stage receives one
//! `Handle` per branch and decides when, and in which order, to collect them.

use compositional_pipeline::{async_stage, fork_async, stage, Handle, Node, PipelineError};
use tracing_subscriber::EnvFilter;

fn doubling(a: i32, b: i32) -> (i32, i32) {
    (a * 2, b * 2)
}

fn sum(a: i32, b: i32) -> i32 {
    a + b
}

fn diff(a: i32, b: i32) -> i32 {
    a - b
}

#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let report = async_stage(|s: Handle<i32>, d: Handle<i32>| async move {
        // Collected in reverse order on purpose.
        let d = d.await?;
        let s = s.await?;
        Ok::<_, PipelineError>(format!("sum = {}, diff = {}", s, d))
    });

    let pipeline = stage(doubling) | fork_async((stage(sum), stage(diff))) | report;
    println!("{}", pipeline.invoke((158, 33)).await?);
    Ok(())
}
