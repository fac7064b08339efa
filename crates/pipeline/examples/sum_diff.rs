//! Sum and Difference: Forking a Bundle
//!
//! Run with: cargo run -p compositional-pipeline --example sum_diff
//!
//! `doubling` returns a pair. The fork hands the pair to `sum` and `diff`
//! concurrently and joins their scalars into a new pair, in declaration
//! order. Set `RUST_LOG=compositional_pipeline=trace` to watch branches
//! being spawned and joined.

use compositional_pipeline::{stage, Compose, Engine, TraceLog};
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

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let engine = Engine::from_env()?;
    let log = TraceLog::new();

    // `&` builds the fork; the whole pipeline is traced as one node.
    let pipeline = (stage(doubling) | (stage(sum) & stage(diff)))
        .traced("sum_diff")
        .with_log(log.clone());

    let (s, d) = engine.run(&pipeline, (158, 33))?;
    println!("sum = {}, diff = {}", s, d);

    for node in log.snapshot() {
        println!("{}", node);
    }
    Ok(())
}
