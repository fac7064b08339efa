//! Fork-Into: Homogeneous Branches Collected in a Vec
//!
//! Run with: cargo run -p compositional-pipeline --example fork_into
//!
//! Every branch receives the same vector and produces a vector, so the
//! results are collected into a `Vec<Vec<i32>>` in branch order. The
//! topology of the pipeline is printed in Graphviz DOT format.

use compositional_pipeline::stage::Spread;
use compositional_pipeline::{fork_into, source, stage, Engine, EngineConfig, Topology};

fn double_it(v: Vec<i32>) -> Vec<i32> {
    println!("Doubling");
    v.into_iter().map(|e| e * 2).collect()
}

fn square_it(v: Vec<i32>) -> Vec<i32> {
    println!("Squaring");
    v.into_iter().map(|e| e * e).collect()
}

fn print_vecs(results: Vec<Vec<i32>>) {
    for row in results {
        let line: Vec<String> = row.iter().map(|e| e.to_string()).collect();
        println!("{}", line.join(" "));
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::new(EngineConfig::default().worker_threads(2))?;

    let branches: [(&str, fn(Vec<i32>) -> Vec<i32>); 2] =
        [("double_it", double_it), ("square_it", square_it)];
    let pipeline = source(vec![1, 2, 3, 4, 5])
        | fork_into(branches.map(|(name, f)| stage::<_, Spread>(f).named(name)))
        | stage::<_, Spread>(print_vecs);

    engine.run(&pipeline, ())?;

    let topology = Topology::of(&pipeline);
    topology.validate()?;
    println!("\n{}", topology.to_dot());
    Ok(())
}
