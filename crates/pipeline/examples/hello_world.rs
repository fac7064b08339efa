//! Hello World: Unzip with a Single Broadcast Stage
//!
//! Run with: cargo run -p compositional-pipeline --example hello_world
//!
//! A source produces a pair of words. `unzip` with one stage applies it to
//! every element concurrently, the pair is spread into `concat`, and the
//! sentence is printed.

use compositional_pipeline::{source, stage, unzip, Engine, EngineConfig};

fn title_case(word: String) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => word,
    }
}

fn concat(a: String, b: String) -> String {
    a + &b
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let engine = Engine::new(EngineConfig::default())?;

    let pipeline = source((String::from("hello "), String::from("world!")))
        | unzip((stage(title_case),))
        | stage(concat)
        | stage(|line: String| println!("{}", line));

    engine.run(&pipeline, ())?;
    Ok(())
}
