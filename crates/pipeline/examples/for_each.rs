//! For-Each: One Task per Element
//!
//! Run with: cargo run -p compositional-pipeline --example for_each
//!
//! Three variants over the same input:
//! 1. `for_each` with a void stage, used as a side effect
//! 2. `for_each` collecting results in input order
//! 3. `for_each_async` handing the handles to the next stage

use std::time::Duration;

use compositional_pipeline::{
    async_stage, for_each, for_each_async, stage, Handle, Node, PipelineError,
};

fn generate_input() -> Vec<i32> {
    vec![1, 2, 3, 4, 5]
}

#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    println!("=== for_each: side effects ===\n");
    let print_values = stage(generate_input) | for_each(stage(|v: i32| println!("{}", v)));
    print_values.invoke(()).await?;

    println!("\n=== for_each: collected results ===\n");
    // Later elements finish first; the result still follows input order.
    let slow_to_string = async_stage(|v: i32| async move {
        tokio::time::sleep(Duration::from_millis(10 * (5 - v as u64))).await;
        Ok::<_, PipelineError>(v.to_string())
    });
    let to_strings = stage(generate_input)
        | for_each(slow_to_string)
        | stage(|words: Vec<String>| format!("{{ {} }}", words.join(" ")));
    println!("{}", to_strings.invoke(()).await?);

    println!("\n=== for_each_async: handles ===\n");
    let print_handles = async_stage(|handles: Vec<Handle<i32>>| async move {
        for h in handles {
            println!("{}", h.await?);
        }
        Ok::<_, PipelineError>(())
    });
    let doubled = stage(generate_input) | for_each_async(stage(|v: i32| v * 2)) | print_handles;
    doubled.invoke(()).await?;

    Ok(())
}
