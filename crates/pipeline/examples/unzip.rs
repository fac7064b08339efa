//! Unzip: One Stage per Element
//!
//! Run with: cargo run -p compositional-pipeline --example unzip
//!
//! Pairwise `unzip` applies the i-th stage to the i-th element. `unzip_into`
//! does the same over a runtime-sized list and reports a count mismatch as
//! an error instead of a compile failure.

use compositional_pipeline::{source, stage, unzip, unzip_into, Node, PipelineError};

#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    let pairwise = source((3, String::from("pipeline"), 2.5f64))
        | unzip((
            stage(|n: i32| n * n),
            stage(|s: String| s.to_uppercase()),
            stage(|x: f64| x.floor()),
        ));
    let (n, s, x) = pairwise.invoke(()).await?;
    println!("pairwise: {} {} {}", n, s, x);

    let square = |x: i64| x * x;
    let each = unzip_into([stage(square), stage(square), stage(square)]);
    println!("unzip_into: {:?}", each.invoke((vec![2i64, 3, 4],)).await?);

    let broadcast = unzip_into([stage(square)]);
    println!("broadcast: {:?}", broadcast.invoke((vec![5i64, 6, 7, 8],)).await?);

    match each.invoke((vec![1i64, 2],)).await {
        Err(err) => println!("mismatch: {}", err),
        Ok(values) => println!("unexpected: {:?}", values),
    }
    Ok(())
}
