// VecBase Ingest — example/basic.rs
// Ingests a small synthetic dataset into an in-memory store and prints the
// store calls the pipeline issued.
// Run with:  cargo run --example basic

use vingest::{presets, plan, IngestionPipeline, MemoryStore, RandomRowGenerator, RecordingStore};

fn main() {
    env_logger::init();

    println!("── VecBase Ingest Basic Example ──────────────");

    let schema = presets::few_fields("hello_ingest", 8).expect("valid schema");
    let plan = plan(2_500, 1_000).expect("valid plan");
    println!("Planned {} batches:", plan.batch_count());
    for range in &plan {
        println!("  {}", range);
    }

    let mut store = RecordingStore::new(MemoryStore::new());
    let log = store.log();
    let mut pipeline = IngestionPipeline::new(schema, plan);

    let report = pipeline
        .run(&mut store, &mut RandomRowGenerator::seeded(42))
        .expect("ingest failed");

    println!("\nStore calls:");
    for call in log.calls() {
        println!("  {}", serde_json::to_string(&call).unwrap_or_default());
    }

    println!(
        "\nInserted {} rows in {} batches, final state {:?}",
        report.rows, report.batches, report.state
    );
    println!("Flushed segments: {}", store.inner().segments("hello_ingest").len());

    println!("\n── Done ──────────────────────────────────────");
}
