// VecBase Ingest — main.rs
// Binary entry point: generate a synthetic dataset and push it through the
// ingest pipeline.
// Author: d65v <https://github.com/d65v>

use std::env;

use anyhow::Context;

use vingest::{
    IngestConfig, IngestionPipeline, MemoryStore, RandomRowGenerator, RecordingStore, Session,
};

fn main() {
    // Initialize logger — respects RUST_LOG env var
    env_logger::init();

    // Load .env if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let args: Vec<String> = env::args().collect();
    let mode = args.get(1).map(|s| s.as_str()).unwrap_or("run");

    let outcome = match mode {
        "run" => load_config().and_then(run_ingest),
        "plan" => load_config().and_then(print_plan),
        "schema" => load_config().and_then(print_schema),
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        unknown => {
            eprintln!("[vecbase-ingest] Unknown mode: '{}'. Try --help.", unknown);
            std::process::exit(1);
        }
    };

    if let Err(e) = outcome {
        eprintln!("[vecbase-ingest] {:#}", e);
        std::process::exit(1);
    }
}

fn load_config() -> anyhow::Result<IngestConfig> {
    let config = match env::var("INGEST_CONFIG") {
        Ok(path) => IngestConfig::from_json_file(&path)
            .with_context(|| format!("loading config file {}", path))?,
        Err(_) => IngestConfig::from_env(),
    };
    config.validate().context("invalid configuration")?;

    log::info!(
        "Config: collection={}, schema={}, dim={}, rows={}, batch={}",
        config.collection_name,
        config.preset,
        config.dim,
        config.total_rows,
        config.batch_size
    );
    Ok(config)
}

fn run_ingest(config: IngestConfig) -> anyhow::Result<()> {
    let schema = config.schema().context("building collection schema")?;
    let mut pipeline = IngestionPipeline::from_config(schema, &config)?;

    let store = MemoryStore::connect(&config.address)
        .with_context(|| format!("connecting to {}", config.address))?;
    let store = RecordingStore::new(store);
    let log = store.log();
    let mut session = Session::open(store);
    let mut generator = RandomRowGenerator::new(config.seed);

    let report = pipeline
        .run(&mut *session, &mut generator)
        .with_context(|| format!("ingesting into '{}'", config.collection_name))?;
    session.close();

    println!("\n[vecbase-ingest] Run summary:");
    println!("  collection  {}", report.collection);
    println!("  created     {}", report.created);
    println!("  batches     {}", report.batches);
    println!("  rows        {}", report.rows);
    println!("  indexed     {:?}", report.indexed_fields);
    println!("  loaded      {}", report.loaded);
    println!("  state       {:?}", report.state);
    println!("  store calls {}", log.len());
    Ok(())
}

fn print_plan(config: IngestConfig) -> anyhow::Result<()> {
    let plan = vingest::plan(config.total_rows, config.batch_size)?;
    println!(
        "{} rows in {} batches of {}:",
        plan.total_rows(),
        plan.batch_count(),
        plan.batch_size()
    );
    for (i, range) in plan.batches().enumerate() {
        println!("  #{:<4} {} ({} rows)", i, range, range.len());
    }
    Ok(())
}

fn print_schema(config: IngestConfig) -> anyhow::Result<()> {
    let schema = config.schema()?;
    println!("{}", serde_json::to_string_pretty(&schema)?);
    println!("index: {}", serde_json::to_string(&config.index_spec())?);
    Ok(())
}

fn print_help() {
    println!(
        r#"
VecBase Ingest — bulk loader for vector collections

USAGE:
  vecbase-ingest [MODE]

MODES:
  run     Create the collection, insert, flush, index and load (default)
  plan    Print the batch ranges a run would insert
  schema  Print the collection schema and index as JSON
  help    Show this message

ENVIRONMENT:
  INGEST_CONFIG           Path to a JSON config file (overrides the variables below)
  INGEST_ADDRESS          Store endpoint (default: localhost:19530)
  INGEST_COLLECTION       Collection name (default: hello_ingest)
  INGEST_PARTITION        Partition to insert into (default: store default)
  INGEST_SHARDS           Shard number at creation (default: 1)
  INGEST_TOTAL_ROWS       Rows to insert (default: 10005)
  INGEST_BATCH_SIZE       Rows per insert call (default: 1000)
  INGEST_DIM              Embedding dimensionality (default: 64)
  INGEST_SCHEMA           Schema preset: few | mass | array (default: few)
  INGEST_METRIC           Index metric: cosine | l2 | ip (default: cosine)
  INGEST_EXISTS_POLICY    Existing collection: skip | fail (default: skip)
  INGEST_BUILD_INDEX      Build the vector index: true | false (default: true)
  INGEST_LOAD             Load after indexing: true | false (default: true)
  INGEST_SEED             RNG seed for reproducible data
  RUST_LOG                Log level: info | debug | warn | error

AUTHOR:
  d65v <https://github.com/d65v>
"#
    );
}
