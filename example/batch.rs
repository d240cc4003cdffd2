// VecBase Ingest — example/batch.rs
// Demonstrates hand-built column batches and the alignment errors the
// pipeline reports before anything reaches the store.

use vingest::presets::{ADDRESS_COL, EMBEDDING_COL, ID_COL, RANDOM_COL};
use vingest::{presets, validate_batch, ColumnBuffer, MemoryStore, StoreClient};

fn main() {
    let schema = presets::few_fields("batch_demo", 3).expect("valid schema");
    let mut store = MemoryStore::new();
    store.create_collection(&schema, 1).expect("create collection");

    let good = vec![
        ColumnBuffer::int64(ID_COL, vec![0, 1, 2]),
        ColumnBuffer::double(RANDOM_COL, vec![0.1, 0.2, 0.3]),
        ColumnBuffer::varchar(ADDRESS_COL, vec!["a".into(), "b".into(), "c".into()]),
        ColumnBuffer::float_vector(
            EMBEDDING_COL,
            3,
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]],
        )
        .expect("rows of dim 3"),
    ];

    // each of these is rejected before insert
    let mut short = good.clone();
    short[1] = ColumnBuffer::double(RANDOM_COL, vec![0.1, 0.2]);
    let mut swapped = good.clone();
    swapped.swap(1, 2);
    let mut flat = good.clone();
    flat[3] = ColumnBuffer::float_vector_flat(EMBEDDING_COL, 2, vec![0.0; 6]).expect("rows of dim 2");

    for (label, columns) in [("good", &good), ("short", &short), ("swapped", &swapped), ("dim", &flat)] {
        match validate_batch(&schema, columns) {
            Ok(rows) => {
                let written = store
                    .insert("batch_demo", "", columns)
                    .expect("insert validated batch");
                println!("{:8} => inserted {} of {} rows", label, written, rows);
            }
            Err(e) => println!("{:8} => {}", label, e),
        }
    }

    println!("Rows in store: {}", store.row_count("batch_demo"));
}
