//! Codec Benchmarks
//!
//! ### 1. Encode (`bench_encode`)
//! - Record → resolved Avro value → payload → framed envelope
//!
//! ### 2. Decode (`bench_decode`)
//! - Envelope → schema lookup (static table) → Avro value → typed record
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench -p schemaflow-codec --bench envelope_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use schemaflow_codec::{decode, encode, ParsedSchema, StaticResolver};
use serde::{Deserialize, Serialize};

const USER_EVENT: &str = r#"{"type":"record","name":"UserEvent","fields":[
    {"name":"user_id","type":"int"},
    {"name":"action","type":"string"},
    {"name":"page","type":"string"},
    {"name":"timestamp","type":"long"}]}"#;

#[derive(Serialize, Deserialize)]
struct UserEvent {
    user_id: i32,
    action: String,
    page: String,
    timestamp: i64,
}

fn event(page_len: usize) -> UserEvent {
    UserEvent {
        user_id: 123,
        action: "click".to_string(),
        page: "/".repeat(page_len),
        timestamp: 1_700_000_000_000,
    }
}

fn bench_encode(c: &mut Criterion) {
    let schema = ParsedSchema::parse(USER_EVENT).unwrap();
    let mut group = c.benchmark_group("encode");

    for page_len in [8, 256, 4096] {
        let record = event(page_len);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(page_len), &record, |b, record| {
            b.iter(|| encode(&schema, 1, black_box(record)).unwrap());
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let schema = ParsedSchema::parse(USER_EVENT).unwrap();
    let resolver = StaticResolver::new().with_schema(1, schema.clone());
    let mut group = c.benchmark_group("decode");

    for page_len in [8, 256, 4096] {
        let bytes = encode(&schema, 1, &event(page_len)).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(page_len), &bytes, |b, bytes| {
            b.iter(|| {
                runtime.block_on(async {
                    let decoded = decode(black_box(bytes), &resolver).await.unwrap();
                    decoded.into_record::<UserEvent>().unwrap()
                })
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
