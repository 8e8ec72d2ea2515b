//! Performance benchmarks for relational search.
//!
//! - Fuzzy vs exact ranking over a seeded in-memory store
//! - Different dataset sizes
//! - Suggestion ranking

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use crm_search::backends::{BackendContext, EngineSettings};
use crm_search::models::{ModelCatalog, Record, ScoringConfig};
use crm_search::repositories::InMemoryRecordRepository;
use crm_search::{Metrics, RequestContext, SearchRequest, SearchService};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

const TENANT: &str = "bench";

const COMPANIES: &[&str] = &[
    "Acme", "Globex", "Initech", "Umbrella", "Hooli", "Stark", "Wayne", "Wonka", "Tyrell", "Cyberdyne",
];

/// A relational service over `size` customers.
fn create_service(size: usize) -> SearchService {
    let catalog = ModelCatalog::crm();
    let customers = catalog.get("customer").cloned().unwrap();
    let repo = InMemoryRecordRepository::new();
    repo.upsert_all(
        &customers,
        (0..size).map(|i| {
            let company = COMPANIES[i % COMPANIES.len()];
            Record::new(format!("c-{i}"), TENANT)
                .with_field("name", format!("{company} Holdings {i}"))
                .with_field("email", format!("contact{i}@{}.example", company.to_lowercase()))
                .with_field("notes", "Quarterly review scheduled with procurement")
        }),
    );

    let context = BackendContext {
        catalog: Arc::new(catalog),
        scoring: Arc::new(ScoringConfig::default()),
        repository: Arc::new(repo),
        engine: EngineSettings::default(),
        metrics: Metrics::new(),
    };
    SearchService::builder(context).build().unwrap()
}

fn bench_fuzzy_vs_exact(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let service = create_service(1_000);

    let mut group = c.benchmark_group("search_mode");
    for fuzzy in [true, false] {
        group.bench_with_input(BenchmarkId::from_parameter(fuzzy), &fuzzy, |b, &fuzzy| {
            b.to_async(&rt).iter(|| async {
                let request = SearchRequest::new("Akme Holdings", TENANT).fuzzy(fuzzy);
                let _ = service.search(request).await;
            });
        });
    }
    group.finish();
}

fn bench_dataset_sizes(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("search_dataset_size");
    for size in [100, 1_000, 5_000] {
        let service = create_service(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.to_async(&rt).iter(|| async {
                let _ = service.search(SearchRequest::new("Globex", TENANT)).await;
            });
        });
    }
    group.finish();
}

fn bench_suggestions(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let service = create_service(1_000);
    let ctx = RequestContext::new(TENANT).unwrap();

    c.bench_function("field_suggestions", |b| {
        b.to_async(&rt).iter(|| async {
            let _ = service.get_suggestions("Wa", "name", 10, &ctx).await;
        });
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(Duration::from_secs(10))
        .sample_size(50);
    targets = bench_fuzzy_vs_exact,
        bench_dataset_sizes,
        bench_suggestions
}

criterion_main!(benches);
