use crm_search::backends::{BackendContext, EngineSettings};
use crm_search::models::{ModelCatalog, ModelSpec, Record, ScoringConfig};
use crm_search::privacy::GdprConfig;
use crm_search::repositories::InMemoryRecordRepository;
use crm_search::{Metrics, SearchService};
use std::sync::Arc;

pub const TENANT_A: &str = "tenant-a";
pub const TENANT_B: &str = "tenant-b";

pub fn customer_spec() -> ModelSpec {
    spec("customer")
}

fn spec(name: &str) -> ModelSpec {
    ModelCatalog::crm().get(name).cloned().unwrap()
}

/// Two tenants with overlapping names, a contact, a deal, an inactive
/// customer and ten "Test Account" customers.
pub fn seeded_repository() -> InMemoryRecordRepository {
    let repo = InMemoryRecordRepository::new();
    let customers = customer_spec();

    repo.upsert(
        &customers,
        Record::new("a-1", TENANT_A)
            .with_field("name", "Acme Corporation")
            .with_field("email", "john.doe@example.com")
            .with_field("phone", "555-123-4567")
            .with_field("industry", "Manufacturing"),
    );
    repo.upsert(
        &customers,
        Record::new("b-1", TENANT_B)
            .with_field("name", "Acme Corporation")
            .with_field("email", "jane@other.example"),
    );
    repo.upsert(
        &customers,
        Record::new("a-2", TENANT_A)
            .with_field("name", "Globex Industries")
            .inactive(),
    );
    for i in 0..10 {
        repo.upsert(
            &customers,
            Record::new(format!("t-{i}"), TENANT_A).with_field("name", format!("Test Account {i}")),
        );
    }

    repo.upsert(
        &spec("contact"),
        Record::new("c-1", TENANT_A)
            .with_field("first_name", "Ada")
            .with_field("last_name", "Lovelace")
            .with_field("title", "CTO")
            .with_field("email", "ada@analytical.example"),
    );
    repo.upsert(
        &spec("deal"),
        Record::new("d-1", TENANT_A)
            .with_field("name", "Acme renewal")
            .with_field("stage", "negotiation"),
    );
    repo
}

pub fn context(repo: &InMemoryRecordRepository) -> BackendContext {
    BackendContext {
        catalog: Arc::new(ModelCatalog::crm()),
        scoring: Arc::new(ScoringConfig::default()),
        repository: Arc::new(repo.clone()),
        engine: EngineSettings::default(),
        metrics: Metrics::new(),
    }
}

/// Relational service with the default GDPR policy.
pub fn service(repo: &InMemoryRecordRepository) -> SearchService {
    service_with_gdpr(repo, GdprConfig::default())
}

pub fn service_with_gdpr(repo: &InMemoryRecordRepository, gdpr: GdprConfig) -> SearchService {
    SearchService::builder(context(repo)).gdpr(gdpr).build().unwrap()
}
