mod mocks;

use crm_search::backends::{ExternalBackend, Meilisearch, RelationalBackend, SearchBackend};
use crm_search::matching::field_similarity;
use crm_search::models::{ModelCatalog, Record, ScoringConfig, SearchQuery};
use crm_search::privacy::{mask_email, mask_phone, GdprConfig, SensitivityFilter};
use crm_search::repositories::InMemoryRecordRepository;
use crm_search::{SearchRequest, SearchService};
use mocks::{
    context, customer_spec, seeded_repository, service, PagedMeilisearch, TENANT_A, TENANT_B,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

const QUERIES: &[&str] = &["Acme", "Akme", "Test", "corp", "Lovelace", "example", "renewal"];

#[tokio::test]
async fn test_scores_stay_within_bounds() {
    let service = service(&seeded_repository());
    for q in QUERIES {
        for fuzzy in [true, false] {
            let response = service
                .search(SearchRequest::new(*q, TENANT_A).fuzzy(fuzzy).include_inactive(true))
                .await
                .unwrap();
            for result in &response.results {
                assert!(
                    (0.0..=100.0).contains(&result.score()),
                    "{} scored {} for {:?}",
                    result.record_id,
                    result.score(),
                    q
                );
            }
        }
    }
}

#[tokio::test]
async fn test_results_sorted_by_score() {
    let service = service(&seeded_repository());
    for q in QUERIES {
        let response = service.search(SearchRequest::new(*q, TENANT_A)).await.unwrap();
        for pair in response.results.windows(2) {
            assert!(pair[0].score() >= pair[1].score());
        }
    }
}

#[tokio::test]
async fn test_tenants_never_see_each_other() {
    let service = service(&seeded_repository());
    for q in QUERIES {
        let a = service.search(SearchRequest::new(*q, TENANT_A)).await.unwrap();
        assert!(a.results.iter().all(|r| !r.record_id.starts_with("b-")));

        let b = service.search(SearchRequest::new(*q, TENANT_B)).await.unwrap();
        assert!(b.results.iter().all(|r| r.record_id.starts_with("b-")));
    }
}

#[tokio::test]
async fn test_dissimilar_records_never_match() {
    let repo = InMemoryRecordRepository::new();
    repo.upsert(
        &customer_spec(),
        Record::new("far", TENANT_A).with_field("name", "Zyzzyva Quux"),
    );
    repo.upsert(
        &customer_spec(),
        Record::new("near", TENANT_A).with_field("name", "Acme"),
    );
    let service = service(&repo);

    let response = service.search(SearchRequest::new("Acme", TENANT_A)).await.unwrap();
    let ids: Vec<&str> = response.results.iter().map(|r| r.record_id.as_str()).collect();
    assert_eq!(ids, vec!["near"]);

    let threshold = ScoringConfig::default().similarity_threshold;
    let catalog = ModelCatalog::crm();
    for q in QUERIES {
        let response = service
            .search(SearchRequest::new(*q, TENANT_A).apply_gdpr(false))
            .await
            .unwrap();
        for result in &response.results {
            let spec = catalog.get(&result.model).unwrap();
            let best = spec
                .searchable_fields
                .iter()
                .filter_map(|f| result.data.get(f).and_then(Value::as_str))
                .map(|text| field_similarity(q, text))
                .fold(0.0, f64::max);
            assert!(best >= threshold, "{} matched {:?} at {}", result.record_id, q, best);
        }
    }
}

#[tokio::test]
async fn test_raising_field_weight_never_lowers_score() {
    let repo = InMemoryRecordRepository::new();
    repo.upsert(
        &customer_spec(),
        Record::new("1", TENANT_A).with_field("name", "Acme Corporation"),
    );

    let mut previous = 0.0;
    for weight in [0.5, 1.0, 2.0, 4.0] {
        let scoring = ScoringConfig::default().with_field_weight("name", weight);
        let backend = RelationalBackend::new(
            Arc::new(repo.clone()),
            Arc::new(ModelCatalog::crm()),
            Arc::new(scoring),
        );
        let query = SearchQuery::builder("Acm", TENANT_A).build().unwrap();
        let results = backend.search(&query, None).await;
        let score = results[0].score();
        assert!(score >= previous, "weight {} scored {} < {}", weight, score, previous);
        previous = score;
    }
}

#[tokio::test]
async fn test_consecutive_pages_match_single_page() {
    let service = service(&seeded_repository());
    for k in [1, 3, 5] {
        let first = service
            .search(SearchRequest::new("Test", TENANT_A).page(k, 0))
            .await
            .unwrap();
        let second = service
            .search(SearchRequest::new("Test", TENANT_A).page(k, k))
            .await
            .unwrap();
        let both = service
            .search(SearchRequest::new("Test", TENANT_A).page(2 * k, 0))
            .await
            .unwrap();

        let paged: Vec<String> = first
            .results
            .iter()
            .chain(second.results.iter())
            .map(|r| r.record_id.clone())
            .collect();
        let single: Vec<String> = both.results.iter().map(|r| r.record_id.clone()).collect();
        assert_eq!(paged, single, "k = {}", k);
    }
}

/// Ten engine hits alternating an exact match ("Acme i") with a near miss
/// ("Akme i"), best first.
fn alternating_engine() -> PagedMeilisearch {
    let hits = (0..10)
        .map(|i| {
            let name = if i % 2 == 0 { "Acme" } else { "Akme" };
            json!({
                "id": i.to_string(),
                "tenant_id": TENANT_A,
                "is_active": true,
                "name": format!("{} {}", name, i),
                "_rankingScore": 1.0 - i as f64 * 0.05,
            })
        })
        .collect();
    PagedMeilisearch::new(hits)
}

fn engine_service(engine: PagedMeilisearch) -> SearchService {
    SearchService::builder(context(&InMemoryRecordRepository::new()))
        .register_backend("paged", move |ctx| {
            Ok(Arc::new(ExternalBackend::with_transport(
                Meilisearch,
                Arc::new(engine.clone()),
                ctx,
            )) as Arc<dyn SearchBackend>)
        })
        .backend("paged")
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_engine_pages_survive_exact_post_filter() {
    let engine = alternating_engine();
    let service = engine_service(engine.clone());
    let exact = |limit: i64, offset: i64| {
        SearchRequest::new("acme", TENANT_A)
            .models(vec!["customer".to_string()])
            .fuzzy(false)
            .page(limit, offset)
    };

    for k in [1, 2] {
        let first = service.search(exact(k, 0)).await.unwrap();
        let second = service.search(exact(k, k)).await.unwrap();
        let both = service.search(exact(2 * k, 0)).await.unwrap();

        assert_eq!(first.results.len(), k as usize, "k = {}", k);
        assert_eq!(second.results.len(), k as usize, "k = {}", k);
        let paged: Vec<String> = first
            .results
            .iter()
            .chain(second.results.iter())
            .map(|r| r.record_id.clone())
            .collect();
        let single: Vec<String> = both.results.iter().map(|r| r.record_id.clone()).collect();
        assert_eq!(paged, single, "k = {}", k);
    }

    let all = service.search(exact(5, 0)).await.unwrap();
    let ids: Vec<&str> = all.results.iter().map(|r| r.record_id.as_str()).collect();
    assert_eq!(ids, vec!["0", "2", "4", "6", "8"]);
    assert!(engine.requests().iter().any(|(offset, _)| *offset > 0));
}

#[test]
fn test_email_masking_keeps_domain() {
    for email in ["john.doe@example.com", "a@b.io", "x.y.z@mail.example.org"] {
        let masked = mask_email(email);
        let domain = email.rsplit_once('@').unwrap().1;
        assert!(masked.ends_with(&format!("@{}", domain)));
        assert_eq!(masked.matches('@').count(), 1);
        assert_ne!(masked, email);
    }
}

#[test]
fn test_phone_masking_keeps_last_four() {
    for phone in ["5551234567", "(555) 987-6543", "555.000.1111"] {
        let masked = mask_phone(phone);
        let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        assert_eq!(digits.len(), 10);
        let visible: String = masked.chars().filter(char::is_ascii_digit).collect();
        assert_eq!(visible, digits[6..]);
    }
}

#[test]
fn test_allowed_roles_bypass_filtering() {
    let filter = SensitivityFilter::new(GdprConfig::default()).unwrap();
    let mut data = Map::new();
    data.insert("email".to_string(), json!("john.doe@example.com"));
    data.insert("ssn".to_string(), json!("123-45-6789"));
    data.insert("medical_history".to_string(), json!("asthma"));
    data.insert("name".to_string(), json!("John"));

    assert_eq!(filter.filter_result(&data, None, Some("admin")), data);
    assert_ne!(filter.filter_result(&data, None, Some("sales")), data);
}
