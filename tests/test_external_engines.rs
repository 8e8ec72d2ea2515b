mod mocks;

use crm_search::backends::{EngineSettings, HealthStatus};
use crm_search::repositories::InMemoryRecordRepository;
use crm_search::{SearchRequest, SearchService};
use mocks::{context, customer_spec, seeded_repository, TENANT_A, TENANT_B};
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;

fn engine_service(repo: &InMemoryRecordRepository, url: String, backend: &str) -> SearchService {
    let mut ctx = context(repo);
    ctx.engine = EngineSettings {
        url: Some(url),
        api_key: Some("secret".to_string()),
        index_prefix: "crm".to_string(),
        timeout: Duration::from_secs(2),
    };
    SearchService::builder(ctx).backend(backend).build().unwrap()
}

fn customers() -> Vec<String> {
    vec!["customer".to_string()]
}

#[tokio::test]
async fn test_meilisearch_search_drops_foreign_tenant_hits() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/indexes/crm_customer/search")
        .match_header("authorization", "Bearer secret")
        .match_body(Matcher::PartialJson(json!({
            "q": "Acme",
            "filter": "tenant_id = \"tenant-a\" AND is_active = true",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "hits": [
                    {"id": "a-1", "tenant_id": TENANT_A, "is_active": true, "name": "Acme Corporation", "_rankingScore": 0.9},
                    {"id": "b-1", "tenant_id": TENANT_B, "is_active": true, "name": "Acme Corporation", "_rankingScore": 0.9}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let service = engine_service(&seeded_repository(), server.url(), "meilisearch");
    let response = service
        .search(SearchRequest::new("Acme", TENANT_A).models(customers()))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.backend, "meilisearch");
    let ids: Vec<&str> = response.results.iter().map(|r| r.record_id.as_str()).collect();
    assert_eq!(ids, vec!["a-1"]);
    assert!((response.results[0].score() - 90.0).abs() < 1e-9);
    assert!(!response.results[0].data.contains_key("tenant_id"));
}

#[tokio::test]
async fn test_engine_error_degrades_to_empty() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/indexes/crm_customer/search")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let service = engine_service(&seeded_repository(), server.url(), "meilisearch");
    let response = service
        .search(SearchRequest::new("Acme", TENANT_A).models(customers()))
        .await
        .unwrap();

    assert_eq!(response.total_count, 0);
    assert_eq!(service.metrics().engine_errors_total(), 1);
}

#[tokio::test]
async fn test_meilisearch_health() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"available"}"#)
        .create_async()
        .await;

    let service = engine_service(&seeded_repository(), server.url(), "meilisearch");
    let health = service.health_check().await;
    assert_eq!(health.status, HealthStatus::Healthy);
    assert_eq!(health.backend, "meilisearch");
}

#[tokio::test]
async fn test_meilisearch_rebuild_refeeds_from_repository() {
    let mut server = mockito::Server::new_async().await;
    let delete = server
        .mock("DELETE", "/indexes/crm_customer")
        .with_status(404)
        .with_body(r#"{"code":"index_not_found"}"#)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/indexes")
        .match_body(Matcher::PartialJson(json!({"uid": "crm_customer", "primaryKey": "id"})))
        .with_status(202)
        .with_body("{}")
        .create_async()
        .await;
    let filterable = server
        .mock("PUT", "/indexes/crm_customer/settings/filterable-attributes")
        .with_status(202)
        .with_body("{}")
        .create_async()
        .await;
    let searchable = server
        .mock("PUT", "/indexes/crm_customer/settings/searchable-attributes")
        .with_status(202)
        .with_body("{}")
        .create_async()
        .await;
    let documents = server
        .mock("POST", "/indexes/crm_customer/documents")
        .match_body(Matcher::Regex("Globex Industries".to_string()))
        .with_status(202)
        .with_body("{}")
        .create_async()
        .await;

    let service = engine_service(&seeded_repository(), server.url(), "meilisearch");
    assert!(service.rebuild_index(Some(&customers())).await);

    delete.assert_async().await;
    create.assert_async().await;
    filterable.assert_async().await;
    searchable.assert_async().await;
    documents.assert_async().await;
}

#[tokio::test]
async fn test_elasticsearch_rescales_scores() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/crm_customer/_search")
        .match_header("authorization", "ApiKey secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "hits": {
                    "max_score": 4.0,
                    "hits": [
                        {"_id": "a-1", "_score": 4.0, "_source": {"tenant_id": TENANT_A, "is_active": true, "name": "Acme Corporation"}},
                        {"_id": "d-9", "_score": 1.0, "_source": {"tenant_id": TENANT_A, "is_active": true, "name": "Akme Tools"}}
                    ]
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let service = engine_service(&seeded_repository(), server.url(), "elasticsearch");
    let response = service
        .search(SearchRequest::new("Acme", TENANT_A).models(customers()))
        .await
        .unwrap();

    let scores: Vec<f64> = response.results.iter().map(|r| r.score()).collect();
    assert_eq!(scores, vec![100.0, 25.0]);
}

#[tokio::test]
async fn test_elasticsearch_bulk_indexes_one_by_one() {
    let mut server = mockito::Server::new_async().await;
    let put = server
        .mock("PUT", Matcher::Regex(r"^/crm_customer/_doc/.+$".to_string()))
        .with_status(201)
        .with_body("{}")
        .expect(2)
        .create_async()
        .await;

    let repo = InMemoryRecordRepository::new();
    let service = engine_service(&repo, server.url(), "elasticsearch");
    let records = vec![
        crm_search::Record::new("1", TENANT_A).with_field("name", "One"),
        crm_search::Record::new("2", TENANT_A).with_field("name", "Two"),
    ];
    assert_eq!(service.bulk_index(&customer_spec().name, &records).await, 2);
    put.assert_async().await;
}
