//! Shared fixtures for integration tests.

#![allow(dead_code)]

mod failing_backend;
mod paged_engine;
mod seeded;

pub use failing_backend::{FailingBackend, FailureMode};
pub use paged_engine::PagedMeilisearch;
pub use seeded::{
    context, customer_spec, seeded_repository, service, service_with_gdpr, TENANT_A, TENANT_B,
};
