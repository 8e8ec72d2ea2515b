//! Command-line entry points.

use crate::backends::{BackendContext, RELATIONAL_BACKEND};
use crate::config::Config;
use crate::http::{self, AppState};
use crate::metrics::Metrics;
use crate::models::ModelCatalog;
use crate::repositories::{RecordRepository, SqliteRecordRepository};
use crate::server::{self, SearchMcpServer};
use crate::service::SearchService;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "crm-search")]
#[command(author, version, about = "Tenant-scoped search over CRM records", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Serve the HTTP API
    Serve,

    /// Serve MCP tools over stdio
    Mcp,

    /// Recreate search indexes and re-feed them from the record store
    Rebuild {
        /// Models to rebuild (comma-separated); all when omitted
        #[arg(long, value_delimiter = ',')]
        models: Option<Vec<String>>,
        /// Backend to use instead of the configured one
        #[arg(long)]
        backend: Option<String>,
    },

    /// Print backend health as JSON
    Health {
        /// Backend to check instead of the configured one
        #[arg(long)]
        backend: Option<String>,
    },

    /// Print backend, scoring and GDPR configuration as JSON
    Info {
        /// Backend to describe instead of the configured one
        #[arg(long)]
        backend: Option<String>,
    },
}

#[derive(Debug, Serialize)]
struct RebuildReport {
    backend: String,
    models: Vec<String>,
    success: bool,
}

/// Build the service from configuration, optionally forcing a backend.
///
/// # Errors
///
/// Fails when the record store cannot be opened or the backend name is not
/// registered.
pub async fn build_service(config: &Config, backend: Option<&str>) -> Result<SearchService> {
    let repository = SqliteRecordRepository::connect(&config.database_url)
        .await
        .with_context(|| format!("opening record store {}", config.database_url))?;
    let repository: Arc<dyn RecordRepository> = Arc::new(repository);

    let context = BackendContext {
        catalog: Arc::new(ModelCatalog::crm()),
        scoring: Arc::new(config.scoring.clone()),
        repository,
        engine: config.engine.clone(),
        metrics: Metrics::new(),
    };

    let service = SearchService::builder(context)
        .backend(backend.unwrap_or(&config.backend))
        .gdpr(config.gdpr.clone())
        .timeout(config.engine.timeout)
        .build()?;
    Ok(service)
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Command::Serve => {
            let service = Arc::new(build_service(&config, None).await?);
            http::serve(AppState::new(service), config.http_bind).await?;
        }
        Command::Mcp => {
            let service = Arc::new(build_service(&config, None).await?);
            tracing::info!("Starting MCP server with stdio transport");
            server::run_server(SearchMcpServer::new(service)).await?;
        }
        Command::Rebuild { models, backend } => {
            let service = build_service(&config, backend.as_deref()).await?;
            let models = models.filter(|m| !m.is_empty());
            let resolved: Vec<String> = service
                .catalog()
                .resolve(models.as_deref())?
                .into_iter()
                .map(|spec| spec.name.clone())
                .collect();
            let success = service.rebuild_index(models.as_deref()).await;
            print_json(&RebuildReport {
                backend: service.active_backend_name().await,
                models: resolved,
                success,
            })?;
        }
        Command::Health { backend } => {
            let service = build_service(&config, backend.as_deref()).await?;
            print_json(&service.health_check().await)?;
        }
        Command::Info { backend } => {
            let service = build_service(&config, backend.as_deref()).await?;
            let name = service.active_backend_name().await;
            let kind = if name == RELATIONAL_BACKEND {
                "relational"
            } else {
                "external"
            };
            print_json(&serde_json::json!({
                "backend": name,
                "backend_kind": kind,
                "available_backends": service.available_backends(),
                "models": service.catalog().names(),
                "scoring": service.scoring(),
                "gdpr": service.gdpr(),
            }))?;
        }
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
