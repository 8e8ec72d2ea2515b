//! SQLite-backed record store.
//!
//! Rows of every model live in one table keyed by `(model, id)`, where
//! `model` is the catalog's table name and the searchable fields are kept
//! as a JSON object. Tenant and active filters are applied in SQL.

use crate::domain::TenantId;
use crate::error::{BackendError, BackendResult};
use crate::models::{ModelSpec, Record};
use crate::repositories::traits::{RecordRepository, RepositoryCapabilities};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::str::FromStr;

/// SQL to create the records table
pub const CREATE_RECORDS_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS search_records (
        model TEXT NOT NULL,
        id TEXT NOT NULL,
        tenant_id TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        fields TEXT NOT NULL DEFAULT '{}',
        updated_at TEXT,
        PRIMARY KEY (model, id)
    );

    CREATE INDEX IF NOT EXISTS idx_search_records_tenant
        ON search_records(model, tenant_id, is_active);
"#;

#[derive(Debug, Clone)]
pub struct SqliteRecordRepository {
    pool: SqlitePool,
}

impl SqliteRecordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a pool for `database_url` and make sure the schema exists.
    ///
    /// In-memory databases are per-connection, so they get a single-connection pool.
    pub async fn connect(database_url: &str) -> BackendResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let repo = Self::new(pool);
        repo.initialize().await?;
        Ok(repo)
    }

    pub async fn initialize(&self) -> BackendResult<()> {
        sqlx::raw_sql(CREATE_RECORDS_TABLE_SQL)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Insert or replace a record of `model`.
    pub async fn upsert(&self, model: &ModelSpec, record: &Record) -> BackendResult<()> {
        let fields = serde_json::to_string(&record.fields)?;
        sqlx::query(
            r#"
            INSERT INTO search_records (model, id, tenant_id, is_active, fields, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(model, id) DO UPDATE SET
                tenant_id = excluded.tenant_id,
                is_active = excluded.is_active,
                fields = excluded.fields,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&model.table)
        .bind(&record.id)
        .bind(&record.tenant_id)
        .bind(i64::from(record.is_active))
        .bind(fields)
        .bind(record.updated_at.map(|at| at.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, model: &ModelSpec, id: &str) -> BackendResult<bool> {
        let result = sqlx::query("DELETE FROM search_records WHERE model = ? AND id = ?")
            .bind(&model.table)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_record(row: SqliteRow) -> BackendResult<Record> {
        let fields_json: String = row.try_get("fields")?;
        let fields: BTreeMap<String, Value> = serde_json::from_str(&fields_json)?;
        let is_active: i64 = row.try_get("is_active")?;
        let updated_at: Option<String> = row.try_get("updated_at")?;
        let updated_at = updated_at
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| BackendError::Other(format!("Invalid updated_at {}: {}", s, e)))
            })
            .transpose()?;

        Ok(Record {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            is_active: is_active != 0,
            fields,
            updated_at,
        })
    }
}

#[async_trait]
impl RecordRepository for SqliteRecordRepository {
    async fn find_by_tenant(
        &self,
        model: &ModelSpec,
        tenant_id: &TenantId,
        active_only: bool,
    ) -> BackendResult<Vec<Record>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, is_active, fields, updated_at
            FROM search_records
            WHERE model = ? AND tenant_id = ? AND (? = 0 OR is_active = 1)
            ORDER BY rowid
            "#,
        )
        .bind(&model.table)
        .bind(tenant_id.as_str())
        .bind(i64::from(active_only))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn list_model(&self, model: &ModelSpec) -> BackendResult<Vec<Record>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, is_active, fields, updated_at
            FROM search_records
            WHERE model = ?
            ORDER BY rowid
            "#,
        )
        .bind(&model.table)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn count_by_model(
        &self,
        model: &ModelSpec,
        tenant_id: Option<&TenantId>,
    ) -> BackendResult<usize> {
        let tenant = tenant_id.map(|t| t.as_str().to_string());
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM search_records WHERE model = ? AND (? IS NULL OR tenant_id = ?)",
        )
        .bind(&model.table)
        .bind(tenant.clone())
        .bind(tenant)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.try_get("n")?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    async fn ping(&self) -> BackendResult<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    fn capabilities(&self) -> RepositoryCapabilities {
        RepositoryCapabilities {
            storage: "sqlite",
            trigram_similarity: true,
        }
    }
}
