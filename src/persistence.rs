//! Bootstrap persistence: `energy_sources`/`energy_consumers` (§6
//! Persistence), behind a narrow [`Repository`] trait so the Postgres
//! implementation can be swapped for an in-memory fake in tests.

use crate::error::{Error, Result};
use crate::types::{Consumer, Source, SourceKind};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

/// The bootstrap data a fresh core needs: every registered source and
/// consumer, read once before the event loop starts (§5 Shared-resource
/// policy: acquired at startup, released before the event loop).
#[derive(Debug, Clone, Default)]
pub struct BootstrapData {
    /// Rows loaded from `energy_sources`.
    pub sources: Vec<Source>,
    /// Rows loaded from `energy_consumers`.
    pub consumers: Vec<Consumer>,
}

/// Read-only bootstrap access. Implementations own their own connection
/// lifecycle; the orchestrator never holds one past bootstrap.
#[async_trait::async_trait]
pub trait Repository: Send + Sync {
    /// Load every source and consumer for bootstrap.
    async fn load(&self) -> Result<BootstrapData>;
}

/// Postgres-backed repository over the two relations in §6.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Connect using a `postgres://` URL from configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| Error::configuration(format!("failed to connect to database: {e}")))?;
        Ok(Self { pool })
    }
}

#[async_trait::async_trait]
impl Repository for PostgresRepository {
    async fn load(&self) -> Result<BootstrapData> {
        let source_rows = sqlx::query("SELECT id, capacity, source_type FROM energy_sources")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::configuration(format!("failed to load energy_sources: {e}")))?;

        let mut sources = Vec::with_capacity(source_rows.len());
        for row in source_rows {
            let id: String = row.try_get("id").map_err(sql_err)?;
            let capacity: f64 = row.try_get("capacity").map_err(sql_err)?;
            let source_type: String = row.try_get("source_type").map_err(sql_err)?;
            let kind = SourceKind::parse(&source_type).ok_or_else(|| {
                Error::configuration(format!("source {id}: unrecognized source_type '{source_type}'"))
            })?;
            if capacity < 0.0 {
                return Err(Error::configuration(format!("source {id}: negative capacity {capacity}")));
            }
            sources.push(Source::new(id, kind, capacity));
        }

        let consumer_rows = sqlx::query("SELECT id, priority, demand FROM energy_consumers")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::configuration(format!("failed to load energy_consumers: {e}")))?;

        let mut consumers = Vec::with_capacity(consumer_rows.len());
        for row in consumer_rows {
            let id: String = row.try_get("id").map_err(sql_err)?;
            let priority: i32 = row.try_get("priority").map_err(sql_err)?;
            let demand: f64 = row.try_get("demand").map_err(sql_err)?;
            if priority < 1 {
                return Err(Error::configuration(format!("consumer {id}: priority must be >= 1, got {priority}")));
            }
            if demand < 0.0 {
                return Err(Error::configuration(format!("consumer {id}: negative demand {demand}")));
            }
            consumers.push(Consumer::new(id, priority as u32, demand));
        }

        validate_unique_ids(&sources, &consumers)?;
        Ok(BootstrapData { sources, consumers })
    }
}

fn sql_err(e: sqlx::Error) -> Error {
    Error::configuration(format!("malformed bootstrap row: {e}"))
}

fn validate_unique_ids(sources: &[Source], consumers: &[Consumer]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for s in sources {
        if !seen.insert(s.id.as_str()) {
            return Err(Error::configuration(format!("duplicate source id '{}'", s.id)));
        }
    }
    seen.clear();
    for c in consumers {
        if !seen.insert(c.id.as_str()) {
            return Err(Error::configuration(format!("duplicate consumer id '{}'", c.id)));
        }
    }
    Ok(())
}

/// An in-memory [`Repository`] for tests and the demo binary, bypassing
/// Postgres entirely.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    data: BootstrapData,
}

impl InMemoryRepository {
    /// Build a fake repository that returns exactly these rows.
    pub fn new(sources: Vec<Source>, consumers: Vec<Consumer>) -> Self {
        Self { data: BootstrapData { sources, consumers } }
    }
}

#[async_trait::async_trait]
impl Repository for InMemoryRepository {
    async fn load(&self) -> Result<BootstrapData> {
        validate_unique_ids(&self.data.sources, &self.data.consumers)?;
        Ok(self.data.clone())
    }
}
