//! # inpho-db
//!
//! PostgreSQL entity store and graph publisher for the InPhO mining
//! pipeline.
//!
//! This crate provides:
//! - Connection pool management
//! - Term and search-pattern loading ([`TermSupply`])
//! - Article list and key terms ([`DocumentSupply`])
//! - Node entropy write-back ([`EntropySink`])
//! - Transactional replacement of graph partitions ([`EdgeSink`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use inpho_db::{Database, EntityKind, TermSupply};
//!
//! let db = Database::connect("postgres://localhost/inpho").await?;
//! let ideas = db.terms.load_terms(EntityKind::Idea).await?;
//! ```

pub mod documents;
pub mod edges;
pub mod pool;
pub mod terms;

// Always compiled so integration tests (in tests/) can use it.
pub mod test_fixtures;

pub use inpho_core::*;

pub use documents::PgDocumentRepository;
pub use edges::PgEdgeRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use terms::PgTermRepository;

/// Database handle holding the pool and every repository.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pool: sqlx::Pool<sqlx::Postgres>,
    /// Terms, search patterns and node entropy.
    pub terms: PgTermRepository,
    /// Article list and document key terms.
    pub documents: PgDocumentRepository,
    /// Graph edge partitions.
    pub edges: PgEdgeRepository,
}

impl Database {
    /// Create a new database instance from an existing pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            terms: PgTermRepository::new(pool.clone()),
            documents: PgDocumentRepository::new(pool.clone()),
            edges: PgEdgeRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the database with default pool settings.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Connect to the database with custom pool settings.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
