//! Article list and document key terms from the `entity` table.
//!
//! An entity with a `sep_dir` owns the article of that name; the article
//! list is the set of distinct `sep_dir` values and every mineable entity
//! is a key term of its own article.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use inpho_core::defaults::{ENTITY_TYPE_JOURNAL, ENTITY_TYPE_NODE};
use inpho_core::{DocumentKeyTerms, DocumentSupply, Error, Result, TermId};

/// PostgreSQL implementation of [`DocumentSupply`].
#[derive(Clone)]
pub struct PgDocumentRepository {
    pool: Pool<Postgres>,
}

impl PgDocumentRepository {
    /// Create a new PgDocumentRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentSupply for PgDocumentRepository {
    async fn list_documents(&self) -> Result<Vec<String>> {
        let documents: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT sep_dir
            FROM entity
            WHERE sep_dir IS NOT NULL AND sep_dir <> ''
            ORDER BY sep_dir
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "documents",
            op = "list",
            document_count = documents.len(),
            "Articles listed"
        );
        Ok(documents)
    }

    async fn key_terms(&self) -> Result<DocumentKeyTerms> {
        let rows = sqlx::query(
            r#"
            SELECT sep_dir, id
            FROM entity
            WHERE sep_dir IS NOT NULL AND sep_dir <> ''
              AND type_id NOT IN ($1, $2)
            ORDER BY sep_dir, id
            "#,
        )
        .bind(ENTITY_TYPE_NODE)
        .bind(ENTITY_TYPE_JOURNAL)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut key_terms = DocumentKeyTerms::new();
        for row in rows {
            let article: String = row.try_get("sep_dir").map_err(Error::Database)?;
            let id: TermId = row.try_get("id").map_err(Error::Database)?;
            key_terms.insert(article, id);
        }

        debug!(
            subsystem = "db",
            component = "documents",
            op = "key_terms",
            document_count = key_terms.len(),
            "Document key terms loaded"
        );
        Ok(key_terms)
    }
}
