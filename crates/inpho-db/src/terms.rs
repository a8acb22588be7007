//! Term supply and entropy sink backed by the `entity` table.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;

use inpho_core::defaults::{ENTITY_TYPE_JOURNAL, ENTITY_TYPE_NODE};
use inpho_core::{
    EntityKind, EntityType, EntropySink, Error, NodeEntropy, Result, TermRecord, TermSupply,
};

/// PostgreSQL implementation of [`TermSupply`] and [`EntropySink`].
#[derive(Clone)]
pub struct PgTermRepository {
    pool: Pool<Postgres>,
}

impl PgTermRepository {
    /// Create a new PgTermRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TermSupply for PgTermRepository {
    async fn load_terms(&self, kind: EntityKind) -> Result<Vec<TermRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT
                e.id,
                e.label,
                e.type_id,
                COALESCE(
                    array_agg(sp.searchpattern ORDER BY sp.id)
                        FILTER (WHERE sp.searchpattern IS NOT NULL),
                    '{}'
                ) AS patterns
            FROM entity e
            LEFT JOIN searchpatterns sp ON sp.entity_id = e.id
            WHERE e.type_id NOT IN ($1, $2)
              AND ($3::smallint IS NULL OR e.type_id = $3)
            GROUP BY e.id, e.label, e.type_id
            ORDER BY e.id
            "#,
        )
        .bind(ENTITY_TYPE_NODE)
        .bind(ENTITY_TYPE_JOURNAL)
        .bind(kind.type_filter())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let terms = rows
            .into_iter()
            .map(|row| {
                Ok(TermRecord {
                    id: row.try_get("id")?,
                    label: row.try_get("label")?,
                    entity_type: EntityType::from_code(row.try_get("type_id")?),
                    search_patterns: row.try_get("patterns")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()
            .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "terms",
            op = "load",
            kind = %kind,
            term_count = terms.len(),
            "Terms loaded"
        );
        Ok(terms)
    }
}

#[async_trait]
impl EntropySink for PgTermRepository {
    async fn update_entropy(&self, entropies: &[NodeEntropy]) -> Result<u64> {
        if entropies.is_empty() {
            return Ok(0);
        }
        let ids: Vec<i32> = entropies.iter().map(|e| e.term_id).collect();
        let values: Vec<f64> = entropies.iter().map(|e| e.entropy).collect();

        let result = sqlx::query(
            r#"
            UPDATE entity AS e
            SET entropy = v.entropy
            FROM UNNEST($1::int4[], $2::float8[]) AS v(id, entropy)
            WHERE e.id = v.id
            "#,
        )
        .bind(&ids)
        .bind(&values)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "terms",
            op = "update_entropy",
            term_count = result.rows_affected(),
            "Node entropy stored"
        );
        Ok(result.rows_affected())
    }
}
