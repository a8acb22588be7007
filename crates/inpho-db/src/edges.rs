//! Graph edge publication.
//!
//! Each partition table is replaced wholesale inside one transaction, so
//! readers see either the previous edge set or the new one.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::{debug, info};

use inpho_core::defaults::EDGE_INSERT_BATCH;
use inpho_core::{EdgeRecord, EdgeSink, Error, GraphPartition, Result};

/// Column-oriented copy of an edge batch, ready for `UNNEST` binding.
#[derive(Debug, Default)]
struct EdgeColumns {
    ante_ids: Vec<i32>,
    cons_ids: Vec<i32>,
    confidences: Vec<f64>,
    jweights: Vec<f64>,
    weights: Vec<f64>,
    occurs_in: Vec<i64>,
    cooccurrences: Vec<i64>,
}

impl EdgeColumns {
    fn from_edges(edges: &[EdgeRecord]) -> Result<Self> {
        let mut columns = Self::default();
        for edge in edges {
            let weight = edge.final_weight()?;
            columns.ante_ids.push(edge.ante_id);
            columns.cons_ids.push(edge.cons_id);
            columns.confidences.push(edge.confidence);
            columns.jweights.push(edge.jweight);
            columns.weights.push(weight);
            columns.occurs_in.push(to_bigint(edge.occurs_in, "occurs_in")?);
            columns
                .cooccurrences
                .push(to_bigint(edge.cooccurrences, "cooccurrences")?);
        }
        Ok(columns)
    }
}

fn to_bigint(value: u64, column: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| Error::InvalidInput(format!("{column} value {value} exceeds BIGINT")))
}

/// PostgreSQL implementation of [`EdgeSink`].
#[derive(Clone)]
pub struct PgEdgeRepository {
    pool: Pool<Postgres>,
}

impl PgEdgeRepository {
    /// Create a new PgEdgeRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Number of edges currently stored in `partition`.
    pub async fn count_edges(&self, partition: GraphPartition) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", partition.table_name());
        sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn replace_in_tx(&self, partition: GraphPartition, edges: &[EdgeRecord]) -> Result<u64> {
        let table = partition.table_name();
        let insert = format!(
            r#"
            INSERT INTO {table}
                (ante_id, cons_id, confidence, jweight, weight, occurs_in, cooccurrences)
            SELECT * FROM UNNEST(
                $1::int4[], $2::int4[], $3::float8[], $4::float8[],
                $5::float8[], $6::int8[], $7::int8[]
            )
            "#
        );

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let mut inserted = 0u64;
        for chunk in edges.chunks(EDGE_INSERT_BATCH) {
            let columns = EdgeColumns::from_edges(chunk)?;
            let result = sqlx::query(&insert)
                .bind(&columns.ante_ids)
                .bind(&columns.cons_ids)
                .bind(&columns.confidences)
                .bind(&columns.jweights)
                .bind(&columns.weights)
                .bind(&columns.occurs_in)
                .bind(&columns.cooccurrences)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
            inserted += result.rows_affected();

            debug!(
                subsystem = "db",
                component = "edges",
                partition = %partition,
                batch_size = chunk.len(),
                "Edge batch inserted"
            );
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(inserted)
    }
}

#[async_trait]
impl EdgeSink for PgEdgeRepository {
    async fn replace_edges(&self, partition: GraphPartition, edges: &[EdgeRecord]) -> Result<u64> {
        let start = Instant::now();

        // Reject unweighted or oversized records before touching the table.
        EdgeColumns::from_edges(edges)?;

        let inserted = self
            .replace_in_tx(partition, edges)
            .await
            .map_err(|e| Error::Publish(format!("{partition}: {e}")))?;

        info!(
            subsystem = "db",
            component = "edges",
            op = "replace",
            partition = %partition,
            edge_count = inserted,
            duration_ms = start.elapsed().as_millis() as u64,
            "Graph partition replaced"
        );
        Ok(inserted)
    }
}
