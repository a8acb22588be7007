//! File edge sink.
//!
//! Final edges are written to `sql-<kind>.txt`, one edge per line:
//! `ante::cons::confidence::jweight::weight::occurs_in::cooccurrences`.
//! The file can be loaded into the database later without re-mining.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use inpho_core::defaults::{SQL_FIELD_SEPARATOR, SQL_FILE_PREFIX};
use inpho_core::{EdgeRecord, EdgeSink, Error, GraphPartition, Result};

use crate::files::write_lines_atomic;

/// Format one weighted edge as an sql-file line.
pub fn format_edge_line(edge: &EdgeRecord) -> Result<String> {
    let weight = edge.final_weight()?;
    Ok([
        edge.ante_id.to_string(),
        edge.cons_id.to_string(),
        edge.confidence.to_string(),
        edge.jweight.to_string(),
        weight.to_string(),
        edge.occurs_in.to_string(),
        edge.cooccurrences.to_string(),
    ]
    .join(SQL_FIELD_SEPARATOR))
}

/// Parse one sql-file line.
///
/// The co-occurrence column is optional; files without it load with a
/// count of zero.
pub fn parse_edge_line(line: &str) -> Option<EdgeRecord> {
    let fields: Vec<&str> = line.trim().split(SQL_FIELD_SEPARATOR).collect();
    if fields.len() != 6 && fields.len() != 7 {
        return None;
    }
    let cooccurrences = match fields.get(6) {
        Some(value) => value.parse().ok()?,
        None => 0,
    };
    let edge = EdgeRecord {
        ante_id: fields[0].parse().ok()?,
        cons_id: fields[1].parse().ok()?,
        confidence: fields[2].parse().ok()?,
        jweight: fields[3].parse().ok()?,
        weight: Some(fields[4].parse().ok()?),
        occurs_in: fields[5].parse().ok()?,
        cooccurrences,
    };
    (edge.ante_id != edge.cons_id).then_some(edge)
}

/// Read every edge of an sql file. Blank lines are skipped; any other
/// unparseable line is an error.
pub fn read_edge_file(path: &Path) -> Result<Vec<EdgeRecord>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::NotFound(format!("edge file {}", path.display())),
        _ => Error::Io(e),
    })?;

    let mut edges = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let edge = parse_edge_line(&line).ok_or_else(|| {
            Error::InvalidInput(format!(
                "{}:{}: malformed edge line {:?}",
                path.display(),
                index + 1,
                line
            ))
        })?;
        edges.push(edge);
    }
    Ok(edges)
}

/// [`EdgeSink`] writing one sql file per partition into a directory.
#[derive(Debug, Clone)]
pub struct FileEdgeSink {
    dir: PathBuf,
}

impl FileEdgeSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File backing `partition`.
    pub fn path_for(&self, partition: GraphPartition) -> PathBuf {
        self.dir
            .join(format!("{}{}.txt", SQL_FILE_PREFIX, partition.kind()))
    }
}

#[async_trait]
impl EdgeSink for FileEdgeSink {
    async fn replace_edges(&self, partition: GraphPartition, edges: &[EdgeRecord]) -> Result<u64> {
        let lines = edges
            .iter()
            .map(format_edge_line)
            .collect::<Result<Vec<_>>>()?;
        let path = self.path_for(partition);

        let written = tokio::task::spawn_blocking({
            let path = path.clone();
            move || write_lines_atomic(&path, lines)
        })
        .await
        .map_err(|e| Error::Internal(format!("Edge file task failed: {}", e)))??;

        info!(
            subsystem = "jobs",
            component = "sink",
            partition = %partition,
            path = %path.display(),
            edge_count = written,
            "Edge file written"
        );
        Ok(written as u64)
    }
}
