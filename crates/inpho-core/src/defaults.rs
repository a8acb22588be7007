//! Centralized default constants for the InPhO mining pipeline.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by pipeline phase.

// =============================================================================
// TERM REGISTRY
// =============================================================================

/// Entity type code for ideas.
pub const ENTITY_TYPE_IDEA: i16 = 1;

/// Entity type code for taxonomy nodes (never mined).
pub const ENTITY_TYPE_NODE: i16 = 2;

/// Entity type code for thinkers.
pub const ENTITY_TYPE_THINKER: i16 = 3;

/// Entity type code for journals (never mined).
pub const ENTITY_TYPE_JOURNAL: i16 = 4;

/// Compiled size limit for a single search pattern, in bytes.
///
/// Patterns exceeding it fail to compile and are dropped from their term.
pub const PATTERN_SIZE_LIMIT: usize = 1024 * 1024;

// =============================================================================
// CORPUS
// =============================================================================

/// Environment variable for the article corpus root.
pub const ENV_CORPUS_PATH: &str = "INPHO_CORPUS_PATH";

/// Environment variable for the per-article text file name.
pub const ENV_ARTICLE_FILE: &str = "INPHO_ARTICLE_FILE";

/// Default per-article text file name (`<corpus>/<article>/index.txt`).
pub const ARTICLE_FILE: &str = "index.txt";

/// Environment variable for the working data directory.
pub const ENV_DATA_PATH: &str = "INPHO_DATA_PATH";

/// Default working data directory.
pub const DATA_PATH: &str = "./data";

// =============================================================================
// WORKING FILES
// =============================================================================

/// Raw sentence occurrence file (`<article> <term_id> ...`).
pub const OCCURRENCE_FILE: &str = "occurrences.txt";

/// Document summary file, one line per article.
pub const SUMMARY_FILE: &str = "occurrences-summary.txt";

/// Prefix of the filtered miner input file (`graph-<kind>.txt`).
pub const GRAPH_FILE_PREFIX: &str = "graph-";

/// Prefix of the miner output file (`edge-<kind>.txt`).
pub const EDGE_FILE_PREFIX: &str = "edge-";

/// Prefix of the final weighted edge file (`sql-<kind>.txt`).
pub const SQL_FILE_PREFIX: &str = "sql-";

/// Field separator in the final weighted edge file.
pub const SQL_FIELD_SEPARATOR: &str = "::";

// =============================================================================
// SCANNING
// =============================================================================

/// Environment variable for the scan worker-pool size.
pub const ENV_SCAN_WORKERS: &str = "INPHO_SCAN_WORKERS";

/// Fallback worker count when available parallelism cannot be queried.
pub const SCAN_WORKERS_FALLBACK: usize = 4;

// =============================================================================
// MINING
// =============================================================================

/// Environment variable selecting the miner (`apriori` or `builtin`).
pub const ENV_MINER: &str = "INPHO_MINER";

/// Environment variable for the apriori executable.
pub const ENV_APRIORI_BIN: &str = "INPHO_APRIORI_BIN";

/// Environment variable for the miner's minimum support.
pub const ENV_MIN_SUPPORT: &str = "INPHO_MIN_SUPPORT";

/// Environment variable for the miner's minimum confidence.
pub const ENV_MIN_CONFIDENCE: &str = "INPHO_MIN_CONFIDENCE";

/// Minimum support handed to the miner. Effectively zero: every
/// co-occurring pair is wanted, ranked rather than filtered.
pub const MIN_SUPPORT: f64 = 0.000_000_000_000_000_01;

/// Minimum confidence handed to the miner (effectively zero).
pub const MIN_CONFIDENCE: f64 = 0.000_000_000_000_000_01;

/// Textual form of the thresholds on the miner's command line.
pub const MIN_THRESHOLD_ARG: &str = "0.00000000000000001";

/// Environment variable for the miner process timeout.
pub const ENV_MINER_TIMEOUT_SECS: &str = "INPHO_MINER_TIMEOUT_SECS";

/// Miner process timeout in seconds (1 hour).
pub const MINER_TIMEOUT_SECS: u64 = 3600;

/// A rule is only emitted when its itemset occurs in more than this
/// many baskets.
pub const MIN_UNION_SUPPORT: u64 = 1;

// =============================================================================
// PUBLISHING
// =============================================================================

/// Rows per INSERT batch when replacing an edge partition.
pub const EDGE_INSERT_BATCH: usize = 5_000;

/// Default pipeline event channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;
