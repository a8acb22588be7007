//! Pipeline configuration from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use inpho_core::defaults::{
    ARTICLE_FILE, DATA_PATH, EDGE_FILE_PREFIX, ENV_APRIORI_BIN, ENV_ARTICLE_FILE,
    ENV_CORPUS_PATH, ENV_DATA_PATH, ENV_MINER, ENV_MINER_TIMEOUT_SECS, ENV_MIN_CONFIDENCE,
    ENV_MIN_SUPPORT, ENV_SCAN_WORKERS, GRAPH_FILE_PREFIX, MINER_TIMEOUT_SECS, MIN_CONFIDENCE,
    MIN_SUPPORT, OCCURRENCE_FILE, SCAN_WORKERS_FALLBACK, SQL_FILE_PREFIX, SUMMARY_FILE,
};
use inpho_core::{EntityKind, Error, Result};

/// Which association miner a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MinerKind {
    /// External `apriori` executable.
    #[default]
    Apriori,
    /// In-process pairwise miner.
    Builtin,
}

impl std::str::FromStr for MinerKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "apriori" => Ok(Self::Apriori),
            "builtin" => Ok(Self::Builtin),
            _ => Err(format!("Invalid miner: {}", s)),
        }
    }
}

impl std::fmt::Display for MinerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Apriori => write!(f, "apriori"),
            Self::Builtin => write!(f, "builtin"),
        }
    }
}

/// Configuration for a mining pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the article text tree.
    pub corpus_path: PathBuf,
    /// Text file name inside each article directory.
    pub article_file: String,
    /// Working directory for occurrence, graph, edge and sql files.
    pub data_path: PathBuf,
    pub miner: MinerKind,
    /// Path of the apriori executable; required for [`MinerKind::Apriori`].
    pub apriori_bin: Option<PathBuf>,
    pub min_support: f64,
    pub min_confidence: f64,
    pub miner_timeout: Duration,
    /// Size of the scan worker pool.
    pub scan_workers: usize,
}

impl PipelineConfig {
    /// Configuration with defaults for everything but the corpus root.
    pub fn new(corpus_path: impl Into<PathBuf>) -> Self {
        Self {
            corpus_path: corpus_path.into(),
            article_file: ARTICLE_FILE.to_string(),
            data_path: PathBuf::from(DATA_PATH),
            miner: MinerKind::default(),
            apriori_bin: None,
            min_support: MIN_SUPPORT,
            min_confidence: MIN_CONFIDENCE,
            miner_timeout: Duration::from_secs(MINER_TIMEOUT_SECS),
            scan_workers: default_scan_workers(),
        }
    }

    /// Create config from environment variables.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `INPHO_CORPUS_PATH` | required | Root of the article text tree |
    /// | `INPHO_ARTICLE_FILE` | `index.txt` | Text file inside each article directory |
    /// | `INPHO_DATA_PATH` | `./data` | Working directory for pipeline files |
    /// | `INPHO_MINER` | `apriori` | `apriori` or `builtin` |
    /// | `INPHO_APRIORI_BIN` | required for `apriori` | Apriori executable |
    /// | `INPHO_MIN_SUPPORT` | `1e-17` | Minimum rule support |
    /// | `INPHO_MIN_CONFIDENCE` | `1e-17` | Minimum rule confidence |
    /// | `INPHO_MINER_TIMEOUT_SECS` | `3600` | Miner process timeout |
    /// | `INPHO_SCAN_WORKERS` | available cores | Scan worker pool size |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build and validate a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let corpus_path = var(ENV_CORPUS_PATH)
            .ok_or_else(|| Error::Config(format!("{} is not set", ENV_CORPUS_PATH)))?;
        let mut config = Self::new(corpus_path);

        if let Some(file) = var(ENV_ARTICLE_FILE) {
            config.article_file = file;
        }
        if let Some(path) = var(ENV_DATA_PATH) {
            config.data_path = PathBuf::from(path);
        }
        if let Some(miner) = var(ENV_MINER) {
            config.miner = miner.parse().map_err(Error::Config)?;
        }
        config.apriori_bin = var(ENV_APRIORI_BIN).map(PathBuf::from);
        if let Some(value) = var(ENV_MIN_SUPPORT) {
            config.min_support = parse_var(ENV_MIN_SUPPORT, &value)?;
        }
        if let Some(value) = var(ENV_MIN_CONFIDENCE) {
            config.min_confidence = parse_var(ENV_MIN_CONFIDENCE, &value)?;
        }
        if let Some(value) = var(ENV_MINER_TIMEOUT_SECS) {
            config.miner_timeout = Duration::from_secs(parse_var(ENV_MINER_TIMEOUT_SECS, &value)?);
        }
        if let Some(value) = var(ENV_SCAN_WORKERS) {
            config.scan_workers = parse_var::<usize>(ENV_SCAN_WORKERS, &value)?.max(1);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check settings that would otherwise fail mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.miner == MinerKind::Apriori && self.apriori_bin.is_none() {
            return Err(Error::Config(format!(
                "{} must be set when the apriori miner is selected",
                ENV_APRIORI_BIN
            )));
        }
        for (name, value) in [
            (ENV_MIN_SUPPORT, self.min_support),
            (ENV_MIN_CONFIDENCE, self.min_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
            // apriori rejects thresholds outside (0, 1].
            if self.miner == MinerKind::Apriori && value <= 0.0 {
                return Err(Error::Config(format!(
                    "{} must be positive for the apriori miner, got {}",
                    name, value
                )));
            }
        }
        if self.miner_timeout.is_zero() {
            return Err(Error::Config(format!(
                "{} must be positive",
                ENV_MINER_TIMEOUT_SECS
            )));
        }
        if self.scan_workers == 0 {
            return Err(Error::Config(format!("{} must be positive", ENV_SCAN_WORKERS)));
        }
        Ok(())
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_miner(mut self, miner: MinerKind) -> Self {
        self.miner = miner;
        self
    }

    pub fn with_scan_workers(mut self, workers: usize) -> Self {
        self.scan_workers = workers.max(1);
        self
    }

    // -------------------------------------------------------------------------
    // Pipeline files
    // -------------------------------------------------------------------------

    /// Raw sentence baskets of the last scan.
    pub fn occurrence_path(&self) -> PathBuf {
        self.data_path.join(OCCURRENCE_FILE)
    }

    /// Per-article term summaries of the last scan.
    pub fn summary_path(&self) -> PathBuf {
        self.data_path.join(SUMMARY_FILE)
    }

    /// Filtered miner input for `kind`.
    pub fn graph_path(&self, kind: EntityKind) -> PathBuf {
        kind_file(&self.data_path, GRAPH_FILE_PREFIX, kind)
    }

    /// Miner output for `kind`.
    pub fn edge_path(&self, kind: EntityKind) -> PathBuf {
        kind_file(&self.data_path, EDGE_FILE_PREFIX, kind)
    }

    /// Final weighted edges for `kind`.
    pub fn sql_path(&self, kind: EntityKind) -> PathBuf {
        kind_file(&self.data_path, SQL_FILE_PREFIX, kind)
    }

    /// Text file of one article.
    pub fn article_path(&self, article: &str) -> PathBuf {
        self.corpus_path.join(article).join(&self.article_file)
    }
}

fn kind_file(dir: &Path, prefix: &str, kind: EntityKind) -> PathBuf {
    dir.join(format!("{}{}.txt", prefix, kind))
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has an invalid value: {}", name, value)))
}

fn default_scan_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(SCAN_WORKERS_FALLBACK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_corpus_path_fails_fast() {
        let err = PipelineConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains(ENV_CORPUS_PATH)));
    }

    #[test]
    fn test_apriori_requires_binary() {
        let err = PipelineConfig::from_lookup(lookup(&[(ENV_CORPUS_PATH, "/corpus")])).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains(ENV_APRIORI_BIN)));
    }

    #[test]
    fn test_builtin_miner_defaults() {
        let config = PipelineConfig::from_lookup(lookup(&[
            (ENV_CORPUS_PATH, "/corpus"),
            (ENV_MINER, "builtin"),
        ]))
        .unwrap();
        assert_eq!(config.miner, MinerKind::Builtin);
        assert_eq!(config.article_file, ARTICLE_FILE);
        assert_eq!(config.data_path, PathBuf::from(DATA_PATH));
        assert_eq!(config.min_support, MIN_SUPPORT);
        assert_eq!(config.miner_timeout, Duration::from_secs(MINER_TIMEOUT_SECS));
        assert!(config.scan_workers >= 1);
    }

    #[test]
    fn test_overrides() {
        let config = PipelineConfig::from_lookup(lookup(&[
            (ENV_CORPUS_PATH, "/corpus"),
            (ENV_APRIORI_BIN, "/usr/local/bin/apriori"),
            (ENV_DATA_PATH, "/var/inpho"),
            (ENV_ARTICLE_FILE, "body.txt"),
            (ENV_MIN_SUPPORT, "0.01"),
            (ENV_MINER_TIMEOUT_SECS, "60"),
            (ENV_SCAN_WORKERS, "0"),
        ]))
        .unwrap();
        assert_eq!(config.miner, MinerKind::Apriori);
        assert_eq!(config.min_support, 0.01);
        assert_eq!(config.miner_timeout, Duration::from_secs(60));
        assert_eq!(config.scan_workers, 1);
        assert_eq!(
            config.article_path("locke"),
            PathBuf::from("/corpus/locke/body.txt")
        );
        assert_eq!(
            config.graph_path(EntityKind::Idea),
            PathBuf::from("/var/inpho/graph-idea.txt")
        );
        assert_eq!(
            config.sql_path(EntityKind::All),
            PathBuf::from("/var/inpho/sql-all.txt")
        );
    }

    #[test]
    fn test_apriori_rejects_zero_thresholds() {
        for var in [ENV_MIN_SUPPORT, ENV_MIN_CONFIDENCE] {
            let err = PipelineConfig::from_lookup(lookup(&[
                (ENV_CORPUS_PATH, "/corpus"),
                (ENV_APRIORI_BIN, "/usr/local/bin/apriori"),
                (var, "0.0"),
            ]))
            .unwrap_err();
            assert!(matches!(err, Error::Config(ref msg) if msg.contains(var)));
        }

        let config = PipelineConfig::from_lookup(lookup(&[
            (ENV_CORPUS_PATH, "/corpus"),
            (ENV_MINER, "builtin"),
            (ENV_MIN_SUPPORT, "0.0"),
        ]))
        .unwrap();
        assert_eq!(config.min_support, 0.0);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let err = PipelineConfig::from_lookup(lookup(&[
            (ENV_CORPUS_PATH, "/corpus"),
            (ENV_MINER, "fp-growth"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = PipelineConfig::from_lookup(lookup(&[
            (ENV_CORPUS_PATH, "/corpus"),
            (ENV_MINER, "builtin"),
            (ENV_MIN_CONFIDENCE, "1.5"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = PipelineConfig::from_lookup(lookup(&[
            (ENV_CORPUS_PATH, "/corpus"),
            (ENV_MINER, "builtin"),
            (ENV_MINER_TIMEOUT_SECS, "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
