//! Association miner adapters.
//!
//! [`AprioriMiner`] shells out to the apriori executable; [`BuiltinMiner`]
//! runs the pairwise miner in process. Both read a basket file of bare term
//! ids and write `<ante> <cons> <confidence> <jweight>` rules.

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use inpho_core::{AssociationMiner, Error, Result};
use inpho_corpus::{read_item_baskets, PairwiseMiner};

use crate::config::{MinerKind, PipelineConfig};

/// Format a threshold as a plain decimal argument.
///
/// `f64` display never switches to exponent notation, which the apriori
/// argument parser does not accept.
pub fn format_threshold(value: f64) -> String {
    value.to_string()
}

/// Remove the rules file of a previous run so a miner that writes nothing
/// cannot hand old rules to the next phase.
pub async fn clear_output(output: &Path) -> Result<()> {
    match tokio::fs::remove_file(output).await {
        Ok(()) => {
            debug!(
                subsystem = "jobs",
                component = "miner",
                path = %output.display(),
                "Removed previous miner output"
            );
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Miner(format!(
            "Cannot remove previous output {}: {}",
            output.display(),
            e
        ))),
    }
}

/// Miner backed by the external `apriori` binary.
///
/// Invoked as `apriori <input> <output> <min_support> <min_confidence>`.
#[derive(Debug, Clone)]
pub struct AprioriMiner {
    binary: PathBuf,
    min_support: f64,
    min_confidence: f64,
    timeout: Duration,
}

impl AprioriMiner {
    pub fn new(binary: impl Into<PathBuf>, min_support: f64, min_confidence: f64) -> Self {
        Self {
            binary: binary.into(),
            min_support,
            min_confidence,
            timeout: Duration::from_secs(inpho_core::defaults::MINER_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(input)
            .arg(output)
            .arg(format_threshold(self.min_support))
            .arg(format_threshold(self.min_confidence))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl AssociationMiner for AprioriMiner {
    async fn mine(&self, input: &Path, output: &Path) -> Result<()> {
        let start = Instant::now();
        debug!(
            subsystem = "jobs",
            component = "miner",
            binary = %self.binary.display(),
            input = %input.display(),
            timeout_secs = self.timeout.as_secs(),
            "Starting apriori"
        );

        clear_output(output).await?;

        // kill_on_drop reaps the child when the timeout drops the future.
        let result = tokio::time::timeout(self.timeout, self.command(input, output).output())
            .await
            .map_err(|_| {
                Error::Miner(format!(
                    "{} timed out after {}s",
                    self.binary.display(),
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| Error::Miner(format!("Failed to run {}: {}", self.binary.display(), e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::Miner(format!(
                "{} failed ({}): {}",
                self.binary.display(),
                result.status,
                stderr.trim()
            )));
        }
        if !output.exists() {
            return Err(Error::Miner(format!(
                "{} produced no output file at {}",
                self.binary.display(),
                output.display()
            )));
        }

        info!(
            subsystem = "jobs",
            component = "miner",
            miner = "apriori",
            duration_ms = start.elapsed().as_millis() as u64,
            "Apriori finished"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "apriori"
    }
}

/// In-process pairwise miner.
#[derive(Debug, Clone, Default)]
pub struct BuiltinMiner {
    miner: PairwiseMiner,
}

impl BuiltinMiner {
    pub fn new(min_support: f64, min_confidence: f64) -> Self {
        Self {
            miner: PairwiseMiner::new(min_support, min_confidence),
        }
    }
}

#[async_trait]
impl AssociationMiner for BuiltinMiner {
    async fn mine(&self, input: &Path, output: &Path) -> Result<()> {
        let start = Instant::now();
        let miner = self.miner.clone();
        let input = input.to_path_buf();
        let output = output.to_path_buf();

        let rule_count = tokio::task::spawn_blocking(move || -> Result<usize> {
            let baskets = read_item_baskets(&input)?;
            let rules = miner.mine_baskets(&baskets);
            let mut writer = BufWriter::new(File::create(&output)?);
            PairwiseMiner::write_rules(&rules, &mut writer)?;
            writer.flush()?;
            Ok(rules.len())
        })
        .await
        .map_err(|e| Error::Internal(format!("Miner task failed: {}", e)))??;

        info!(
            subsystem = "jobs",
            component = "miner",
            miner = "builtin",
            rule_count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Pairwise mining finished"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "builtin"
    }
}

/// The miner selected by `config`.
pub fn miner_from_config(config: &PipelineConfig) -> Result<Arc<dyn AssociationMiner>> {
    match config.miner {
        MinerKind::Builtin => Ok(Arc::new(BuiltinMiner::new(
            config.min_support,
            config.min_confidence,
        ))),
        MinerKind::Apriori => {
            let binary = config.apriori_bin.clone().ok_or_else(|| {
                Error::Config("apriori miner selected without a binary path".to_string())
            })?;
            Ok(Arc::new(
                AprioriMiner::new(binary, config.min_support, config.min_confidence)
                    .with_timeout(config.miner_timeout),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inpho_core::defaults::{MIN_SUPPORT, MIN_THRESHOLD_ARG};
    use inpho_corpus::read_rules;

    #[test]
    fn test_threshold_is_plain_decimal() {
        assert_eq!(format_threshold(MIN_SUPPORT), MIN_THRESHOLD_ARG);
        assert_eq!(format_threshold(0.5), "0.5");
    }

    #[tokio::test]
    async fn test_builtin_miner_writes_rules() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("graph-all.txt");
        let output = dir.path().join("edge-all.txt");
        std::fs::write(&input, "1 2 3\n2 3\n").unwrap();

        let miner = BuiltinMiner::default();
        miner.mine(&input, &output).await.unwrap();

        let rules = read_rules(&output).unwrap();
        assert_eq!(rules[&(3, 2)].confidence, 1.0);
        assert!(!rules.contains_key(&(1, 1)));
    }

    #[tokio::test]
    async fn test_builtin_miner_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let miner = BuiltinMiner::default();
        let result = miner
            .mine(&dir.path().join("absent.txt"), &dir.path().join("out.txt"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_apriori_missing_binary_is_miner_error() {
        let dir = tempfile::tempdir().unwrap();
        let miner = AprioriMiner::new(dir.path().join("no-such-apriori"), 0.0, 0.0);
        let err = miner
            .mine(&dir.path().join("in.txt"), &dir.path().join("out.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Miner(_)));
        assert!(err.is_fatal());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_apriori_nonzero_exit_is_miner_error() {
        let dir = tempfile::tempdir().unwrap();
        let miner = AprioriMiner::new("false", 0.0, 0.0);
        let err = miner
            .mine(&dir.path().join("in.txt"), &dir.path().join("out.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Miner(ref msg) if msg.contains("failed")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_apriori_without_output_is_miner_error() {
        let dir = tempfile::tempdir().unwrap();
        let miner = AprioriMiner::new("true", 0.0, 0.0);
        let err = miner
            .mine(&dir.path().join("in.txt"), &dir.path().join("out.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Miner(ref msg) if msg.contains("no output")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_apriori_does_not_reuse_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("edge-all.txt");
        std::fs::write(&output, "1 2 1.0 0.5\n").unwrap();

        let miner = AprioriMiner::new("true", 0.5, 0.5);
        let err = miner
            .mine(&dir.path().join("graph-all.txt"), &output)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Miner(ref msg) if msg.contains("no output")));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_clear_output_without_file() {
        let dir = tempfile::tempdir().unwrap();
        clear_output(&dir.path().join("edge-idea.txt")).await.unwrap();
    }

    #[test]
    fn test_miner_from_config() {
        let config = PipelineConfig::new("/corpus").with_miner(MinerKind::Builtin);
        assert_eq!(miner_from_config(&config).unwrap().name(), "builtin");

        let config = PipelineConfig::new("/corpus");
        assert!(matches!(
            miner_from_config(&config),
            Err(Error::Config(_))
        ));
    }
}
