//! inpho: command-line driver for the term co-occurrence mining pipeline.
//!
//! Configuration comes from the environment (and `.env`); see
//! `PoolConfig::from_env` for the store connection pool,
//! `PipelineConfig::from_env` for the pipeline variables and
//! `LogConfig::from_env` for logging.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::error;

use inpho_core::{init_tracing, EntityKind, LogConfig, RuleBasedSentenceTokenizer};
use inpho_db::{Database, PoolConfig};
use inpho_jobs::{
    miner_from_config, FilesystemTextSupply, MiningPipeline, PipelineConfig, PipelineContext,
    RunOptions, ScanSummary,
};

#[derive(Parser)]
#[command(name = "inpho")]
#[command(author, version, about = "Term co-occurrence mining for InPhO")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine associations and write the weighted graph
    Mine {
        /// Vocabulary to mine: idea, thinker or all
        #[arg(short, long, default_value_t = EntityKind::All)]
        kind: EntityKind,

        /// Rescan the corpus before mining
        #[arg(long)]
        with_occur: bool,

        /// Replace the graph partition in the database
        #[arg(long)]
        update_db: bool,

        /// Store node entropy on the terms
        #[arg(long)]
        entropy: bool,

        /// Keep only the longest of overlapping labels in a sentence
        #[arg(long)]
        remove_overlap: bool,
    },

    /// Scan the corpus and write occurrence files only
    Occur {
        /// Keep only the longest of overlapping labels in a sentence
        #[arg(long)]
        remove_overlap: bool,
    },

    /// Publish a previously written sql edge file to the database
    Load {
        /// Vocabulary whose edge file to load
        #[arg(short, long, default_value_t = EntityKind::All)]
        kind: EntityKind,
    },

    /// Print the basket lines of one article
    Article {
        /// Article key
        key: String,

        /// Vocabulary to scan with
        #[arg(short, long, default_value_t = EntityKind::All)]
        kind: EntityKind,

        /// Keep only the longest of overlapping labels in a sentence
        #[arg(long)]
        remove_overlap: bool,
    },

    /// Apply database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Held for the process lifetime so file logging flushes.
    let _log_guard = match init_tracing(&LogConfig::from_env()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(subsystem = "cli", error = %format!("{:#}", e), "Command failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

    match cli.command {
        Commands::Migrate => {
            let db = Database::connect_with_config(&database_url, PoolConfig::from_env()).await?;
            db.migrate().await.context("Migration failed")?;
            println!("{}", serde_json::json!({ "migrated": true }));
        }
        Commands::Mine {
            kind,
            with_occur,
            update_db,
            entropy,
            remove_overlap,
        } => {
            let pipeline = open_pipeline(&database_url).await?;
            let options = RunOptions {
                kind,
                rescan: with_occur,
                update_db,
                update_entropy: entropy,
                remove_overlap,
            };
            let report = pipeline.run(&options).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Occur { remove_overlap } => {
            let pipeline = open_pipeline(&database_url).await?;
            let outcome = pipeline.scan(remove_overlap).await?;
            let output = serde_json::json!({
                "summary": ScanSummary::from(&outcome),
                "skipped": outcome.skipped,
                "occurrence_path": pipeline.config().occurrence_path(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Load { kind } => {
            let pipeline = open_pipeline(&database_url).await?;
            let edge_count = pipeline.load(kind).await?;
            let output = serde_json::json!({
                "kind": kind,
                "table": kind.partition().table_name(),
                "edge_count": edge_count,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Article {
            key,
            kind,
            remove_overlap,
        } => {
            let pipeline = open_pipeline(&database_url).await?;
            for line in pipeline.scan_article(&key, kind, remove_overlap).await? {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

/// Pipeline over the entity store. Configuration errors surface here,
/// before any scanning.
async fn open_pipeline(database_url: &str) -> anyhow::Result<MiningPipeline> {
    let config = PipelineConfig::from_env()?;
    let db = Database::connect_with_config(database_url, PoolConfig::from_env()).await?;
    build_pipeline(config, &db)
}

fn build_pipeline(config: PipelineConfig, db: &Database) -> anyhow::Result<MiningPipeline> {
    let ctx = PipelineContext {
        terms: Arc::new(db.terms.clone()),
        documents: Arc::new(db.documents.clone()),
        text: Arc::new(FilesystemTextSupply::from_config(&config)),
        tokenizer: Arc::new(RuleBasedSentenceTokenizer::new()),
        miner: miner_from_config(&config)?,
        edges: Arc::new(db.edges.clone()),
        entropy: Arc::new(db.terms.clone()),
    };
    Ok(MiningPipeline::new(config, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_mine_flags() {
        let cli = Cli::parse_from([
            "inpho",
            "mine",
            "--kind",
            "thinkers",
            "--with-occur",
            "--update-db",
        ]);
        match cli.command {
            Commands::Mine {
                kind,
                with_occur,
                update_db,
                entropy,
                remove_overlap,
            } => {
                assert_eq!(kind, EntityKind::Thinker);
                assert!(with_occur);
                assert!(update_db);
                assert!(!entropy);
                assert!(!remove_overlap);
            }
            _ => panic!("expected mine"),
        }
    }

    #[test]
    fn test_article_defaults() {
        let cli = Cli::parse_from(["inpho", "article", "descartes"]);
        match cli.command {
            Commands::Article { key, kind, .. } => {
                assert_eq!(key, "descartes");
                assert_eq!(kind, EntityKind::All);
            }
            _ => panic!("expected article"),
        }
    }

    #[test]
    fn test_migrate_takes_no_pipeline_options() {
        let cli = Cli::parse_from(["inpho", "migrate"]);
        assert!(matches!(cli.command, Commands::Migrate));
        assert!(Cli::try_parse_from(["inpho", "migrate", "--kind", "idea"]).is_err());
    }

    #[test]
    fn test_invalid_kind_is_rejected() {
        assert!(Cli::try_parse_from(["inpho", "load", "--kind", "journal"]).is_err());
    }
}
