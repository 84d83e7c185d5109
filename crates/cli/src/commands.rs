//! Command handlers. Each prints a JSON document on stdout.

use std::path::Path;

use anyhow::Context;
use extprop_core::engine::EvaluationOptions;
use extprop_core::entity::Entity;
use extprop_core::memory::InMemoryStore;
use extprop_core::pipeline::{run_pass, PassOptions, RunSummary};
use extprop_core::revert::{RevertBatchResult, RevertEngine};
use extprop_core::rules::{FileRuleSource, RuleDocument, RuleSource};
use extprop_db::stores::PgStore;
use serde::Serialize;

use crate::cli::{RevertArgs, RunArgs};
use crate::config::RunnerConfig;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Connect, verify and migrate the database.
async fn connect(config: &RunnerConfig) -> anyhow::Result<PgStore> {
    let pool = extprop_db::create_pool(config.require_database_url()?, config.max_connections)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    extprop_db::health_check(&pool)
        .await
        .context("Database health check failed")?;

    extprop_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(PgStore::new(pool))
}

// ---------------------------------------------------------------------------
// check-rules
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesReport {
    pub ruleset_id: String,
    pub name: String,
    pub version: Option<String>,
    pub rules: usize,
    pub requirements: usize,
}

impl From<&RuleDocument> for RulesReport {
    fn from(document: &RuleDocument) -> Self {
        Self {
            ruleset_id: document.ruleset.id.clone(),
            name: document.ruleset.name.clone(),
            version: document.ruleset.version.clone(),
            rules: document.rules.len(),
            requirements: document.rules.iter().map(|r| r.requirements.len()).sum(),
        }
    }
}

pub fn check_rules(rules: &FileRuleSource) -> anyhow::Result<()> {
    let document = rules.load_rules()?;
    print_json(&RulesReport::from(&document))
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

fn load_entities_file(path: &Path) -> anyhow::Result<Vec<Entity>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read entities file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid entities file {}", path.display()))
}

pub async fn run(rules: &FileRuleSource, args: &RunArgs, config: &RunnerConfig, actor: &str) -> anyhow::Result<()> {
    let options = PassOptions {
        actor: actor.to_string(),
        evaluation: EvaluationOptions {
            forced_mode: args.mode,
        },
    };

    let summary: RunSummary = match &args.entities {
        Some(path) => {
            let entities = load_entities_file(path)?;
            tracing::info!(path = %path.display(), entities = entities.len(), "Running offline against in-memory store");
            let store = InMemoryStore::new().with_entities(entities);
            run_pass(rules, &store, &store, &store, &options).await?
        }
        None => {
            let store = connect(config).await?;
            run_pass(rules, &store, &store, &store, &options).await?
        }
    };
    print_json(&summary)
}

// ---------------------------------------------------------------------------
// revert
// ---------------------------------------------------------------------------

pub async fn revert(args: &RevertArgs, config: &RunnerConfig, actor: &str) -> anyhow::Result<()> {
    let store = connect(config).await?;
    let engine = RevertEngine::new(&store, &store, actor);

    let result = match args.audit_id {
        Some(audit_id) => RevertBatchResult {
            outcomes: vec![engine.revert_by_id(audit_id, args.options()).await?],
        },
        None => {
            let filter = args.filter();
            if filter.is_empty() && !args.dry_run {
                tracing::warn!("No filter given; every recorded repair will be reverted");
            }
            engine.revert_matching(&filter, args.options()).await?
        }
    };
    print_json(&result)
}
