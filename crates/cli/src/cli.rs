use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use extprop_core::audit::RepairEventFilter;
use extprop_core::revert::RevertOptions;
use extprop_core::types::{DbId, EntityType, Mode};

/// Top-level CLI parser for the `extprop` binary.
#[derive(Debug, Parser)]
#[command(name = "extprop", version, about = "Validate, repair and revert extended properties")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Rule document path (overrides EXTPROP_RULES_PATH)
    #[arg(short, long, global = true)]
    pub rules: Option<PathBuf>,

    /// Actor recorded on writes and audit entries (overrides EXTPROP_ACTOR)
    #[arg(short, long, global = true)]
    pub actor: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load and validate the rule document without touching any data
    CheckRules,
    /// Run one validation/repair pass
    Run(RunArgs),
    /// Revert recorded repairs
    Revert(RevertArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Force every rule into this mode: validate, simulate or repair
    #[arg(short, long, value_parser = parse_mode)]
    pub mode: Option<Mode>,

    /// Evaluate entities from a JSON file in memory instead of the database
    #[arg(short, long)]
    pub entities: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RevertArgs {
    /// Revert a single audit entry
    #[arg(long, conflicts_with_all = ["from", "to", "rule_id", "entity_type", "entity_id", "run_id"])]
    pub audit_id: Option<DbId>,

    /// Only repairs recorded at or after this RFC 3339 timestamp
    #[arg(long)]
    pub from: Option<DateTime<Utc>>,

    /// Only repairs recorded at or before this RFC 3339 timestamp
    #[arg(long)]
    pub to: Option<DateTime<Utc>>,

    #[arg(long)]
    pub rule_id: Option<String>,

    #[arg(long, value_parser = parse_entity_type)]
    pub entity_type: Option<EntityType>,

    #[arg(long)]
    pub entity_id: Option<DbId>,

    #[arg(long)]
    pub run_id: Option<DbId>,

    /// Revert even when the value changed since the repair
    #[arg(long)]
    pub force: bool,

    /// Report what would be reverted without writing
    #[arg(long)]
    pub dry_run: bool,
}

impl RevertArgs {
    pub fn filter(&self) -> RepairEventFilter {
        RepairEventFilter {
            from: self.from,
            to: self.to,
            rule_id: self.rule_id.clone(),
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            run_id: self.run_id,
        }
    }

    pub fn options(&self) -> RevertOptions {
        RevertOptions {
            force: self.force,
            dry_run: self.dry_run,
        }
    }
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    Mode::from_str(s).map_err(|e| e.to_string())
}

fn parse_entity_type(s: &str) -> Result<EntityType, String> {
    EntityType::from_str(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use clap::CommandFactory;

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_accepts_forced_mode() {
        let cli = Cli::try_parse_from(["extprop", "run", "--mode", "simulate"]).unwrap();
        assert_matches!(
            cli.command,
            Commands::Run(RunArgs {
                mode: Some(Mode::Simulate),
                entities: None
            })
        );
    }

    #[test]
    fn revert_builds_filter_from_flags() {
        let cli = Cli::try_parse_from([
            "extprop",
            "revert",
            "--rule-id",
            "visa",
            "--entity-type",
            "student",
            "--run-id",
            "3",
            "--dry-run",
        ])
        .unwrap();
        let Commands::Revert(args) = cli.command else {
            panic!("expected revert");
        };
        let filter = args.filter();
        assert_eq!(filter.rule_id.as_deref(), Some("visa"));
        assert_eq!(filter.entity_type, Some(EntityType::Student));
        assert_eq!(filter.run_id, Some(3));
        assert!(args.options().dry_run);
        assert!(!args.options().force);
    }

    #[test]
    fn audit_id_excludes_filters() {
        assert!(Cli::try_parse_from(["extprop", "revert", "--audit-id", "1", "--run-id", "2"]).is_err());
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["extprop", "run", "--mode", "fix"]).is_err());
    }
}
