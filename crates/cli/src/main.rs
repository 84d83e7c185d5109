use clap::Parser;
use extprop_core::rules::FileRuleSource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod config;

use cli::{Cli, Commands};
use config::{LogFormat, RunnerConfig};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("extprop error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = RunnerConfig::from_env()?;
    init_tracing(config.log_format);

    let cli = Cli::parse();
    let rules_path = cli.rules.clone().unwrap_or_else(|| config.rules_path.clone());
    let actor = cli.actor.clone().unwrap_or_else(|| config.actor.clone());
    tracing::debug!(rules = %rules_path.display(), %actor, "Loaded runner configuration");

    let rules = FileRuleSource::new(rules_path);

    match &cli.command {
        Commands::CheckRules => commands::check_rules(&rules),
        Commands::Run(args) => commands::run(&rules, args, &config, &actor).await,
        Commands::Revert(args) => commands::revert(args, &config, &actor).await,
    }
}

/// Logs go to stderr so stdout carries only the JSON result.
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "extprop=info,extprop_core=info,extprop_db=info".into());

    let (text, json) = match format {
        LogFormat::Text => (Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)), None),
        LogFormat::Json => (
            None,
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}
