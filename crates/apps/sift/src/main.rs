//! Sift - rule-driven Gmail triage
//!
//! Command-line entry point: fetches messages, then runs rule-engine passes.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use sift::{
    FailurePolicy, FetchStats, GmailAuth, GmailClient, GmailCredentials, PassSummary, RuleEngine,
    Settings, SqliteStore, fetch_records, load_rulesets,
};
use std::path::Path;

mod cli;

use cli::{Cli, Commands, ProcessArgs};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let settings = Settings::load().context("Failed to load settings")?;
    let db_path = settings.database_path(cli.database.as_deref())?;
    info!("Using database {}", db_path.display());
    let store = SqliteStore::new(&db_path)?;

    let command = cli.command.unwrap_or(Commands::Run {
        count: None,
        process: ProcessArgs::default(),
    });

    match command {
        Commands::Fetch { count } => {
            let client = connect(&settings)?;
            let stats = fetch_records(&client, &store, count.unwrap_or(settings.fetch_count))?;
            print_fetch(&stats);
        }
        Commands::Process(args) => {
            let client = connect(&settings)?;
            let summary = process(&settings, &args, &store, &client)?;
            print_summary(&summary);
        }
        Commands::Run { count, process: args } => {
            let client = connect(&settings)?;
            let stats = fetch_records(&client, &store, count.unwrap_or(settings.fetch_count))?;
            print_fetch(&stats);
            let summary = process(&settings, &args, &store, &client)?;
            print_summary(&summary);
        }
    }

    Ok(())
}

/// Build an authenticated Gmail client from the configured credentials
fn connect(settings: &Settings) -> Result<GmailClient> {
    let creds = GmailCredentials::load().map_err(|e| {
        if let Some(path) = GmailCredentials::default_credentials_path() {
            warn!(
                "To configure Gmail access, either:\n\
                 1. Place your Google OAuth credentials at: {}\n\
                 2. Or set environment variables: GMAIL_CLIENT_ID and GMAIL_CLIENT_SECRET",
                path.display()
            );
        }
        e.context("Gmail credentials not found")
    })?;

    let auth = GmailAuth::new(creds.client_id, creds.client_secret)?;
    Ok(GmailClient::new(auth, settings.request_timeout()))
}

fn process(
    settings: &Settings,
    args: &ProcessArgs,
    store: &SqliteStore,
    client: &GmailClient,
) -> Result<PassSummary> {
    let rules_path = settings.rules_path(args.rules.as_deref())?;
    let rulesets = load_rules(&rules_path)?;
    let policy = args
        .policy
        .map(FailurePolicy::from)
        .unwrap_or(settings.failure_policy);

    RuleEngine::new(&rulesets, store, store, client)
        .with_policy(policy)
        .run_pass()
}

fn load_rules(path: &Path) -> Result<Vec<sift::RuleSet>> {
    let rulesets = load_rulesets(path)
        .with_context(|| format!("Invalid rules configuration in {}", path.display()))?;
    if rulesets.is_empty() {
        warn!("{} defines no rulesets", path.display());
    }
    Ok(rulesets)
}

fn print_fetch(stats: &FetchStats) {
    println!(
        "Fetched {} of {} messages ({} errors)",
        stats.stored, stats.listed, stats.errors
    );
}

fn print_summary(summary: &PassSummary) {
    println!("Records considered:  {}", summary.records_considered);
    println!("Rulesets considered: {}", summary.rulesets_considered);
    println!("Matches:             {}", summary.matches);
    println!("Actions attempted:   {}", summary.actions_attempted);
    println!("Actions failed:      {}", summary.actions_failed);
    println!("Actions skipped:     {}", summary.actions_skipped);
    println!("Already processed:   {}", summary.skipped_processed);
}
