//! Fixture Runner CLI
//!
//! ## Usage
//!
//! ```bash
//! # Test ten RF motherboards, reporting to the configured endpoint
//! fixture-runner run pcba-rf-motherboard -n 10
//!
//! # Assemble RF units from the motherboard pool, writing reports locally
//! fixture-runner run pcba-rf-assembly -n 5 --offline ./reports
//!
//! # List fixtures with their steps
//! fixture-runner list --detailed
//!
//! # Re-send submissions that could not be delivered
//! fixture-runner outbox flush
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::{info, warn};

use fixture_runner::cli::{self, Args};
use fixture_runner::config::{self, AppConfig, ConfigFile, EnvConfig};
use fixture_runner::executor::{RetryPolicy, Station};
use fixture_runner::fixtures;
use fixture_runner::models::AbortPolicy;
use fixture_runner::output::{OutputFormat, ResultFormatter};
use fixture_runner::report::{FileEmitter, HttpEmitter, ReportEmitter};
use fixture_runner::utils::{init_logger, LogLevel};

fn main() -> Result<()> {
    let args = Args::parse();

    let env = EnvConfig::load();
    let config = load_config(&args, &env)?;

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::from_str(&config.log_level).unwrap_or(LogLevel::Info)
    };
    init_logger(level);

    match args.command {
        cli::Command::Run(run_args) => {
            run_fixture(run_args, &config)?;
        }
        cli::Command::List(list_args) => {
            list_fixtures(list_args)?;
        }
        cli::Command::Outbox(outbox_args) => {
            manage_outbox(outbox_args, &config)?;
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args, &config, &env)?;
        }
    }

    Ok(())
}

/// `--config`, then `FIXTURE_RUNNER_CONFIG`, then the standard locations;
/// environment variables override the file
fn load_config(args: &Args, env: &EnvConfig) -> Result<AppConfig> {
    let file = match args.config.as_ref().or(env.config_file.as_ref()) {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::load_default()?,
    };

    let mut config = file.app;
    env.apply_to(&mut config);
    config
        .validate()
        .context("Invalid configuration after environment overrides")?;
    Ok(config)
}

fn emitter_for(config: &AppConfig, offline: Option<&str>) -> Result<Box<dyn ReportEmitter>> {
    let offline_dir = offline
        .map(Path::new)
        .or(config.reporting.offline_dir.as_deref());

    if let Some(dir) = offline_dir {
        info!("Offline mode: writing submissions to {}", dir.display());
        return Ok(Box::new(FileEmitter::new(dir)));
    }

    let emitter = HttpEmitter::new(&config.reporting.endpoint, config.reporting.timeout_secs)
        .context("Failed to create reporting client")?
        .with_api_key(config.reporting.api_key.clone());
    info!("Reporting to {}", emitter.runs_url());
    Ok(Box::new(emitter))
}

fn run_fixture(args: cli::RunArgs, config: &AppConfig) -> Result<()> {
    let fixture = fixtures::by_name(&args.fixture)?.ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown fixture: {} (available: {})",
            args.fixture,
            fixtures::names().join(", ")
        )
    })?;

    let missing = fixture.unsimulated_steps();
    if !missing.is_empty() {
        warn!(
            "Fixture {} has no simulation for: {}",
            fixture.name,
            missing.join(", ")
        );
    }

    let mut station_config = config.station_config();
    if let Some(policy) = &args.policy {
        let policy = AbortPolicy::from_str(policy)
            .ok_or_else(|| anyhow::anyhow!("Unknown policy: {policy} (use run-all or abort)"))?;
        station_config.policy = Some(policy);
    }
    if let Some(retries) = args.retries {
        station_config.retry = Some(RetryPolicy::new(retries));
    }
    if args.seed.is_some() {
        station_config.seed = args.seed;
    }

    let format = OutputFormat::from_str(&args.format)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {}", args.format))?;
    let formatter = ResultFormatter::new(format);

    let units = args.units.unwrap_or(config.default_units);
    if units == 0 {
        anyhow::bail!("Number of units must be at least 1");
    }

    let emitter = emitter_for(config, args.offline.as_deref())?;
    let outbox = config.outbox();
    let mut station = Station::simulated(fixture, emitter, station_config).with_outbox(outbox);

    let (reports, summary) = station
        .run_batch(units)
        .with_context(|| format!("Batch on {} failed", args.fixture))?;

    println!("{}", formatter.format_batch(&reports, &summary));

    if summary.reporting_failures > 0 {
        warn!(
            "{} submission(s) were not delivered; see `fixture-runner outbox list`",
            summary.reporting_failures
        );
    }

    Ok(())
}

fn list_fixtures(args: cli::ListArgs) -> Result<()> {
    let all = fixtures::all()?;
    let formatter = ResultFormatter::default();
    println!("{}", formatter.format_fixtures(&all, args.detailed));
    Ok(())
}

fn manage_outbox(args: cli::OutboxArgs, config: &AppConfig) -> Result<()> {
    let outbox = config.outbox();

    match args.action {
        cli::OutboxAction::List => {
            let entries = outbox.list()?;
            println!(
                "\nOutbox: {} ({} submission(s))\n",
                outbox.base_dir().display(),
                entries.len()
            );
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            for entry in &entries {
                let submission = &entry.submission;
                println!(
                    "  {} {:8} {:20} {} steps  {}",
                    if submission.run_passed { "✓" } else { "✗" },
                    submission.procedure_id,
                    submission.serial_number(),
                    submission.steps.len(),
                    entry.path.display()
                );
            }
            println!();
        }

        cli::OutboxAction::Flush => {
            let emitter = emitter_for(config, None)?;
            let report = outbox.flush(&emitter)?;
            println!(
                "✓ Delivered {} submission(s), {} still pending",
                report.delivered, report.failed
            );
        }

        cli::OutboxAction::Export { path } => {
            let count = outbox.export(Path::new(&path))?;
            println!("✓ Exported {count} submission(s) to {path}");
        }
    }

    Ok(())
}

fn manage_config(args: cli::ConfigArgs, config: &AppConfig, env: &EnvConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Show { format } => {
            let shown = config.redacted();
            let output = if format == "json" {
                serde_json::to_string_pretty(&shown)?
            } else {
                serde_yaml::to_string(&shown)?
            };
            println!("{output}");
        }

        cli::ConfigAction::Init { path, force } => {
            let target = Path::new(&path);
            if target.exists() && !force {
                anyhow::bail!("Configuration file already exists: {path}. Use --force to overwrite.");
            }

            ConfigFile::example().save(target)?;
            println!("✓ Configuration file created: {path}");
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Env => {
            config::env::print_env_help();
            if env.has_any() {
                println!();
                env.print_summary();
            }
        }
    }

    Ok(())
}
