// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line front end for the configuration authority and migration engine.

use clap::{Args, Parser, Subcommand};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use unicfg::adapters::{set_key, SetOutcome};
use unicfg::domain::schema::{self, is_secret_key};
use unicfg::domain::service::find_service;
use unicfg::domain::{ConfigError, ConfigKey, Tier};
use unicfg::migration::{render_template, MigrationEngine};
use unicfg::report::generate_report;
use unicfg::service::{ConfigAuthority, SchemaValidator};

type CliResult = std::result::Result<(), Box<dyn Error>>;

const DEFAULT_ENV_FILE: &str = ".env";
const MASK: &str = "********";

#[derive(Parser)]
#[command(
    name = "unicfg",
    author,
    version,
    about = "Validate, inspect and migrate unified service configuration"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Validate the configuration and optionally print a health report")]
    Validate(ValidateArgs),

    #[command(about = "Migrate legacy per-component configuration into one .env file")]
    Migrate(MigrateArgs),

    #[command(about = "Show configuration values")]
    Show(ShowArgs),

    #[command(about = "Set a key in an env file")]
    Set(SetArgs),

    #[command(about = "Print a configuration template")]
    Template(TemplateArgs),

    #[command(about = "Print a health report; fails if the configuration is unhealthy")]
    Health(HealthArgs),

    #[command(about = "Reload and report whenever the env file changes")]
    Watch(WatchArgs),
}

#[derive(Args)]
struct ValidateArgs {
    #[arg(long, help = "Also print the configuration projected for this service")]
    service: Option<String>,

    #[arg(long = "env", value_name = "FILE", help = "Env file to read [default: .env if present]")]
    env_file: Option<PathBuf>,

    #[arg(long, help = "Print a health report after validating")]
    report: bool,
}

#[derive(Args)]
struct MigrateArgs {
    #[arg(long, default_value = ".", help = "Root of the legacy tree")]
    root: PathBuf,

    #[arg(long, help = "Print the unified file without writing anything")]
    dry_run: bool,
}

#[derive(Args)]
struct ShowArgs {
    #[arg(long, conflicts_with_all = ["service", "env"], help = "Dotted path to show")]
    key: Option<String>,

    #[arg(long, conflicts_with = "env", help = "Show the configuration for one service")]
    service: Option<String>,

    #[arg(long, help = "Show every raw key")]
    env: bool,

    #[arg(long, help = "Print secret values instead of masking them")]
    secrets: bool,

    #[arg(long, value_name = "FILE", help = "Env file to read [default: .env if present]")]
    file: Option<PathBuf>,
}

#[derive(Args)]
struct SetArgs {
    key: String,

    value: String,

    #[arg(long, default_value = DEFAULT_ENV_FILE, help = "Env file to update")]
    file: PathBuf,

    #[arg(long, help = "Skip schema checks")]
    force: bool,
}

#[derive(Args)]
struct TemplateArgs {
    #[arg(long = "env", default_value = "development", help = "Tier the template targets")]
    tier: String,

    #[arg(long, help = "Limit ports, URLs and databases to one service")]
    service: Option<String>,

    #[arg(long, help = "Write the template to a file instead of stdout")]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct HealthArgs {
    #[arg(long, help = "Only report on this service")]
    service: Option<String>,

    #[arg(long, value_name = "FILE", help = "Env file to read [default: .env if present]")]
    file: Option<PathBuf>,

    #[cfg(feature = "yaml")]
    #[arg(long, help = "Print YAML instead of JSON")]
    yaml: bool,
}

#[derive(Args)]
struct WatchArgs {
    #[arg(long, default_value = DEFAULT_ENV_FILE, help = "Env file to watch")]
    file: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let result = match cli.command {
        Commands::Validate(args) => validate(args),
        Commands::Migrate(args) => migrate(args),
        Commands::Show(args) => show(args),
        Commands::Set(args) => set(args),
        Commands::Template(args) => template(args),
        Commands::Health(args) => health(args),
        Commands::Watch(args) => watch(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Builds an authority over `file` (or `.env` when it exists) and the process
/// environment.
fn authority(file: Option<&Path>) -> Result<ConfigAuthority, ConfigError> {
    let builder = ConfigAuthority::builder();
    let builder = match file {
        Some(path) => builder.with_env_file(path)?,
        None if Path::new(DEFAULT_ENV_FILE).is_file() => builder.with_env_file(DEFAULT_ENV_FILE)?,
        None => builder,
    };
    Ok(builder.with_env_vars().build())
}

fn print_violations(error: &ConfigError) {
    for violation in error.violations() {
        eprintln!("  {}", violation);
    }
}

fn validate(args: ValidateArgs) -> CliResult {
    let authority = authority(args.env_file.as_deref())?;
    let snapshot = authority.load().map_err(|e| {
        print_violations(&e);
        e
    })?;

    println!("Configuration is valid for the {} tier", snapshot.tier());

    if let Some(service) = &args.service {
        let config = snapshot.service_config(service);
        if !config.known {
            eprintln!("warning: '{}' is not a known service", service);
        }
        println!("{}", serde_json::to_string_pretty(&config)?);
    }

    if args.report {
        let report = generate_report(&snapshot);
        println!("{}", report.to_json()?);
        if !report.is_healthy() {
            return Err("configuration is unhealthy".into());
        }
    }
    Ok(())
}

fn migrate(args: MigrateArgs) -> CliResult {
    let report = MigrationEngine::new(&args.root)
        .dry_run(args.dry_run)
        .migrate()?;

    for warning in &report.warnings {
        eprintln!(
            "warning: skipped {} ({}): {}",
            warning.path.display(),
            warning.component,
            warning.message
        );
    }

    if report.migrated_files.is_empty() {
        println!("No legacy configuration found under {}", args.root.display());
        return Ok(());
    }

    if report.dry_run {
        print!("{}", report.rendered.as_deref().unwrap_or_default());
        return Ok(());
    }

    println!(
        "Migrated {} files ({} keys) into {}",
        report.migrated_files.len(),
        report.keys.len(),
        report.output_path.display()
    );
    if let Some(dir) = &report.backup_dir {
        println!("Backup: {}", dir.display());
    }
    if let Some(path) = &report.report_path {
        println!("Report: {}", path.display());
    }

    match &report.validation {
        Some(check) if !check.is_valid() => Err(format!(
            "unified configuration is missing {}",
            check.missing.join(", ")
        )
        .into()),
        _ => Ok(()),
    }
}

fn is_secret_path(path: &str) -> bool {
    let last = path.rsplit('.').next().unwrap_or(path);
    path.starts_with("database.") || is_secret_key(&last.to_ascii_uppercase())
}

fn display_value<'a>(path: &str, value: &'a str, secrets: bool) -> &'a str {
    if !secrets && is_secret_path(path) {
        MASK
    } else {
        value
    }
}

fn show(args: ShowArgs) -> CliResult {
    let authority = authority(args.file.as_deref())?;
    let snapshot = authority.load()?;

    if let Some(key) = &args.key {
        let value = snapshot.get(&ConfigKey::from(key.as_str()))?;
        println!("{}", display_value(key, value.as_str(), args.secrets));
        return Ok(());
    }

    if let Some(service) = &args.service {
        let config = snapshot.service_config(service);
        let mut json = serde_json::to_value(&config)?;
        if args.secrets {
            json["jwt_secret"] = config.jwt_secret.clone().into();
            json["jwt_refresh_secret"] = config.jwt_refresh_secret.clone().into();
            json["database_url"] = config.database_url.clone().into();
        }
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if args.env {
        let validated = snapshot.validated();
        for (key, value) in validated.fields() {
            let value = value.to_string();
            println!("{}={}", key, display_value(key, &value, args.secrets));
        }
        for (key, value) in validated.passthrough().iter() {
            if schema::is_known_key(key) {
                continue;
            }
            println!("{}={}", key, display_value(key, value, args.secrets));
        }
        return Ok(());
    }

    for (path, value) in snapshot.entries().filter(|(path, _)| !path.starts_with("env.")) {
        println!("{} = {}", path, display_value(path, value, args.secrets));
    }
    Ok(())
}

fn set(args: SetArgs) -> CliResult {
    if !args.force {
        match SchemaValidator::new().check_value(&args.key, &args.value) {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(format!(
                    "{} is not a known configuration key (use --force to set it anyway)",
                    args.key
                )
                .into())
            }
            Err(violation) => return Err(violation.to_string().into()),
        }
    }

    let outcome = set_key(&args.file, &args.key, &args.value)?;
    let verb = match outcome {
        SetOutcome::Added => "Added",
        SetOutcome::Updated => "Updated",
        SetOutcome::Unchanged => "Unchanged",
    };
    println!("{} {} in {}", verb, args.key, args.file.display());
    Ok(())
}

fn template(args: TemplateArgs) -> CliResult {
    let tier: Tier = args.tier.parse()?;
    let content = render_template(tier, args.service.as_deref());

    match &args.output {
        Some(path) => {
            fs::write(path, &content)?;
            println!("Wrote {} template to {}", tier, path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn health(args: HealthArgs) -> CliResult {
    let authority = authority(args.file.as_deref())?;
    let snapshot = authority.load()?;
    let report = generate_report(&snapshot);

    match &args.service {
        Some(service) => {
            let name = find_service(service).map(|s| s.name).unwrap_or(service.as_str());
            let status = report
                .services
                .get(name)
                .ok_or_else(|| format!("'{}' is not a known service", service))?;
            println!("{}", serde_json::to_string_pretty(status)?);
        }
        #[cfg(feature = "yaml")]
        None if args.yaml => print!("{}", report.to_yaml()?),
        None => println!("{}", report.to_json()?),
    }

    if !report.is_healthy() {
        let failed: Vec<_> = report.failed_checks().map(|c| c.field.as_str()).collect();
        return Err(format!("configuration is unhealthy: missing {}", failed.join(", ")).into());
    }
    Ok(())
}

#[cfg(feature = "reload")]
fn watch(args: WatchArgs) -> CliResult {
    use std::sync::Arc;
    use unicfg::service::{ConfigEvent, ConfigEventKind};

    let authority = Arc::new(
        ConfigAuthority::builder()
            .with_env_file(&args.file)?
            .with_env_vars()
            .build(),
    );
    let snapshot = authority.load()?;

    authority.on(ConfigEventKind::Changed, |event| {
        if let ConfigEvent::Changed(snapshot) = event {
            println!(
                "[{}] configuration reloaded ({} tier)",
                snapshot.loaded_at().to_rfc3339(),
                snapshot.tier()
            );
        }
    });
    authority.on(ConfigEventKind::ReloadFailed, |event| {
        if let ConfigEvent::ReloadFailed(message) = event {
            eprintln!("reload rejected, keeping previous configuration: {}", message);
        }
    });

    if authority.watch()? == 0 {
        return Err(format!(
            "watching is only available in the development tier (current: {})",
            snapshot.tier()
        )
        .into());
    }

    println!("Watching {} (Ctrl-C to stop)", args.file.display());
    loop {
        std::thread::park();
    }
}

#[cfg(not(feature = "reload"))]
fn watch(_args: WatchArgs) -> CliResult {
    Err("this build does not include file watching (enable the `reload` feature)".into())
}
