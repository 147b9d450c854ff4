// SPDX-License-Identifier: MIT OR Apache-2.0

//! Migration example.
//!
//! This example demonstrates:
//! - Discovering legacy per-component configuration under a root
//! - Previewing the unified file with a dry run
//! - Running the migration for real and reading its report
//!
//! To run this example against a scratch tree:
//! ```bash
//! cargo run --example migration_dry_run
//! ```
//!
//! Or preview a real tree without writing anything:
//! ```bash
//! cargo run --example migration_dry_run -- /path/to/legacy/root
//! ```

use std::error::Error;
use std::fs;
use std::path::Path;
use unicfg::domain::EnvMap;
use unicfg::migration::MigrationEngine;

fn write(root: &Path, rel: &str, content: &str) -> std::io::Result<()> {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

fn scratch_tree(root: &Path) -> std::io::Result<()> {
    write(
        root,
        ".env",
        "APP_ENV=development\nLOG_LEVEL=info\nDATABASE_URL=postgresql://chat@localhost/chat\n",
    )?;
    write(
        root,
        "services/auth-service/.env",
        "AUTH_SERVICE_PORT=3001\nJWT_SECRET=\"legacy auth secret # keep quoted\"\n",
    )?;
    write(
        root,
        "services/chat-service/config/index.js",
        "module.exports = {\n  port: process.env.CHAT_SERVICE_PORT,\n  redis: process.env.REDIS_HOST,\n};\n",
    )?;
    write(root, "gateway/.env", "LOG_LEVEL=debug\nGATEWAY_PORT=8080\n")
}

fn main() -> std::result::Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    println!("=== unicfg: Migration ===\n");

    if let Some(root) = std::env::args().nth(1) {
        let report = MigrationEngine::new(&root).dry_run(true).migrate()?;
        println!("{} files, {} keys", report.migrated_files.len(), report.keys.len());
        print!("{}", report.rendered.as_deref().unwrap_or_default());
        return Ok(());
    }

    let dir = tempfile::tempdir()?;
    scratch_tree(dir.path())?;

    // Source references resolve against this map instead of the process environment
    let environment: EnvMap = [("CHAT_SERVICE_PORT", "3003")].into_iter().collect();

    println!("--- Dry run ---");
    let preview = MigrationEngine::new(dir.path())
        .dry_run(true)
        .with_environment(environment.clone())
        .migrate()?;
    for file in &preview.migrated_files {
        println!("  found {}", file.display());
    }
    println!();
    print!("{}", preview.rendered.as_deref().unwrap_or_default());

    println!("\n--- Migration ---");
    let report = MigrationEngine::new(dir.path())
        .with_environment(environment)
        .migrate()?;
    if let Some(backup) = &report.backup_dir {
        println!("Backed up originals to {}", backup.display());
    }
    println!("Wrote {}", report.output_path.display());
    if let Some(check) = &report.validation {
        if check.is_valid() {
            println!("Unified file defines every required key");
        } else {
            println!("Unified file is missing {}", check.missing.join(", "));
        }
    }
    if let Some(path) = &report.report_path {
        println!("Report:\n{}", fs::read_to_string(path)?);
    }

    Ok(())
}
