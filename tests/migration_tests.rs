// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for migrating legacy configuration trees.

mod common;

use common::write_file;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use unicfg::adapters::EnvFileParser;
use unicfg::domain::EnvMap;
use unicfg::migration::{validate_unified, MigrationEngine};
use unicfg::ports::ConfigParser;

/// A tree with one artifact of each kind for several components.
fn legacy_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_file(root, ".env", "LOG_LEVEL=info\nAPP_ENV=development\nSHARED_FLAG=1\n");
    write_file(
        root,
        "services/auth-service/.env",
        "AUTH_SERVICE_PORT=4001\nJWT_SECRET=\"auth-secret-with-spaces and # hash\"\n",
    );
    write_file(
        root,
        "services/chat-service/config/index.js",
        "module.exports = {\n  port: process.env.CHAT_SERVICE_PORT,\n  redis: process.env['REDIS_HOST'],\n};\n",
    );
    write_file(
        root,
        "gateway/.env",
        "# gateway overrides\nLOG_LEVEL=debug\nGATEWAY_PORT=8080\n",
    );
    dir
}

fn environment() -> EnvMap {
    [("CHAT_SERVICE_PORT", "4003")].into_iter().collect()
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

#[test]
fn test_migrate_backs_up_every_artifact() {
    let dir = legacy_tree();
    let root = dir.path();
    let originals: Vec<(PathBuf, Vec<u8>)> = [
        ".env",
        "services/auth-service/.env",
        "services/chat-service/config/index.js",
        "gateway/.env",
    ]
    .iter()
    .map(|rel| (PathBuf::from(rel), fs::read(root.join(rel)).unwrap()))
    .collect();

    let report = MigrationEngine::new(root)
        .with_environment(environment())
        .migrate()
        .unwrap();

    let backup = report.backup_dir.clone().unwrap();
    assert!(backup.starts_with(root.join("config-backup")));
    for (rel, bytes) in &originals {
        assert_eq!(&fs::read(backup.join(rel)).unwrap(), bytes, "{}", rel.display());
    }

    let backed_up = fs::metadata(backup.join("gateway/.env")).unwrap().modified().unwrap();
    let unified = fs::metadata(&report.output_path).unwrap().modified().unwrap();
    assert!(backed_up <= unified);
}

#[test]
fn test_report_lists_every_artifact_and_key() {
    let dir = legacy_tree();
    let report = MigrationEngine::new(dir.path())
        .with_environment(environment())
        .migrate()
        .unwrap();

    assert_eq!(report.migrated_files.len(), 4);
    assert!(report.migrated_files.contains(&PathBuf::from("gateway/.env")));
    assert!(report.warnings.is_empty());

    for key in [
        "LOG_LEVEL",
        "APP_ENV",
        "SHARED_FLAG",
        "AUTH_SERVICE_PORT",
        "JWT_SECRET",
        "CHAT_SERVICE_PORT",
        "REDIS_HOST",
        "GATEWAY_PORT",
    ] {
        assert!(report.keys.iter().any(|k| k == key), "{} missing", key);
    }

    let report_path = report.report_path.clone().unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["migrated_files"].as_array().unwrap().len(), 4);
    assert_eq!(json["dry_run"], false);
    assert!(json.get("rendered").is_none());
}

#[test]
fn test_unified_file_merges_by_priority() {
    let dir = legacy_tree();
    let report = MigrationEngine::new(dir.path())
        .with_environment(environment())
        .migrate()
        .unwrap();

    let content = fs::read_to_string(dir.path().join(".env")).unwrap();
    assert!(content.starts_with("# Unified configuration\n# Generated at "));
    assert_eq!(report.rendered.as_deref(), Some(content.as_str()));

    let unified = EnvFileParser::new().parse(&content).unwrap();
    assert_eq!(unified.get("LOG_LEVEL"), Some("debug"));
    assert_eq!(unified.get("GATEWAY_PORT"), Some("8080"));
    assert_eq!(unified.get("AUTH_SERVICE_PORT"), Some("4001"));
    assert_eq!(unified.get("CHAT_SERVICE_PORT"), Some("4003"));
    assert_eq!(
        unified.get("JWT_SECRET"),
        Some("auth-secret-with-spaces and # hash")
    );
    assert_eq!(unified.get("SHARED_FLAG"), Some("1"));
    // referenced but undefined in the environment, so the default applies
    assert_eq!(unified.get("REDIS_HOST"), Some("localhost"));
    // filled from fallbacks
    assert!(unified.get("DATABASE_URL").is_some());
    assert!(unified.get("JWT_REFRESH_SECRET").is_some());

    let check = report.validation.unwrap();
    assert!(check.is_valid());
    assert!(validate_unified(dir.path().join(".env")).unwrap().is_valid());
}

#[test]
fn test_unresolved_reference_keeps_lower_priority_value() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let secret = "k".repeat(40);
    write_file(
        root,
        ".env",
        &format!("JWT_SECRET={}\nDATABASE_URL=postgres://real@db/chat\n", secret),
    );
    write_file(
        root,
        "gateway/config/index.js",
        "module.exports = {\n  jwt: process.env.JWT_SECRET,\n  db: process.env.DATABASE_URL,\n  cache: process.env.REDIS_HOST,\n};\n",
    );

    let report = MigrationEngine::new(root)
        .with_environment(EnvMap::new())
        .migrate()
        .unwrap();
    assert!(report.validation.unwrap().is_valid());

    let unified = EnvFileParser::new()
        .parse(&fs::read_to_string(root.join(".env")).unwrap())
        .unwrap();
    assert_eq!(unified.get("JWT_SECRET"), Some(secret.as_str()));
    assert_eq!(unified.get("DATABASE_URL"), Some("postgres://real@db/chat"));
    assert_eq!(unified.get("REDIS_HOST"), Some("localhost"));
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = legacy_tree();
    let before = files_under(dir.path());
    let original = fs::read(dir.path().join(".env")).unwrap();

    let report = MigrationEngine::new(dir.path())
        .dry_run(true)
        .with_environment(environment())
        .migrate()
        .unwrap();

    assert!(report.dry_run);
    assert!(report.backup_dir.is_none());
    assert!(report.report_path.is_none());
    assert!(report.validation.is_none());
    assert_eq!(report.migrated_files.len(), 4);
    assert!(report.rendered.unwrap().contains("GATEWAY_PORT=8080"));

    assert_eq!(files_under(dir.path()), before);
    assert_eq!(fs::read(dir.path().join(".env")).unwrap(), original);
}

#[test]
fn test_empty_tree_succeeds_without_backup() {
    let dir = TempDir::new().unwrap();
    let report = MigrationEngine::new(dir.path()).migrate().unwrap();

    assert!(report.migrated_files.is_empty());
    assert!(report.keys.is_empty());
    assert!(report.backup_dir.is_none());
    assert!(files_under(dir.path()).is_empty());
}

#[test]
fn test_unparseable_artifact_becomes_warning() {
    let dir = legacy_tree();
    write_file(
        dir.path(),
        "services/user-service/.env",
        "USER_SERVICE_PORT=4002\nnot a valid line\n",
    );

    let report = MigrationEngine::new(dir.path())
        .with_environment(environment())
        .migrate()
        .unwrap();

    assert_eq!(report.migrated_files.len(), 5);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].component, "user");
    assert!(!report.keys.iter().any(|k| k == "USER_SERVICE_PORT"));

    let backup = report.backup_dir.unwrap();
    assert!(backup.join("services/user-service/.env").is_file());
}

#[test]
fn test_repeated_migration_keeps_separate_backups() {
    let dir = legacy_tree();
    let first = MigrationEngine::new(dir.path())
        .with_environment(environment())
        .migrate()
        .unwrap();
    let second = MigrationEngine::new(dir.path())
        .with_environment(environment())
        .migrate()
        .unwrap();

    let first_backup = first.backup_dir.unwrap();
    let second_backup = second.backup_dir.unwrap();
    assert_ne!(first_backup, second_backup);
    // the second run backs up the unified file the first run wrote
    let backed_up = fs::read_to_string(second_backup.join(".env")).unwrap();
    assert!(backed_up.starts_with("# Unified configuration"));
}

#[test]
fn test_missing_root_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = MigrationEngine::new(dir.path().join("missing")).migrate();
    assert!(result.is_err());
}
