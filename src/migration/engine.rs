// SPDX-License-Identifier: MIT OR Apache-2.0

//! The migration run: discover, back up, parse, merge, generate, report.

use crate::adapters::env_file::write_atomic;
use crate::adapters::{EnvFileParser, SourceReferenceParser};
use crate::domain::{ConfigError, EnvMap, Result};
use crate::migration::discovery::{self, ArtifactKind, LegacyArtifact};
use crate::migration::generator;
use crate::migration::merge::merge;
use crate::ports::ConfigParser;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory under the root holding backups and reports.
pub const BACKUP_DIR: &str = "config-backup";

/// File name of the unified artifact under the root.
pub const UNIFIED_FILE: &str = ".env";

/// Keys the post-migration check expects as `KEY=` lines.
pub const UNIFIED_REQUIRED_KEYS: &[&str] = &[
    "APP_ENV",
    "JWT_SECRET",
    "JWT_REFRESH_SECRET",
    "DATABASE_URL",
    "REDIS_HOST",
];

/// An artifact that could not be parsed; it contributed nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArtifactParseWarning {
    /// Path relative to the migration root
    pub path: PathBuf,
    /// Owning component
    pub component: String,
    /// Parser message
    pub message: String,
}

/// Verbatim copies of the discovered artifacts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BackupBundle {
    /// Timestamped backup directory
    pub directory: PathBuf,
    /// Copied files, mirroring their paths relative to the root
    pub files: Vec<PathBuf>,
}

/// Result of the textual check of a unified artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnifiedCheck {
    /// Checked file
    pub path: PathBuf,
    /// Required keys found
    pub present: Vec<String>,
    /// Required keys not found
    pub missing: Vec<String>,
}

impl UnifiedCheck {
    /// Returns `true` if no required key is missing.
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Record of a migration run, stored as JSON beside the backup.
#[derive(Clone, Debug, Serialize)]
pub struct MigrationReport {
    /// When the run started
    pub timestamp: DateTime<Utc>,
    /// Discovered artifacts, relative to the root
    pub migrated_files: Vec<PathBuf>,
    /// Final merged key set in merge order
    pub keys: Vec<String>,
    /// Unified artifact path
    pub output_path: PathBuf,
    /// Backup directory; `None` for dry runs and empty trees
    pub backup_dir: Option<PathBuf>,
    /// Where this report was written
    pub report_path: Option<PathBuf>,
    /// Artifacts that failed to parse
    pub warnings: Vec<ArtifactParseWarning>,
    /// Post-migration check of the written artifact
    pub validation: Option<UnifiedCheck>,
    /// Whether the run was a dry run
    pub dry_run: bool,
    /// Rendered unified artifact
    #[serde(skip)]
    pub rendered: Option<String>,
}

/// Migrates legacy per-component configuration into one unified artifact.
///
/// # Examples
///
/// ```rust,no_run
/// use unicfg::migration::MigrationEngine;
///
/// # fn main() -> unicfg::domain::Result<()> {
/// let preview = MigrationEngine::new("/srv/chat").dry_run(true).migrate()?;
/// println!("{}", preview.rendered.unwrap_or_default());
///
/// let report = MigrationEngine::new("/srv/chat").migrate()?;
/// println!("backed up to {:?}", report.backup_dir);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MigrationEngine {
    root: PathBuf,
    dry_run: bool,
    environment: Option<EnvMap>,
}

impl MigrationEngine {
    /// Creates an engine for the tree at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dry_run: false,
            environment: None,
        }
    }

    /// Computes everything in memory without writing.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Resolves source references against `environment` instead of the
    /// process environment.
    pub fn with_environment(mut self, environment: EnvMap) -> Self {
        self.environment = Some(environment);
        self
    }

    /// The migration root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The unified artifact path.
    pub fn output_path(&self) -> PathBuf {
        self.root.join(UNIFIED_FILE)
    }

    /// Finds legacy artifacts in priority order.
    pub fn discover(&self) -> Result<Vec<LegacyArtifact>> {
        discovery::discover(&self.root)
    }

    /// Copies every artifact into a fresh timestamped directory.
    ///
    /// Returns `None` when there is nothing to back up.
    pub fn backup(
        &self,
        artifacts: &[LegacyArtifact],
        timestamp: DateTime<Utc>,
    ) -> Result<Option<BackupBundle>> {
        if artifacts.is_empty() {
            return Ok(None);
        }

        let directory = self.create_backup_dir(timestamp)?;
        let mut files = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let target = directory.join(&artifact.relative_path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|source| ConfigError::BackupFailed {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::copy(&artifact.path, &target).map_err(|source| ConfigError::BackupFailed {
                path: target.clone(),
                source,
            })?;
            files.push(target);
        }

        tracing::info!("Backed up {} artifacts to {}", files.len(), directory.display());
        Ok(Some(BackupBundle { directory, files }))
    }

    fn create_backup_dir(&self, timestamp: DateTime<Utc>) -> Result<PathBuf> {
        let parent = self.root.join(BACKUP_DIR);
        fs::create_dir_all(&parent).map_err(|source| ConfigError::BackupFailed {
            path: parent.clone(),
            source,
        })?;

        let base = format!("config-backup-{}", stamp(timestamp));
        for attempt in 0u32..100 {
            let name = match attempt {
                0 => base.clone(),
                n => format!("{}-{}", base, n),
            };
            let candidate = parent.join(name);
            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => {
                    return Err(ConfigError::BackupFailed {
                        path: candidate,
                        source,
                    })
                }
            }
        }

        Err(ConfigError::BackupFailed {
            path: parent.join(base),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "backup directory exists"),
        })
    }

    /// Parses one artifact; failures degrade to an empty map and a warning.
    pub fn parse(&self, artifact: &LegacyArtifact) -> (EnvMap, Option<ArtifactParseWarning>) {
        let parsed = fs::read_to_string(&artifact.path)
            .map_err(ConfigError::from)
            .and_then(|content| match artifact.kind {
                ArtifactKind::Env => EnvFileParser::new().parse(&content),
                ArtifactKind::SourceReference => self.reference_parser().parse(&content),
            });

        match parsed {
            Ok(map) => {
                tracing::debug!(
                    "Parsed {} keys from {}",
                    map.len(),
                    artifact.relative_path.display()
                );
                (map, None)
            }
            Err(e) => {
                tracing::warn!(
                    "Skipping unparseable artifact {}: {}",
                    artifact.relative_path.display(),
                    e
                );
                let warning = ArtifactParseWarning {
                    path: artifact.relative_path.clone(),
                    component: artifact.component.to_string(),
                    message: e.to_string(),
                };
                (EnvMap::new(), Some(warning))
            }
        }
    }

    fn reference_parser(&self) -> SourceReferenceParser {
        match &self.environment {
            Some(env) => SourceReferenceParser::with_environment(env.clone()),
            None => SourceReferenceParser::from_process_env(),
        }
    }

    /// Runs the migration.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::BackupFailed`] if the backup cannot be written; nothing
    ///   else is touched.
    /// - [`ConfigError::Migration`] for other I/O failures. The unified file
    ///   is replaced atomically, so it is either the old or the new content.
    pub fn migrate(&self) -> Result<MigrationReport> {
        let timestamp = Utc::now();
        let output_path = self.output_path();
        let artifacts = self.discover()?;

        let mut report = MigrationReport {
            timestamp,
            migrated_files: artifacts.iter().map(|a| a.relative_path.clone()).collect(),
            keys: Vec::new(),
            output_path: output_path.clone(),
            backup_dir: None,
            report_path: None,
            warnings: Vec::new(),
            validation: None,
            dry_run: self.dry_run,
            rendered: None,
        };

        if artifacts.is_empty() {
            tracing::info!("No legacy configuration found under {}", self.root.display());
            return Ok(report);
        }

        if !self.dry_run {
            report.backup_dir = self.backup(&artifacts, timestamp)?.map(|b| b.directory);
        }

        let mut maps = Vec::with_capacity(artifacts.len());
        for artifact in &artifacts {
            let (map, warning) = self.parse(artifact);
            report.warnings.extend(warning);
            maps.push((artifact.component, map));
        }

        let merged = merge(&maps);
        report.keys = merged.keys().map(str::to_string).collect();
        let rendered = generator::generate(&merged, timestamp);

        if self.dry_run {
            tracing::info!(
                "Dry run: {} artifacts would produce {} keys",
                artifacts.len(),
                merged.len()
            );
            report.rendered = Some(rendered);
            return Ok(report);
        }

        write_atomic(&output_path, &rendered).map_err(|e| {
            ConfigError::migration(
                format!("Failed to write {}", output_path.display()),
                e,
            )
        })?;
        tracing::info!("Wrote unified configuration to {}", output_path.display());

        let check = validate_unified(&output_path)?;
        if !check.is_valid() {
            tracing::warn!("Unified configuration is missing {:?}", check.missing);
        }
        report.validation = Some(check);
        report.rendered = Some(rendered);

        let report_path = self
            .root
            .join(BACKUP_DIR)
            .join(format!("migration-report-{}.json", stamp(timestamp)));
        report.report_path = Some(report_path.clone());
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| ConfigError::migration("Failed to serialize migration report", e))?;
        write_atomic(&report_path, &json).map_err(|e| {
            ConfigError::migration(
                format!("Failed to write {}", report_path.display()),
                e,
            )
        })?;

        Ok(report)
    }
}

/// Filesystem-safe ISO-8601 timestamp with milliseconds.
fn stamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

/// Checks that every required key appears as a `KEY=` line in `path`.
///
/// This is a textual check; values are not validated.
pub fn validate_unified(path: impl AsRef<Path>) -> Result<UnifiedCheck> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;

    let (present, missing): (Vec<&str>, Vec<&str>) =
        UNIFIED_REQUIRED_KEYS.iter().copied().partition(|key| {
            let prefix = format!("{}=", key);
            content.lines().any(|line| line.trim_start().starts_with(&prefix))
        });

    Ok(UnifiedCheck {
        path: path.to_path_buf(),
        present: present.into_iter().map(str::to_string).collect(),
        missing: missing.into_iter().map(str::to_string).collect(),
    })
}
