// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discovery of legacy per-component configuration artifacts.

use crate::domain::{ConfigError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Components in merge priority order, lowest first.
///
/// When several components define a key, the one listed last wins.
pub const COMPONENT_PRIORITY: &[&str] = &[
    "common",
    "auth",
    "user",
    "chat",
    "notification",
    "analytics",
    "file",
    "admin",
    "gateway",
];

/// How an artifact is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    /// `KEY=VALUE` file
    Env,
    /// Source module whose environment references are scanned
    SourceReference,
}

/// A discovered legacy artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LegacyArtifact {
    /// Absolute path
    pub path: PathBuf,
    /// Path relative to the migration root
    pub relative_path: PathBuf,
    /// How the artifact is parsed
    pub kind: ArtifactKind,
    /// Owning component
    pub component: &'static str,
}

/// Returns the merge rank of `component`; unknown components rank first.
pub fn priority_of(component: &str) -> usize {
    COMPONENT_PRIORITY
        .iter()
        .position(|c| *c == component)
        .map(|p| p + 1)
        .unwrap_or(0)
}

/// Relative locations checked for `component`, in discovery order.
pub fn candidate_paths(component: &str) -> Vec<(PathBuf, ArtifactKind)> {
    match component {
        "common" => vec![
            (PathBuf::from(".env"), ArtifactKind::Env),
            (PathBuf::from("shared/.env"), ArtifactKind::Env),
            (
                PathBuf::from("shared/config/index.js"),
                ArtifactKind::SourceReference,
            ),
        ],
        "gateway" => vec![
            (PathBuf::from("gateway/.env"), ArtifactKind::Env),
            (
                PathBuf::from("gateway/config/index.js"),
                ArtifactKind::SourceReference,
            ),
        ],
        service => {
            let dir = PathBuf::from("services").join(format!("{}-service", service));
            vec![
                (dir.join(".env"), ArtifactKind::Env),
                (
                    dir.join("config").join("index.js"),
                    ArtifactKind::SourceReference,
                ),
            ]
        }
    }
}

/// Finds every legacy artifact under `root`, in merge priority order.
///
/// Missing files are skipped. `root` itself must be an existing directory.
pub fn discover(root: &Path) -> Result<Vec<LegacyArtifact>> {
    if !root.is_dir() {
        return Err(ConfigError::Migration {
            message: format!("Migration root is not a directory: {}", root.display()),
            source: None,
        });
    }

    let mut artifacts = Vec::new();
    for component in COMPONENT_PRIORITY {
        for (relative_path, kind) in candidate_paths(component) {
            let path = root.join(&relative_path);
            if !path.is_file() {
                continue;
            }
            tracing::debug!("Found {:?} artifact for {}: {}", kind, component, path.display());
            artifacts.push(LegacyArtifact {
                path,
                relative_path,
                kind,
                component,
            });
        }
    }

    tracing::info!(
        "Discovered {} legacy configuration artifacts under {}",
        artifacts.len(),
        root.display()
    );
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "A=1\n").unwrap();
    }

    #[test]
    fn test_priority_order() {
        assert!(priority_of("common") < priority_of("auth"));
        assert!(priority_of("admin") < priority_of("gateway"));
        assert_eq!(priority_of("unknown"), 0);
    }

    #[test]
    fn test_candidate_paths_for_service() {
        let paths = candidate_paths("chat");
        assert_eq!(paths[0].0, PathBuf::from("services/chat-service/.env"));
        assert_eq!(paths[1].1, ArtifactKind::SourceReference);
    }

    #[test]
    fn test_discover_skips_missing_and_orders_by_priority() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "gateway/.env");
        touch(dir.path(), "services/auth-service/config/index.js");
        touch(dir.path(), ".env");
        touch(dir.path(), "services/unknown-service/.env");

        let found = discover(dir.path()).unwrap();
        let components: Vec<_> = found.iter().map(|a| a.component).collect();
        assert_eq!(components, vec!["common", "auth", "gateway"]);
        assert_eq!(found[1].kind, ArtifactKind::SourceReference);
        assert!(found.iter().all(|a| a.path.is_absolute() || a.path.starts_with(dir.path())));
    }

    #[test]
    fn test_discover_empty_tree() {
        let dir = TempDir::new().unwrap();
        assert!(discover(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_discover_requires_directory() {
        let result = discover(Path::new("/nonexistent/unicfg/root"));
        assert!(matches!(result, Err(ConfigError::Migration { .. })));
    }
}
