//! Server configuration read from the environment.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable holding the directory allowlist.
pub const ALLOWED_DIR_ENV: &str = "ALLOWED_DIR";

/// Security configuration for the PDF tools server
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerConfig {
    /// Directories tools may touch. Empty means unrestricted.
    pub allowed_dirs: Vec<PathBuf>,
}

impl ServerConfig {
    pub fn with_allowed_dirs<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            allowed_dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the configuration from `ALLOWED_DIR`.
    pub fn from_env() -> Result<Self> {
        let value = std::env::var(ALLOWED_DIR_ENV).ok();
        Ok(Self {
            allowed_dirs: parse_allowed_dirs(value.as_deref())?,
        })
    }

    pub fn is_restricted(&self) -> bool {
        !self.allowed_dirs.is_empty()
    }

    /// Validate that a path is within the allowed directories.
    /// With no allowed directories configured every path is accepted.
    pub fn validate_path_access(&self, path: &str) -> Result<PathBuf> {
        if !self.is_restricted() {
            return Ok(PathBuf::from(path));
        }

        let canonical = std::fs::canonicalize(path).map_err(|_| Error::PathAccessDenied {
            path: path.to_string(),
        })?;

        if self.allows(&canonical) {
            return Ok(canonical);
        }

        Err(Error::PathAccessDenied {
            path: path.to_string(),
        })
    }

    fn allows(&self, canonical: &Path) -> bool {
        self.allowed_dirs.iter().any(|dir| {
            std::fs::canonicalize(dir)
                .map(|canonical_dir| canonical.starts_with(&canonical_dir))
                .unwrap_or(false)
        })
    }
}

/// Parse an `ALLOWED_DIR` value: a JSON array of directories when it
/// contains `[`, otherwise a single directory. Unset or blank yields an
/// empty list.
pub fn parse_allowed_dirs(value: Option<&str>) -> Result<Vec<PathBuf>> {
    let value = match value.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(Vec::new()),
    };

    if value.contains('[') {
        let dirs: Vec<String> =
            serde_json::from_str(value).map_err(|e| Error::InvalidConfig {
                reason: format!("{} is not a JSON list of paths: {}", ALLOWED_DIR_ENV, e),
            })?;
        Ok(dirs.into_iter().map(PathBuf::from).collect())
    } else {
        Ok(vec![PathBuf::from(value)])
    }
}
