use std::{ffi::OsString, process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::types::{LocalVersion, ResolverConfig};

/// Looks up the version of a package in the reference tree.
///
/// Lookups are best effort: implementations report
/// [`LocalVersion::Unknown`] instead of failing.
#[async_trait]
pub trait VersionResolver {
    async fn resolve_local_version(&self, package: &str) -> LocalVersion;
}

/// Why a single version query produced nothing usable.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("exited with {status}: {stderr}")]
    Failed {
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("output is not valid UTF-8")]
    NotUtf8,

    #[error("empty output")]
    EmptyOutput,
}

/// Resolves versions by evaluating `nixpkgs.<package>.version` against a
/// nixpkgs checkout.
#[derive(Debug, Clone)]
pub struct NixResolver {
    config: ResolverConfig,
}

impl NixResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub(crate) fn command_args(&self, package: &str) -> Vec<OsString> {
        let mut include = OsString::from("nixpkgs=");
        include.push(&self.config.nixpkgs_path);

        vec![
            "eval".into(),
            "-I".into(),
            include,
            "--raw".into(),
            format!("nixpkgs.{package}.version").into(),
        ]
    }

    async fn query(&self, package: &str) -> Result<String, QueryError> {
        let mut command = Command::new(&self.config.program);
        command
            .args(self.command_args(package))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        // Dropping the output future on timeout kills the child.
        let output = tokio::time::timeout(self.config.timeout, command.output())
            .await
            .map_err(|_| QueryError::Timeout(self.config.timeout))?
            .map_err(|source| QueryError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(QueryError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|_| QueryError::NotUtf8)?;
        let version = stdout.trim();
        if version.is_empty() {
            return Err(QueryError::EmptyOutput);
        }

        Ok(version.to_string())
    }
}

#[async_trait]
impl VersionResolver for NixResolver {
    async fn resolve_local_version(&self, package: &str) -> LocalVersion {
        match self.query(package).await {
            Ok(version) => {
                debug!(package, version = %version, "Resolved local version");
                LocalVersion::Known(version)
            }
            Err(e) => {
                debug!(package, error = %e, "Local version lookup failed");
                LocalVersion::Unknown
            }
        }
    }
}
