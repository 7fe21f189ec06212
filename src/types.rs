//! Domain types shared by the pipeline, the CLI and the report.

use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

/// Label of the branch that PRs must target to be considered.
pub const DEFAULT_BASE_LABEL: &str = "NixOS:master";

/// Directory scanned for PR dumps when none is given.
pub const DEFAULT_INPUT_DIR: &str = "outputs";

/// Sentinel printed when the local version could not be determined.
pub const UNKNOWN_VERSION: &str = "UNKN";

/// A pull request as dumped from the hosting API.
///
/// Only the handful of fields the analysis needs are kept; everything
/// else in the dump is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PullRequest {
    pub title: String,
    pub id: u64,
    #[serde(rename = "html_url")]
    pub url: String,
    #[serde(rename = "base", deserialize_with = "deserialize_base_label")]
    pub base_label: String,
}

#[derive(Deserialize)]
struct BaseRef {
    label: String,
}

fn deserialize_base_label<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    BaseRef::deserialize(deserializer).map(|base| base.label)
}

impl PullRequest {
    pub fn new(
        id: u64,
        title: impl Into<String>,
        url: impl Into<String>,
        base_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            id,
            url: url.into(),
            base_label: base_label.into(),
        }
    }

    pub fn targets(&self, base_label: &str) -> bool {
        self.base_label == base_label
    }
}

/// Whether a PR bumps an existing package or introduces a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Update,
    Init,
}

impl ChangeKind {
    /// Four-letter marker used in the report.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Update => "upda",
            ChangeKind::Init => "init",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured fields extracted from a package-change PR title.
///
/// `from_version` is empty exactly when the PR adds a new package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUpdate {
    pub name: String,
    pub from_version: String,
    pub to_version: String,
}

impl PackageUpdate {
    pub fn update(
        name: impl Into<String>,
        from_version: impl Into<String>,
        to_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_version: from_version.into(),
            to_version: to_version.into(),
        }
    }

    pub fn init(name: impl Into<String>, to_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            from_version: String::new(),
            to_version: to_version.into(),
        }
    }

    pub fn kind(&self) -> ChangeKind {
        if self.from_version.is_empty() {
            ChangeKind::Init
        } else {
            ChangeKind::Update
        }
    }
}

/// Outcome of matching a title against the update and init grammars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Update(PackageUpdate),
    Init(PackageUpdate),
    Unmatched,
}

impl Classification {
    pub fn into_package_update(self) -> Option<PackageUpdate> {
        match self {
            Classification::Update(info) | Classification::Init(info) => Some(info),
            Classification::Unmatched => None,
        }
    }
}

/// A PR whose title was recognised, together with what it proposes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedPullRequest {
    pub pr: PullRequest,
    pub package: PackageUpdate,
}

/// All classified PRs touching one package, in the order they were found.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageGroup {
    pub package: String,
    pub members: Vec<ClassifiedPullRequest>,
}

impl PackageGroup {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// More than one open PR competes for the same package.
    pub fn is_contested(&self) -> bool {
        self.members.len() > 1
    }
}

/// Version of a package in the reference tree, if it could be determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalVersion {
    Known(String),
    Unknown,
}

impl LocalVersion {
    pub fn as_known(&self) -> Option<&str> {
        match self {
            LocalVersion::Known(version) => Some(version),
            LocalVersion::Unknown => None,
        }
    }
}

impl std::fmt::Display for LocalVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocalVersion::Known(version) => f.write_str(version),
            LocalVersion::Unknown => f.write_str(UNKNOWN_VERSION),
        }
    }
}

/// One PR line in the report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub item: ClassifiedPullRequest,
    pub local_version: LocalVersion,
    pub satisfied: bool,
}

/// A package that has something worth telling the maintainer about.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportGroup {
    pub package: String,
    pub entries: Vec<ReportEntry>,
}

/// Counters describing what happened to the input records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub loaded: usize,
    pub off_branch: usize,
    pub unclassified: usize,
    pub grouped: usize,
    pub packages: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub groups: Vec<ReportGroup>,
    pub stats: RunStats,
}

/// How the report should be rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayMode {
    Normal,
    Quiet,
}

/// Settings for the local version lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    pub nixpkgs_path: PathBuf,
    pub program: String,
    pub timeout: Duration,
}

/// Everything a run needs, assembled from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub input_dir: PathBuf,
    pub base_label: String,
    pub jobs: usize,
    pub resolver: ResolverConfig,
}

impl Config {
    /// Checks the settings that cannot be verified by the argument parser.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.resolver.nixpkgs_path.exists() {
            anyhow::bail!(
                "The specified nixpkgs path does not exist '{}'",
                self.resolver.nixpkgs_path.display()
            );
        }

        if self.jobs == 0 {
            anyhow::bail!("--jobs must be at least 1");
        }

        Ok(())
    }
}
