//! prdups: spot redundant package update PRs.
//!
//! Reads dumps of open nixpkgs pull requests, recognises version bump and
//! new package titles, groups competing PRs by package and checks each
//! proposal against the version already present in a local nixpkgs
//! checkout. Contested packages and PRs that are already satisfied are
//! reported; everything else is left alone.

pub mod aggregate;
pub mod cli;
pub mod input;
pub mod query;
pub mod resolver;
pub mod title;
pub mod types;
pub mod version;

pub use cli::parse_args;
pub use query::{analyze_pull_requests, build_report};
pub use resolver::{NixResolver, QueryError, VersionResolver};
pub use title::{classify, normalize};
pub use types::{
    ChangeKind, Classification, ClassifiedPullRequest, Config, DisplayMode, LocalVersion,
    PackageGroup, PackageUpdate, PullRequest, Report, ReportEntry, ReportGroup, ResolverConfig,
    RunStats,
};
pub use version::{is_satisfied, parse_lenient};
