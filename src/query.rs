use tracing::debug;

use crate::{
    aggregate::{group_pull_requests, resolve_local_versions, select_reportable},
    input::load_pull_requests,
    resolver::VersionResolver,
    types::{Config, PullRequest, Report, RunStats},
};

/// Loads the PR dumps named by the configuration and analyses them.
///
/// Fails only if the input cannot be read or parsed; lookup problems end
/// up as unknown local versions in the report.
pub async fn build_report<R>(config: &Config, resolver: &R) -> anyhow::Result<Report>
where
    R: VersionResolver + Sync,
{
    let prs = load_pull_requests(&config.input_dir)?;
    Ok(analyze_pull_requests(prs, &config.base_label, config.jobs, resolver).await)
}

/// Classifies, groups and checks an in-memory batch of PRs.
pub async fn analyze_pull_requests<R>(
    prs: Vec<PullRequest>,
    base_label: &str,
    jobs: usize,
    resolver: &R,
) -> Report
where
    R: VersionResolver + Sync,
{
    let mut stats = RunStats::default();
    let groups = group_pull_requests(prs, base_label, &mut stats);
    let local_versions = resolve_local_versions(&groups, resolver, jobs).await;
    let groups = select_reportable(groups, &local_versions);

    debug!(
        loaded = stats.loaded,
        off_branch = stats.off_branch,
        unclassified = stats.unclassified,
        grouped = stats.grouped,
        packages = stats.packages,
        reported = groups.len(),
        "Analysis complete"
    );

    Report { groups, stats }
}
