//! Grouping of classified PRs by package and the decision of what to report.

use std::collections::HashMap;

use futures::{StreamExt, stream};
use tracing::debug;

use crate::{
    resolver::VersionResolver,
    title::{classify, normalize},
    types::{
        ClassifiedPullRequest, LocalVersion, PackageGroup, PullRequest, ReportEntry, ReportGroup,
        RunStats,
    },
    version::is_satisfied,
};

/// Filters and buckets PRs by the package their title names.
///
/// Titles are normalized in place. PRs not targeting `base_label` and PRs
/// whose title is not a package change are dropped. Groups appear in the
/// order their package was first seen and keep their members in input
/// order.
pub fn group_pull_requests(
    prs: Vec<PullRequest>,
    base_label: &str,
    stats: &mut RunStats,
) -> Vec<PackageGroup> {
    let mut groups: Vec<PackageGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    stats.loaded += prs.len();

    for mut pr in prs {
        pr.title = normalize(&pr.title);

        // Backports and other side branches are not our concern.
        if !pr.targets(base_label) {
            debug!(id = pr.id, base = %pr.base_label, "Skipping PR on other branch");
            stats.off_branch += 1;
            continue;
        }

        let Some(package) = classify(&pr.title).into_package_update() else {
            debug!(id = pr.id, title = %pr.title, "Skipping non package-change PR");
            stats.unclassified += 1;
            continue;
        };

        let slot = *index.entry(package.name.clone()).or_insert_with(|| {
            groups.push(PackageGroup {
                package: package.name.clone(),
                members: Vec::new(),
            });
            groups.len() - 1
        });

        groups[slot]
            .members
            .push(ClassifiedPullRequest { pr, package });
        stats.grouped += 1;
    }

    stats.packages = groups.len();
    groups
}

/// Resolves the local version of every group's package, at most `jobs` at
/// a time.
///
/// Exactly one lookup is made per group. Completion order does not matter:
/// results are keyed by package name.
pub async fn resolve_local_versions<R>(
    groups: &[PackageGroup],
    resolver: &R,
    jobs: usize,
) -> HashMap<String, LocalVersion>
where
    R: VersionResolver + Sync,
{
    stream::iter(groups.iter().map(|group| group.package.as_str()))
        .map(|package| async move {
            let version = resolver.resolve_local_version(package).await;
            (package.to_string(), version)
        })
        .buffer_unordered(jobs.max(1))
        .collect()
        .await
}

/// Picks the PRs worth showing.
///
/// Every member of a contested group is shown. A lone PR is shown only
/// when the reference tree already satisfies it. Groups left with nothing
/// to show are dropped.
pub fn select_reportable(
    groups: Vec<PackageGroup>,
    local_versions: &HashMap<String, LocalVersion>,
) -> Vec<ReportGroup> {
    let mut report = Vec::new();

    for group in groups {
        let contested = group.is_contested();
        let local_version = local_versions
            .get(&group.package)
            .cloned()
            .unwrap_or(LocalVersion::Unknown);

        let entries: Vec<ReportEntry> = group
            .members
            .into_iter()
            .map(|item| {
                let satisfied = is_satisfied(&local_version, &item.package.to_version);
                ReportEntry {
                    item,
                    local_version: local_version.clone(),
                    satisfied,
                }
            })
            .filter(|entry| contested || entry.satisfied)
            .collect();

        if !entries.is_empty() {
            report.push(ReportGroup {
                package: group.package,
                entries,
            });
        }
    }

    report
}
