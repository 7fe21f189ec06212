use std::{
    collections::HashMap,
    path::Path,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use prdups::{
    ChangeKind, Config, DisplayMode, LocalVersion, PullRequest, Report, VersionResolver,
    analyze_pull_requests, build_report, parse_args,
};
use tempfile::TempDir;

const BASE: &str = "NixOS:master";

/// Mock resolver answering from a fixed table.
pub struct MockResolver {
    versions: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockResolver {
    pub fn new(versions: &[(&str, &str)]) -> Self {
        Self {
            versions: versions
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VersionResolver for MockResolver {
    async fn resolve_local_version(&self, package: &str) -> LocalVersion {
        self.calls.lock().unwrap().push(package.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.versions.get(package) {
            Some(version) => LocalVersion::Known(version.clone()),
            None => LocalVersion::Unknown,
        }
    }
}

fn pr(id: u64, title: &str) -> PullRequest {
    pr_on(id, title, BASE)
}

fn pr_on(id: u64, title: &str, base: &str) -> PullRequest {
    PullRequest::new(
        id,
        title,
        format!("https://github.com/NixOS/nixpkgs/pull/{id}"),
        base,
    )
}

fn write_dump(dir: &Path, name: &str, prs: &[PullRequest]) {
    let records: Vec<serde_json::Value> = prs
        .iter()
        .map(|pr| {
            serde_json::json!({
                "id": pr.id,
                "title": pr.title,
                "html_url": pr.url,
                "base": { "label": pr.base_label, "ref": "master" },
                "user": { "login": "r-ryantm" },
            })
        })
        .collect();
    std::fs::write(dir.join(name), serde_json::to_vec(&records).unwrap()).unwrap();
}

/// Creates a fake nixpkgs checkout and an input directory.
fn workspace() -> (TempDir, TempDir) {
    (tempfile::tempdir().unwrap(), tempfile::tempdir().unwrap())
}

fn config_for(nixpkgs: &TempDir, input: &TempDir, extra: &[&str]) -> (Config, DisplayMode) {
    let mut args = vec![
        "prdups".to_string(),
        "--nixpkgs".to_string(),
        nixpkgs.path().display().to_string(),
        "--input".to_string(),
        input.path().display().to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    parse_args(args).unwrap()
}

fn reported_ids(report: &Report) -> Vec<(String, Vec<u64>)> {
    report
        .groups
        .iter()
        .map(|g| {
            (
                g.package.clone(),
                g.entries.iter().map(|e| e.item.pr.id).collect(),
            )
        })
        .collect()
}

#[test]
fn test_cli_defaults() {
    let (nixpkgs, input) = workspace();
    let (config, mode) = config_for(&nixpkgs, &input, &[]);

    assert_eq!(mode, DisplayMode::Normal);
    assert_eq!(config.base_label, BASE);
    assert_eq!(config.jobs, 4);
    assert_eq!(config.resolver.program, "nix");
    assert_eq!(config.resolver.timeout, Duration::from_secs(30));
    assert_eq!(config.resolver.nixpkgs_path, nixpkgs.path());
}

#[test]
fn test_cli_overrides() {
    let (nixpkgs, input) = workspace();
    let (config, mode) = config_for(
        &nixpkgs,
        &input,
        &[
            "-q",
            "--base-label",
            "NixOS:staging",
            "-j",
            "8",
            "--timeout",
            "2m",
            "--nix",
            "/run/current-system/sw/bin/nix",
        ],
    );

    assert_eq!(mode, DisplayMode::Quiet);
    assert_eq!(config.base_label, "NixOS:staging");
    assert_eq!(config.jobs, 8);
    assert_eq!(config.resolver.timeout, Duration::from_secs(120));
    assert_eq!(config.resolver.program, "/run/current-system/sw/bin/nix");
}

#[test]
fn test_cli_missing_nixpkgs_path_is_fatal() {
    let (nixpkgs, input) = workspace();
    let missing = nixpkgs.path().join("nope");

    let err = parse_args([
        "prdups",
        "--nixpkgs",
        missing.to_str().unwrap(),
        "--input",
        input.path().to_str().unwrap(),
    ])
    .unwrap_err();

    assert!(
        err.to_string()
            .contains("The specified nixpkgs path does not exist")
    );
}

#[test]
fn test_cli_rejects_zero_jobs_and_bad_timeout() {
    let (nixpkgs, input) = workspace();
    let base = [
        "prdups",
        "--nixpkgs",
        nixpkgs.path().to_str().unwrap(),
        "--input",
        input.path().to_str().unwrap(),
    ];

    let mut zero_jobs = base.to_vec();
    zero_jobs.extend(["--jobs", "0"]);
    assert!(parse_args(zero_jobs).is_err());

    let mut bad_timeout = base.to_vec();
    bad_timeout.extend(["--timeout", "whenever"]);
    assert!(parse_args(bad_timeout).is_err());

    let mut zero_timeout = base.to_vec();
    zero_timeout.extend(["--timeout", "0"]);
    assert!(parse_args(zero_timeout).is_err());
}

#[test]
fn test_cli_help_is_clap_error() {
    let err = parse_args(["prdups", "--help"]).unwrap_err();
    let clap_err = err.downcast_ref::<clap::Error>().unwrap();
    assert_eq!(clap_err.kind(), clap::error::ErrorKind::DisplayHelp);
}

#[tokio::test]
async fn test_end_to_end_report() {
    let (nixpkgs, input) = workspace();
    write_dump(
        input.path(),
        "1.json",
        &[
            pr(1, "hello: 2.12 -> 2.12.1"),
            pr(2, "[WIP] curl: 8.5.0 -> 8.6.0"),
            pr(3, "Fix typo in README"),
            pr_on(4, "curl: 8.5.0 -> 8.6.0", "NixOS:release-24.05"),
        ],
    );
    write_dump(
        input.path(),
        "2.json",
        &[pr(5, "curl: 8.5.0 -> 8.7.1"), pr(6, "ripgrep: 14.0 -> 14.1")],
    );
    std::fs::write(input.path().join(".gitkeep"), "").unwrap();

    let (config, _) = config_for(&nixpkgs, &input, &[]);
    let resolver = MockResolver::new(&[
        ("hello", "2.12.1"),
        ("curl", "8.5.0"),
        ("ripgrep", "13.0.0"),
    ]);

    let report = build_report(&config, &resolver).await.unwrap();

    assert_eq!(
        reported_ids(&report),
        vec![
            ("hello".to_string(), vec![1]),
            ("curl".to_string(), vec![2, 5]),
        ]
    );

    let curl = &report.groups[1];
    assert!(curl.entries.iter().all(|e| !e.satisfied));
    assert_eq!(
        curl.entries[0].local_version,
        LocalVersion::Known("8.5.0".to_string())
    );
    assert_eq!(curl.entries[0].item.pr.title, "curl: 8.5.0 -> 8.6.0");

    assert_eq!(report.stats.loaded, 6);
    assert_eq!(report.stats.off_branch, 1);
    assert_eq!(report.stats.unclassified, 1);
    assert_eq!(report.stats.packages, 3);
}

#[tokio::test]
async fn test_end_to_end_malformed_json_is_fatal() {
    let (nixpkgs, input) = workspace();
    write_dump(input.path(), "1.json", &[pr(1, "hello: 1 -> 2")]);
    std::fs::write(input.path().join("2.json"), "{ not json").unwrap();

    let (config, _) = config_for(&nixpkgs, &input, &[]);
    let resolver = MockResolver::new(&[]);

    assert!(build_report(&config, &resolver).await.is_err());
    assert!(resolver.calls().is_empty());
}

#[tokio::test]
async fn test_update_and_init_classification() {
    let resolver = MockResolver::new(&[("pkg", "1.3.0"), ("fresh", "2.0.0")]);
    let report = analyze_pull_requests(
        vec![pr(1, "pkg: 1.2.3 -> 1.3.0"), pr(2, "fresh: init at 2.0.0")],
        BASE,
        2,
        &resolver,
    )
    .await;

    let pkg = &report.groups[0].entries[0].item.package;
    assert_eq!(pkg.name, "pkg");
    assert_eq!(pkg.from_version, "1.2.3");
    assert_eq!(pkg.to_version, "1.3.0");
    assert_eq!(pkg.kind(), ChangeKind::Update);

    let fresh = &report.groups[1].entries[0].item.package;
    assert_eq!(fresh.name, "fresh");
    assert_eq!(fresh.from_version, "");
    assert_eq!(fresh.to_version, "2.0.0");
    assert_eq!(fresh.kind(), ChangeKind::Init);
}

#[tokio::test]
async fn test_duplicates_always_reported() {
    let resolver = MockResolver::new(&[]);
    let report = analyze_pull_requests(
        vec![pr(1, "dup: 1.0 -> 1.1"), pr(2, "dup: init at 1.1")],
        BASE,
        1,
        &resolver,
    )
    .await;

    assert_eq!(reported_ids(&report), vec![("dup".to_string(), vec![1, 2])]);
    for entry in &report.groups[0].entries {
        assert_eq!(entry.local_version, LocalVersion::Unknown);
        assert!(!entry.satisfied);
        assert_eq!(entry.local_version.to_string(), "UNKN");
    }
}

#[tokio::test]
async fn test_singleton_satisfied_boundary() {
    let satisfied = MockResolver::new(&[("solo", "1.0.0")]);
    let report = analyze_pull_requests(vec![pr(1, "solo: 0.9.0 -> 1.0.0")], BASE, 1, &satisfied).await;
    assert_eq!(reported_ids(&report), vec![("solo".to_string(), vec![1])]);
    assert!(report.groups[0].entries[0].satisfied);

    let behind = MockResolver::new(&[("solo", "0.9.0")]);
    let report = analyze_pull_requests(vec![pr(1, "solo: 0.9.0 -> 1.0.0")], BASE, 1, &behind).await;
    assert!(report.groups.is_empty());
}

#[tokio::test]
async fn test_unknown_local_version_never_satisfied() {
    let resolver = MockResolver::new(&[("weird", "unstable-2024-01-01")]);
    let report = analyze_pull_requests(
        vec![pr(1, "missing: 1 -> 0.0.1"), pr(2, "weird: 1 -> 0.0.1")],
        BASE,
        2,
        &resolver,
    )
    .await;

    assert!(report.groups.is_empty());
    assert_eq!(report.stats.packages, 2);
}

#[tokio::test]
async fn test_other_branches_never_reported() {
    let resolver = MockResolver::new(&[("a", "9.9.9")]);
    let report = analyze_pull_requests(
        vec![
            pr_on(1, "a: 1.0 -> 2.0", "NixOS:staging"),
            pr_on(2, "a: 1.0 -> 2.0", "someone:master"),
        ],
        BASE,
        2,
        &resolver,
    )
    .await;

    assert!(report.groups.is_empty());
    assert!(resolver.calls().is_empty());
}

#[tokio::test]
async fn test_one_lookup_per_package_and_bounded_concurrency() {
    let prs: Vec<PullRequest> = (0..24)
        .map(|i| pr(i, &format!("pkg{}: 1.0 -> 1.{}", i % 8, i)))
        .collect();
    let resolver = MockResolver::new(&[]);

    let report = analyze_pull_requests(prs, BASE, 3, &resolver).await;

    let mut calls = resolver.calls();
    calls.sort();
    calls.dedup();
    assert_eq!(calls.len(), 8);
    assert_eq!(resolver.calls().len(), 8);
    assert!(resolver.max_in_flight.load(Ordering::SeqCst) <= 3);

    // Every package has three competing PRs, reported in discovery order.
    let names: Vec<String> = report.groups.iter().map(|g| g.package.clone()).collect();
    let expected: Vec<String> = (0..8).map(|i| format!("pkg{i}")).collect();
    assert_eq!(names, expected);
    assert_eq!(
        reported_ids(&report)[0],
        ("pkg0".to_string(), vec![0, 8, 16])
    );
}

#[tokio::test]
async fn test_discovery_order_across_files() {
    let (nixpkgs, input) = workspace();
    write_dump(input.path(), "a.json", &[pr(10, "x: 1 -> 2"), pr(11, "y: 1 -> 2")]);
    write_dump(input.path(), "b.json", &[pr(12, "y: 1 -> 3"), pr(13, "x: 1 -> 3")]);

    let (config, _) = config_for(&nixpkgs, &input, &[]);
    let resolver = MockResolver::new(&[]);
    let report = build_report(&config, &resolver).await.unwrap();

    assert_eq!(
        reported_ids(&report),
        vec![
            ("x".to_string(), vec![10, 13]),
            ("y".to_string(), vec![11, 12]),
        ]
    );
}
