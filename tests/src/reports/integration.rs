use std::collections::BTreeSet;

use gvmkit_common::GmpError;
use gvmkit_common::entities::{EntityId, FindingKey, Port, ScanState, Severity};
use gvmkit_core::SeverityChange;

use crate::fake::{CONFIG, FakeGvmd, FakeResult, PORT_LIST, entity};

const OLDER: &[FakeResult] = &[
    ("10.0.0.5", "443/tcp", "CVE-2021-1000", "7.5"),
    ("10.0.0.5", "22/tcp", "CVE-2020-0001", "4.0"),
];

const NEWER: &[FakeResult] = &[
    ("10.0.0.5", "80/tcp", "CVE-2022-2000", "5.0"),
    ("10.0.0.5", "443/tcp", "CVE-2021-1000", "9.0"),
];

fn key(port: u16, vulnerability: &str) -> FindingKey {
    FindingKey {
        host: "10.0.0.5".into(),
        port: Port::tcp(port),
        vulnerability_id: vulnerability.into(),
    }
}

fn severity(score: f64) -> Severity {
    Severity::new(score).unwrap()
}

/// A manager with one finished task and no reports yet.
fn manager() -> (FakeGvmd, EntityId) {
    let gvmd = FakeGvmd::new();
    let target = gvmd.add_target("10.0.0.5", PORT_LIST);
    let task = gvmd.add_task(&target, CONFIG, "Done");
    (gvmd, task)
}

#[tokio::test]
async fn delta_between_two_scans() -> anyhow::Result<()> {
    let (gvmd, task) = manager();
    let older = gvmd.add_report(&task, "r-old", "2026-03-01T10:00:00Z", "Done", OLDER);
    let newer = gvmd.add_report(&task, "r-new", "2026-03-08T10:00:00Z", "Done", NEWER);
    let (_, reports) = gvmd.services();

    let delta = reports.delta_reports(&older, &newer).await?;

    assert_eq!(delta.older, older);
    assert_eq!(delta.newer, newer);
    assert_eq!(delta.delta.added, BTreeSet::from([key(80, "CVE-2022-2000")]));
    assert_eq!(delta.delta.removed, BTreeSet::from([key(22, "CVE-2020-0001")]));
    assert_eq!(
        delta.delta.changed,
        [SeverityChange {
            key: key(443, "CVE-2021-1000"),
            before: severity(7.5),
            after: severity(9.0),
        }]
    );
    assert_eq!(delta.delta.unchanged, 0);
    Ok(())
}

#[tokio::test]
async fn delta_latest_compares_the_two_newest_completed_reports() -> anyhow::Result<()> {
    let (gvmd, task) = manager();
    gvmd.add_report(&task, "r-1", "2026-02-01T10:00:00Z", "Done", &[]);
    gvmd.add_report(&task, "r-2", "2026-03-01T10:00:00Z", "Done", OLDER);
    gvmd.add_report(&task, "r-3", "2026-03-08T10:00:00Z", "Interrupted", NEWER);
    gvmd.add_report(&task, "r-4", "2026-03-09T10:00:00Z", "Running", &[]);
    let (_, reports) = gvmd.services();

    let delta = reports.delta_latest(&task).await?;

    assert_eq!(delta.older, entity("r-2"));
    assert_eq!(delta.newer, entity("r-3"));
    assert_eq!(delta.delta.added.len(), 1);
    assert_eq!(delta.delta.removed.len(), 1);
    assert_eq!(delta.delta.changed.len(), 1);
    Ok(())
}

#[tokio::test]
async fn delta_latest_needs_two_completed_reports() {
    let (gvmd, task) = manager();
    gvmd.add_report(&task, "r-1", "2026-03-01T10:00:00Z", "Done", OLDER);
    gvmd.add_report(&task, "r-2", "2026-03-08T10:00:00Z", "Running", &[]);
    let (_, reports) = gvmd.services();

    assert!(matches!(
        reports.delta_latest(&task).await,
        Err(GmpError::NotFound(_))
    ));
}

#[tokio::test]
async fn report_compared_with_itself_is_unchanged() -> anyhow::Result<()> {
    let (gvmd, task) = manager();
    let report = gvmd.add_report(&task, "r-1", "2026-03-01T10:00:00Z", "Done", NEWER);
    let (_, reports) = gvmd.services();

    let delta = reports.delta_reports(&report, &report).await?;

    assert!(delta.delta.is_empty());
    assert_eq!(delta.delta.unchanged, NEWER.len());
    Ok(())
}

#[tokio::test]
async fn swapping_reports_swaps_added_and_removed() -> anyhow::Result<()> {
    let (gvmd, task) = manager();
    let older = gvmd.add_report(&task, "r-old", "2026-03-01T10:00:00Z", "Done", OLDER);
    let newer = gvmd.add_report(&task, "r-new", "2026-03-08T10:00:00Z", "Done", NEWER);
    let (_, reports) = gvmd.services();

    let forward = reports.delta_reports(&older, &newer).await?;
    let backward = reports.delta_reports(&newer, &older).await?;

    assert_eq!(forward.delta.added, backward.delta.removed);
    assert_eq!(forward.delta.removed, backward.delta.added);
    assert_eq!(backward.delta.changed[0].before, severity(9.0));
    Ok(())
}

#[tokio::test]
async fn latest_report_without_completed_runs_is_not_found() {
    let (gvmd, task) = manager();
    let (_, reports) = gvmd.services();

    assert!(matches!(
        reports.fetch_latest_report(&task).await,
        Err(GmpError::NotFound(_))
    ));

    gvmd.add_report(&task, "r-1", "2026-03-01T10:00:00Z", "Running", &[]);
    gvmd.add_report(&task, "r-2", "2026-03-02T10:00:00Z", "Requested", &[]);
    assert!(matches!(
        reports.fetch_latest_report(&task).await,
        Err(GmpError::NotFound(_))
    ));
}

#[tokio::test]
async fn latest_report_is_the_newest_completed_one() -> anyhow::Result<()> {
    let (gvmd, task) = manager();
    gvmd.add_report(&task, "r-1", "2026-03-01T10:00:00Z", "Done", OLDER);
    gvmd.add_report(&task, "r-2", "2026-03-08T10:00:00Z", "Stopped", NEWER);
    gvmd.add_report(&task, "r-3", "2026-03-09T10:00:00Z", "Running", &[]);
    let (_, reports) = gvmd.services();

    let report = reports.fetch_latest_report(&task).await?;

    assert_eq!(report.id, entity("r-2"));
    assert_eq!(report.task_id, task);
    assert_eq!(report.scan_state, ScanState::Stopped);
    assert_eq!(report.findings.len(), NEWER.len());
    Ok(())
}

#[tokio::test]
async fn reports_of_other_tasks_are_ignored() -> anyhow::Result<()> {
    let (gvmd, task) = manager();
    let target = gvmd.add_target("10.0.0.9", PORT_LIST);
    let other = gvmd.add_task(&target, CONFIG, "Done");
    gvmd.add_report(&task, "r-mine", "2026-03-01T10:00:00Z", "Done", OLDER);
    gvmd.add_report(&other, "r-theirs", "2026-03-09T10:00:00Z", "Done", NEWER);
    let (_, reports) = gvmd.services();

    assert_eq!(reports.fetch_latest_report(&task).await?.id, entity("r-mine"));
    Ok(())
}

#[tokio::test]
async fn fetched_findings_are_ordered_and_unique() -> anyhow::Result<()> {
    let (gvmd, task) = manager();
    let report = gvmd.add_report(
        &task,
        "r-1",
        "2026-03-01T10:00:00Z",
        "Done",
        &[
            ("10.0.0.7", "80/tcp", "oid-b", "5.0"),
            ("10.0.0.5", "443/tcp", "oid-a", "4.0"),
            ("10.0.0.5", "general/tcp", "oid-c", "0.0"),
            ("10.0.0.5", "443/tcp", "oid-a", "6.5"),
        ],
    );
    let (_, reports) = gvmd.services();

    let findings = reports.fetch_report(&report).await?.findings;

    let order: Vec<String> = findings.iter().map(|f| f.key().to_string()).collect();
    let expected: Vec<String> = [
        ("10.0.0.5", Port::general("tcp"), "oid-c"),
        ("10.0.0.5", Port::tcp(443), "oid-a"),
        ("10.0.0.7", Port::tcp(80), "oid-b"),
    ]
    .into_iter()
    .map(|(host, port, vulnerability)| {
        FindingKey {
            host: host.into(),
            port,
            vulnerability_id: vulnerability.into(),
        }
        .to_string()
    })
    .collect();
    assert_eq!(order, expected);
    assert_eq!(findings[1].severity, severity(6.5));
    Ok(())
}

#[tokio::test]
async fn missing_report_is_a_remote_rejection() {
    let (gvmd, _) = manager();
    let (_, reports) = gvmd.services();

    assert!(matches!(
        reports.fetch_report(&entity("r-404")).await,
        Err(GmpError::Remote { status: 404, .. })
    ));
}
