use std::time::Duration;

use gvmkit_common::GmpError;
use gvmkit_common::entities::{PortSelection, ScanState, TargetRequest};
use gvmkit_core::{PollPolicy, StatusWatcher, WatchEnd};

use crate::fake::{CONFIG, FakeGvmd, PORT_LIST, entity, hosts};

#[tokio::test]
async fn ensure_target_twice_yields_the_same_target() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    let (orchestrator, _) = gvmd.services();
    let wanted = hosts("10.0.0.5, 10.0.0.6");

    let first = orchestrator.ensure_target(&wanted, &entity(PORT_LIST)).await?;
    let second = orchestrator.ensure_target(&wanted, &entity(PORT_LIST)).await?;

    assert_eq!(first.id, second.id);
    assert_eq!(gvmd.target_count(), 1);
    assert_eq!(gvmd.count("create_target"), 1);
    Ok(())
}

#[tokio::test]
async fn host_order_does_not_create_a_second_target() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    let (orchestrator, _) = gvmd.services();

    let first = orchestrator
        .ensure_target(&hosts("10.0.0.6,10.0.0.5"), &entity(PORT_LIST))
        .await?;
    let second = orchestrator
        .ensure_target(&hosts("10.0.0.5, 10.0.0.6"), &entity(PORT_LIST))
        .await?;

    assert_eq!(first.id, second.id);
    assert_eq!(gvmd.target_count(), 1);
    Ok(())
}

#[tokio::test]
async fn existing_target_is_reused_without_creating() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    let seeded = gvmd.add_target("192.168.1.0/24", PORT_LIST);
    let (orchestrator, _) = gvmd.services();

    let target = orchestrator
        .ensure_target(&hosts("192.168.1.0/24"), &entity(PORT_LIST))
        .await?;

    assert_eq!(target.id, seeded);
    assert_eq!(gvmd.count("create_target"), 0);
    Ok(())
}

#[tokio::test]
async fn another_port_list_means_another_target() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    gvmd.add_target("10.0.0.5", "pl-udp");
    let (orchestrator, _) = gvmd.services();

    orchestrator.ensure_target(&hosts("10.0.0.5"), &entity(PORT_LIST)).await?;

    assert_eq!(gvmd.target_count(), 2);
    Ok(())
}

#[tokio::test]
async fn foreign_target_with_unmodelled_hosts_does_not_block_scans() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    gvmd.add_target("2001:db8::1-2001:db8::5", PORT_LIST);
    let mine = gvmd.add_target("10.0.0.5", PORT_LIST);
    let (orchestrator, _) = gvmd.services();

    let target = orchestrator.ensure_target(&hosts("10.0.0.5"), &entity(PORT_LIST)).await?;
    assert_eq!(target.id, mine);

    orchestrator
        .start_scan(&hosts("10.0.0.9"), &entity(PORT_LIST), &entity(CONFIG))
        .await?;
    assert_eq!(gvmd.target_count(), 3);
    Ok(())
}

#[tokio::test]
async fn inline_port_range_creates_a_named_target_once() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    let (orchestrator, _) = gvmd.services();
    let request = |ports: &str| {
        TargetRequest::new(hosts("10.0.0.5"), PortSelection::Range(ports.parse().unwrap()))
            .named("edge routers")
    };

    let task = orchestrator
        .start_scan_for(&request("T:1-3,U:7"), &entity(CONFIG))
        .await?;
    let target = orchestrator.get_task(&task).await?.target.id;
    assert_eq!(
        gvmd.target_details(&target),
        Some(("edge routers".to_string(), Some("T:1-3,U:7".to_string())))
    );

    // same ports spelled differently, same name: reused
    let again = orchestrator.ensure_target_for(&request("u:7, 1-3")).await?;
    assert_eq!(again.id, target);
    assert_eq!(gvmd.count("create_target"), 1);
    Ok(())
}

#[tokio::test]
async fn inline_port_range_without_a_name_gets_a_derived_one() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    let (orchestrator, _) = gvmd.services();
    let request = TargetRequest::new(hosts("10.0.0.5"), PortSelection::Range("22,443".parse()?));

    let created = orchestrator.ensure_target_for(&request).await?;

    assert_eq!(created.name, "gvmkit 10.0.0.5 [T:22,T:443]");
    assert_ne!(created.port_list.id, entity(PORT_LIST));
    assert_eq!(orchestrator.ensure_target_for(&request).await?.id, created.id);
    assert_eq!(gvmd.target_count(), 1);
    Ok(())
}

#[tokio::test]
async fn a_taken_name_with_other_hosts_is_rejected() {
    let gvmd = FakeGvmd::new();
    let (orchestrator, _) = gvmd.services();
    let named = |raw: &str| {
        TargetRequest::with_port_list(hosts(raw), entity(PORT_LIST)).named("lab")
    };
    orchestrator.ensure_target_for(&named("10.0.0.5")).await.unwrap();

    let err = orchestrator.ensure_target_for(&named("10.0.0.6")).await.unwrap_err();

    assert!(err.is_duplicate_name());
    assert_eq!(gvmd.target_count(), 1);
}

#[tokio::test]
async fn duplicate_name_rejection_resolves_to_the_concurrent_target() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    gvmd.race_creations();
    let (orchestrator, _) = gvmd.services();

    let target = orchestrator.ensure_target(&hosts("10.0.0.5"), &entity(PORT_LIST)).await?;

    // only the other client's create went through
    assert_eq!(gvmd.target_count(), 1);
    assert_eq!(gvmd.count("get_targets"), 2);
    let again = orchestrator.ensure_target(&hosts("10.0.0.5"), &entity(PORT_LIST)).await?;
    assert_eq!(target.id, again.id);
    Ok(())
}

#[tokio::test]
async fn start_scan_survives_racing_creations() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    gvmd.race_creations();
    let (orchestrator, _) = gvmd.services();

    let task = orchestrator
        .start_scan(&hosts("10.0.0.5"), &entity(PORT_LIST), &entity(CONFIG))
        .await?;

    assert_eq!(gvmd.target_count(), 1);
    assert_eq!(gvmd.task_count(), 1);
    assert_eq!(gvmd.status_of(&task).as_deref(), Some("Requested"));
    Ok(())
}

#[tokio::test]
async fn concurrent_start_scans_share_one_target_and_task() {
    let gvmd = FakeGvmd::new();
    let (orchestrator, _) = gvmd.services();
    let wanted = hosts("10.0.0.0/30");
    let (port_list, config) = (entity(PORT_LIST), entity(CONFIG));

    let (a, b) = tokio::join!(
        orchestrator.start_scan(&wanted, &port_list, &config),
        orchestrator.start_scan(&wanted, &port_list, &config),
    );

    assert_eq!(gvmd.target_count(), 1);
    assert_eq!(gvmd.task_count(), 1);
    let started: Vec<_> = [a, b].into_iter().filter_map(Result::ok).collect();
    assert!(!started.is_empty());
    assert!(started.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn start_scan_creates_target_and_task_then_requests() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    let (orchestrator, _) = gvmd.services();

    let task_id = orchestrator
        .start_scan(&hosts("10.0.0.5"), &entity(PORT_LIST), &entity(CONFIG))
        .await?;

    assert_eq!(
        gvmd.commands(),
        ["get_targets", "create_target", "get_tasks", "create_task", "start_task"]
    );
    let task = orchestrator.get_task(&task_id).await?;
    assert_eq!(task.config.id, entity(CONFIG));
    assert_eq!(orchestrator.poll_status(&task_id).await?.state, ScanState::Requested);
    Ok(())
}

#[tokio::test]
async fn start_scan_refuses_a_task_that_is_already_running() {
    let gvmd = FakeGvmd::new();
    let target = gvmd.add_target("10.0.0.5", PORT_LIST);
    let task = gvmd.add_task(&target, CONFIG, "Running");
    gvmd.set_status(&task, "Running", 20);
    let (orchestrator, _) = gvmd.services();

    let err = orchestrator
        .start_scan(&hosts("10.0.0.5"), &entity(PORT_LIST), &entity(CONFIG))
        .await
        .unwrap_err();

    assert!(matches!(err, GmpError::InvalidState { operation: "start", .. }));
    assert_eq!(gvmd.count("start_task"), 0);
}

#[tokio::test]
async fn rescan_is_refused_while_the_task_is_active() {
    for status in ["Requested", "Queued", "Running"] {
        let gvmd = FakeGvmd::new();
        let target = gvmd.add_target("10.0.0.5", PORT_LIST);
        let task = gvmd.add_task(&target, CONFIG, status);
        let (orchestrator, _) = gvmd.services();

        let err = orchestrator.rescan(&task).await.unwrap_err();

        assert!(
            matches!(err, GmpError::InvalidState { operation: "rescan", .. }),
            "{status}: {err:?}"
        );
        assert_eq!(gvmd.count("start_task"), 0);
    }
}

#[tokio::test]
async fn rescan_restarts_any_finished_task() {
    for status in ["Done", "Stopped", "Interrupted", "Internal Error"] {
        let gvmd = FakeGvmd::new();
        let target = gvmd.add_target("10.0.0.5", PORT_LIST);
        let task = gvmd.add_task(&target, CONFIG, status);
        let (orchestrator, _) = gvmd.services();

        let restarted = orchestrator.rescan(&task).await.unwrap();

        assert_eq!(restarted.state, ScanState::Requested, "{status}");
        assert_eq!(gvmd.status_of(&task).as_deref(), Some("Requested"));
    }
}

#[tokio::test]
async fn rescan_by_target_restarts_its_task() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    let target = gvmd.add_target("10.0.0.5", PORT_LIST);
    let other = gvmd.add_target("10.0.0.6", PORT_LIST);
    gvmd.add_task(&other, CONFIG, "Done");
    let task = gvmd.add_task(&target, CONFIG, "Done");
    let (orchestrator, _) = gvmd.services();

    let status = orchestrator.rescan_target(&target).await?;

    assert_eq!(status.task_id, task);
    assert_eq!(status.state, ScanState::Requested);
    assert_eq!(gvmd.status_of(&task).as_deref(), Some("Requested"));
    Ok(())
}

#[tokio::test]
async fn rescan_by_target_needs_a_task() {
    let gvmd = FakeGvmd::new();
    let target = gvmd.add_target("10.0.0.5", PORT_LIST);
    let (orchestrator, _) = gvmd.services();

    assert!(matches!(
        orchestrator.rescan_target(&target).await,
        Err(GmpError::NotFound(_))
    ));
    assert_eq!(gvmd.count("start_task"), 0);
}

#[tokio::test]
async fn rescan_of_a_task_that_never_ran_is_refused() {
    let gvmd = FakeGvmd::new();
    let target = gvmd.add_target("10.0.0.5", PORT_LIST);
    let task = gvmd.add_task(&target, CONFIG, "New");
    let (orchestrator, _) = gvmd.services();

    assert!(matches!(
        orchestrator.rescan(&task).await,
        Err(GmpError::InvalidState { .. })
    ));
    assert!(orchestrator.start_task(&task).await.is_ok());
}

#[tokio::test]
async fn requested_survives_a_lagging_remote_status() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    let (orchestrator, _) = gvmd.services();
    let task = orchestrator
        .start_scan(&hosts("10.0.0.5"), &entity(PORT_LIST), &entity(CONFIG))
        .await?;

    gvmd.set_status(&task, "New", -1);
    assert_eq!(orchestrator.poll_status(&task).await?.state, ScanState::Requested);

    gvmd.set_status(&task, "Running", 5);
    assert_eq!(
        orchestrator.poll_status(&task).await?.state,
        ScanState::Running { progress: Some(5) }
    );
    Ok(())
}

#[tokio::test]
async fn progress_never_goes_backwards() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    let target = gvmd.add_target("10.0.0.5", PORT_LIST);
    let task = gvmd.add_task(&target, CONFIG, "Running");
    let (orchestrator, _) = gvmd.services();

    gvmd.set_status(&task, "Running", 60);
    orchestrator.poll_status(&task).await?;
    gvmd.set_status(&task, "Running", 40);

    assert_eq!(
        orchestrator.poll_status(&task).await?.state,
        ScanState::Running { progress: Some(60) }
    );
    Ok(())
}

#[tokio::test]
async fn stop_is_reported_until_the_manager_settles() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    let target = gvmd.add_target("10.0.0.5", PORT_LIST);
    let task = gvmd.add_task(&target, CONFIG, "Running");
    gvmd.set_status(&task, "Running", 30);
    let (orchestrator, _) = gvmd.services();

    assert_eq!(orchestrator.stop_scan(&task).await?.state, ScanState::Stopped);
    assert_eq!(gvmd.status_of(&task).as_deref(), Some("Stop Requested"));
    assert_eq!(orchestrator.poll_status(&task).await?.state, ScanState::Stopped);

    gvmd.set_status(&task, "Stopped", -1);
    assert_eq!(orchestrator.poll_status(&task).await?.state, ScanState::Stopped);
    assert_eq!(orchestrator.rescan(&task).await?.state, ScanState::Requested);
    Ok(())
}

#[tokio::test]
async fn stopping_an_idle_task_is_refused() {
    let gvmd = FakeGvmd::new();
    let target = gvmd.add_target("10.0.0.5", PORT_LIST);
    let task = gvmd.add_task(&target, CONFIG, "Done");
    let (orchestrator, _) = gvmd.services();

    assert!(matches!(
        orchestrator.stop_scan(&task).await,
        Err(GmpError::InvalidState { operation: "stop", .. })
    ));
    assert_eq!(gvmd.count("stop_task"), 0);
}

#[tokio::test]
async fn malformed_status_is_an_error_not_a_running_task() {
    let gvmd = FakeGvmd::new();
    let target = gvmd.add_target("10.0.0.5", PORT_LIST);
    let task = gvmd.add_task(&target, CONFIG, "Running");
    gvmd.set_status(&task, "Running", 40);
    let (orchestrator, _) = gvmd.services();
    orchestrator.poll_status(&task).await.unwrap();

    gvmd.set_status(&task, "Running", 250);
    assert!(matches!(
        orchestrator.poll_status(&task).await,
        Err(GmpError::Protocol(_))
    ));

    gvmd.set_status(&task, "Sleeping", 50);
    assert!(matches!(
        orchestrator.poll_status(&task).await,
        Err(GmpError::Protocol(_))
    ));

    gvmd.set_status(&task, "Done", -1);
    assert_eq!(orchestrator.poll_status(&task).await.unwrap().state, ScanState::Done);
}

#[tokio::test]
async fn unknown_task_is_a_remote_rejection() {
    let gvmd = FakeGvmd::new();
    let (orchestrator, _) = gvmd.services();

    let err = orchestrator.poll_status(&entity("task-404")).await.unwrap_err();

    assert!(matches!(err, GmpError::Remote { status: 404, .. }));
}

#[tokio::test]
async fn service_unavailable_is_transient_and_recoverable() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    let target = gvmd.add_target("10.0.0.5", PORT_LIST);
    let task = gvmd.add_task(&target, CONFIG, "Done");
    gvmd.reject_next("get_tasks", 503, "Service temporarily down");
    let (orchestrator, _) = gvmd.services();

    assert!(orchestrator.poll_status(&task).await.unwrap_err().is_transient());
    assert_eq!(orchestrator.poll_status(&task).await?.state, ScanState::Done);
    Ok(())
}

#[tokio::test]
async fn rejected_create_other_than_duplicate_is_propagated() {
    let gvmd = FakeGvmd::new();
    gvmd.reject_next("create_target", 400, "Invalid port list");
    let (orchestrator, _) = gvmd.services();

    let err = orchestrator
        .ensure_target(&hosts("10.0.0.5"), &entity(PORT_LIST))
        .await
        .unwrap_err();

    assert!(matches!(err, GmpError::Remote { status: 400, .. }));
    assert!(!err.is_duplicate_name());
    assert_eq!(gvmd.target_count(), 0);
}

#[tokio::test]
async fn watcher_follows_a_scan_to_completion() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    let (orchestrator, _) = gvmd.services();
    let task = orchestrator
        .start_scan(&hosts("10.0.0.5"), &entity(PORT_LIST), &entity(CONFIG))
        .await?;

    let policy = PollPolicy {
        interval: Duration::from_millis(1),
        max_attempts: Some(10),
        ..PollPolicy::default()
    };
    let scanner = gvmd.clone();
    let mut seen = Vec::new();
    let outcome = StatusWatcher::new(&orchestrator, policy)
        .watch(&task, |status| {
            seen.push(status.state);
            match status.state {
                ScanState::Requested => scanner.set_status(&task, "Running", 50),
                ScanState::Running { .. } => scanner.set_status(&task, "Done", -1),
                _ => {}
            }
        })
        .await?;

    assert_eq!(outcome.end, WatchEnd::Terminal);
    assert_eq!(outcome.status.state, ScanState::Done);
    assert_eq!(
        seen,
        [ScanState::Requested, ScanState::Running { progress: Some(50) }, ScanState::Done]
    );
    Ok(())
}

#[tokio::test]
async fn catalog_listings_reach_the_manager() -> anyhow::Result<()> {
    let gvmd = FakeGvmd::new();
    let (orchestrator, _) = gvmd.services();

    assert_eq!(orchestrator.get_version().await?, "22.4");
    let port_lists = orchestrator.list_port_lists().await?;
    assert_eq!(port_lists.len(), 1);
    assert_eq!(port_lists[0].id, entity(PORT_LIST));
    assert_eq!(port_lists[0].port_count.udp, 0);
    assert!(orchestrator.list_targets().await?.is_empty());
    Ok(())
}
