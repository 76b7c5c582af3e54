use privy_pin::sync::{SyncConfig, SyncError, SyncPhase, ViewportSync, LOCAL_ID_PREFIX};
use privy_pin::PinError;

use crate::support::{manila, pin, scripted, RecordingSurface};

#[tokio::test(start_paused = true)]
async fn confirmed_pin_replaces_local_marker() {
    let (source, _script) = scripted();
    let (handle, task) =
        ViewportSync::spawn(source, RecordingSurface::default(), SyncConfig::default());

    let confirmed = handle.drop_pin("Lobby", 121.0, 14.55).await.unwrap();
    assert_eq!(confirmed.id, "srv-lobby");

    let status = handle
        .wait_for(|s| s.rendered == vec!["srv-lobby".to_string()])
        .await
        .unwrap();
    assert!(status.pending_local.is_empty());
    assert!(status.failed_local.is_empty());

    let surface = handle.shutdown(task).await.unwrap();
    let added = surface.added();
    assert_eq!(added.len(), 2);
    assert!(added[0].starts_with(LOCAL_ID_PREFIX));
    assert_eq!(added[1], "srv-lobby");
    assert_eq!(surface.removed(), vec![added[0]]);
}

#[tokio::test(start_paused = true)]
async fn failed_create_stays_visible_until_retried() {
    let (source, script) = scripted();
    script.fail_next_create(PinError::Storage("database unavailable".into()));
    let (handle, task) =
        ViewportSync::spawn(source, RecordingSurface::default(), SyncConfig::default());

    let err = handle.drop_pin("Mall", 121.02, 14.56).await.unwrap_err();
    let (local_id, source) = match err {
        SyncError::CreateFailed { local_id, source } => (local_id, source),
        other => panic!("expected CreateFailed, got {:?}", other),
    };
    assert!(local_id.starts_with(LOCAL_ID_PREFIX));
    assert!(matches!(source, PinError::Storage(_)));

    let status = handle
        .wait_for(|s| s.failed_local.len() == 1)
        .await
        .unwrap();
    assert_eq!(status.failed_local, vec![local_id.clone()]);
    assert_eq!(status.rendered, vec![local_id.clone()]);

    let confirmed = handle.retry_pin(local_id.clone()).await.unwrap();
    assert_eq!(confirmed.id, "srv-mall");
    let status = handle
        .wait_for(|s| s.failed_local.is_empty() && s.pending_local.is_empty())
        .await
        .unwrap();
    assert_eq!(status.rendered, vec!["srv-mall".to_string()]);

    handle.shutdown(task).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_create_can_be_rolled_back() {
    let (source, script) = scripted();
    script.fail_next_create(PinError::InvalidPin("duplicate".into()));
    let (handle, task) =
        ViewportSync::spawn(source, RecordingSurface::default(), SyncConfig::default());

    let Err(SyncError::CreateFailed { local_id, .. }) =
        handle.drop_pin("Mall", 121.02, 14.56).await
    else {
        panic!("create should have failed");
    };

    let removed = handle.rollback_pin(local_id.clone()).await.unwrap();
    assert_eq!(removed.id, local_id);
    assert_eq!(removed.name, "Mall");

    let status = handle
        .wait_for(|s| s.failed_local.is_empty())
        .await
        .unwrap();
    assert!(status.rendered.is_empty());

    assert_eq!(
        handle.rollback_pin(local_id.clone()).await.unwrap_err(),
        SyncError::UnknownLocalPin(local_id)
    );

    handle.shutdown(task).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn invalid_drop_is_rejected_without_marker() {
    let (source, _script) = scripted();
    let (handle, task) =
        ViewportSync::spawn(source, RecordingSurface::default(), SyncConfig::default());

    let err = handle.drop_pin("Nowhere", 200.0, 0.0).await.unwrap_err();
    assert!(matches!(err, SyncError::Rejected(PinError::InvalidPin(_))));

    let surface = handle.shutdown(task).await.unwrap();
    assert!(surface.events.is_empty());
}

#[tokio::test(start_paused = true)]
async fn drop_is_not_blocked_by_in_flight_query() {
    let (source, mut script) = scripted();
    let (handle, task) =
        ViewportSync::spawn(source, RecordingSurface::default(), SyncConfig::default());

    handle.viewport_changed(manila()).await.unwrap();
    let fetch = script.next_fetch().await;
    handle.wait_for(|s| s.phase == SyncPhase::Querying).await.unwrap();

    let confirmed = handle.drop_pin("Lobby", 121.0, 14.55).await.unwrap();
    let status = handle
        .wait_for(|s| s.rendered.contains(&confirmed.id))
        .await
        .unwrap();
    assert_eq!(status.phase, SyncPhase::Querying);

    fetch.respond(Ok(vec![confirmed.clone(), pin("a", 121.05, 14.6)]));
    let status = handle.wait_for(|s| s.is_idle()).await.unwrap();
    assert_eq!(status.rendered, vec!["a".to_string(), confirmed.id]);

    handle.shutdown(task).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn confirmed_pin_survives_older_response_without_it() {
    let (source, mut script) = scripted();
    let (handle, task) =
        ViewportSync::spawn(source, RecordingSurface::default(), SyncConfig::default());

    handle.viewport_changed(manila()).await.unwrap();
    let fetch = script.next_fetch().await;
    handle.wait_for(|s| s.phase == SyncPhase::Querying).await.unwrap();

    let confirmed = handle.drop_pin("Lobby", 121.0, 14.55).await.unwrap();

    // The query was answered from data read before the create landed.
    fetch.respond(Ok(vec![pin("a", 121.05, 14.6)]));
    let status = handle.wait_for(|s| s.is_idle()).await.unwrap();
    assert_eq!(status.rendered, vec!["a".to_string(), confirmed.id.clone()]);

    let surface = handle.shutdown(task).await.unwrap();
    assert!(!surface.removed().contains(&confirmed.id.as_str()));
}
