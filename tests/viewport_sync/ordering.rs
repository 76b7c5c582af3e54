use std::time::Duration;

use privy_pin::sync::{SyncConfig, SyncPhase, ViewportSync};
use privy_pin::PinError;

use crate::support::{makati, manila, pin, scripted, RecordingSurface};

#[tokio::test(start_paused = true)]
async fn rapid_changes_coalesce_into_one_query() {
    let (source, mut script) = scripted();
    let (handle, task) =
        ViewportSync::spawn(source, RecordingSurface::default(), SyncConfig::default());

    handle.viewport_changed(manila()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.viewport_changed(makati()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(250)).await;

    // The second change restarted the window, so nothing has been issued yet.
    assert!(script.fetches.try_recv().is_err());

    let fetch = script.next_fetch().await;
    assert_eq!(fetch.rect, makati());
    fetch.respond(Ok(vec![pin("a", 121.03, 14.55)]));

    let status = handle
        .wait_for(|s| s.phase == SyncPhase::Idle && !s.rendered.is_empty())
        .await
        .unwrap();
    assert_eq!(status.generation.value(), 1);
    assert_eq!(status.rendered, vec!["a".to_string()]);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(script.fetches.try_recv().is_err());

    handle.shutdown(task).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn out_of_order_response_is_discarded() {
    let (source, mut script) = scripted();
    let (handle, task) =
        ViewportSync::spawn(source, RecordingSurface::default(), SyncConfig::default());

    handle.viewport_changed(manila()).await.unwrap();
    let first = script.next_fetch().await;

    // Move again while the first query is still in flight.
    handle.viewport_changed(makati()).await.unwrap();
    let second = script.next_fetch().await;
    assert_eq!(second.rect, makati());

    second.respond(Ok(vec![pin("b", 121.03, 14.55)]));
    handle
        .wait_for(|s| s.rendered == vec!["b".to_string()])
        .await
        .unwrap();

    first.respond(Ok(vec![pin("a", 120.95, 14.6)]));
    let status = handle.wait_for(|s| s.discarded == 1).await.unwrap();
    assert_eq!(status.rendered, vec!["b".to_string()]);
    assert_eq!(status.generation.value(), 2);
    assert!(status.is_idle());

    let surface = handle.shutdown(task).await.unwrap();
    assert_eq!(surface.added(), vec!["b"]);
    assert!(surface.removed().is_empty());
}

#[tokio::test(start_paused = true)]
async fn panning_reconciles_markers() {
    let (source, mut script) = scripted();
    let (handle, task) =
        ViewportSync::spawn(source, RecordingSurface::default(), SyncConfig::default());

    handle.viewport_changed(manila()).await.unwrap();
    script
        .next_fetch()
        .await
        .respond(Ok(vec![pin("a", 121.0, 14.55), pin("b", 121.05, 14.6)]));
    handle.wait_for(|s| s.rendered.len() == 2).await.unwrap();

    handle.viewport_changed(makati()).await.unwrap();
    script
        .next_fetch()
        .await
        .respond(Ok(vec![pin("b", 121.05, 14.6), pin("c", 121.04, 14.56)]));
    let status = handle
        .wait_for(|s| s.rendered == vec!["b".to_string(), "c".to_string()])
        .await
        .unwrap();
    assert_eq!(status.generation.value(), 2);

    let surface = handle.shutdown(task).await.unwrap();
    // The unchanged pin keeps its marker.
    assert_eq!(surface.added(), vec!["a", "b", "c"]);
    assert_eq!(surface.removed(), vec!["a"]);
}

#[tokio::test(start_paused = true)]
async fn failed_query_keeps_markers() {
    let (source, mut script) = scripted();
    let (handle, task) =
        ViewportSync::spawn(source, RecordingSurface::default(), SyncConfig::default());

    handle.viewport_changed(manila()).await.unwrap();
    script.next_fetch().await.respond(Ok(vec![pin("a", 121.0, 14.55)]));
    handle.wait_for(|s| s.rendered.len() == 1).await.unwrap();

    handle.viewport_changed(makati()).await.unwrap();
    script
        .next_fetch()
        .await
        .respond(Err(PinError::Transport("connection reset".into())));
    let status = handle
        .wait_for(|s| s.last_error.is_some())
        .await
        .unwrap();
    assert_eq!(status.rendered, vec!["a".to_string()]);
    assert!(status.is_idle());

    // The next successful query clears the error.
    handle.viewport_changed(manila()).await.unwrap();
    script.next_fetch().await.respond(Ok(vec![]));
    let status = handle
        .wait_for(|s| s.generation.value() == 3 && s.is_idle())
        .await
        .unwrap();
    assert!(status.last_error.is_none());
    assert!(status.rendered.is_empty());

    handle.shutdown(task).await.unwrap();
}
