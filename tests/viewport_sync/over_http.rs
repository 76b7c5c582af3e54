use std::sync::Arc;
use std::time::Duration;

use privy_pin::sync::{HttpPinSource, PinSource, SyncConfig, ViewportSync};
use privy_pin::PinError;
use privy_pin::{http, InMemorySpatialStore, NewPin, PinRepository};

use crate::support::{manila, RecordingSurface};

#[tokio::test]
async fn syncs_against_running_api() {
    let repo = Arc::new(PinRepository::new(InMemorySpatialStore::new()));
    let inside = repo.create(NewPin::new("inside", 121.0, 14.55)).unwrap();
    repo.create(NewPin::new("outside", 122.0, 14.55)).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, http::router(repo)).await.unwrap();
    });

    let source = HttpPinSource::new(format!("http://{addr}"));
    let config = SyncConfig::default().with_debounce(Duration::from_millis(10));
    let (handle, task) = ViewportSync::spawn(source, RecordingSurface::default(), config);

    handle.viewport_changed(manila()).await.unwrap();
    let status = handle
        .wait_for(|s| s.generation.value() == 1 && s.is_idle())
        .await
        .unwrap();
    assert_eq!(status.rendered, vec![inside.id.clone()]);

    let dropped = handle.drop_pin("new", 121.05, 14.6).await.unwrap();
    assert!(!dropped.id.starts_with(privy_pin::sync::LOCAL_ID_PREFIX));
    handle
        .wait_for(|s| s.rendered.contains(&dropped.id))
        .await
        .unwrap();

    // An empty viewport comes back as 404 and clears the map.
    handle
        .viewport_changed(privy_pin::ViewportRect::new(0.0, 0.0, 1.0, 1.0))
        .await
        .unwrap();
    let status = handle
        .wait_for(|s| s.generation.value() == 2 && s.is_idle())
        .await
        .unwrap();
    assert!(status.last_error.is_none());
    assert!(status.rendered.is_empty());

    handle.shutdown(task).await.unwrap();
}

#[tokio::test]
async fn base_url_without_api_prefix_is_an_error_not_an_empty_map() {
    let repo = Arc::new(PinRepository::new(InMemorySpatialStore::new()));
    repo.create(NewPin::new("inside", 121.0, 14.55)).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, http::app(repo)).await.unwrap();
    });

    let wrong = HttpPinSource::new(format!("http://{addr}"));
    let err = wrong.fetch_viewport(manila()).await.unwrap_err();
    assert!(matches!(err, PinError::Transport(_)));

    let right = HttpPinSource::new(format!("http://{addr}/api"));
    let pins = right.fetch_viewport(manila()).await.unwrap();
    assert_eq!(pins.len(), 1);
}
