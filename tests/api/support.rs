use std::sync::Arc;

use privy_pin::{
    http, InMemorySpatialStore, NewPin, Pin, PinError, PinRepository, SpatialStore, ViewportRect,
};
use serde_json::{json, Value};

pub type Repo = Arc<PinRepository<InMemorySpatialStore>>;

pub fn repo() -> Repo {
    Arc::new(PinRepository::new(InMemorySpatialStore::new()))
}

/// Bind to port 0 and return the base URL.
pub async fn start_server<S: SpatialStore + 'static>(repo: Arc<PinRepository<S>>) -> String {
    let app = http::router(repo);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn toilet(name: &str, lon: f64, lat: f64) -> Value {
    json!({
        "name": name,
        "location": { "type": "Point", "coordinates": [lon, lat] }
    })
}

pub fn seed(repo: &Repo, pins: &[(&str, f64, f64)]) -> Vec<Pin> {
    pins.iter()
        .map(|(name, lon, lat)| repo.create(NewPin::new(*name, *lon, *lat)).unwrap())
        .collect()
}

pub fn sorted_names(pins: &[Pin]) -> Vec<String> {
    let mut names: Vec<String> = pins.iter().map(|p| p.name.clone()).collect();
    names.sort();
    names
}

/// Store whose backend is always down.
pub struct UnavailableStore;

fn down() -> PinError {
    PinError::Storage("backend unavailable".into())
}

impl SpatialStore for UnavailableStore {
    fn insert(&self, _pin: Pin) -> Result<String, PinError> {
        Err(down())
    }

    fn get(&self, _id: &str) -> Result<Option<Pin>, PinError> {
        Err(down())
    }

    fn list(&self) -> Result<Vec<Pin>, PinError> {
        Err(down())
    }

    fn update(
        &self,
        _id: &str,
        _apply: &dyn Fn(&mut Pin) -> Result<(), PinError>,
    ) -> Result<Option<Pin>, PinError> {
        Err(down())
    }

    fn delete(&self, _id: &str) -> Result<Option<Pin>, PinError> {
        Err(down())
    }

    fn query_bounding_box(&self, _rect: &ViewportRect) -> Result<Vec<Pin>, PinError> {
        Err(down())
    }
}

pub fn unavailable_repo() -> Arc<PinRepository<UnavailableStore>> {
    Arc::new(PinRepository::new(UnavailableStore))
}
