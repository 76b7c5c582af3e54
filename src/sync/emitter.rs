//! EmitterSurface - broadcasts marker changes to in-process listeners.
//!
//! Payloads are JSON strings: the full pin for `marker.added` and
//! `marker.updated`, `{"id": ...}` for `marker.removed`.

use event_emitter_rs::EventEmitter;
use serde_json::json;

use super::surface::MarkerSurface;
use crate::model::Pin;

pub const MARKER_ADDED: &str = "marker.added";
pub const MARKER_REMOVED: &str = "marker.removed";
pub const MARKER_UPDATED: &str = "marker.updated";

pub struct EmitterSurface {
    emitter: EventEmitter,
}

impl Default for EmitterSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl EmitterSurface {
    pub fn new() -> Self {
        Self::with_emitter(EventEmitter::new())
    }

    pub fn with_emitter(emitter: EventEmitter) -> Self {
        Self { emitter }
    }

    /// Register a listener for one of the `MARKER_*` events.
    pub fn on<F>(&mut self, event: &str, listener: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.emitter.on(event, listener);
    }

    fn emit(&mut self, event: &str, payload: serde_json::Value) {
        self.emitter.emit(event, payload.to_string());
    }
}

impl MarkerSurface for EmitterSurface {
    /// Pin id of the marker.
    type Handle = String;

    fn add_marker(&mut self, pin: &Pin) -> String {
        self.emit(MARKER_ADDED, json!(pin));
        pin.id.clone()
    }

    fn remove_marker(&mut self, id: &str, _handle: String) {
        self.emit(MARKER_REMOVED, json!({ "id": id }));
    }

    fn update_marker(&mut self, _handle: &mut String, pin: &Pin) {
        self.emit(MARKER_UPDATED, json!(pin));
    }
}
