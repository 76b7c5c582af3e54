use std::future::Future;

use crate::error::PinError;
use crate::model::{NewPin, Pin, ViewportRect};
use crate::query::ViewportQueryService;
use crate::store::SpatialStore;

/// Where the sync loop fetches viewport results and submits new pins.
///
/// Futures must be `Send` so the driver can run each request on its own task.
pub trait PinSource: Send + Sync + 'static {
    /// Pins inside `rect`. An empty viewport is `Ok(vec![])`.
    fn fetch_viewport(
        &self,
        rect: ViewportRect,
    ) -> impl Future<Output = Result<Vec<Pin>, PinError>> + Send;

    /// Persist a new pin and return it with its assigned id.
    fn submit_pin(&self, draft: NewPin) -> impl Future<Output = Result<Pin, PinError>> + Send;
}

/// In-process source: the client talks straight to the query service.
impl<S: SpatialStore + 'static> PinSource for ViewportQueryService<S> {
    fn fetch_viewport(
        &self,
        rect: ViewportRect,
    ) -> impl Future<Output = Result<Vec<Pin>, PinError>> + Send {
        let result = self.find_in_viewport(&rect);
        async move { result }
    }

    fn submit_pin(&self, draft: NewPin) -> impl Future<Output = Result<Pin, PinError>> + Send {
        let result = self.repository().create(draft);
        async move { result }
    }
}
