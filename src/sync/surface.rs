use crate::model::Pin;

/// The map-rendering side consumed by the sync controller.
///
/// Implementations own the actual drawing; the controller only decides which
/// pins get a marker.
pub trait MarkerSurface {
    /// Whatever the surface needs to later remove or update a marker.
    type Handle;

    /// Draw a marker (and its popup) for `pin`.
    fn add_marker(&mut self, pin: &Pin) -> Self::Handle;

    /// Take a marker off the map.
    fn remove_marker(&mut self, id: &str, handle: Self::Handle);

    /// Replace the content of an existing marker.
    fn update_marker(&mut self, handle: &mut Self::Handle, pin: &Pin);
}
