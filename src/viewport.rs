use crate::adapter::{RendererAdapter, ZoomLevel};
use crate::error::CaptureResult;
use crate::geometry::Tile;

/// Scoped owner of the host viewport for one capture session.
///
/// Acquisition saves the current zoom level and applies the capture zoom;
/// release restores the saved level. Release runs exactly once on every
/// exit path: explicitly through `restore()` on success, through `Drop` on
/// unwind. Scroll position is not restored — the session ending returns it
/// to host control.
pub struct ViewportController<'a, A: RendererAdapter> {
    adapter: &'a mut A,
    saved_zoom: ZoomLevel,
    restored: bool,
}

impl<'a, A: RendererAdapter> ViewportController<'a, A> {
    pub fn acquire(adapter: &'a mut A, level: ZoomLevel) -> CaptureResult<Self> {
        let saved_zoom = adapter.zoom()?;
        adapter.set_zoom(level)?;
        tracing::debug!(
            saved = saved_zoom.percent(),
            applied = level.percent(),
            "viewport acquired for capture"
        );
        Ok(Self {
            adapter,
            saved_zoom,
            restored: false,
        })
    }

    /// Scrolls the viewport so its top-left corner sits at the tile origin.
    pub fn reposition(&mut self, tile: &Tile) -> CaptureResult<()> {
        self.adapter.set_scroll(tile.origin_x, tile.origin_y)
    }

    pub fn adapter(&self) -> &A {
        self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        self.adapter
    }

    /// Explicit release for the success path, surfacing restoration errors
    /// the `Drop` fallback has to swallow.
    pub fn restore(mut self) -> CaptureResult<()> {
        self.restored = true;
        self.adapter.set_zoom(self.saved_zoom)
    }
}

impl<A: RendererAdapter> Drop for ViewportController<'_, A> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(err) = self.adapter.set_zoom(self.saved_zoom) {
            tracing::warn!(?err, "failed to restore zoom level during session unwind");
        }
    }
}
