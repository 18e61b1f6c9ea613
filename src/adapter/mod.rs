use image::RgbaImage;

use crate::error::CaptureResult;
use crate::geometry::{LabelRect, SurfaceSize, ViewportSize};

/// Discrete display zoom level, in percent. The host zoom widget only
/// offers multiples of 10 between 10 and 250; anything else snaps to the
/// default so the viewport is never left in an unknown zoom state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomLevel(u16);

impl ZoomLevel {
    pub const DEFAULT: ZoomLevel = ZoomLevel(100);

    pub fn from_percent(percent: u16) -> Self {
        if Self::is_supported(percent) {
            Self(percent)
        } else {
            tracing::warn!(percent, "unsupported zoom level; falling back to 100%");
            Self::DEFAULT
        }
    }

    pub const fn is_supported(percent: u16) -> bool {
        percent >= 10 && percent <= 250 && percent % 10 == 0
    }

    pub const fn percent(self) -> u16 {
        self.0
    }

    /// Scale factor relative to 100% zoom.
    pub fn scale(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Overlay text plus the on-screen bounding rectangle it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSpec {
    pub text: String,
    pub rect: LabelRect,
}

impl LabelSpec {
    pub fn new(text: impl Into<String>, rect: LabelRect) -> Self {
        Self {
            text: text.into(),
            rect,
        }
    }
}

/// Host renderer seam. Everything the capture loop needs from the page —
/// sizes, scrolling, zoom, redraw scheduling, and pixel readback — goes
/// through this trait so the core never touches ambient host state.
///
/// Implementations surface host failures as `CaptureError` values:
/// `RenderUnavailable` when the frame-buffer cannot be read at all,
/// `HostIntegrity` when readback is refused by a host security policy.
pub trait RendererAdapter {
    /// Full logical size of the content at 100% zoom.
    fn surface_size(&self) -> CaptureResult<SurfaceSize>;
    /// Size of the frame-buffer region renderable at once.
    fn viewport_size(&self) -> CaptureResult<ViewportSize>;

    /// Instructs the renderer to redraw the current viewport.
    fn force_redraw(&mut self) -> CaptureResult<()>;
    /// Blocks until the renderer signals the next frame boundary.
    fn wait_next_frame(&mut self) -> CaptureResult<()>;

    fn set_scroll(&mut self, x: u32, y: u32) -> CaptureResult<()>;
    fn scroll(&self) -> CaptureResult<(u32, u32)>;

    fn set_zoom(&mut self, level: ZoomLevel) -> CaptureResult<()>;
    fn zoom(&self) -> CaptureResult<ZoomLevel>;

    /// Reads back the pixels currently visible in the viewport.
    fn read_viewport_pixels(&mut self) -> CaptureResult<RgbaImage>;

    /// Label elements currently on screen.
    fn labels(&self) -> CaptureResult<Vec<LabelSpec>>;
    /// Bounding rectangles of the label container elements the labels are
    /// anchored against.
    fn label_containers(&self) -> CaptureResult<Vec<LabelRect>>;
}
