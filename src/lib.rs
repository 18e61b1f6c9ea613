pub mod adapter;
pub mod compositor;
mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod logging;
pub mod overlay;
pub mod planner;
pub mod session;
pub mod validator;
pub mod viewport;

pub use adapter::{LabelSpec, RendererAdapter, ZoomLevel};
pub use config::{load_capture_config, CaptureConfig};
pub use error::{CaptureError, CaptureResult};
pub use overlay::LabelStyle;
pub use session::CaptureSession;

/// Captures the host's full surface through `adapter` with settings from
/// the user configuration, returning the PNG-encoded composite.
pub fn capture<A: RendererAdapter>(adapter: &mut A) -> CaptureResult<Vec<u8>> {
    let config = load_capture_config();
    CaptureSession::new(adapter, config).capture()
}
