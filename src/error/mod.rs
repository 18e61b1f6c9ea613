use thiserror::Error;

pub type CaptureResult<T> = std::result::Result<T, CaptureError>;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("invalid viewport or surface dimensions: {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },
    #[error("renderer cannot produce a readable frame-buffer: {message}")]
    RenderUnavailable { message: String },
    #[error("tile {tile_index} still corrupted after {attempts} attempts")]
    TileRenderTimeout { tile_index: usize, attempts: u32 },
    #[error("host refused pixel readback: {message}")]
    HostIntegrity { message: String },
    #[error("failed to encode composite image: {message}")]
    ImageEncode { message: String },
    #[error("failed to load overlay font: {message}")]
    FontLoad { message: String },
}
