use crate::error::{CaptureError, CaptureResult};
use crate::geometry::{SurfaceSize, Tile, ViewportSize};

/// Computes the ordered grid of tiles covering `surface` with viewport-sized
/// snapshots. Row-major, top-left to bottom-right; the last column and row
/// are truncated to the remaining surface extent when the surface is not an
/// exact multiple of the viewport.
pub fn plan(surface: SurfaceSize, viewport: ViewportSize) -> CaptureResult<Vec<Tile>> {
    if surface.width == 0 || surface.height == 0 {
        return Err(CaptureError::InvalidViewport {
            width: surface.width,
            height: surface.height,
        });
    }
    if viewport.width == 0 || viewport.height == 0 {
        return Err(CaptureError::InvalidViewport {
            width: viewport.width,
            height: viewport.height,
        });
    }

    let columns = surface.width.div_ceil(viewport.width);
    let rows = surface.height.div_ceil(viewport.height);

    let mut tiles = Vec::with_capacity(rows as usize * columns as usize);
    for row in 0..rows {
        let origin_y = row * viewport.height;
        let height = viewport.height.min(surface.height - origin_y);
        for column in 0..columns {
            let origin_x = column * viewport.width;
            let width = viewport.width.min(surface.width - origin_x);
            tiles.push(Tile::new(origin_x, origin_y, width, height));
        }
    }

    tracing::debug!(
        tiles = tiles.len(),
        columns,
        rows,
        surface_width = surface.width,
        surface_height = surface.height,
        "planned capture grid"
    );
    Ok(tiles)
}
