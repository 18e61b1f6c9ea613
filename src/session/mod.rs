use std::io::Cursor;

use image::{imageops, ImageFormat, RgbaImage};

use crate::adapter::{RendererAdapter, ZoomLevel};
use crate::compositor;
use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::frame;
use crate::geometry::{SurfaceSize, Tile};
use crate::overlay::{self, LabelStyle};
use crate::planner;
use crate::validator::{self, Verdict};
use crate::viewport::ViewportController;

/// One capture invocation: plans the tile grid, drives the sequential
/// reposition/settle/read/judge loop, composites accepted tiles, overlays
/// labels against the final frame, restores the viewport, and returns the
/// PNG-encoded composite.
///
/// All-or-nothing: any tile rejected past its retry budget, or any host
/// failure, fails the whole invocation. Viewport restoration runs on every
/// exit path.
pub struct CaptureSession<'a, A: RendererAdapter> {
    adapter: &'a mut A,
    config: CaptureConfig,
    label_style: Option<LabelStyle>,
}

impl<'a, A: RendererAdapter> CaptureSession<'a, A> {
    pub fn new(adapter: &'a mut A, config: CaptureConfig) -> Self {
        Self {
            adapter,
            config,
            label_style: None,
        }
    }

    /// Supplies the font used for the label overlay text pass. Without a
    /// style, label backgrounds and text are skipped with a warning when
    /// the host reports labels.
    pub fn with_label_style(mut self, style: LabelStyle) -> Self {
        self.label_style = Some(style);
        self
    }

    pub fn capture(self) -> CaptureResult<Vec<u8>> {
        let zoom = ZoomLevel::from_percent(self.config.zoom_percent);
        let surface = self.adapter.surface_size()?;
        let viewport = self.adapter.viewport_size()?;
        let scaled = scaled_surface(surface, zoom);

        // Planning validates dimensions, so degenerate input fails before
        // any viewport state is touched.
        let tiles = planner::plan(scaled, viewport)?;
        tracing::info!(
            tiles = tiles.len(),
            width = scaled.width,
            height = scaled.height,
            zoom = zoom.percent(),
            "starting capture"
        );

        let mut controller = ViewportController::acquire(self.adapter, zoom)?;
        let mut composite = RgbaImage::new(scaled.width, scaled.height);

        let total = tiles.len();
        for (index, tile) in tiles.iter().enumerate() {
            controller.reposition(tile)?;
            capture_tile(&mut controller, &mut composite, index, tile, &self.config)?;
            tracing::info!(
                percent = ((index + 1) * 100 / total),
                tile = index,
                "tile captured"
            );
        }

        // Labels must be read and drawn against the same frame as the last
        // capture, before restoration reverts viewport state.
        let labels = controller.adapter().labels()?;
        let containers = controller.adapter().label_containers()?;
        match &self.label_style {
            Some(style) => overlay::apply(&mut composite, &labels, &containers, style),
            None if !labels.is_empty() => {
                tracing::warn!(
                    labels = labels.len(),
                    "labels present but no overlay font configured; skipping label overlay"
                );
            }
            None => {}
        }

        controller.restore()?;
        encode_png(&composite)
    }
}

fn capture_tile<A: RendererAdapter>(
    controller: &mut ViewportController<'_, A>,
    composite: &mut RgbaImage,
    index: usize,
    tile: &Tile,
    config: &CaptureConfig,
) -> CaptureResult<()> {
    let mut remaining = config.retry_budget;
    let mut attempt = 0u32;
    loop {
        let waits = frame::waits_for_attempt(config.frame_wait_budget, attempt);
        frame::settle(controller.adapter_mut(), waits)?;
        let frame_pixels = controller.adapter_mut().read_viewport_pixels()?;
        let sample = crop_tile_sample(&frame_pixels, tile);

        match validator::judge(&sample, remaining) {
            Verdict::Accept => {
                compositor::write(composite, tile, &sample);
                return Ok(());
            }
            Verdict::Retry(budget) => {
                remaining = budget;
                attempt += 1;
                tracing::debug!(
                    tile = index,
                    attempt,
                    remaining,
                    "tile edge corruption detected; retrying with shorter wait"
                );
            }
            Verdict::Reject => {
                return Err(CaptureError::TileRenderTimeout {
                    tile_index: index,
                    attempts: attempt + 1,
                });
            }
        }
    }
}

/// Crops the viewport readback down to the tile's clamped extent. Edge
/// tiles are smaller than the viewport; the tile content sits at the
/// viewport's top-left after repositioning.
fn crop_tile_sample(frame_pixels: &RgbaImage, tile: &Tile) -> RgbaImage {
    let width = tile.width.min(frame_pixels.width());
    let height = tile.height.min(frame_pixels.height());
    imageops::crop_imm(frame_pixels, 0, 0, width, height).to_image()
}

fn scaled_surface(surface: SurfaceSize, zoom: ZoomLevel) -> SurfaceSize {
    let scale = zoom.scale();
    SurfaceSize::new(
        (f64::from(surface.width) * scale).ceil() as u32,
        (f64::from(surface.height) * scale).ceil() as u32,
    )
}

fn encode_png(composite: &RgbaImage) -> CaptureResult<Vec<u8>> {
    let mut bytes = Vec::new();
    composite
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|err| CaptureError::ImageEncode {
            message: err.to_string(),
        })?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::LabelSpec;
    use crate::geometry::{LabelRect, ViewportSize};
    use image::Rgba;
    use std::cell::RefCell;

    struct FakeRendererAdapter {
        surface: SurfaceSize,
        viewport: ViewportSize,
        zoom: ZoomLevel,
        scroll: (u32, u32),
        labels: Vec<LabelSpec>,
        containers: Vec<LabelRect>,
        corrupt_reads: u32,
        fail_reads: bool,
        reads: u32,
        redraws: u32,
        frame_waits: u32,
        calls: RefCell<Vec<String>>,
    }

    impl FakeRendererAdapter {
        fn new(surface: SurfaceSize, viewport: ViewportSize) -> Self {
            Self {
                surface,
                viewport,
                zoom: ZoomLevel::DEFAULT,
                scroll: (0, 0),
                labels: Vec::new(),
                containers: Vec::new(),
                corrupt_reads: 0,
                fail_reads: false,
                reads: 0,
                redraws: 0,
                frame_waits: 0,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl RendererAdapter for FakeRendererAdapter {
        fn surface_size(&self) -> CaptureResult<SurfaceSize> {
            Ok(self.surface)
        }

        fn viewport_size(&self) -> CaptureResult<ViewportSize> {
            Ok(self.viewport)
        }

        fn force_redraw(&mut self) -> CaptureResult<()> {
            self.redraws += 1;
            Ok(())
        }

        fn wait_next_frame(&mut self) -> CaptureResult<()> {
            self.frame_waits += 1;
            Ok(())
        }

        fn set_scroll(&mut self, x: u32, y: u32) -> CaptureResult<()> {
            self.calls.borrow_mut().push(format!("set_scroll {x},{y}"));
            self.scroll = (x, y);
            Ok(())
        }

        fn scroll(&self) -> CaptureResult<(u32, u32)> {
            Ok(self.scroll)
        }

        fn set_zoom(&mut self, level: ZoomLevel) -> CaptureResult<()> {
            self.calls
                .borrow_mut()
                .push(format!("set_zoom {}", level.percent()));
            self.zoom = level;
            Ok(())
        }

        fn zoom(&self) -> CaptureResult<ZoomLevel> {
            Ok(self.zoom)
        }

        fn read_viewport_pixels(&mut self) -> CaptureResult<RgbaImage> {
            self.calls.borrow_mut().push("read_viewport_pixels".into());
            self.reads += 1;
            if self.fail_reads {
                return Err(CaptureError::RenderUnavailable {
                    message: "simulated frame-buffer read failure".to_string(),
                });
            }
            // Each viewport position renders in a colour derived from the
            // scroll offset so stitched pixels are traceable to a tile.
            let pixel = if self.reads <= self.corrupt_reads {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([self.scroll.0 as u8, self.scroll.1 as u8, 7, 255])
            };
            Ok(RgbaImage::from_pixel(
                self.viewport.width,
                self.viewport.height,
                pixel,
            ))
        }

        fn labels(&self) -> CaptureResult<Vec<LabelSpec>> {
            self.calls.borrow_mut().push("labels".into());
            Ok(self.labels.clone())
        }

        fn label_containers(&self) -> CaptureResult<Vec<LabelRect>> {
            self.calls.borrow_mut().push("label_containers".into());
            Ok(self.containers.clone())
        }
    }

    fn quick_config() -> CaptureConfig {
        CaptureConfig {
            zoom_percent: 100,
            frame_wait_budget: 3,
            retry_budget: 3,
        }
    }

    #[test]
    fn capture_stitches_tiles_row_major_and_returns_png() {
        let mut adapter = FakeRendererAdapter::new(
            SurfaceSize::new(8, 8),
            ViewportSize::new(4, 4),
        );

        let bytes = CaptureSession::new(&mut adapter, quick_config())
            .capture()
            .expect("fake adapter should produce a composite");

        let stitched = image::load_from_memory(&bytes)
            .expect("capture output should decode as an image")
            .to_rgba8();
        assert_eq!(stitched.dimensions(), (8, 8));
        assert_eq!(*stitched.get_pixel(1, 1), Rgba([0, 0, 7, 255]));
        assert_eq!(*stitched.get_pixel(5, 1), Rgba([4, 0, 7, 255]));
        assert_eq!(*stitched.get_pixel(1, 5), Rgba([0, 4, 7, 255]));
        assert_eq!(*stitched.get_pixel(6, 6), Rgba([4, 4, 7, 255]));

        let scrolls: Vec<String> = adapter
            .calls()
            .into_iter()
            .filter(|call| call.starts_with("set_scroll"))
            .collect();
        assert_eq!(
            scrolls,
            vec!["set_scroll 0,0", "set_scroll 4,0", "set_scroll 0,4", "set_scroll 4,4"]
        );
    }

    #[test]
    fn capture_scales_surface_by_configured_zoom() {
        let mut adapter = FakeRendererAdapter::new(
            SurfaceSize::new(100, 100),
            ViewportSize::new(40, 40),
        );
        let config = CaptureConfig {
            zoom_percent: 50,
            ..quick_config()
        };

        let bytes = CaptureSession::new(&mut adapter, config)
            .capture()
            .expect("capture at 50% zoom should succeed");

        let stitched = image::load_from_memory(&bytes)
            .expect("capture output should decode as an image")
            .to_rgba8();
        assert_eq!(stitched.dimensions(), (50, 50));
    }

    #[test]
    fn capture_restores_zoom_on_success() {
        let mut adapter = FakeRendererAdapter::new(
            SurfaceSize::new(8, 8),
            ViewportSize::new(4, 4),
        );
        adapter.zoom = ZoomLevel::from_percent(150);

        CaptureSession::new(&mut adapter, quick_config())
            .capture()
            .expect("capture should succeed");

        assert_eq!(adapter.zoom, ZoomLevel::from_percent(150));
    }

    #[test]
    fn always_corrupt_tile_is_validated_exactly_budget_plus_one_times() {
        let mut adapter = FakeRendererAdapter::new(
            SurfaceSize::new(4, 4),
            ViewportSize::new(4, 4),
        );
        adapter.corrupt_reads = u32::MAX;
        adapter.zoom = ZoomLevel::from_percent(200);

        let err = CaptureSession::new(&mut adapter, quick_config())
            .capture()
            .expect_err("permanently corrupt tile should fail the session");

        assert!(matches!(
            err,
            CaptureError::TileRenderTimeout {
                tile_index: 0,
                attempts: 4,
            }
        ));
        assert_eq!(adapter.reads, 4);
        // Restoration still ran on the failure path.
        assert_eq!(adapter.zoom, ZoomLevel::from_percent(200));
        assert!(!adapter.calls().iter().any(|call| call == "labels"));
    }

    #[test]
    fn wait_ceiling_shrinks_by_one_frame_per_retry() {
        let mut adapter = FakeRendererAdapter::new(
            SurfaceSize::new(4, 4),
            ViewportSize::new(4, 4),
        );
        // Corrupt twice, then clean: attempts wait 3, 2, and 1 frames.
        adapter.corrupt_reads = 2;

        CaptureSession::new(&mut adapter, quick_config())
            .capture()
            .expect("tile should recover within its retry budget");

        assert_eq!(adapter.redraws, 3);
        assert_eq!(adapter.frame_waits, 6);
    }

    #[test]
    fn unreadable_frame_buffer_fails_without_compositing_or_overlay() {
        let mut adapter = FakeRendererAdapter::new(
            SurfaceSize::new(8, 8),
            ViewportSize::new(4, 4),
        );
        adapter.fail_reads = true;
        adapter.zoom = ZoomLevel::from_percent(150);

        let err = CaptureSession::new(&mut adapter, quick_config())
            .capture()
            .expect_err("unreadable frame-buffer should fail the session");

        assert!(matches!(err, CaptureError::RenderUnavailable { .. }));
        assert_eq!(adapter.reads, 1);
        let calls = adapter.calls();
        assert!(!calls.iter().any(|call| call == "labels"));
        assert!(!calls.iter().any(|call| call == "label_containers"));
        assert_eq!(adapter.zoom, ZoomLevel::from_percent(150));
    }

    #[test]
    fn labels_are_read_after_last_tile_and_before_restoration() {
        let mut adapter = FakeRendererAdapter::new(
            SurfaceSize::new(8, 8),
            ViewportSize::new(4, 4),
        );
        adapter.labels = vec![LabelSpec::new(
            "goblin",
            LabelRect::new(15.0, 20.0, 48.0, 16.0),
        )];
        adapter.containers = vec![LabelRect::new(10.0, 10.0, 200.0, 200.0)];
        adapter.zoom = ZoomLevel::from_percent(150);

        CaptureSession::new(&mut adapter, quick_config())
            .capture()
            .expect("capture should succeed");

        let calls = adapter.calls();
        let labels_at = calls
            .iter()
            .position(|call| call == "labels")
            .expect("labels should be enumerated");
        let last_scroll_at = calls
            .iter()
            .rposition(|call| call.starts_with("set_scroll"))
            .expect("tiles should have been repositioned");
        let restore_at = calls
            .iter()
            .rposition(|call| call == "set_zoom 150")
            .expect("zoom should be restored");
        assert!(last_scroll_at < labels_at);
        assert!(labels_at < restore_at);
    }

    #[test]
    fn configured_label_style_draws_text_onto_the_composite() {
        let mut adapter = FakeRendererAdapter::new(
            SurfaceSize::new(20, 20),
            ViewportSize::new(20, 20),
        );
        adapter.labels = vec![LabelSpec::new("A", LabelRect::new(0.0, 0.0, 14.0, 14.0))];
        let style = LabelStyle::from_font_bytes(crate::overlay::solid_glyph_font_bytes())
            .expect("embedded test font should parse");

        let bytes = CaptureSession::new(&mut adapter, quick_config())
            .with_label_style(style)
            .capture()
            .expect("capture with label style should succeed");

        let stitched = image::load_from_memory(&bytes)
            .expect("capture output should decode as an image")
            .to_rgba8();
        // Background pass lightened the label box above the glyph.
        assert_eq!(*stitched.get_pixel(1, 1), Rgba([127, 127, 131, 255]));
        // Glyph interior landed on top of the background.
        assert_eq!(*stitched.get_pixel(6, 10), Rgba([0, 0, 0, 255]));
        // Outside the label box the stitched tile is untouched.
        assert_eq!(*stitched.get_pixel(16, 16), Rgba([0, 0, 7, 255]));
    }

    #[test]
    fn degenerate_viewport_fails_before_any_side_effects() {
        let mut adapter = FakeRendererAdapter::new(
            SurfaceSize::new(8, 8),
            ViewportSize::new(0, 4),
        );

        let err = CaptureSession::new(&mut adapter, quick_config())
            .capture()
            .expect_err("zero-width viewport should be invalid");

        assert!(matches!(err, CaptureError::InvalidViewport { .. }));
        assert!(adapter.calls().is_empty());
        assert_eq!(adapter.reads, 0);
    }

    #[test]
    fn crop_tile_sample_clamps_to_tile_extent() {
        let frame_pixels = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        let sample = crop_tile_sample(&frame_pixels, &Tile::new(8, 8, 2, 3));
        assert_eq!(sample.dimensions(), (2, 3));
        assert_eq!(*sample.get_pixel(1, 2), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn scaled_surface_uses_ceiling_rounding() {
        let scaled = scaled_surface(SurfaceSize::new(101, 75), ZoomLevel::from_percent(50));
        assert_eq!(scaled, SurfaceSize::new(51, 38));

        let unscaled = scaled_surface(SurfaceSize::new(101, 75), ZoomLevel::DEFAULT);
        assert_eq!(unscaled, SurfaceSize::new(101, 75));
    }
}
