use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;

use crate::adapter::LabelSpec;
use crate::error::{CaptureError, CaptureResult};
use crate::geometry::LabelRect;

mod placement;

pub use placement::{anchor_origin, resolve, LabelPlacement};

/// Fixed text contract so the output is consistent regardless of host
/// styling: dark bold 14px text over a half-transparent light background.
const LABEL_FONT_PX: f32 = 14.0;
const TEXT_VERTICAL_OFFSET: f32 = 5.0;
const TEXT_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Overlay text styling; owns the rasterization font.
#[derive(Debug, Clone)]
pub struct LabelStyle {
    font: FontArc,
    px: f32,
}

impl LabelStyle {
    /// Builds a style from raw TTF/OTF bytes supplied by the host. A bold
    /// sans face matches the original output most closely.
    pub fn from_font_bytes(bytes: Vec<u8>) -> CaptureResult<Self> {
        let font = FontArc::try_from_vec(bytes).map_err(|err| CaptureError::FontLoad {
            message: err.to_string(),
        })?;
        Ok(Self {
            font,
            px: LABEL_FONT_PX,
        })
    }
}

/// Draws every label onto the finished composite at anchor-corrected
/// coordinates. Two full passes — all backgrounds, then all text — so no
/// label's text is occluded by a later label's background.
pub fn apply(
    composite: &mut RgbaImage,
    labels: &[LabelSpec],
    containers: &[LabelRect],
    style: &LabelStyle,
) {
    if labels.is_empty() {
        return;
    }

    let placements = resolve(labels, containers);
    tracing::debug!(labels = placements.len(), "overlaying labels onto composite");

    for placement in &placements {
        draw_background(composite, placement);
    }
    for placement in &placements {
        draw_text_mut(
            composite,
            TEXT_COLOR,
            placement.x.round() as i32,
            (placement.y + TEXT_VERTICAL_OFFSET).round() as i32,
            PxScale::from(style.px),
            &style.font,
            placement.text,
        );
    }
}

/// Blends a half-transparent white rectangle sized to the label's bounding
/// box, clipped to the composite.
fn draw_background(composite: &mut RgbaImage, placement: &LabelPlacement<'_>) {
    let left = placement.x.round() as i64;
    let top = placement.y.round() as i64;
    let right = (placement.x + placement.width).round() as i64;
    let bottom = (placement.y + placement.height).round() as i64;

    let x0 = left.clamp(0, i64::from(composite.width()));
    let y0 = top.clamp(0, i64::from(composite.height()));
    let x1 = right.clamp(0, i64::from(composite.width()));
    let y1 = bottom.clamp(0, i64::from(composite.height()));

    for y in y0..y1 {
        for x in x0..x1 {
            let pixel = composite.get_pixel_mut(x as u32, y as u32);
            for channel in &mut pixel.0[..3] {
                *channel = ((u16::from(*channel) + 255) / 2) as u8;
            }
            pixel.0[3] = (pixel.0[3] / 2).saturating_add(128);
        }
    }
}

/// Minimal TrueType blob whose only mapped character, `A`, is a solid
/// square covering most of the em box. Text drawn with it produces
/// deterministic full-coverage pixels, so tests can assert on the text
/// pass without a system font. Table checksums are left zero; the parser
/// does not verify them.
#[cfg(test)]
pub(crate) fn solid_glyph_font_bytes() -> Vec<u8> {
    fn u16be(out: &mut Vec<u8>, value: u16) {
        out.extend_from_slice(&value.to_be_bytes());
    }
    fn i16be(out: &mut Vec<u8>, value: i16) {
        out.extend_from_slice(&value.to_be_bytes());
    }
    fn u32be(out: &mut Vec<u8>, value: u32) {
        out.extend_from_slice(&value.to_be_bytes());
    }

    // cmap: one windows/bmp format-4 subtable mapping 'A' to glyph 1.
    let mut cmap = Vec::new();
    u16be(&mut cmap, 0);
    u16be(&mut cmap, 1);
    u16be(&mut cmap, 3);
    u16be(&mut cmap, 1);
    u32be(&mut cmap, 12);
    for value in [
        4u16, 32, 0, 4, 4, 1, 0, 0x0041, 0xFFFF, 0, 0x0041, 0xFFFF, 0xFFC0, 1, 0, 0,
    ] {
        u16be(&mut cmap, value);
    }

    // glyf: glyph 0 is empty; glyph 1 is one square contour, font units
    // (100,0) to (900,700).
    let mut glyf = Vec::new();
    for value in [1i16, 100, 0, 900, 700] {
        i16be(&mut glyf, value);
    }
    u16be(&mut glyf, 3);
    u16be(&mut glyf, 0);
    glyf.extend_from_slice(&[1, 1, 1, 1]);
    for value in [100i16, 800, 0, -800, 0, 0, 700, 0] {
        i16be(&mut glyf, value);
    }

    // head: 1000 units per em, short loca offsets.
    let mut head = Vec::new();
    u16be(&mut head, 1);
    u16be(&mut head, 0);
    u32be(&mut head, 0x0001_0000);
    u32be(&mut head, 0);
    u32be(&mut head, 0x5F0F_3CF5);
    u16be(&mut head, 0);
    u16be(&mut head, 1000);
    head.extend_from_slice(&[0u8; 16]);
    for value in [0i16, -200, 1000, 800] {
        i16be(&mut head, value);
    }
    u16be(&mut head, 0);
    u16be(&mut head, 8);
    i16be(&mut head, 2);
    i16be(&mut head, 0);
    i16be(&mut head, 0);

    // hhea: ascent 800, descent -200, two horizontal metrics.
    let mut hhea = Vec::new();
    u32be(&mut hhea, 0x0001_0000);
    for value in [800i16, -200, 0] {
        i16be(&mut hhea, value);
    }
    u16be(&mut hhea, 1000);
    for value in [0i16, 0, 1000, 1, 0, 0, 0, 0, 0, 0, 0] {
        i16be(&mut hhea, value);
    }
    u16be(&mut hhea, 2);

    let mut hmtx = Vec::new();
    u16be(&mut hmtx, 500);
    i16be(&mut hmtx, 0);
    u16be(&mut hmtx, 1000);
    i16be(&mut hmtx, 100);

    // loca (short format): glyph 1 occupies the whole 34-byte glyf table.
    let mut loca = Vec::new();
    for value in [0u16, 0, 17] {
        u16be(&mut loca, value);
    }

    let mut maxp = Vec::new();
    u32be(&mut maxp, 0x0000_5000);
    u16be(&mut maxp, 2);

    // Records must stay sorted by tag; the parser binary-searches them.
    let tables: [(&[u8; 4], Vec<u8>); 7] = [
        (b"cmap", cmap),
        (b"glyf", glyf),
        (b"head", head),
        (b"hhea", hhea),
        (b"hmtx", hmtx),
        (b"loca", loca),
        (b"maxp", maxp),
    ];

    let mut font = Vec::new();
    u32be(&mut font, 0x0001_0000);
    u16be(&mut font, tables.len() as u16);
    u16be(&mut font, 64);
    u16be(&mut font, 2);
    u16be(&mut font, 48);
    let mut offset = (12 + 16 * tables.len()) as u32;
    for (tag, data) in &tables {
        font.extend_from_slice(*tag);
        u32be(&mut font, 0);
        u32be(&mut font, offset);
        u32be(&mut font, data.len() as u32);
        offset += data.len().next_multiple_of(4) as u32;
    }
    for (_, data) in &tables {
        font.extend_from_slice(data);
        font.resize(font.len().next_multiple_of(4), 0);
    }
    font
}
