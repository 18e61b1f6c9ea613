use image::{imageops, RgbaImage};

use crate::geometry::Tile;

/// Copies a validated tile sample into the composite at the tile's planned
/// offset. The planner guarantees bounds; an overflowing write indicates a
/// logic error upstream and is clamped with a log rather than corrupting
/// memory.
pub fn write(composite: &mut RgbaImage, tile: &Tile, sample: &RgbaImage) {
    let fits_x = tile
        .origin_x
        .checked_add(sample.width())
        .is_some_and(|end| end <= composite.width());
    let fits_y = tile
        .origin_y
        .checked_add(sample.height())
        .is_some_and(|end| end <= composite.height());
    if !fits_x || !fits_y {
        tracing::warn!(
            ?tile,
            sample_width = sample.width(),
            sample_height = sample.height(),
            composite_width = composite.width(),
            composite_height = composite.height(),
            "tile sample exceeds composite bounds; clamping"
        );
    }

    imageops::replace(
        composite,
        sample,
        i64::from(tile.origin_x),
        i64::from(tile.origin_y),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn write_places_sample_at_tile_origin() {
        let mut composite = RgbaImage::new(10, 10);
        let tile = Tile::new(4, 6, 3, 2);
        let sample = RgbaImage::from_pixel(3, 2, Rgba([9, 8, 7, 255]));

        write(&mut composite, &tile, &sample);

        assert_eq!(*composite.get_pixel(4, 6), Rgba([9, 8, 7, 255]));
        assert_eq!(*composite.get_pixel(6, 7), Rgba([9, 8, 7, 255]));
        assert_eq!(*composite.get_pixel(3, 6), Rgba([0, 0, 0, 0]));
        assert_eq!(*composite.get_pixel(4, 5), Rgba([0, 0, 0, 0]));
        assert_eq!(*composite.get_pixel(7, 6), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn write_leaves_neighbouring_tiles_untouched() {
        let mut composite = RgbaImage::new(8, 4);
        write(
            &mut composite,
            &Tile::new(0, 0, 4, 4),
            &RgbaImage::from_pixel(4, 4, Rgba([1, 1, 1, 255])),
        );
        write(
            &mut composite,
            &Tile::new(4, 0, 4, 4),
            &RgbaImage::from_pixel(4, 4, Rgba([2, 2, 2, 255])),
        );

        assert_eq!(*composite.get_pixel(3, 3), Rgba([1, 1, 1, 255]));
        assert_eq!(*composite.get_pixel(4, 3), Rgba([2, 2, 2, 255]));
    }

    #[test]
    fn write_clamps_oversized_sample_instead_of_panicking() {
        let mut composite = RgbaImage::new(4, 4);
        let tile = Tile::new(2, 2, 4, 4);
        let sample = RgbaImage::from_pixel(4, 4, Rgba([5, 5, 5, 255]));

        write(&mut composite, &tile, &sample);

        assert_eq!(*composite.get_pixel(3, 3), Rgba([5, 5, 5, 255]));
        assert_eq!(*composite.get_pixel(1, 1), Rgba([0, 0, 0, 0]));
    }
}
