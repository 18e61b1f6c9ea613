use image::RgbaImage;

/// Outcome of judging one settled tile sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// Corrupted, but retry budget remains; carries the remaining budget.
    Retry(u32),
    /// Corrupted with the budget exhausted. Fatal to the whole session.
    Reject,
}

/// Judges a tile sample already cropped to the tile's clamped extent.
///
/// The corruption signal is any fully transparent pixel in the top or
/// bottom edge row — a proxy for the renderer having returned a blank
/// patch. Corruption confined to the interior is deliberately not
/// detected; the heuristic samples edges only.
pub fn judge(sample: &RgbaImage, remaining_budget: u32) -> Verdict {
    if !edge_rows_corrupted(sample) {
        return Verdict::Accept;
    }
    if remaining_budget > 0 {
        Verdict::Retry(remaining_budget - 1)
    } else {
        Verdict::Reject
    }
}

fn edge_rows_corrupted(sample: &RgbaImage) -> bool {
    let height = sample.height();
    if height == 0 || sample.width() == 0 {
        return true;
    }

    for y in [0, height - 1] {
        for x in 0..sample.width() {
            if sample.get_pixel(x, y).0[3] == 0 {
                return true;
            }
        }
    }
    false
}
