use crate::adapter::LabelSpec;
use crate::geometry::LabelRect;

/// One label's drawing rectangle in composite coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelPlacement<'a> {
    pub text: &'a str,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Picks the anchor for the label coordinate transform: the top-left corner
/// of the container rectangle that is strictly largest in both height and
/// width. A candidate must dominate the current largest on both axes to
/// replace it; ties and partial dominance are skipped. With no containers
/// the anchor degrades to the origin.
pub fn anchor_origin(containers: &[LabelRect]) -> (f32, f32) {
    let mut largest: Option<LabelRect> = None;
    for rect in containers {
        match largest {
            None => largest = Some(*rect),
            Some(current) if current.height < rect.height && current.width < rect.width => {
                largest = Some(*rect);
            }
            Some(_) => {}
        }
    }
    largest.map_or((0.0, 0.0), |rect| (rect.x, rect.y))
}

/// Translates every label's on-screen rectangle by the anchor's top-left
/// corner into composite-local coordinates.
pub fn resolve<'a>(labels: &'a [LabelSpec], containers: &[LabelRect]) -> Vec<LabelPlacement<'a>> {
    let (anchor_x, anchor_y) = anchor_origin(containers);
    labels
        .iter()
        .map(|label| LabelPlacement {
            text: &label.text,
            x: label.rect.x - anchor_x,
            y: label.rect.y - anchor_y,
            width: label.rect.width,
            height: label.rect.height,
        })
        .collect()
}
