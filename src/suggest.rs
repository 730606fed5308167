//! Auto-slice suggestion.
//!
//! Proposes horizontal cut lines for a frame from the bounding boxes of its
//! direct children. The idea: a newsletter frame is a stack of full-width
//! sections (hero, article block, product grid, ...). Wide, reasonably tall
//! children mark those sections; cutting at the top of each section keeps
//! every section in one image, and long sections are further split so no
//! image exceeds the max slice height.
//!
//! ## Steps
//!
//! ```text
//! children ──filter──▶ spans ──clip to body──▶ intervals
//!          ──merge (gap ≤ join)──▶ sections ──cover body──▶ bands
//!          ──split (≤ max height)──▶ rectangles
//! ```
//!
//! Thresholds scale with the frame (see [`Thresholds::for_frame`]).
//!
//! ## Guarantees
//!
//! For a non-empty body region the result is never empty, rectangles are
//! ordered top to bottom, and every body row belongs to exactly one
//! rectangle. Suggestion is advisory: an empty body yields an empty list, not
//! an error.

use crate::geometry::{BodyRegion, Interval, merge_intervals, percent_of, round_px, split_interval};
use crate::types::{ChildBox, SliceRect};

pub const DEFAULT_MAX_SLICE_HEIGHT: u32 = 1200;
/// Requested max slice heights below this are raised to it.
pub const MIN_MAX_SLICE_HEIGHT: u32 = 200;
/// Final chunks shorter than this are folded into the chunk above.
pub const NOISE_HEIGHT: u32 = 8;

/// Inputs for a suggestion, already in whole logical pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestParams {
    pub frame_width: u32,
    pub frame_height: u32,
    pub header_height: u32,
    pub footer_height: u32,
    pub max_slice_height: Option<u32>,
}

impl SuggestParams {
    pub fn body(&self) -> BodyRegion {
        BodyRegion::from_bands(self.frame_height, self.header_height, self.footer_height)
    }

    /// Requested max height with the default and the floor applied.
    pub fn effective_max_height(&self) -> u32 {
        effective_max_height(self.max_slice_height)
    }
}

pub fn effective_max_height(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(DEFAULT_MAX_SLICE_HEIGHT)
        .max(MIN_MAX_SLICE_HEIGHT)
}

/// Frame-relative thresholds for what counts as a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// `max(40, 3% of frame height)`
    pub min_section_height: u32,
    /// `max(120, 55% of frame width)`
    pub min_child_width: u32,
    /// `max(12, 1% of frame height)`
    pub join_gap: u32,
}

impl Thresholds {
    pub fn for_frame(frame_width: u32, frame_height: u32) -> Self {
        Self {
            min_section_height: percent_of(frame_height, 3.0).max(40),
            min_child_width: percent_of(frame_width, 55.0).max(120),
            join_gap: percent_of(frame_height, 1.0).max(12),
        }
    }
}

/// Suggest slices for a frame. See the [module docs](self).
pub fn suggest_slices(params: &SuggestParams, children: &[ChildBox]) -> Vec<SliceRect> {
    let body = params.body();
    let Some(body_interval) = body.as_interval() else {
        return Vec::new();
    };
    if params.frame_width == 0 {
        return Vec::new();
    }

    let thresholds = Thresholds::for_frame(params.frame_width, params.frame_height);
    let max_height = params.effective_max_height();

    let mut intervals = section_intervals(&body, &thresholds, children);
    if intervals.is_empty() {
        intervals.push(body_interval);
    }

    let sections = merge_intervals(intervals, thresholds.join_gap);
    let rects: Vec<SliceRect> = cover_body(&sections, &body)
        .into_iter()
        .flat_map(|band| split_interval(band, max_height, NOISE_HEIGHT))
        .map(|chunk| SliceRect::band(params.frame_width, chunk.start, chunk.len()))
        .collect();

    if rects.is_empty() {
        return tile_body(&body, max_height)
            .into_iter()
            .map(|chunk| SliceRect::band(params.frame_width, chunk.start, chunk.len()))
            .collect();
    }
    rects
}

/// Vertical spans of visible children that are wide and tall enough to mark
/// a section, clipped to the body.
fn section_intervals(
    body: &BodyRegion,
    thresholds: &Thresholds,
    children: &[ChildBox],
) -> Vec<Interval> {
    children
        .iter()
        .filter(|child| child.visible)
        .filter(|child| child.width.is_finite() && child.width >= thresholds.min_child_width as f64)
        .filter(|child| {
            child.height.is_finite() && child.height >= thresholds.min_section_height as f64
        })
        .filter_map(|child| {
            let start = round_px(child.y);
            let end = round_px(child.y + child.height);
            body.clip(start, end)
        })
        .filter(|iv| iv.len() >= thresholds.min_section_height)
        .collect()
}

/// Turn disjoint, sorted sections into bands that partition the body.
///
/// Each band runs from its section's start to the next section's start and
/// the last one ends at the body bottom. Rows above the first section become
/// their own band, unless there are fewer than [`NOISE_HEIGHT`] of them, in
/// which case the first section absorbs them.
fn cover_body(sections: &[Interval], body: &BodyRegion) -> Vec<Interval> {
    let mut bands = Vec::with_capacity(sections.len() + 1);
    let lead = sections
        .first()
        .map(|first| Interval::new(body.top, first.start))
        .filter(|lead| !lead.is_empty());
    let absorb_lead = match lead {
        Some(lead) if lead.len() >= NOISE_HEIGHT => {
            bands.push(lead);
            false
        }
        Some(_) => true,
        None => false,
    };

    for (i, section) in sections.iter().enumerate() {
        let start = if i == 0 && absorb_lead { body.top } else { section.start };
        let end = sections
            .get(i + 1)
            .map(|next| next.start)
            .unwrap_or(body.bottom);
        if end > start {
            bands.push(Interval::new(start, end));
        }
    }
    bands
}

/// Fixed-height tiling of the body, ignoring children entirely.
pub fn tile_body(body: &BodyRegion, max_height: u32) -> Vec<Interval> {
    let step = max_height.max(1);
    let mut tiles = Vec::new();
    let mut y = body.top;
    while y < body.bottom {
        let end = (y + step).min(body.bottom);
        tiles.push(Interval::new(y, end));
        y = end;
    }
    tiles
}
