//! Geometry primitives shared by the suggester, the manual normalizer and the
//! rescaler.
//!
//! Everything here is pure integer arithmetic on the vertical axis (plus a few
//! helpers to turn caller-supplied floats into whole pixels). No allocation
//! beyond the returned vectors, no I/O.

/// Round a caller-supplied coordinate to a whole pixel.
///
/// Non-finite values (NaN, ±∞) become `0` so a malformed request degrades to a
/// clamped rectangle instead of poisoning the arithmetic.
pub fn round_px(value: f64) -> i64 {
    if value.is_finite() {
        value.round() as i64
    } else {
        0
    }
}

/// Clamp `value` into `[lo, hi]`. If the range is inverted, `lo` wins.
pub fn clamp_i64(value: i64, lo: i64, hi: i64) -> i64 {
    if hi < lo { lo } else { value.clamp(lo, hi) }
}

/// Round a non-negative band/size from a request, clamped to `[0, max]`.
pub fn clamp_band(value: f64, max: u32) -> u32 {
    clamp_i64(round_px(value), 0, max as i64) as u32
}

/// `pct` percent of `value`, rounded to the nearest pixel.
pub fn percent_of(value: u32, pct: f64) -> u32 {
    (value as f64 * pct / 100.0).round() as u32
}

/// A half-open span `[start, end)` on the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: u32,
    pub end: u32,
}

impl Interval {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// The vertical span of a frame eligible for slicing:
/// `[header, frame_height - footer)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyRegion {
    pub top: u32,
    pub bottom: u32,
}

impl BodyRegion {
    /// Build the body region from band heights. Each band is clamped to
    /// `[0, frame_height]` first; the result may still be empty or inverted
    /// (header + footer ≥ frame height), which callers must check.
    pub fn from_bands(frame_height: u32, header: u32, footer: u32) -> Self {
        let header = header.min(frame_height);
        let footer = footer.min(frame_height);
        Self {
            top: header,
            bottom: frame_height - footer,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bottom <= self.top
    }

    /// The body as an interval, or `None` when it has no rows.
    pub fn as_interval(&self) -> Option<Interval> {
        (!self.is_empty()).then(|| Interval::new(self.top, self.bottom))
    }

    /// Clamp a signed span to the body, returning `None` if nothing is left.
    pub fn clip(&self, start: i64, end: i64) -> Option<Interval> {
        let start = clamp_i64(start, self.top as i64, self.bottom as i64) as u32;
        let end = clamp_i64(end, self.top as i64, self.bottom as i64) as u32;
        (end > start).then(|| Interval::new(start, end))
    }
}

/// Sort intervals by start and merge any two whose gap is `<= join_gap`.
///
/// Overlapping and touching intervals always merge. The sort is stable, so
/// equal starts keep their input order; merging walks ascending starts.
pub fn merge_intervals(mut intervals: Vec<Interval>, join_gap: u32) -> Vec<Interval> {
    intervals.sort_by_key(|iv| iv.start);

    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for iv in intervals {
        match merged.last_mut() {
            Some(last) if iv.start <= last.end.saturating_add(join_gap) => {
                last.end = last.end.max(iv.end);
            }
            _ => merged.push(iv),
        }
    }
    merged
}

/// Split an interval into consecutive chunks no taller than `max`, top to
/// bottom.
///
/// A trailing chunk shorter than `min_tail` is noise: instead of becoming its
/// own chunk it is folded into the chunk above by splitting the last two
/// chunks evenly, so coverage stays exact and every chunk stays `<= max`. An
/// interval that is itself shorter than `min_tail` yields nothing. Chunks are
/// only guaranteed to be `>= min_tail` when `max >= 2 * min_tail`.
pub fn split_interval(interval: Interval, max: u32, min_tail: u32) -> Vec<Interval> {
    let max = max.max(1);
    if interval.len() < min_tail || interval.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = interval.start;
    while interval.end - start > max {
        chunks.push(Interval::new(start, start + max));
        start += max;
    }

    let tail = interval.end - start;
    if tail >= min_tail {
        chunks.push(Interval::new(start, interval.end));
    } else if let Some(prev) = chunks.pop() {
        let combined = interval.end - prev.start;
        let mid = prev.start + combined.div_ceil(2);
        chunks.push(Interval::new(prev.start, mid));
        chunks.push(Interval::new(mid, interval.end));
    }
    chunks
}
