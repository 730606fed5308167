//! Upload names for the `{batch}-slice-{N}` convention.
//!
//! Every uploaded slice is named after its batch plus a 1-based position:
//! - batch `summer-sale`, slice 1 → `summer-sale-slice-1`
//! - batch `summer-sale`, slice 12 → `summer-sale-slice-12`
//!
//! Downstream tooling matches uploads back to slices by this suffix, so the
//! format is fixed. The batch part comes from the request, or from the frame
//! name when the request has none.

/// Batch name used when neither the request nor the frame gives one.
pub const FALLBACK_BATCH_NAME: &str = "frame";

const SLICE_MARKER: &str = "-slice-";

/// Upload name for the slice at 1-based `index`.
pub fn slice_upload_name(batch: &str, index: usize) -> String {
    format!("{batch}{SLICE_MARKER}{index}")
}

/// Pick the batch name: the explicit one if it has any usable characters,
/// otherwise the slugified frame name, otherwise [`FALLBACK_BATCH_NAME`].
pub fn batch_name(explicit: Option<&str>, frame_name: &str) -> String {
    explicit
        .map(slugify)
        .filter(|s| !s.is_empty())
        .or_else(|| Some(slugify(frame_name)).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| FALLBACK_BATCH_NAME.to_string())
}

/// Lowercase, with every run of non-alphanumeric characters turned into a
/// single dash and no leading or trailing dashes.
///
/// - `"Hero / Summer Sale"` → `"hero-summer-sale"`
/// - `"  Frame 12  "` → `"frame-12"`
/// - `"***"` → `""`
pub fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
