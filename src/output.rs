//! CLI output formatting for both commands.
//!
//! # Output Format
//!
//! ## Suggest
//!
//! ```text
//! Body 100..1900 (max slice height 1200)
//! 001 y=100 h=1200
//! 002 y=1300 h=600
//! ```
//!
//! ## Export
//!
//! ```text
//! summer-sale → acme-corp (2 slices, auto)
//! 001 y=100 h=1200 image/jpeg q85 812.40 KB → 301.22 KB
//!     https://i.example/summer-sale-slice-1.jpg
//!     Link: https://shop.example/sale
//! 002 y=1300 h=600 image/png 40.12 KB
//!     https://i.example/summer-sale-slice-2.png
//!
//! Uploaded 2 slices, 341.34 KB total (target 400 KB each)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure and do no I/O.

use crate::pipeline::SuggestResponse;
use crate::types::{SliceBatch, SliceRecord};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {one}s")
    }
}

// ============================================================================
// Suggest
// ============================================================================

pub fn format_suggest_output(response: &SuggestResponse) -> Vec<String> {
    if response.slices.is_empty() {
        return vec![format!(
            "Body {}..{} is empty, nothing to slice",
            response.body_top, response.body_bottom
        )];
    }

    let mut lines = vec![format!(
        "Body {}..{} (max slice height {})",
        response.body_top, response.body_bottom, response.max_slice_height
    )];
    for (i, slice) in response.slices.iter().enumerate() {
        lines.push(format!(
            "{} y={} h={}",
            format_index(i + 1),
            slice.y,
            slice.height
        ));
    }
    lines
}

pub fn print_suggest_output(response: &SuggestResponse) {
    for line in format_suggest_output(response) {
        println!("{}", line);
    }
}

// ============================================================================
// Export
// ============================================================================

/// Header line of one slice: geometry, format, and sizes.
///
/// Full-width slices show only their vertical span.
///
/// ```text
/// 001 y=100 h=1200 image/jpeg q85 812.40 KB → 301.22 KB
/// 002 x=0 y=1300 w=300 h=600 image/png 40.12 KB
/// ```
fn slice_line(slice: &SliceRecord, frame_width: u32) -> String {
    let geometry = if slice.x == 0 && slice.width == frame_width {
        format!("y={} h={}", slice.y, slice.height)
    } else {
        format!(
            "x={} y={} w={} h={}",
            slice.x, slice.y, slice.width, slice.height
        )
    };
    let sizes = match slice.jpeg_quality {
        Some(q) => format!(
            "q{} {:.2} KB → {:.2} KB",
            q, slice.original_kb, slice.compressed_kb
        ),
        None => format!("{:.2} KB", slice.compressed_kb),
    };
    format!(
        "{} {} {} {}",
        format_index(slice.index),
        geometry,
        slice.mime_type,
        sizes
    )
}

pub fn format_batch_output(batch: &SliceBatch, frame_width: u32) -> Vec<String> {
    let mode = if batch.manual_mode { "manual" } else { "auto" };
    let mut lines = vec![format!(
        "{} → {} ({}, {})",
        batch.batch_name,
        batch.account_id,
        plural(batch.slice_count, "slice"),
        mode
    )];

    for slice in &batch.slices {
        lines.push(slice_line(slice, frame_width));
        lines.push(format!("{}{}", indent(1), slice.image_url));
        if !slice.url.is_empty() {
            lines.push(format!("{}Link: {}", indent(1), slice.url));
        }
        if !slice.label.is_empty() {
            lines.push(format!("{}Label: {}", indent(1), slice.label));
        }
    }

    let total: f64 = batch.slices.iter().map(|s| s.compressed_kb).sum();
    lines.push(String::new());
    lines.push(format!(
        "Uploaded {}, {:.2} KB total (target {} KB each)",
        plural(batch.slice_count, "slice"),
        total,
        batch.target_slice_kb
    ));
    lines
}

pub fn print_batch_output(batch: &SliceBatch, frame_width: u32) {
    for line in format_batch_output(batch, frame_width) {
        println!("{}", line);
    }
}
