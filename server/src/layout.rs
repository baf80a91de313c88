//! Roadmap geometry for the `/resources` page.
//!
//! Items sit on a single horizontal row; the wave is purely decorative and
//! comes from the path alone. Output is a pure function of the input order.

use crate::models::Resource;
use serde::Serialize;
use std::fmt::Write;

pub const STEP_X: i64 = 420;
pub const SVG_HEIGHT: i64 = 600;
pub const Y_PCT: i64 = 58;
pub const CANVAS_PADDING: i64 = 200;

const SEGMENT_WIDTH: i64 = 300;
const WAVE_AMPLITUDE: i64 = 50;
const END_INSET: i64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutNode {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub order_index: i64,
    pub x: i64,
    pub y_pct: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchPath {
    pub branch: String,
    pub d: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Roadmap {
    pub layout: Vec<LayoutNode>,
    pub branch_paths: Vec<BranchPath>,
    pub canvas_width: i64,
    pub svg_height: i64,
}

/// Canvas width for `count` items. An empty roadmap is as wide as one item.
pub fn canvas_width(count: usize) -> i64 {
    (count.max(1) as i64) * STEP_X + CANVAS_PADDING
}

/// Vertical midline in pixels.
pub fn midline() -> i64 {
    (SVG_HEIGHT as f64 * (Y_PCT as f64 / 100.0)) as i64
}

/// `M 0 <mid>` followed by one `S` instruction per segment, flipping the
/// control-point offset on every segment.
pub fn wave_path(total_width: i64) -> String {
    let y = midline();
    let end = total_width - END_INSET;
    let mut d = String::new();
    let _ = write!(d, "M 0 {}", y);

    let mut x = 0;
    let mut toggle = 1;
    while x < end {
        let cx1 = x + SEGMENT_WIDTH / 2;
        let cy1 = y - WAVE_AMPLITUDE * toggle;
        let x2 = end.min(x + SEGMENT_WIDTH);
        let cy2 = y + WAVE_AMPLITUDE * toggle;
        let _ = write!(d, " S {} {}, {} {}", cx1, cy1, x2, cy2);
        x += SEGMENT_WIDTH;
        toggle = -toggle;
    }
    d
}

/// Lays out `items`, which must already be sorted by `order_index`.
pub fn build(branch: &str, items: &[Resource]) -> Roadmap {
    let layout = items
        .iter()
        .enumerate()
        .map(|(i, r)| LayoutNode {
            id: r.id,
            title: r.title.clone(),
            url: r.url.clone(),
            order_index: r.order_index,
            x: i as i64 * STEP_X,
            y_pct: Y_PCT,
        })
        .collect();

    let canvas_width = canvas_width(items.len());
    Roadmap {
        layout,
        branch_paths: vec![BranchPath {
            branch: branch.to_string(),
            d: wave_path(canvas_width),
        }],
        canvas_width,
        svg_height: SVG_HEIGHT,
    }
}
