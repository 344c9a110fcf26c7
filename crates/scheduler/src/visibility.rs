//! Viewport visibility calculation
//!
//! Maps a viewport rectangle and the ordered page boxes of the current layout
//! to the set of visible pages, with the visible percentage of each one.
//!
//! Page boxes must be in document-flow order: non-decreasing `top` for
//! vertical and wrapped layouts, non-decreasing `left` for horizontal
//! left-to-right layouts and non-increasing `left` for right-to-left ones.
//! The first visible page is located with a binary search, so a report costs
//! `O(log n + visible)` rather than a scan over thousands of pages.

use std::collections::HashSet;

use crate::PageId;

/// Rectangle of one page within the scrollable document flow (CSS pixels)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    /// Page number
    pub id: PageId,

    /// Offset of the left edge from the start of the scroll area
    pub left: f64,

    /// Offset of the top edge from the start of the scroll area
    pub top: f64,

    /// Page width
    pub width: f64,

    /// Page height
    pub height: f64,
}

impl PageBox {
    /// Create a new page box
    pub fn new(id: PageId, left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            id,
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// The visible window onto the scroll area: scroll offsets plus client size
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewportRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
            || !self.left.is_finite()
            || !self.top.is_finite()
            || !self.width.is_finite()
            || !self.height.is_finite()
    }
}

/// Flags controlling how the report is computed and ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibilityOptions {
    /// Order entries by descending visible percentage (ties by ascending id)
    pub sort_by_visibility: bool,

    /// Pages flow left to right instead of top to bottom
    pub horizontal: bool,

    /// Horizontal flow runs right to left
    pub rtl: bool,
}

/// Visible part of a partially visible page, in page-local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleArea {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// One visible page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisiblePage {
    pub id: PageId,

    /// Left edge of the page box
    pub x: f64,

    /// Top edge of the page box
    pub y: f64,

    /// Visible share of the page area, truncated to an integer percent
    pub percent: u32,

    /// Visible share of the page width, truncated to an integer percent
    pub width_percent: u32,

    /// `None` when the whole page is visible
    pub visible_area: Option<VisibleArea>,
}

/// Result of a visibility pass
///
/// `first` and `last` are the first and last visible pages in document
/// order, regardless of how `pages` is sorted. Both are `None` exactly when
/// no page is visible.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisibilityReport {
    pub first: Option<VisiblePage>,
    pub last: Option<VisiblePage>,
    pub pages: Vec<VisiblePage>,
    pub ids: HashSet<PageId>,
}

impl VisibilityReport {
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.ids.contains(&id)
    }

    pub fn get(&self, id: PageId) -> Option<&VisiblePage> {
        self.pages.iter().find(|page| page.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VisiblePage> {
        self.pages.iter()
    }
}

/// Index of the first item satisfying `condition`, assuming the condition is
/// monotonic over `items` (all `false` entries precede all `true` ones).
///
/// Returns `items.len()` when no item satisfies the condition.
pub fn binary_search_first_item<T>(items: &[T], condition: impl Fn(&T) -> bool, start: usize) -> usize {
    let mut min_index = start;
    let Some(mut max_index) = items.len().checked_sub(1) else {
        return 0;
    };

    if !condition(&items[max_index]) {
        return items.len();
    }
    if min_index >= items.len() || condition(&items[min_index]) {
        return min_index.min(max_index);
    }

    while min_index < max_index {
        let current = (min_index + max_index) >> 1;
        if condition(&items[current]) {
            max_index = current;
        } else {
            min_index = current + 1;
        }
    }
    min_index
}

/// Walk back from `index` to the first page of the visual row it belongs to.
///
/// In wrapped layouts a row holds several pages with different heights, so
/// the binary search can land on a page whose row started earlier: an
/// earlier, taller sibling may still reach into the viewport. The row top is
/// the found page's top, or the previous page's top when the found page
/// starts at or below the viewport top (it may be the first page of the next
/// row). Every earlier page whose bottom extends past that row top is part of
/// the same or the previous row and must be rescanned.
fn backtrack_before_all_visible_elements(index: usize, boxes: &[PageBox], top: f64) -> usize {
    if index < 2 {
        return index;
    }

    let mut row_top = boxes[index].top;
    if row_top >= top {
        row_top = boxes[index - 1].top;
    }

    let mut first = index;
    for i in (0..=index - 2).rev() {
        if boxes[i].bottom() <= row_top {
            break;
        }
        first = i;
    }
    first
}

/// Compute the visibility report for `viewport` over `boxes`.
///
/// Never panics. Degenerate viewports and pages with a non-positive size are
/// treated as not visible.
pub fn visible_pages(
    viewport: &ViewportRect,
    boxes: &[PageBox],
    options: VisibilityOptions,
) -> VisibilityReport {
    let mut report = VisibilityReport::default();
    if boxes.is_empty() || viewport.is_degenerate() {
        return report;
    }

    let top = viewport.top;
    let bottom = viewport.bottom();
    let left = viewport.left;
    let right = viewport.right();

    let mut first_index = if options.horizontal {
        if options.rtl {
            binary_search_first_item(boxes, |page| page.left < right, 0)
        } else {
            binary_search_first_item(boxes, |page| page.right() > left, 0)
        }
    } else {
        binary_search_first_item(boxes, |page| page.bottom() > top, 0)
    };

    if first_index > 0 && first_index < boxes.len() && !options.horizontal {
        first_index = backtrack_before_all_visible_elements(first_index, boxes, top);
    }

    // Once a page reaches the viewport bottom, any page starting below that
    // page's bottom can no longer be visible.
    let mut last_edge = if options.horizontal { Some(right) } else { None };

    for page in &boxes[first_index.min(boxes.len())..] {
        let page_right = page.right();
        let page_bottom = page.bottom();

        match last_edge {
            None => {
                if page_bottom >= bottom {
                    last_edge = Some(page_bottom);
                }
            }
            Some(edge) => {
                let leading = if options.horizontal { page.left } else { page.top };
                if leading > edge {
                    break;
                }
            }
        }

        if page_bottom <= top || page.top >= bottom || page_right <= left || page.left >= right {
            continue;
        }
        if !(page.width > 0.0 && page.height > 0.0) {
            continue;
        }

        let min_y = (top - page.top).max(0.0);
        let min_x = (left - page.left).max(0.0);
        let hidden_height = min_y + (page_bottom - bottom).max(0.0);
        let hidden_width = min_x + (page_right - right).max(0.0);

        let visible_height = page.height - hidden_height;
        let visible_width = page.width - hidden_width;
        // Multiply before dividing; 290/1000 must report 29, not 28.
        // An unclipped axis contributes exactly 1.
        let height_share = visible_height * 100.0 / page.height;
        let width_share = visible_width * 100.0 / page.width;
        let percent = match (hidden_height > 0.0, hidden_width > 0.0) {
            (false, false) => 100,
            (true, false) => truncate_percent(height_share),
            (false, true) => truncate_percent(width_share),
            (true, true) => {
                truncate_percent(visible_height * visible_width * 100.0 / page.height / page.width)
            }
        };
        let width_percent = if hidden_width > 0.0 {
            truncate_percent(width_share)
        } else {
            100
        };

        let visible_area = (percent != 100).then(|| VisibleArea {
            min_x,
            min_y,
            max_x: page_right.min(right) - page.left,
            max_y: page_bottom.min(bottom) - page.top,
        });

        report.pages.push(VisiblePage {
            id: page.id,
            x: page.left,
            y: page.top,
            percent,
            width_percent,
            visible_area,
        });
        report.ids.insert(page.id);
    }

    report.first = report.pages.first().copied();
    report.last = report.pages.last().copied();

    if options.sort_by_visibility {
        report
            .pages
            .sort_by(|a, b| b.percent.cmp(&a.percent).then(a.id.cmp(&b.id)));
    }

    report
}

fn truncate_percent(percent: f64) -> u32 {
    if percent.is_finite() {
        percent.clamp(0.0, 100.0) as u32
    } else {
        0
    }
}
