//! Page placement for each scroll and spread mode
//!
//! A [`Layout`] is recomputed wholesale whenever page sizes, the scroll or
//! spread mode, or the container width change. Boxes are always ordered by
//! page id.

use std::fmt;
use std::str::FromStr;

use pageflow_scheduler::{PageBox, PageId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrollMode {
    /// One column of pages
    #[default]
    Vertical,
    /// One row of pages
    Horizontal,
    /// Rows filled up to the container width
    Wrapped,
    /// Only the current page or spread is laid out
    Page,
}

/// How pages pair up into spreads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpreadMode {
    #[default]
    None,
    /// 1-2, 3-4, ...
    Odd,
    /// 1, 2-3, 4-5, ...
    Even,
}

impl ScrollMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollMode::Vertical => "vertical",
            ScrollMode::Horizontal => "horizontal",
            ScrollMode::Wrapped => "wrapped",
            ScrollMode::Page => "page",
        }
    }
}

impl SpreadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpreadMode::None => "none",
            SpreadMode::Odd => "odd",
            SpreadMode::Even => "even",
        }
    }
}

impl fmt::Display for ScrollMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SpreadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScrollMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vertical" => Ok(ScrollMode::Vertical),
            "horizontal" => Ok(ScrollMode::Horizontal),
            "wrapped" => Ok(ScrollMode::Wrapped),
            "page" => Ok(ScrollMode::Page),
            other => Err(format!("unknown scroll mode '{}'", other)),
        }
    }
}

impl FromStr for SpreadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(SpreadMode::None),
            "odd" => Ok(SpreadMode::Odd),
            "even" => Ok(SpreadMode::Even),
            other => Err(format!("unknown spread mode '{}'", other)),
        }
    }
}

/// First and last page of the spread containing `page`
pub fn spread_range(page: PageId, page_count: u32, mode: SpreadMode) -> (PageId, PageId) {
    if page_count == 0 {
        return (0, 0);
    }
    let page = page.clamp(1, page_count);
    let (start, end) = match mode {
        SpreadMode::None => (page, page),
        SpreadMode::Odd => {
            let start = if page % 2 == 1 { page } else { page - 1 };
            (start, start + 1)
        }
        SpreadMode::Even => {
            if page == 1 {
                (1, 1)
            } else {
                let start = if page % 2 == 0 { page } else { page - 1 };
                (start, start + 1)
            }
        }
    };
    (start, end.min(page_count))
}

/// Inputs of a layout pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub scroll_mode: ScrollMode,
    pub spread_mode: SpreadMode,
    pub rtl: bool,
    /// Space between pages and between rows
    pub gap: f64,
    pub container_width: f64,
    /// Page whose spread is shown in page scroll mode
    pub current_page: PageId,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            scroll_mode: ScrollMode::Vertical,
            spread_mode: SpreadMode::None,
            rtl: false,
            gap: 10.0,
            container_width: 0.0,
            current_page: 1,
        }
    }
}

/// Page boxes plus the scrollable extent they span
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    boxes: Vec<PageBox>,
    width: f64,
    height: f64,
}

impl Layout {
    /// Place pages of the given CSS sizes; `sizes[i]` belongs to page `i + 1`
    pub fn compute(sizes: &[(f64, f64)], options: &LayoutOptions) -> Self {
        let page_count = sizes.len() as u32;
        if page_count == 0 {
            return Self::default();
        }
        let gap = options.gap.max(0.0);

        let groups = group_pages(page_count, options);
        let rows = build_rows(&groups, sizes, gap, options);

        let content_width = rows
            .iter()
            .map(|row| row_width(row, sizes, gap))
            .fold(options.container_width.max(0.0), f64::max);

        let mut boxes = Vec::with_capacity(sizes.len());
        let mut row_top = 0.0;
        for row in &rows {
            let row_height = row
                .iter()
                .map(|&id| size_of(sizes, id).1)
                .fold(0.0, f64::max);
            let mut x = (content_width - row_width(row, sizes, gap)) / 2.0;

            for &id in row {
                let (width, height) = size_of(sizes, id);
                let top = if options.scroll_mode == ScrollMode::Horizontal {
                    row_top + (row_height - height) / 2.0
                } else {
                    row_top
                };
                let left = if options.rtl {
                    content_width - x - width
                } else {
                    x
                };
                boxes.push(PageBox::new(id, left, top, width, height));
                x += width + gap;
            }
            row_top += row_height + gap;
        }
        boxes.sort_by_key(|page_box| page_box.id);

        Self {
            boxes,
            width: content_width,
            height: (row_top - gap).max(0.0),
        }
    }

    pub fn boxes(&self) -> &[PageBox] {
        &self.boxes
    }

    pub fn page_box(&self, id: PageId) -> Option<&PageBox> {
        self.boxes
            .binary_search_by_key(&id, |page_box| page_box.id)
            .ok()
            .and_then(|index| self.boxes.get(index))
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Largest valid scroll offsets for a container of the given size
    pub fn max_scroll(&self, container_width: f64, container_height: f64) -> (f64, f64) {
        (
            (self.width - container_width).max(0.0),
            (self.height - container_height).max(0.0),
        )
    }
}

fn size_of(sizes: &[(f64, f64)], id: PageId) -> (f64, f64) {
    let (w, h) = sizes
        .get((id as usize).saturating_sub(1))
        .copied()
        .unwrap_or((0.0, 0.0));
    (w.max(0.0), h.max(0.0))
}

fn row_width(row: &[PageId], sizes: &[(f64, f64)], gap: f64) -> f64 {
    let pages: f64 = row.iter().map(|&id| size_of(sizes, id).0).sum();
    pages + gap * row.len().saturating_sub(1) as f64
}

/// Spreads that stay together; single pages when spreads are off
fn group_pages(page_count: u32, options: &LayoutOptions) -> Vec<Vec<PageId>> {
    let spread_mode = if options.scroll_mode == ScrollMode::Horizontal {
        SpreadMode::None
    } else {
        options.spread_mode
    };

    let mut groups = Vec::new();
    let mut page = 1;
    while page <= page_count {
        let (start, end) = spread_range(page, page_count, spread_mode);
        groups.push((start..=end).collect::<Vec<_>>());
        page = end + 1;
    }

    if options.scroll_mode == ScrollMode::Page {
        let current = options.current_page.clamp(1, page_count);
        groups.retain(|group| group.contains(&current));
    }
    groups
}

fn build_rows(
    groups: &[Vec<PageId>],
    sizes: &[(f64, f64)],
    gap: f64,
    options: &LayoutOptions,
) -> Vec<Vec<PageId>> {
    match options.scroll_mode {
        ScrollMode::Horizontal => vec![groups.concat()],
        ScrollMode::Vertical | ScrollMode::Page => groups.to_vec(),
        ScrollMode::Wrapped => {
            let limit = options.container_width.max(0.0);
            let mut rows: Vec<Vec<PageId>> = Vec::new();
            let mut current: Vec<PageId> = Vec::new();
            let mut current_width = 0.0;

            for group in groups {
                let group_width = row_width(group, sizes, gap);
                if !current.is_empty() && current_width + gap + group_width > limit {
                    rows.push(std::mem::take(&mut current));
                    current_width = 0.0;
                }
                if !current.is_empty() {
                    current_width += gap;
                }
                current_width += group_width;
                current.extend_from_slice(group);
            }
            if !current.is_empty() {
                rows.push(current);
            }
            rows
        }
    }
}
