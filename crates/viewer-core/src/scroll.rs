use pageflow_scheduler::PageId;

/// Scroll offsets and the direction of the last movement on each axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollState {
    pub left: f64,
    pub top: f64,
    /// Last vertical movement went down
    pub down: bool,
    /// Last horizontal movement went right
    pub right: bool,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            down: true,
            right: true,
        }
    }
}

impl ScrollState {
    /// Move to a new offset; an axis that did not move keeps its direction
    pub fn update(&mut self, left: f64, top: f64) {
        if left != self.left {
            self.right = left > self.left;
        }
        if top != self.top {
            self.down = top > self.top;
        }
        self.left = left;
        self.top = top;
    }
}

/// Navigation direction in page scroll mode, where offsets do not move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageModeState {
    pub previous_page: PageId,
    pub scroll_down: bool,
}

impl Default for PageModeState {
    fn default() -> Self {
        Self {
            previous_page: 1,
            scroll_down: true,
        }
    }
}

impl PageModeState {
    pub fn navigate(&mut self, from: PageId, to: PageId) {
        self.previous_page = from;
        self.scroll_down = to >= from;
    }
}
