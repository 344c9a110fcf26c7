//! Priority rendering queue
//!
//! The queue never holds a list of pending jobs. On every scheduling pass it
//! looks at the visibility report and the render state of every view and
//! picks the single page that should be worked on next: an unfinished visible
//! page first, then a hole inside the visible range, then one or two
//! pre-render candidates in the scroll direction.

use std::time::{Duration, Instant};

use crate::task::RenderError;
use crate::visibility::VisibilityReport;
use crate::PageId;

/// Time without rendering work after which the host is told to clean up
pub const CLEANUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Coarse render state as seen by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderingState {
    Initial,
    Running,
    Paused,
    Finished,
}

/// Identity of a render target
///
/// Page views and thumbnails share one highest-priority designation, so the
/// designation must tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderingId {
    Page(PageId),
    Thumbnail(PageId),
}

impl RenderingId {
    pub fn page(&self) -> PageId {
        match *self {
            RenderingId::Page(id) | RenderingId::Thumbnail(id) => id,
        }
    }
}

/// A view the queue can schedule
pub trait RenderableView {
    /// 1-based page number
    fn id(&self) -> PageId;

    fn rendering_id(&self) -> RenderingId;

    fn rendering_state(&self) -> RenderingState;

    /// Start rendering from the initial state
    fn draw(&mut self) -> Result<(), RenderError>;

    /// Continue a paused render
    fn resume(&mut self);
}

/// Decides which view renders next and tracks the idle deadline
#[derive(Debug, Clone)]
pub struct RenderingQueue {
    highest_priority: Option<RenderingId>,
    idle_deadline: Option<Instant>,
    cleanup_timeout: Duration,
    thumbnails_enabled: bool,
}

impl RenderingQueue {
    pub fn new() -> Self {
        Self {
            highest_priority: None,
            idle_deadline: None,
            cleanup_timeout: CLEANUP_TIMEOUT,
            thumbnails_enabled: false,
        }
    }

    pub fn with_cleanup_timeout(mut self, timeout: Duration) -> Self {
        self.cleanup_timeout = timeout;
        self
    }

    pub fn cleanup_timeout(&self) -> Duration {
        self.cleanup_timeout
    }

    pub fn set_thumbnails_enabled(&mut self, enabled: bool) {
        self.thumbnails_enabled = enabled;
    }

    pub fn thumbnails_enabled(&self) -> bool {
        self.thumbnails_enabled
    }

    /// The view currently designated for active rendering
    pub fn highest_priority(&self) -> Option<RenderingId> {
        self.highest_priority
    }

    pub fn is_highest_priority(&self, id: RenderingId) -> bool {
        self.highest_priority == Some(id)
    }

    /// Drop the designation, e.g. when the designated view is destroyed
    pub fn clear_highest_priority(&mut self) {
        self.highest_priority = None;
    }

    /// Forget the designation and any pending idle deadline
    pub fn reset(&mut self) {
        self.highest_priority = None;
        self.idle_deadline = None;
    }

    pub fn is_view_finished<V: RenderableView>(view: &V) -> bool {
        view.rendering_state() == RenderingState::Finished
    }

    /// Pick the next view to render
    ///
    /// `views[id - 1]` must be the view of page `id`. Visible ids that have
    /// no matching view are logged and skipped.
    pub fn get_highest_priority<V: RenderableView>(
        &self,
        visible: &VisibilityReport,
        views: &[V],
        scrolled_down: bool,
        pre_render_extra: bool,
    ) -> Option<PageId> {
        let (Some(first), Some(last)) = (visible.first, visible.last) else {
            return None;
        };

        for page in visible.iter() {
            match view_for(views, page.id) {
                Some(view) if !Self::is_view_finished(view) => return Some(page.id),
                Some(_) => {}
                None => log::error!("visible page {} has no view", page.id),
            }
        }

        // Holes: ids inside the visible range that are not themselves visible
        let span = last.id.saturating_sub(first.id);
        if span as usize + 1 > visible.len() {
            for i in 1..span {
                let hole_id = if scrolled_down {
                    first.id + i
                } else {
                    last.id - i
                };
                if visible.contains(hole_id) {
                    continue;
                }
                match view_for(views, hole_id) {
                    Some(view) if !Self::is_view_finished(view) => return Some(hole_id),
                    Some(_) => {}
                    None => log::error!("hole page {} has no view", hole_id),
                }
            }
        }

        // Pre-render just past the visible range
        let mut candidate = if scrolled_down {
            Some(last.id + 1)
        } else {
            first.id.checked_sub(1)
        };
        let attempts = if pre_render_extra { 2 } else { 1 };
        for _ in 0..attempts {
            let Some(id) = candidate else {
                break;
            };
            if let Some(view) = view_for(views, id) {
                if !Self::is_view_finished(view) {
                    return Some(id);
                }
            }
            candidate = if scrolled_down {
                id.checked_add(1)
            } else {
                id.checked_sub(1)
            };
        }

        None
    }

    /// Start or continue rendering `view`
    ///
    /// Returns `false` only when the view is already finished.
    pub fn render_view<V: RenderableView>(&mut self, view: &mut V) -> bool {
        match view.rendering_state() {
            RenderingState::Finished => false,
            RenderingState::Paused => {
                self.highest_priority = Some(view.rendering_id());
                view.resume();
                true
            }
            RenderingState::Running => {
                self.highest_priority = Some(view.rendering_id());
                true
            }
            RenderingState::Initial => {
                self.highest_priority = Some(view.rendering_id());
                if let Err(err) = view.draw() {
                    log::warn!("failed to start rendering {:?}: {}", view.rendering_id(), err);
                }
                true
            }
        }
    }

    pub fn idle_deadline(&self) -> Option<Instant> {
        self.idle_deadline
    }

    pub fn idle_pending(&self) -> bool {
        self.idle_deadline.is_some()
    }

    pub fn cancel_idle(&mut self) {
        self.idle_deadline = None;
    }

    /// Arm the idle deadline at `now + cleanup_timeout`, replacing any pending one
    pub fn schedule_idle(&mut self, now: Instant) {
        self.idle_deadline = Some(now + self.cleanup_timeout);
    }

    /// Consume the idle deadline if it has passed
    pub fn take_idle(&mut self, now: Instant) -> bool {
        match self.idle_deadline {
            Some(deadline) if now >= deadline => {
                self.idle_deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for RenderingQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn view_for<V: RenderableView>(views: &[V], id: PageId) -> Option<&V> {
    let index = (id as usize).checked_sub(1)?;
    views.get(index).filter(|view| view.id() == id)
}
