//! Viewer orchestration
//!
//! The [`Viewer`] owns every [`PageView`], the [`ViewBuffer`] of realized
//! pages and the [`RenderingQueue`]. Hosts feed it scroll, resize and zoom
//! input and drive rendering cooperatively:
//!
//! ```text
//! input (scroll_to / resize / set_scale ...) -> update -> render_highest_priority
//! host loop: pump(now, budget) ... poll_timers(now) ... drain_events()
//! ```
//!
//! Nothing here blocks or spawns threads. A render task only advances inside
//! [`Viewer::pump`], one bounded slice at a time.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pageflow_cache::{BufferStats, ViewBuffer};
use pageflow_scheduler::{
    visible_pages, PageId, RenderableView, RenderingId, RenderingQueue, RenderingState,
    SliceBudget, Surface, ViewportRect, VisibilityOptions, VisibilityReport,
};

use crate::error::ViewerError;
use crate::events::{Location, LocationScale, ViewerEvent};
use crate::geometry::{normalize_rotation, PageSize, PageViewport};
use crate::layout::{spread_range, Layout, LayoutOptions, ScrollMode, SpreadMode};
use crate::page_view::{PageView, SliceResult, UpdateArgs, UpdateOutcome};
use crate::scale::{
    clamp_scale, is_same_scale, resolve_preset, FitTarget, ScalePreset, ScaleValue, DEFAULT_SCALE,
};
use crate::scroll::{PageModeState, ScrollState};
use crate::source::{PageSource, ViewerContext};
use crate::thumbnails::{ThumbnailStrip, ThumbnailView};

/// Point of the current page kept under the viewport's top-left corner
/// across a zoom, in unscaled CSS pixels
#[derive(Debug, Clone, Copy)]
struct ScrollAnchor {
    page: PageId,
    x: f64,
    y: f64,
}

pub struct Viewer {
    ctx: ViewerContext,
    pages: Vec<PageView>,
    buffer: ViewBuffer<PageId>,
    queue: RenderingQueue,
    thumbnails: ThumbnailStrip,
    layout: Layout,
    scroll: ScrollState,
    page_mode: PageModeState,
    container_width: f64,
    container_height: f64,
    /// 0 until a document sets a scale
    current_scale: f64,
    current_scale_value: ScaleValue,
    rotation: u16,
    scroll_mode: ScrollMode,
    spread_mode: SpreadMode,
    rtl: bool,
    current_page: PageId,
    location: Option<Location>,
    scale_settle_deadline: Option<Instant>,
    visible: VisibilityReport,
    events: Vec<ViewerEvent>,
}

impl Viewer {
    /// Build a viewer for the context's document
    ///
    /// Nothing is visible until the host reports a container size with
    /// [`Viewer::resize`].
    pub fn new(ctx: ViewerContext) -> Result<Self, ViewerError> {
        ctx.config.validate()?;

        let cache_size = ctx.config.cache_size;
        let default_scale = ctx.config.default_scale;
        let scroll_mode = ctx.config.scroll_mode;
        let spread_mode = ctx.config.spread_mode;
        let rtl = ctx.config.rtl;
        let mut queue = RenderingQueue::new().with_cleanup_timeout(ctx.config.cleanup_timeout());
        queue.set_thumbnails_enabled(ctx.config.thumbnails_enabled);

        let mut viewer = Self {
            pages: Vec::new(),
            buffer: ViewBuffer::new(cache_size),
            queue,
            thumbnails: ThumbnailStrip::new(&ctx),
            layout: Layout::default(),
            scroll: ScrollState::default(),
            page_mode: PageModeState::default(),
            container_width: 0.0,
            container_height: 0.0,
            current_scale: 0.0,
            current_scale_value: default_scale,
            rotation: 0,
            scroll_mode,
            spread_mode,
            rtl,
            current_page: 0,
            location: None,
            scale_settle_deadline: None,
            visible: VisibilityReport::default(),
            events: Vec::new(),
            ctx,
        };
        viewer.load_pages();
        Ok(viewer)
    }

    /// Replace the document, discarding every view and pending render
    pub fn set_document(&mut self, source: Arc<dyn PageSource>, now: Instant) {
        self.teardown();
        self.ctx.source = source;
        self.load_pages();
        self.update(now);
    }

    fn teardown(&mut self) {
        for page in &mut self.pages {
            page.destroy();
        }
        self.pages.clear();
        self.thumbnails.cancel_all();
        self.buffer = ViewBuffer::new(self.ctx.config.cache_size);
        self.queue.reset();
    }

    fn load_pages(&mut self) {
        let count = self.ctx.source.page_count();
        let sizes: Vec<PageSize> = (1..=count)
            .map(|id| {
                self.ctx.source.page_size(id).unwrap_or_else(|| {
                    log::warn!("page {} reports no size, assuming US Letter", id);
                    PageSize::letter()
                })
            })
            .collect();

        self.rotation = 0;
        self.current_scale = 0.0;
        self.current_scale_value = self.ctx.config.default_scale;
        self.pages = sizes
            .iter()
            .enumerate()
            .map(|(index, size)| PageView::new(&self.ctx, index as PageId + 1, *size, DEFAULT_SCALE, 0))
            .collect();
        self.thumbnails.set_document(&self.ctx, &sizes, 0);

        self.current_page = if count > 0 { 1 } else { 0 };
        self.scroll = ScrollState::default();
        self.page_mode = PageModeState::default();
        self.location = None;
        self.visible = VisibilityReport::default();
        self.scale_settle_deadline = None;
        self.relayout();

        if count > 0 {
            log::info!("document loaded with {} pages", count);
            if let Err(err) = self.apply_scale_value(self.current_scale_value, true, None) {
                log::debug!("initial scale not resolved yet: {}", err);
                self.apply_scale(DEFAULT_SCALE, None, true, None);
            }
        }
    }

    /// Report a new container size; preset scales are resolved again
    pub fn resize(&mut self, width: f64, height: f64, now: Instant) {
        self.container_width = finite_or_zero(width);
        self.container_height = finite_or_zero(height);
        self.relayout();

        if matches!(self.current_scale_value, ScaleValue::Preset(_)) && !self.pages.is_empty() {
            if let Err(err) = self.apply_scale_value(self.current_scale_value, false, None) {
                log::debug!("scale not re-resolved after resize: {}", err);
            }
        }
        self.clamp_scroll();
        self.update(now);
    }

    /// Scroll to the given offsets, clamped to the layout
    pub fn scroll_to(&mut self, left: f64, top: f64, now: Instant) {
        self.set_scroll(left, top);
        self.update(now);
    }

    pub fn set_scale(&mut self, scale: f64, now: Instant) -> Result<(), ViewerError> {
        self.set_scale_value(ScaleValue::Value(scale), now)
    }

    /// Apply a numeric or preset scale; an unchanged scale is a no-op
    pub fn set_scale_value(&mut self, value: ScaleValue, now: Instant) -> Result<(), ViewerError> {
        if self.apply_scale_value(value, false, None)? {
            self.update(now);
        }
        Ok(())
    }

    /// Multiply the scale as part of a zoom gesture
    ///
    /// The result is rounded to two decimals. Pages keep showing scaled
    /// previews until the configured drawing delay has passed without
    /// another zoom; [`Viewer::poll_timers`] then re-renders them.
    pub fn zoom_by(&mut self, factor: f64, now: Instant) -> Result<(), ViewerError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ViewerError::InvalidScale(factor.to_string()));
        }
        if self.pages.is_empty() {
            return Err(ViewerError::NoDocument);
        }

        let scale = clamp_scale((self.current_scale * factor * 100.0).round() / 100.0);
        let delay = self.ctx.config.zoom_drawing_delay();
        let drawing_delay = (!delay.is_zero()).then_some(delay);

        self.current_scale_value = ScaleValue::Value(scale);
        if self.apply_scale(scale, None, false, drawing_delay) {
            if let Some(delay) = drawing_delay.filter(|delay| *delay < Duration::from_secs(1)) {
                self.scale_settle_deadline = Some(now + delay);
            }
            self.update(now);
        }
        Ok(())
    }

    fn apply_scale_value(
        &mut self,
        value: ScaleValue,
        no_scroll: bool,
        drawing_delay: Option<Duration>,
    ) -> Result<bool, ViewerError> {
        let (scale, preset) = match value {
            ScaleValue::Value(scale) => {
                if !scale.is_finite() || scale <= 0.0 {
                    return Err(ViewerError::InvalidScale(scale.to_string()));
                }
                (clamp_scale(scale), None)
            }
            ScaleValue::Preset(preset) => {
                if self.pages.is_empty() {
                    self.current_scale_value = value;
                    return Ok(false);
                }
                let target = self.fit_target().ok_or(ViewerError::NoDocument)?;
                let scale = resolve_preset(preset, &target).ok_or_else(|| {
                    ViewerError::InvalidScale(format!(
                        "{} does not fit a {}x{} container",
                        preset, self.container_width, self.container_height
                    ))
                })?;
                (scale, Some(preset))
            }
        };

        self.current_scale_value = value;
        Ok(self.apply_scale(scale, preset, no_scroll, drawing_delay))
    }

    fn fit_target(&self) -> Option<FitTarget> {
        let page = self.pages.get(page_index(self.current_page)?)?;
        let viewport = PageViewport::new(page.id(), page.size(), 1.0, self.rotation);
        let horizontal = self.scroll_mode == ScrollMode::Horizontal;
        Some(FitTarget {
            container_width: self.container_width,
            container_height: self.container_height,
            page_width: viewport.width,
            page_height: viewport.height,
            two_page_width: self.spread_mode != SpreadMode::None && !horizontal,
            horizontal,
        })
    }

    /// Returns whether the scale actually changed
    fn apply_scale(
        &mut self,
        scale: f64,
        preset: Option<ScalePreset>,
        no_scroll: bool,
        drawing_delay: Option<Duration>,
    ) -> bool {
        if is_same_scale(self.current_scale, scale) {
            return false;
        }

        let anchor = if no_scroll { None } else { self.scroll_anchor() };
        self.current_scale = scale;
        self.scale_settle_deadline = None;
        self.update_pages(UpdateArgs {
            scale,
            rotation: self.rotation,
            drawing_delay,
        });
        self.relayout();
        match anchor {
            Some(anchor) => self.restore_anchor(anchor),
            None => self.clamp_scroll(),
        }

        log::debug!("scale changed to {}", scale);
        self.events.push(ViewerEvent::ScaleChanged { scale, preset });
        true
    }

    fn update_pages(&mut self, args: UpdateArgs) {
        for page in &mut self.pages {
            if page.update(args) == UpdateOutcome::CssOnly {
                self.events.push(scaled_preview(page.id()));
            }
        }
    }

    fn scroll_anchor(&self) -> Option<ScrollAnchor> {
        if self.current_scale <= 0.0 {
            return None;
        }
        let page_box = self.layout.page_box(self.current_page)?;
        Some(ScrollAnchor {
            page: self.current_page,
            x: (self.scroll.left - page_box.left) / self.current_scale,
            y: (self.scroll.top - page_box.top) / self.current_scale,
        })
    }

    fn restore_anchor(&mut self, anchor: ScrollAnchor) {
        match self.layout.page_box(anchor.page).copied() {
            Some(page_box) => self.set_scroll(
                page_box.left + anchor.x * self.current_scale,
                page_box.top + anchor.y * self.current_scale,
            ),
            None => self.clamp_scroll(),
        }
    }

    /// Rotate every page by a multiple of 90 degrees
    pub fn set_rotation(&mut self, rotation: i32, now: Instant) -> Result<(), ViewerError> {
        let rotation = normalize_rotation(rotation).ok_or(ViewerError::InvalidRotation(rotation))?;
        if rotation == self.rotation {
            return Ok(());
        }

        let page = self.current_page;
        self.rotation = rotation;
        self.update_pages(UpdateArgs {
            scale: self.current_scale,
            rotation,
            drawing_delay: None,
        });
        self.thumbnails.set_rotation(rotation);
        self.relayout();
        self.refresh_preset();

        self.events.push(ViewerEvent::RotationChanged { rotation });
        self.scroll_page_into_view(page);
        self.update(now);
        Ok(())
    }

    pub fn set_scroll_mode(&mut self, mode: ScrollMode, now: Instant) {
        if mode == self.scroll_mode {
            return;
        }
        let page = self.current_page;
        self.scroll_mode = mode;
        if mode == ScrollMode::Page {
            self.page_mode = PageModeState {
                previous_page: page,
                scroll_down: true,
            };
        }
        self.relayout_keeping(page, now);
    }

    pub fn set_spread_mode(&mut self, mode: SpreadMode, now: Instant) {
        if mode == self.spread_mode {
            return;
        }
        let page = self.current_page;
        self.spread_mode = mode;
        self.relayout_keeping(page, now);
    }

    fn relayout_keeping(&mut self, page: PageId, now: Instant) {
        self.relayout();
        self.refresh_preset();
        self.scroll_page_into_view(page);
        self.update(now);
    }

    /// Resolve a preset scale again after a layout change
    fn refresh_preset(&mut self) {
        if matches!(self.current_scale_value, ScaleValue::Preset(_)) && !self.pages.is_empty() {
            if let Err(err) = self.apply_scale_value(self.current_scale_value, true, None) {
                log::debug!("scale not re-resolved after layout change: {}", err);
            }
        }
    }

    pub fn go_to_page(&mut self, page: PageId, now: Instant) -> Result<(), ViewerError> {
        let page_count = self.page_count();
        if page == 0 || page > page_count {
            return Err(ViewerError::PageOutOfRange { page, page_count });
        }

        if self.scroll_mode == ScrollMode::Page {
            self.page_mode.navigate(self.current_page, page);
        }
        self.set_current_page(page);
        if self.scroll_mode == ScrollMode::Page {
            self.relayout();
        }
        self.scroll_page_into_view(page);
        self.update(now);
        Ok(())
    }

    /// Advance by one spread; returns `false` on the last one
    pub fn next_page(&mut self, now: Instant) -> bool {
        let page_count = self.page_count();
        if page_count == 0 {
            return false;
        }
        let (_, end) = spread_range(self.current_page, page_count, self.navigation_spread());
        if end >= page_count {
            return false;
        }
        self.go_to_page(end + 1, now).is_ok()
    }

    /// Go back by one spread; returns `false` on the first one
    pub fn previous_page(&mut self, now: Instant) -> bool {
        let page_count = self.page_count();
        if page_count == 0 {
            return false;
        }
        let spread = self.navigation_spread();
        let (start, _) = spread_range(self.current_page, page_count, spread);
        if start <= 1 {
            return false;
        }
        let (target, _) = spread_range(start - 1, page_count, spread);
        self.go_to_page(target, now).is_ok()
    }

    fn navigation_spread(&self) -> SpreadMode {
        if self.scroll_mode == ScrollMode::Horizontal {
            SpreadMode::None
        } else {
            self.spread_mode
        }
    }

    fn scroll_page_into_view(&mut self, page: PageId) {
        let Some(page_box) = self.layout.page_box(page).copied() else {
            return;
        };
        match self.scroll_mode {
            ScrollMode::Horizontal => self.set_scroll(page_box.left, self.scroll.top),
            _ => self.set_scroll(self.scroll.left, page_box.top),
        }
    }

    fn relayout(&mut self) {
        let sizes: Vec<(f64, f64)> = self.pages.iter().map(PageView::css_size).collect();
        let options = LayoutOptions {
            scroll_mode: self.scroll_mode,
            spread_mode: self.spread_mode,
            rtl: self.rtl,
            gap: self.ctx.config.page_gap,
            container_width: self.container_width,
            current_page: self.current_page.max(1),
        };
        self.layout = Layout::compute(&sizes, &options);
    }

    fn set_scroll(&mut self, left: f64, top: f64) {
        let (max_left, max_top) = self.layout.max_scroll(self.container_width, self.container_height);
        let left = if left.is_finite() { left } else { self.scroll.left };
        let top = if top.is_finite() { top } else { self.scroll.top };
        self.scroll.update(left.clamp(0.0, max_left), top.clamp(0.0, max_top));
    }

    fn clamp_scroll(&mut self) {
        self.set_scroll(self.scroll.left, self.scroll.top);
    }

    fn compute_visible(&self) -> VisibilityReport {
        let horizontal = self.scroll_mode == ScrollMode::Horizontal;
        let viewport = ViewportRect::new(
            self.scroll.left,
            self.scroll.top,
            self.container_width,
            self.container_height,
        );
        visible_pages(
            &viewport,
            self.layout.boxes(),
            VisibilityOptions {
                sort_by_visibility: true,
                horizontal,
                rtl: horizontal && self.rtl,
            },
        )
    }

    /// Recompute visibility, trim the buffer, schedule rendering and publish
    /// the current page and location
    pub fn update(&mut self, now: Instant) {
        self.visible = self.compute_visible();
        if self.visible.is_empty() {
            return;
        }

        let capacity = self.ctx.config.cache_size.max(2 * self.visible.len() + 1);
        let pages = &mut self.pages;
        self.buffer
            .resize(capacity, &self.visible.ids, |evicted| destroy_page(pages, evicted));

        self.schedule(now);
        self.update_current_page();
        self.update_location();
    }

    fn update_current_page(&mut self) {
        let simple_layout = self.spread_mode == SpreadMode::None
            && matches!(self.scroll_mode, ScrollMode::Vertical | ScrollMode::Page);

        let mut still_fully_visible = false;
        if simple_layout {
            for page in self.visible.iter() {
                if page.percent < 100 {
                    break;
                }
                if page.id == self.current_page {
                    still_fully_visible = true;
                    break;
                }
            }
        }

        if !still_fully_visible {
            if let Some(id) = self.visible.pages.first().map(|page| page.id) {
                self.set_current_page(id);
            }
        }
    }

    fn set_current_page(&mut self, page: PageId) {
        if page != self.current_page {
            let previous = std::mem::replace(&mut self.current_page, page);
            self.events
                .push(ViewerEvent::CurrentPageChanged { page, previous });
        }
    }

    fn update_location(&mut self) {
        let Some(first) = self.visible.first else {
            return;
        };
        let Some(page) = page_index(first.id).and_then(|index| self.pages.get(index)) else {
            return;
        };

        let (x, y) = page
            .viewport()
            .convert_to_page_point(self.scroll.left - first.x, self.scroll.top - first.y);
        let scale = match self.current_scale_value {
            ScaleValue::Preset(preset) => LocationScale::Preset(preset),
            ScaleValue::Value(_) => LocationScale::from_scale(self.current_scale),
        };
        let location = Location::new(first.id, scale, x.round() as i64, y.round() as i64, self.rotation);

        if self.location.as_ref() != Some(&location) {
            self.events.push(ViewerEvent::LocationChanged(location.clone()));
            self.location = Some(location);
        }
    }

    /// Designate and start the next view to render
    ///
    /// Pages come first; thumbnails only when no page needs work. With
    /// nothing to do the idle deadline is armed. Returns whether a view was
    /// designated.
    pub fn render_highest_priority(&mut self, now: Instant) -> bool {
        self.visible = self.compute_visible();
        self.schedule(now)
    }

    fn schedule(&mut self, now: Instant) -> bool {
        self.queue.cancel_idle();
        if self.force_page_rendering() {
            return true;
        }

        if self.queue.thumbnails_enabled() {
            if let Some(id) = self.thumbnails.force_rendering(&mut self.queue) {
                if let Some(error) = self.thumbnails.thumbnail(id).and_then(ThumbnailView::error) {
                    self.events.push(ViewerEvent::ThumbnailRendered {
                        page: id,
                        error: Some(error.clone()),
                    });
                }
                return true;
            }
        }

        self.queue.clear_highest_priority();
        self.queue.schedule_idle(now);
        false
    }

    fn scroll_ahead(&self) -> bool {
        if self.visible.first.is_some_and(|first| first.id == 1) {
            return true;
        }
        if self
            .visible
            .last
            .is_some_and(|last| last.id == self.page_count())
        {
            return false;
        }
        match self.scroll_mode {
            ScrollMode::Page => self.page_mode.scroll_down,
            ScrollMode::Horizontal => self.scroll.right,
            ScrollMode::Vertical | ScrollMode::Wrapped => self.scroll.down,
        }
    }

    fn force_page_rendering(&mut self) -> bool {
        let scroll_ahead = self.scroll_ahead();
        let pre_render_extra =
            self.spread_mode != SpreadMode::None && self.scroll_mode != ScrollMode::Horizontal;
        let Some(id) = self.queue.get_highest_priority(
            &self.visible,
            self.pages.as_slice(),
            scroll_ahead,
            pre_render_extra,
        ) else {
            return false;
        };
        let Some(page) = page_index(id).and_then(|index| self.pages.get_mut(index)) else {
            return false;
        };

        let starting = page.rendering_state() == RenderingState::Initial;
        if !self.queue.render_view(page) {
            return false;
        }
        if starting {
            let failed = page.error().cloned();
            let pages = &mut self.pages;
            self.buffer.push(id, |evicted| destroy_page(pages, evicted));
            // A source that refuses the page never started a render
            match failed {
                Some(error) => self.events.push(ViewerEvent::PageRendered {
                    page: id,
                    error: Some(error),
                    elapsed: Duration::ZERO,
                    css_transform: false,
                }),
                None => self.events.push(ViewerEvent::PageRenderStarted { page: id }),
            }
        }
        true
    }

    /// Run rendering work until the budget is spent or nothing is left
    ///
    /// Returns whether work remains. Running tasks that lost the
    /// highest-priority designation are paused first; every finished render
    /// is followed by a new scheduling pass.
    pub fn pump(&mut self, now: Instant, budget: &mut SliceBudget) -> bool {
        self.pause_displaced();

        while let Some(target) = self.queue.highest_priority() {
            let result = match target {
                RenderingId::Page(id) => self.run_page_slice(id, budget),
                RenderingId::Thumbnail(id) => self.thumbnails.run_slice(id, budget, &self.queue),
            };
            if result == SliceResult::Yielded {
                return true;
            }
            self.finish_render(target, result);
            self.render_highest_priority(now);

            if budget.is_exceeded() {
                return self.queue.highest_priority().is_some();
            }
        }
        false
    }

    fn run_page_slice(&mut self, id: PageId, budget: &mut SliceBudget) -> SliceResult {
        let queue = &self.queue;
        match page_index(id).and_then(|index| self.pages.get_mut(index)) {
            Some(page) => page.run_slice(budget, || queue.is_highest_priority(RenderingId::Page(id))),
            None => {
                log::error!("no page view for page {}", id);
                SliceResult::Idle
            }
        }
    }

    fn finish_render(&mut self, target: RenderingId, result: SliceResult) {
        let (error, elapsed) = match result {
            SliceResult::Rendered { elapsed } => (None, elapsed),
            SliceResult::Failed { error, elapsed } => (Some(error), elapsed),
            _ => return,
        };

        match target {
            RenderingId::Page(id) => {
                self.events.push(ViewerEvent::PageRendered {
                    page: id,
                    error,
                    elapsed,
                    css_transform: false,
                });
                if self.queue.thumbnails_enabled() {
                    let page = page_index(id).and_then(|index| self.pages.get(index));
                    if let Some((page, rendered)) = page.and_then(|p| p.rendered().map(|r| (p, r))) {
                        self.thumbnails
                            .set_image(id, rendered, page.scale(), page.rotation());
                    }
                }
            }
            RenderingId::Thumbnail(id) => {
                self.events.push(ViewerEvent::ThumbnailRendered { page: id, error });
            }
        }
    }

    fn pause_displaced(&mut self) {
        let buffered: Vec<PageId> = self.buffer.iter().collect();
        for id in buffered {
            if self.queue.is_highest_priority(RenderingId::Page(id)) {
                continue;
            }
            if let Some(page) = page_index(id).and_then(|index| self.pages.get_mut(index)) {
                if page.rendering_state() == RenderingState::Running {
                    let mut budget = SliceBudget::default();
                    page.run_slice(&mut budget, || false);
                }
            }
        }
        if self.queue.thumbnails_enabled() {
            self.thumbnails.pause_displaced(&self.queue);
        }
    }

    /// Fire due timers: the zoom settle redraw and the idle notification
    pub fn poll_timers(&mut self, now: Instant) {
        if self.scale_settle_deadline.is_some_and(|deadline| now >= deadline) {
            self.scale_settle_deadline = None;
            self.refresh(now);
        }
        if self.queue.take_idle(now) {
            log::debug!("no rendering work for {:?}", self.queue.cleanup_timeout());
            self.events.push(ViewerEvent::Idle);
        }
    }

    /// Redraw pages left as scaled previews by a zoom gesture
    fn refresh(&mut self, now: Instant) {
        self.update_pages(UpdateArgs {
            scale: self.current_scale,
            rotation: self.rotation,
            drawing_delay: None,
        });
        self.update(now);
    }

    pub fn set_thumbnails_enabled(&mut self, enabled: bool, now: Instant) {
        if enabled == self.queue.thumbnails_enabled() {
            return;
        }
        self.queue.set_thumbnails_enabled(enabled);
        if !enabled {
            self.thumbnails.cancel_all();
            if matches!(self.queue.highest_priority(), Some(RenderingId::Thumbnail(_))) {
                self.queue.clear_highest_priority();
            }
        }
        self.render_highest_priority(now);
    }

    /// Scroll the thumbnail strip
    pub fn set_thumbnail_viewport(&mut self, top: f64, height: f64, now: Instant) {
        self.thumbnails.set_viewport(top, height);
        if self.queue.thumbnails_enabled() {
            self.render_highest_priority(now);
        }
    }

    pub fn drain_events(&mut self) -> Vec<ViewerEvent> {
        std::mem::take(&mut self.events)
    }

    /// The finished surface of a page
    pub fn page_surface(&self, page: PageId) -> Option<&Surface> {
        self.page_view(page).and_then(PageView::surface)
    }

    pub fn page_view(&self, page: PageId) -> Option<&PageView> {
        self.pages.get(page_index(page)?)
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn current_page(&self) -> PageId {
        self.current_page
    }

    pub fn current_scale(&self) -> f64 {
        self.current_scale
    }

    pub fn current_scale_value(&self) -> ScaleValue {
        self.current_scale_value
    }

    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    pub fn scroll_mode(&self) -> ScrollMode {
        self.scroll_mode
    }

    pub fn spread_mode(&self) -> SpreadMode {
        self.spread_mode
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn visible(&self) -> &VisibilityReport {
        &self.visible
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn scroll(&self) -> ScrollState {
        self.scroll
    }

    /// Realized pages, least recently used first
    pub fn buffered_pages(&self) -> Vec<PageId> {
        self.buffer.iter().collect()
    }

    pub fn buffer_stats(&self) -> BufferStats {
        self.buffer.stats()
    }

    pub fn thumbnails(&self) -> &ThumbnailStrip {
        &self.thumbnails
    }

    pub fn queue(&self) -> &RenderingQueue {
        &self.queue
    }

    pub fn context(&self) -> &ViewerContext {
        &self.ctx
    }
}

impl fmt::Debug for Viewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewer")
            .field("page_count", &self.pages.len())
            .field("current_page", &self.current_page)
            .field("current_scale", &self.current_scale)
            .field("rotation", &self.rotation)
            .field("scroll_mode", &self.scroll_mode)
            .field("spread_mode", &self.spread_mode)
            .field("scroll", &self.scroll)
            .field("highest_priority", &self.queue.highest_priority())
            .finish()
    }
}

fn page_index(page: PageId) -> Option<usize> {
    (page as usize).checked_sub(1)
}

fn destroy_page(pages: &mut [PageView], page: PageId) {
    if let Some(view) = page_index(page).and_then(|index| pages.get_mut(index)) {
        log::debug!("evicting page {}", page);
        view.destroy();
    }
}

fn scaled_preview(page: PageId) -> ViewerEvent {
    ViewerEvent::PageRendered {
        page,
        error: None,
        elapsed: Duration::ZERO,
        css_transform: true,
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
