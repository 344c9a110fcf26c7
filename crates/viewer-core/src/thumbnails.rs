//! Thumbnail strip
//!
//! Thumbnails are the secondary render target: the queue only looks at them
//! when no page view needs work. A thumbnail whose page has already been
//! rendered at a sufficient scale copies a downscaled image from the page
//! instead of rasterizing again.

use std::fmt;
use std::sync::Arc;

use pageflow_scheduler::{
    visible_pages, PageBox, PageId, RenderError, RenderParams, RenderableView, RenderingId,
    RenderingQueue, RenderingState, SliceBudget, Surface, ViewportRect, VisibilityOptions,
    VisibilityReport,
};

use crate::geometry::{PageSize, PageViewport, PDF_TO_CSS_UNITS};
use crate::page_view::{RenderOutcome, RenderState, RenderedSurface, SliceResult};
use crate::scroll::ScrollState;
use crate::source::{PageSource, ViewerContext};

/// Vertical space between thumbnails
pub const THUMBNAIL_GAP: f64 = 10.0;

pub struct ThumbnailView {
    id: PageId,
    source: Arc<dyn PageSource>,
    size: PageSize,
    rotation: u16,
    canvas_width: u32,
    state: RenderState,
}

impl ThumbnailView {
    pub fn new(ctx: &ViewerContext, id: PageId, size: PageSize, canvas_width: u32, rotation: u16) -> Self {
        Self {
            id,
            source: Arc::clone(&ctx.source),
            size,
            rotation,
            canvas_width,
            state: RenderState::Initial,
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    /// Rotated page size in points
    fn rotated_size(&self) -> (f64, f64) {
        let total = self.size.total_rotation(self.rotation);
        if total % 180 == 0 {
            (self.size.width, self.size.height)
        } else {
            (self.size.height, self.size.width)
        }
    }

    /// Thumbnail pixels per page point
    pub fn scale(&self) -> f64 {
        let (width, _) = self.rotated_size();
        if width > 0.0 {
            f64::from(self.canvas_width) / width
        } else {
            0.0
        }
    }

    /// Canvas size in pixels; the height follows the page's aspect ratio
    pub fn canvas_size(&self) -> (u32, u32) {
        let (width, height) = self.rotated_size();
        if width <= 0.0 {
            return (self.canvas_width, 0);
        }
        let canvas_height = (f64::from(self.canvas_width) * height / width).trunc().max(0.0);
        (self.canvas_width, canvas_height as u32)
    }

    pub fn viewport(&self) -> PageViewport {
        PageViewport::new(self.id, self.size, self.scale() / PDF_TO_CSS_UNITS, self.rotation)
    }

    pub fn image(&self) -> Option<&Surface> {
        self.state.rendered().map(|rendered| &rendered.surface)
    }

    pub fn error(&self) -> Option<&RenderError> {
        self.state.error()
    }

    pub fn reset(&mut self) {
        self.state.cancel();
        self.state = RenderState::Initial;
    }

    pub fn set_rotation(&mut self, rotation: u16) {
        if self.rotation != rotation {
            self.rotation = rotation;
            self.reset();
        }
    }

    /// Adopt a downscaled copy of a rendered page
    ///
    /// Only an idle thumbnail takes an image, and only from a page rendered
    /// at least at thumbnail scale with the same rotation.
    pub fn set_image(&mut self, page: &RenderedSurface, page_scale: f64, page_rotation: u16) -> bool {
        if self.state.rendering_state() != RenderingState::Initial {
            return false;
        }
        if page_rotation != self.rotation || page_scale < self.scale() {
            return false;
        }

        let (width, height) = self.canvas_size();
        let Some(surface) = downscale(&page.surface, width, height) else {
            return false;
        };
        self.state = RenderState::Finished(RenderOutcome::Rendered(RenderedSurface {
            surface,
            params: RenderParams::new(self.scale() / PDF_TO_CSS_UNITS, page.params.rotation, 1.0),
        }));
        true
    }

    pub fn run_slice(
        &mut self,
        budget: &mut SliceBudget,
        is_highest_priority: impl FnMut() -> bool,
    ) -> SliceResult {
        let result = self.state.advance(budget, is_highest_priority);
        if let SliceResult::Failed { error, .. } = &result {
            log::warn!("thumbnail {} failed to render: {}", self.id, error);
        }
        result
    }
}

impl RenderableView for ThumbnailView {
    fn id(&self) -> PageId {
        self.id
    }

    fn rendering_id(&self) -> RenderingId {
        RenderingId::Thumbnail(self.id)
    }

    fn rendering_state(&self) -> RenderingState {
        self.state.rendering_state()
    }

    fn draw(&mut self) -> Result<(), RenderError> {
        if self.state.rendering_state() != RenderingState::Initial {
            log::error!("thumbnail {} must be in the initial state before drawing", self.id);
            self.reset();
        }

        match RenderState::start(self.id, self.source.as_ref(), &self.viewport()) {
            Ok(state) => {
                self.state = state;
                Ok(())
            }
            Err(error) => {
                self.state = RenderState::Finished(RenderOutcome::Failed(error.clone()));
                Err(error)
            }
        }
    }

    fn resume(&mut self) {
        self.state.resume();
    }
}

impl fmt::Debug for ThumbnailView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailView")
            .field("id", &self.id)
            .field("rotation", &self.rotation)
            .field("state", &self.state.rendering_state())
            .finish()
    }
}

/// Nearest-neighbour resample
fn downscale(source: &Surface, width: u32, height: u32) -> Option<Surface> {
    if width == 0 || height == 0 || source.width() == 0 || source.height() == 0 {
        return None;
    }

    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        let sy = (u64::from(y) * u64::from(source.height()) / u64::from(height)) as u32;
        for x in 0..width {
            let sx = (u64::from(x) * u64::from(source.width()) / u64::from(width)) as u32;
            pixels.extend_from_slice(&source.pixel(sx, sy).unwrap_or([0; 4]));
        }
    }
    Surface::from_rgba(width, height, pixels).ok()
}

/// All thumbnails of the document plus the strip's own scroll position
pub struct ThumbnailStrip {
    ctx: ViewerContext,
    thumbnails: Vec<ThumbnailView>,
    boxes: Vec<PageBox>,
    scroll: ScrollState,
    viewport_height: f64,
    rotation: u16,
}

impl ThumbnailStrip {
    pub fn new(ctx: &ViewerContext) -> Self {
        Self {
            ctx: ctx.clone(),
            thumbnails: Vec::new(),
            boxes: Vec::new(),
            scroll: ScrollState::default(),
            viewport_height: 0.0,
            rotation: 0,
        }
    }

    /// Replace all thumbnails for a new document
    pub fn set_document(&mut self, ctx: &ViewerContext, sizes: &[PageSize], rotation: u16) {
        self.ctx = ctx.clone();
        self.rotation = rotation;
        let width = self.ctx.config.thumbnail_width;
        self.thumbnails = sizes
            .iter()
            .enumerate()
            .map(|(index, size)| ThumbnailView::new(&self.ctx, index as PageId + 1, *size, width, rotation))
            .collect();
        self.scroll = ScrollState::default();
        self.relayout();
    }

    pub fn set_rotation(&mut self, rotation: u16) {
        self.rotation = rotation;
        for thumbnail in &mut self.thumbnails {
            thumbnail.set_rotation(rotation);
        }
        self.relayout();
    }

    fn relayout(&mut self) {
        let mut top = 0.0;
        self.boxes = self
            .thumbnails
            .iter()
            .map(|thumbnail| {
                let (width, height) = thumbnail.canvas_size();
                let page_box = PageBox::new(thumbnail.id(), 0.0, top, f64::from(width), f64::from(height));
                top += f64::from(height) + THUMBNAIL_GAP;
                page_box
            })
            .collect();
    }

    pub fn len(&self) -> usize {
        self.thumbnails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thumbnails.is_empty()
    }

    pub fn thumbnail(&self, id: PageId) -> Option<&ThumbnailView> {
        self.thumbnails.get((id as usize).checked_sub(1)?)
    }

    pub fn image(&self, id: PageId) -> Option<&Surface> {
        self.thumbnail(id).and_then(ThumbnailView::image)
    }

    pub fn boxes(&self) -> &[PageBox] {
        &self.boxes
    }

    /// Scroll the strip's own viewport
    pub fn set_viewport(&mut self, top: f64, height: f64) {
        self.scroll.update(0.0, top.max(0.0));
        self.viewport_height = height.max(0.0);
    }

    pub fn visible(&self) -> VisibilityReport {
        let viewport = ViewportRect::new(
            0.0,
            self.scroll.top,
            f64::from(self.ctx.config.thumbnail_width),
            self.viewport_height,
        );
        visible_pages(&viewport, &self.boxes, VisibilityOptions::default())
    }

    fn scroll_ahead(&self, visible: &VisibilityReport) -> bool {
        if visible.first.is_some_and(|first| first.id == 1) {
            true
        } else if visible
            .last
            .is_some_and(|last| last.id as usize == self.thumbnails.len())
        {
            false
        } else {
            self.scroll.down
        }
    }

    /// Start or continue the most urgent thumbnail; returns its page
    pub fn force_rendering(&mut self, queue: &mut RenderingQueue) -> Option<PageId> {
        let visible = self.visible();
        let scroll_ahead = self.scroll_ahead(&visible);
        let id = queue.get_highest_priority(&visible, &self.thumbnails, scroll_ahead, false)?;
        let thumbnail = self.thumbnails.get_mut((id as usize).checked_sub(1)?)?;
        queue.render_view(thumbnail);
        Some(id)
    }

    pub fn run_slice(&mut self, id: PageId, budget: &mut SliceBudget, queue: &RenderingQueue) -> SliceResult {
        let Some(thumbnail) = (id as usize)
            .checked_sub(1)
            .and_then(|index| self.thumbnails.get_mut(index))
        else {
            log::error!("no thumbnail for page {}", id);
            return SliceResult::Idle;
        };
        thumbnail.run_slice(budget, || queue.is_highest_priority(RenderingId::Thumbnail(id)))
    }

    /// Move running thumbnails that lost the designation to their checkpoint
    pub fn pause_displaced(&mut self, queue: &RenderingQueue) {
        for thumbnail in &mut self.thumbnails {
            if thumbnail.rendering_state() == RenderingState::Running
                && !queue.is_highest_priority(thumbnail.rendering_id())
            {
                let mut budget = SliceBudget::default();
                thumbnail.run_slice(&mut budget, || false);
            }
        }
    }

    /// Cancel every running or paused thumbnail
    pub fn cancel_all(&mut self) {
        for thumbnail in &mut self.thumbnails {
            if thumbnail.state.cancel() {
                log::debug!("thumbnail {} render cancelled", thumbnail.id);
            }
        }
    }

    /// Offer a rendered page to its thumbnail
    pub fn set_image(&mut self, id: PageId, page: &RenderedSurface, page_scale: f64, page_rotation: u16) -> bool {
        match (id as usize)
            .checked_sub(1)
            .and_then(|index| self.thumbnails.get_mut(index))
        {
            Some(thumbnail) => thumbnail.set_image(page, page_scale, page_rotation),
            None => false,
        }
    }
}

impl fmt::Debug for ThumbnailStrip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailStrip")
            .field("len", &self.thumbnails.len())
            .field("top", &self.scroll.top)
            .field("viewport_height", &self.viewport_height)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use crate::page_view::PageView;
    use crate::test_support::FakeSource;
    use std::time::Duration;

    fn ctx(source: FakeSource) -> ViewerContext {
        ViewerContext::new(ViewerConfig::default(), Arc::new(source))
    }

    fn strip(count: usize) -> (ViewerContext, ThumbnailStrip) {
        let ctx = ctx(FakeSource::uniform(count, 72.0, 144.0));
        let sizes = vec![PageSize::new(72.0, 144.0); count];
        let mut strip = ThumbnailStrip::new(&ctx);
        strip.set_document(&ctx, &sizes, 0);
        (ctx, strip)
    }

    #[test]
    fn canvas_follows_page_aspect_ratio() {
        let (_ctx, strip) = strip(2);
        let thumbnail = strip.thumbnail(1).unwrap();

        assert_eq!(thumbnail.canvas_size(), (98, 196));
        assert!((thumbnail.scale() - 98.0 / 72.0).abs() < 1e-12);
        let viewport = thumbnail.viewport();
        assert!((viewport.width - 98.0).abs() < 1e-9);

        assert_eq!(strip.boxes()[1].top, 206.0);
    }

    #[test]
    fn rotation_swaps_canvas_shape() {
        let (_ctx, mut strip) = strip(1);
        strip.set_rotation(90);
        assert_eq!(strip.thumbnail(1).unwrap().canvas_size(), (98, 49));
    }

    #[test]
    fn force_rendering_picks_first_visible_thumbnail() {
        let (_ctx, mut strip) = strip(10);
        let mut queue = RenderingQueue::new();
        strip.set_viewport(0.0, 400.0);

        assert_eq!(strip.force_rendering(&mut queue), Some(1));
        assert!(queue.is_highest_priority(RenderingId::Thumbnail(1)));
        assert_eq!(
            strip.thumbnail(1).unwrap().rendering_state(),
            RenderingState::Running
        );

        let mut budget = SliceBudget::new(Duration::from_secs(60));
        let result = strip.run_slice(1, &mut budget, &queue);
        assert!(matches!(result, SliceResult::Rendered { .. }));
        let image = strip.image(1).unwrap();
        assert!((97..=98).contains(&image.width()));

        assert_eq!(strip.force_rendering(&mut queue), Some(2));
    }

    #[test]
    fn displaced_thumbnail_pauses() {
        let (_ctx, mut strip) = strip(3);
        let mut queue = RenderingQueue::new();
        strip.set_viewport(0.0, 400.0);
        strip.force_rendering(&mut queue);

        queue.clear_highest_priority();
        strip.pause_displaced(&queue);
        assert_eq!(
            strip.thumbnail(1).unwrap().rendering_state(),
            RenderingState::Paused
        );

        strip.cancel_all();
        assert_eq!(
            strip.thumbnail(1).unwrap().rendering_state(),
            RenderingState::Initial
        );
    }

    #[test]
    fn set_image_copies_a_large_enough_page() {
        let (ctx, mut strip) = strip(1);
        let size = PageSize::new(72.0, 144.0);
        let mut page = PageView::new(&ctx, 1, size, 1.5, 0);
        page.draw().unwrap();
        page.run_slice(&mut SliceBudget::new(Duration::from_secs(60)), || true);
        let rendered = page.rendered().unwrap();

        assert!(strip.set_image(1, rendered, page.scale(), 0));
        let image = strip.image(1).unwrap();
        assert_eq!((image.width(), image.height()), (98, 196));
        assert_eq!(image.pixel(0, 0).map(|p| p[0]), Some(1));

        // Already finished: a second offer is ignored
        assert!(!strip.set_image(1, rendered, page.scale(), 0));
    }

    #[test]
    fn set_image_refuses_to_upscale_or_mismatched_rotation() {
        let (ctx, mut strip) = strip(1);
        let size = PageSize::new(72.0, 144.0);
        let mut page = PageView::new(&ctx, 1, size, 0.5, 0);
        page.draw().unwrap();
        page.run_slice(&mut SliceBudget::new(Duration::from_secs(60)), || true);
        let rendered = page.rendered().unwrap();

        assert!(!strip.set_image(1, rendered, page.scale(), 0));
        assert!(!strip.set_image(1, rendered, 2.0, 90));
        assert!(strip.image(1).is_none());
    }

    #[test]
    fn downscale_samples_nearest_pixel() {
        let mut pixels = Vec::new();
        for value in 0..16u8 {
            pixels.extend_from_slice(&[value, 0, 0, 255]);
        }
        let source = Surface::from_rgba(4, 4, pixels).unwrap();

        let small = downscale(&source, 2, 2).unwrap();
        let firsts: Vec<u8> = small.pixels().chunks(4).map(|p| p[0]).collect();
        assert_eq!(firsts, vec![0, 2, 8, 10]);
        assert!(downscale(&source, 0, 2).is_none());
    }
}
