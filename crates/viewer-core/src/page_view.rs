//! Per-page render state machine
//!
//! ```text
//! Initial --draw--> Running <--resume/pause--> Paused
//!                      |                          |
//!                      +--------> Finished <------+
//! ```
//!
//! `reset` returns any state to `Initial`; cancellation of a running or paused
//! task also lands in `Initial` and is never recorded as an error.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use pageflow_scheduler::{
    CancellationToken, PageId, PageRenderTask, RenderError, RenderParams, RenderableView,
    RenderingId, RenderingState, SliceBudget, Surface, TaskProgress,
};

use crate::geometry::{PageSize, PageViewport};
use crate::source::{PageSource, ViewerContext};

/// A finished raster and the parameters it was produced under
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSurface {
    pub surface: Surface,
    pub params: RenderParams,
}

#[derive(Debug)]
pub enum RenderOutcome {
    Rendered(RenderedSurface),
    Failed(RenderError),
}

#[derive(Debug)]
pub enum RenderState {
    Initial,
    Running { task: PageRenderTask },
    /// The task is the continuation picked up by `resume`
    Paused { task: PageRenderTask },
    Finished(RenderOutcome),
}

/// What one call to `run_slice` achieved
#[derive(Debug, Clone, PartialEq)]
pub enum SliceResult {
    /// Nothing was running
    Idle,
    Yielded,
    Paused,
    Rendered { elapsed: Duration },
    Failed { error: RenderError, elapsed: Duration },
    Cancelled,
}

impl SliceResult {
    /// The task ended, one way or another
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SliceResult::Rendered { .. } | SliceResult::Failed { .. } | SliceResult::Cancelled
        )
    }
}

impl RenderState {
    pub fn rendering_state(&self) -> RenderingState {
        match self {
            RenderState::Initial => RenderingState::Initial,
            RenderState::Running { .. } => RenderingState::Running,
            RenderState::Paused { .. } => RenderingState::Paused,
            RenderState::Finished(_) => RenderingState::Finished,
        }
    }

    pub fn rendered(&self) -> Option<&RenderedSurface> {
        match self {
            RenderState::Finished(RenderOutcome::Rendered(rendered)) => Some(rendered),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&RenderError> {
        match self {
            RenderState::Finished(RenderOutcome::Failed(error)) => Some(error),
            _ => None,
        }
    }

    /// Ask the source for a raster job and wrap it in a running task
    pub(crate) fn start(
        page: PageId,
        source: &dyn PageSource,
        viewport: &PageViewport,
    ) -> Result<RenderState, RenderError> {
        let (width, height) = viewport.surface_size();
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidViewport {
                page,
                width,
                height,
            });
        }

        let cancel = CancellationToken::new();
        let job = source.rasterize(page, viewport, cancel.clone())?;
        let task = PageRenderTask::new(page, job, cancel, viewport.render_params());
        Ok(RenderState::Running { task })
    }

    /// Cancel a running or paused task; returns whether there was one
    pub(crate) fn cancel(&mut self) -> bool {
        match std::mem::replace(self, RenderState::Initial) {
            RenderState::Running { mut task } | RenderState::Paused { mut task } => {
                task.cancel();
                true
            }
            other => {
                *self = other;
                false
            }
        }
    }

    pub(crate) fn resume(&mut self) -> bool {
        match std::mem::replace(self, RenderState::Initial) {
            RenderState::Paused { task } => {
                *self = RenderState::Running { task };
                true
            }
            other => {
                *self = other;
                false
            }
        }
    }

    /// Run the current task for one slice
    pub(crate) fn advance(
        &mut self,
        budget: &mut SliceBudget,
        is_highest_priority: impl FnMut() -> bool,
    ) -> SliceResult {
        let mut task = match std::mem::replace(self, RenderState::Initial) {
            RenderState::Running { task } => task,
            other => {
                *self = other;
                return SliceResult::Idle;
            }
        };

        match task.run_slice(budget, is_highest_priority) {
            TaskProgress::Yielded => {
                *self = RenderState::Running { task };
                SliceResult::Yielded
            }
            TaskProgress::Paused => {
                *self = RenderState::Paused { task };
                SliceResult::Paused
            }
            TaskProgress::Completed(surface) => {
                let elapsed = task.elapsed();
                *self = RenderState::Finished(RenderOutcome::Rendered(RenderedSurface {
                    surface,
                    params: task.params(),
                }));
                SliceResult::Rendered { elapsed }
            }
            TaskProgress::Failed(error) => {
                let elapsed = task.elapsed();
                *self = RenderState::Finished(RenderOutcome::Failed(error.clone()));
                SliceResult::Failed { error, elapsed }
            }
            TaskProgress::Cancelled => SliceResult::Cancelled,
        }
    }
}

/// Geometry change requested for a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateArgs {
    pub scale: f64,
    pub rotation: u16,
    /// Settle delay of a zoom gesture; below one second the redraw is postponed
    pub drawing_delay: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A retained surface matches the new geometry and is shown again
    Restored,
    /// The surface is kept as a scaled preview because a sharper one would
    /// exceed the pixel cap
    CssOnly,
    /// The surface is kept as a scaled preview until the gesture settles
    Postponed,
    /// The page must be rendered again
    Reset,
}

/// Output scale limited so the surface stays within `max_pixels`
///
/// Returns the scale and whether it had to be reduced.
pub fn capped_output_scale(css_pixels: f64, output_scale: f64, max_pixels: u64) -> (f64, bool) {
    if max_pixels == 0 || css_pixels <= 0.0 {
        return (output_scale, false);
    }
    let max_scale = (max_pixels as f64 / css_pixels).sqrt();
    if output_scale > max_scale {
        (max_scale, true)
    } else {
        (output_scale, false)
    }
}

/// One page of the document and its realized surface
pub struct PageView {
    id: PageId,
    source: Arc<dyn PageSource>,
    size: PageSize,
    scale: f64,
    rotation: u16,
    viewport: PageViewport,
    output_scale: f64,
    max_surface_pixels: u64,
    state: RenderState,
    zoom_layer: Option<RenderedSurface>,
    has_restricted_scaling: bool,
}

impl PageView {
    pub fn new(ctx: &ViewerContext, id: PageId, size: PageSize, scale: f64, rotation: u16) -> Self {
        let mut view = Self {
            id,
            source: Arc::clone(&ctx.source),
            size,
            scale,
            rotation,
            viewport: PageViewport::new(id, size, scale, rotation),
            output_scale: ctx.config.output_scale,
            max_surface_pixels: ctx.config.max_surface_pixels,
            state: RenderState::Initial,
            zoom_layer: None,
            has_restricted_scaling: false,
        };
        view.viewport = view.target_viewport();
        view
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn size(&self) -> PageSize {
        self.size
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn rotation(&self) -> u16 {
        self.rotation
    }

    pub fn viewport(&self) -> &PageViewport {
        &self.viewport
    }

    /// CSS size at the current scale and rotation
    pub fn css_size(&self) -> (f64, f64) {
        (self.viewport.width, self.viewport.height)
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn rendered(&self) -> Option<&RenderedSurface> {
        self.state.rendered()
    }

    /// The finished surface, if rendering succeeded
    pub fn surface(&self) -> Option<&Surface> {
        self.state.rendered().map(|rendered| &rendered.surface)
    }

    pub fn error(&self) -> Option<&RenderError> {
        self.state.error()
    }

    /// Previous surface shown while the page re-renders
    pub fn zoom_layer(&self) -> Option<&RenderedSurface> {
        self.zoom_layer.as_ref()
    }

    /// What a host would display right now
    pub fn displayed(&self) -> Option<&RenderedSurface> {
        self.state.rendered().or(self.zoom_layer.as_ref())
    }

    pub fn has_restricted_scaling(&self) -> bool {
        self.has_restricted_scaling
    }

    /// The displayed surface was rendered for different geometry
    pub fn is_scaled_preview(&self) -> bool {
        let target = self.viewport.render_params();
        self.displayed()
            .is_some_and(|rendered| !rendered.params.same_as(&target))
    }

    fn target_viewport(&self) -> PageViewport {
        let viewport = PageViewport::new(self.id, self.size, self.scale, self.rotation);
        let (output_scale, _) = capped_output_scale(
            viewport.css_pixels(),
            self.output_scale,
            self.max_surface_pixels,
        );
        viewport.with_output_scale(output_scale)
    }

    /// Abort the task at its current checkpoint and discard its resources
    ///
    /// Returns whether a task was cancelled; a no-op unless running or paused.
    pub fn cancel_rendering(&mut self) -> bool {
        self.state.cancel()
    }

    /// Return to `Initial`, optionally keeping the current surface on screen
    pub fn reset(&mut self, keep_zoom_layer: bool) {
        self.state.cancel();
        let previous = std::mem::replace(&mut self.state, RenderState::Initial);
        if keep_zoom_layer {
            if let RenderState::Finished(RenderOutcome::Rendered(rendered)) = previous {
                self.zoom_layer = Some(rendered);
            }
        } else {
            self.zoom_layer = None;
        }
    }

    /// Release the surface and any task; idempotent
    pub fn destroy(&mut self) {
        self.reset(false);
    }

    /// Apply new geometry and decide what happens to the current surface
    pub fn update(&mut self, args: UpdateArgs) -> UpdateOutcome {
        self.scale = args.scale;
        self.rotation = args.rotation;
        self.viewport = self.target_viewport();
        let target = self.viewport.render_params();

        if let Some(rendered) = self.state.rendered() {
            if rendered.params.same_as(&target) {
                self.zoom_layer = None;
                return UpdateOutcome::Restored;
            }
        }
        if self
            .zoom_layer
            .as_ref()
            .is_some_and(|layer| layer.params.same_as(&target))
        {
            self.state.cancel();
            if let Some(layer) = self.zoom_layer.take() {
                self.state = RenderState::Finished(RenderOutcome::Rendered(layer));
            }
            return UpdateOutcome::Restored;
        }

        if let Some(shown_scale) = self.displayed().map(|r| r.params.output_scale) {
            let only_css = self.has_restricted_scaling
                && self.max_surface_pixels > 0
                && (self.viewport.width.floor() * shown_scale).trunc()
                    * (self.viewport.height.floor() * shown_scale).trunc()
                    > self.max_surface_pixels as f64;
            let postpone = args
                .drawing_delay
                .is_some_and(|delay| delay < Duration::from_secs(1));

            if postpone || only_css {
                if self.state.rendered().is_none() {
                    self.state.cancel();
                    if let Some(layer) = self.zoom_layer.take() {
                        self.state = RenderState::Finished(RenderOutcome::Rendered(layer));
                    }
                }
                return if only_css {
                    UpdateOutcome::CssOnly
                } else {
                    UpdateOutcome::Postponed
                };
            }
        }

        self.reset(true);
        UpdateOutcome::Reset
    }

    /// Run the page's task for one slice
    pub fn run_slice(
        &mut self,
        budget: &mut SliceBudget,
        is_highest_priority: impl FnMut() -> bool,
    ) -> SliceResult {
        let result = self.state.advance(budget, is_highest_priority);
        match &result {
            SliceResult::Rendered { elapsed } => {
                log::debug!("page {} rendered in {:?}", self.id, elapsed);
                self.zoom_layer = None;
            }
            SliceResult::Failed { error, .. } => {
                log::warn!("page {} failed to render: {}", self.id, error);
                self.zoom_layer = None;
            }
            SliceResult::Cancelled => log::debug!("page {} render cancelled", self.id),
            _ => {}
        }
        result
    }
}

impl RenderableView for PageView {
    fn id(&self) -> PageId {
        self.id
    }

    fn rendering_id(&self) -> RenderingId {
        RenderingId::Page(self.id)
    }

    fn rendering_state(&self) -> RenderingState {
        self.state.rendering_state()
    }

    fn draw(&mut self) -> Result<(), RenderError> {
        if self.state.rendering_state() != RenderingState::Initial {
            log::error!("page {} must be in the initial state before drawing", self.id);
            self.reset(false);
        }

        let viewport = PageViewport::new(self.id, self.size, self.scale, self.rotation);
        let (output_scale, restricted) = capped_output_scale(
            viewport.css_pixels(),
            self.output_scale,
            self.max_surface_pixels,
        );
        self.has_restricted_scaling = restricted;
        self.viewport = viewport.with_output_scale(output_scale);

        match RenderState::start(self.id, self.source.as_ref(), &self.viewport) {
            Ok(state) => {
                self.state = state;
                Ok(())
            }
            Err(error) => {
                self.state = RenderState::Finished(RenderOutcome::Failed(error.clone()));
                self.zoom_layer = None;
                Err(error)
            }
        }
    }

    fn resume(&mut self) {
        if !self.state.resume() {
            log::debug!("page {} has no paused render to resume", self.id);
        }
    }
}

impl fmt::Debug for PageView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageView")
            .field("id", &self.id)
            .field("scale", &self.scale)
            .field("rotation", &self.rotation)
            .field("state", &self.state.rendering_state())
            .field("has_zoom_layer", &self.zoom_layer.is_some())
            .field("has_restricted_scaling", &self.has_restricted_scaling)
            .finish()
    }
}
