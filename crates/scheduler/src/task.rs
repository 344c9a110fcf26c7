//! Cooperative page render tasks
//!
//! A [`PageRenderTask`] wraps the rasterization work for one page. The work
//! itself is supplied by the document collaborator as a [`RasterJob`] that
//! advances in steps; the task decides between steps whether to keep going,
//! pause, yield or stop.

use std::fmt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use crate::frame_budget::SliceBudget;
use crate::PageId;

/// Rasterization failure for a single page
///
/// Cancellation is never reported through this type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("page {0} is not loaded")]
    PageNotLoaded(PageId),

    #[error("invalid viewport for page {page}: {width}x{height}")]
    InvalidViewport { page: PageId, width: u32, height: u32 },

    #[error("page source error: {0}")]
    Source(String),

    #[error("rasterization failed: {0}")]
    Raster(String),
}

/// Parameters a surface was rasterized under
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    /// CSS scale (1.0 = 100 %)
    pub scale: f64,
    /// Rotation in degrees, one of 0/90/180/270
    pub rotation: u16,
    /// Device pixels per CSS pixel
    pub output_scale: f64,
}

impl RenderParams {
    pub fn new(scale: f64, rotation: u16, output_scale: f64) -> Self {
        Self {
            scale,
            rotation,
            output_scale,
        }
    }

    /// Whether a surface rendered under `self` can be shown unchanged for `other`
    pub fn same_as(&self, other: &RenderParams) -> bool {
        const EPSILON: f64 = 1e-9;
        self.rotation == other.rotation
            && (self.scale - other.scale).abs() < EPSILON
            && (self.output_scale - other.output_scale).abs() < EPSILON
    }
}

/// An RGBA8 raster produced by a [`RasterJob`]
#[derive(Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    /// Wrap an RGBA buffer; the length must be `width * height * 4`
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, RenderError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(RenderError::Raster(format!(
                "pixel buffer holds {} bytes, expected {}",
                pixels.len(),
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A transparent surface
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA value at (x, y), `None` outside the surface
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.pixels.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Size of the pixel buffer in bytes
    pub fn memory_size(&self) -> usize {
        self.pixels.len()
    }
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// Result of advancing a raster job by one step
#[derive(Debug)]
pub enum RasterStep {
    /// More steps are needed
    Pending,
    /// The page is fully rasterized
    Complete(Surface),
}

/// Incremental rasterization work for one page
///
/// Implementations should keep each step short; the task checks for
/// cancellation, priority and budget between steps.
pub trait RasterJob {
    fn step(&mut self) -> Result<RasterStep, RenderError>;
}

/// Cancellation token for cooperative task cancellation
///
/// Clones share state, so a collaborator on another thread may cancel a task
/// that is driven from the viewer's thread.
///
/// # Example
///
/// ```
/// use pageflow_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let job_token = token.clone();
///
/// token.cancel();
/// assert!(job_token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel this token and all of its clones; idempotent
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one slice of a render task
#[derive(Debug)]
pub enum TaskProgress {
    /// The slice budget ran out; call `run_slice` again later
    Yielded,
    /// The task lost the highest-priority designation at a checkpoint
    Paused,
    Completed(Surface),
    Failed(RenderError),
    /// The cancellation token fired; the job has been dropped
    Cancelled,
}

/// A cancellable, pausable unit of rasterization work for one page
pub struct PageRenderTask {
    page: PageId,
    job: Option<Box<dyn RasterJob>>,
    cancel: CancellationToken,
    params: RenderParams,
    started: Instant,
    steps: u64,
}

impl PageRenderTask {
    pub fn new(
        page: PageId,
        job: Box<dyn RasterJob>,
        cancel: CancellationToken,
        params: RenderParams,
    ) -> Self {
        Self {
            page,
            job: Some(job),
            cancel,
            params,
            started: Instant::now(),
            steps: 0,
        }
    }

    pub fn page(&self) -> PageId {
        self.page
    }

    /// Parameters the job was started with
    pub fn params(&self) -> RenderParams {
        self.params
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Time since the task was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Number of raster steps executed so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Request cancellation and release the job immediately
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.job = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run the task until it finishes, yields, pauses or is cancelled
    ///
    /// Before every step the task checks, in order: the cancellation token,
    /// `is_highest_priority`, and the slice budget.
    pub fn run_slice(
        &mut self,
        budget: &mut SliceBudget,
        mut is_highest_priority: impl FnMut() -> bool,
    ) -> TaskProgress {
        loop {
            if self.cancel.is_cancelled() {
                self.job = None;
                return TaskProgress::Cancelled;
            }
            if !is_highest_priority() {
                return TaskProgress::Paused;
            }
            if budget.should_yield() {
                return TaskProgress::Yielded;
            }

            let Some(job) = self.job.as_mut() else {
                return TaskProgress::Failed(RenderError::Raster(format!(
                    "render task for page {} has no pending work",
                    self.page
                )));
            };

            self.steps += 1;
            match job.step() {
                Ok(RasterStep::Pending) => {}
                Ok(RasterStep::Complete(surface)) => {
                    self.job = None;
                    return TaskProgress::Completed(surface);
                }
                Err(err) => {
                    self.job = None;
                    if self.cancel.is_cancelled() {
                        return TaskProgress::Cancelled;
                    }
                    return TaskProgress::Failed(err);
                }
            }
        }
    }
}

impl fmt::Debug for PageRenderTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageRenderTask")
            .field("page", &self.page)
            .field("params", &self.params)
            .field("steps", &self.steps)
            .field("has_job", &self.job.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
