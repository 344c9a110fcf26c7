//! In-memory page source for unit tests

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use pageflow_scheduler::{CancellationToken, PageId, RasterJob, RasterStep, RenderError, Surface};

use crate::geometry::{PageSize, PageViewport};
use crate::source::PageSource;

pub(crate) struct FakeSource {
    sizes: Vec<PageSize>,
    steps: u32,
    fail_on_start: HashSet<PageId>,
    fail_midway: HashSet<PageId>,
    tokens: Arc<Mutex<Vec<CancellationToken>>>,
    calls: Arc<Mutex<Vec<PageId>>>,
}

impl FakeSource {
    pub(crate) fn new(sizes: Vec<PageSize>) -> Self {
        Self {
            sizes,
            steps: 1,
            fail_on_start: HashSet::new(),
            fail_midway: HashSet::new(),
            tokens: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn uniform(count: usize, width: f64, height: f64) -> Self {
        Self::new(vec![PageSize::new(width, height); count])
    }

    /// Pending steps before each job completes
    pub(crate) fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    pub(crate) fn failing_on_start(mut self, page: PageId) -> Self {
        self.fail_on_start.insert(page);
        self
    }

    pub(crate) fn failing_midway(mut self, page: PageId) -> Self {
        self.fail_midway.insert(page);
        self
    }

    /// Cancellation tokens handed out, in call order
    pub(crate) fn tokens(&self) -> Arc<Mutex<Vec<CancellationToken>>> {
        Arc::clone(&self.tokens)
    }

    /// Pages passed to `rasterize`, in call order
    pub(crate) fn calls(&self) -> Arc<Mutex<Vec<PageId>>> {
        Arc::clone(&self.calls)
    }
}

impl PageSource for FakeSource {
    fn page_count(&self) -> u32 {
        self.sizes.len() as u32
    }

    fn page_size(&self, page: PageId) -> Option<PageSize> {
        self.sizes.get((page as usize).checked_sub(1)?).copied()
    }

    fn rasterize(
        &self,
        page: PageId,
        viewport: &PageViewport,
        cancel: CancellationToken,
    ) -> Result<Box<dyn RasterJob>, RenderError> {
        self.calls.lock().unwrap().push(page);
        if self.fail_on_start.contains(&page) {
            return Err(RenderError::Source(format!("page {} is damaged", page)));
        }
        self.tokens.lock().unwrap().push(cancel.clone());

        let (width, height) = viewport.surface_size();
        Ok(Box::new(FakeJob {
            page,
            width,
            height,
            seed: (viewport.scale * 100.0) as u8 ^ (viewport.rotation / 90) as u8,
            remaining: self.steps,
            fail: self.fail_midway.contains(&page),
            cancel,
        }))
    }
}

struct FakeJob {
    page: PageId,
    width: u32,
    height: u32,
    seed: u8,
    remaining: u32,
    fail: bool,
    cancel: CancellationToken,
}

impl RasterJob for FakeJob {
    fn step(&mut self) -> Result<RasterStep, RenderError> {
        if self.cancel.is_cancelled() {
            return Err(RenderError::Raster("cancelled".to_string()));
        }
        if self.remaining > 0 {
            self.remaining -= 1;
            return Ok(RasterStep::Pending);
        }
        if self.fail {
            return Err(RenderError::Raster(format!("page {} stream is corrupt", self.page)));
        }

        let mut pixels = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                pixels.extend_from_slice(&[
                    self.page as u8,
                    self.seed,
                    (x % 251) as u8,
                    (y % 251) as u8,
                ]);
            }
        }
        Ok(RasterStep::Complete(Surface::from_rgba(
            self.width,
            self.height,
            pixels,
        )?))
    }
}
