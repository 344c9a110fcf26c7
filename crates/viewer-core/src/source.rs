use std::fmt;
use std::sync::Arc;

use pageflow_scheduler::{CancellationToken, PageId, RasterJob, RenderError};

use crate::config::ViewerConfig;
use crate::geometry::{PageSize, PageViewport};

/// Document collaborator supplying page geometry and rasterization work
///
/// Pages are numbered from 1.
pub trait PageSource {
    fn page_count(&self) -> u32;

    /// Unscaled size of `page`, `None` if the page does not exist
    fn page_size(&self, page: PageId) -> Option<PageSize>;

    /// Start rasterizing `page` at `viewport`, including its output scale
    ///
    /// The job should stop early once `cancel` fires.
    fn rasterize(
        &self,
        page: PageId,
        viewport: &PageViewport,
        cancel: CancellationToken,
    ) -> Result<Box<dyn RasterJob>, RenderError>;
}

/// A source with no pages, used before a document is set
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptySource;

impl PageSource for EmptySource {
    fn page_count(&self) -> u32 {
        0
    }

    fn page_size(&self, _page: PageId) -> Option<PageSize> {
        None
    }

    fn rasterize(
        &self,
        page: PageId,
        _viewport: &PageViewport,
        _cancel: CancellationToken,
    ) -> Result<Box<dyn RasterJob>, RenderError> {
        Err(RenderError::PageNotLoaded(page))
    }
}

/// Configuration and document shared by every view
#[derive(Clone)]
pub struct ViewerContext {
    pub config: ViewerConfig,
    pub source: Arc<dyn PageSource>,
}

impl ViewerContext {
    pub fn new(config: ViewerConfig, source: Arc<dyn PageSource>) -> Self {
        Self { config, source }
    }

    /// Context without a document
    pub fn empty(config: ViewerConfig) -> Self {
        Self::new(config, Arc::new(EmptySource))
    }
}

impl fmt::Debug for ViewerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewerContext")
            .field("config", &self.config)
            .field("page_count", &self.source.page_count())
            .finish()
    }
}
