//! Pageflow Viewer Library
//!
//! Paginated document viewer core: page layout, per-page render state,
//! thumbnails and the [`Viewer`] that ties them to the scheduler and the view
//! buffer.
//!
//! Document decoding stays outside. A [`PageSource`] reports page sizes and
//! hands out cooperative [`RasterJob`]s; the viewer decides which page renders
//! next and keeps only a bounded number of realized pages.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Instant;
//!
//! use pageflow_viewer::{EmptySource, SliceBudget, Viewer, ViewerConfig, ViewerContext};
//!
//! let ctx = ViewerContext::new(ViewerConfig::default(), Arc::new(EmptySource));
//! let mut viewer = Viewer::new(ctx).unwrap();
//! let now = Instant::now();
//! viewer.resize(800.0, 600.0, now);
//!
//! let mut budget = SliceBudget::for_60fps();
//! while viewer.pump(now, &mut budget) {
//!     budget.reset();
//! }
//! viewer.poll_timers(now);
//! for event in viewer.drain_events() {
//!     println!("{:?}", event);
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod layout;
pub mod page_view;
pub mod scale;
pub mod scroll;
pub mod source;
pub mod thumbnails;
pub mod viewer;

#[cfg(test)]
mod test_support;

// Re-export public API
pub use config::ViewerConfig;
pub use error::{ConfigError, ViewerError};
pub use events::{Location, LocationScale, ViewerEvent};
pub use geometry::{normalize_rotation, PageSize, PageViewport, PDF_TO_CSS_UNITS};
pub use layout::{Layout, LayoutOptions, ScrollMode, SpreadMode};
pub use page_view::{
    PageView, RenderOutcome, RenderState, RenderedSurface, SliceResult, UpdateArgs, UpdateOutcome,
};
pub use scale::{ScalePreset, ScaleValue};
pub use scroll::ScrollState;
pub use source::{EmptySource, PageSource, ViewerContext};
pub use thumbnails::{ThumbnailStrip, ThumbnailView};
pub use viewer::Viewer;

pub use pageflow_cache::{BufferStats, ViewBuffer};
pub use pageflow_scheduler::{
    CancellationToken, PageId, RasterJob, RasterStep, RenderError, RenderParams, RenderingId,
    RenderingState, SliceBudget, Surface,
};
