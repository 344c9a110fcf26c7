//! Pageflow Scheduler Library
//!
//! Visibility computation, cooperative page render tasks and the priority
//! rendering queue of the page viewer.
//!
//! The scheduler never renders anything itself. A host computes which pages
//! are visible ([`visible_pages`]), asks the [`RenderingQueue`] for the single
//! page that should receive rendering attention, and drives that page's
//! [`PageRenderTask`] one slice at a time. Tasks yield at checkpoints, pause
//! when they lose the highest-priority designation, and can be cancelled at
//! any checkpoint.
//!
//! # Example
//!
//! ```
//! use pageflow_scheduler::{visible_pages, PageBox, ViewportRect, VisibilityOptions};
//!
//! let boxes = vec![
//!     PageBox::new(1, 0.0, 0.0, 800.0, 1000.0),
//!     PageBox::new(2, 0.0, 1000.0, 800.0, 1000.0),
//!     PageBox::new(3, 0.0, 2000.0, 800.0, 1000.0),
//! ];
//! let viewport = ViewportRect::new(0.0, 500.0, 800.0, 1000.0);
//!
//! let report = visible_pages(&viewport, &boxes, VisibilityOptions::default());
//! assert_eq!(report.len(), 2);
//! assert_eq!(report.first.map(|p| p.id), Some(1));
//! assert_eq!(report.last.map(|p| p.id), Some(2));
//! ```

pub mod frame_budget;
mod queue;
mod task;
pub mod visibility;

/// 1-based page number. Page `n` lives at index `n - 1` of every view list.
pub type PageId = u32;

// Re-export public API
pub use frame_budget::SliceBudget;
pub use queue::{RenderableView, RenderingId, RenderingQueue, RenderingState, CLEANUP_TIMEOUT};
pub use task::{
    CancellationToken, PageRenderTask, RasterJob, RasterStep, RenderError, RenderParams, Surface,
    TaskProgress,
};
pub use visibility::{
    visible_pages, PageBox, ViewportRect, VisibilityOptions, VisibilityReport, VisibleArea,
    VisiblePage,
};
