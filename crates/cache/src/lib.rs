//! Pageflow Cache Library
//!
//! Bounded, eviction-based buffer of realized page views.

pub mod view_buffer;

pub use view_buffer::{BufferStats, ViewBuffer};
