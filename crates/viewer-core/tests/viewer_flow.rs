use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pageflow_viewer::{
    CancellationToken, PageId, PageSize, PageSource, PageViewport, RasterJob, RasterStep,
    RenderError, RenderingState, ScalePreset, ScaleValue, SliceBudget, Surface, Viewer,
    ViewerConfig, ViewerContext, ViewerEvent,
};

/// Letter-sized pages filled with a colour derived from page and scale
struct SolidSource {
    pages: u32,
    steps: u32,
    started: Arc<AtomicUsize>,
}

impl SolidSource {
    fn new(pages: u32) -> Self {
        Self {
            pages,
            steps: 2,
            started: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl PageSource for SolidSource {
    fn page_count(&self) -> u32 {
        self.pages
    }

    fn page_size(&self, page: PageId) -> Option<PageSize> {
        (1..=self.pages)
            .contains(&page)
            .then(|| PageSize::new(306.0, 396.0))
    }

    fn rasterize(
        &self,
        page: PageId,
        viewport: &PageViewport,
        cancel: CancellationToken,
    ) -> Result<Box<dyn RasterJob>, RenderError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let (width, height) = viewport.surface_size();
        Ok(Box::new(SolidJob {
            color: [page as u8, (viewport.scale * 10.0) as u8, 0, 255],
            width,
            height,
            remaining: self.steps,
            cancel,
        }))
    }
}

struct SolidJob {
    color: [u8; 4],
    width: u32,
    height: u32,
    remaining: u32,
    cancel: CancellationToken,
}

impl RasterJob for SolidJob {
    fn step(&mut self) -> Result<RasterStep, RenderError> {
        if self.cancel.is_cancelled() {
            return Err(RenderError::Raster("cancelled".to_string()));
        }
        if self.remaining > 0 {
            self.remaining -= 1;
            return Ok(RasterStep::Pending);
        }
        let pixels = self.color.repeat(self.width as usize * self.height as usize);
        Ok(RasterStep::Complete(Surface::from_rgba(
            self.width,
            self.height,
            pixels,
        )?))
    }
}

fn budget() -> SliceBudget {
    SliceBudget::new(Duration::from_secs(60))
}

fn open(source: SolidSource, config: ViewerConfig, now: Instant) -> Viewer {
    let ctx = ViewerContext::new(config, Arc::new(source));
    let mut viewer = Viewer::new(ctx).unwrap();
    viewer.resize(800.0, 600.0, now);
    viewer
}

fn drain_all(viewer: &mut Viewer, now: Instant) {
    while viewer.pump(now, &mut budget()) {}
}

#[test]
fn long_scroll_keeps_buffer_bounded() {
    let now = Instant::now();
    let config = ViewerConfig::default().with_default_scale(ScaleValue::Value(1.0));
    let mut viewer = open(SolidSource::new(200), config, now);
    drain_all(&mut viewer, now);

    let max_top = viewer.layout().height() - 600.0;
    let mut top = 0.0;
    while top < max_top {
        top += 250.0;
        viewer.scroll_to(0.0, top, now);
        drain_all(&mut viewer, now);

        let stats = viewer.buffer_stats();
        assert!(stats.len <= stats.capacity);
        for page in viewer.visible().iter() {
            assert!(
                viewer.buffered_pages().contains(&page.id),
                "visible page {} was evicted",
                page.id
            );
            assert!(viewer.page_surface(page.id).is_some());
        }
    }

    assert_eq!(viewer.current_page(), 200);
    let realized = (1..=200)
        .filter(|&page| viewer.page_surface(page).is_some())
        .count();
    assert!(realized <= viewer.buffer_stats().capacity);
}

#[test]
fn zoom_round_trip_keeps_surfaces_byte_identical() {
    let now = Instant::now();
    let source = SolidSource::new(20);
    let started = Arc::clone(&source.started);
    let config = ViewerConfig::default().with_default_scale(ScaleValue::Value(1.0));
    let mut viewer = open(source, config, now);
    drain_all(&mut viewer, now);

    let finished: Vec<PageId> = (1..=20)
        .filter(|&page| viewer.page_surface(page).is_some())
        .collect();
    let before: Vec<Surface> = finished
        .iter()
        .map(|&page| viewer.page_surface(page).unwrap().clone())
        .collect();
    let renders = started.load(Ordering::SeqCst);

    viewer.set_scale(1.75, now).unwrap();
    viewer.set_scale(1.0, now).unwrap();

    let after: Vec<Surface> = finished
        .iter()
        .map(|&page| viewer.page_surface(page).unwrap().clone())
        .collect();
    assert_eq!(before, after);

    // Only the render started at 1.75 ran; nothing is left to do at 1.0
    assert_eq!(started.load(Ordering::SeqCst), renders + 1);
    assert!(!viewer.pump(now, &mut budget()));
}

#[test]
fn idle_follows_the_last_render() {
    let now = Instant::now();
    let config = ViewerConfig::default()
        .with_default_scale(ScaleValue::Preset(ScalePreset::PageFit))
        .with_cleanup_timeout(Duration::from_secs(1));
    let mut viewer = open(SolidSource::new(2), config, now);
    drain_all(&mut viewer, now);

    for page in 1..=2 {
        assert_eq!(
            viewer.page_view(page).map(|view| view.state().rendering_state()),
            Some(RenderingState::Finished)
        );
    }

    viewer.poll_timers(now + Duration::from_secs(2));
    let events = viewer.drain_events();
    assert_eq!(events.last(), Some(&ViewerEvent::Idle));
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, ViewerEvent::PageRendered { .. }))
            .count(),
        2
    );
}

#[test]
fn config_file_drives_the_viewer() {
    let now = Instant::now();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("viewer.json");
    std::fs::write(
        &path,
        r#"{ "cache_size": 4, "scroll_mode": "horizontal", "default_scale": "0.5" }"#,
    )
    .unwrap();

    let config = ViewerConfig::from_file(&path).unwrap();
    let mut viewer = open(SolidSource::new(30), config, now);
    drain_all(&mut viewer, now);

    assert_eq!(viewer.current_scale(), 0.5);
    // Half-scale pages are 204 px wide and sit side by side
    let visible: Vec<PageId> = viewer.visible().iter().map(|page| page.id).collect();
    assert!(visible.contains(&1) && visible.contains(&2));

    let location = viewer.location().unwrap();
    let json = serde_json::to_value(location).unwrap();
    assert_eq!(json["pageNumber"], 1);
    assert_eq!(json["scale"], 50.0);
}
