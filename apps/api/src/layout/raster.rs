//! Rasterization Bridge: swaps live widgets for captured bitmaps.
//!
//! One surface is leased per call and used for every widget in page order, one at a
//! time. For each widget: render, await the paint-complete signal (bounded by
//! `settle_timeout`), capture at `scale`× oversampling, replace the block body.
//!
//! Failures never abort generation. The failure is logged and the live widget stays
//! in place as a degraded fallback. The capture itself is not retried.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::layout::blocks::Widget;
use crate::layout::paginator::Page;
use crate::layout::surface::{Bitmap, RasterError, RenderSurface, SurfaceFactory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterConfig {
    /// Oversampling factor, 2 – 4.
    pub scale: u32,
    /// Upper bound on the wait for paint completion.
    pub settle_timeout: Duration,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            scale: 3,
            settle_timeout: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterStats {
    pub captured: usize,
    pub fallbacks: usize,
}

/// Rasterizes every live widget across `pages`, in page and block order.
pub async fn rasterize_pages(
    pages: &mut [Page],
    factory: &dyn SurfaceFactory,
    config: &RasterConfig,
) -> RasterStats {
    let mut stats = RasterStats::default();
    let pending = pages
        .iter()
        .flat_map(|p| p.blocks())
        .filter(|b| b.live_widget().is_some())
        .count();
    if pending == 0 {
        return stats;
    }

    let mut lease = match factory.acquire() {
        Ok(lease) => lease,
        Err(e) => {
            warn!(error = %e, widgets = pending, "No rendering surface; keeping all widgets live");
            stats.fallbacks = pending;
            return stats;
        }
    };

    for page in pages.iter_mut() {
        let number = page.number;
        for block in page.blocks_mut() {
            let Some(widget) = block.live_widget().cloned() else {
                continue;
            };
            match capture_widget(&mut *lease, &widget, config).await {
                Ok(bitmap) => {
                    debug!(
                        block = block.id(),
                        page = number,
                        width = bitmap.width,
                        height = bitmap.height,
                        "Widget captured"
                    );
                    block.replace_with_image(bitmap);
                    stats.captured += 1;
                }
                Err(e) => {
                    warn!(
                        block = block.id(),
                        page = number,
                        error = %e,
                        "Rasterization failed; keeping live widget"
                    );
                    stats.fallbacks += 1;
                }
            }
        }
    }

    info!(
        captured = stats.captured,
        fallbacks = stats.fallbacks,
        scale = config.scale,
        "Rasterization complete"
    );
    stats
}

async fn capture_widget(
    surface: &mut dyn RenderSurface,
    widget: &Widget,
    config: &RasterConfig,
) -> Result<Bitmap, RasterError> {
    let painted = surface.render(widget).await?;
    painted.wait(config.settle_timeout).await?;
    surface.capture(config.scale).await
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::layout::blocks::{BlockBody, ContentBlock, Rgb, TextBody, TextStyle};
    use crate::layout::budget::default_layout_config;
    use crate::layout::paginator::{PageSegment, SectionHeading};
    use crate::layout::surface::{PaintSignal, SoftwareSurfaceFactory, SurfaceLease};

    fn gauge(label: &str, score: f64) -> ContentBlock {
        ContentBlock::widget(
            format!("gauge.{label}"),
            50.0,
            Widget::ScoreGauge {
                label: label.to_string(),
                score,
                color: Rgb::for_score(score),
            },
        )
    }

    fn text(id: &str) -> ContentBlock {
        ContentBlock::text(
            id,
            10.0,
            TextBody {
                heading: None,
                paragraphs: vec![id.to_string()],
                bullets: vec![],
                style: TextStyle::Body,
            },
        )
    }

    fn page(number: usize, blocks: Vec<ContentBlock>) -> Page {
        Page {
            number,
            segments: vec![PageSegment {
                section_key: "summary".to_string(),
                heading: SectionHeading {
                    title: "Summary".to_string(),
                    continuation: false,
                    part: None,
                },
                blocks,
            }],
            usage: Default::default(),
            budget: default_layout_config().page,
            footer: None,
        }
    }

    fn is_image(block: &ContentBlock) -> bool {
        matches!(block.body(), BlockBody::Image(_))
    }

    // ── fakes ───────────────────────────────────────────────────────────────

    enum Mode {
        /// Render fails for widgets whose alt text contains the needle.
        FailOn(&'static str),
        /// Never signals paint completion.
        Hang,
    }

    struct FakeSurface {
        mode: Arc<Mode>,
        mounted: Option<Widget>,
        pending: Vec<oneshot::Sender<()>>,
        disposed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RenderSurface for FakeSurface {
        async fn render(&mut self, widget: &Widget) -> Result<PaintSignal, RasterError> {
            match self.mode.as_ref() {
                Mode::FailOn(needle) if widget.alt_text().contains(needle) => {
                    Err(RasterError::Paint("boom".to_string()))
                }
                Mode::FailOn(_) => {
                    self.mounted = Some(widget.clone());
                    Ok(PaintSignal::ready())
                }
                Mode::Hang => {
                    let (tx, signal) = PaintSignal::channel();
                    self.pending.push(tx);
                    self.mounted = Some(widget.clone());
                    Ok(signal)
                }
            }
        }

        async fn capture(&mut self, scale: u32) -> Result<Bitmap, RasterError> {
            self.mounted
                .as_ref()
                .map(|_| Bitmap::blank(2 * scale, 2 * scale, scale))
                .ok_or(RasterError::NothingRendered)
        }

        fn dispose(&mut self) {
            self.disposed.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeFactory {
        mode: Arc<Mode>,
        disposed: Arc<AtomicUsize>,
    }

    impl FakeFactory {
        fn new(mode: Mode) -> Self {
            Self {
                mode: Arc::new(mode),
                disposed: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl SurfaceFactory for FakeFactory {
        fn acquire(&self) -> Result<SurfaceLease, RasterError> {
            Ok(SurfaceLease::new(Box::new(FakeSurface {
                mode: Arc::clone(&self.mode),
                mounted: None,
                pending: Vec::new(),
                disposed: Arc::clone(&self.disposed),
            })))
        }
    }

    struct NoSurfaces;

    impl SurfaceFactory for NoSurfaces {
        fn acquire(&self) -> Result<SurfaceLease, RasterError> {
            Err(RasterError::Unavailable("pool exhausted".to_string()))
        }
    }

    // ── behaviour ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_all_widgets_captured_text_untouched() {
        let factory = SoftwareSurfaceFactory::new();
        let mut pages = vec![
            page(1, vec![text("intro"), gauge("Carbon", 40.0)]),
            page(2, vec![gauge("Water", 90.0)]),
        ];
        let stats = rasterize_pages(&mut pages, &factory, &RasterConfig::default()).await;

        assert_eq!(stats, RasterStats { captured: 2, fallbacks: 0 });
        let blocks: Vec<&ContentBlock> = pages.iter().flat_map(|p| p.blocks()).collect();
        assert!(matches!(blocks[0].body(), BlockBody::Text(_)));
        assert!(is_image(blocks[1]));
        assert!(is_image(blocks[2]));
        assert_eq!(factory.live_surfaces(), 0);
    }

    #[tokio::test]
    async fn test_capture_uses_configured_scale() {
        let factory = SoftwareSurfaceFactory::new();
        let mut pages = vec![page(1, vec![gauge("Waste", 60.0)])];
        let config = RasterConfig {
            scale: 2,
            ..RasterConfig::default()
        };
        rasterize_pages(&mut pages, &factory, &config).await;
        match pages[0].blocks().next().map(|b| b.body()) {
            Some(BlockBody::Image(img)) => {
                assert_eq!(img.bitmap.scale, 2);
                assert_eq!(img.bitmap.width, 320);
            }
            other => panic!("expected image, got {other:?}"),
        };
    }

    #[tokio::test]
    async fn test_failure_keeps_live_block_and_continues() {
        let factory = FakeFactory::new(Mode::FailOn("Water"));
        let mut pages = vec![page(
            1,
            vec![gauge("Carbon", 40.0), gauge("Water", 90.0), gauge("Waste", 60.0)],
        )];
        let stats = rasterize_pages(&mut pages, &factory, &RasterConfig::default()).await;

        assert_eq!(stats, RasterStats { captured: 2, fallbacks: 1 });
        let blocks: Vec<&ContentBlock> = pages[0].blocks().collect();
        assert!(is_image(blocks[0]));
        assert!(blocks[1].live_widget().is_some());
        assert!(is_image(blocks[2]));
        assert_eq!(factory.disposed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paint_timeout_falls_back() {
        let factory = FakeFactory::new(Mode::Hang);
        let mut pages = vec![page(1, vec![gauge("Carbon", 40.0), gauge("Water", 90.0)])];
        let stats = rasterize_pages(&mut pages, &factory, &RasterConfig::default()).await;

        assert_eq!(stats, RasterStats { captured: 0, fallbacks: 2 });
        assert!(pages[0].blocks().all(|b| b.live_widget().is_some()));
        assert_eq!(factory.disposed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_surface_keeps_everything_live() {
        let mut pages = vec![page(1, vec![gauge("Carbon", 40.0), text("t")])];
        let stats = rasterize_pages(&mut pages, &NoSurfaces, &RasterConfig::default()).await;
        assert_eq!(stats, RasterStats { captured: 0, fallbacks: 1 });
        assert!(pages[0].blocks().next().and_then(|b| b.live_widget()).is_some());
    }

    #[tokio::test]
    async fn test_no_widgets_no_surface_acquired() {
        let factory = SoftwareSurfaceFactory::new();
        let mut pages = vec![page(1, vec![text("only text")])];
        let stats = rasterize_pages(&mut pages, &factory, &RasterConfig::default()).await;
        assert_eq!(stats, RasterStats::default());
    }

    #[tokio::test]
    async fn test_kind_and_footprint_preserved() {
        let factory = SoftwareSurfaceFactory::new();
        let before = gauge("Carbon", 40.0);
        let mut pages = vec![page(1, vec![before.clone()])];
        rasterize_pages(&mut pages, &factory, &RasterConfig::default()).await;
        let after = pages[0].blocks().next().cloned().unwrap();
        assert_eq!(after.kind(), before.kind());
        assert_eq!(after.footprint(), before.footprint());
        assert_eq!(after.id(), before.id());
    }
}
