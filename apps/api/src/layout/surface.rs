//! Off-document rendering surfaces.
//!
//! A surface is acquired per generation through a `SurfaceFactory` and wrapped in a
//! `SurfaceLease`, which disposes it on drop. Every exit path of the bridge, early
//! return and panic unwinding included, therefore releases the surface.
//!
//! `render` mounts a widget and returns a `PaintSignal` that resolves once painting
//! is complete. Callers await that signal (bounded by a timeout) before `capture`.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use resvg::tiny_skia::{Color, Pixmap, Transform};
use resvg::usvg::{self, fontdb};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::layout::blocks::Widget;
use crate::layout::chart_svg::widget_svg;

// ────────────────────────────────────────────────────────────────────────────
// Bitmap
// ────────────────────────────────────────────────────────────────────────────

/// A captured raster, stored PNG-encoded. `width`×`height` are physical pixels and
/// `scale` is the oversampling factor it was captured at, so `width / scale` is the
/// logical width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub scale: u32,
    #[serde(with = "png_base64")]
    png: Vec<u8>,
}

impl Bitmap {
    /// Encodes a rendered pixmap. Pixmap colours are premultiplied; PNG stores
    /// straight alpha.
    pub fn from_pixmap(pixmap: &Pixmap, scale: u32) -> Result<Self, RasterError> {
        let rgba: Vec<u8> = pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        let png = encode_png(pixmap.width(), pixmap.height(), &rgba)
            .map_err(|e| RasterError::Capture(format!("PNG encoding failed: {e}")))?;
        Ok(Self {
            width: pixmap.width(),
            height: pixmap.height(),
            scale: scale.max(1),
            png,
        })
    }

    /// Transparent bitmap of `width`×`height` physical pixels.
    #[cfg(test)]
    pub fn blank(width: u32, height: u32, scale: u32) -> Self {
        let pixmap = Pixmap::new(width, height).unwrap();
        Self::from_pixmap(&pixmap, scale).unwrap()
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn logical_size(&self) -> (u32, u32) {
        (self.width / self.scale, self.height / self.scale)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

fn encode_png(width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>, png::EncodingError> {
    let mut out = Vec::new();
    let mut encoder = png::Encoder::new(&mut out, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgba)?;
    writer.finish()?;
    Ok(out)
}

mod png_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(png: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(png))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// Parses `svg` and renders it at `scale`× onto a white pixmap.
fn rasterize_svg(
    svg: &str,
    (width, height): (u32, u32),
    scale: u32,
    fonts: Arc<fontdb::Database>,
) -> Result<Bitmap, RasterError> {
    let scale = scale.max(1);
    let options = usvg::Options {
        fontdb: fonts,
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_data(svg.as_bytes(), &options)
        .map_err(|e| RasterError::Capture(format!("SVG parse failed: {e}")))?;

    let (pw, ph) = width
        .checked_mul(scale)
        .zip(height.checked_mul(scale))
        .ok_or_else(|| RasterError::Capture("bitmap dimensions overflow".to_string()))?;
    let mut pixmap = Pixmap::new(pw, ph)
        .ok_or_else(|| RasterError::Capture(format!("cannot allocate {pw}×{ph} pixmap")))?;
    pixmap.fill(Color::WHITE);
    resvg::render(
        &tree,
        Transform::from_scale(scale as f32, scale as f32),
        &mut pixmap.as_mut(),
    );
    Bitmap::from_pixmap(&pixmap, scale)
}

// ────────────────────────────────────────────────────────────────────────────
// Errors and signals
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("rendering surface unavailable: {0}")]
    Unavailable(String),

    #[error("rendering surface already disposed")]
    Disposed,

    #[error("nothing rendered on surface")]
    NothingRendered,

    #[error("paint failed: {0}")]
    Paint(String),

    #[error("paint not complete after {0:?}")]
    Timeout(Duration),

    #[error("capture failed: {0}")]
    Capture(String),
}

/// Resolves when the surface has finished painting the mounted widget.
pub struct PaintSignal(oneshot::Receiver<()>);

impl PaintSignal {
    pub fn channel() -> (oneshot::Sender<()>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self(rx))
    }

    /// Already-resolved signal, for surfaces that paint synchronously.
    pub fn ready() -> Self {
        let (tx, signal) = Self::channel();
        let _ = tx.send(());
        signal
    }

    /// Waits for paint completion, at most `limit`.
    pub async fn wait(self, limit: Duration) -> Result<(), RasterError> {
        match tokio::time::timeout(limit, self.0).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(RasterError::Paint(
                "surface dropped before signalling paint completion".to_string(),
            )),
            Err(_) => Err(RasterError::Timeout(limit)),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Traits
// ────────────────────────────────────────────────────────────────────────────

/// One exclusively-owned off-document rendering surface.
#[async_trait]
pub trait RenderSurface: Send {
    /// Mounts `widget`, replacing whatever was mounted before.
    async fn render(&mut self, widget: &Widget) -> Result<PaintSignal, RasterError>;

    /// Captures the mounted widget at `scale`× oversampling.
    async fn capture(&mut self, scale: u32) -> Result<Bitmap, RasterError>;

    /// Releases the surface. Must be idempotent.
    fn dispose(&mut self);
}

/// Hands out fresh surfaces. Carried in `AppState` as `Arc<dyn SurfaceFactory>`.
pub trait SurfaceFactory: Send + Sync {
    fn acquire(&self) -> Result<SurfaceLease, RasterError>;
}

/// Scoped ownership of a surface; disposes it when dropped.
pub struct SurfaceLease {
    surface: Box<dyn RenderSurface>,
}

impl SurfaceLease {
    pub fn new(surface: Box<dyn RenderSurface>) -> Self {
        Self { surface }
    }
}

impl Deref for SurfaceLease {
    type Target = dyn RenderSurface;

    fn deref(&self) -> &Self::Target {
        self.surface.as_ref()
    }
}

impl DerefMut for SurfaceLease {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.surface.as_mut()
    }
}

impl Drop for SurfaceLease {
    fn drop(&mut self) {
        self.surface.dispose();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SoftwareSurface: default in-process implementation
// ────────────────────────────────────────────────────────────────────────────

/// Widget markup mounted on a surface, waiting for capture.
struct Mounted {
    svg: String,
    size: (u32, u32),
}

/// Renders widget SVG with resvg. Parsing and rasterization run on the blocking pool.
pub struct SoftwareSurface {
    mounted: Option<Mounted>,
    fonts: Arc<fontdb::Database>,
    disposed: bool,
    live: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderSurface for SoftwareSurface {
    async fn render(&mut self, widget: &Widget) -> Result<PaintSignal, RasterError> {
        if self.disposed {
            return Err(RasterError::Disposed);
        }
        check_paintable(widget)?;
        self.mounted = Some(Mounted {
            svg: widget_svg(widget),
            size: widget.logical_size(),
        });
        Ok(PaintSignal::ready())
    }

    async fn capture(&mut self, scale: u32) -> Result<Bitmap, RasterError> {
        if self.disposed {
            return Err(RasterError::Disposed);
        }
        let mounted = self.mounted.as_ref().ok_or(RasterError::NothingRendered)?;
        let svg = mounted.svg.clone();
        let size = mounted.size;
        let fonts = Arc::clone(&self.fonts);
        tokio::task::spawn_blocking(move || rasterize_svg(&svg, size, scale, fonts))
            .await
            .map_err(|e| RasterError::Capture(format!("rasterization task failed: {e}")))?
    }

    fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            self.mounted = None;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Rejects widgets that cannot be drawn meaningfully.
fn check_paintable(widget: &Widget) -> Result<(), RasterError> {
    let finite = match widget {
        Widget::ScoreGauge { score, .. } => score.is_finite(),
        Widget::Badge { .. } => true,
        Widget::BarChart { bars, .. } => bars
            .iter()
            .all(|b| b.value.is_finite() && b.target.map_or(true, f64::is_finite)),
        Widget::ScopeBar {
            scope1_kg,
            scope2_kg,
        } => scope1_kg.is_finite() && scope2_kg.is_finite(),
    };
    if !finite {
        return Err(RasterError::Paint("non-finite value in widget".to_string()));
    }
    let (w, h) = widget.logical_size();
    if w == 0 || h == 0 {
        return Err(RasterError::Paint("widget has zero size".to_string()));
    }
    Ok(())
}

/// Factory for `SoftwareSurface`s; counts surfaces not yet disposed. System fonts
/// are loaded once and shared by every surface.
#[derive(Clone)]
pub struct SoftwareSurfaceFactory {
    fonts: Arc<fontdb::Database>,
    live: Arc<AtomicUsize>,
}

impl SoftwareSurfaceFactory {
    pub fn new() -> Self {
        let mut fonts = fontdb::Database::new();
        fonts.load_system_fonts();
        Self::with_fonts(fonts)
    }

    pub fn with_fonts(fonts: fontdb::Database) -> Self {
        Self {
            fonts: Arc::new(fonts),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn font_faces(&self) -> usize {
        self.fonts.len()
    }

    pub fn live_surfaces(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Default for SoftwareSurfaceFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceFactory for SoftwareSurfaceFactory {
    fn acquire(&self) -> Result<SurfaceLease, RasterError> {
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(SurfaceLease::new(Box::new(SoftwareSurface {
            mounted: None,
            fonts: Arc::clone(&self.fonts),
            disposed: false,
            live: Arc::clone(&self.live),
        })))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
