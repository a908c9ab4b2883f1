// Layout: content blocks, page budgets, pagination, off-document rendering surfaces
// and the rasterization bridge.
// Widgets are described as SVG and rasterized with resvg inside
// tokio::task::spawn_blocking.

pub mod blocks;
pub mod budget;
pub mod chart_svg;
pub mod paginator;
pub mod raster;
pub mod surface;

pub use budget::{default_layout_config, LayoutConfig};
pub use raster::{RasterConfig, RasterStats};
pub use surface::{SoftwareSurfaceFactory, SurfaceFactory};
