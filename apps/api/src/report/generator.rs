//! End-to-end report generation for one evaluation snapshot.
//!
//! Runs as a single task: analysis → composition → pagination → rasterization →
//! assembly. The only suspension points are the rasterization bridge's paint waits
//! and artifact persistence. The caller owns the surface factory; each call leases
//! its own surface.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::analysis::{run_analysis, Analysis};
use crate::layout::budget::LayoutConfig;
use crate::layout::paginator::{LayoutError, Paginator};
use crate::layout::raster::{rasterize_pages, RasterConfig};
use crate::layout::surface::SurfaceFactory;
use crate::models::Evaluation;
use crate::report::assembler::{assemble, AssemblyError, Document, DocumentMetadata};
use crate::report::composer::compose_report;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("layout failed: {0}")]
    Layout(#[from] LayoutError),

    #[error("assembly failed: {0}")]
    Assembly(#[from] AssemblyError),
}

#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub analysis: Analysis,
    pub document: Document,
}

pub struct ReportOptions<'a> {
    pub layout: &'a LayoutConfig,
    pub raster: &'a RasterConfig,
    pub surfaces: &'a dyn SurfaceFactory,
}

/// Generates the finished document. `generated_at` is an input so that equal
/// evaluations with equal timestamps produce equal documents.
pub async fn generate_document(
    eval: &Evaluation,
    generated_at: DateTime<Utc>,
    options: ReportOptions<'_>,
) -> Result<GeneratedReport, ReportError> {
    let analysis = run_analysis(eval);

    let entries = compose_report(eval, &analysis, options.layout);
    let mut pagination = Paginator::new(options.layout).paginate(entries)?;
    info!(pages = pagination.pages.len(), "Pagination complete");

    let raster = rasterize_pages(&mut pagination.pages, options.surfaces, options.raster).await;

    let metadata = DocumentMetadata {
        company: eval.company.name.clone(),
        period: eval.period.clone(),
        generated_at,
    };
    let document = assemble(metadata, pagination.pages, raster)?;

    Ok(GeneratedReport { analysis, document })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::layout::blocks::BlockBody;
    use crate::layout::budget::default_layout_config;
    use crate::layout::surface::SoftwareSurfaceFactory;
    use crate::models::{CarbonInputs, CompanyProfile, FuelInputs, RepProduct, WasteInputs};
    use crate::report::artifact::fingerprint;

    fn make_eval() -> Evaluation {
        Evaluation {
            company: CompanyProfile {
                name: "Acme Foods".to_string(),
                sector: "Food processing".to_string(),
                region: "Valparaíso".to_string(),
                employees: 25.0,
            },
            period: "2024".to_string(),
            carbon: CarbonInputs {
                fuels: FuelInputs {
                    diesel_l: 5_000.0,
                    ..FuelInputs::default()
                },
                electricity_kwh: 90_000.0,
            },
            waste: WasteInputs {
                generated_kg: 2_000.0,
                valorized_kg: 700.0,
                rep_products: (0..5)
                    .map(|i| RepProduct {
                        name: format!("Packaging {i}"),
                        generated_kg: 100.0,
                        valorized_kg: 20.0 * i as f64,
                        ..RepProduct::default()
                    })
                    .collect(),
            },
            ..Evaluation::default()
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap()
    }

    async fn generate(factory: &SoftwareSurfaceFactory) -> GeneratedReport {
        let layout = default_layout_config();
        let raster = RasterConfig {
            scale: 2,
            ..RasterConfig::default()
        };
        generate_document(
            &make_eval(),
            at(),
            ReportOptions {
                layout: &layout,
                raster: &raster,
                surfaces: factory,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_generation_is_idempotent() {
        let factory = SoftwareSurfaceFactory::new();
        let a = generate(&factory).await;
        let b = generate(&factory).await;
        assert_eq!(a.document, b.document);
        assert_eq!(
            fingerprint(&a.document).unwrap(),
            fingerprint(&b.document).unwrap()
        );
        assert_eq!(factory.live_surfaces(), 0);
    }

    #[tokio::test]
    async fn test_all_widgets_rasterized_and_pages_stamped() {
        let factory = SoftwareSurfaceFactory::new();
        let report = generate(&factory).await;
        let doc = &report.document;
        let stats = doc.raster_stats();
        assert!(stats.captured > 0);
        assert_eq!(stats.fallbacks, 0);
        for page in doc.pages() {
            assert!(page.blocks().all(|b| !matches!(b.body(), BlockBody::Widget(_))));
            let footer = page.footer.as_ref().unwrap();
            assert_eq!(footer.total, doc.page_count());
        }
    }

    #[tokio::test]
    async fn test_rep_section_spans_two_pages() {
        let factory = SoftwareSurfaceFactory::new();
        let report = generate(&factory).await;
        let rep_pages: Vec<_> = report
            .document
            .pages()
            .iter()
            .flat_map(|p| p.segments.iter())
            .filter(|s| s.section_key == "rep-products")
            .collect();
        assert_eq!(rep_pages.len(), 2);
        assert_eq!(rep_pages[1].heading.part, Some((2, 2)));
        assert_eq!(rep_pages[1].blocks.len(), 2);
    }

    #[tokio::test]
    async fn test_sections_appear_in_declared_order() {
        let factory = SoftwareSurfaceFactory::new();
        let report = generate(&factory).await;
        let mut keys: Vec<&str> = report
            .document
            .pages()
            .iter()
            .flat_map(|p| p.segments.iter().map(|s| s.section_key.as_str()))
            .collect();
        keys.dedup();
        assert_eq!(keys.first(), Some(&"cover"));
        assert_eq!(keys.last(), Some(&"closing"));
        let pos = |k: &str| keys.iter().position(|x| *x == k).unwrap();
        assert!(pos("strengths") < pos("opportunities"));
        assert!(pos("opportunities") < pos("rep-products"));
        assert!(pos("rep-products") < pos("recs-high"));
        assert!(pos("quick-wins") < pos("roadmap"));
    }
}
