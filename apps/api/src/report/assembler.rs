//! Document Assembler: concatenates paginated pages into one immutable document and
//! stamps every page with the uniform footer once the total page count is known.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::layout::paginator::{Page, PageFooter};
use crate::layout::raster::RasterStats;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub company: String,
    pub period: String,
    /// Explicit input so identical evaluations assemble identical documents.
    pub generated_at: DateTime<Utc>,
}

impl DocumentMetadata {
    pub fn generated_on(&self) -> String {
        self.generated_at.format("%Y-%m-%d").to_string()
    }
}

/// Finalized report. Fields are read-only once assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    metadata: DocumentMetadata,
    pages: Vec<Page>,
    raster: RasterStats,
}

impl Document {
    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn raster_stats(&self) -> RasterStats {
        self.raster
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("document has no pages")]
    Empty,

    #[error("company name is required to stamp page footers")]
    MissingCompany,
}

/// Renumbers pages 1..=N in order, then stamps footers in a second pass.
pub fn assemble(
    metadata: DocumentMetadata,
    mut pages: Vec<Page>,
    raster: RasterStats,
) -> Result<Document, AssemblyError> {
    if pages.is_empty() {
        return Err(AssemblyError::Empty);
    }
    if metadata.company.trim().is_empty() {
        return Err(AssemblyError::MissingCompany);
    }

    for (i, page) in pages.iter_mut().enumerate() {
        page.number = i + 1;
    }

    let total = pages.len();
    let generated_on = metadata.generated_on();
    for page in &mut pages {
        page.footer = Some(PageFooter {
            company: metadata.company.clone(),
            generated_on: generated_on.clone(),
            page: page.number,
            total,
        });
    }

    info!(company = %metadata.company, pages = total, "Document assembled");
    Ok(Document {
        metadata,
        pages,
        raster,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::layout::budget::default_layout_config;
    use crate::layout::paginator::{PageSegment, SectionHeading};

    fn metadata() -> DocumentMetadata {
        DocumentMetadata {
            company: "Acme Foods".to_string(),
            period: "2024".to_string(),
            generated_at: Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap(),
        }
    }

    fn page(number: usize) -> Page {
        Page {
            number,
            segments: vec![PageSegment {
                section_key: "s".to_string(),
                heading: SectionHeading {
                    title: "S".to_string(),
                    continuation: false,
                    part: None,
                },
                blocks: vec![],
            }],
            usage: Default::default(),
            budget: default_layout_config().page,
            footer: None,
        }
    }

    #[test]
    fn test_every_page_stamped_with_total() {
        let doc = assemble(metadata(), vec![page(0), page(0), page(0)], RasterStats::default()).unwrap();
        assert_eq!(doc.page_count(), 3);
        for (i, p) in doc.pages().iter().enumerate() {
            let footer = p.footer.as_ref().unwrap();
            assert_eq!(footer.page, i + 1);
            assert_eq!(p.number, i + 1);
            assert_eq!(footer.total, 3);
            assert_eq!(footer.company, "Acme Foods");
            assert_eq!(footer.generated_on, "2025-03-14");
        }
        assert_eq!(
            doc.pages()[1].footer.as_ref().unwrap().display(),
            "Acme Foods · 2025-03-14 · Page 2 of 3"
        );
    }

    #[test]
    fn test_empty_document_is_error() {
        assert_eq!(
            assemble(metadata(), vec![], RasterStats::default()),
            Err(AssemblyError::Empty)
        );
    }

    #[test]
    fn test_missing_company_is_error() {
        let meta = DocumentMetadata {
            company: "  ".to_string(),
            ..metadata()
        };
        assert_eq!(
            assemble(meta, vec![page(1)], RasterStats::default()),
            Err(AssemblyError::MissingCompany)
        );
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let a = assemble(metadata(), vec![page(1), page(2)], RasterStats::default()).unwrap();
        let b = assemble(metadata(), vec![page(1), page(2)], RasterStats::default()).unwrap();
        assert_eq!(a, b);
    }
}
