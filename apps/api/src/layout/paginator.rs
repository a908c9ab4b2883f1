//! Layout Paginator: distributes sectioned content blocks over fixed-size pages.
//!
//! Input is an ordered list of `LayoutEntry`s. Fixed pages are emitted as-is (their
//! content is bounded by construction, but still checked against the budget).
//! Sections are sliced in item order into chunks of at most `capacity` items that
//! also fit the page budget; each chunk becomes one page, and chunks after the first
//! are marked as continuations with a "(X/Y)" part indicator.
//!
//! Sections never interleave mid-page. A section declared `joins_previous` may start
//! on the last page of the preceding section, but only if its whole first chunk fits
//! there; otherwise it starts on a fresh page like any other section.
//!
//! Blocks are never split: a block either fits on the current page or moves whole to
//! the next one. A block too large for an empty page is an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::layout::blocks::{BlockKind, ContentBlock};
use crate::layout::budget::{LayoutConfig, PageBudget, PageUsage};

// ────────────────────────────────────────────────────────────────────────────
// Input
// ────────────────────────────────────────────────────────────────────────────

/// A logical run of items paginated together.
#[derive(Debug, Clone)]
pub struct Section {
    pub key: String,
    pub title: String,
    /// Maximum items per page.
    pub capacity: usize,
    pub items: Vec<ContentBlock>,
    /// May begin on the last page of the previous section.
    pub joins_previous: bool,
}

impl Section {
    pub fn new(key: impl Into<String>, title: impl Into<String>, capacity: usize) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            capacity,
            items: Vec::new(),
            joins_previous: false,
        }
    }

    pub fn with_items(mut self, items: Vec<ContentBlock>) -> Self {
        self.items = items;
        self
    }

    pub fn joining_previous(mut self) -> Self {
        self.joins_previous = true;
        self
    }
}

/// A structural page whose content never needs pagination.
#[derive(Debug, Clone)]
pub struct FixedPage {
    pub key: String,
    pub title: String,
    pub blocks: Vec<ContentBlock>,
}

#[derive(Debug, Clone)]
pub enum LayoutEntry {
    Fixed(FixedPage),
    Section(Section),
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionHeading {
    pub title: String,
    pub continuation: bool,
    /// `(X, Y)`: part X of Y. `None` when the section fits on one page.
    pub part: Option<(usize, usize)>,
}

impl SectionHeading {
    /// Heading text as printed, e.g. "Priority recommendations (continued) (2/3)".
    pub fn display(&self) -> String {
        let mut text = self.title.clone();
        if self.continuation {
            text.push_str(" (continued)");
        }
        if let Some((x, y)) = self.part {
            text.push_str(&format!(" ({x}/{y})"));
        }
        text
    }
}

/// The run of one section's blocks on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSegment {
    pub section_key: String,
    pub heading: SectionHeading,
    pub blocks: Vec<ContentBlock>,
}

/// Uniform per-page footer, stamped after the total page count is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFooter {
    pub company: String,
    pub generated_on: String,
    pub page: usize,
    pub total: usize,
}

impl PageFooter {
    pub fn display(&self) -> String {
        format!(
            "{} · {} · Page {} of {}",
            self.company, self.generated_on, self.page, self.total
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based sequence number.
    pub number: usize,
    pub segments: Vec<PageSegment>,
    pub usage: PageUsage,
    /// Capacities that were applied while filling this page.
    pub budget: PageBudget,
    pub footer: Option<PageFooter>,
}

impl Page {
    pub fn blocks(&self) -> impl Iterator<Item = &ContentBlock> {
        self.segments.iter().flat_map(|s| s.blocks.iter())
    }

    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut ContentBlock> {
        self.segments.iter_mut().flat_map(|s| s.blocks.iter_mut())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionStats {
    pub key: String,
    pub items: usize,
    /// Number of chunks ("parts") the section was cut into.
    pub parts: usize,
    pub joined_previous: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub pages: Vec<Page>,
    pub sections: Vec<SectionStats>,
}

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("section '{0}' has zero capacity")]
    ZeroCapacity(String),

    #[error("block '{id}' ({footprint:.1} mm) does not fit on an empty page")]
    OversizedBlock { id: String, footprint: f32 },

    #[error("fixed page '{0}' exceeds the page budget")]
    FixedPageOverflow(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Paginator
// ────────────────────────────────────────────────────────────────────────────

pub struct Paginator {
    budget: PageBudget,
    heading_mm: f32,
}

impl Paginator {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            budget: config.page,
            heading_mm: config.text.heading_height_mm,
        }
    }

    pub fn paginate(&self, entries: Vec<LayoutEntry>) -> Result<Pagination, LayoutError> {
        let mut pages: Vec<Page> = Vec::new();
        let mut stats = Vec::new();
        // Whether the last emitted page came from a section (and so may be joined).
        let mut last_is_section = false;

        for entry in entries {
            match entry {
                LayoutEntry::Fixed(fixed) => {
                    pages.push(self.fixed_page(fixed)?);
                    last_is_section = false;
                }
                LayoutEntry::Section(section) => {
                    let key = section.key.clone();
                    let items = section.items.len();
                    let joins = section.joins_previous;
                    let chunks = self.chunk(&section)?;
                    let parts = chunks.len();
                    if parts == 0 {
                        stats.push(SectionStats {
                            key,
                            items,
                            parts,
                            joined_previous: false,
                        });
                        continue;
                    }

                    let mut segments = chunks.into_iter().enumerate().map(|(i, (blocks, usage))| {
                        let heading = SectionHeading {
                            title: section.title.clone(),
                            continuation: i > 0,
                            part: (parts > 1).then_some((i + 1, parts)),
                        };
                        (
                            PageSegment {
                                section_key: key.clone(),
                                heading,
                                blocks,
                            },
                            usage,
                        )
                    });

                    let mut joined = false;
                    if let Some((first, first_usage)) = segments.next() {
                        let joinable = joins
                            && last_is_section
                            && pages
                                .last()
                                .is_some_and(|p| self.can_join(p.usage, first_usage));
                        match pages.last_mut().filter(|_| joinable) {
                            Some(page) => {
                                page.usage = merge(page.usage, first_usage);
                                page.segments.push(first);
                                joined = true;
                            }
                            None => pages.push(self.page(first, first_usage)),
                        }
                    }
                    for (segment, usage) in segments {
                        pages.push(self.page(segment, usage));
                    }

                    debug!(section = %key, items, parts, joined, "Section paginated");
                    stats.push(SectionStats {
                        key,
                        items,
                        parts,
                        joined_previous: joined,
                    });
                    last_is_section = true;
                }
            }
        }

        for (i, page) in pages.iter_mut().enumerate() {
            page.number = i + 1;
        }
        Ok(Pagination {
            pages,
            sections: stats,
        })
    }

    fn page(&self, segment: PageSegment, usage: PageUsage) -> Page {
        Page {
            number: 0,
            segments: vec![segment],
            usage,
            budget: self.budget,
            footer: None,
        }
    }

    fn fixed_page(&self, fixed: FixedPage) -> Result<Page, LayoutError> {
        let mut usage = self.heading_usage();
        for block in &fixed.blocks {
            if !usage.admits(&self.budget, block.kind(), block.footprint()) {
                return Err(LayoutError::FixedPageOverflow(fixed.key));
            }
            usage.add(block.kind(), block.footprint());
        }
        let segment = PageSegment {
            section_key: fixed.key,
            heading: SectionHeading {
                title: fixed.title,
                continuation: false,
                part: None,
            },
            blocks: fixed.blocks,
        };
        Ok(self.page(segment, usage))
    }

    fn heading_usage(&self) -> PageUsage {
        let mut usage = PageUsage::default();
        usage.add(BlockKind::NativeText, self.heading_mm);
        usage
    }

    /// Greedy slicing by count and weight, preserving item order.
    fn chunk(&self, section: &Section) -> Result<Vec<(Vec<ContentBlock>, PageUsage)>, LayoutError> {
        if section.items.is_empty() {
            return Ok(Vec::new());
        }
        if section.capacity == 0 {
            return Err(LayoutError::ZeroCapacity(section.key.clone()));
        }

        let mut chunks = Vec::new();
        let mut current: Vec<ContentBlock> = Vec::new();
        let mut usage = self.heading_usage();

        for block in &section.items {
            let fits = current.len() < section.capacity
                && usage.admits(&self.budget, block.kind(), block.footprint());
            if !fits {
                if current.is_empty() {
                    return Err(LayoutError::OversizedBlock {
                        id: block.id().to_string(),
                        footprint: block.footprint(),
                    });
                }
                chunks.push((std::mem::take(&mut current), usage));
                usage = self.heading_usage();
                if !usage.admits(&self.budget, block.kind(), block.footprint()) {
                    return Err(LayoutError::OversizedBlock {
                        id: block.id().to_string(),
                        footprint: block.footprint(),
                    });
                }
            }
            usage.add(block.kind(), block.footprint());
            current.push(block.clone());
        }
        chunks.push((current, usage));
        Ok(chunks)
    }

    fn can_join(&self, page: PageUsage, chunk: PageUsage) -> bool {
        merge(page, chunk).within(&self.budget)
    }
}

fn merge(a: PageUsage, b: PageUsage) -> PageUsage {
    PageUsage {
        text_mm: a.text_mm + b.text_mm,
        table_mm: a.table_mm + b.table_mm,
        widget_mm: a.widget_mm + b.widget_mm,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
