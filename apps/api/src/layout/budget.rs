//! Page budgets and footprint estimation.
//!
//! All lengths are millimetres on an A4 portrait page. The budget is what remains
//! after margins, the page header band and the footer band are reserved.
//!
//! Footprints are estimates, not measurements: text is wrapped greedily at a fixed
//! characters-per-line figure for the body font. The per-kind capacities leave enough
//! slack that an estimate off by a line or two still fits when rendered.

use serde::{Deserialize, Serialize};

use crate::layout::blocks::{BlockKind, TableBody, TextBody, TextStyle};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Capacity limits applied to every paginated page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBudget {
    /// Usable content height (mm).
    pub usable_height_mm: f32,
    pub text_capacity_mm: f32,
    pub table_capacity_mm: f32,
    pub widget_capacity_mm: f32,
}

impl PageBudget {
    pub fn capacity(&self, kind: BlockKind) -> f32 {
        match kind {
            BlockKind::NativeText => self.text_capacity_mm,
            BlockKind::NativeTable => self.table_capacity_mm,
            BlockKind::RasterWidget => self.widget_capacity_mm,
        }
    }
}

/// Maximum items per page for each paginated report section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionCapacities {
    pub strengths: usize,
    pub opportunities: usize,
    pub rep_products: usize,
    pub high_recommendations: usize,
    pub medium_recommendations: usize,
    pub low_recommendations: usize,
}

/// Font-independent text metrics used for footprint estimates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextMetrics {
    pub chars_per_line: usize,
    pub line_height_mm: f32,
    pub heading_height_mm: f32,
    pub block_padding_mm: f32,
    pub table_row_height_mm: f32,
}

impl TextMetrics {
    /// Characters per wrapped line for a text block of `style`. Cards and callouts
    /// are inset.
    pub fn chars_per_line_for(&self, style: TextStyle) -> usize {
        match style {
            TextStyle::Card | TextStyle::Callout => self.chars_per_line.saturating_sub(8),
            _ => self.chars_per_line,
        }
    }

    /// Characters per wrapped line inside one cell of a `columns`-wide table.
    pub fn table_cell_chars(&self, columns: usize) -> usize {
        (self.chars_per_line / columns.max(1)).max(8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub page: PageBudget,
    pub sections: SectionCapacities,
    pub text: TextMetrics,
}

/// A4 portrait, 20 mm margins, 14 mm header band and 10 mm footer band.
/// 297 − 40 − 14 − 10 = 233 mm usable.
pub fn default_layout_config() -> LayoutConfig {
    LayoutConfig {
        page: PageBudget {
            usable_height_mm: 233.0,
            text_capacity_mm: 233.0,
            table_capacity_mm: 200.0,
            widget_capacity_mm: 190.0,
        },
        sections: SectionCapacities {
            strengths: 4,
            opportunities: 3,
            rep_products: 3,
            high_recommendations: 2,
            medium_recommendations: 2,
            low_recommendations: 2,
        },
        text: TextMetrics {
            chars_per_line: 95,
            line_height_mm: 5.0,
            heading_height_mm: 9.0,
            block_padding_mm: 6.0,
            table_row_height_mm: 7.0,
        },
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Usage accounting
// ────────────────────────────────────────────────────────────────────────────

/// Accumulated footprint on one page, per block kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PageUsage {
    pub text_mm: f32,
    pub table_mm: f32,
    pub widget_mm: f32,
}

impl PageUsage {
    pub fn of(&self, kind: BlockKind) -> f32 {
        match kind {
            BlockKind::NativeText => self.text_mm,
            BlockKind::NativeTable => self.table_mm,
            BlockKind::RasterWidget => self.widget_mm,
        }
    }

    pub fn total(&self) -> f32 {
        self.text_mm + self.table_mm + self.widget_mm
    }

    pub fn add(&mut self, kind: BlockKind, footprint: f32) {
        match kind {
            BlockKind::NativeText => self.text_mm += footprint,
            BlockKind::NativeTable => self.table_mm += footprint,
            BlockKind::RasterWidget => self.widget_mm += footprint,
        }
    }

    /// True if adding a block of `kind`/`footprint` keeps both the per-kind capacity
    /// and the total page height within `budget`.
    pub fn admits(&self, budget: &PageBudget, kind: BlockKind, footprint: f32) -> bool {
        self.of(kind) + footprint <= budget.capacity(kind)
            && self.total() + footprint <= budget.usable_height_mm
    }

    /// True if every kind is within capacity and the total within the page height.
    pub fn within(&self, budget: &PageBudget) -> bool {
        self.text_mm <= budget.text_capacity_mm
            && self.table_mm <= budget.table_capacity_mm
            && self.widget_mm <= budget.widget_capacity_mm
            && self.total() <= budget.usable_height_mm
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Footprint estimation
// ────────────────────────────────────────────────────────────────────────────

/// Greedy word-wrap line count at `chars_per_line`. Empty text is zero lines.
pub fn estimated_lines(text: &str, chars_per_line: usize) -> usize {
    let max = chars_per_line.max(1);
    let mut lines = 0usize;
    let mut current = 0usize;

    for word in text.split_whitespace() {
        let len = word.chars().count();
        if lines == 0 {
            lines = 1;
            current = len;
        } else if current + 1 + len > max {
            lines += 1;
            current = len;
        } else {
            current += 1 + len;
        }
        // Words longer than a line hard-wrap.
        while current > max {
            lines += 1;
            current -= max;
        }
    }
    lines
}

/// Estimated height of a text block.
pub fn estimate_text_footprint(body: &TextBody, metrics: &TextMetrics) -> f32 {
    let cpl = metrics.chars_per_line_for(body.style);
    let heading = match (&body.heading, body.style) {
        (Some(_), TextStyle::Title) => metrics.heading_height_mm * 1.6,
        (Some(_), _) => metrics.heading_height_mm,
        (None, _) => 0.0,
    };
    let paragraph_lines: usize = body.paragraphs.iter().map(|p| estimated_lines(p, cpl)).sum();
    // Bullets lose a few characters to the marker indent.
    let bullet_lines: usize = body
        .bullets
        .iter()
        .map(|b| estimated_lines(b, cpl.saturating_sub(4)))
        .sum();
    let gaps = body.paragraphs.len().saturating_sub(1) as f32 * metrics.line_height_mm * 0.5;

    heading
        + (paragraph_lines + bullet_lines) as f32 * metrics.line_height_mm
        + gaps
        + metrics.block_padding_mm
}

/// Estimated height of a table: caption + header row + body rows.
pub fn estimate_table_footprint(body: &TableBody, metrics: &TextMetrics) -> f32 {
    let caption = if body.caption.is_some() {
        metrics.heading_height_mm
    } else {
        0.0
    };
    let cell_cpl = metrics.table_cell_chars(body.columns.len());
    let rows: f32 = body
        .rows
        .iter()
        .map(|row| {
            let tallest = row
                .iter()
                .map(|cell| estimated_lines(cell, cell_cpl).max(1))
                .max()
                .unwrap_or(1);
            metrics.table_row_height_mm + (tallest - 1) as f32 * metrics.line_height_mm
        })
        .sum();
    caption + metrics.table_row_height_mm + rows + metrics.block_padding_mm
}

/// Shortens `text` so it wraps to at most `max_lines` lines of `chars_per_line`,
/// ending it with an ellipsis when anything was cut.
pub fn clamp_to_lines(text: &str, chars_per_line: usize, max_lines: usize) -> String {
    let text = text.trim();
    if estimated_lines(text, chars_per_line) <= max_lines {
        return text.to_string();
    }
    let mut kept = String::new();
    let mut fitted = String::new();
    for ch in text.chars() {
        kept.push(ch);
        let candidate = format!("{}…", kept.trim_end());
        if estimated_lines(&candidate, chars_per_line) > max_lines {
            break;
        }
        fitted = candidate;
    }
    fitted
}

/// Widgets are drawn at 96 px per inch; convert their logical height to millimetres.
pub fn widget_height_mm(logical_height_px: u32, metrics: &TextMetrics) -> f32 {
    logical_height_px as f32 * 25.4 / 96.0 + metrics.block_padding_mm
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
