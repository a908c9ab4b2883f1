//! Content blocks: opaque, sized units of report content.
//!
//! The paginator only reads `kind()` and `footprint()`. The body is for renderers:
//! native text and tables go straight to the output format, widgets must be
//! rasterized first and are swapped for a captured image by the bridge.

use serde::{Deserialize, Serialize};

use crate::layout::surface::Bitmap;

// ────────────────────────────────────────────────────────────────────────────
// Kinds and bodies
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    NativeText,
    NativeTable,
    RasterWidget,
}

/// An RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const INK: Rgb = Rgb(33, 37, 41);
    pub const TRACK: Rgb = Rgb(222, 226, 230);
    pub const GREEN: Rgb = Rgb(46, 139, 87);
    pub const AMBER: Rgb = Rgb(230, 159, 0);
    pub const RED: Rgb = Rgb(200, 55, 55);
    pub const BLUE: Rgb = Rgb(52, 101, 164);
    pub const SKY: Rgb = Rgb(120, 170, 220);

    /// Traffic-light colour for a 0–100 score.
    pub fn for_score(score: f64) -> Rgb {
        if score >= 85.0 {
            Rgb::GREEN
        } else if score >= 70.0 {
            Rgb::AMBER
        } else {
            Rgb::RED
        }
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextStyle {
    #[default]
    Body,
    Title,
    Card,
    Callout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBody {
    pub heading: Option<String>,
    pub paragraphs: Vec<String>,
    pub bullets: Vec<String>,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBody {
    pub caption: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub label: String,
    /// 0 – 100.
    pub value: f64,
    /// Optional target marker, 0 – 100.
    pub target: Option<f64>,
    pub color: Rgb,
}

/// Badge text beyond this many characters is cut when painted.
pub const BADGE_MAX_CHARS: usize = 40;

/// Visuals the output format cannot reproduce precisely with native primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum Widget {
    /// Ring gauge with the score centred inside.
    ScoreGauge {
        label: String,
        score: f64,
        color: Rgb,
    },
    /// Rounded pill with centred text.
    Badge { text: String, color: Rgb },
    /// Horizontal bars with optional target markers.
    BarChart { title: String, bars: Vec<Bar> },
    /// Single stacked bar split into Scope 1 and Scope 2.
    ScopeBar { scope1_kg: f64, scope2_kg: f64 },
}

impl Widget {
    /// Logical size in CSS pixels at 1× scale.
    pub fn logical_size(&self) -> (u32, u32) {
        match self {
            Widget::ScoreGauge { .. } => (160, 160),
            Widget::Badge { text, .. } => {
                let chars = text.chars().count().min(BADGE_MAX_CHARS) as u32;
                (chars * 12 + 48, 40)
            }
            Widget::BarChart { bars, .. } => {
                let rows = u32::try_from(bars.len()).unwrap_or(u32::MAX);
                (520, rows.saturating_mul(36).saturating_add(16))
            }
            Widget::ScopeBar { .. } => (520, 48),
        }
    }

    /// Text description carried alongside the captured image.
    pub fn alt_text(&self) -> String {
        match self {
            Widget::ScoreGauge { label, score, .. } => format!("{label}: {score:.0}/100"),
            Widget::Badge { text, .. } => text.clone(),
            Widget::BarChart { title, bars } => {
                let values: Vec<String> = bars
                    .iter()
                    .map(|b| format!("{} {:.0}%", b.label, b.value))
                    .collect();
                format!("{title}: {}", values.join(", "))
            }
            Widget::ScopeBar {
                scope1_kg,
                scope2_kg,
            } => format!(
                "Scope 1 {:.2} tCO2e, Scope 2 {:.2} tCO2e",
                scope1_kg / 1000.0,
                scope2_kg / 1000.0
            ),
        }
    }
}

/// A widget after capture: the bitmap plus the widget's text equivalent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedImage {
    pub bitmap: Bitmap,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockBody {
    Text(TextBody),
    Table(TableBody),
    Widget(Widget),
    Image(CapturedImage),
}

// ────────────────────────────────────────────────────────────────────────────
// ContentBlock
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    id: String,
    kind: BlockKind,
    /// Vertical footprint in millimetres (estimated before layout).
    footprint: f32,
    body: BlockBody,
}

impl ContentBlock {
    pub fn text(id: impl Into<String>, footprint: f32, body: TextBody) -> Self {
        Self {
            id: id.into(),
            kind: BlockKind::NativeText,
            footprint,
            body: BlockBody::Text(body),
        }
    }

    pub fn table(id: impl Into<String>, footprint: f32, body: TableBody) -> Self {
        Self {
            id: id.into(),
            kind: BlockKind::NativeTable,
            footprint,
            body: BlockBody::Table(body),
        }
    }

    pub fn widget(id: impl Into<String>, footprint: f32, widget: Widget) -> Self {
        Self {
            id: id.into(),
            kind: BlockKind::RasterWidget,
            footprint,
            body: BlockBody::Widget(widget),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn footprint(&self) -> f32 {
        self.footprint
    }

    pub fn body(&self) -> &BlockBody {
        &self.body
    }

    /// The live widget, if this block still holds one.
    pub fn live_widget(&self) -> Option<&Widget> {
        match &self.body {
            BlockBody::Widget(w) => Some(w),
            _ => None,
        }
    }

    /// Swaps a live widget for its captured image. Kind and footprint are unchanged,
    /// so page budgets stay valid.
    pub fn replace_with_image(&mut self, bitmap: Bitmap) {
        let alt = match &self.body {
            BlockBody::Widget(w) => w.alt_text(),
            _ => self.id.clone(),
        };
        self.body = BlockBody::Image(CapturedImage { bitmap, alt });
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
