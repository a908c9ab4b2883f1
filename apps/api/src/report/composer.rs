//! Report composition: turns an evaluation and its analysis into ordered layout
//! entries (fixed pages and paginated sections) built from sized content blocks.
//!
//! Section order is the report's reading order and is preserved by everything
//! downstream. Within a section, item order follows the analysis output.

use crate::analysis::insights::Insight;
use crate::analysis::recommendations::{PriorityTier, Recommendation};
use crate::analysis::scoring::{carbon_intensity, water_intensity};
use crate::analysis::Analysis;
use crate::layout::blocks::{Bar, ContentBlock, Rgb, TableBody, TextBody, TextStyle, Widget};
use crate::layout::budget::{
    clamp_to_lines, estimate_table_footprint, estimate_text_footprint, widget_height_mm,
    LayoutConfig,
};
use crate::layout::paginator::{FixedPage, LayoutEntry, Section};
use crate::models::{Evaluation, RepProduct};

pub const REPORT_TITLE: &str = "Environmental Diagnostic Report";

// Line limits for text that carries user-supplied values. Fixed pages must fit
// on one page whatever the evaluation contains.
const HEADING_LINES: usize = 1;
const FIELD_LINES: usize = 2;
const SUMMARY_LINES: usize = 12;
const CARD_PARAGRAPH_LINES: usize = 4;
const CARD_BULLET_LINES: usize = 2;

/// Builds sized blocks with footprints estimated from the layout's text metrics.
struct Composer<'a> {
    config: &'a LayoutConfig,
}

impl Composer<'_> {
    fn text(&self, id: impl Into<String>, body: TextBody) -> ContentBlock {
        let footprint = estimate_text_footprint(&body, &self.config.text);
        ContentBlock::text(id, footprint, body)
    }

    fn table(&self, id: impl Into<String>, body: TableBody) -> ContentBlock {
        let footprint = estimate_table_footprint(&body, &self.config.text);
        ContentBlock::table(id, footprint, body)
    }

    fn widget(&self, id: impl Into<String>, widget: Widget) -> ContentBlock {
        let footprint = widget_height_mm(widget.logical_size().1, &self.config.text);
        ContentBlock::widget(id, footprint, widget)
    }

    /// Clamps text wrapped at the width of a `style` block.
    fn clamp(&self, text: &str, style: TextStyle, max_lines: usize) -> String {
        clamp_to_lines(text, self.config.text.chars_per_line_for(style), max_lines)
    }

    /// Clamps a heading. Title headings are set at twice the body size.
    fn clamp_heading(&self, text: &str, style: TextStyle) -> String {
        let cpl = self.config.text.chars_per_line_for(style);
        let cpl = if style == TextStyle::Title { cpl / 2 } else { cpl };
        clamp_to_lines(text, cpl, HEADING_LINES)
    }

    /// Clamps a table cell in a `columns`-wide table.
    fn clamp_cell(&self, text: &str, columns: usize) -> String {
        clamp_to_lines(text, self.config.text.table_cell_chars(columns), FIELD_LINES)
    }

    /// A card: heading, paragraphs and bullets each clamped to their line limit.
    fn card(&self, id: impl Into<String>, heading: &str, paragraphs: Vec<String>, bullets: Vec<String>) -> ContentBlock {
        let style = TextStyle::Card;
        let card = body(
            Some(self.clamp_heading(heading, style)),
            paragraphs
                .iter()
                .map(|p| self.clamp(p, style, CARD_PARAGRAPH_LINES))
                .collect(),
            bullets
                .iter()
                .map(|b| {
                    let cpl = self.config.text.chars_per_line_for(style).saturating_sub(4);
                    clamp_to_lines(b, cpl, CARD_BULLET_LINES)
                })
                .collect(),
            style,
        );
        self.text(id, card)
    }
}

fn body(heading: Option<String>, paragraphs: Vec<String>, bullets: Vec<String>, style: TextStyle) -> TextBody {
    TextBody {
        heading,
        paragraphs,
        bullets,
        style,
    }
}

fn fixed(key: &str, title: &str, blocks: Vec<ContentBlock>) -> LayoutEntry {
    LayoutEntry::Fixed(FixedPage {
        key: key.to_string(),
        title: title.to_string(),
        blocks,
    })
}

fn fmt_num(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}")
}

// ────────────────────────────────────────────────────────────────────────────
// Entry point
// ────────────────────────────────────────────────────────────────────────────

/// All layout entries of the report, in reading order.
pub fn compose_report(eval: &Evaluation, analysis: &Analysis, config: &LayoutConfig) -> Vec<LayoutEntry> {
    let c = Composer { config };
    let caps = &config.sections;

    let mut entries = vec![
        cover_page(&c, eval, analysis),
        summary_page(&c, analysis),
        profile_page(&c, eval),
        carbon_page(&c, eval, analysis),
    ];

    entries.push(LayoutEntry::Section(
        Section::new("strengths", "Strengths", caps.strengths).with_items(
            analysis
                .insights
                .strengths
                .iter()
                .enumerate()
                .map(|(i, insight)| insight_card(&c, "strength", i, insight))
                .collect(),
        ),
    ));
    entries.push(LayoutEntry::Section(
        Section::new("opportunities", "Improvement opportunities", caps.opportunities).with_items(
            analysis
                .insights
                .opportunities
                .iter()
                .enumerate()
                .map(|(i, insight)| insight_card(&c, "opportunity", i, insight))
                .collect(),
        ),
    ));
    entries.push(LayoutEntry::Section(
        Section::new("rep-products", "Extended producer responsibility", caps.rep_products).with_items(
            eval.waste
                .rep_products
                .iter()
                .enumerate()
                .map(|(i, product)| rep_product_bar(&c, i, product))
                .collect(),
        ),
    ));

    let tier = |t: PriorityTier| -> Vec<ContentBlock> {
        analysis
            .recommendations
            .iter()
            .filter(|r| r.priority == t)
            .map(|r| recommendation_card(&c, r))
            .collect()
    };
    entries.push(LayoutEntry::Section(
        Section::new("recs-high", "High-priority recommendations", caps.high_recommendations)
            .with_items(tier(PriorityTier::High)),
    ));
    entries.push(LayoutEntry::Section(
        Section::new("recs-medium", "Medium-priority recommendations", caps.medium_recommendations)
            .with_items(tier(PriorityTier::Medium))
            .joining_previous(),
    ));
    entries.push(LayoutEntry::Section(
        Section::new("recs-low", "Low-priority recommendations", caps.low_recommendations)
            .with_items(tier(PriorityTier::Low)),
    ));

    entries.push(quick_wins_page(&c, analysis));
    entries.push(roadmap_page(&c, analysis));
    entries.push(closing_page(&c, eval));
    entries
}

// ────────────────────────────────────────────────────────────────────────────
// Fixed pages
// ────────────────────────────────────────────────────────────────────────────

fn cover_page(c: &Composer, eval: &Evaluation, analysis: &Analysis) -> LayoutEntry {
    let company = &eval.company;
    let style = TextStyle::Title;
    let detail = |label: &str, value: &str| {
        // Bullets lose four characters to the marker indent.
        let cpl = c.config.text.chars_per_line_for(style).saturating_sub(4);
        clamp_to_lines(&format!("{label}: {value}"), cpl, FIELD_LINES)
    };
    let mut details = Vec::new();
    if !eval.period.is_empty() {
        details.push(detail("Reporting period", &eval.period));
    }
    if !company.sector.is_empty() {
        details.push(detail("Sector", &company.sector));
    }
    if !company.region.is_empty() {
        details.push(detail("Region", &company.region));
    }
    let title = c.text(
        "cover.title",
        body(
            Some(c.clamp_heading(&company.name, style)),
            vec![REPORT_TITLE.to_string()],
            details,
            style,
        ),
    );
    let badge = c.widget(
        "cover.maturity",
        Widget::Badge {
            text: format!("{} maturity", analysis.maturity.label()),
            color: Rgb::for_score(analysis.overall_score),
        },
    );
    fixed("cover", REPORT_TITLE, vec![title, badge])
}

fn summary_page(c: &Composer, analysis: &Analysis) -> LayoutEntry {
    let mut blocks = vec![
        c.widget(
            "summary.overall",
            Widget::ScoreGauge {
                label: "Overall".to_string(),
                score: analysis.overall_score,
                color: Rgb::for_score(analysis.overall_score),
            },
        ),
        c.text(
            "summary.text",
            body(
                None,
                vec![c.clamp(&analysis.summary, TextStyle::Callout, SUMMARY_LINES)],
                vec![],
                TextStyle::Callout,
            ),
        ),
    ];
    for (dimension, score) in analysis.scores.iter() {
        blocks.push(c.widget(
            format!("summary.badge.{}", dimension.key()),
            Widget::Badge {
                text: format!("{} {score:.0}", dimension.label()),
                color: Rgb::for_score(score),
            },
        ));
    }
    fixed("summary", "Executive summary", blocks)
}

fn profile_page(c: &Composer, eval: &Evaluation) -> LayoutEntry {
    let company = &eval.company;
    let (water, unit) = water_intensity(eval);
    let row = |k: &str, v: String| vec![k.to_string(), c.clamp_cell(&v, 2)];
    let table = TableBody {
        caption: Some("Organization and reported inputs".to_string()),
        columns: vec!["Item".to_string(), "Value".to_string()],
        rows: vec![
            row("Company", company.name.clone()),
            row("Sector", company.sector.clone()),
            row("Region", company.region.clone()),
            row("Employees", fmt_num(company.employees, 0)),
            row("Reporting period", eval.period.clone()),
            row("Electricity (kWh)", fmt_num(eval.carbon.electricity_kwh, 0)),
            row("Water consumption (m³)", fmt_num(eval.water.volume_m3, 1)),
            row("Water intensity", format!("{} {unit}", fmt_num(water, 2))),
            row("Waste generated (kg)", fmt_num(eval.waste.generated_kg, 0)),
            row("Waste valorized (kg)", fmt_num(eval.waste.valorized_kg, 0)),
            row(
                "Valorization rate",
                format!("{}%", fmt_num(eval.waste.valorization_rate() * 100.0, 1)),
            ),
            row("REP products declared", eval.waste.rep_products.len().to_string()),
        ],
    };
    fixed("profile", "Company profile", vec![c.table("profile.table", table)])
}

fn carbon_page(c: &Composer, eval: &Evaluation, analysis: &Analysis) -> LayoutEntry {
    let fp = &analysis.footprint;
    let mut rows: Vec<Vec<String>> = fp
        .by_fuel
        .iter()
        .filter(|f| f.quantity > 0.0)
        .map(|f| {
            vec![
                f.fuel.clone(),
                format!("{} {}", fmt_num(f.quantity, 0), f.unit),
                fmt_num(f.kg_co2e / 1000.0, 2),
                "Scope 1".to_string(),
            ]
        })
        .collect();
    rows.push(vec![
        "Electricity".to_string(),
        format!("{} kWh", fmt_num(eval.carbon.electricity_kwh, 0)),
        fmt_num(fp.scope2_kg / 1000.0, 2),
        "Scope 2".to_string(),
    ]);
    rows.push(vec![
        "Total".to_string(),
        String::new(),
        fmt_num(fp.total_tonnes(), 2),
        String::new(),
    ]);

    let table = TableBody {
        caption: Some("Emissions by source".to_string()),
        columns: ["Source", "Quantity", "tCO2e", "Scope"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        rows,
    };
    let intensity = carbon_intensity(fp, eval.company.employees);
    let note = c.text(
        "carbon.note",
        body(
            None,
            vec![format!(
                "Total footprint {} tCO2e, {} tCO2e per employee. Scope 1 {} tCO2e, Scope 2 {} tCO2e.",
                fmt_num(fp.total_tonnes(), 2),
                fmt_num(intensity, 2),
                fmt_num(fp.scope1_kg / 1000.0, 2),
                fmt_num(fp.scope2_kg / 1000.0, 2),
            )],
            vec![],
            TextStyle::Body,
        ),
    );
    let bar = c.widget(
        "carbon.scopes",
        Widget::ScopeBar {
            scope1_kg: fp.scope1_kg,
            scope2_kg: fp.scope2_kg,
        },
    );
    fixed(
        "carbon",
        "Carbon footprint",
        vec![c.table("carbon.table", table), bar, note],
    )
}

fn quick_wins_page(c: &Composer, analysis: &Analysis) -> LayoutEntry {
    let block = if analysis.quick_wins.is_empty() {
        c.text(
            "quick-wins.none",
            body(
                None,
                vec!["No recommendation currently combines high impact with low effort.".to_string()],
                vec![],
                TextStyle::Body,
            ),
        )
    } else {
        let rows = analysis
            .quick_wins
            .iter()
            .map(|r| {
                vec![
                    r.title.clone(),
                    format!("{}/10", r.impact),
                    format!("{}/10", r.effort),
                    r.resources.time.clone(),
                ]
            })
            .collect();
        c.table(
            "quick-wins.table",
            TableBody {
                caption: Some("High impact, low effort".to_string()),
                columns: ["Action", "Impact", "Effort", "Time"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                rows,
            },
        )
    };
    fixed("quick-wins", "Quick wins", vec![block])
}

fn roadmap_page(c: &Composer, analysis: &Analysis) -> LayoutEntry {
    let rows = analysis
        .roadmap
        .iter()
        .map(|bucket| {
            vec![
                bucket.label.clone(),
                format!("Months {}–{}", bucket.months.start, bucket.months.end),
                bucket.actions.join("; "),
            ]
        })
        .collect();
    let table = TableBody {
        caption: Some("Twelve-month implementation plan".to_string()),
        columns: ["Period", "Months", "Actions"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        rows,
    };
    fixed("roadmap", "Roadmap", vec![c.table("roadmap.table", table)])
}

fn closing_page(c: &Composer, eval: &Evaluation) -> LayoutEntry {
    let text = c.text(
        "closing.text",
        body(
            Some("Next steps".to_string()),
            vec![c.clamp(
                &format!(
                    "This diagnostic reflects the data reported by {} for {}. Results depend on the completeness of those inputs.",
                    eval.company.name,
                    if eval.period.is_empty() { "the period" } else { eval.period.as_str() }
                ),
                TextStyle::Body,
                CARD_PARAGRAPH_LINES,
            )],
            vec![
                "Assign an owner to each roadmap action".to_string(),
                "Track the KPIs listed for each recommendation monthly".to_string(),
                "Repeat the diagnostic after twelve months to measure progress".to_string(),
            ],
            TextStyle::Body,
        ),
    );
    fixed("closing", "Closing remarks", vec![text])
}

// ────────────────────────────────────────────────────────────────────────────
// Section items
// ────────────────────────────────────────────────────────────────────────────

fn insight_card(c: &Composer, prefix: &str, index: usize, insight: &Insight) -> ContentBlock {
    let mut paragraphs = vec![insight.narrative.clone(), insight.datum.clone()];
    if let Some(detail) = &insight.opportunity {
        paragraphs.push(format!("Gap to best practice: {:.0} points.", detail.gap));
        paragraphs.push(format!("Main cause: {}.", detail.cause));
        paragraphs.push(format!("Key action: {}.", detail.key_action));
    }
    c.card(
        format!("{prefix}.{index}"),
        &format!("{} ({:.0}/100)", insight.area.label(), insight.score),
        paragraphs,
        vec![],
    )
}

fn rep_product_bar(c: &Composer, index: usize, product: &RepProduct) -> ContentBlock {
    let rate = product.valorization_rate() * 100.0;
    let target = product.effective_target_pct();
    let color = if product.is_below_target() { Rgb::RED } else { Rgb::GREEN };
    let name = if product.name.is_empty() {
        format!("Product {}", index + 1)
    } else {
        product.name.clone()
    };
    c.widget(
        format!("rep.{index}"),
        Widget::BarChart {
            title: format!("{name}: {rate:.0}% valorized (target {target:.0}%)"),
            bars: vec![Bar {
                label: name,
                value: rate,
                target: Some(target),
                color,
            }],
        },
    )
}

fn recommendation_card(c: &Composer, rec: &Recommendation) -> ContentBlock {
    let mut bullets = rec.steps.clone();
    bullets.extend(rec.kpis.iter().map(|k| format!("KPI: {k}")));
    c.card(
        format!("rec.{}", rec.id),
        &rec.title,
        vec![
            format!(
                "{} · Priority {} · Impact {}/10 · Effort {}/10",
                rec.category.label(),
                rec.priority.label(),
                rec.impact,
                rec.effort
            ),
            rec.roi.clone(),
            format!(
                "Budget: {}. Time: {}. Team: {}.",
                rec.resources.budget, rec.resources.time, rec.resources.team
            ),
        ],
        bullets,
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
