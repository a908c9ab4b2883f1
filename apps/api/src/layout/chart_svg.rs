//! Widget markup: every widget is described as a standalone SVG document at its
//! logical size. The rendering surface rasterizes that document; nothing here
//! touches pixels.

use std::f64::consts::PI;
use std::fmt::Write as _;

use crate::layout::blocks::{Bar, Rgb, Widget, BADGE_MAX_CHARS};

const FONT_FAMILY: &str = "DejaVu Sans, Liberation Sans, Arial, Helvetica, sans-serif";

const GAUGE_RADIUS: f64 = 56.0;
const GAUGE_STROKE: f64 = 12.0;
const GAUGE_LABEL_CHARS: usize = 24;
const CHART_TITLE_CHARS: usize = 80;
const BAR_LABEL_CHARS: usize = 22;
const BAR_LABEL_WIDTH: f64 = 140.0;
const BAR_ROW_HEIGHT: f64 = 36.0;

/// SVG document for `widget`, sized to `widget.logical_size()`.
pub fn widget_svg(widget: &Widget) -> String {
    let (w, h) = widget.logical_size();
    let (wf, hf) = (f64::from(w), f64::from(h));
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns='http://www.w3.org/2000/svg' width='{w}' height='{h}' viewBox='0 0 {w} {h}'>"
    );
    let _ = writeln!(svg, "  <rect width='{w}' height='{h}' fill='{}'/>", Rgb::WHITE.hex());

    match widget {
        Widget::ScoreGauge { label, score, color } => gauge(&mut svg, label, *score, *color, wf, hf),
        Widget::Badge { text, color } => badge(&mut svg, text, *color, wf, hf),
        Widget::BarChart { title, bars } => {
            let _ = writeln!(
                svg,
                "  <text x='8' y='12' fill='{}' font-family='{FONT_FAMILY}' font-size='11' font-weight='bold'>{}</text>",
                Rgb::INK.hex(),
                escape_text(&clip_chars(title, CHART_TITLE_CHARS))
            );
            for (i, bar) in bars.iter().enumerate() {
                bar_row(&mut svg, bar, 16.0 + i as f64 * BAR_ROW_HEIGHT, wf);
            }
        }
        Widget::ScopeBar {
            scope1_kg,
            scope2_kg,
        } => scope_bar(&mut svg, *scope1_kg, *scope2_kg, wf),
    }

    let _ = writeln!(svg, "</svg>");
    svg
}

/// Ring starting at 12 o'clock, filled clockwise in proportion to the score.
fn gauge(svg: &mut String, label: &str, score: f64, color: Rgb, w: f64, h: f64) {
    let (cx, cy) = (w / 2.0, h / 2.0 - 8.0);
    let circumference = 2.0 * PI * GAUGE_RADIUS;
    let filled = circumference * score.clamp(0.0, 100.0) / 100.0;
    let _ = writeln!(
        svg,
        "  <circle cx='{cx:.2}' cy='{cy:.2}' r='{GAUGE_RADIUS}' fill='none' stroke='{}' stroke-width='{GAUGE_STROKE}'/>",
        Rgb::TRACK.hex()
    );
    if filled > 0.0 {
        let _ = writeln!(
            svg,
            "  <circle cx='{cx:.2}' cy='{cy:.2}' r='{GAUGE_RADIUS}' fill='none' stroke='{}' stroke-width='{GAUGE_STROKE}' stroke-dasharray='{filled:.2} {circumference:.2}' transform='rotate(-90 {cx:.2} {cy:.2})'/>",
            color.hex()
        );
    }
    let _ = writeln!(
        svg,
        "  <text x='{cx:.2}' y='{:.2}' text-anchor='middle' fill='{}' font-family='{FONT_FAMILY}' font-size='30' font-weight='bold'>{score:.0}</text>",
        cy + 10.0,
        Rgb::INK.hex()
    );
    let _ = writeln!(
        svg,
        "  <text x='{cx:.2}' y='{:.2}' text-anchor='middle' fill='{}' font-family='{FONT_FAMILY}' font-size='12'>{}</text>",
        h - 6.0,
        Rgb::INK.hex(),
        escape_text(&clip_chars(label, GAUGE_LABEL_CHARS))
    );
}

fn badge(svg: &mut String, text: &str, color: Rgb, w: f64, h: f64) {
    let _ = writeln!(
        svg,
        "  <rect width='{w}' height='{h}' rx='{:.2}' fill='{}'/>",
        h / 2.0,
        color.hex()
    );
    let _ = writeln!(
        svg,
        "  <text x='{:.2}' y='{:.2}' text-anchor='middle' fill='{}' font-family='{FONT_FAMILY}' font-size='15' font-weight='bold'>{}</text>",
        w / 2.0,
        h / 2.0 + 5.0,
        Rgb::WHITE.hex(),
        escape_text(&clip_chars(text, BADGE_MAX_CHARS))
    );
}

fn bar_row(svg: &mut String, bar: &Bar, top: f64, width: f64) {
    let track = width - BAR_LABEL_WIDTH - 64.0;
    let fill = track * bar.value.clamp(0.0, 100.0) / 100.0;
    let ink = Rgb::INK.hex();
    let _ = writeln!(svg, "  <g>");
    let _ = writeln!(
        svg,
        "    <text x='8' y='{:.2}' fill='{ink}' font-family='{FONT_FAMILY}' font-size='11'>{}</text>",
        top + 17.0,
        escape_text(&clip_chars(&bar.label, BAR_LABEL_CHARS))
    );
    let _ = writeln!(
        svg,
        "    <rect x='{BAR_LABEL_WIDTH}' y='{:.2}' width='{track:.2}' height='18' rx='3' fill='{}'/>",
        top + 4.0,
        Rgb::TRACK.hex()
    );
    if fill > 0.0 {
        let _ = writeln!(
            svg,
            "    <rect x='{BAR_LABEL_WIDTH}' y='{:.2}' width='{fill:.2}' height='18' rx='3' fill='{}'/>",
            top + 4.0,
            bar.color.hex()
        );
    }
    if let Some(target) = bar.target {
        let x = BAR_LABEL_WIDTH + track * target.clamp(0.0, 100.0) / 100.0;
        let _ = writeln!(
            svg,
            "    <line x1='{x:.2}' y1='{top:.2}' x2='{x:.2}' y2='{:.2}' stroke='{ink}' stroke-width='2'/>",
            top + 26.0
        );
    }
    let _ = writeln!(
        svg,
        "    <text x='{:.2}' y='{:.2}' fill='{ink}' font-family='{FONT_FAMILY}' font-size='11'>{:.0}%</text>",
        BAR_LABEL_WIDTH + track + 8.0,
        top + 17.0,
        bar.value
    );
    let _ = writeln!(svg, "  </g>");
}

/// One track split into Scope 1 (direct) and Scope 2 (electricity).
fn scope_bar(svg: &mut String, scope1_kg: f64, scope2_kg: f64, width: f64) {
    let track = width - 16.0;
    let total = scope1_kg + scope2_kg;
    let _ = writeln!(
        svg,
        "  <rect x='8' y='8' width='{track:.2}' height='20' fill='{}'/>",
        Rgb::TRACK.hex()
    );
    if total > 0.0 {
        let split = track * scope1_kg / total;
        let _ = writeln!(
            svg,
            "  <rect x='8' y='8' width='{split:.2}' height='20' fill='{}'/>",
            Rgb::BLUE.hex()
        );
        let _ = writeln!(
            svg,
            "  <rect x='{:.2}' y='8' width='{:.2}' height='20' fill='{}'/>",
            8.0 + split,
            track - split,
            Rgb::SKY.hex()
        );
    }
    let _ = writeln!(
        svg,
        "  <text x='8' y='42' fill='{}' font-family='{FONT_FAMILY}' font-size='11'>Scope 1</text>",
        Rgb::BLUE.hex()
    );
    let _ = writeln!(
        svg,
        "  <text x='{:.2}' y='42' text-anchor='end' fill='{}' font-family='{FONT_FAMILY}' font-size='11'>Scope 2</text>",
        8.0 + track,
        Rgb::SKY.hex()
    );
}

/// Keeps at most `max` characters, marking the cut with an ellipsis.
fn clip_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(max.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            '"' => out.push_str("&quot;"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}
