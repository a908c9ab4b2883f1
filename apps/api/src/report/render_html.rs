//! Deterministic, asset-free HTML rendering of an assembled document.
//!
//! One `<section class="page">` per page, fixed A4 geometry, footer stamped at the
//! bottom. Captured widgets are embedded as PNG data URIs. Widgets that stayed live
//! (rasterization fallback) are drawn with native HTML/CSS, which is less precise
//! but always legible.

use std::fmt::Write as _;

use crate::layout::blocks::{BlockBody, ContentBlock, TableBody, TextBody, TextStyle, Widget};
use crate::layout::paginator::{Page, PageSegment};
use crate::report::assembler::Document;

const STYLE: &str = "\
@page{size:A4;margin:0}\
body{margin:0;background:#e9ecef;font-family:Helvetica,Arial,sans-serif;color:#212529}\
.page{box-sizing:border-box;width:210mm;height:297mm;margin:0 auto 8mm;padding:20mm 20mm 10mm;background:#fff;position:relative;page-break-after:always;overflow:hidden}\
.page h2{font-size:15pt;margin:0 0 4mm;height:10mm}\
.page footer{position:absolute;left:20mm;right:20mm;bottom:8mm;font-size:8pt;color:#6c757d;border-top:1px solid #dee2e6;padding-top:2mm}\
.block{margin:0 0 4mm}\
.title h1{font-size:26pt;margin:30mm 0 6mm}\
.card{border:1px solid #dee2e6;border-radius:3mm;padding:3mm 4mm}\
.callout{background:#f1f8f4;border-left:2mm solid #2e8b57;padding:3mm 4mm}\
table{border-collapse:collapse;width:100%;font-size:9pt}\
th,td{border-bottom:1px solid #dee2e6;padding:1.5mm 2mm;text-align:left;vertical-align:top}\
caption{text-align:left;font-weight:bold;padding-bottom:2mm}\
img.widget{display:block;max-width:100%}\
.live{font-size:9pt}\
.bar{background:#dee2e6;height:5mm;position:relative}\
.bar span{display:block;height:100%}\
.badge{display:inline-block;border-radius:5mm;padding:1.5mm 4mm;color:#fff;font-weight:bold}\
";

/// Escape text for HTML.
fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

pub struct HtmlBuilder {
    buf: String,
}

impl HtmlBuilder {
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(64 * 1024),
        }
    }

    fn begin(&mut self, title: &str, lang: &str) {
        let _ = write!(
            self.buf,
            "<!DOCTYPE html>\n<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n",
            esc(lang),
            esc(title)
        );
    }

    fn end(&mut self) {
        self.buf.push_str("</body>\n</html>\n");
    }

    fn page(&mut self, page: &Page) {
        let _ = writeln!(
            self.buf,
            "<section class=\"page\" id=\"page-{}\">",
            page.number
        );
        for segment in &page.segments {
            self.segment(segment);
        }
        if let Some(footer) = &page.footer {
            let _ = writeln!(self.buf, "<footer>{}</footer>", esc(&footer.display()));
        }
        self.buf.push_str("</section>\n");
    }

    fn segment(&mut self, segment: &PageSegment) {
        let _ = writeln!(
            self.buf,
            "<div class=\"segment\" data-section=\"{}\">\n<h2>{}</h2>",
            esc(&segment.section_key),
            esc(&segment.heading.display())
        );
        for block in &segment.blocks {
            self.block(block);
        }
        self.buf.push_str("</div>\n");
    }

    fn block(&mut self, block: &ContentBlock) {
        let _ = write!(self.buf, "<div class=\"block\" data-block=\"{}\">", esc(block.id()));
        match block.body() {
            BlockBody::Text(text) => self.text(text),
            BlockBody::Table(table) => self.table(table),
            BlockBody::Image(image) => {
                let (w, h) = image.bitmap.logical_size();
                let _ = write!(
                    self.buf,
                    "<img class=\"widget\" width=\"{w}\" height=\"{h}\" alt=\"{}\" src=\"{}\">",
                    esc(&image.alt),
                    image.bitmap.to_data_uri()
                );
            }
            BlockBody::Widget(widget) => self.live_widget(widget),
        }
        self.buf.push_str("</div>\n");
    }

    fn text(&mut self, text: &TextBody) {
        let class = match text.style {
            TextStyle::Body => "body",
            TextStyle::Title => "title",
            TextStyle::Card => "card",
            TextStyle::Callout => "callout",
        };
        let _ = write!(self.buf, "<div class=\"{class}\">");
        if let Some(heading) = &text.heading {
            let tag = if text.style == TextStyle::Title { "h1" } else { "h3" };
            let _ = write!(self.buf, "<{tag}>{}</{tag}>", esc(heading));
        }
        for p in &text.paragraphs {
            let _ = write!(self.buf, "<p>{}</p>", esc(p));
        }
        if !text.bullets.is_empty() {
            self.buf.push_str("<ul>");
            for b in &text.bullets {
                let _ = write!(self.buf, "<li>{}</li>", esc(b));
            }
            self.buf.push_str("</ul>");
        }
        self.buf.push_str("</div>");
    }

    fn table(&mut self, table: &TableBody) {
        self.buf.push_str("<table>");
        if let Some(caption) = &table.caption {
            let _ = write!(self.buf, "<caption>{}</caption>", esc(caption));
        }
        self.buf.push_str("<thead><tr>");
        for col in &table.columns {
            let _ = write!(self.buf, "<th>{}</th>", esc(col));
        }
        self.buf.push_str("</tr></thead><tbody>");
        for row in &table.rows {
            self.buf.push_str("<tr>");
            for cell in row {
                let _ = write!(self.buf, "<td>{}</td>", esc(cell));
            }
            self.buf.push_str("</tr>");
        }
        self.buf.push_str("</tbody></table>");
    }

    /// Native approximation for widgets that could not be captured.
    fn live_widget(&mut self, widget: &Widget) {
        let _ = write!(self.buf, "<div class=\"live\" title=\"{}\">", esc(&widget.alt_text()));
        match widget {
            Widget::ScoreGauge { label, score, color } => {
                let _ = write!(
                    self.buf,
                    "<span class=\"badge\" style=\"background:{}\">{} {score:.0}/100</span>",
                    color.hex(),
                    esc(label)
                );
            }
            Widget::Badge { text, color } => {
                let _ = write!(
                    self.buf,
                    "<span class=\"badge\" style=\"background:{}\">{}</span>",
                    color.hex(),
                    esc(text)
                );
            }
            Widget::BarChart { title, bars } => {
                let _ = write!(self.buf, "<p>{}</p>", esc(title));
                for bar in bars {
                    let _ = write!(
                        self.buf,
                        "<p>{} {:.0}%</p><div class=\"bar\"><span style=\"width:{:.1}%;background:{}\"></span></div>",
                        esc(&bar.label),
                        bar.value,
                        bar.value.clamp(0.0, 100.0),
                        bar.color.hex()
                    );
                }
            }
            Widget::ScopeBar { .. } => {
                let _ = write!(self.buf, "<p>{}</p>", esc(&widget.alt_text()));
            }
        }
        self.buf.push_str("</div>");
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

impl Default for HtmlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Renders the whole document as one HTML string.
pub fn render_html(document: &Document) -> String {
    let meta = document.metadata();
    let title = if meta.period.is_empty() {
        format!("Environmental diagnostic · {}", meta.company)
    } else {
        format!("Environmental diagnostic · {} · {}", meta.company, meta.period)
    };

    let mut html = HtmlBuilder::new();
    html.begin(&title, "en");
    for page in document.pages() {
        html.page(page);
    }
    html.end();
    html.finish()
}
