//! Markdown emission. `html2md` walks the normalized HTML; the handlers here
//! replace its defaults only where Obsidian notes need something else.
use std::collections::HashMap;

use html2md::common::get_tag_attr;
use html2md::containers::ContainerHandler;
use html2md::lists::ListItemHandler;
use html2md::paragraphs::ParagraphHandler;
use html2md::{Handle, NodeData, StructuredPrinter, TagHandler, TagHandlerFactory};
use once_cell::sync::Lazy;
use regex::Regex;

static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

// `1. text` opening a paragraph would read as a list item.
static ORDINAL_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*\d+)\.(\s|$)").expect("valid regex"));

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

type Handlers = HashMap<String, Box<dyn TagHandlerFactory>>;

/// Render normalized HTML as Markdown. The result still needs `finish`.
pub(crate) fn render(html: &str, obsidian: bool) -> String {
    html2md::parse_html_custom(html, &handlers(obsidian))
}

/// Render the content of one table cell as a single row fragment: lines are
/// joined with `<br>` and pipes are escaped.
pub(crate) fn render_cell(html: &str, obsidian: bool) -> String {
    let markdown = html2md::parse_html_custom(html, &cell_handlers(obsidian));
    markdown
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("<br>")
        .replace('|', "\\|")
}

/// Lay out rendered cells as a GFM table; the first row is the header.
pub(crate) fn table(mut rows: Vec<Vec<String>>, caption: &str) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return caption.to_string();
    }
    for row in &mut rows {
        row.resize(columns, String::new());
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        lines.push(format!("| {} |", row.join(" | ")));
        if i == 0 {
            lines.push(format!("|{}", " --- |".repeat(columns)));
        }
    }

    let table = lines.join("\n");
    if caption.is_empty() {
        table
    } else {
        format!("{caption}\n\n{table}")
    }
}

/// Strip trailing whitespace per line, collapse blank-line runs and end
/// with a single newline. Empty output stays empty.
pub(crate) fn finish(markdown: &str) -> String {
    let stripped = markdown
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    let collapsed = BLANK_RUNS.replace_all(&stripped, "\n\n");
    let trimmed = collapsed.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

struct Factory<F>(F);

impl<F> TagHandlerFactory for Factory<F>
where
    F: Fn() -> Box<dyn TagHandler>,
{
    fn instantiate(&self) -> Box<dyn TagHandler> {
        (self.0)()
    }
}

fn register<F>(handlers: &mut Handlers, tags: &[&str], make: F)
where
    F: Fn() -> Box<dyn TagHandler> + Clone + 'static,
{
    for tag in tags {
        handlers.insert(tag.to_string(), Box::new(Factory(make.clone())));
    }
}

fn boxed<H>() -> Box<dyn TagHandler>
where
    H: TagHandler + Default + 'static,
{
    Box::new(H::default())
}

fn handlers(obsidian: bool) -> Handlers {
    let mut handlers = Handlers::new();
    register(&mut handlers, HEADINGS, boxed::<HeadingHandler>);
    register(&mut handlers, &["li"], boxed::<BulletHandler>);
    register(&mut handlers, &["p"], boxed::<ParagraphStartHandler>);
    register(&mut handlers, &["pre"], boxed::<FenceHandler>);
    register(&mut handlers, &["blockquote"], boxed::<QuoteHandler>);
    register(&mut handlers, &["div", "span"], boxed::<RawHandler>);
    register(&mut handlers, &["mark"], move || -> Box<dyn TagHandler> {
        Box::new(MarkHandler::new(obsidian))
    });
    handlers
}

/// Inside a cell every block collapses to plain lines.
fn cell_handlers(obsidian: bool) -> Handlers {
    let mut handlers = handlers(obsidian);
    register(&mut handlers, HEADINGS, boxed::<LineHandler>);
    register(&mut handlers, &["ul", "ol", "li", "blockquote"], boxed::<LineHandler>);
    register(&mut handlers, &["pre"], boxed::<CellCodeHandler>);
    handlers
}

fn tag_name(tag: &Handle) -> String {
    match tag.data {
        NodeData::Element { ref name, .. } => name.local.to_string(),
        _ => String::new(),
    }
}

fn text_content(tag: &Handle) -> String {
    let mut out = String::new();
    collect_text(tag, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    if let NodeData::Text { ref contents } = node.data {
        out.push_str(&contents.borrow().to_string());
    }
    for child in node.children.borrow().iter() {
        collect_text(child, out);
    }
}

/// Single-line ATX headings.
#[derive(Default)]
struct HeadingHandler {
    level: usize,
    marker_pos: usize,
    start_pos: usize,
}

impl TagHandler for HeadingHandler {
    fn handle(&mut self, tag: &Handle, printer: &mut StructuredPrinter) {
        self.level = tag_name(tag)
            .get(1..)
            .and_then(|level| level.parse().ok())
            .unwrap_or(1);
        printer.append_str("\n\n");
        self.marker_pos = printer.data.len();
        printer.append_str(&format!("{} ", "#".repeat(self.level)));
        self.start_pos = printer.data.len();
    }

    fn after_handle(&mut self, printer: &mut StructuredPrinter) {
        let content = printer.data[self.start_pos..]
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        printer.data.truncate(self.marker_pos);
        if !content.is_empty() {
            printer.append_str(&format!("{} {}", "#".repeat(self.level), content));
        }
        printer.append_str("\n\n");
    }
}

/// html2md list items with `-` bullets. Trailing blank lines left by a
/// nested list are dropped so sibling items stay tight.
#[derive(Default)]
struct BulletHandler {
    inner: ListItemHandler,
    marker_end: usize,
}

impl TagHandler for BulletHandler {
    fn handle(&mut self, tag: &Handle, printer: &mut StructuredPrinter) {
        let before = printer.data.len();
        self.inner.handle(tag, printer);
        if printer.data[before..].ends_with("* ") {
            let at = printer.data.len() - 2;
            printer.data.replace_range(at.., "- ");
        }
        self.marker_end = printer.data.len();
    }

    fn after_handle(&mut self, printer: &mut StructuredPrinter) {
        self.inner.after_handle(printer);
        let end = printer.data.trim_end().len().max(self.marker_end);
        printer.data.truncate(end);
    }
}

#[derive(Default)]
struct ParagraphStartHandler {
    inner: ParagraphHandler,
    start_pos: usize,
}

impl TagHandler for ParagraphStartHandler {
    fn handle(&mut self, tag: &Handle, printer: &mut StructuredPrinter) {
        self.inner.handle(tag, printer);
        self.start_pos = printer.data.len();
    }

    fn after_handle(&mut self, printer: &mut StructuredPrinter) {
        let number_end = ORDINAL_START
            .captures(&printer.data[self.start_pos..])
            .and_then(|caps| caps.get(1))
            .map(|number| number.end());
        if let Some(end) = number_end {
            printer.insert_str(self.start_pos + end, "\\");
        }
        self.inner.after_handle(printer);
    }
}

#[derive(Default)]
struct FenceHandler;

impl TagHandler for FenceHandler {
    fn handle(&mut self, tag: &Handle, printer: &mut StructuredPrinter) {
        let raw = text_content(tag);
        if raw.trim().is_empty() {
            return;
        }
        let code = raw.trim_matches('\n');
        let lang = get_tag_attr(tag, "data-lang").unwrap_or_default();
        let fence = if code.contains("```") { "````" } else { "```" };
        printer.append_str(&format!("\n\n{fence}{lang}\n{code}\n{fence}\n\n"));
    }

    fn after_handle(&mut self, _printer: &mut StructuredPrinter) {}

    fn skip_descendants(&self) -> bool {
        true
    }
}

/// A fence would end the table row.
#[derive(Default)]
struct CellCodeHandler;

impl TagHandler for CellCodeHandler {
    fn handle(&mut self, tag: &Handle, printer: &mut StructuredPrinter) {
        let raw = text_content(tag);
        if raw.trim().is_empty() {
            return;
        }
        let code = raw.trim_matches('\n');
        if code.contains('\n') {
            printer.append_str(&format!(" <code>{}</code> ", code.replace('\n', "<br>")));
        } else {
            printer.append_str(&format!(" `{code}` "));
        }
    }

    fn after_handle(&mut self, _printer: &mut StructuredPrinter) {}

    fn skip_descendants(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct QuoteHandler {
    start_pos: usize,
}

impl TagHandler for QuoteHandler {
    fn handle(&mut self, _tag: &Handle, printer: &mut StructuredPrinter) {
        self.start_pos = printer.data.len();
    }

    fn after_handle(&mut self, printer: &mut StructuredPrinter) {
        let inner = printer.data.split_off(self.start_pos);
        let body = BLANK_RUNS.replace_all(inner.trim(), "\n\n");
        if body.is_empty() {
            return;
        }
        let quoted = body
            .lines()
            .map(|line| {
                if line.trim().is_empty() {
                    ">".to_string()
                } else {
                    format!("> {line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        printer.append_str(&format!("\n\n{quoted}\n\n"));
    }
}

/// `data-raw-markdown` elements go out verbatim; other divs behave like
/// html2md containers and other spans are transparent.
#[derive(Default)]
struct RawHandler {
    raw: bool,
    container: Option<ContainerHandler>,
}

impl TagHandler for RawHandler {
    fn handle(&mut self, tag: &Handle, printer: &mut StructuredPrinter) {
        self.raw = get_tag_attr(tag, "data-raw-markdown").is_some();
        let block = tag_name(tag) == "div";
        if self.raw {
            let text = text_content(tag);
            if block {
                printer.append_str(&format!("\n\n{}\n\n", text.trim()));
            } else {
                printer.append_str(&text);
            }
        } else if block {
            let mut container = ContainerHandler::default();
            container.handle(tag, printer);
            self.container = Some(container);
        }
    }

    fn after_handle(&mut self, printer: &mut StructuredPrinter) {
        if let Some(container) = self.container.as_mut() {
            container.after_handle(printer);
        }
    }

    fn skip_descendants(&self) -> bool {
        self.raw
    }
}

struct MarkHandler {
    obsidian: bool,
    color: String,
    start_pos: usize,
}

impl MarkHandler {
    fn new(obsidian: bool) -> Self {
        Self {
            obsidian,
            color: String::new(),
            start_pos: 0,
        }
    }
}

impl TagHandler for MarkHandler {
    fn handle(&mut self, tag: &Handle, printer: &mut StructuredPrinter) {
        self.color = get_tag_attr(tag, "data-highlight-color").unwrap_or_default();
        self.start_pos = printer.data.len();
    }

    fn after_handle(&mut self, printer: &mut StructuredPrinter) {
        let offset = match printer.data[self.start_pos..].find(|c: char| !c.is_whitespace()) {
            Some(offset) => offset,
            None => return,
        };
        let first = self.start_pos + offset;
        let last = printer.data.trim_end().len();

        let (open, close) = if self.obsidian && (self.color.is_empty() || self.color == "yellow")
        {
            ("==".to_string(), "==")
        } else if self.color.is_empty() {
            ("<mark>".to_string(), "</mark>")
        } else {
            (format!("<mark style=\"background: {}\">", self.color), "</mark>")
        };
        printer.insert_str(last, close);
        printer.insert_str(first, &open);
    }
}

#[derive(Default)]
struct LineHandler;

impl TagHandler for LineHandler {
    fn handle(&mut self, _tag: &Handle, printer: &mut StructuredPrinter) {
        printer.insert_newline();
    }

    fn after_handle(&mut self, printer: &mut StructuredPrinter) {
        printer.insert_newline();
    }
}
