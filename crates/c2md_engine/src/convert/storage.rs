//! Rewrites Confluence storage markup (`ac:` macros, `ri:` resources) into
//! plain HTML that the Markdown emitter understands.
//!
//! Output that must reach the Markdown verbatim, such as Obsidian callouts
//! and wikilinks, is wrapped in an element carrying `data-raw-markdown`.
use ego_tree::NodeRef;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html};

use super::lookup::{emoji_for, highlight_class_color};
use super::markdown;
use super::ConvertOptions;

static BACKGROUND_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"background-color:\s*([^;]+)").expect("valid regex"));

/// Name `<p>` carries between preclean and normalization.
pub(crate) const PARAGRAPH: &str = "storage-p";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub(crate) fn normalize(html: &str, options: &ConvertOptions) -> String {
    let fragment = Html::parse_fragment(html);
    let mut normalizer = Normalizer::new(options);
    normalizer.children(fragment.root_element());
    normalizer.out
}

struct Normalizer<'o> {
    options: &'o ConvertOptions,
    out: String,
    in_table: bool,
}

impl<'o> Normalizer<'o> {
    fn new(options: &'o ConvertOptions) -> Self {
        Self {
            options,
            out: String::new(),
            in_table: false,
        }
    }

    fn nested(&self) -> Normalizer<'o> {
        Normalizer {
            options: self.options,
            out: String::new(),
            in_table: self.in_table,
        }
    }

    fn children(&mut self, element: ElementRef) {
        for child in element.children() {
            self.node(child);
        }
    }

    fn node(&mut self, node: NodeRef<'_, Node>) {
        match node.value() {
            Node::Text(text) => self.out.push_str(&escape_text(text)),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    self.element(element);
                }
            }
            _ => {}
        }
    }

    fn element(&mut self, element: ElementRef) {
        let name = element.value().name();
        match name {
            "ac:structured-macro" | "ac:macro" => self.structured_macro(element),
            "ac:task-list" => self.task_list(element),
            "ac:link" => self.link(element),
            "ac:emoticon" => self.emoticon(element),
            "ac:image" => self.image(element),
            "ac:placeholder" | "ac:parameter" => {}
            "ac:adf-extension" => {
                if let Some(fallback) = child_named(element, "ac:adf-fallback") {
                    self.children(fallback);
                }
            }
            PARAGRAPH => self.passthrough_as("p", element),
            "table" => self.table(element),
            "details" => {
                let mut inner = self.nested();
                inner.passthrough(element);
                let html = inner.out;
                self.raw_block(&html);
            }
            "span" => self.span(element),
            "mark" => {
                let color = element
                    .value()
                    .attr("data-highlight-color")
                    .filter(|c| !c.is_empty())
                    .unwrap_or("yellow");
                self.mark(color, element);
            }
            "time" if text_of(element).trim().is_empty() => {
                if let Some(datetime) = element.value().attr("datetime") {
                    self.out.push_str(&escape_text(datetime));
                }
            }
            other if other.starts_with("ac:") || other.starts_with("ri:") => {
                self.children(element)
            }
            _ => self.passthrough(element),
        }
    }

    fn passthrough(&mut self, element: ElementRef) {
        self.passthrough_as(element.value().name(), element);
    }

    fn passthrough_as(&mut self, name: &str, element: ElementRef) {
        self.out.push('<');
        self.out.push_str(name);
        for (key, value) in element.value().attrs() {
            self.out
                .push_str(&format!(" {}=\"{}\"", key, escape_attr(value)));
        }
        self.out.push('>');
        if VOID_ELEMENTS.contains(&name) {
            return;
        }
        self.children(element);
        self.out.push_str(&format!("</{name}>"));
    }

    fn structured_macro(&mut self, element: ElementRef) {
        let name = element
            .value()
            .attr("ac:name")
            .or_else(|| element.value().attr("data-macro-name"))
            .unwrap_or_default()
            .to_ascii_lowercase();

        match name.as_str() {
            "code" | "code-block" => {
                let lang = parameter(element, "language").unwrap_or_default();
                self.preformatted(&lang, &plain_body(element).unwrap_or_default());
            }
            "noformat" => self.preformatted("", &plain_body(element).unwrap_or_default()),
            "info" | "note" | "warning" | "tip" => self.panel(element, &name),
            "panel" => self.panel(element, "note"),
            "expand" => self.expand(element),
            "status" => {
                let title = parameter(element, "title").unwrap_or_else(|| "STATUS".to_string());
                self.out.push_str(&format!(
                    "<strong>[{}]</strong>",
                    escape_text(&title.to_uppercase())
                ));
            }
            "toc" | "anchor" => {}
            "highlight" => {
                let color = parameter(element, "color").unwrap_or_else(|| "yellow".to_string());
                if let Some(body) = child_named(element, "ac:rich-text-body") {
                    self.mark(&color, body);
                }
            }
            _ => {
                if let Some(body) = child_named(element, "ac:rich-text-body") {
                    self.children(body);
                } else if let Some(text) = plain_body(element).filter(|t| !t.trim().is_empty()) {
                    self.preformatted("", &text);
                }
            }
        }
    }

    fn preformatted(&mut self, lang: &str, code: &str) {
        if lang.is_empty() {
            self.out.push_str("<pre>");
        } else {
            self.out
                .push_str(&format!("<pre data-lang=\"{}\">", escape_attr(lang)));
        }
        self.out
            .push_str(&format!("<code>{}</code></pre>", escape_text(code)));
    }

    fn panel(&mut self, element: ElementRef, kind: &str) {
        let title = parameter(element, "title");
        let body = child_named(element, "ac:rich-text-body");

        if self.options.obsidian {
            let header = match &title {
                Some(title) => format!("[!{kind}] {title}"),
                None => format!("[!{kind}]"),
            };
            let callout = self.callout(&header, body);
            self.raw_block(&callout);
            return;
        }

        let mut label = capitalize(kind);
        if let Some(title) = &title {
            label = format!("{label}: {title}");
        }
        self.out.push_str(&format!(
            "<blockquote><p><strong>{}</strong></p>",
            escape_text(&label)
        ));
        if let Some(body) = body {
            self.children(body);
        }
        self.out.push_str("</blockquote>");
    }

    fn expand(&mut self, element: ElementRef) {
        let title =
            parameter(element, "title").unwrap_or_else(|| "Click to expand".to_string());
        let body = child_named(element, "ac:rich-text-body");

        if self.options.obsidian {
            let callout = self.callout(&format!("[!note]- {title}"), body);
            self.raw_block(&callout);
            return;
        }

        let mut inner = self.nested();
        if let Some(body) = body {
            inner.children(body);
        }
        let details = format!(
            "<details><summary>{}</summary>{}</details>",
            escape_text(&title),
            inner.out
        );
        self.raw_block(&details);
    }

    /// Render `body` to Markdown on its own and quote it under `header`.
    fn callout(&self, header: &str, body: Option<ElementRef>) -> String {
        let mut inner = self.nested();
        if let Some(body) = body {
            inner.children(body);
        }
        let rendered = markdown::finish(&markdown::render(&inner.out, self.options.obsidian));

        let mut lines = vec![format!("> {header}")];
        for line in rendered.trim().lines() {
            if line.trim().is_empty() {
                lines.push(">".to_string());
            } else {
                lines.push(format!("> {line}"));
            }
        }
        lines.join("\n")
    }

    /// A task list nested directly in a task list belongs to the task
    /// before it.
    fn task_list(&mut self, element: ElementRef) {
        self.out.push_str("<ul>");
        let mut item_open = false;
        for child in element.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "ac:task" => {
                    if item_open {
                        self.out.push_str("</li>");
                    }
                    let checked = child_named(child, "ac:task-status")
                        .map(|status| text_of(status).trim() == "complete")
                        .unwrap_or(false);
                    self.out
                        .push_str(if checked { "<li>[x] " } else { "<li>[ ] " });
                    if let Some(body) = child_named(child, "ac:task-body") {
                        self.children(body);
                    }
                    item_open = true;
                }
                "ac:task-list" => {
                    if !item_open {
                        self.out.push_str("<li>");
                        item_open = true;
                    }
                    self.task_list(child);
                }
                _ => {}
            }
        }
        if item_open {
            self.out.push_str("</li>");
        }
        self.out.push_str("</ul>");
    }

    fn table(&mut self, element: ElementRef) {
        if self.in_table {
            self.out.push_str(&escape_text(&single_line(&text_of(element))));
            return;
        }

        let mut caption = String::new();
        let mut rows = Vec::new();
        for child in element.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "caption" => caption = single_line(&text_of(child)),
                "thead" | "tbody" | "tfoot" => {
                    for row in child
                        .children()
                        .filter_map(ElementRef::wrap)
                        .filter(|r| r.value().name() == "tr")
                    {
                        rows.push(self.table_row(row));
                    }
                }
                "tr" => rows.push(self.table_row(child)),
                _ => {}
            }
        }

        let table = markdown::table(rows, &caption);
        if !table.is_empty() {
            self.raw_block(&table);
        }
    }

    fn table_row(&self, row: ElementRef) -> Vec<String> {
        let mut cells = Vec::new();
        for cell in row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| matches!(c.value().name(), "td" | "th"))
        {
            let mut inner = self.nested();
            inner.in_table = true;
            inner.children(cell);
            cells.push(markdown::render_cell(&inner.out, self.options.obsidian));

            let span = cell
                .value()
                .attr("colspan")
                .and_then(|s| s.trim().parse::<usize>().ok())
                .unwrap_or(1);
            for _ in 1..span {
                cells.push(String::new());
            }
        }
        cells
    }

    fn link(&mut self, element: ElementRef) {
        let body = child_named(element, "ac:link-body")
            .or_else(|| child_named(element, "ac:plain-text-link-body"));
        let body_text = body
            .map(|b| text_of(b).trim().to_string())
            .filter(|t| !t.is_empty());

        if let Some(user) = descendant_named(element, "ri:user") {
            let name = body_text
                .or_else(|| non_empty_attr(user, "ri:userkey"))
                .or_else(|| non_empty_attr(user, "ri:account-id"))
                .unwrap_or_else(|| "user".to_string());
            self.out.push_str(&escape_text(&format!("@{name}")));
            return;
        }

        if let Some(page) = descendant_named(element, "ri:page") {
            let title = non_empty_attr(page, "ri:content-title");
            if self.options.obsidian {
                if let Some(title) = &title {
                    let link = match &body_text {
                        Some(text) if text != title => format!("[[{title}|{text}]]"),
                        _ => format!("[[{title}]]"),
                    };
                    self.raw_inline(&link);
                    return;
                }
            }
            let text = body_text
                .or(title)
                .unwrap_or_else(|| "Link".to_string());
            self.anchor("", &text);
            return;
        }

        if let Some(entity) = descendant_named(element, "ri:content-entity") {
            let title =
                non_empty_attr(entity, "ri:content-title").unwrap_or_else(|| "Link".to_string());
            self.anchor("", &title);
            return;
        }

        if let Some(attachment) = descendant_named(element, "ri:attachment") {
            let filename = non_empty_attr(attachment, "ri:filename").unwrap_or_default();
            if self.options.obsidian && !filename.is_empty() {
                let link = match &body_text {
                    Some(text) if *text != filename => format!("[[{filename}|{text}]]"),
                    _ => format!("[[{filename}]]"),
                };
                self.raw_inline(&link);
                return;
            }
            self.anchor("", &body_text.unwrap_or(filename));
            return;
        }

        if let Some(target) = descendant_named(element, "ri:url") {
            let href = target.value().attr("ri:value").unwrap_or_default();
            let text = body_text.unwrap_or_else(|| href.to_string());
            self.anchor(href, &text);
            return;
        }

        if let Some(body) = body {
            self.children(body);
        }
    }

    fn emoticon(&mut self, element: ElementRef) {
        let name = element.value().attr("ac:name").unwrap_or_default();
        let rendered = match emoji_for(name) {
            Some(emoji) => emoji.to_string(),
            None => element
                .value()
                .attr("ac:emoji-fallback")
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!(":{name}:")),
        };
        self.out.push_str(&escape_text(&rendered));
    }

    fn image(&mut self, element: ElementRef) {
        let alt = non_empty_attr(element, "ac:alt");

        if let Some(attachment) = descendant_named(element, "ri:attachment") {
            let filename =
                non_empty_attr(attachment, "ri:filename").unwrap_or_else(|| "image".to_string());
            if self.options.obsidian {
                let embed = match non_empty_attr(element, "ac:width") {
                    Some(width) => format!("![[{filename}|{width}]]"),
                    None => format!("![[{filename}]]"),
                };
                self.raw_inline(&embed);
                return;
            }
            let src = if self.options.download_images {
                format!("{}/{}", self.options.image_dir, filename)
            } else {
                filename.clone()
            };
            self.img(&src, &alt.unwrap_or(filename));
            return;
        }

        let src = descendant_named(element, "ri:url")
            .and_then(|u| non_empty_attr(u, "ri:value"))
            .unwrap_or_default();
        self.img(&src, &alt.unwrap_or_else(|| "image".to_string()));
    }

    fn span(&mut self, element: ElementRef) {
        let class_color = element
            .value()
            .classes()
            .find(|c| c.starts_with("highlight-"))
            .map(|c| highlight_class_color(c).unwrap_or("yellow"));
        if let Some(color) = class_color {
            self.mark(color, element);
            return;
        }

        let style_color = element
            .value()
            .attr("style")
            .and_then(|style| BACKGROUND_COLOR.captures(style))
            .map(|caps| caps[1].trim().to_string());
        if let Some(color) = style_color {
            self.mark(&color, element);
            return;
        }

        self.children(element);
    }

    fn mark(&mut self, color: &str, content: ElementRef) {
        self.out.push_str(&format!(
            "<mark data-highlight-color=\"{}\">",
            escape_attr(color)
        ));
        self.children(content);
        self.out.push_str("</mark>");
    }

    fn anchor(&mut self, href: &str, text: &str) {
        if href.is_empty() {
            self.out.push_str(&escape_text(text));
            return;
        }
        self.out.push_str(&format!(
            "<a href=\"{}\">{}</a>",
            escape_attr(href),
            escape_text(text)
        ));
    }

    fn img(&mut self, src: &str, alt: &str) {
        if src.is_empty() {
            return;
        }
        self.out.push_str(&format!(
            "<img src=\"{}\" alt=\"{}\">",
            escape_attr(src),
            escape_attr(alt)
        ));
    }

    fn raw_inline(&mut self, markdown: &str) {
        self.out.push_str(&format!(
            "<span data-raw-markdown=\"true\">{}</span>",
            escape_text(markdown)
        ));
    }

    fn raw_block(&mut self, markdown: &str) {
        self.out.push_str(&format!(
            "<div data-raw-markdown=\"true\">{}</div>",
            escape_text(markdown)
        ));
    }
}

fn child_named<'a>(element: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .find(|c| c.value().name() == name)
}

fn descendant_named<'a>(element: ElementRef<'a>, name: &str) -> Option<ElementRef<'a>> {
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|c| c.value().name() == name)
}

fn text_of(element: ElementRef) -> String {
    element.text().collect()
}

fn non_empty_attr(element: ElementRef, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Value of the macro's own `ac:parameter` named `name`, if non-empty.
fn parameter(element: ElementRef, name: &str) -> Option<String> {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|c| c.value().name() == "ac:parameter")
        .find(|c| c.value().attr("ac:name") == Some(name))
        .map(|c| text_of(c).trim().to_string())
        .filter(|v| !v.is_empty())
}

fn plain_body(element: ElementRef) -> Option<String> {
    child_named(element, "ac:plain-text-body").map(text_of)
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
