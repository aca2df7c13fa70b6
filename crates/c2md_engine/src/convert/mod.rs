mod lookup;
mod markdown;
mod storage;

use c2md_core::DEFAULT_IMAGE_DIR;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static CDATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid regex"));

// HTML parsing ignores `/>` on unknown elements, so `<ri:page .../>` would
// swallow its following siblings.
static SELF_CLOSING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<((?:ac|ri):[A-Za-z0-9_-]+|time)(\s[^<>]*?)?\s*/>").expect("valid regex")
});

// The HTML parser closes an open `<p>` at the first block element, which
// would cut a block macro out of its paragraph.
static PARAGRAPH_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(/?)p(\s[^<>]*)?>").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Point attachment images at `image_dir/<file>` instead of the bare name.
    pub download_images: bool,
    pub image_dir: String,
    /// Emit callouts, wikilinks and `==highlights==`.
    pub obsidian: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            download_images: false,
            image_dir: DEFAULT_IMAGE_DIR.to_string(),
            obsidian: false,
        }
    }
}

pub trait Converter: Send + Sync {
    fn to_markdown(&self, html: &str) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct StorageConverter {
    options: ConvertOptions,
}

impl StorageConverter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }
}

impl Converter for StorageConverter {
    fn to_markdown(&self, html: &str) -> String {
        convert(html, &self.options)
    }
}

/// Convert a storage-format body to Markdown.
pub fn convert(html: &str, options: &ConvertOptions) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let normalized = normalize_storage(html, options);
    markdown::finish(&markdown::render(&normalized, options.obsidian))
}

/// Rewrite Confluence-specific markup into plain HTML.
pub fn normalize_storage(html: &str, options: &ConvertOptions) -> String {
    storage::normalize(&preclean(html), options)
}

fn preclean(html: &str) -> String {
    let html = CDATA.replace_all(html, |caps: &Captures| storage::escape_text(&caps[1]));
    let html = SELF_CLOSING.replace_all(&html, "<${1}${2}></${1}>");
    PARAGRAPH_TAG
        .replace_all(&html, |caps: &Captures| {
            let attrs = caps.get(2).map_or("", |m| m.as_str());
            format!("<{}{}{}>", &caps[1], storage::PARAGRAPH, attrs)
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::preclean;

    #[test]
    fn cdata_becomes_escaped_text() {
        assert_eq!(preclean("<![CDATA[if a < b && c]]>"), "if a &lt; b &amp;&amp; c");
    }

    #[test]
    fn self_closing_resources_are_expanded() {
        assert_eq!(
            preclean(r#"<ri:page ri:content-title="A" /><br/>"#),
            r#"<ri:page ri:content-title="A"></ri:page><br/>"#
        );
        assert_eq!(preclean("<ac:emoticon ac:name=\"smile\"/>"), "<ac:emoticon ac:name=\"smile\"></ac:emoticon>");
    }

    #[test]
    fn paragraphs_are_renamed_but_pre_is_not() {
        assert_eq!(
            preclean(r#"<p class="a">x</p><pre>y</pre><param>"#),
            r#"<storage-p class="a">x</storage-p><pre>y</pre><param>"#
        );
    }
}
