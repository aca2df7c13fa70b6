use serde_json::Value;

/// Properties written to the YAML header of a vault note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteMetadata<'a> {
    pub title: &'a str,
    pub page_id: &'a str,
    pub source_url: &'a str,
    pub version: Option<u64>,
    pub fetched_utc: &'a str,
}

/// Prepend YAML frontmatter to a Markdown body.
///
/// Strings are written as JSON string literals, which YAML reads as
/// double-quoted scalars, so titles containing `:` or `#` stay intact.
pub fn build_note(meta: &NoteMetadata<'_>, body_markdown: &str) -> String {
    let mut frontmatter = String::from("---\n");
    push_string(&mut frontmatter, "title", meta.title);
    push_string(&mut frontmatter, "confluence_id", meta.page_id);
    push_string(&mut frontmatter, "source", meta.source_url);
    if let Some(version) = meta.version {
        frontmatter.push_str(&format!("version: {version}\n"));
    }
    push_string(&mut frontmatter, "fetched_utc", meta.fetched_utc);
    frontmatter.push_str("---\n\n");

    format!("{frontmatter}{body_markdown}")
}

fn push_string(out: &mut String, key: &str, value: &str) {
    let quoted = Value::String(value.to_string());
    out.push_str(&format!("{key}: {quoted}\n"));
}
