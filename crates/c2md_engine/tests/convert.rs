use c2md_engine::{convert, normalize_storage, ConvertOptions, Converter, StorageConverter};
use pretty_assertions::assert_eq;

fn md(html: &str) -> String {
    convert(html, &ConvertOptions::default())
}

fn md_obsidian(html: &str) -> String {
    convert(
        html,
        &ConvertOptions {
            obsidian: true,
            ..ConvertOptions::default()
        },
    )
}

fn md_downloading(html: &str) -> String {
    convert(
        html,
        &ConvertOptions {
            download_images: true,
            ..ConvertOptions::default()
        },
    )
}

#[test]
fn empty_or_blank_input_yields_empty_output() {
    assert_eq!(md(""), "");
    assert_eq!(md("  \n\t "), "");
}

#[test]
fn code_macro_becomes_fenced_block_with_language() {
    let html = r#"<ac:structured-macro ac:name="code"><ac:parameter ac:name="language">python</ac:parameter><ac:plain-text-body><![CDATA[print("hello")]]></ac:plain-text-body></ac:structured-macro>"#;
    assert_eq!(md(html), "```python\nprint(\"hello\")\n```\n");
}

#[test]
fn cdata_markup_survives_as_literal_code() {
    let html = r#"<ac:structured-macro ac:name="code"><ac:plain-text-body><![CDATA[if (a < b) { x = "<p>"; }]]></ac:plain-text-body></ac:structured-macro>"#;
    assert_eq!(md(html), "```\nif (a < b) { x = \"<p>\"; }\n```\n");
}

#[test]
fn noformat_macro_keeps_text() {
    let html = r#"<ac:structured-macro ac:name="noformat"><ac:plain-text-body><![CDATA[raw text here]]></ac:plain-text-body></ac:structured-macro>"#;
    assert_eq!(md(html), "```\nraw text here\n```\n");
}

#[test]
fn info_panel_becomes_labelled_blockquote() {
    let html = r#"<ac:structured-macro ac:name="info"><ac:rich-text-body><p>Important</p></ac:rich-text-body></ac:structured-macro>"#;
    assert_eq!(md(html), "> **Info**\n>\n> Important\n");
}

#[test]
fn panel_titles_and_kinds_are_labelled() {
    let note = r#"<ac:structured-macro ac:name="note"><ac:parameter ac:name="title">My Title</ac:parameter><ac:rich-text-body><p>x</p></ac:rich-text-body></ac:structured-macro>"#;
    assert!(md(note).contains("**Note: My Title**"));

    let warning = r#"<ac:structured-macro ac:name="warning"><ac:rich-text-body><p>x</p></ac:rich-text-body></ac:structured-macro>"#;
    assert!(md(warning).contains("**Warning**"));

    let panel = r#"<ac:structured-macro ac:name="panel"><ac:rich-text-body><p>x</p></ac:rich-text-body></ac:structured-macro>"#;
    assert!(md(panel).starts_with("> **Note**"));
}

#[test]
fn obsidian_panel_becomes_callout() {
    let html = r#"<ac:structured-macro ac:name="warning"><ac:parameter ac:name="title">Careful</ac:parameter><ac:rich-text-body><p>Line one</p><p>Line two</p></ac:rich-text-body></ac:structured-macro>"#;
    assert_eq!(
        md_obsidian(html),
        "> [!warning] Careful\n> Line one\n>\n> Line two\n"
    );
}

#[test]
fn expand_macro_is_kept_as_details() {
    let html = r#"<ac:structured-macro ac:name="expand"><ac:parameter ac:name="title">Details</ac:parameter><ac:rich-text-body><p>Hidden</p></ac:rich-text-body></ac:structured-macro>"#;
    assert_eq!(
        md(html),
        "<details><summary>Details</summary><p>Hidden</p></details>\n"
    );

    let untitled = r#"<ac:structured-macro ac:name="expand"><ac:rich-text-body><p>Hidden</p></ac:rich-text-body></ac:structured-macro>"#;
    assert!(md(untitled).contains("<summary>Click to expand</summary>"));
}

#[test]
fn obsidian_expand_is_folded_callout() {
    let html = r#"<ac:structured-macro ac:name="expand"><ac:parameter ac:name="title">More</ac:parameter><ac:rich-text-body><p>Hidden</p></ac:rich-text-body></ac:structured-macro>"#;
    assert_eq!(md_obsidian(html), "> [!note]- More\n> Hidden\n");
}

#[test]
fn task_lists_render_checkboxes() {
    let html = "<ac:task-list>\
        <ac:task><ac:task-status>complete</ac:task-status><ac:task-body>Done</ac:task-body></ac:task>\
        <ac:task><ac:task-status>incomplete</ac:task-status><ac:task-body>Todo</ac:task-body></ac:task>\
        </ac:task-list>";
    assert_eq!(md(html), "- [x] Done\n- [ ] Todo\n");
}

#[test]
fn nested_task_lists_are_indented() {
    let html = "<ac:task-list><ac:task><ac:task-status>incomplete</ac:task-status><ac:task-body>Parent\
        <ac:task-list><ac:task><ac:task-status>complete</ac:task-status><ac:task-body>Child</ac:task-body></ac:task></ac:task-list>\
        </ac:task-body></ac:task></ac:task-list>";
    assert_eq!(md(html), "- [ ] Parent\n  - [x] Child\n");
}

#[test]
fn task_list_directly_inside_task_list_nests_under_previous_task() {
    let html = "<ac:task-list>\
        <ac:task><ac:task-status>incomplete</ac:task-status><ac:task-body>Parent</ac:task-body></ac:task>\
        <ac:task-list><ac:task><ac:task-status>complete</ac:task-status><ac:task-body>Child</ac:task-body></ac:task></ac:task-list>\
        <ac:task><ac:task-status>incomplete</ac:task-status><ac:task-body>Next</ac:task-body></ac:task>\
        </ac:task-list>";
    assert_eq!(md(html), "- [ ] Parent\n  - [x] Child\n- [ ] Next\n");
}

#[test]
fn user_mentions_use_display_name_or_key() {
    let named = r#"<p>Hi <ac:link><ri:user ri:account-id="abc" /><ac:plain-text-link-body><![CDATA[John Doe]]></ac:plain-text-link-body></ac:link></p>"#;
    assert_eq!(md(named), "Hi @John Doe\n");

    let bare = r#"<p><ac:link><ri:user ri:account-id="557058:abc" /></ac:link></p>"#;
    assert_eq!(md(bare), "@557058:abc\n");
}

#[test]
fn status_macro_is_bold_uppercase() {
    let html = r#"<ac:structured-macro ac:name="status"><ac:parameter ac:name="title">done</ac:parameter><ac:parameter ac:name="colour">Green</ac:parameter></ac:structured-macro>"#;
    assert_eq!(md(html), "**[DONE]**\n");

    let untitled = r#"<ac:structured-macro ac:name="status" />"#;
    assert_eq!(md(untitled), "**[STATUS]**\n");
}

#[test]
fn emoticons_become_emoji() {
    let html = r#"<p><ac:emoticon ac:name="smile" /> and <ac:emoticon ac:name="tick" /></p>"#;
    assert_eq!(md(html), "\u{1f642} and \u{2705}\n");

    let unknown = r#"<p><ac:emoticon ac:name="rocket" /></p>"#;
    assert_eq!(md(unknown), ":rocket:\n");

    let fallback = r#"<p><ac:emoticon ac:name="blue-rocket" ac:emoji-fallback="🚀" /></p>"#;
    assert_eq!(md(fallback), "🚀\n");
}

#[test]
fn attachment_images_point_into_image_dir_when_downloading() {
    let html = r#"<ac:image><ri:attachment ri:filename="diagram.png" /></ac:image>"#;
    assert_eq!(md_downloading(html), "![diagram.png](assets/diagram.png)\n");
    assert_eq!(md(html), "![diagram.png](diagram.png)\n");

    let custom = convert(
        html,
        &ConvertOptions {
            download_images: true,
            image_dir: "My Page".to_string(),
            obsidian: false,
        },
    );
    assert_eq!(custom, "![diagram.png](My%20Page/diagram.png)\n");
}

#[test]
fn image_alt_text_is_preferred() {
    let html = r#"<ac:image ac:alt="Architecture"><ri:attachment ri:filename="a.png" /></ac:image>"#;
    assert_eq!(md_downloading(html), "![Architecture](assets/a.png)\n");
}

#[test]
fn url_images_keep_their_source() {
    let html = r#"<ac:image><ri:url ri:value="https://example.com/img.png" /></ac:image>"#;
    let out = md(html);
    assert!(out.contains("https://example.com/img.png"));
    assert_eq!(out, "![image](https://example.com/img.png)\n");
}

#[test]
fn obsidian_images_are_embeds() {
    let html = r#"<p><ac:image ac:width="300"><ri:attachment ri:filename="d.png" /></ac:image></p>"#;
    assert_eq!(md_obsidian(html), "![[d.png|300]]\n");

    let plain = r#"<p><ac:image><ri:attachment ri:filename="d.png" /></ac:image></p>"#;
    assert_eq!(md_obsidian(plain), "![[d.png]]\n");
}

#[test]
fn toc_is_removed_and_headings_are_atx() {
    let html = r#"<ac:structured-macro ac:name="toc" /><h2>My Heading</h2><p>Body</p>"#;
    assert_eq!(md(html), "## My Heading\n\nBody\n");
}

#[test]
fn page_links_keep_their_text() {
    let html = r#"<p><ac:link><ri:page ri:content-title="Other Page" /></ac:link></p>"#;
    assert_eq!(md(html), "Other Page\n");

    let labelled = r#"<p><ac:link><ri:page ri:content-title="Other Page" /><ac:plain-text-link-body><![CDATA[see here]]></ac:plain-text-link-body></ac:link></p>"#;
    assert_eq!(md(labelled), "see here\n");
}

#[test]
fn obsidian_page_links_are_wikilinks() {
    let html = r#"<p>See <ac:link><ri:page ri:content-title="Other Page" /></ac:link></p>"#;
    assert_eq!(md_obsidian(html), "See [[Other Page]]\n");

    let labelled = r#"<p><ac:link><ri:page ri:content-title="Other Page" /><ac:plain-text-link-body><![CDATA[see here]]></ac:plain-text-link-body></ac:link></p>"#;
    assert_eq!(md_obsidian(labelled), "[[Other Page|see here]]\n");
}

#[test]
fn inline_formatting_maps_to_markdown() {
    let html = "<p>Some <strong>bold</strong> and <em>it</em> and <del>gone</del> and <code>x()</code></p>";
    assert_eq!(md(html), "Some **bold** and *it* and ~~gone~~ and `x()`\n");
}

#[test]
fn links_blockquotes_and_rules() {
    let html = r#"<p><a href="https://x.org/a">go</a></p><hr/><blockquote><p>quoted</p><p>more</p></blockquote>"#;
    assert_eq!(md(html), "[go](https://x.org/a)\n\n---\n\n> quoted\n>\n> more\n");
}

#[test]
fn markdown_metacharacters_in_text_are_escaped() {
    assert_eq!(
        md("<p>snake_case_name and 2*3*4 and *not emphasis*</p>"),
        "snake\\_case\\_name and 2\\*3\\*4 and \\*not emphasis\\*\n"
    );
    assert_eq!(md("<p>1. not a list</p>"), "1\\. not a list\n");
    assert_eq!(md("<p># not a heading</p>"), "\\# not a heading\n");
    assert_eq!(md("<p>&gt; not a quote</p>"), "\\> not a quote\n");
}

#[test]
fn block_macro_inside_paragraph_keeps_its_body() {
    let html = r#"<p>intro<ac:structured-macro ac:name="info"><ac:rich-text-body><p>inside</p></ac:rich-text-body></ac:structured-macro>after</p>"#;
    assert_eq!(md(html), "intro\n\n> **Info**\n>\n> inside\n\nafter\n");
}

#[test]
fn line_breaks_stay_inside_paragraph() {
    assert_eq!(md("<p>a<br/>b</p>"), "a\nb\n");
}

#[test]
fn nested_and_numbered_lists() {
    let html = r#"<ul><li>One<ul><li>Nested</li></ul></li><li>Two</li></ul><ol><li>Three</li><li>Four</li></ol>"#;
    assert_eq!(md(html), "- One\n  - Nested\n- Two\n\n1. Three\n2. Four\n");
}

#[test]
fn tables_escape_pipes_and_keep_code_inline() {
    let html = "<table><tbody>\
        <tr><th>Name</th><th>Value</th></tr>\
        <tr><td>a|b</td><td><code>x|y</code></td></tr>\
        </tbody></table>";
    assert_eq!(
        md(html),
        "| Name | Value |\n| --- | --- |\n| a\\|b | `x\\|y` |\n"
    );
}

#[test]
fn multi_line_code_in_table_cell_uses_br() {
    let html = "<table><tbody><tr><th>Snippet</th></tr><tr><td>\
        <ac:structured-macro ac:name=\"code\"><ac:plain-text-body><![CDATA[a\nb]]></ac:plain-text-body></ac:structured-macro>\
        </td></tr></tbody></table>";
    assert_eq!(
        md(html),
        "| Snippet |\n| --- |\n| <code>a<br>b</code> |\n"
    );
}

#[test]
fn table_cells_join_paragraphs_and_pad_spans() {
    let html = "<table><tbody>\
        <tr><th>A</th><th>B</th></tr>\
        <tr><td><p>one</p><p>two</p></td><td>x</td></tr>\
        <tr><td colspan=\"2\">wide</td></tr>\
        </tbody></table>";
    assert_eq!(
        md(html),
        "| A | B |\n| --- | --- |\n| one<br>two | x |\n| wide |  |\n"
    );
}

#[test]
fn headings_and_lists_in_cells_become_plain_lines() {
    let html = "<table><tbody>\
        <tr><th>Col</th><th>List</th></tr>\
        <tr><td><h3>Head</h3></td><td><ul><li>a</li><li>b</li></ul></td></tr>\
        </tbody></table>";
    assert_eq!(md(html), "| Col | List |\n| --- | --- |\n| Head | a<br>b |\n");
}

#[test]
fn highlights_become_marks() {
    let html = r#"<p><span class="highlight-red">hot</span> and <span style="background-color: rgb(255,0,0);">red</span></p>"#;
    assert_eq!(
        md(html),
        "<mark style=\"background: #ffcccb\">hot</mark> and <mark style=\"background: rgb(255,0,0)\">red</mark>\n"
    );

    let macro_html = r#"<ac:structured-macro ac:name="highlight"><ac:parameter ac:name="color">green</ac:parameter><ac:rich-text-body>g</ac:rich-text-body></ac:structured-macro>"#;
    assert_eq!(md(macro_html), "<mark style=\"background: green\">g</mark>\n");
}

#[test]
fn obsidian_yellow_highlight_is_double_equals() {
    let html = r#"<p><span class="highlight-yellow">key</span> <mark>also</mark> <span class="highlight-blue">cool</span></p>"#;
    assert_eq!(
        md_obsidian(html),
        "==key== ==also== <mark style=\"background: #add8e6\">cool</mark>\n"
    );
}

#[test]
fn plain_spans_are_unwrapped() {
    assert_eq!(md(r#"<p><span class="x">plain</span> text</p>"#), "plain text\n");
}

#[test]
fn empty_time_shows_its_date() {
    assert_eq!(md(r#"<p>Due <time datetime="2024-05-01" /></p>"#), "Due 2024-05-01\n");
}

#[test]
fn unknown_macros_fall_back_to_their_bodies() {
    let rich = r#"<ac:structured-macro ac:name="section"><ac:rich-text-body><p>kept</p></ac:rich-text-body></ac:structured-macro>"#;
    assert_eq!(md(rich), "kept\n");

    let plain = r#"<ac:structured-macro ac:name="sql"><ac:plain-text-body><![CDATA[SELECT 1]]></ac:plain-text-body></ac:structured-macro>"#;
    assert_eq!(md(plain), "```\nSELECT 1\n```\n");

    let empty = r#"<ac:structured-macro ac:name="children" />"#;
    assert_eq!(md(empty), "");
}

#[test]
fn adf_extensions_use_fallback_markup() {
    let html = r#"<ac:adf-extension><ac:adf-node type="panel"><ac:adf-content><p>adf</p></ac:adf-content></ac:adf-node><ac:adf-fallback><p>fallback</p></ac:adf-fallback></ac:adf-extension>"#;
    assert_eq!(md(html), "fallback\n");
}

#[test]
fn normalization_exposes_plain_html() {
    let html = r#"<ac:structured-macro ac:name="status"><ac:parameter ac:name="title">wip</ac:parameter></ac:structured-macro>"#;
    assert_eq!(
        normalize_storage(html, &ConvertOptions::default()),
        "<strong>[WIP]</strong>"
    );
}

#[test]
fn converter_trait_matches_free_function_and_is_deterministic() {
    let html = "<h1>Title</h1><p>Body with <strong>bold</strong></p>";
    let converter = StorageConverter::new(ConvertOptions::default());
    let first = converter.to_markdown(html);
    assert_eq!(first, md(html));
    assert_eq!(first, converter.to_markdown(html));
    assert_eq!(first, "# Title\n\nBody with **bold**\n");
}
