use pretty_assertions::assert_eq;
use wp_export_engine::{CodeBlockStyle, MarkdownConverter, MarkdownOptions};

fn convert(html: &str) -> String {
    MarkdownConverter::default().convert(html)
}

#[test]
fn paragraphs_and_headings_become_blocks() {
    assert_eq!(
        convert("<h2>Title</h2><p>First</p><p>Second</p>"),
        "## Title\n\nFirst\n\nSecond"
    );
}

#[test]
fn emphasis_uses_configured_delimiters() {
    assert_eq!(
        convert("<p>A <em>quiet</em> and <strong>loud</strong> word</p>"),
        "A *quiet* and **loud** word"
    );

    let options = MarkdownOptions {
        em_delimiter: "_".into(),
        strong_delimiter: "__".into(),
        ..MarkdownOptions::default()
    };
    assert_eq!(
        MarkdownConverter::new(options).convert("<p><i>a</i> <b>b</b></p>"),
        "_a_ __b__"
    );
}

#[test]
fn unordered_lists_use_dash_bullets() {
    assert_eq!(convert("<ul><li>One</li><li>Two</li></ul>"), "- One\n- Two");
}

#[test]
fn ordered_lists_honor_start() {
    assert_eq!(
        convert(r#"<ol start="3"><li>c</li><li>d</li></ol>"#),
        "3. c\n4. d"
    );
}

#[test]
fn nested_lists_are_indented() {
    assert_eq!(
        convert("<ul><li>Outer<ul><li>Inner</li></ul></li></ul>"),
        "- Outer\n\n  - Inner"
    );
}

#[test]
fn code_blocks_are_fenced_with_language() {
    assert_eq!(
        convert(r#"<pre><code class="language-rust">fn main() {}
</code></pre>"#),
        "```rust\nfn main() {}\n```"
    );
}

#[test]
fn indented_code_style_is_supported() {
    let options = MarkdownOptions {
        code_block_style: CodeBlockStyle::Indented,
        ..MarkdownOptions::default()
    };
    assert_eq!(
        MarkdownConverter::new(options).convert("<pre>let a = 1;\nlet b = 2;</pre>"),
        "    let a = 1;\n    let b = 2;"
    );
}

#[test]
fn figures_pass_through_as_html() {
    assert_eq!(
        convert(r#"<p>Intro</p><figure><img src="a.png"><figcaption>A cat</figcaption></figure>"#),
        "Intro\n\n<figure><img src=\"a.png\"><figcaption>A cat</figcaption></figure>"
    );
}

#[test]
fn links_and_images_are_inline() {
    assert_eq!(
        convert(r#"<p>See <a href="https://example.com/">this</a> <img src="x.png"></p>"#),
        "See [this](https://example.com/) ![](x.png)"
    );
}

#[test]
fn image_without_source_produces_nothing() {
    assert_eq!(convert(r#"<p>Before<img alt="gone">After</p>"#), "BeforeAfter");
}

#[test]
fn blockquotes_prefix_every_line() {
    assert_eq!(
        convert("<blockquote><p>One</p><p>Two</p></blockquote>"),
        "> One\n>\n> Two"
    );
}

#[test]
fn scripts_are_dropped() {
    assert_eq!(convert("<p>Text</p><script>alert(1)</script>"), "Text");
}

#[test]
fn edge_spaces_move_outside_inline_delimiters() {
    assert_eq!(
        convert(r#"<p><strong>Note: </strong>read this and <a href="https://x">click </a>here</p>"#),
        "**Note:** read this and [click](https://x) here"
    );
    assert_eq!(convert("<p>a<em> soft</em>b</p>"), "a *soft*b");
}

#[test]
fn table_cells_stay_separated() {
    assert_eq!(
        convert("<table><tr><td>Apples</td><td>Pears</td></tr></table>"),
        "| Apples | Pears |"
    );
    assert_eq!(
        convert(
            "<table><thead><tr><th>Fruit</th><th>Qty</th></tr></thead>\
             <tbody><tr><td>Apples</td><td>3</td></tr></tbody></table><p>After</p>"
        ),
        "| Fruit | Qty |\n| --- | --- |\n| Apples | 3 |\n\nAfter"
    );
}

#[test]
fn paragraphs_that_look_like_markdown_blocks_are_escaped() {
    assert_eq!(
        convert("<p>- not a list</p><p># not a heading</p><p>1. not ordered</p>"),
        "\\- not a list\n\n\\# not a heading\n\n1\\. not ordered"
    );
    assert_eq!(convert("<p>&gt; not a quote</p>"), "\\> not a quote");
    assert_eq!(convert("<p>a - b # c 1. d</p>"), "a - b # c 1. d");
}
