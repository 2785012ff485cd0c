use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::rewrite::outer_html;

pub trait Converter: Send + Sync {
    fn to_markdown(&self, html: &str) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeBlockStyle {
    Fenced,
    Indented,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownOptions {
    pub bullet_marker: String,
    pub code_block_style: CodeBlockStyle,
    pub fence: String,
    pub em_delimiter: String,
    pub strong_delimiter: String,
    /// Elements emitted verbatim as HTML blocks.
    pub keep_tags: Vec<String>,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            bullet_marker: "-".to_string(),
            code_block_style: CodeBlockStyle::Fenced,
            fence: "```".to_string(),
            em_delimiter: "*".to_string(),
            strong_delimiter: "**".to_string(),
            keep_tags: vec!["figure".to_string(), "figcaption".to_string()],
        }
    }
}

/// HTML to Markdown converter driven by [`MarkdownOptions`].
#[derive(Debug, Clone, Default)]
pub struct MarkdownConverter {
    options: MarkdownOptions,
}

impl Converter for MarkdownConverter {
    fn to_markdown(&self, html: &str) -> String {
        self.convert(html)
    }
}

impl MarkdownConverter {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }

    pub fn convert(&self, html: &str) -> String {
        let fragment = Html::parse_fragment(html);
        let mut out = MarkdownBuffer::default();
        for child in fragment.root_element().children() {
            self.visit_node(child, &mut out);
        }
        out.finish()
    }

    fn visit_node(&self, node: NodeRef<'_, Node>, out: &mut MarkdownBuffer) {
        match node.value() {
            Node::Text(text) => out.append_text(text),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    self.visit_element(element, out);
                }
            }
            Node::Comment(_) => {}
            _ => {
                for child in node.children() {
                    self.visit_node(child, out);
                }
            }
        }
    }

    fn visit_children(&self, element: ElementRef<'_>, out: &mut MarkdownBuffer) {
        for child in element.children() {
            self.visit_node(child, out);
        }
    }

    fn visit_element(&self, element: ElementRef<'_>, out: &mut MarkdownBuffer) {
        let tag = element.value().name().to_ascii_lowercase();
        if self.options.keep_tags.iter().any(|kept| kept.eq_ignore_ascii_case(&tag)) {
            out.push_block(&outer_html(element));
            return;
        }
        match tag.as_str() {
            "p" | "div" | "section" | "article" | "header" | "footer" | "main" | "aside"
            | "nav" | "table" | "address" | "center" => {
                out.ensure_blank_line();
                self.visit_children(element, out);
                out.ensure_blank_line();
            }
            "tr" => self.visit_table_row(element, out),
            "dt" | "dd" => {
                out.ensure_newline();
                self.visit_children(element, out);
                out.ensure_newline();
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse::<usize>().unwrap_or(1);
                let text = self.render_inline(element);
                if !text.is_empty() {
                    out.push_block(&format!("{} {}", "#".repeat(level), text));
                }
            }
            "br" => out.push_raw("  \n"),
            "hr" => out.push_block("* * *"),
            "em" | "i" => self.wrap_inline(element, &self.options.em_delimiter, out),
            "strong" | "b" => self.wrap_inline(element, &self.options.strong_delimiter, out),
            "code" | "kbd" | "samp" => {
                let code: String = element.text().collect();
                if !code.is_empty() {
                    let tick = if code.contains('`') { "``" } else { "`" };
                    out.push_raw(&format!("{tick}{code}{tick}"));
                }
            }
            "pre" => out.push_block(&self.render_code_block(element)),
            "a" => self.visit_anchor(element, out),
            "img" => {
                let src = element.value().attr("src").map(str::trim).unwrap_or("");
                if !src.is_empty() {
                    let alt = element.value().attr("alt").unwrap_or("");
                    out.push_raw(&format!("![{}]({})", escape_markdown(alt), src));
                }
            }
            "ul" | "ol" => out.push_block(&self.render_list(element, tag == "ol")),
            "blockquote" => {
                let inner = self.render_block(element);
                if !inner.is_empty() {
                    let quoted = inner
                        .lines()
                        .map(|line| {
                            if line.is_empty() {
                                ">".to_string()
                            } else {
                                format!("> {line}")
                            }
                        })
                        .collect::<Vec<_>>()
                        .join("\n");
                    out.push_block(&quoted);
                }
            }
            "script" | "style" | "noscript" | "template" | "iframe" | "head" | "title" => {
                // not part of the readable content
            }
            _ => self.visit_children(element, out),
        }
    }

    /// Edge whitespace inside the element is emitted outside the delimiters.
    fn wrap_inline(&self, element: ElementRef<'_>, delimiter: &str, out: &mut MarkdownBuffer) {
        let (leading, trailing) = edge_whitespace(element);
        let text = self.render_inline(element);
        if leading {
            out.append_text(" ");
        }
        if !text.is_empty() {
            out.push_raw(&format!("{delimiter}{text}{delimiter}"));
        }
        if trailing {
            out.append_text(" ");
        }
    }

    fn visit_anchor(&self, element: ElementRef<'_>, out: &mut MarkdownBuffer) {
        let (leading, trailing) = edge_whitespace(element);
        let text = self.render_inline(element);
        if leading {
            out.append_text(" ");
        }
        match element.value().attr("href").map(str::trim) {
            Some(href) if !href.is_empty() => out.push_raw(&format!("[{text}]({href})")),
            _ => out.push_raw(&text),
        }
        if trailing {
            out.append_text(" ");
        }
    }

    /// One `| a | b |` line per row. A row made only of `<th>` cells gets a
    /// delimiter row underneath.
    fn visit_table_row(&self, row: ElementRef<'_>, out: &mut MarkdownBuffer) {
        let cells: Vec<ElementRef<'_>> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| {
                let name = cell.value().name();
                name.eq_ignore_ascii_case("td") || name.eq_ignore_ascii_case("th")
            })
            .collect();
        if cells.is_empty() {
            return;
        }
        let rendered = cells
            .iter()
            .map(|cell| self.render_inline(*cell).replace('|', r"\|"))
            .collect::<Vec<_>>();
        out.ensure_newline();
        out.push_raw(&format!("| {} |", rendered.join(" | ")));
        out.ensure_newline();
        if cells
            .iter()
            .all(|cell| cell.value().name().eq_ignore_ascii_case("th"))
        {
            let delimiters = vec!["---"; cells.len()];
            out.push_raw(&format!("| {} |", delimiters.join(" | ")));
            out.ensure_newline();
        }
    }

    fn render_inline(&self, element: ElementRef<'_>) -> String {
        let mut inner = MarkdownBuffer::default();
        self.visit_children(element, &mut inner);
        inner
            .finish()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn render_block(&self, element: ElementRef<'_>) -> String {
        let mut inner = MarkdownBuffer::default();
        self.visit_children(element, &mut inner);
        inner.finish()
    }

    fn render_list(&self, list: ElementRef<'_>, ordered: bool) -> String {
        let start = list
            .value()
            .attr("start")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1);
        let items = list
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name().eq_ignore_ascii_case("li"));

        let mut lines = Vec::new();
        for (index, item) in items.enumerate() {
            let marker = if ordered {
                format!("{}.", start + index)
            } else {
                self.options.bullet_marker.clone()
            };
            let indent = " ".repeat(marker.chars().count() + 1);
            let content = self.render_block(item);
            let mut item_lines = content.lines();
            lines.push(format!("{marker} {}", item_lines.next().unwrap_or("")).trim_end().to_string());
            for line in item_lines {
                if line.is_empty() {
                    lines.push(String::new());
                } else {
                    lines.push(format!("{indent}{line}"));
                }
            }
        }
        lines.join("\n")
    }

    fn render_code_block(&self, pre: ElementRef<'_>) -> String {
        let code: String = pre.text().collect();
        let code = code.trim_end_matches('\n');
        match self.options.code_block_style {
            CodeBlockStyle::Fenced => {
                let language = code_language(pre).unwrap_or_default();
                format!(
                    "{fence}{language}\n{code}\n{fence}",
                    fence = self.options.fence
                )
            }
            CodeBlockStyle::Indented => code
                .lines()
                .map(|line| format!("    {line}"))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// `language-xyz` / `lang-xyz` class on `<pre>` or its first `<code>` child.
fn code_language(pre: ElementRef<'_>) -> Option<String> {
    let code_child = pre
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name().eq_ignore_ascii_case("code"));
    [Some(pre), code_child]
        .into_iter()
        .flatten()
        .flat_map(|el| el.value().classes().map(str::to_string).collect::<Vec<_>>())
        .find_map(|class| {
            class
                .strip_prefix("language-")
                .or_else(|| class.strip_prefix("lang-"))
                .map(str::to_string)
        })
}

fn is_collapsible(ch: char) -> bool {
    ch.is_whitespace() && ch != '\u{a0}'
}

fn edge_whitespace(element: ElementRef<'_>) -> (bool, bool) {
    let text: String = element.text().collect();
    (
        text.chars().next().is_some_and(is_collapsible),
        text.chars().next_back().is_some_and(is_collapsible),
    )
}

/// Backslash-escapes text that would otherwise open a list, heading or
/// quote when it starts a line.
fn escape_line_start(text: &str) -> String {
    let digits = text.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && text[digits..].starts_with(". ") {
        return format!("{}\\{}", &text[..digits], &text[digits..]);
    }
    let hashes = text.chars().take_while(|ch| *ch == '#').count();
    let marker = match text.chars().next() {
        Some('-' | '>') => true,
        Some('+') => text[1..].is_empty() || text[1..].starts_with(' '),
        Some('#') => hashes <= 6 && (text[hashes..].is_empty() || text[hashes..].starts_with(' ')),
        _ => false,
    };
    if marker {
        format!("\\{text}")
    } else {
        text.to_string()
    }
}

fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '*' | '_' | '`' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[derive(Default)]
struct MarkdownBuffer {
    text: String,
}

impl MarkdownBuffer {
    fn last_char(&self) -> Option<char> {
        self.text.chars().next_back()
    }

    fn at_line_start(&self) -> bool {
        matches!(self.last_char(), None | Some('\n'))
    }

    /// Collapses whitespace runs to a single space and escapes Markdown
    /// punctuation, including block markers at the start of a line.
    fn append_text(&mut self, text: &str) {
        let mut collapsed = String::with_capacity(text.len());
        let mut pending_space = false;
        for ch in text.chars() {
            if is_collapsible(ch) {
                pending_space = true;
                continue;
            }
            if pending_space {
                collapsed.push(' ');
            }
            pending_space = false;
            if matches!(ch, '\\' | '*' | '_' | '`' | '[' | ']') {
                collapsed.push('\\');
            }
            collapsed.push(ch);
        }
        if pending_space {
            collapsed.push(' ');
        }

        let mut rest = collapsed.as_str();
        if let Some(stripped) = rest.strip_prefix(' ') {
            if !self.at_line_start() && self.last_char() != Some(' ') {
                self.text.push(' ');
            }
            rest = stripped;
        }
        if rest.is_empty() {
            return;
        }
        if self.at_line_start() {
            self.text.push_str(&escape_line_start(rest));
        } else {
            self.text.push_str(rest);
        }
    }

    fn push_raw(&mut self, markdown: &str) {
        self.text.push_str(markdown);
    }

    fn trim_trailing_spaces(&mut self) {
        let trimmed = self.text.trim_end_matches([' ', '\t']).len();
        self.text.truncate(trimmed);
    }

    fn ensure_newline(&mut self) {
        self.trim_trailing_spaces();
        if !self.at_line_start() {
            self.text.push('\n');
        }
    }

    fn ensure_blank_line(&mut self) {
        self.trim_trailing_spaces();
        if self.text.is_empty() || self.text.ends_with("\n\n") {
            return;
        }
        if self.text.ends_with('\n') {
            self.text.push('\n');
        } else {
            self.text.push_str("\n\n");
        }
    }

    fn push_block(&mut self, block: &str) {
        if block.trim().is_empty() {
            return;
        }
        self.ensure_blank_line();
        self.text.push_str(block);
        self.ensure_blank_line();
    }

    fn finish(self) -> String {
        self.text.trim_end().trim_start_matches('\n').to_string()
    }
}
