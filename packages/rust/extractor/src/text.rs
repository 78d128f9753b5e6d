//! DOM-to-text rendering and whitespace normalization.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Node};

/// Elements separated from their neighbours by a blank line.
const PARAGRAPH_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "table", "ul", "ol", "hr",
];

/// Elements that start on a new line.
const LINE_TAGS: &[&str] = &[
    "div", "section", "article", "main", "li", "tr", "dt", "dd", "figure", "figcaption",
    "header", "footer", "aside", "nav", "form",
];

/// Render an element's text with line breaks at block boundaries, skipping
/// any descendant for which `skip` returns true.
pub(crate) fn render_text<'a>(
    root: ElementRef<'a>,
    skip: &dyn Fn(&ElementRef<'a>) -> bool,
) -> String {
    let mut out = String::new();
    collect(root, skip, &mut out);
    normalize_text(&out)
}

fn collect<'a>(el: ElementRef<'a>, skip: &dyn Fn(&ElementRef<'a>) -> bool, out: &mut String) {
    for child in el.children() {
        match child.value() {
            // Source newlines are plain whitespace; only structure breaks lines.
            Node::Text(text) => out.push_str(&text.replace(['\n', '\r'], " ")),
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if skip(&child_el) {
                    continue;
                }
                let name = child_el.value().name();
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let breaks = if PARAGRAPH_TAGS.contains(&name) {
                    2
                } else if LINE_TAGS.contains(&name) {
                    1
                } else {
                    0
                };
                ensure_breaks(out, breaks);
                collect(child_el, skip, out);
                ensure_breaks(out, breaks);
            }
            _ => {}
        }
    }
}

/// Make `out` end in at least `n` newlines, ignoring trailing spaces.
fn ensure_breaks(out: &mut String, n: usize) {
    if n == 0 {
        return;
    }
    let kept = out.trim_end_matches([' ', '\t']).len();
    out.truncate(kept);
    let existing = out.chars().rev().take_while(|c| *c == '\n').count();
    for _ in existing..n {
        out.push('\n');
    }
}

/// Collapse whitespace inside lines, trim lines, and squeeze blank-line runs
/// down to a single blank line.
pub fn normalize_text(raw: &str) -> String {
    static INLINE_WS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[ \t\u{a0}\r\f\v]+").expect("valid regex"));
    static BLANK_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let collapsed = INLINE_WS_RE.replace_all(raw, " ");
    let trimmed_lines = collapsed
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");

    BLANK_RUN_RE
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}
