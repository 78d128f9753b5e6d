//! Readability-style main content detection.
//!
//! Every candidate block is scored by how much non-link text it carries,
//! with bonuses for semantic tags and content-ish class names and penalties
//! for navigation-shaped markup. The best-scoring block wins.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::text::render_text;

/// Candidates shorter than this (in characters) are ignored.
const MIN_CANDIDATE_CHARS: usize = 25;

/// Paragraphs at least this long earn the paragraph bonus.
const MIN_PARAGRAPH_CHARS: usize = 25;

const ARTICLE_BONUS: i64 = 500;
const MAIN_BONUS: i64 = 300;
const CLASS_WEIGHT: i64 = 25;
const PARAGRAPH_BONUS: i64 = 10;
const LINK_HEAVY_PENALTY: i64 = 500;

/// Subtrees never counted as content.
const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "form", "iframe",
];

/// Class/id fragments marking page chrome.
const BOILERPLATE_NAMES: &[&str] = &[
    "nav",
    "menu",
    "sidebar",
    "footer",
    "header",
    "banner",
    "cookie",
    "consent",
    "advert",
    "promo",
    "subscribe",
    "newsletter",
    "share",
    "social",
    "comment",
];

/// Class/id fragments suggesting article body.
const CONTENT_NAMES: &[&str] = &["content", "article", "post", "entry", "body", "main", "text"];

static CANDIDATE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article, main, section, div, td").expect("valid selector"));
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid selector"));
static PARAGRAPH_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid selector"));

/// Pick the main body text of `doc`, or `None` when nothing scores positive.
pub(crate) fn main_text(doc: &Html) -> Option<String> {
    let mut best_score: i64 = 0;
    let mut best_text: Option<String> = None;

    for el in doc.select(&CANDIDATE_SEL) {
        if is_boilerplate(&el) || inside_boilerplate(&el) {
            continue;
        }
        let text = render_text(el, &is_boilerplate);
        let txt = text.chars().count();
        if txt < MIN_CANDIDATE_CHARS {
            continue;
        }

        let score = score_candidate(&el, txt);
        if score > best_score {
            best_score = score;
            best_text = Some(text);
        }
    }

    best_text.filter(|t| !t.trim().is_empty())
}

fn score_candidate(el: &ElementRef<'_>, txt: usize) -> i64 {
    let link_txt = link_text_chars(el).min(txt);
    let non_link = (txt - link_txt) as i64;
    let mut score = non_link - 2 * link_txt as i64;

    match el.value().name() {
        "article" => score += ARTICLE_BONUS,
        "main" => score += MAIN_BONUS,
        _ => {}
    }

    score += class_weight(el);

    let paragraphs = el
        .select(&PARAGRAPH_SEL)
        .filter(|p| p.text().map(|t| t.chars().count()).sum::<usize>() >= MIN_PARAGRAPH_CHARS)
        .count();
    score += PARAGRAPH_BONUS * paragraphs as i64;

    if link_txt > txt / 2 {
        score -= LINK_HEAVY_PENALTY;
    }
    score
}

/// Positive for content-ish class/id names, negative for chrome.
fn class_weight(el: &ElementRef<'_>) -> i64 {
    let names = class_and_id(el);
    if names.is_empty() {
        return 0;
    }
    let mut weight = 0;
    if CONTENT_NAMES.iter().any(|n| names.contains(n)) {
        weight += CLASS_WEIGHT;
    }
    if BOILERPLATE_NAMES.iter().any(|n| names.contains(n)) {
        weight -= CLASS_WEIGHT;
    }
    weight
}

fn link_text_chars(el: &ElementRef<'_>) -> usize {
    el.select(&LINK_SEL)
        .filter(|a| !inside_boilerplate(a))
        .map(|a| a.text().map(|t| t.chars().count()).sum::<usize>())
        .sum()
}

fn inside_boilerplate(el: &ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|p| is_boilerplate(&p))
}

fn class_and_id(el: &ElementRef<'_>) -> String {
    let value = el.value();
    let mut names = String::new();
    if let Some(id) = value.id() {
        names.push_str(id);
    }
    for class in value.classes() {
        names.push(' ');
        names.push_str(class);
    }
    names.to_ascii_lowercase()
}

/// Whether an element is page chrome rather than content.
pub(crate) fn is_boilerplate(el: &ElementRef<'_>) -> bool {
    if BOILERPLATE_TAGS.contains(&el.value().name()) {
        return true;
    }
    // Semantic content containers are never chrome, whatever their classes say.
    if matches!(el.value().name(), "article" | "main" | "body") {
        return false;
    }
    let names = class_and_id(el);
    !names.is_empty() && BOILERPLATE_NAMES.iter().any(|n| names.contains(n))
}
