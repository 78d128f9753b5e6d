//! Article links on a blog listing page.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::text::normalize_text;

/// Containers that usually wrap one post on a listing, most specific first.
const ENTRY_SELECTORS: &[&str] = &[
    "article",
    ".blog-post",
    ".post",
    r#"[class*="post-"]"#,
    r#"[class*="article"]"#,
    ".card",
    r#"[class*="blog"]"#,
];

/// Title probes within one entry. The first text longer than this many
/// characters wins.
const TITLE_SELECTORS: &[&str] = &["h1", "h2", "h3", ".title", r#"[class*="title"]"#, "a"];
const MIN_TITLE_CHARS: usize = 10;

static ENTRY: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ENTRY_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
});

static TITLE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    TITLE_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
});

static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").expect("valid selector"));

/// One post advertised on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub title: String,
    /// Absolute post URL.
    pub url: String,
}

/// Up to `max` entries from the listing, taken from the end of the page.
///
/// Container selectors are probed in rank order. Probing stops once `max`
/// entries are found, and at most twice that many are gathered so that
/// duplicates can be dropped. Entries are deduplicated by URL, keeping page
/// order, and the final `max` of them are returned.
pub(crate) fn listing_entries(doc: &Html, base: &Url, max: usize) -> Vec<ListingEntry> {
    let cap = max.saturating_mul(2);
    let mut found: Vec<ListingEntry> = Vec::new();

    'probe: for selector in ENTRY.iter() {
        for el in doc.select(selector) {
            if found.len() >= cap {
                break 'probe;
            }
            if let Some(entry) = entry_from(el, base) {
                found.push(entry);
            }
        }
        if found.len() >= max {
            break;
        }
    }

    let mut unique: Vec<ListingEntry> = Vec::with_capacity(found.len());
    for entry in found {
        match unique.iter_mut().find(|e| e.url == entry.url) {
            Some(existing) => existing.title = entry.title,
            None => unique.push(entry),
        }
    }

    let skip = unique.len().saturating_sub(max);
    unique.split_off(skip)
}

fn entry_from(el: ElementRef<'_>, base: &Url) -> Option<ListingEntry> {
    let mut title = String::new();
    for selector in TITLE.iter() {
        title = el
            .select(selector)
            .next()
            .map(|t| normalize_text(&t.text().collect::<String>()))
            .unwrap_or_default();
        if title.chars().count() > MIN_TITLE_CHARS {
            break;
        }
    }

    let href = el.select(&LINK).next()?.value().attr("href")?.trim();
    if title.is_empty() || href.is_empty() {
        return None;
    }
    let url = base.join(href).ok()?;

    Some(ListingEntry {
        title,
        url: url.to_string(),
    })
}
