//! Page metadata used when ingesting an article: title, byline, date, image.

use scraper::{Html, Selector};
use url::Url;

use crate::text::normalize_text;

/// Metadata scraped from a page head and body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PageMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_date: Option<String>,
    pub image_url: Option<String>,
}

/// Where a value is read from on a matched element.
enum Source {
    Text,
    Attr(&'static str),
}

const TITLE_PROBES: &[(&str, Source)] = &[
    ("h1", Source::Text),
    (r#"meta[property="og:title"]"#, Source::Attr("content")),
    ("title", Source::Text),
];

const AUTHOR_PROBES: &[(&str, Source)] = &[
    (r#"meta[name="author"]"#, Source::Attr("content")),
    (r#"meta[property="article:author"]"#, Source::Attr("content")),
    (".author", Source::Text),
    (".post-author", Source::Text),
    (r#"[rel="author"]"#, Source::Text),
    (r#"[class*="author"]"#, Source::Text),
    (".byline", Source::Text),
];

const DATE_PROBES: &[(&str, Source)] = &[
    (r#"meta[property="article:published_time"]"#, Source::Attr("content")),
    ("time[datetime]", Source::Attr("datetime")),
    ("time", Source::Text),
];

const IMAGE_PROBES: &[(&str, Source)] = &[
    (r#"meta[property="og:image"]"#, Source::Attr("content")),
    (".featured-image img", Source::Attr("src")),
    ("article img", Source::Attr("src")),
    (".post-image img", Source::Attr("src")),
];

pub(crate) fn page_metadata(doc: &Html, page_url: &Url) -> PageMetadata {
    PageMetadata {
        title: probe(doc, TITLE_PROBES),
        author: probe(doc, AUTHOR_PROBES),
        published_date: probe(doc, DATE_PROBES),
        image_url: probe(doc, IMAGE_PROBES)
            .and_then(|src| page_url.join(&src).ok())
            .map(|u| u.to_string()),
    }
}

/// First non-empty value across `probes`, in order.
fn probe(doc: &Html, probes: &[(&str, Source)]) -> Option<String> {
    probes.iter().find_map(|(raw, source)| {
        let selector = Selector::parse(raw).ok()?;
        let el = doc.select(&selector).next()?;
        let value = match source {
            Source::Text => normalize_text(&el.text().collect::<Vec<_>>().join(" ")),
            Source::Attr(name) => el.value().attr(name)?.trim().to_string(),
        };
        (!value.is_empty()).then_some(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://blog.example/posts/chatbots").unwrap()
    }

    #[test]
    fn reads_head_and_body_metadata() {
        let html = r#"<html><head>
            <title>Chatbots | Example Blog</title>
            <meta name="author" content="Dana Writer">
            <meta property="article:published_time" content="2024-03-01T09:00:00Z">
            <meta property="og:image" content="/img/cover.png">
        </head><body><h1> Why   chatbots matter </h1></body></html>"#;
        let meta = page_metadata(&Html::parse_document(html), &url());
        assert_eq!(meta.title.as_deref(), Some("Why chatbots matter"));
        assert_eq!(meta.author.as_deref(), Some("Dana Writer"));
        assert_eq!(meta.published_date.as_deref(), Some("2024-03-01T09:00:00Z"));
        assert_eq!(
            meta.image_url.as_deref(),
            Some("https://blog.example/img/cover.png")
        );
    }

    #[test]
    fn title_falls_back_to_head() {
        let html = r#"<html><head><title>Only Title</title></head><body><p>x</p></body></html>"#;
        let meta = page_metadata(&Html::parse_document(html), &url());
        assert_eq!(meta.title.as_deref(), Some("Only Title"));
        assert!(meta.author.is_none());
        assert!(meta.image_url.is_none());
    }

    #[test]
    fn byline_and_time_element() {
        let html = r#"<body><article>
            <span class="byline">By Sam</span>
            <time datetime="2024-04-02">April 2</time>
            <img src="hero.jpg">
        </article></body>"#;
        let meta = page_metadata(&Html::parse_document(html), &url());
        assert_eq!(meta.author.as_deref(), Some("By Sam"));
        assert_eq!(meta.published_date.as_deref(), Some("2024-04-02"));
        assert_eq!(
            meta.image_url.as_deref(),
            Some("https://blog.example/posts/hero.jpg")
        );
    }
}
