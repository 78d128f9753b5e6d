//! Storing fetched web pages as original articles.

use std::time::Duration;

use enhancer_extractor::{ContentExtractor, ListingEntry};
use enhancer_shared::{Article, EnhancerError, IngestConfig, NewArticle, Result};
use enhancer_storage::ArticleStore;
use tracing::{info, instrument, warn};

const UNEXTRACTED_CONTENT: &str = "Content could not be extracted. Visit the original URL.";
const UNSCRAPED_CONTENT: &str = "Content could not be scraped. Please visit the original URL.";

/// Fetch `url` and store its main text as a new, unenhanced article.
///
/// Fails with a validation error when the page has no title or no text.
#[instrument(skip_all, fields(url = %url))]
pub async fn ingest_url(
    store: &dyn ArticleStore,
    extractor: &ContentExtractor,
    url: &str,
) -> Result<Article> {
    let page = extractor.fetch_page(url).await?;

    let title = page
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| EnhancerError::validation(format!("no title found at {url}")))?;
    if page.text.trim().is_empty() {
        return Err(EnhancerError::validation(format!("no article text found at {url}")));
    }

    let article = store
        .create(NewArticle {
            title,
            content: page.text,
            author: page.author,
            url: Some(page.url),
            published_date: page.published_date,
            image_url: page.image_url,
            ..Default::default()
        })
        .await?;

    info!(article_id = %article.id, title = %article.title, "article ingested");
    Ok(article)
}

/// Store the last `config.listing_max` posts linked from a blog listing page.
///
/// Posts are fetched one at a time, `config.pacing_ms` apart. A post that
/// cannot be fetched is still stored with its listing title and a notice in
/// place of the body. Only a failure to fetch the listing itself, or to write
/// to the store, is an error.
#[instrument(skip_all, fields(listing = %listing_url, max = config.listing_max))]
pub async fn ingest_listing(
    store: &dyn ArticleStore,
    extractor: &ContentExtractor,
    listing_url: &str,
    config: &IngestConfig,
) -> Result<Vec<Article>> {
    let entries = extractor
        .fetch_listing(listing_url, config.listing_max)
        .await?;
    info!(count = entries.len(), "listing entries selected");

    let pacing = Duration::from_millis(config.pacing_ms);
    let mut stored = Vec::with_capacity(entries.len());
    for (i, entry) in entries.into_iter().enumerate() {
        if i > 0 && !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }

        let article = listing_article(extractor, entry, &config.default_author).await;
        let article = store.create(article).await?;
        info!(article_id = %article.id, title = %article.title, "listing article stored");
        stored.push(article);
    }

    Ok(stored)
}

async fn listing_article(
    extractor: &ContentExtractor,
    entry: ListingEntry,
    default_author: &str,
) -> NewArticle {
    match extractor.fetch_page(&entry.url).await {
        Ok(page) => NewArticle {
            title: entry.title,
            content: if page.text.trim().is_empty() {
                UNEXTRACTED_CONTENT.into()
            } else {
                page.text
            },
            author: Some(page.author.unwrap_or_else(|| default_author.to_string())),
            url: Some(entry.url),
            published_date: page.published_date,
            image_url: page.image_url,
            ..Default::default()
        },
        Err(e) => {
            warn!(url = %entry.url, error = %e, "post fetch failed, storing a stub");
            NewArticle {
                title: entry.title,
                content: UNSCRAPED_CONTENT.into(),
                author: Some(default_author.to_string()),
                url: Some(entry.url),
                ..Default::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enhancer_shared::ExtractionConfig;
    use enhancer_storage::Storage;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn temp_store() -> Storage {
        let tmp = std::env::temp_dir().join(format!("enhancer_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn extractor() -> ContentExtractor {
        ContentExtractor::new(&ExtractionConfig::default())
            .expect("extractor")
            .allow_private_hosts()
    }

    #[tokio::test]
    async fn stores_page_as_original() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blogs/chatbots"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><head>
                    <meta property="og:image" content="/img/cover.png">
                    <meta property="article:published_time" content="2024-11-05">
                </head><body><article>
                    <h1>Chatbots for small teams</h1>
                    <p class="author">By Jordan</p>
                    <p>Small support teams get the most out of a chatbot when it handles the repetitive questions.</p>
                </article></body></html>"#,
            ))
            .mount(&server)
            .await;

        let store = temp_store().await;
        let url = format!("{}/blogs/chatbots", server.uri());
        let article = ingest_url(&store, &extractor(), &url).await.expect("ingest");

        assert_eq!(article.title, "Chatbots for small teams");
        assert!(!article.is_enhanced);
        assert!(article.original_article_id.is_none());
        assert!(article.content.contains("repetitive questions"));
        assert_eq!(article.url.as_deref(), Some(url.as_str()));
        assert_eq!(article.published_date.as_deref(), Some("2024-11-05"));
        assert_eq!(
            article.image_url,
            Some(format!("{}/img/cover.png", server.uri()))
        );
    }

    #[tokio::test]
    async fn listing_stores_the_last_posts_with_fallbacks() {
        let server = MockServer::start().await;
        let listing = r#"<html><body>
            <article><h2>Newest post about live chat</h2><a href="/blogs/newest">Read</a></article>
            <article><h2>Chatbots for small teams</h2><a href="/blogs/chatbots">Read</a></article>
            <article><h2>Chatbots for small teams</h2><a href="/blogs/chatbots">Read</a></article>
            <article><h2>An empty page on the blog</h2><a href="/blogs/empty">Read</a></article>
            <article><h2>Oldest post that went missing</h2><a href="/blogs/gone">Read</a></article>
        </body></html>"#;
        Mock::given(method("GET"))
            .and(path("/blogs/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/blogs/chatbots"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body><article>
                    <h1>Chatbots for small teams (full title)</h1>
                    <p class="author">By Jordan</p>
                    <p>Small support teams get the most out of a chatbot when it handles the repetitive questions.</p>
                </article></body></html>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/blogs/empty"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/blogs/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = temp_store().await;
        let config = IngestConfig {
            listing_max: 3,
            pacing_ms: 0,
            ..Default::default()
        };
        let stored = ingest_listing(&store, &extractor(), &format!("{}/blogs/", server.uri()), &config)
            .await
            .expect("ingest listing");

        let titles: Vec<&str> = stored.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Chatbots for small teams",
                "An empty page on the blog",
                "Oldest post that went missing",
            ]
        );

        let full = &stored[0];
        assert!(full.content.contains("repetitive questions"));
        assert_eq!(full.author.as_deref(), Some("By Jordan"));
        assert_eq!(full.url, Some(format!("{}/blogs/chatbots", server.uri())));

        assert_eq!(stored[1].content, UNEXTRACTED_CONTENT);
        assert_eq!(stored[1].author.as_deref(), Some("BeyondChats"));

        assert_eq!(stored[2].content, UNSCRAPED_CONTENT);
        assert_eq!(stored[2].author.as_deref(), Some("BeyondChats"));
        assert!(stored.iter().all(|a| !a.is_enhanced));
        assert_eq!(store.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unreachable_listing_stores_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blogs/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let store = temp_store().await;
        let err = ingest_listing(
            &store,
            &extractor(),
            &format!("{}/blogs/", server.uri()),
            &IngestConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EnhancerError::Extraction { .. }));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn page_without_title_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/untitled"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><p>Just some text.</p></body></html>"),
            )
            .mount(&server)
            .await;

        let store = temp_store().await;
        let err = ingest_url(&store, &extractor(), &format!("{}/untitled", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, EnhancerError::Validation { .. }));
        assert!(store.list().await.unwrap().is_empty());
    }
}
