//! Client for the article REST API.
//!
//! Endpoints: `GET /api/articles`, `GET /api/articles/latest`,
//! `GET /api/articles/:id` and `POST /api/articles`. Every response is wrapped
//! in a `{success, data, message}` envelope. The wire format calls the
//! enhanced flag `is_updated`.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use enhancer_shared::{
    Article, ArticleId, EnhancerError, NewArticle, ReferenceLink, Result, SelectionPolicy,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ArticleStore, parse_timestamp};

const USER_AGENT: &str = concat!("enhancer/", env!("CARGO_PKG_VERSION"));

/// [`ArticleStore`] backed by the remote article API.
pub struct HttpArticleStore {
    client: Client,
    base_url: String,
}

impl HttpArticleStore {
    /// Build a store for `base_url` (e.g. `http://localhost:3000`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| EnhancerError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/articles{path}", self.base_url)
    }

    /// GET an enveloped payload. A 404 yields `None`.
    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        let url = self.endpoint(path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EnhancerError::Network(format!("{url}: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(%url, "article API returned 404");
            return Ok(None);
        }
        read_envelope(&url, response).await.map(Some)
    }
}

#[async_trait]
impl ArticleStore for HttpArticleStore {
    async fn latest_unenhanced(&self, policy: SelectionPolicy) -> Result<Option<Article>> {
        match policy {
            SelectionPolicy::AllowRepeat => {
                let wire: Option<WireArticle> = self.get_data("/latest").await?;
                wire.map(WireArticle::into_article).transpose()
            }
            // The API has no exclusion filter, so derive it from the full listing.
            SelectionPolicy::ExcludeDerived => {
                let all = self.list().await?;
                Ok(select_unenhanced(all))
            }
        }
    }

    async fn create(&self, article: NewArticle) -> Result<Article> {
        article.validate()?;
        if let Some(origin) = article.original_article_id {
            if self.find_by_id(origin).await?.is_none() {
                return Err(EnhancerError::validation(format!(
                    "original article {origin} does not exist"
                )));
            }
        }

        let url = self.endpoint("");
        let body = WireNewArticle::from(&article);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EnhancerError::Network(format!("{url}: {e}")))?;

        let wire: WireArticle = read_envelope(&url, response).await?;
        wire.into_article()
    }

    async fn find_by_id(&self, id: ArticleId) -> Result<Option<Article>> {
        let wire: Option<WireArticle> = self.get_data(&format!("/{id}")).await?;
        wire.map(WireArticle::into_article).transpose()
    }

    async fn versions_derived_from(&self, id: ArticleId) -> Result<Vec<Article>> {
        let wire: Option<WireArticle> = self.get_data(&format!("/{id}")).await?;
        let versions = wire.and_then(|w| w.updated_versions).unwrap_or_default();
        versions.into_iter().map(WireArticle::into_article).collect()
    }

    async fn list(&self) -> Result<Vec<Article>> {
        let wire: Option<Vec<WireArticle>> = self.get_data("").await?;
        wire.unwrap_or_default()
            .into_iter()
            .map(WireArticle::into_article)
            .collect()
    }
}

/// Newest original not referenced by any derived article. `articles` must be
/// newest first.
fn select_unenhanced(articles: Vec<Article>) -> Option<Article> {
    let derived_from: HashSet<ArticleId> = articles
        .iter()
        .filter_map(|a| a.original_article_id)
        .collect();
    articles
        .into_iter()
        .find(|a| !a.is_enhanced && !derived_from.contains(&a.id))
}

async fn read_envelope<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let envelope: Envelope<T> = response
        .json()
        .await
        .map_err(|e| EnhancerError::parse(format!("{url}: invalid response body: {e}")))?;

    if !status.is_success() || !envelope.success {
        let detail = envelope
            .error
            .or(envelope.message)
            .unwrap_or_else(|| "request failed".into());
        return Err(EnhancerError::Storage(format!("{url}: HTTP {status}: {detail}")));
    }

    envelope
        .data
        .ok_or_else(|| EnhancerError::parse(format!("{url}: response has no data")))
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireArticle {
    id: i64,
    title: String,
    content: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    published_date: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default, deserialize_with = "bool_or_int")]
    is_updated: bool,
    #[serde(default)]
    original_article_id: Option<i64>,
    #[serde(default)]
    reference_links: Option<Vec<ReferenceLink>>,
    created_at: String,
    updated_at: String,
    #[serde(default)]
    original_title: Option<String>,
    #[serde(default)]
    updated_versions: Option<Vec<WireArticle>>,
}

impl WireArticle {
    fn into_article(self) -> Result<Article> {
        Ok(Article {
            id: ArticleId(self.id),
            title: self.title,
            content: self.content,
            author: self.author,
            url: self.url,
            published_date: self.published_date,
            image_url: self.image_url,
            is_enhanced: self.is_updated,
            original_article_id: self.original_article_id.map(ArticleId),
            reference_links: self.reference_links,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            original_title: self.original_title,
        })
    }
}

#[derive(Debug, Serialize)]
struct WireNewArticle<'a> {
    title: &'a str,
    content: &'a str,
    author: Option<&'a str>,
    url: Option<&'a str>,
    published_date: Option<&'a str>,
    image_url: Option<&'a str>,
    is_updated: bool,
    original_article_id: Option<i64>,
    reference_links: Option<&'a [ReferenceLink]>,
}

impl<'a> From<&'a NewArticle> for WireNewArticle<'a> {
    fn from(article: &'a NewArticle) -> Self {
        Self {
            title: &article.title,
            content: &article.content,
            author: article.author.as_deref(),
            url: article.url.as_deref(),
            published_date: article.published_date.as_deref(),
            image_url: article.image_url.as_deref(),
            is_updated: article.is_enhanced,
            original_article_id: article.original_article_id.map(|id| id.0),
            reference_links: article.reference_links.as_deref(),
        }
    }
}

/// SQLite-backed APIs sometimes leak `0`/`1` for booleans.
fn bool_or_int<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}
