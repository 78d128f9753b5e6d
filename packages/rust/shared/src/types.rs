//! Core domain types for articles and their enhancement lineage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ArticleId
// ---------------------------------------------------------------------------

/// Store-assigned article identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(pub i64);

impl std::fmt::Display for ArticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ArticleId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

// ---------------------------------------------------------------------------
// Article
// ---------------------------------------------------------------------------

/// A `{title, url}` pair describing a source used during enhancement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceLink {
    pub title: String,
    pub url: String,
}

/// A persisted article, either an original or a derived (enhanced) version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// True only for pipeline-produced articles.
    pub is_enhanced: bool,
    /// Source article this one was derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_article_id: Option<ArticleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_links: Option<Vec<ReferenceLink>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Title of the source article, filled by listing queries only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
}

impl Article {
    /// Whether this article has both a non-blank title and content.
    pub fn is_well_formed(&self) -> bool {
        !self.title.trim().is_empty() && !self.content.trim().is_empty()
    }
}

/// Payload for creating an article. The store assigns id and timestamps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_enhanced: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_article_id: Option<ArticleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_links: Option<Vec<ReferenceLink>>,
}

impl NewArticle {
    /// Check the invariants every store enforces before writing.
    ///
    /// Lineage existence is checked by the store itself, since only it can
    /// see other rows.
    pub fn validate(&self) -> crate::Result<()> {
        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err(crate::EnhancerError::validation(
                "title and content are required",
            ));
        }
        if self.is_enhanced && self.original_article_id.is_none() {
            return Err(crate::EnhancerError::validation(
                "an enhanced article must reference its original",
            ));
        }
        if !self.is_enhanced
            && self
                .reference_links
                .as_ref()
                .is_some_and(|links| !links.is_empty())
        {
            return Err(crate::EnhancerError::validation(
                "an original article cannot carry reference links",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Transient pipeline types
// ---------------------------------------------------------------------------

/// One ranked hit from a search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// Extracted content of a competing page, used as generative input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDocument {
    pub title: String,
    pub url: String,
    /// Length-capped body text.
    pub content: String,
}

impl ReferenceDocument {
    /// The persisted summary of this document.
    pub fn to_link(&self) -> ReferenceLink {
        ReferenceLink {
            title: self.title.clone(),
            url: self.url.clone(),
        }
    }
}

/// How "latest unenhanced" treats originals that already have a derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionPolicy {
    /// Skip any article already referenced by some `original_article_id`.
    #[default]
    ExcludeDerived,
    /// Select purely by the `is_enhanced` flag; the same original may be
    /// selected on every run.
    AllowRepeat,
}

/// Truncate `text` to at most `max_chars` characters (not bytes).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Characters `start..end` of `text`, clamped to its length.
pub fn slice_chars(text: &str, start: usize, end: usize) -> &str {
    let from = text
        .char_indices()
        .nth(start)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let to = text
        .char_indices()
        .nth(end)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    if from >= to { "" } else { &text[from..to] }
}
