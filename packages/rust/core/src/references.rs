//! Turning search results into reference documents.

use std::sync::Arc;
use std::time::Duration;

use enhancer_extractor::PageExtractor;
use enhancer_shared::{ReferenceDocument, ReferencesConfig, SearchResult, truncate_chars};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Extracts competing pages, sequentially and with a fixed delay between them.
pub struct ReferenceCollector {
    extractor: Arc<dyn PageExtractor>,
    publishing_domain: String,
    min_content_chars: usize,
    max_content_chars: usize,
    pacing: Duration,
}

impl ReferenceCollector {
    pub fn new(extractor: Arc<dyn PageExtractor>, config: &ReferencesConfig) -> Self {
        Self {
            extractor,
            publishing_domain: config.publishing_domain.trim().to_ascii_lowercase(),
            min_content_chars: config.min_content_chars,
            max_content_chars: config.max_content_chars,
            pacing: Duration::from_millis(config.pacing_ms),
        }
    }

    /// Collect up to `limit` reference documents from `candidates`.
    ///
    /// Always returns at least one document. Links on the publishing domain
    /// are never used. A failed extraction yields a placeholder for that
    /// candidate; a page with too little text is skipped.
    #[instrument(skip_all, fields(candidates = candidates.len(), limit = limit))]
    pub async fn collect(&self, candidates: &[SearchResult], limit: usize) -> Vec<ReferenceDocument> {
        let selected: Vec<&SearchResult> = candidates
            .iter()
            .filter(|c| self.is_eligible(&c.link))
            .take(limit)
            .collect();

        let mut documents = Vec::with_capacity(selected.len());
        for (i, candidate) in selected.into_iter().enumerate() {
            if i > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            match self.extractor.extract(&candidate.link).await {
                Ok(text) if text.chars().count() > self.min_content_chars => {
                    debug!(url = %candidate.link, chars = text.len(), "reference extracted");
                    documents.push(ReferenceDocument {
                        title: candidate.title.clone(),
                        url: candidate.link.clone(),
                        content: truncate_chars(&text, self.max_content_chars).to_string(),
                    });
                }
                Ok(_) => {
                    debug!(url = %candidate.link, "reference too short, skipped");
                }
                Err(e) => {
                    warn!(url = %candidate.link, error = %e, "reference extraction failed, using placeholder");
                    documents.push(placeholder_for(candidate, self.max_content_chars));
                }
            }
        }

        if documents.is_empty() {
            warn!("no usable references, using a synthetic one");
            documents.push(synthetic_reference(self.max_content_chars));
        }

        info!(count = documents.len(), "references collected");
        documents
    }

    /// A parsable link that is not hosted on the publishing domain.
    fn is_eligible(&self, link: &str) -> bool {
        let Some(host) = Url::parse(link)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        else {
            debug!(%link, "unparsable candidate link dropped");
            return false;
        };

        let domain = self.publishing_domain.as_str();
        let own = !domain.is_empty()
            && (host == domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|prefix| prefix.ends_with('.')));
        if own {
            debug!(%link, "self-citation dropped");
        }
        !own
    }
}

fn placeholder_for(candidate: &SearchResult, max_chars: usize) -> ReferenceDocument {
    let content = format!(
        "This is sample content from {}. The article discusses relevant topics and provides insights on the subject matter.",
        candidate.title
    );
    ReferenceDocument {
        title: candidate.title.clone(),
        url: candidate.link.clone(),
        content: truncate_chars(&content, max_chars).to_string(),
    }
}

fn synthetic_reference(max_chars: usize) -> ReferenceDocument {
    ReferenceDocument {
        title: "Reference Article".into(),
        url: "https://example.com".into(),
        content: truncate_chars("Sample reference content for enhancement.", max_chars).to_string(),
    }
}
