//! End-to-end enhancement run: latest original → search → references →
//! rewrite → derived article.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use enhancer_extractor::ContentExtractor;
use enhancer_generation::EnhancementChain;
use enhancer_search::SearchChain;
use enhancer_shared::{
    AppConfig, Article, EnhancerError, NewArticle, ReferenceDocument, Result, SelectionPolicy,
};
use enhancer_storage::{ArticleStore, open_store};

use crate::references::ReferenceCollector;

// ---------------------------------------------------------------------------
// Stages and progress
// ---------------------------------------------------------------------------

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchTarget,
    Search,
    Collect,
    Enhance,
    Assemble,
    Persist,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchTarget => "fetch-target",
            Self::Search => "search",
            Self::Collect => "collect",
            Self::Enhance => "enhance",
            Self::Assemble => "assemble",
            Self::Persist => "persist",
            Self::Done => "done",
        }
    }

    /// Human-readable label for progress displays.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FetchTarget => "Fetching latest article",
            Self::Search => "Searching for related content",
            Self::Collect => "Extracting reference articles",
            Self::Enhance => "Generating enhanced article",
            Self::Assemble => "Assembling derived article",
            Self::Persist => "Saving derived article",
            Self::Done => "Done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a stage.
    fn stage(&self, stage: Stage);
    /// Called once the derived article is persisted.
    fn done(&self, outcome: &RunOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: Stage) {}
    fn done(&self, _outcome: &RunOutcome) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run-level knobs taken from `[pipeline]`, `[references]`, and `[store]`.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub policy: SelectionPolicy,
    pub reference_limit: usize,
    pub store_timeout: Duration,
    pub author_label: String,
    pub title_prefix: String,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            policy: config.pipeline.rederive,
            reference_limit: config.references.limit,
            store_timeout: Duration::from_secs(config.store.timeout_secs),
            author_label: config.pipeline.author_label.clone(),
            title_prefix: config.pipeline.title_prefix.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Result of one successful run.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub original: Article,
    pub derived: Article,
    pub references: Vec<ReferenceDocument>,
    pub search_provider: String,
    pub enhancement_provider: String,
    pub elapsed: Duration,
}

/// The wired-up enhancement pipeline.
pub struct Pipeline {
    store: Arc<dyn ArticleStore>,
    search: SearchChain,
    collector: ReferenceCollector,
    enhancer: EnhancementChain,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        search: SearchChain,
        collector: ReferenceCollector,
        enhancer: EnhancementChain,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            search,
            collector,
            enhancer,
            settings,
        }
    }

    /// Open the configured store and build every provider chain.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let store = open_store(&config.store).await?;
        Self::with_store(config, store)
    }

    /// Build the provider chains around an already-open store.
    pub fn with_store(config: &AppConfig, store: Arc<dyn ArticleStore>) -> Result<Self> {
        let extractor = Arc::new(ContentExtractor::new(&config.extraction)?);
        let search = SearchChain::from_config(&config.search)?;
        let enhancer = EnhancementChain::from_config(&config.llm)?;

        info!(
            search = ?search.provider_names(),
            generation = ?enhancer.provider_names(),
            "providers configured"
        );

        Ok(Self::new(
            store,
            search,
            ReferenceCollector::new(extractor, &config.references),
            enhancer,
            PipelineSettings::from_config(config),
        ))
    }

    /// Enhance the latest eligible original and persist the derived article.
    ///
    /// Returns [`EnhancerError::TargetNotFound`] when there is nothing to do.
    /// Nothing is written unless the final create succeeds.
    pub async fn run(&self, progress: &dyn ProgressReporter) -> Result<RunOutcome> {
        let run_id = Uuid::now_v7();
        let span = info_span!("enhance_run", %run_id);
        self.run_stages(run_id, progress).instrument(span).await
    }

    async fn run_stages(
        &self,
        run_id: Uuid,
        progress: &dyn ProgressReporter,
    ) -> Result<RunOutcome> {
        let start = Instant::now();

        progress.stage(Stage::FetchTarget);
        let original = self.fetch_target().await?;
        info!(article_id = %original.id, title = %original.title, "selected article");

        progress.stage(Stage::Search);
        let search = self.search.search(&original.title).await;

        progress.stage(Stage::Collect);
        let references = self
            .collector
            .collect(&search.results, self.settings.reference_limit)
            .await;

        progress.stage(Stage::Enhance);
        let enhancement = self
            .enhancer
            .enhance(&original, &references)
            .await
            .map_err(|e| EnhancerError::aborted(Stage::Enhance.as_str(), e.to_string()))?;

        progress.stage(Stage::Assemble);
        let draft = self.assemble(&original, &references, enhancement.content);

        progress.stage(Stage::Persist);
        let derived = self.store.create(draft).await.map_err(|e| {
            warn!(stage = %Stage::Persist, error = %e, "failed to save derived article");
            EnhancerError::Persistence(e.to_string())
        })?;

        progress.stage(Stage::Done);
        let outcome = RunOutcome {
            run_id,
            original,
            derived,
            references,
            search_provider: search.provider,
            enhancement_provider: enhancement.provider,
            elapsed: start.elapsed(),
        };
        info!(
            derived_id = %outcome.derived.id,
            search = %outcome.search_provider,
            generation = %outcome.enhancement_provider,
            references = outcome.references.len(),
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "enhancement run complete"
        );
        progress.done(&outcome);
        Ok(outcome)
    }

    async fn fetch_target(&self) -> Result<Article> {
        let stage = Stage::FetchTarget;
        let lookup = self.store.latest_unenhanced(self.settings.policy);

        match tokio::time::timeout(self.settings.store_timeout, lookup).await {
            Ok(Ok(Some(article))) => Ok(article),
            Ok(Ok(None)) => Err(EnhancerError::TargetNotFound),
            Ok(Err(e)) => {
                warn!(%stage, error = %e, "article store unavailable");
                Err(EnhancerError::aborted(stage.as_str(), e.to_string()))
            }
            Err(_) => {
                warn!(%stage, timeout = ?self.settings.store_timeout, "article store timed out");
                Err(EnhancerError::aborted(
                    stage.as_str(),
                    format!(
                        "store did not answer within {}s",
                        self.settings.store_timeout.as_secs_f32()
                    ),
                ))
            }
        }
    }

    fn assemble(
        &self,
        original: &Article,
        references: &[ReferenceDocument],
        content: String,
    ) -> NewArticle {
        NewArticle {
            title: format!("{}{}", self.settings.title_prefix, original.title),
            content,
            author: Some(self.settings.author_label.clone()),
            url: original.url.clone(),
            published_date: original.published_date.clone(),
            image_url: original.image_url.clone(),
            is_enhanced: true,
            original_article_id: Some(original.id),
            reference_links: Some(references.iter().map(ReferenceDocument::to_link).collect()),
        }
    }
}
