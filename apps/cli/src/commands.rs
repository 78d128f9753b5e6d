//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use enhancer_core::{Pipeline, ProgressReporter, RunOutcome, Stage, ingest_listing, ingest_url};
use enhancer_extractor::ContentExtractor;
use enhancer_shared::{
    AppConfig, Article, ArticleId, EnhancerError, StoreBackend, init_config, load_config,
    load_config_from,
};
use enhancer_storage::{ArticleStore, open_store};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Enhancer: rewrite stored articles using top-ranking content on the same topic.
#[derive(Parser)]
#[command(
    name = "enhancer",
    version,
    about = "Rewrite stored articles using top-ranking content on the same topic.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.enhancer/enhancer.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Article store backend, overriding the config file.
    #[arg(long, global = true)]
    pub store: Option<BackendArg>,

    /// Base URL of the article API (http backend).
    #[arg(long, env = "BACKEND_API_URL", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Article store backend.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum BackendArg {
    Sqlite,
    Http,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Enhance the latest original article and save the derived version.
    Enhance,

    /// Fetch a web page and store it as an original article.
    Ingest {
        /// Page URL, or a blog listing page with --listing.
        url: String,

        /// Treat the URL as a blog listing and store the posts it links to.
        #[arg(long)]
        listing: bool,

        /// Number of listing posts to store, overriding `ingest.listing_max`.
        #[arg(long, requires = "listing")]
        max: Option<usize>,
    },

    /// List all stored articles, newest first.
    List,

    /// Show one article with its references and derived versions.
    Show {
        /// Article ID.
        id: ArticleId,

        /// Print the article as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "enhancer=info",
        1 => "enhancer=debug",
        _ => "enhancer=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&resolve_config(&cli)?),
        },
        Command::Enhance => cmd_enhance(&resolve_config(&cli)?).await,
        Command::Ingest { url, listing, max } => {
            cmd_ingest(&resolve_config(&cli)?, url, *listing, *max).await
        }
        Command::List => cmd_list(&resolve_config(&cli)?).await,
        Command::Show { id, json } => cmd_show(&resolve_config(&cli)?, *id, *json).await,
    }
}

/// Load the config file, then apply command-line and environment overrides.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(backend) = cli.store {
        config.store.backend = match backend {
            BackendArg::Sqlite => StoreBackend::Sqlite,
            BackendArg::Http => StoreBackend::Http,
        };
    }
    if let Some(api_url) = &cli.api_url {
        config.store.api_base_url = api_url.clone();
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_enhance(config: &AppConfig) -> Result<()> {
    let pipeline = Pipeline::from_config(config).await?;
    let reporter = CliProgress::new();

    let outcome = match pipeline.run(&reporter).await {
        Ok(outcome) => outcome,
        Err(EnhancerError::TargetNotFound) => {
            reporter.clear();
            println!("Nothing to do: every article has already been enhanced.");
            return Ok(());
        }
        Err(e) => {
            reporter.clear();
            return Err(e.into());
        }
    };

    println!();
    println!("  Article enhanced successfully!");
    println!("  Run:        {}", outcome.run_id);
    println!(
        "  Original:   #{} {}",
        outcome.original.id, outcome.original.title
    );
    println!(
        "  Derived:    #{} {}",
        outcome.derived.id, outcome.derived.title
    );
    println!("  Search:     {}", outcome.search_provider);
    println!("  Generation: {}", outcome.enhancement_provider);
    println!("  References:");
    for reference in &outcome.references {
        println!("    - {} ({})", reference.title, reference.url);
    }
    println!("  Time:       {:.1}s", outcome.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_ingest(
    config: &AppConfig,
    url: &str,
    listing: bool,
    max: Option<usize>,
) -> Result<()> {
    Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;

    let store = open_store(&config.store).await?;
    let extractor = ContentExtractor::new(&config.extraction)?;

    if !listing {
        info!(url, "ingesting article");
        let article = ingest_url(store.as_ref(), &extractor, url).await?;
        println!("Stored article #{}: {}", article.id, article.title);
        return Ok(());
    }

    let mut ingest = config.ingest.clone();
    if let Some(max) = max {
        if max == 0 {
            return Err(eyre!("--max must be at least 1"));
        }
        ingest.listing_max = max;
    }

    info!(url, max = ingest.listing_max, "ingesting blog listing");
    let articles = ingest_listing(store.as_ref(), &extractor, url, &ingest).await?;
    if articles.is_empty() {
        println!("No posts found on {url}.");
        return Ok(());
    }
    for article in &articles {
        println!("Stored article #{}: {}", article.id, article.title);
    }
    println!("{} article(s) stored.", articles.len());
    Ok(())
}

async fn cmd_list(config: &AppConfig) -> Result<()> {
    let store = open_store(&config.store).await?;
    let articles = store.list().await?;

    if articles.is_empty() {
        println!("No articles stored yet.");
        return Ok(());
    }

    println!("{:>6}  {:<8}  {:>6}  TITLE", "ID", "KIND", "FROM");
    for article in &articles {
        let kind = if article.is_enhanced {
            "enhanced"
        } else {
            "original"
        };
        let origin = article
            .original_article_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{:>6}  {:<8}  {:>6}  {}",
            article.id, kind, origin, article.title
        );
    }
    Ok(())
}

async fn cmd_show(config: &AppConfig, id: ArticleId, json: bool) -> Result<()> {
    let store = open_store(&config.store).await?;
    let article = store
        .find_by_id(id)
        .await?
        .ok_or_else(|| eyre!("article {id} not found"))?;
    let versions = if article.is_enhanced {
        Vec::new()
    } else {
        store.versions_derived_from(id).await?
    };

    if json {
        let value = serde_json::json!({
            "article": article,
            "derived_versions": versions,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    print_article(&article);
    if !article.is_enhanced {
        println!();
        if versions.is_empty() {
            println!("No enhanced versions yet.");
        } else {
            println!("Enhanced versions:");
            for version in &versions {
                println!(
                    "  #{} {} ({})",
                    version.id,
                    version.title,
                    version.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
    }
    Ok(())
}

fn print_article(article: &Article) {
    println!("#{} {}", article.id, article.title);
    if let Some(author) = &article.author {
        println!("Author:    {author}");
    }
    if let Some(url) = &article.url {
        println!("URL:       {url}");
    }
    if let Some(date) = &article.published_date {
        println!("Published: {date}");
    }
    if let Some(origin) = article.original_article_id {
        println!("Derived from: #{origin}");
    }
    println!("Created:   {}", article.created_at.to_rfc3339());
    if let Some(links) = article.reference_links.as_ref().filter(|l| !l.is_empty()) {
        println!("References:");
        for (i, link) in links.iter().enumerate() {
            println!("  {}. {} ({})", i + 1, link.title, link.url);
        }
    }
    println!();
    println!("{}", article.content);
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: Stage) {
        self.spinner.set_message(stage.label());
    }

    fn done(&self, _outcome: &RunOutcome) {
        self.spinner.finish_and_clear();
    }
}
