//! Article persistence with lineage queries.
//!
//! [`ArticleStore`] is the seam the pipeline depends on. Two implementations
//! ship here:
//! - [`Storage`]: embedded libSQL database (default)
//! - [`HttpArticleStore`]: client for the article REST API

mod http;
mod migrations;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use enhancer_shared::{
    Article, ArticleId, EnhancerError, NewArticle, ReferenceLink, Result, SelectionPolicy,
    StoreBackend, StoreConfig, expand_home,
};
use libsql::{Connection, Database, params};

pub use http::HttpArticleStore;

/// CRUD persistence for articles plus the lineage queries the pipeline needs.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Most recent original eligible for enhancement under `policy`.
    async fn latest_unenhanced(&self, policy: SelectionPolicy) -> Result<Option<Article>>;

    /// Validate and insert an article, returning it with id and timestamps.
    async fn create(&self, article: NewArticle) -> Result<Article>;

    async fn find_by_id(&self, id: ArticleId) -> Result<Option<Article>>;

    /// Articles whose `original_article_id` is `id`, newest first.
    async fn versions_derived_from(&self, id: ArticleId) -> Result<Vec<Article>>;

    /// All articles, newest first, with `original_title` filled in.
    async fn list(&self) -> Result<Vec<Article>>;
}

/// Open the store selected by `config.backend`.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn ArticleStore>> {
    match config.backend {
        StoreBackend::Sqlite => {
            let path = expand_home(&config.database_path);
            Ok(Arc::new(Storage::open(&path).await?))
        }
        StoreBackend::Http => Ok(Arc::new(HttpArticleStore::new(
            &config.api_base_url,
            Duration::from_secs(config.timeout_secs),
        )?)),
    }
}

/// Columns shared by every article query; `a` is the article, `o` its origin.
const ARTICLE_COLUMNS: &str = "a.id, a.title, a.content, a.author, a.url, a.published_date, \
     a.image_url, a.is_enhanced, a.original_article_id, a.reference_links, a.created_at, \
     a.updated_at, o.title";

const ARTICLE_FROM: &str = "FROM articles a LEFT JOIN articles o ON o.id = a.original_article_id";

/// Embedded libSQL article store.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Open or create a database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| EnhancerError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    EnhancerError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    async fn query_articles(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<Article>> {
        let mut rows = self.conn.query(sql, params).await.map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(row_to_article(&row)?);
        }
        Ok(results)
    }
}

#[async_trait]
impl ArticleStore for Storage {
    async fn latest_unenhanced(&self, policy: SelectionPolicy) -> Result<Option<Article>> {
        let exclusion = match policy {
            SelectionPolicy::ExcludeDerived => {
                "AND NOT EXISTS (SELECT 1 FROM articles d WHERE d.original_article_id = a.id)"
            }
            SelectionPolicy::AllowRepeat => "",
        };
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} {ARTICLE_FROM}
             WHERE a.is_enhanced = 0 {exclusion}
             ORDER BY a.created_at DESC, a.id DESC
             LIMIT 1"
        );
        Ok(self.query_articles(&sql, params![]).await?.into_iter().next())
    }

    async fn create(&self, article: NewArticle) -> Result<Article> {
        article.validate()?;

        let references_json = match &article.reference_links {
            Some(links) => Some(
                serde_json::to_string(links)
                    .map_err(|e| EnhancerError::Storage(format!("encode reference links: {e}")))?,
            ),
            None => None,
        };
        let now = now_timestamp();

        let tx = self.conn.transaction().await.map_err(storage_err)?;

        if let Some(origin) = article.original_article_id {
            let mut rows = tx
                .query("SELECT 1 FROM articles WHERE id = ?1", params![origin.0])
                .await
                .map_err(storage_err)?;
            let exists = rows.next().await.map_err(storage_err)?.is_some();
            drop(rows);
            if !exists {
                tx.rollback().await.map_err(storage_err)?;
                return Err(EnhancerError::validation(format!(
                    "original article {origin} does not exist"
                )));
            }
        }

        tx.execute(
            "INSERT INTO articles (title, content, author, url, published_date, image_url,
                                   is_enhanced, original_article_id, reference_links,
                                   created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                article.title.as_str(),
                article.content.as_str(),
                article.author.as_deref(),
                article.url.as_deref(),
                article.published_date.as_deref(),
                article.image_url.as_deref(),
                i64::from(article.is_enhanced),
                article.original_article_id.map(|id| id.0),
                references_json,
                now.as_str(),
                now.as_str(),
            ],
        )
        .await
        .map_err(storage_err)?;
        let id = ArticleId(tx.last_insert_rowid());
        tx.commit().await.map_err(storage_err)?;

        tracing::debug!(%id, is_enhanced = article.is_enhanced, "article created");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| EnhancerError::Storage(format!("article {id} missing after insert")))
    }

    async fn find_by_id(&self, id: ArticleId) -> Result<Option<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} {ARTICLE_FROM} WHERE a.id = ?1");
        Ok(self.query_articles(&sql, params![id.0]).await?.into_iter().next())
    }

    async fn versions_derived_from(&self, id: ArticleId) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} {ARTICLE_FROM}
             WHERE a.original_article_id = ?1
             ORDER BY a.created_at DESC, a.id DESC"
        );
        self.query_articles(&sql, params![id.0]).await
    }

    async fn list(&self) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} {ARTICLE_FROM} ORDER BY a.created_at DESC, a.id DESC"
        );
        self.query_articles(&sql, params![]).await
    }
}

fn storage_err(e: libsql::Error) -> EnhancerError {
    EnhancerError::Storage(e.to_string())
}

/// Fixed-width UTC timestamp so lexical order matches time order.
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse RFC 3339 or SQLite `CURRENT_TIMESTAMP` (`YYYY-MM-DD HH:MM:SS`, UTC).
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| EnhancerError::parse(format!("invalid timestamp '{value}': {e}")))
}

/// Convert a database row to an [`Article`].
fn row_to_article(row: &libsql::Row) -> Result<Article> {
    let reference_links = match row.get::<String>(9).ok() {
        Some(json) => Some(
            serde_json::from_str::<Vec<ReferenceLink>>(&json)
                .map_err(|e| EnhancerError::Storage(format!("invalid reference_links: {e}")))?,
        ),
        None => None,
    };

    Ok(Article {
        id: ArticleId(row.get::<i64>(0).map_err(storage_err)?),
        title: row.get::<String>(1).map_err(storage_err)?,
        content: row.get::<String>(2).map_err(storage_err)?,
        author: row.get::<String>(3).ok(),
        url: row.get::<String>(4).ok(),
        published_date: row.get::<String>(5).ok(),
        image_url: row.get::<String>(6).ok(),
        is_enhanced: row.get::<i64>(7).map_err(storage_err)? != 0,
        original_article_id: row.get::<i64>(8).ok().map(ArticleId),
        reference_links,
        created_at: parse_timestamp(&row.get::<String>(10).map_err(storage_err)?)?,
        updated_at: parse_timestamp(&row.get::<String>(11).map_err(storage_err)?)?,
        original_title: row.get::<String>(12).ok(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("enhancer_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn original(title: &str) -> NewArticle {
        NewArticle {
            title: title.into(),
            content: format!("Body of {title}"),
            author: Some("Staff".into()),
            url: Some(format!("https://blog.example/{}", title.to_lowercase())),
            ..Default::default()
        }
    }

    fn derived_from(origin: &Article) -> NewArticle {
        NewArticle {
            title: format!("Enhanced: {}", origin.title),
            content: "Rewritten".into(),
            author: Some("AI Enhanced".into()),
            is_enhanced: true,
            original_article_id: Some(origin.id),
            reference_links: Some(vec![ReferenceLink {
                title: "Competitor".into(),
                url: "https://other.example/post".into(),
            }]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("enhancer_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn create_and_find() {
        let storage = test_storage().await;
        let created = storage.create(original("Chatbots")).await.expect("create");
        assert!(!created.is_enhanced);
        assert!(created.reference_links.is_none());

        let found = storage
            .find_by_id(created.id)
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.title, "Chatbots");
        assert_eq!(found.author.as_deref(), Some("Staff"));
        assert!(found.original_title.is_none());

        assert!(storage.find_by_id(ArticleId(9999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn derived_article_keeps_lineage_and_links() {
        let storage = test_storage().await;
        let origin = storage.create(original("Chatbots")).await.unwrap();
        let derived = storage.create(derived_from(&origin)).await.expect("create derived");

        assert!(derived.is_enhanced);
        assert_eq!(derived.original_article_id, Some(origin.id));
        assert_eq!(derived.original_title.as_deref(), Some("Chatbots"));
        let links = derived.reference_links.expect("links");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://other.example/post");

        let versions = storage.versions_derived_from(origin.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].id, derived.id);
    }

    #[tokio::test]
    async fn create_rejects_missing_origin() {
        let storage = test_storage().await;
        let ghost = Article {
            id: ArticleId(404),
            title: "Ghost".into(),
            content: "x".into(),
            author: None,
            url: None,
            published_date: None,
            image_url: None,
            is_enhanced: false,
            original_article_id: None,
            reference_links: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            original_title: None,
        };
        let err = storage.create(derived_from(&ghost)).await.unwrap_err();
        assert!(matches!(err, EnhancerError::Validation { .. }));
        assert!(storage.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_blank_content() {
        let storage = test_storage().await;
        let mut article = original("Empty");
        article.content = "  ".into();
        assert!(storage.create(article).await.is_err());
    }

    #[tokio::test]
    async fn latest_unenhanced_picks_newest_original() {
        let storage = test_storage().await;
        assert!(
            storage
                .latest_unenhanced(SelectionPolicy::ExcludeDerived)
                .await
                .unwrap()
                .is_none()
        );

        storage.create(original("Older")).await.unwrap();
        let newer = storage.create(original("Newer")).await.unwrap();

        let latest = storage
            .latest_unenhanced(SelectionPolicy::ExcludeDerived)
            .await
            .unwrap()
            .expect("latest");
        assert_eq!(latest.id, newer.id);
    }

    #[tokio::test]
    async fn exclude_derived_skips_enhanced_originals() {
        let storage = test_storage().await;
        let older = storage.create(original("Older")).await.unwrap();
        let newer = storage.create(original("Newer")).await.unwrap();
        storage.create(derived_from(&newer)).await.unwrap();

        let latest = storage
            .latest_unenhanced(SelectionPolicy::ExcludeDerived)
            .await
            .unwrap()
            .expect("latest");
        assert_eq!(latest.id, older.id);

        let repeat = storage
            .latest_unenhanced(SelectionPolicy::AllowRepeat)
            .await
            .unwrap()
            .expect("latest");
        assert_eq!(repeat.id, newer.id);

        storage.create(derived_from(&older)).await.unwrap();
        assert!(
            storage
                .latest_unenhanced(SelectionPolicy::ExcludeDerived)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn list_is_newest_first_with_original_title() {
        let storage = test_storage().await;
        let origin = storage.create(original("Chatbots")).await.unwrap();
        let derived = storage.create(derived_from(&origin)).await.unwrap();

        let all = storage.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, derived.id);
        assert_eq!(all[0].original_title.as_deref(), Some("Chatbots"));
        assert_eq!(all[1].id, origin.id);
    }

    #[test]
    fn parses_both_timestamp_styles() {
        let rfc = parse_timestamp("2024-05-01T10:00:00.123456Z").unwrap();
        let sqlite = parse_timestamp("2024-05-01 10:00:00").unwrap();
        assert!(rfc > sqlite);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
