//! SQL migration definitions for the article database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: articles with lineage and reference links",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Originals and their derived versions
CREATE TABLE IF NOT EXISTS articles (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    title               TEXT NOT NULL,
    content             TEXT NOT NULL,
    author              TEXT,
    url                 TEXT,
    published_date      TEXT,
    image_url           TEXT,
    is_enhanced         INTEGER NOT NULL DEFAULT 0,
    original_article_id INTEGER REFERENCES articles(id) ON DELETE SET NULL,
    reference_links     TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_articles_original ON articles(original_article_id);
CREATE INDEX IF NOT EXISTS idx_articles_enhanced_created ON articles(is_enhanced, created_at);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
