//! SQL migration definitions for the LeadScout database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed within a transaction.

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
        description: "Initial schema: achievements, customers, deals, sweep_jobs, extraction_cache",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Achievement candidates discovered from competitor showcase pages.
-- (company_name, production_company) is the natural key governing dedup.
CREATE TABLE IF NOT EXISTS achievements (
    id                 TEXT PRIMARY KEY,
    company_name       TEXT NOT NULL,
    production_company TEXT NOT NULL,
    prefecture         TEXT NOT NULL,
    industry           TEXT NOT NULL,
    video_type         TEXT NOT NULL,
    reference_url      TEXT,
    content_summary    TEXT,
    source_url         TEXT,
    published_at       TEXT,
    is_processed       INTEGER NOT NULL DEFAULT 0,
    created_by         TEXT,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL,
    UNIQUE(company_name, production_company)
);

CREATE INDEX IF NOT EXISTS idx_achievements_processed ON achievements(is_processed);
CREATE INDEX IF NOT EXISTS idx_achievements_prefecture ON achievements(prefecture);

-- CRM customers, scoped to the creating branch/user.
CREATE TABLE IF NOT EXISTS customers (
    id         TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    scope      TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(name, scope)
);

-- Sales-pipeline deals created by the conversion trigger.
CREATE TABLE IF NOT EXISTS deals (
    id          TEXT PRIMARY KEY,
    customer_id TEXT NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
    title       TEXT NOT NULL,
    notes       TEXT,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_deals_customer ON deals(customer_id);

-- Sweep run history
CREATE TABLE IF NOT EXISTS sweep_jobs (
    id          TEXT PRIMARY KEY,
    region      TEXT NOT NULL,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

-- Completion output cache, keyed by prompt hash + model
CREATE TABLE IF NOT EXISTS extraction_cache (
    id          TEXT PRIMARY KEY,
    prompt_hash TEXT NOT NULL,
    model_id    TEXT NOT NULL,
    result_text TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE(prompt_hash, model_id)
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
