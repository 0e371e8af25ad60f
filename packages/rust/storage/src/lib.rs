//! libSQL storage layer for achievement candidates and CRM records.
//!
//! The [`Storage`] struct wraps a libSQL database holding discovered
//! achievement candidates, the CRM customer/deal tables the conversion
//! trigger writes into, sweep run history, and the extraction cache.
//!
//! Dedup converges on the natural key `(company_name, production_company)`:
//! an absent key inserts with `is_processed = 0`, a present key updates only
//! the descriptive fields (`content_summary`, `reference_url`); identity
//! fields and `is_processed` are never overwritten by a refresh. A conflict
//! on the natural key resolves to an update, never an error.

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use uuid::Uuid;

use leadscout_shared::{AchievementCandidate, CandidateInput, LeadScoutError, Result};

/// Whether an upsert created a new row or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LeadScoutError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode (reporting/dashboard parity).
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
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
                    LeadScoutError::Storage(format!(
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

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(LeadScoutError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Achievement operations
    // -----------------------------------------------------------------------

    /// Upsert one achievement candidate on its natural key.
    ///
    /// Insert sets `created_at == updated_at`; a conflict updates only
    /// `content_summary`, `reference_url`, and `updated_at`. The row is
    /// re-read post-write and equal timestamps mean "newly inserted", so the
    /// orchestrator can report accurate counters.
    pub async fn upsert_achievement(
        &self,
        input: &CandidateInput,
    ) -> Result<(AchievementCandidate, UpsertOutcome)> {
        self.check_writable()?;

        if input.company_name.trim().is_empty() {
            return Err(LeadScoutError::validation("companyName must not be empty"));
        }
        if input.production_company.trim().is_empty() {
            return Err(LeadScoutError::validation(
                "productionCompany must not be empty",
            ));
        }

        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();

        self.conn
            .execute(
                "INSERT INTO achievements
                   (id, company_name, production_company, prefecture, industry, video_type,
                    reference_url, content_summary, source_url, is_processed, created_by,
                    created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?11, ?11)
                 ON CONFLICT(company_name, production_company) DO UPDATE SET
                   content_summary = excluded.content_summary,
                   reference_url = excluded.reference_url,
                   updated_at = excluded.updated_at",
                params![
                    id.as_str(),
                    input.company_name.trim(),
                    input.production_company.trim(),
                    input.prefecture.as_str(),
                    input.industry.as_str(),
                    input.video_type.as_str(),
                    input.reference_url.as_deref(),
                    input.content_summary.as_deref(),
                    input.source_url.as_deref(),
                    input.created_by.as_deref(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let record = self
            .get_by_natural_key(&input.company_name, &input.production_company)
            .await?
            .ok_or_else(|| {
                LeadScoutError::Storage("upserted achievement not found on re-read".into())
            })?;

        let outcome = if record.created_at == record.updated_at {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        };

        Ok((record, outcome))
    }

    /// Get an achievement by ID.
    pub async fn get_achievement(&self, id: &str) -> Result<Option<AchievementCandidate>> {
        let mut rows = self
            .conn
            .query(
                &format!("{ACHIEVEMENT_SELECT} WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_achievement(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(LeadScoutError::Storage(e.to_string())),
        }
    }

    /// Get an achievement by its natural key.
    pub async fn get_by_natural_key(
        &self,
        company_name: &str,
        production_company: &str,
    ) -> Result<Option<AchievementCandidate>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "{ACHIEVEMENT_SELECT} WHERE company_name = ?1 AND production_company = ?2"
                ),
                params![company_name.trim(), production_company.trim()],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_achievement(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(LeadScoutError::Storage(e.to_string())),
        }
    }

    /// List all achievements, most recently created first.
    pub async fn list_achievements(&self) -> Result<Vec<AchievementCandidate>> {
        let mut rows = self
            .conn
            .query(
                &format!("{ACHIEVEMENT_SELECT} ORDER BY created_at DESC"),
                params![],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_achievement(&row)?);
        }
        Ok(results)
    }

    /// Flip `is_processed` to true. One-way; there is no un-process path.
    pub async fn mark_processed(&self, id: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let affected = self
            .conn
            .execute(
                "UPDATE achievements SET is_processed = 1, updated_at = ?1 WHERE id = ?2",
                params![now.as_str(), id],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        if affected == 0 {
            return Err(LeadScoutError::Storage(format!(
                "achievement not found: {id}"
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // CRM operations (consumed only by the conversion trigger)
    // -----------------------------------------------------------------------

    /// Find a customer by name within `scope`, creating one if absent.
    /// Returns the customer ID.
    pub async fn find_or_create_customer(&self, name: &str, scope: &str) -> Result<String> {
        let mut rows = self
            .conn
            .query(
                "SELECT id FROM customers WHERE name = ?1 AND scope = ?2",
                params![name, scope],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        if let Ok(Some(row)) = rows.next().await {
            let id: String = row
                .get(0)
                .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
            return Ok(id);
        }

        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO customers (id, name, scope, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id.as_str(), name, scope, now.as_str()],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// Create one sales-pipeline deal. Returns the deal ID.
    pub async fn create_deal(
        &self,
        customer_id: &str,
        title: &str,
        notes: Option<&str>,
    ) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO deals (id, customer_id, title, notes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id.as_str(), customer_id, title, notes, now.as_str()],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// List deals for a customer. Returns `Vec<(id, title, notes)>`.
    pub async fn list_deals_for_customer(
        &self,
        customer_id: &str,
    ) -> Result<Vec<(String, String, Option<String>)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, title, notes FROM deals WHERE customer_id = ?1 ORDER BY created_at",
                params![customer_id],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push((
                row.get::<String>(0)
                    .map_err(|e| LeadScoutError::Storage(e.to_string()))?,
                row.get::<String>(1)
                    .map_err(|e| LeadScoutError::Storage(e.to_string()))?,
                row.get::<String>(2).ok(),
            ));
        }
        Ok(results)
    }

    // -----------------------------------------------------------------------
    // Sweep job operations
    // -----------------------------------------------------------------------

    /// Insert a new sweep job. Returns the generated job ID.
    pub async fn insert_sweep_job(&self, region: &str) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO sweep_jobs (id, region, started_at) VALUES (?1, ?2, ?3)",
                params![id.as_str(), region, now.as_str()],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// Finalize a sweep job with its run counters.
    pub async fn update_sweep_job(&self, job_id: &str, stats_json: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE sweep_jobs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, job_id],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Extraction cache operations
    // -----------------------------------------------------------------------

    /// Get a cached completion result.
    pub async fn get_extraction_cache(
        &self,
        prompt_hash: &str,
        model_id: &str,
    ) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT result_text FROM extraction_cache
                 WHERE prompt_hash = ?1 AND model_id = ?2",
                params![prompt_hash, model_id],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let result: String = row
                    .get(0)
                    .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
                Ok(Some(result))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(LeadScoutError::Storage(e.to_string())),
        }
    }

    /// Store a completion result in the cache (upserts).
    pub async fn set_extraction_cache(
        &self,
        prompt_hash: &str,
        model_id: &str,
        result_text: &str,
    ) -> Result<()> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO extraction_cache (id, prompt_hash, model_id, result_text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(prompt_hash, model_id) DO UPDATE SET
                   result_text = excluded.result_text,
                   created_at = excluded.created_at",
                params![id.as_str(), prompt_hash, model_id, result_text, now.as_str()],
            )
            .await
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// Shared SELECT column list for achievement queries.
const ACHIEVEMENT_SELECT: &str = "SELECT id, company_name, production_company, prefecture, \
     industry, video_type, reference_url, content_summary, source_url, published_at, \
     is_processed, created_by, created_at, updated_at FROM achievements";

/// Convert a database row to an [`AchievementCandidate`].
fn row_to_achievement(row: &libsql::Row) -> Result<AchievementCandidate> {
    Ok(AchievementCandidate {
        id: row
            .get::<String>(0)
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?,
        company_name: row
            .get::<String>(1)
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?,
        production_company: row
            .get::<String>(2)
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?,
        prefecture: row
            .get::<String>(3)
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?,
        industry: row
            .get::<String>(4)
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?,
        video_type: row
            .get::<String>(5)
            .map_err(|e| LeadScoutError::Storage(e.to_string()))?,
        reference_url: row.get::<String>(6).ok(),
        content_summary: row.get::<String>(7).ok(),
        source_url: row.get::<String>(8).ok(),
        published_at: row
            .get::<String>(9)
            .ok()
            .and_then(|s| parse_timestamp(&s).ok()),
        is_processed: row.get::<i64>(10).unwrap_or(0) != 0,
        created_by: row.get::<String>(11).ok(),
        created_at: {
            let s: String = row
                .get(12)
                .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
            parse_timestamp(&s)?
        },
        updated_at: {
            let s: String = row
                .get(13)
                .map_err(|e| LeadScoutError::Storage(e.to_string()))?;
            parse_timestamp(&s)?
        },
    })
}

/// Parse an RFC 3339 timestamp column.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| LeadScoutError::Storage(format!("invalid date: {e}")))
}
