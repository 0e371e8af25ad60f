//! Manual single-source path: fetch → extract for one user-supplied URL,
//! staging results for human review without writing.
//!
//! The two-phase separation is deliberate: [`stage_extraction`] performs zero
//! writes so a human can review and edit AI-extracted candidates, and only
//! the explicitly invoked [`commit_candidates`] makes them durable, through
//! the same natural-key upsert the sweep uses. Because a human is waiting
//! synchronously, failures here are surfaced with distinguishable categories
//! instead of being swallowed.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use leadscout_crawler::Fetcher;
use leadscout_extraction::{CompletionClient, extract_achievements};
use leadscout_shared::{CandidateInput, ExtractedItem, Result};
use leadscout_storage::{Storage, UpsertOutcome};

use crate::sweep::source_company_name;

/// Validated items staged for human review. Nothing here has been persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedExtraction {
    /// The page the items were extracted from.
    pub source_url: String,
    /// The competitor name used in the extraction contract.
    pub source_company: String,
    /// Items that survived validation.
    pub items: Vec<ExtractedItem>,
    /// Items dropped for a missing client name.
    pub rejected: usize,
}

/// Fetch one URL and extract achievement candidates from it, without writing.
///
/// The company name comes from `company_override` when supplied, otherwise
/// it is auto-detected from the page title (falling back to the host).
/// Fetch errors keep their category ([`Blocked`](leadscout_shared::LeadScoutError::Blocked),
/// [`Timeout`](leadscout_shared::LeadScoutError::Timeout),
/// [`Network`](leadscout_shared::LeadScoutError::Network)) so the caller can
/// tell the user why an origin could not be read.
#[instrument(skip_all, fields(url = %url))]
pub async fn stage_extraction(
    completion: &dyn CompletionClient,
    url: &str,
    company_override: Option<&str>,
    max_tokens: u32,
) -> Result<StagedExtraction> {
    let fetcher = Fetcher::new()?;
    let page = fetcher.fetch(url).await?;

    let source_company = match company_override {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => source_company_name(page.title.as_deref(), url),
    };

    let extraction =
        extract_achievements(completion, &page.text, &source_company, url, max_tokens).await?;

    info!(
        items = extraction.items.len(),
        rejected = extraction.rejected,
        "staged extraction ready for review"
    );

    Ok(StagedExtraction {
        source_url: url.to_string(),
        source_company,
        items: extraction.items,
        rejected: extraction.rejected,
    })
}

/// Outcome of one bulk commit of human-reviewed candidates.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    /// Rows newly inserted.
    pub saved: usize,
    /// Rows that already existed and had descriptive fields refreshed.
    pub updated: usize,
    /// Per-item failures: `(company_name, error)`. Surfaced, not swallowed;
    /// a human invoked this path.
    pub errors: Vec<(String, String)>,
}

/// Durably commit reviewed candidates through the natural-key upsert.
///
/// This is the only path by which staged items enter the lead pool.
#[instrument(skip_all, fields(items = items.len()))]
pub async fn commit_candidates(storage: &Storage, items: &[CandidateInput]) -> Result<CommitReport> {
    let mut report = CommitReport::default();

    for item in items {
        match storage.upsert_achievement(item).await {
            Ok((_, UpsertOutcome::Inserted)) => report.saved += 1,
            Ok((_, UpsertOutcome::Updated)) => report.updated += 1,
            Err(e) => report
                .errors
                .push((item.company_name.clone(), e.to_string())),
        }
    }

    info!(
        saved = report.saved,
        updated = report.updated,
        errors = report.errors.len(),
        "bulk commit complete"
    );

    Ok(report)
}
