//! Scheduled sweep: discovery → locate → fetch → extract → filter → persist,
//! strictly sequentially across origins.
//!
//! One logical worker, no fan-out, so total outbound pressure against
//! third-party sites and the completion service stays bounded. Every
//! successful upsert is durable immediately; there is no run-level rollback,
//! so hitting the wall-clock ceiling mid-run leaves prior work committed and
//! the next scheduled run continues convergently via the natural-key upsert.

use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};
use url::Url;

use leadscout_crawler::{Fetcher, Locator};
use leadscout_discovery::{SearchProvider, discover_origins};
use leadscout_extraction::{
    CompletionClient, build_extraction_prompt, matches_region, parse_extraction, prompt_hash,
    validate_items,
};
use leadscout_shared::{CandidateInput, Result};
use leadscout_storage::{Storage, UpsertOutcome};

/// Options for one sweep invocation.
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Target region label driving discovery and the filter.
    pub region: String,
    /// Result cap per search query.
    pub result_count: u32,
    /// Max output tokens per extraction call.
    pub max_tokens: u32,
    /// Wall-clock ceiling for the whole run.
    pub time_budget: Duration,
    /// Recorded as `created_by` on rows this sweep inserts.
    pub created_by: Option<String>,
}

/// Run-level counters for one sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Origins the sweep attempted (located or not).
    pub origins_probed: usize,
    /// Items parsed out of completion output, pre-filter.
    pub items_extracted: usize,
    /// Items newly inserted into the lead pool.
    pub items_saved: usize,
    /// Items rejected by validation, the region filter, or a store failure.
    pub items_skipped: usize,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting sweep status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each origin is processed.
    fn origin(&self, origin: &str, current: usize, total: usize);
    /// Called when the sweep completes.
    fn done(&self, report: &SweepReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn origin(&self, _origin: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &SweepReport) {}
}

/// Run one unattended sweep.
///
/// Failures below the invocation boundary are isolated at the smallest
/// granularity: a dead search query, an unlocatable origin, an unreadable
/// page, a transport-failed or malformed completion, and a per-item store
/// error each skip only their own unit of work. Only the wall-clock ceiling
/// stops the run early, and it never undoes committed upserts.
#[instrument(skip_all, fields(region = %options.region))]
pub async fn run_sweep(
    search: &dyn SearchProvider,
    completion: &dyn CompletionClient,
    storage: &Storage,
    options: &SweepOptions,
    progress: &dyn ProgressReporter,
) -> Result<SweepReport> {
    let start = Instant::now();
    let deadline = start + options.time_budget;
    let mut report = SweepReport::default();

    // Job bookkeeping is best-effort; a history row must never block the run.
    let job_id = match storage.insert_sweep_job(&options.region).await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(error = %e, "failed to record sweep job");
            None
        }
    };

    let locator = Locator::new()?;
    let fetcher = Fetcher::new()?;

    progress.phase("Discovering candidate origins");
    let origins = discover_origins(search, &options.region, options.result_count).await;
    info!(origins = origins.len(), "discovery complete");

    progress.phase("Processing origins");
    let total = origins.len();

    for (i, origin) in origins.iter().enumerate() {
        if Instant::now() >= deadline {
            warn!(
                processed = report.origins_probed,
                remaining = total - i,
                "wall-clock ceiling reached, stopping sweep"
            );
            break;
        }

        progress.origin(origin, i + 1, total);
        report.origins_probed += 1;

        let Some(works_url) = locator.locate(origin).await else {
            continue;
        };

        let page = match fetcher.fetch(&works_url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(%works_url, error = %e, "fetch failed, skipping origin");
                continue;
            }
        };

        let source_company = source_company_name(page.title.as_deref(), origin);
        let prompt = build_extraction_prompt(&page.text, &source_company, &works_url);
        let hash = prompt_hash(&prompt, completion.model_id());

        // Unchanged pages hit the cache and skip the completion call entirely.
        let raw = match storage.get_extraction_cache(&hash, completion.model_id()).await {
            Ok(Some(cached)) => cached,
            _ => match completion.complete(&prompt, options.max_tokens).await {
                Ok(raw) => {
                    if let Err(e) = storage
                        .set_extraction_cache(&hash, completion.model_id(), &raw)
                        .await
                    {
                        warn!(error = %e, "failed to cache completion output");
                    }
                    raw
                }
                Err(e) => {
                    warn!(%works_url, error = %e, "completion call failed, skipping origin");
                    continue;
                }
            },
        };

        let extraction = validate_items(parse_extraction(&raw));
        report.items_extracted += extraction.items.len() + extraction.rejected;
        report.items_skipped += extraction.rejected;

        for item in &extraction.items {
            if !matches_region(&item.prefecture, &options.region) {
                report.items_skipped += 1;
                continue;
            }

            let input = CandidateInput::from_extracted(
                item,
                &source_company,
                &works_url,
                options.created_by.as_deref(),
            );

            match storage.upsert_achievement(&input).await {
                Ok((_, UpsertOutcome::Inserted)) => report.items_saved += 1,
                Ok((_, UpsertOutcome::Updated)) => {}
                Err(e) => {
                    warn!(company = %input.company_name, error = %e, "upsert failed, skipping item");
                    report.items_skipped += 1;
                }
            }
        }
    }

    report.elapsed = start.elapsed();

    if let Some(job_id) = job_id {
        let stats = serde_json::json!({
            "origins_probed": report.origins_probed,
            "items_extracted": report.items_extracted,
            "items_saved": report.items_saved,
            "items_skipped": report.items_skipped,
            "elapsed_ms": report.elapsed.as_millis() as u64,
        });
        if let Err(e) = storage.update_sweep_job(&job_id, &stats.to_string()).await {
            warn!(error = %e, "failed to finalize sweep job");
        }
    }

    info!(
        origins_probed = report.origins_probed,
        items_extracted = report.items_extracted,
        items_saved = report.items_saved,
        items_skipped = report.items_skipped,
        elapsed_ms = report.elapsed.as_millis(),
        "sweep complete"
    );

    progress.done(&report);
    Ok(report)
}

/// Resolve the competitor's display name: page title when present, host otherwise.
pub(crate) fn source_company_name(title: Option<&str>, origin: &str) -> String {
    if let Some(title) = title {
        let trimmed = title.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    Url::parse(origin)
        .ok()
        .and_then(|u| u.host_str().map(String::from))
        .unwrap_or_else(|| origin.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CannedCompletion, ScriptedSearch, page_html, test_storage};

    const YAMADA_ITEMS: &str = r#"[
        {"clientName": "株式会社山田食品", "prefecture": "神奈川県", "industry": "製造業", "videoType": "会社紹介", "description": "工場紹介ムービー"}
    ]"#;

    #[test]
    fn company_name_prefers_title() {
        assert_eq!(
            source_company_name(Some(" 株式会社映像スタジオ "), "https://studio.example.com"),
            "株式会社映像スタジオ"
        );
        assert_eq!(
            source_company_name(None, "https://studio.example.com"),
            "studio.example.com"
        );
        assert_eq!(
            source_company_name(Some("   "), "https://studio.example.com"),
            "studio.example.com"
        );
    }

    /// Serve the works page at `/works`; other probe paths hit wiremock's
    /// default 404.
    async fn mount_works_page(server: &wiremock::MockServer, body: &str) {
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/works"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    fn options(region: &str) -> SweepOptions {
        SweepOptions {
            region: region.into(),
            result_count: 10,
            max_tokens: 2_000,
            time_budget: Duration::from_secs(60),
            created_by: Some("sweep".into()),
        }
    }

    #[tokio::test]
    async fn end_to_end_sweep_saves_matching_item() {
        let server = wiremock::MockServer::start().await;
        mount_works_page(&server, &page_html()).await;

        let search = ScriptedSearch::origin(&server.uri());
        let completion = CannedCompletion::new(YAMADA_ITEMS);
        let storage = test_storage().await;

        let report = run_sweep(&search, &completion, &storage, &options("神奈川県"), &SilentProgress)
            .await
            .expect("sweep");

        assert_eq!(report.origins_probed, 1);
        assert_eq!(report.items_extracted, 1);
        assert_eq!(report.items_saved, 1);
        assert_eq!(report.items_skipped, 0);

        let all = storage.list_achievements().await.expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].company_name, "株式会社山田食品");
        assert!(!all[0].is_processed);
        assert!(all[0].source_url.as_deref().unwrap().ends_with("/works"));
    }

    #[tokio::test]
    async fn second_sweep_is_idempotent() {
        let server = wiremock::MockServer::start().await;
        mount_works_page(&server, &page_html()).await;

        let search = ScriptedSearch::origin(&server.uri());
        let completion = CannedCompletion::new(YAMADA_ITEMS);
        let storage = test_storage().await;
        let opts = options("神奈川県");

        let first = run_sweep(&search, &completion, &storage, &opts, &SilentProgress)
            .await
            .expect("first sweep");
        assert_eq!(first.items_saved, 1);

        let second = run_sweep(&search, &completion, &storage, &opts, &SilentProgress)
            .await
            .expect("second sweep");
        assert_eq!(second.items_saved, 0);
        assert_eq!(storage.list_achievements().await.expect("list").len(), 1);

        // The unchanged page hit the extraction cache on the second run.
        assert_eq!(completion.calls(), 1);
    }

    #[tokio::test]
    async fn mismatched_region_filters_not_dedups() {
        let server = wiremock::MockServer::start().await;
        mount_works_page(&server, &page_html()).await;

        let search = ScriptedSearch::origin(&server.uri());
        let completion = CannedCompletion::new(YAMADA_ITEMS);
        let storage = test_storage().await;

        let report = run_sweep(&search, &completion, &storage, &options("北海道"), &SilentProgress)
            .await
            .expect("sweep");

        assert_eq!(report.items_extracted, 1);
        assert_eq!(report.items_saved, 0);
        assert_eq!(report.items_skipped, 1);
        assert!(storage.list_achievements().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn unknown_prefecture_is_skipped() {
        let server = wiremock::MockServer::start().await;
        mount_works_page(&server, &page_html()).await;

        let search = ScriptedSearch::origin(&server.uri());
        let completion = CannedCompletion::new(
            r#"[{"clientName": "所在不明商事", "prefecture": "不明", "industry": "その他", "videoType": "その他"}]"#,
        );
        let storage = test_storage().await;

        let report = run_sweep(&search, &completion, &storage, &options("神奈川県"), &SilentProgress)
            .await
            .expect("sweep");

        assert_eq!(report.items_saved, 0);
        assert_eq!(report.items_skipped, 1);
    }

    #[tokio::test]
    async fn malformed_completion_degrades_to_zero_items() {
        let server = wiremock::MockServer::start().await;
        mount_works_page(&server, &page_html()).await;

        let search = ScriptedSearch::origin(&server.uri());
        let completion = CannedCompletion::new("抽出に失敗しました。JSONではありません。");
        let storage = test_storage().await;

        let report = run_sweep(&search, &completion, &storage, &options("神奈川県"), &SilentProgress)
            .await
            .expect("sweep");

        assert_eq!(report.origins_probed, 1);
        assert_eq!(report.items_extracted, 0);
        assert_eq!(report.items_saved, 0);
    }

    #[tokio::test]
    async fn empty_client_name_counts_as_skipped() {
        let server = wiremock::MockServer::start().await;
        mount_works_page(&server, &page_html()).await;

        let search = ScriptedSearch::origin(&server.uri());
        let completion = CannedCompletion::new(
            r#"[
                {"clientName": "", "prefecture": "神奈川県", "industry": "その他", "videoType": "その他"},
                {"clientName": "株式会社山田食品", "prefecture": "神奈川県", "industry": "製造業", "videoType": "会社紹介"}
            ]"#,
        );
        let storage = test_storage().await;

        let report = run_sweep(&search, &completion, &storage, &options("神奈川県"), &SilentProgress)
            .await
            .expect("sweep");

        assert_eq!(report.items_extracted, 2);
        assert_eq!(report.items_saved, 1);
        assert_eq!(report.items_skipped, 1);
    }

    #[tokio::test]
    async fn unlocatable_origin_short_circuits() {
        // No mocks mounted: no works page on any conventional path.
        let server = wiremock::MockServer::start().await;

        let search = ScriptedSearch::origin(&server.uri());
        let completion = CannedCompletion::new(YAMADA_ITEMS);
        let storage = test_storage().await;

        let report = run_sweep(&search, &completion, &storage, &options("神奈川県"), &SilentProgress)
            .await
            .expect("sweep");

        assert_eq!(report.origins_probed, 1);
        assert_eq!(report.items_extracted, 0);
        // Extraction never ran for an unlocatable origin.
        assert_eq!(completion.calls(), 0);
    }

    #[tokio::test]
    async fn exhausted_time_budget_stops_before_origins() {
        let server = wiremock::MockServer::start().await;
        mount_works_page(&server, &page_html()).await;

        let search = ScriptedSearch::origin(&server.uri());
        let completion = CannedCompletion::new(YAMADA_ITEMS);
        let storage = test_storage().await;

        let mut opts = options("神奈川県");
        opts.time_budget = Duration::ZERO;

        let report = run_sweep(&search, &completion, &storage, &opts, &SilentProgress)
            .await
            .expect("sweep");

        assert_eq!(report.origins_probed, 0);
        assert_eq!(completion.calls(), 0);
    }

    #[tokio::test]
    async fn empty_discovery_is_a_clean_no_op() {
        let search = ScriptedSearch::empty();
        let completion = CannedCompletion::new(YAMADA_ITEMS);
        let storage = test_storage().await;

        let report = run_sweep(&search, &completion, &storage, &options("神奈川県"), &SilentProgress)
            .await
            .expect("sweep");

        assert_eq!(report.origins_probed, 0);
        assert_eq!(report.items_saved, 0);
    }
}
