//! Conversion trigger: materialize an achievement into a CRM sales pursuit.
//!
//! Finds-or-creates the customer matching the achievement's client name
//! within the caller's scope, creates one seeded deal, and flips
//! `is_processed`. One-way transition; no un-process path exists.
//!
//! There is intentionally no guard against repeated invocation on the same
//! achievement (it would create a second deal); the intended idempotence
//! semantics are an open question upstream, so none are invented here.

use serde::Serialize;
use tracing::{info, instrument};

use leadscout_shared::{LeadScoutError, Result};
use leadscout_storage::Storage;

/// Identifiers produced by one conversion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub achievement_id: String,
    pub customer_id: String,
    pub deal_id: String,
}

/// Convert the achievement `id` into a customer + deal within `scope`.
#[instrument(skip_all, fields(id = %id, scope = %scope))]
pub async fn convert_achievement(
    storage: &Storage,
    id: &str,
    scope: &str,
) -> Result<ConversionResult> {
    let achievement = storage
        .get_achievement(id)
        .await?
        .ok_or_else(|| LeadScoutError::validation(format!("achievement not found: {id}")))?;

    let customer_id = storage
        .find_or_create_customer(&achievement.company_name, scope)
        .await?;

    let title = format!("【新規開拓】{} 映像制作のご提案", achievement.company_name);
    let notes = achievement.content_summary.clone().unwrap_or_else(|| {
        format!(
            "競合（{}）の制作実績ページから抽出したリードです。",
            achievement.production_company
        )
    });

    let deal_id = storage
        .create_deal(&customer_id, &title, Some(&notes))
        .await?;

    storage.mark_processed(id).await?;

    info!(%customer_id, %deal_id, "achievement converted to sales pursuit");

    Ok(ConversionResult {
        achievement_id: id.to_string(),
        customer_id,
        deal_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_storage;
    use leadscout_shared::CandidateInput;

    fn seed_input() -> CandidateInput {
        CandidateInput {
            company_name: "株式会社山田食品".into(),
            production_company: "株式会社映像スタジオ".into(),
            prefecture: "神奈川県".into(),
            industry: "製造業".into(),
            video_type: "会社紹介".into(),
            reference_url: None,
            content_summary: Some("工場紹介ムービーの実績".into()),
            source_url: Some("https://studio.example.com/works".into()),
            created_by: None,
        }
    }

    #[tokio::test]
    async fn conversion_creates_customer_and_deal_and_flips_flag() {
        let storage = test_storage().await;
        let (record, _) = storage.upsert_achievement(&seed_input()).await.expect("seed");
        assert!(!record.is_processed);

        let result = convert_achievement(&storage, &record.id, "branch-tokyo")
            .await
            .expect("convert");

        assert_eq!(result.achievement_id, record.id);

        let after = storage
            .get_achievement(&record.id)
            .await
            .expect("get")
            .expect("exists");
        assert!(after.is_processed);

        let deals = storage
            .list_deals_for_customer(&result.customer_id)
            .await
            .expect("deals");
        assert_eq!(deals.len(), 1);
        assert!(deals[0].1.contains("株式会社山田食品"));
        assert_eq!(deals[0].2.as_deref(), Some("工場紹介ムービーの実績"));
    }

    #[tokio::test]
    async fn conversion_leaves_other_records_untouched() {
        let storage = test_storage().await;
        let (target, _) = storage.upsert_achievement(&seed_input()).await.expect("seed");
        let other_input = CandidateInput {
            company_name: "青空商事".into(),
            ..seed_input()
        };
        let (other, _) = storage
            .upsert_achievement(&other_input)
            .await
            .expect("seed other");

        convert_achievement(&storage, &target.id, "branch-tokyo")
            .await
            .expect("convert");

        let untouched = storage
            .get_achievement(&other.id)
            .await
            .expect("get")
            .expect("exists");
        assert!(!untouched.is_processed);
        assert_eq!(untouched.updated_at, other.updated_at);
    }

    #[tokio::test]
    async fn conversion_reuses_existing_customer_in_scope() {
        let storage = test_storage().await;
        let existing = storage
            .find_or_create_customer("株式会社山田食品", "branch-tokyo")
            .await
            .expect("customer");

        let (record, _) = storage.upsert_achievement(&seed_input()).await.expect("seed");
        let result = convert_achievement(&storage, &record.id, "branch-tokyo")
            .await
            .expect("convert");

        assert_eq!(result.customer_id, existing);
    }

    #[tokio::test]
    async fn unknown_achievement_is_an_error() {
        let storage = test_storage().await;
        let result = convert_achievement(&storage, "no-such-id", "branch-tokyo").await;
        assert!(matches!(result, Err(LeadScoutError::Validation { .. })));
    }

    #[tokio::test]
    async fn missing_summary_falls_back_to_source_note() {
        let storage = test_storage().await;
        let input = CandidateInput {
            content_summary: None,
            ..seed_input()
        };
        let (record, _) = storage.upsert_achievement(&input).await.expect("seed");

        let result = convert_achievement(&storage, &record.id, "branch-tokyo")
            .await
            .expect("convert");

        let deals = storage
            .list_deals_for_customer(&result.customer_id)
            .await
            .expect("deals");
        assert!(deals[0].2.as_deref().unwrap().contains("株式会社映像スタジオ"));
    }
}
