//! Core domain types for LeadScout achievement candidates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel prefecture value the extraction contract uses when a client's
/// region cannot be determined from the source page.
pub const UNKNOWN_PREFECTURE: &str = "不明";

/// Industry taxonomy embedded in the extraction contract. The completion
/// service is instructed to pick from this list, with "その他" as the fallback.
pub const INDUSTRIES: &[&str] = &[
    "製造業",
    "IT・ソフトウェア",
    "建設・不動産",
    "医療・福祉",
    "小売・流通",
    "飲食・サービス",
    "教育",
    "金融・保険",
    "運輸・物流",
    "官公庁・自治体",
    "その他",
];

/// Video-type taxonomy embedded in the extraction contract.
pub const VIDEO_TYPES: &[&str] = &[
    "会社紹介",
    "商品・サービス紹介",
    "採用",
    "ブランディング",
    "イベント",
    "CM・広告",
    "マニュアル・研修",
    "インタビュー",
    "その他",
];

// ---------------------------------------------------------------------------
// AchievementId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for achievement identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementId(pub Uuid);

impl AchievementId {
    /// Generate a new time-sortable achievement identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AchievementId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AchievementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AchievementId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// ExtractedItem
// ---------------------------------------------------------------------------

/// One achievement as returned by the completion service, before validation.
///
/// The extraction contract demands camelCase JSON keys; every field is
/// serde-defaulted because completion output is untrusted: a missing
/// `clientName` deserializes to an empty string and the item is then dropped
/// by validation rather than defaulted to a fabricated name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedItem {
    /// The end-client who commissioned the video.
    pub client_name: String,
    /// Normalized prefecture, or [`UNKNOWN_PREFECTURE`].
    pub prefecture: String,
    /// Industry label from [`INDUSTRIES`].
    pub industry: String,
    /// Video-type label from [`VIDEO_TYPES`].
    pub video_type: String,
    /// Short free-text description of the engagement.
    pub description: Option<String>,
    /// Link to the showcased work, if the page carries one.
    pub reference_url: Option<String>,
}

impl ExtractedItem {
    /// An item is persistable only when its client name is non-empty.
    pub fn has_client_name(&self) -> bool {
        !self.client_name.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// CandidateInput
// ---------------------------------------------------------------------------

/// Upsert input for one achievement candidate: the natural key plus the
/// descriptive fields a re-crawl may refresh. Also the wire shape of the
/// bulk-commit payload after human review of staged extractions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateInput {
    /// The end-client (natural-key half).
    pub company_name: String,
    /// The competitor that produced the work (natural-key half).
    pub production_company: String,
    pub prefecture: String,
    pub industry: String,
    pub video_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_summary: Option<String>,
    /// The works page the record was extracted from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl CandidateInput {
    /// Build an upsert input from a validated extraction item.
    pub fn from_extracted(
        item: &ExtractedItem,
        production_company: &str,
        source_url: &str,
        created_by: Option<&str>,
    ) -> Self {
        Self {
            company_name: item.client_name.trim().to_string(),
            production_company: production_company.to_string(),
            prefecture: item.prefecture.clone(),
            industry: item.industry.clone(),
            video_type: item.video_type.clone(),
            reference_url: item.reference_url.clone(),
            content_summary: item.description.clone(),
            source_url: Some(source_url.to_string()),
            created_by: created_by.map(String::from),
        }
    }
}

// ---------------------------------------------------------------------------
// AchievementCandidate
// ---------------------------------------------------------------------------

/// A persisted achievement candidate, a competitor's completed engagement
/// identified as a sales-attack target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementCandidate {
    /// Unique identifier (UUID v7).
    pub id: String,
    /// The end-client who commissioned the work.
    pub company_name: String,
    /// The competitor that produced the work.
    pub production_company: String,
    pub prefecture: String,
    pub industry: String,
    pub video_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// Flipped true exactly once by the conversion trigger; never reverts.
    pub is_processed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
