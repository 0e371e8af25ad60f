//! Structured achievement extraction from sanitized page text.
//!
//! The completion service is handed a fixed extraction contract and its
//! free-text reply is treated as an untrusted, schema-less blob: code fences
//! are stripped, the first `[` .. last `]` slice is parsed, and any failure
//! yields an empty item list. This is the only pipeline stage permitted to
//! silently degrade to "no items", and the only one with unbounded
//! latency/cost variance, which is why repeated sweeps consult a prompt-hash
//! cache before calling out.

pub mod client;
pub mod prompt;
pub mod region;

use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use leadscout_shared::{ExtractedItem, Result};

pub use client::{CompletionClient, HttpCompletionClient};
pub use prompt::build_extraction_prompt;
pub use region::matches_region;

/// Validated output of one extraction call.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Items that survived validation.
    pub items: Vec<ExtractedItem>,
    /// Items dropped for a missing client name; ambiguous extractions are
    /// discarded, never defaulted.
    pub rejected: usize,
}

/// Run one extraction call against the completion collaborator.
///
/// A transport-level failure of the call itself is returned as an error so
/// callers can decide (the sweep skips the origin, the interactive path
/// surfaces it). Malformed *output* is not an error: it parses to zero items.
#[instrument(skip_all, fields(source_company = %source_company, source_url = %source_url))]
pub async fn extract_achievements(
    completion: &dyn CompletionClient,
    text: &str,
    source_company: &str,
    source_url: &str,
    max_tokens: u32,
) -> Result<Extraction> {
    let prompt = build_extraction_prompt(text, source_company, source_url);
    let raw = completion.complete(&prompt, max_tokens).await?;
    Ok(validate_items(parse_extraction(&raw)))
}

/// Defensively parse completion output into extraction items.
///
/// Strips code-fence markers, slices the first `[` through the last `]`, and
/// attempts a JSON parse. Any parse failure or absence of array delimiters
/// yields an empty list; this function never errors on malformed output.
pub fn parse_extraction(raw: &str) -> Vec<ExtractedItem> {
    let unfenced = strip_code_fences(raw);

    let (start, end) = match (unfenced.find('['), unfenced.rfind(']')) {
        (Some(start), Some(end)) if end > start => (start, end),
        _ => {
            debug!("no JSON array delimiters in completion output");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<ExtractedItem>>(&unfenced[start..=end]) {
        Ok(items) => items,
        Err(e) => {
            warn!(error = %e, "completion output failed to parse, treating as zero items");
            Vec::new()
        }
    }
}

/// Drop items with an empty client name, counting the rejects.
pub fn validate_items(items: Vec<ExtractedItem>) -> Extraction {
    let mut extraction = Extraction::default();
    for item in items {
        if item.has_client_name() {
            extraction.items.push(item);
        } else {
            debug!("dropping extraction item with empty clientName");
            extraction.rejected += 1;
        }
    }
    extraction
}

/// Strip markdown code-fence markers if the reply is wrapped in one.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Skip an optional language tag on the opening fence line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Cache key for one extraction call: hash of the full prompt plus model id.
pub fn prompt_hash(prompt: &str, model_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(model_id.as_bytes());
    format!("{:x}", hasher.finalize())
}
