//! Canned collaborators shared by the orchestrator tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use leadscout_discovery::{SearchHit, SearchProvider};
use leadscout_extraction::CompletionClient;
use leadscout_shared::Result;
use leadscout_storage::Storage;

/// Search provider answering every keyword query with the same fixed hits;
/// origin dedup collapses them to one candidate.
pub(crate) struct ScriptedSearch {
    hits: Vec<String>,
}

impl ScriptedSearch {
    /// One discoverable origin, hit via its works page link.
    pub(crate) fn origin(origin: &str) -> Self {
        Self {
            hits: vec![format!("{origin}/works")],
        }
    }

    /// Discovery that finds nothing.
    pub(crate) fn empty() -> Self {
        Self { hits: Vec::new() }
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, _query: &str, _count: u32) -> Result<Vec<SearchHit>> {
        Ok(self
            .hits
            .iter()
            .map(|u| SearchHit { url: u.clone() })
            .collect())
    }
}

/// Completion client returning one fixed reply and counting invocations.
pub(crate) struct CannedCompletion {
    reply: String,
    calls: AtomicUsize,
}

impl CannedCompletion {
    pub(crate) fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for CannedCompletion {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn model_id(&self) -> &str {
        "test-model"
    }
}

/// Create a temp file storage for testing.
pub(crate) async fn test_storage() -> Storage {
    let tmp = std::env::temp_dir().join(format!("ls_core_test_{}.db", uuid::Uuid::now_v7()));
    Storage::open(&tmp).await.expect("open test db")
}

/// A minimal competitor works page.
pub(crate) fn page_html() -> String {
    "<html><head><title>株式会社映像スタジオ｜制作実績</title></head>\
     <body><main><h1>制作実績</h1>\
     <p>株式会社山田食品様 会社紹介動画（神奈川県）</p></main></body></html>"
        .to_string()
}
