//! The fixed extraction contract sent to the completion service.

use leadscout_shared::{INDUSTRIES, UNKNOWN_PREFECTURE, VIDEO_TYPES};

/// Build the extraction contract for one sanitized works page.
///
/// The contract pins down everything the defensive parser relies on:
/// taxonomy-restricted labels, the explicit unknown-prefecture sentinel,
/// skip-don't-fabricate for ambiguous client names, and pure JSON array
/// output with no surrounding prose.
pub fn build_extraction_prompt(text: &str, source_company: &str, source_url: &str) -> String {
    let industries = INDUSTRIES.join("、");
    let video_types = VIDEO_TYPES.join("、");

    format!(
        "あなたは映像制作会社の実績ページから取引実績を抽出するアシスタントです。\n\
         以下は映像制作会社「{source_company}」({source_url}) の制作実績ページの本文です。\n\
         このページに記載されている「発注したクライアント企業」を抽出してください。\n\
         \n\
         ルール:\n\
         - industry は次の分類から必ず選ぶこと: {industries}\n\
         - videoType は次の分類から必ず選ぶこと: {video_types}\n\
         - prefecture はクライアント企業の所在都道府県を正規化して記載し、\
         判別できない場合は「{UNKNOWN_PREFECTURE}」とすること\n\
         - クライアント企業名が曖昧・不明な実績は捏造せずスキップすること\n\
         - 出力は次のキーを持つ JSON 配列のみとし、前後に説明文を付けないこと: \
         clientName, prefecture, industry, videoType, description, referenceUrl\n\
         - 該当する実績がない場合は [] を返すこと\n\
         \n\
         ページ本文:\n\
         {text}"
    )
}
