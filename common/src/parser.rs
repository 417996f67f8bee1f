//! APIレスポンスパーサー
//!
//! GeminiのレスポンスからJSONオブジェクトを抽出し、
//! InvoiceRecordとしてパースする

use crate::error::{Error, Result};
use crate::types::InvoiceRecord;

/// APIレスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. エラー
///
/// # Examples
/// ```
/// use invoice_ai_common::extract_json;
///
/// let response = "{\"companyName\": \"x\"}";
/// let json = extract_json(response).unwrap();
/// assert!(json.contains("companyName"));
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    // ```json ... ``` ブロックを探す
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    // 生の {...} を探す
    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSONが見つかりません".into()))
}

/// 抽出レスポンスをパース
///
/// # Returns
/// * `Ok(InvoiceRecord)` - パース成功（スキーマ必須項目あり）
/// * `Err` - 空レスポンス、JSONなし、スキーマ不一致
pub fn parse_invoice_response(response: &str) -> Result<InvoiceRecord> {
    if response.trim().is_empty() {
        return Err(Error::Parse("レスポンスが空です".into()));
    }
    let json_str = extract_json(response)?;
    let record: InvoiceRecord = serde_json::from_str(json_str.trim())?;
    Ok(record)
}
