//! 請求書抽出クライアント
//!
//! 画像（1枚または同一請求書の複数ページ）を受け取り InvoiceRecord を返す。
//! 失敗の詳細はログに残し、呼び出し側には利用者向けの文言だけを返す。

pub mod cache;
mod gemini;

pub use cache::{CacheFile, CachedExtractor};
pub use gemini::GeminiExtractor;

use crate::error::Result;
use crate::scanner::ImagePayload;
use async_trait::async_trait;
use invoice_ai_common::InvoiceRecord;

/// 抽出失敗時の利用者向けメッセージ
pub const EXTRACTION_FAILED_MESSAGE: &str = "فشل في تحليل الفاتورة. يرجى التأكد من وضوح الصورة.";

#[async_trait]
pub trait InvoiceExtractor: Send + Sync {
    /// 1回の抽出呼び出し
    ///
    /// `pages` が複数の場合は1件の請求書の各ページとして順に送信する
    async fn extract(&self, pages: &[&ImagePayload]) -> Result<InvoiceRecord>;
}
