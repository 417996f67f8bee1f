//! クラウド保存（Google Drive + Google Sheets）
//!
//! 1件の保存 = フォルダ確保 → 画像アップロード → 台帳確保 → 行追加。
//! トランザクションではないため、途中で失敗しても作成済みのものは残る。

mod auth;
mod google;

pub use auth::{CloudSession, SCOPES};
pub use google::GoogleWorkspace;

use crate::error::{InvoiceAiError, Result};
use crate::scanner::ImagePayload;
use async_trait::async_trait;
use invoice_ai_common::InvoiceRecord;
use serde_json::{json, Value};
use tracing::info;

/// 保存先（フォルダ名・台帳名は完全一致で検索）
#[derive(Debug, Clone, PartialEq)]
pub struct CloudDestination {
    pub folder: String,
    pub sheet: String,
}

#[async_trait]
pub trait CloudStore: Send + Sync {
    /// フォルダを検索し、なければ作成してIDを返す
    async fn ensure_folder(&self, name: &str) -> Result<String>;

    /// 画像をフォルダにアップロードして共有リンクを返す
    async fn upload_file(&self, image: &ImagePayload, folder_id: &str) -> Result<String>;

    /// フォルダ内の台帳を検索し、なければヘッダー行付きで作成してIDを返す
    async fn ensure_sheet(&self, folder_id: &str, name: &str) -> Result<String>;

    async fn append_row(&self, sheet_id: &str, row: &[Value]) -> Result<()>;
}

/// 台帳1行（ヘッダーは layout::CLOUD_SHEET_HEADERS）
pub fn ledger_row(file_name: &str, image_link: &str, record: &InvoiceRecord) -> Vec<Value> {
    vec![
        json!(file_name),
        json!(image_link),
        json!(record.company_name),
        json!(record.tax_id),
        json!(record.invoice_number),
        json!(record.invoice_date),
        json!(record.subtotal),
        json!(record.tax),
        json!(record.total),
    ]
}

fn as_cloud_error(error: InvoiceAiError) -> InvoiceAiError {
    match error {
        InvoiceAiError::CloudSync(_) => error,
        other => InvoiceAiError::CloudSync(other.to_string()),
    }
}

/// 請求書1件を保存し、画像の共有リンクを返す
///
/// どの段階の失敗も `CloudSync` として返し、以降の段階は実行しない
pub async fn save_invoice<S: CloudStore + ?Sized>(
    store: &S,
    destination: &CloudDestination,
    image: &ImagePayload,
    record: &InvoiceRecord,
) -> Result<String> {
    let folder_id = store.ensure_folder(&destination.folder).await.map_err(as_cloud_error)?;
    let link = store.upload_file(image, &folder_id).await.map_err(as_cloud_error)?;
    let sheet_id = store
        .ensure_sheet(&folder_id, &destination.sheet)
        .await
        .map_err(as_cloud_error)?;

    let row = ledger_row(&image.file_name, &link, record);
    store.append_row(&sheet_id, &row).await.map_err(as_cloud_error)?;

    info!(file = %image.file_name, "saved to Google Drive");
    Ok(link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_row_column_order() {
        let record = InvoiceRecord {
            company_name: "شركة".into(),
            tax_id: "300".into(),
            invoice_number: "7".into(),
            invoice_date: "2025-01-01".into(),
            subtotal: 100.0,
            tax: 15.0,
            total: 115.0,
            ..Default::default()
        };

        let row = ledger_row("a.jpg", "https://drive/x", &record);
        assert_eq!(row.len(), invoice_ai_common::layout::CLOUD_SHEET_HEADERS.len());
        assert_eq!(row[0], "a.jpg");
        assert_eq!(row[1], "https://drive/x");
        assert_eq!(row[2], "شركة");
        assert_eq!(row[5], "2025-01-01");
        assert_eq!(row[8], 115.0);
    }

    #[test]
    fn test_non_cloud_errors_wrapped() {
        let err = as_cloud_error(InvoiceAiError::NotAuthorized);
        assert!(matches!(err, InvoiceAiError::CloudSync(_)));
    }
}
