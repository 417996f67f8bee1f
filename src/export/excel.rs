//! Excel生成（CLI版）
//!
//! ワークブックの組み立ては invoice-ai-common 側（rust_xlsxwriter）で行い、
//! ここではファイルへの書き出しだけを担当する

use crate::error::{InvoiceAiError, Result};
use invoice_ai_common::{generate_invoice_workbook, InvoiceRecord};
use std::path::Path;
use tracing::debug;

pub fn generate_excel(entries: &[(&InvoiceRecord, &str)], output_path: &Path) -> Result<()> {
    let buffer = generate_invoice_workbook(entries)
        .map_err(|e| InvoiceAiError::ExcelGeneration(e.to_string()))?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output_path, &buffer)?;
    debug!(path = %output_path.display(), bytes = buffer.len(), "workbook written");

    Ok(())
}
