pub mod excel;

use crate::error::{InvoiceAiError, Result};
use invoice_ai_common::InvoiceRecord;
use std::path::{Path, PathBuf};

/// 既定の出力ファイル名（ローカル日付）
pub fn default_file_name() -> String {
    format!(
        "Invoices_Analysis_{}.xlsx",
        chrono::Local::now().format("%Y-%m-%d")
    )
}

/// 出力先の解決
///
/// ディレクトリまたは拡張子なしのパスなら既定ファイル名を付ける
fn output_path(output: &Path) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(default_file_name())
    } else {
        output.to_path_buf()
    }
}

/// 解析結果をExcelに出力し、書き出したパスを返す
pub fn export_results(entries: &[(&InvoiceRecord, &str)], output: &Path) -> Result<PathBuf> {
    if entries.is_empty() {
        return Err(InvoiceAiError::NoResults);
    }

    let output_path = output_path(output);
    println!("- جاري إنشاء ملف Excel... ({} فاتورة)", entries.len());
    excel::generate_excel(entries, &output_path)?;
    println!("✔ تم حفظ ملف Excel: {}", output_path.display());

    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_file_name_has_date() {
        let name = default_file_name();
        assert!(name.starts_with("Invoices_Analysis_"));
        assert!(name.ends_with(".xlsx"));
        // Invoices_Analysis_YYYY-MM-DD.xlsx
        assert_eq!(name.len(), "Invoices_Analysis_".len() + 10 + ".xlsx".len());
    }

    #[test]
    fn test_output_path_directory() {
        let dir = tempdir().unwrap();
        let path = output_path(dir.path());
        assert_eq!(path.parent().unwrap(), dir.path());
        assert!(path.to_string_lossy().ends_with(".xlsx"));
    }

    #[test]
    fn test_output_path_explicit_file() {
        let path = output_path(Path::new("/tmp/out/my.xlsx"));
        assert_eq!(path, PathBuf::from("/tmp/out/my.xlsx"));
    }

    #[test]
    fn test_export_without_entries() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            export_results(&[], dir.path()),
            Err(InvoiceAiError::NoResults)
        ));
    }
}
