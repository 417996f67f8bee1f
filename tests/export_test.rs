//! Excel出力の統合テスト
//!
//! 書き出したファイルを calamine で読み戻して検証する

use calamine::{open_workbook, Data, Reader, Xlsx};
use invoice_ai::error::InvoiceAiError;
use invoice_ai::export;
use invoice_ai::session::{FileReport, FileState, MergeOutcome, SessionReport};
use invoice_ai_common::{InvoiceLineItem, InvoiceRecord};
use tempfile::tempdir;

fn record(invoice_number: &str) -> InvoiceRecord {
    InvoiceRecord {
        company_name: "مؤسسة النخبة".to_string(),
        tax_id: "310122393500003".to_string(),
        invoice_number: invoice_number.to_string(),
        invoice_date: "2025-04-10".to_string(),
        subtotal: 30.0,
        tax: 2.0,
        total: 32.0,
        currency: "SAR".to_string(),
        items: vec![InvoiceLineItem {
            name: "حبر طابعة".to_string(),
            quantity: 3.0,
            unit_price: 10.0,
            item_tax: Some(2.0),
            item_total: None,
        }],
    }
}

fn file(name: &str, state: FileState) -> FileReport {
    FileReport {
        id: Default::default(),
        file_name: name.to_string(),
        file_path: None,
        mime_type: "image/jpeg".to_string(),
        state,
    }
}

#[test]
fn test_export_duplicate_invoice_numbers() {
    let dir = tempdir().expect("Failed to create temp dir");
    let records = [record("A1"), record("A1"), record("A1")];
    let entries: Vec<(&InvoiceRecord, &str)> = records.iter().map(|r| (r, "scan.jpg")).collect();

    let path = export::export_results(&entries, dir.path()).expect("Excel出力失敗");
    assert!(path.starts_with(dir.path()));
    assert!(path.file_name().unwrap().to_string_lossy().starts_with("Invoices_Analysis_"));

    let workbook: Xlsx<_> = open_workbook(&path).expect("xlsx読み込み失敗");
    assert_eq!(workbook.sheet_names(), vec!["A1", "A1 (1)", "A1 (2)"]);
}

#[test]
fn test_export_report_independent() {
    let dir = tempdir().expect("Failed to create temp dir");
    let output = dir.path().join("out.xlsx");
    let report = SessionReport {
        generated_at: String::new(),
        merge_mode: false,
        files: vec![
            file("a.jpg", FileState::Succeeded { record: Some(record("INV-1")) }),
            file("b.jpg", FileState::Failed { reason: "x".into() }),
            file("c.jpg", FileState::Succeeded { record: Some(record("")) }),
        ],
        combined: None,
    };

    let path = export::export_results(&report.export_entries(), &output).unwrap();
    assert_eq!(path, output);

    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    // 番号なしは位置ラベル（2件目の出力なので F2）
    assert_eq!(workbook.sheet_names(), vec!["INV-1", "F2"]);

    let range = workbook.worksheet_range("F2").unwrap();
    assert_eq!(range.get_value((2, 1)), Some(&Data::String("c.jpg".to_string())));
    assert_eq!(range.get_value((9, 4)), Some(&Data::Float(32.0)));
}

#[test]
fn test_export_report_merged_uses_combined_label() {
    let dir = tempdir().expect("Failed to create temp dir");
    let report = SessionReport {
        generated_at: String::new(),
        merge_mode: true,
        files: vec![
            file("p1.jpg", FileState::Succeeded { record: None }),
            file("p2.jpg", FileState::Succeeded { record: None }),
        ],
        combined: Some(MergeOutcome::Ready { record: record("M-7") }),
    };

    let path = export::export_results(&report.export_entries(), dir.path()).unwrap();
    let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
    assert_eq!(workbook.sheet_names(), vec!["M-7"]);

    let range = workbook.worksheet_range("M-7").unwrap();
    assert_eq!(
        range.get_value((2, 1)),
        Some(&Data::String("فاتورة_مجمعة".to_string()))
    );
}

#[test]
fn test_export_nothing_to_write() {
    let dir = tempdir().expect("Failed to create temp dir");
    let report = SessionReport {
        generated_at: String::new(),
        merge_mode: true,
        files: vec![file("p1.jpg", FileState::Failed { reason: "x".into() })],
        combined: Some(MergeOutcome::Failed { reason: "x".into() }),
    };

    let result = export::export_results(&report.export_entries(), dir.path());
    assert!(matches!(result, Err(InvoiceAiError::NoResults)));
}
