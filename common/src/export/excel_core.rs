//! Excel生成（共通ライブラリ）
//!
//! layout.rs の定義を使用して請求書1件につき1シートのブックを生成

use crate::error::Result;
use crate::layout::{
    COLUMN_WIDTHS, ITEM_HEADERS, ITEM_HEADER_ROW,
    LABEL_COMPANY, LABEL_FILE_NAME, LABEL_GRAND_TOTAL, LABEL_INVOICE_DATE,
    LABEL_INVOICE_NUMBER, LABEL_SUBTOTAL, LABEL_TAX_ID, LABEL_VAT,
    SHEET_TITLE, SUMMARY_LABEL_COL, SUMMARY_VALUE_COL,
};
use crate::sheet_name::SheetNamer;
use crate::types::InvoiceRecord;
use rust_xlsxwriter::*;

/// Excelをバッファに生成
///
/// # Arguments
/// * `entries` - (請求書, ラベル) の組。ラベルはファイル名行に表示する
///
/// # Returns
/// xlsxバイト列。シート名は請求書番号から決定（sheet_name.rs）
pub fn generate_invoice_workbook(entries: &[(&InvoiceRecord, &str)]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let mut namer = SheetNamer::new();

    let title_format = Format::new().set_bold().set_font_size(14.0);
    let label_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xF5F5F5));
    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xE0E7FF))
        .set_border(FormatBorder::Thin);

    for (index, (record, label)) in entries.iter().enumerate() {
        let sheet_name = namer.assign(&record.invoice_number, index);
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet_name)?;
        worksheet.set_right_to_left(true);

        for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
            worksheet.set_column_width(col as u16, *width)?;
        }

        worksheet.write_string_with_format(0, 0, SHEET_TITLE, &title_format)?;

        // メタ情報（行2〜6）
        let meta = [
            (LABEL_FILE_NAME, *label),
            (LABEL_COMPANY, record.company_name.as_str()),
            (LABEL_TAX_ID, record.tax_id.as_str()),
            (LABEL_INVOICE_NUMBER, record.invoice_number.as_str()),
            (LABEL_INVOICE_DATE, record.invoice_date.as_str()),
        ];
        for (offset, (name, value)) in meta.iter().enumerate() {
            let row = 2 + offset as u32;
            worksheet.write_string_with_format(row, 0, *name, &label_format)?;
            worksheet.write_string(row, 1, *value)?;
        }

        for (col, header) in ITEM_HEADERS.iter().enumerate() {
            worksheet.write_string_with_format(ITEM_HEADER_ROW, col as u16, *header, &header_format)?;
        }

        let mut row = ITEM_HEADER_ROW + 1;
        for item in &record.items {
            worksheet.write_string(row, 0, &item.name)?;
            let numbers = [item.quantity, item.unit_price, item.tax_or_zero(), item.total()];
            for (offset, value) in numbers.iter().enumerate() {
                worksheet.write_number(row, 1 + offset as u16, *value)?;
            }
            row += 1;
        }

        // 空行の後に集計3行
        row += 1;
        let summary = [
            (LABEL_SUBTOTAL, record.subtotal),
            (LABEL_VAT, record.tax),
            (LABEL_GRAND_TOTAL, record.total),
        ];
        for (name, value) in summary {
            worksheet.write_string_with_format(row, SUMMARY_LABEL_COL, name, &label_format)?;
            worksheet.write_number(row, SUMMARY_VALUE_COL, value)?;
            row += 1;
        }
    }

    Ok(workbook.save_to_buffer()?)
}
