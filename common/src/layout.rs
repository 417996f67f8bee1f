//! レイアウト設定モジュール
//!
//! 請求書シートの行構成・列幅・ラベル（アラビア語表示）

/// シートタイトル
pub const SHEET_TITLE: &str = "تفاصيل الفاتورة الإلكترونية";

/// 列幅（Excel文字幅単位）: 品名, 数量, 単価, 税額, 合計
pub const COLUMN_WIDTHS: [f64; 5] = [35.0, 10.0, 15.0, 15.0, 20.0];

/// メタ情報ラベル（A列ラベル・B列値）
pub const LABEL_FILE_NAME: &str = "اسم الملف";
pub const LABEL_COMPANY: &str = "اسم الشركة";
pub const LABEL_TAX_ID: &str = "الرقم الضريبي";
pub const LABEL_INVOICE_NUMBER: &str = "رقم الفاتورة";
pub const LABEL_INVOICE_DATE: &str = "تاريخ الفاتورة";

/// 明細ヘッダー
pub const ITEM_HEADERS: [&str; 5] = ["الصنف", "الكمية", "سعر الوحدة", "الضريبة", "الإجمالي"];

/// 集計ラベル（D列ラベル・E列値）
pub const LABEL_SUBTOTAL: &str = "الإجمالي قبل الضريبة";
pub const LABEL_VAT: &str = "ضريبة القيمة المضافة";
pub const LABEL_GRAND_TOTAL: &str = "الإجمالي النهائي";

/// 集計ラベル・値の列
pub const SUMMARY_LABEL_COL: u16 = 3;
pub const SUMMARY_VALUE_COL: u16 = 4;

/// 明細ヘッダー行（0始まり）
pub const ITEM_HEADER_ROW: u32 = 8;

/// 結合請求書のエクスポートラベル
pub const COMBINED_LABEL: &str = "فاتورة_مجمعة";

/// クラウド台帳のヘッダー行
///
/// ファイル名, 画像リンク, 会社名, 税番号, 請求書番号, 日付, 税抜合計, 税額, 合計
pub const CLOUD_SHEET_HEADERS: [&str; 9] = [
    "اسم الملف",
    "رابط الصورة",
    "اسم الشركة",
    "الرقم الضريبي",
    "رقم الفاتورة",
    "التاريخ",
    "الإجمالي قبل الضريبة",
    "الضريبة",
    "الإجمالي النهائي",
];
