//! シート名の決定
//!
//! 請求書番号（なければ位置ラベル `F{n}`）から禁止文字を除き30文字に切り詰め、
//! 同一ブック内の重複には ` (1)`, ` (2)` ... を付与する。
//! 入力列が同じなら結果も同じで、重複は発生しない。

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

/// 切り詰め後の最大文字数
pub const MAX_SHEET_NAME_CHARS: usize = 30;

/// xlsx形式のシート名上限
const XLSX_SHEET_NAME_LIMIT: usize = 31;

lazy_static! {
    static ref FORBIDDEN_CHARS: Regex = Regex::new(r"[:\\/?*\[\]]").unwrap();
}

/// 位置ラベル（`index` は0始まり）
pub fn positional_label(index: usize) -> String {
    format!("F{}", index + 1)
}

/// 重複処理前のシート名
pub fn base_sheet_name(invoice_number: &str, index: usize) -> String {
    let fallback = positional_label(index);
    let source = if invoice_number.trim().is_empty() {
        fallback.as_str()
    } else {
        invoice_number
    };

    let cleaned = FORBIDDEN_CHARS.replace_all(source, "");
    let truncated: String = cleaned
        .trim_matches('\'')
        .chars()
        .take(MAX_SHEET_NAME_CHARS)
        .collect();
    let truncated = truncated.trim_end_matches('\'');

    if truncated.trim().is_empty() {
        fallback
    } else {
        truncated.to_string()
    }
}

/// ブック内のシート名割り当て
#[derive(Debug, Default)]
pub struct SheetNamer {
    used: HashSet<String>,
}

impl SheetNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 請求書番号から一意なシート名を割り当てる
    pub fn assign(&mut self, invoice_number: &str, index: usize) -> String {
        let base = base_sheet_name(invoice_number, index);
        let mut candidate = base.clone();
        let mut counter = 1;

        while self.is_taken(&candidate) {
            let suffix = format!(" ({})", counter);
            let room = XLSX_SHEET_NAME_LIMIT - suffix.chars().count();
            let stem: String = base.chars().take(room).collect();
            candidate = format!("{}{}", stem, suffix);
            counter += 1;
        }

        self.used.insert(candidate.to_lowercase());
        candidate
    }

    fn is_taken(&self, name: &str) -> bool {
        let key = name.to_lowercase();
        // Excelの予約名
        key == "history" || self.used.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_get_counter() {
        let mut namer = SheetNamer::new();
        let names: Vec<String> = (0..3).map(|i| namer.assign("A1", i)).collect();
        assert_eq!(names, vec!["A1", "A1 (1)", "A1 (2)"]);
    }

    #[test]
    fn test_duplicate_check_ignores_case() {
        let mut namer = SheetNamer::new();
        assert_eq!(namer.assign("inv-1", 0), "inv-1");
        assert_eq!(namer.assign("INV-1", 1), "INV-1 (1)");
    }

    #[test]
    fn test_fallback_to_position() {
        let mut namer = SheetNamer::new();
        assert_eq!(namer.assign("", 0), "F1");
        assert_eq!(namer.assign("  ", 4), "F5");
    }

    #[test]
    fn test_forbidden_chars_stripped() {
        assert_eq!(base_sheet_name("INV/2025:01*[A]?", 0), "INV202501A");
        assert_eq!(base_sheet_name("'quoted'", 0), "quoted");
    }

    #[test]
    fn test_only_forbidden_chars_falls_back() {
        assert_eq!(base_sheet_name("///", 2), "F3");
    }

    #[test]
    fn test_truncated_to_30_chars() {
        let long = "فاتورة-رقم-1234567890-1234567890-XYZ";
        let name = base_sheet_name(long, 0);
        assert_eq!(name.chars().count(), MAX_SHEET_NAME_CHARS);
        assert!(long.starts_with(&name));
    }

    #[test]
    fn test_suffix_keeps_xlsx_limit() {
        let long = "X".repeat(40);
        let mut namer = SheetNamer::new();
        let first = namer.assign(&long, 0);
        let second = namer.assign(&long, 1);
        assert_eq!(first.chars().count(), 30);
        assert!(second.ends_with(" (1)"));
        assert!(second.chars().count() <= 31);
        assert_ne!(first, second);
    }

    #[test]
    fn test_suffixed_name_already_used() {
        let mut namer = SheetNamer::new();
        assert_eq!(namer.assign("A1 (1)", 0), "A1 (1)");
        assert_eq!(namer.assign("A1", 1), "A1");
        assert_eq!(namer.assign("A1", 2), "A1 (2)");
    }

    #[test]
    fn test_reserved_history_name() {
        let mut namer = SheetNamer::new();
        assert_eq!(namer.assign("History", 0), "History (1)");
    }
}
