//! 共通ライブラリのエラー
//!
//! - Parse: モデル応答からJSONを取り出せない
//! - Schema: JSONが請求書スキーマに合わない
//! - Excel: ワークブック生成の失敗

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("応答解析エラー: {0}")]
    Parse(String),

    #[error("請求書スキーマ不一致: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("Excel生成エラー: {0}")]
    Excel(String),
}

#[cfg(feature = "excel")]
impl From<rust_xlsxwriter::XlsxError> for Error {
    fn from(error: rust_xlsxwriter::XlsxError) -> Self {
        Error::Excel(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Schema(_)));
        assert!(error.to_string().starts_with("請求書スキーマ不一致"));
    }

    #[test]
    fn test_parse_display() {
        let error = Error::Parse("JSONが見つかりません".to_string());
        assert_eq!(error.to_string(), "応答解析エラー: JSONが見つかりません");
    }

    #[cfg(feature = "excel")]
    #[test]
    fn test_excel_error_from_xlsx() {
        let error: Error = rust_xlsxwriter::XlsxError::ParameterError("列幅".to_string()).into();
        assert!(matches!(error, Error::Excel(_)));
    }
}
