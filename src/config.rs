use crate::cloud::CloudDestination;
use crate::error::{InvoiceAiError, Result};
use invoice_ai_common::DEFAULT_HOME_CURRENCY;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_DRIVE_FOLDER: &str = "محلل الفواتير - Invoices";
pub const DEFAULT_DRIVE_SHEET: &str = "سجل الفواتير";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_seconds: u64,
    pub home_currency: String,
    pub drive_folder: String,
    pub drive_sheet: String,
    /// Google Cloud Console からダウンロードした OAuth クライアントJSON
    pub client_secret_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".into(),
            endpoint: DEFAULT_GEMINI_ENDPOINT.into(),
            timeout_seconds: 120,
            home_currency: DEFAULT_HOME_CURRENCY.into(),
            drive_folder: DEFAULT_DRIVE_FOLDER.into(),
            drive_sheet: DEFAULT_DRIVE_SHEET.into(),
            client_secret_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| InvoiceAiError::Config("لم يتم العثور على المجلد الرئيسي".into()))?;
        Ok(home.join(".config").join("invoice-ai"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// OAuthトークンの保存先
    pub fn token_cache_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("google-token.json"))
    }

    /// 抽出キャッシュの保存先
    pub fn extraction_cache_path() -> Result<PathBuf> {
        let base = dirs::cache_dir()
            .ok_or_else(|| InvoiceAiError::Config("لم يتم العثور على مجلد التخزين المؤقت".into()))?;
        Ok(base.join("invoice-ai").join("extraction-cache.json"))
    }

    pub fn get_api_key(&self) -> Result<String> {
        // 環境変数を優先
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.api_key.clone().ok_or(InvoiceAiError::MissingApiKey)
    }

    pub fn get_client_secret_path(&self) -> Result<PathBuf> {
        self.client_secret_path
            .clone()
            .ok_or(InvoiceAiError::MissingClientSecret)
    }

    pub fn destination(&self) -> CloudDestination {
        CloudDestination {
            folder: self.drive_folder.clone(),
            sheet: self.drive_sheet.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.home_currency, "SAR");
        assert_eq!(config.timeout_seconds, 120);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"apiKey": "k", "homeCurrency": "AED"}"#).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.home_currency, "AED");
        assert_eq!(config.drive_folder, DEFAULT_DRIVE_FOLDER);
        assert_eq!(config.drive_sheet, DEFAULT_DRIVE_SHEET);
    }

    #[test]
    fn test_destination_from_config() {
        let config = Config {
            drive_folder: "Invoices".into(),
            drive_sheet: "Ledger".into(),
            ..Default::default()
        };
        let destination = config.destination();
        assert_eq!(destination.folder, "Invoices");
        assert_eq!(destination.sheet, "Ledger");
    }
}
