//! Google OAuth セッション
//!
//! アクセストークンはこの値だけが保持する（グローバル状態なし）。
//! `invalidate()` で破棄、`logout()` で保存済みトークンも削除する。

use crate::error::{InvoiceAiError, Result};
use std::fmt;
use std::path::Path;
use tracing::info;
use yup_oauth2::{InstalledFlowAuthenticator, InstalledFlowReturnMethod};

/// Drive（アプリ作成ファイルのみ）と Sheets
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive.file",
    "https://www.googleapis.com/auth/spreadsheets",
];

#[derive(Clone, Default)]
pub struct CloudSession {
    access_token: Option<String>,
}

impl fmt::Debug for CloudSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudSession")
            .field("authorized", &self.is_authorized())
            .finish()
    }
}

impl CloudSession {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
        }
    }

    /// インストールアプリ方式のOAuthフローでトークンを取得
    ///
    /// 初回はブラウザで同意画面を開く。以降は `token_cache` のトークンを再利用・更新する
    pub async fn authorize(client_secret: &Path, token_cache: &Path) -> Result<Self> {
        let secret = yup_oauth2::read_application_secret(client_secret)
            .await
            .map_err(|e| InvoiceAiError::Config(format!("{}: {}", client_secret.display(), e)))?;

        if let Some(parent) = token_cache.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let auth = InstalledFlowAuthenticator::builder(secret, InstalledFlowReturnMethod::HTTPRedirect)
            .persist_tokens_to_disk(token_cache.to_path_buf())
            .build()
            .await
            .map_err(|e| InvoiceAiError::CloudSync(format!("OAuth: {}", e)))?;

        let token = auth
            .token(SCOPES)
            .await
            .map_err(|e| InvoiceAiError::CloudSync(format!("OAuth: {}", e)))?;
        let access_token = token.token().ok_or(InvoiceAiError::NotAuthorized)?;

        info!("Google account connected");
        Ok(Self::with_token(access_token))
    }

    pub fn is_authorized(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn access_token(&self) -> Result<&str> {
        self.access_token
            .as_deref()
            .ok_or(InvoiceAiError::NotAuthorized)
    }

    pub fn invalidate(&mut self) {
        self.access_token = None;
    }

    /// トークンを破棄し、保存済みトークンファイルを削除（削除した場合 true）
    pub fn logout(&mut self, token_cache: &Path) -> Result<bool> {
        self.invalidate();
        if token_cache.exists() {
            std::fs::remove_file(token_cache)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_invalidate_drops_token() {
        let mut session = CloudSession::with_token("ya29.token");
        assert_eq!(session.access_token().unwrap(), "ya29.token");

        session.invalidate();
        assert!(!session.is_authorized());
        assert!(matches!(session.access_token(), Err(InvoiceAiError::NotAuthorized)));
    }

    #[test]
    fn test_debug_hides_token() {
        let session = CloudSession::with_token("secret-value");
        let debug = format!("{:?}", session);
        assert!(!debug.contains("secret-value"));
        assert!(debug.contains("authorized: true"));
    }

    #[test]
    fn test_logout_removes_token_cache() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("google-token.json");
        std::fs::write(&cache, "[]").unwrap();

        let mut session = CloudSession::with_token("t");
        assert!(session.logout(&cache).unwrap());
        assert!(!cache.exists());
        assert!(!session.is_authorized());
        assert!(!session.logout(&cache).unwrap());
    }
}
