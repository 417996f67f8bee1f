//! セッションレポート（JSON）
//!
//! analyze の結果を保存し、後続の export / upload / --resume で読み戻す。

use super::{FileId, FileState, MergeOutcome};
use crate::error::{InvoiceAiError, Result};
use crate::scanner::ImagePayload;
use invoice_ai_common::layout::COMBINED_LABEL;
use invoice_ai_common::InvoiceRecord;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub generated_at: String,
    pub merge_mode: bool,
    pub files: Vec<FileReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined: Option<MergeOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub id: FileId,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    pub mime_type: String,
    pub state: FileState,
}

impl FileReport {
    /// 記録されたパスから画像を読み直す
    pub fn load_payload(&self) -> Result<ImagePayload> {
        let path = self
            .file_path
            .as_ref()
            .ok_or_else(|| InvoiceAiError::FileNotFound(self.file_name.clone()))?;
        let mut payload = ImagePayload::load(path)?;
        payload.file_name = self.file_name.clone();
        Ok(payload)
    }
}

impl SessionReport {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(InvoiceAiError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Excel出力対象（統合モードは統合結果1件、それ以外は成功ファイルごと）
    pub fn export_entries(&self) -> Vec<(&InvoiceRecord, &str)> {
        if self.merge_mode {
            return match &self.combined {
                Some(MergeOutcome::Ready { record }) => vec![(record, COMBINED_LABEL)],
                _ => Vec::new(),
            };
        }

        self.files
            .iter()
            .filter_map(|f| f.state.record().map(|r| (r, f.file_name.as_str())))
            .collect()
    }
}
