//! 抽出結果キャッシュモジュール
//!
//! ページ画像のSHA-256をキーにして抽出結果をキャッシュし、
//! 同じ画像の再抽出をスキップする。

use super::InvoiceExtractor;
use crate::error::Result;
use crate::scanner::ImagePayload;
use async_trait::async_trait;
use invoice_ai_common::InvoiceRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// キャッシュファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheFile {
    /// バージョン（互換性チェック用）
    version: u32,
    /// ページハッシュ → 抽出結果のマップ
    entries: HashMap<String, CacheEntry>,
}

/// キャッシュエントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// ページのファイル名（表示用）
    pub file_names: Vec<String>,
    pub record: InvoiceRecord,
}

impl CacheFile {
    const CURRENT_VERSION: u32 = 1;

    /// キャッシュファイルを読み込み（存在しない・壊れている場合は空）
    pub fn load(path: &Path) -> Self {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(_) => return Self::default(),
        };

        match serde_json::from_reader::<_, CacheFile>(BufReader::new(file)) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(_) => {
                warn!(path = %path.display(), "cache version mismatch, starting fresh");
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable cache, starting fresh");
                Self::default()
            }
        }
    }

    /// キャッシュファイルを保存
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// キャッシュファイルを削除（存在した場合 true）
    pub fn clear(path: &Path) -> Result<bool> {
        if path.exists() {
            std::fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn get(&self, key: &str) -> Option<&InvoiceRecord> {
        self.entries.get(key).map(|e| &e.record)
    }

    pub fn insert(&mut self, key: String, file_names: Vec<String>, record: InvoiceRecord) {
        self.entries.insert(key, CacheEntry { file_names, record });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CacheFile {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// ページ列のキャッシュキー（順序・MIMEタイプも含める）
pub fn cache_key(pages: &[&ImagePayload]) -> String {
    let mut hasher = Sha256::new();
    for page in pages {
        hasher.update(page.mime_type.as_bytes());
        hasher.update([0u8]);
        hasher.update((page.data.len() as u64).to_le_bytes());
        hasher.update(&page.data);
    }
    hex::encode(hasher.finalize())
}

/// 任意の抽出クライアントにキャッシュを被せる
pub struct CachedExtractor<E> {
    inner: E,
    path: PathBuf,
    cache: Mutex<CacheFile>,
}

impl<E: InvoiceExtractor> CachedExtractor<E> {
    pub fn open(inner: E, path: PathBuf) -> Self {
        let cache = CacheFile::load(&path);
        Self {
            inner,
            path,
            cache: Mutex::new(cache),
        }
    }

    fn lookup(&self, key: &str) -> Option<InvoiceRecord> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    fn store(&self, key: String, pages: &[&ImagePayload], record: &InvoiceRecord) {
        let Ok(mut cache) = self.cache.lock() else {
            return;
        };
        let names = pages.iter().map(|p| p.file_name.clone()).collect();
        cache.insert(key, names, record.clone());
        if let Err(e) = cache.save(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to save extraction cache");
        }
    }
}

#[async_trait]
impl<E: InvoiceExtractor> InvoiceExtractor for CachedExtractor<E> {
    async fn extract(&self, pages: &[&ImagePayload]) -> Result<InvoiceRecord> {
        let key = cache_key(pages);
        if let Some(record) = self.lookup(&key) {
            debug!(pages = pages.len(), "extraction cache hit");
            return Ok(record);
        }

        // 失敗はキャッシュしない
        let record = self.inner.extract(pages).await?;
        self.store(key, pages, &record);
        Ok(record)
    }
}
