//! 抽出キャッシュのテスト
//!
//! キャッシュを被せた抽出器をセッションから使う

use async_trait::async_trait;
use invoice_ai::analyzer::{CacheFile, CachedExtractor, InvoiceExtractor};
use invoice_ai::error::Result;
use invoice_ai::scanner::ImagePayload;
use invoice_ai::session::SessionState;
use invoice_ai_common::InvoiceRecord;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

struct CountingExtractor {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl InvoiceExtractor for CountingExtractor {
    async fn extract(&self, pages: &[&ImagePayload]) -> Result<InvoiceRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(InvoiceRecord {
            company_name: pages[0].file_name.clone(),
            total: 1.0,
            ..Default::default()
        })
    }
}

fn payload(name: &str, data: &[u8]) -> ImagePayload {
    ImagePayload::new(name, "image/png", data.to_vec())
}

/// 空のキャッシュファイル
#[test]
fn test_cache_file_missing() {
    let dir = tempdir().expect("Failed to create temp dir");
    let cache = CacheFile::load(&dir.path().join("cache.json"));
    assert!(cache.is_empty());
}

/// 同じ画像を取り込み直しても再解析しない
#[tokio::test]
async fn test_reset_and_readd_uses_cache() {
    let dir = tempdir().expect("Failed to create temp dir");
    let cache_path = dir.path().join("cache.json");
    let calls = Arc::new(AtomicUsize::new(0));
    let extractor = CachedExtractor::open(
        CountingExtractor { calls: calls.clone() },
        cache_path.clone(),
    );

    let mut session = SessionState::new();
    session
        .add_files(vec![payload("a.png", b"aaa"), payload("b.png", b"bbb")])
        .unwrap();
    session.analyze(&extractor).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    session.reset().unwrap();
    session
        .add_files(vec![payload("a-copy.png", b"aaa"), payload("new.png", b"ccc")])
        .unwrap();
    let summary = session.analyze(&extractor).await.unwrap();

    // 抽出呼び出しとしては2回だが、実際の解析は新しい画像の1回のみ
    assert_eq!(summary.calls, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        session.files()[0].state.record().unwrap().company_name,
        "a.png"
    );
    assert_eq!(CacheFile::load(&cache_path).len(), 3);
}

/// キャッシュは別プロセス（別インスタンス）からも使える
#[tokio::test]
async fn test_cache_persists_between_instances() {
    let dir = tempdir().expect("Failed to create temp dir");
    let cache_path = dir.path().join("nested").join("cache.json");
    let calls = Arc::new(AtomicUsize::new(0));

    let first = CachedExtractor::open(CountingExtractor { calls: calls.clone() }, cache_path.clone());
    let page = payload("a.png", b"aaa");
    first.extract(&[&page]).await.unwrap();

    let second = CachedExtractor::open(CountingExtractor { calls: calls.clone() }, cache_path.clone());
    second.extract(&[&page]).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(CacheFile::clear(&cache_path).unwrap());
    assert!(!cache_path.exists());
}
