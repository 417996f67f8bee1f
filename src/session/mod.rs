//! 請求書スキャンセッション
//!
//! 取り込んだファイルの状態管理と解析の実行を担当する。
//! 状態は3系統: ファイルごとの解析状態、統合（複数ページ）結果、クラウド保存状態。
//!
//! # 動作モード
//! - 個別モード: 未解析・失敗ファイルだけを1件ずつ順番に解析する
//! - 統合モード: 全ファイルを1件の請求書のページとして1回で解析する

mod events;
mod report;

pub use events::SessionEvent;
pub use report::{FileReport, SessionReport};

use crate::analyzer::InvoiceExtractor;
use crate::cloud::{save_invoice, CloudDestination, CloudStore};
use crate::error::{InvoiceAiError, Result};
use crate::scanner::ImagePayload;
use invoice_ai_common::layout::COMBINED_LABEL;
use invoice_ai_common::InvoiceRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 256;

/// 取り込みごとに採番されるファイルID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ファイルの解析状態
///
/// 結果・失敗理由は状態と同じ値に入っているので、食い違った組み合わせは作れない
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileState {
    Pending,
    InProgress,
    /// 統合モードではページ単位の結果を持たない（`record: None`）
    Succeeded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        record: Option<InvoiceRecord>,
    },
    Failed {
        reason: String,
    },
}

impl FileState {
    pub fn status(&self) -> FileStatus {
        match self {
            FileState::Pending => FileStatus::Pending,
            FileState::InProgress => FileStatus::InProgress,
            FileState::Succeeded { .. } => FileStatus::Succeeded,
            FileState::Failed { .. } => FileStatus::Failed,
        }
    }

    pub fn record(&self) -> Option<&InvoiceRecord> {
        match self {
            FileState::Succeeded { record } => record.as_ref(),
            _ => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            FileState::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

/// 統合モードの結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MergeOutcome {
    Ready { record: InvoiceRecord },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CloudSaveState {
    #[default]
    Idle,
    Saving,
    Saved,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct TrackedFile {
    pub id: FileId,
    pub payload: ImagePayload,
    pub state: FileState,
}

impl TrackedFile {
    fn needs_analysis(&self) -> bool {
        matches!(self.state, FileState::Pending | FileState::Failed { .. })
    }
}

/// analyze の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalyzeSummary {
    /// 抽出呼び出し回数
    pub calls: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloudUnitOutcome {
    pub file_name: String,
    /// 成功時は画像の共有リンク、失敗時は理由
    pub result: std::result::Result<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloudSaveReport {
    pub units: Vec<CloudUnitOutcome>,
}

impl CloudSaveReport {
    pub fn saved(&self) -> usize {
        self.units.iter().filter(|u| u.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.units.len() - self.saved()
    }
}

pub struct SessionState {
    files: Vec<TrackedFile>,
    merge_mode: bool,
    combined: Option<MergeOutcome>,
    busy: bool,
    cloud_save: CloudSaveState,
    events: broadcast::Sender<SessionEvent>,
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("files", &self.files)
            .field("merge_mode", &self.merge_mode)
            .field("combined", &self.combined)
            .field("busy", &self.busy)
            .field("cloud_save", &self.cloud_save)
            .finish()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            files: Vec::new(),
            merge_mode: false,
            combined: None,
            busy: false,
            cloud_save: CloudSaveState::Idle,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn files(&self) -> &[TrackedFile] {
        &self.files
    }

    pub fn file(&self, id: FileId) -> Option<&TrackedFile> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn merge_mode(&self) -> bool {
        self.merge_mode
    }

    pub fn combined(&self) -> Option<&MergeOutcome> {
        self.combined.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn cloud_save(&self) -> &CloudSaveState {
        &self.cloud_save
    }

    fn emit(&self, event: SessionEvent) {
        // 購読者がいなければ捨てる
        let _ = self.events.send(event);
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.busy {
            return Err(InvoiceAiError::Busy);
        }
        Ok(())
    }

    fn clear_combined(&mut self) {
        if self.combined.take().is_some() {
            self.emit(SessionEvent::CombinedChanged(None));
        }
    }

    fn set_combined(&mut self, outcome: MergeOutcome) {
        self.combined = Some(outcome.clone());
        self.emit(SessionEvent::CombinedChanged(Some(outcome)));
    }

    fn set_cloud_save(&mut self, state: CloudSaveState) {
        if self.cloud_save != state {
            self.cloud_save = state.clone();
            self.emit(SessionEvent::CloudSaveChanged(state));
        }
    }

    fn set_file_state(&mut self, id: FileId, state: FileState) {
        let status = state.status();
        if let Some(file) = self.files.iter_mut().find(|f| f.id == id) {
            file.state = state;
            self.emit(SessionEvent::FileStatusChanged { id, status });
        }
    }

    /// ファイルを末尾に追加（状態は Pending）
    ///
    /// 統合結果とクラウド保存状態はクリアされる
    pub fn add_files(&mut self, payloads: Vec<ImagePayload>) -> Result<Vec<FileId>> {
        self.ensure_idle()?;

        let ids: Vec<FileId> = payloads
            .into_iter()
            .map(|payload| {
                let file = TrackedFile {
                    id: FileId::new(),
                    payload,
                    state: FileState::Pending,
                };
                let id = file.id;
                self.files.push(file);
                id
            })
            .collect();

        self.clear_combined();
        self.set_cloud_save(CloudSaveState::Idle);
        self.emit(SessionEvent::FilesAdded(ids.clone()));
        Ok(ids)
    }

    /// ファイルを削除（存在しなければ false）
    ///
    /// ページが変わると統合結果は無効になるため、常にクリアする
    pub fn remove_file(&mut self, id: FileId) -> Result<bool> {
        self.ensure_idle()?;

        let before = self.files.len();
        self.files.retain(|f| f.id != id);
        let removed = self.files.len() != before;

        self.clear_combined();
        if removed {
            self.emit(SessionEvent::FileRemoved(id));
        }
        Ok(removed)
    }

    /// 初期状態に戻す（統合モードの設定は維持）
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_idle()?;

        self.files.clear();
        self.combined = None;
        self.cloud_save = CloudSaveState::Idle;
        self.emit(SessionEvent::Reset);
        Ok(())
    }

    pub fn set_merge_mode(&mut self, merge: bool) -> Result<()> {
        self.ensure_idle()?;

        if self.merge_mode != merge {
            self.merge_mode = merge;
            if !merge {
                self.clear_combined();
            }
            self.emit(SessionEvent::MergeModeChanged(merge));
        }
        Ok(())
    }

    /// Excel出力・クラウド保存が可能か
    pub fn has_any_result(&self) -> bool {
        if self.merge_mode {
            matches!(self.combined, Some(MergeOutcome::Ready { .. }))
        } else {
            self.files.iter().any(|f| f.state.record().is_some())
        }
    }

    /// Excel出力対象（レコード, ラベル）
    pub fn export_entries(&self) -> Vec<(&InvoiceRecord, &str)> {
        if self.merge_mode {
            return match &self.combined {
                Some(MergeOutcome::Ready { record }) => vec![(record, COMBINED_LABEL)],
                _ => Vec::new(),
            };
        }

        self.files
            .iter()
            .filter_map(|f| {
                f.state
                    .record()
                    .map(|r| (r, f.payload.file_name.as_str()))
            })
            .collect()
    }

    /// 解析を実行
    ///
    /// 個別の抽出失敗はファイル（または統合結果）に記録され、`Err` にはならない。
    /// `Err` は前提条件違反（実行中・ファイルなし）のみ
    pub async fn analyze<E>(&mut self, extractor: &E) -> Result<AnalyzeSummary>
    where
        E: InvoiceExtractor + ?Sized,
    {
        self.ensure_idle()?;
        if self.files.is_empty() {
            return Err(InvoiceAiError::NoFiles);
        }

        if self.merge_mode {
            self.analyze_merged(extractor).await
        } else {
            self.analyze_each(extractor).await
        }
    }

    async fn analyze_each<E>(&mut self, extractor: &E) -> Result<AnalyzeSummary>
    where
        E: InvoiceExtractor + ?Sized,
    {
        let targets: Vec<FileId> = self
            .files
            .iter()
            .filter(|f| f.needs_analysis())
            .map(|f| f.id)
            .collect();

        let mut summary = AnalyzeSummary::default();
        if targets.is_empty() {
            info!("all files already analyzed");
            return Ok(summary);
        }

        info!(files = targets.len(), "analyzing invoices one by one");
        self.set_cloud_save(CloudSaveState::Idle);
        let mut session = BusyGuard::acquire(self);

        for id in targets {
            session.set_file_state(id, FileState::InProgress);

            let (file_name, result) = {
                let Some(file) = session.file(id) else {
                    continue;
                };
                (
                    file.payload.file_name.clone(),
                    extractor.extract(&[&file.payload]).await,
                )
            };
            summary.calls += 1;

            match result {
                Ok(record) => {
                    info!(file = %file_name, company = %record.company_name, "invoice extracted");
                    summary.succeeded += 1;
                    session.set_file_state(id, FileState::Succeeded { record: Some(record) });
                }
                Err(e) => {
                    warn!(file = %file_name, error = %e, "invoice extraction failed");
                    summary.failed += 1;
                    session.set_file_state(id, FileState::Failed { reason: e.to_string() });
                }
            }
        }

        Ok(summary)
    }

    async fn analyze_merged<E>(&mut self, extractor: &E) -> Result<AnalyzeSummary>
    where
        E: InvoiceExtractor + ?Sized,
    {
        info!(pages = self.files.len(), "analyzing pages as one invoice");
        self.set_cloud_save(CloudSaveState::Idle);
        let mut session = BusyGuard::acquire(self);
        session.clear_combined();

        let ids: Vec<FileId> = session.files.iter().map(|f| f.id).collect();
        for id in &ids {
            session.set_file_state(*id, FileState::InProgress);
        }

        let result = {
            let pages: Vec<&ImagePayload> = session.files.iter().map(|f| &f.payload).collect();
            extractor.extract(&pages).await
        };

        let mut summary = AnalyzeSummary {
            calls: 1,
            ..Default::default()
        };
        match result {
            Ok(record) => {
                info!(company = %record.company_name, "merged invoice extracted");
                summary.succeeded = ids.len();
                for id in &ids {
                    session.set_file_state(*id, FileState::Succeeded { record: None });
                }
                session.set_combined(MergeOutcome::Ready { record });
            }
            Err(e) => {
                warn!(error = %e, "merged invoice extraction failed");
                let reason = e.to_string();
                summary.failed = ids.len();
                for id in &ids {
                    session.set_file_state(*id, FileState::Failed { reason: reason.clone() });
                }
                session.set_combined(MergeOutcome::Failed { reason });
            }
        }

        Ok(summary)
    }

    /// 解析結果をクラウドに保存
    ///
    /// 統合モードは1ページ目の画像と統合結果を1件として保存する。
    /// 個別モードは成功ファイルを順に保存し、失敗しても残りを続行する
    pub async fn save_to_cloud<S>(
        &mut self,
        store: &S,
        destination: &CloudDestination,
    ) -> Result<CloudSaveReport>
    where
        S: CloudStore + ?Sized,
    {
        self.ensure_idle()?;
        if !self.has_any_result() {
            return Err(InvoiceAiError::NoResults);
        }

        let guard = CloudSaveGuard::acquire(self);

        let units: Vec<(&ImagePayload, &InvoiceRecord)> = if guard.merge_mode {
            match (&guard.combined, guard.files.first()) {
                (Some(MergeOutcome::Ready { record }), Some(first)) => vec![(&first.payload, record)],
                _ => Vec::new(),
            }
        } else {
            guard.files
                .iter()
                .filter_map(|f| f.state.record().map(|r| (&f.payload, r)))
                .collect()
        };

        let mut report = CloudSaveReport::default();
        for (image, record) in units {
            let result = save_invoice(store, destination, image, record)
                .await
                .map_err(|e| {
                    warn!(file = %image.file_name, error = %e, "cloud save failed");
                    e.to_string()
                });
            report.units.push(CloudUnitOutcome {
                file_name: image.file_name.clone(),
                result,
            });
        }

        let first_error = report
            .units
            .iter()
            .find_map(|u| u.result.as_ref().err().cloned());
        guard.settle(match first_error {
            Some(reason) => CloudSaveState::Failed(reason),
            None => CloudSaveState::Saved,
        });

        Ok(report)
    }

    /// 現在の状態をレポートに書き出す
    pub fn report(&self) -> SessionReport {
        SessionReport {
            generated_at: chrono::Local::now().to_rfc3339(),
            merge_mode: self.merge_mode,
            files: self
                .files
                .iter()
                .map(|f| FileReport {
                    id: f.id,
                    file_name: f.payload.file_name.clone(),
                    file_path: f.payload.file_path.clone(),
                    mime_type: f.payload.mime_type.clone(),
                    state: f.state.clone(),
                })
                .collect(),
            combined: self.combined.clone(),
        }
    }

    /// レポートからセッションを復元
    ///
    /// 画像は `load` で読み直す。実行中のまま保存された状態は Pending に戻す
    pub fn restore<F>(report: SessionReport, mut load: F) -> Result<Self>
    where
        F: FnMut(&FileReport) -> Result<ImagePayload>,
    {
        let mut session = Self::new();
        session.merge_mode = report.merge_mode;

        for file in &report.files {
            let payload = load(file)?;
            let state = match &file.state {
                FileState::InProgress => FileState::Pending,
                other => other.clone(),
            };
            session.files.push(TrackedFile {
                id: file.id,
                payload,
                state,
            });
        }
        session.combined = report.combined;

        Ok(session)
    }
}

/// 解析中フラグを保持するガード
///
/// `Drop` で必ずフラグを下ろす（正常終了・パニック・future の破棄のいずれでも）。
/// 途中で破棄された場合、InProgress のファイルは Pending に戻す
struct BusyGuard<'a> {
    session: &'a mut SessionState,
}

impl<'a> BusyGuard<'a> {
    fn acquire(session: &'a mut SessionState) -> Self {
        session.busy = true;
        session.emit(SessionEvent::BusyChanged(true));
        Self { session }
    }
}

impl Deref for BusyGuard<'_> {
    type Target = SessionState;

    fn deref(&self) -> &SessionState {
        self.session
    }
}

impl DerefMut for BusyGuard<'_> {
    fn deref_mut(&mut self) -> &mut SessionState {
        self.session
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let interrupted: Vec<FileId> = self
            .session
            .files
            .iter()
            .filter(|f| f.state == FileState::InProgress)
            .map(|f| f.id)
            .collect();
        for id in interrupted {
            self.session.set_file_state(id, FileState::Pending);
        }

        self.session.busy = false;
        self.session.emit(SessionEvent::BusyChanged(false));
    }
}

/// クラウド保存中の状態を保持するガード
///
/// `settle` されずに破棄された場合（future の破棄など）は Idle に戻す
struct CloudSaveGuard<'a> {
    session: &'a mut SessionState,
    settled: bool,
}

impl<'a> CloudSaveGuard<'a> {
    fn acquire(session: &'a mut SessionState) -> Self {
        session.set_cloud_save(CloudSaveState::Saving);
        Self {
            session,
            settled: false,
        }
    }

    fn settle(mut self, state: CloudSaveState) {
        self.settled = true;
        self.session.set_cloud_save(state);
    }
}

impl Deref for CloudSaveGuard<'_> {
    type Target = SessionState;

    fn deref(&self) -> &SessionState {
        self.session
    }
}

impl Drop for CloudSaveGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.session.set_cloud_save(CloudSaveState::Idle);
        }
    }
}
