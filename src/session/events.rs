//! セッションの状態遷移イベント
//!
//! 状態を書き換えた後に送信するため、受信側は常に確定済みの状態を観測する。

use super::{CloudSaveState, FileId, FileStatus, MergeOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    FilesAdded(Vec<FileId>),
    FileRemoved(FileId),
    Reset,
    MergeModeChanged(bool),
    FileStatusChanged { id: FileId, status: FileStatus },
    /// 統合結果の更新（None = クリア）
    CombinedChanged(Option<MergeOutcome>),
    BusyChanged(bool),
    CloudSaveChanged(CloudSaveState),
}
