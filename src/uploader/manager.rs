// 上传管理器
//
// 维护 filename -> 会话 的显式映射，驱动会话状态机：
// 首块建会话、中间块追加、末块关会话并产出完成摘要。
// 同一文件名同时最多一个会话；再次收到 offset 0 视为
// 传输中断后重试，放弃旧会话并重新打开。

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};

use crate::dispatch::StatusResponse;
use crate::registry::FsRegistry;
use crate::uploader::session::{UploadError, UploadSession};

/// 上传完成摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    /// 对外文件名
    pub filename: String,
    /// 文件总字节数（末块 offset + 末块长度）
    pub total_bytes: u64,
}

impl UploadSummary {
    /// 末块的完成响应
    pub fn response(&self) -> StatusResponse {
        StatusResponse::ok("OK")
    }
}

/// 单个块事件的处理结果
#[derive(Debug)]
pub enum ChunkOutcome {
    /// 块已接收，传输继续
    Accepted,
    /// 末块已落盘，传输完成
    Completed(UploadSummary),
}

/// 上传管理器
pub struct UploadManager {
    /// 挂载注册表（用于解析目标 backend）
    registry: Arc<FsRegistry>,
    /// 活动会话（filename -> 会话）
    sessions: DashMap<String, UploadSession>,
}

impl UploadManager {
    /// 创建新的上传管理器
    pub fn new(registry: Arc<FsRegistry>) -> Self {
        Self {
            registry,
            sessions: DashMap::new(),
        }
    }

    /// 处理一个上传块事件
    ///
    /// # 参数
    /// * `filename` - 对外文件名（含挂载前缀）
    /// * `offset` - 本块在文件中的起始偏移（首块为 0）
    /// * `data` - 本块字节数据（可为空）
    /// * `is_final` - 是否为末块
    pub fn handle_chunk(
        &self,
        filename: &str,
        offset: u64,
        data: &[u8],
        is_final: bool,
    ) -> Result<ChunkOutcome, UploadError> {
        if offset == 0 {
            // 旧会话未走完又收到首块：放弃旧句柄，重新打开
            if self.sessions.remove(filename).is_some() {
                warn!("handle_chunk: 文件 {} 已有未完成会话，放弃并重新打开", filename);
            }
            let session = UploadSession::open(&self.registry, filename)?;
            self.sessions.insert(filename.to_string(), session);
        }

        if !data.is_empty() {
            let mut session = self
                .sessions
                .get_mut(filename)
                .ok_or_else(|| UploadError::NoActiveSession(filename.to_string()))?;
            session.append(data)?;
        }

        if is_final {
            let (_, session) = self
                .sessions
                .remove(filename)
                .ok_or_else(|| UploadError::NoActiveSession(filename.to_string()))?;
            let total_bytes = offset + data.len() as u64;
            info!(
                "上传完成: {}, size: {} Bytes",
                session.filename(),
                total_bytes
            );
            // 会话 drop 关闭文件句柄
            drop(session);
            return Ok(ChunkOutcome::Completed(UploadSummary {
                filename: filename.to_string(),
                total_bytes,
            }));
        }

        Ok(ChunkOutcome::Accepted)
    }

    /// 当前活动会话数
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::{DirCursor, FileWrite, FlashFs, FsError, FsErrorCode, LocalFs};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// 包装 backend，使最初若干次写入失败
    struct FlakyWriteFs {
        inner: LocalFs,
        failures_left: Arc<AtomicUsize>,
    }

    impl FlashFs for FlakyWriteFs {
        fn open_write(&self, path: &str) -> Result<Box<dyn FileWrite>, FsError> {
            let inner = self.inner.open_write(path)?;
            Ok(Box::new(FlakyWrite {
                inner,
                path: path.to_string(),
                failures_left: Arc::clone(&self.failures_left),
            }))
        }
        fn open_dir(&self, path: &str) -> Result<Box<dyn DirCursor + '_>, FsError> {
            self.inner.open_dir(path)
        }
        fn exists(&self, path: &str) -> bool {
            self.inner.exists(path)
        }
        fn mkdir(&self, path: &str) -> bool {
            self.inner.mkdir(path)
        }
        fn rmdir(&self, path: &str) -> bool {
            self.inner.rmdir(path)
        }
        fn remove(&self, path: &str) -> bool {
            self.inner.remove(path)
        }
    }

    #[derive(Debug)]
    struct FlakyWrite {
        inner: Box<dyn FileWrite>,
        path: String,
        failures_left: Arc<AtomicUsize>,
    }

    impl FileWrite for FlakyWrite {
        fn append(&mut self, data: &[u8]) -> Result<usize, FsError> {
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(FsError::new(FsErrorCode::WriteFailed).with_path(self.path.clone()));
            }
            self.inner.append(data)
        }
    }

    fn setup_manager() -> (TempDir, UploadManager) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let fs: Arc<dyn FlashFs> = Arc::new(LocalFs::new(temp_dir.path()));
        let registry = Arc::new(FsRegistry::new(fs));
        (temp_dir, UploadManager::new(registry))
    }

    #[test]
    fn test_two_chunk_upload() {
        let (temp, manager) = setup_manager();

        let outcome = manager.handle_chunk("/f.txt", 0, b"AB", false).unwrap();
        assert!(matches!(outcome, ChunkOutcome::Accepted));
        assert_eq!(manager.active_sessions(), 1);

        let outcome = manager.handle_chunk("/f.txt", 2, b"CD", true).unwrap();
        let summary = match outcome {
            ChunkOutcome::Completed(summary) => summary,
            ChunkOutcome::Accepted => panic!("expected completion"),
        };
        assert_eq!(summary.total_bytes, 4);
        assert_eq!(
            serde_json::to_value(summary.response()).unwrap(),
            serde_json::json!({"status": 1, "text": "OK"})
        );
        assert_eq!(manager.active_sessions(), 0);

        let content = std::fs::read_to_string(temp.path().join("f.txt")).unwrap();
        assert_eq!(content, "ABCD");
    }

    #[test]
    fn test_single_chunk_upload() {
        let (temp, manager) = setup_manager();

        let outcome = manager.handle_chunk("/one.bin", 0, b"xyz", true).unwrap();
        assert!(matches!(
            outcome,
            ChunkOutcome::Completed(UploadSummary { total_bytes: 3, .. })
        ));

        let content = std::fs::read(temp.path().join("one.bin")).unwrap();
        assert_eq!(content, b"xyz");
    }

    #[test]
    fn test_directories_created_before_open() {
        let (temp, manager) = setup_manager();

        manager.handle_chunk("a/b/c.txt", 0, b"1", true).unwrap();
        assert!(temp.path().join("a").is_dir());
        assert!(temp.path().join("a/b").is_dir());
        assert!(temp.path().join("a/b/c.txt").is_file());
    }

    #[test]
    fn test_chunk_without_session_fails() {
        let (_temp, manager) = setup_manager();

        let err = manager.handle_chunk("/f.txt", 8, b"late", false).unwrap_err();
        assert!(matches!(err, UploadError::NoActiveSession(_)));
    }

    #[test]
    fn test_restarted_upload_abandons_old_session() {
        let (temp, manager) = setup_manager();

        manager.handle_chunk("/f.txt", 0, b"old-data", false).unwrap();
        assert_eq!(manager.active_sessions(), 1);

        // 中断重试：新的首块放弃旧会话并截断文件
        manager.handle_chunk("/f.txt", 0, b"new", false).unwrap();
        assert_eq!(manager.active_sessions(), 1);
        manager.handle_chunk("/f.txt", 3, b"", true).unwrap();

        let content = std::fs::read_to_string(temp.path().join("f.txt")).unwrap();
        assert_eq!(content, "new");
    }

    #[test]
    fn test_write_failure_keeps_session_for_retry() {
        let temp = TempDir::new().unwrap();
        let fs: Arc<dyn FlashFs> = Arc::new(FlakyWriteFs {
            inner: LocalFs::new(temp.path()),
            failures_left: Arc::new(AtomicUsize::new(1)),
        });
        let manager = UploadManager::new(Arc::new(FsRegistry::new(fs)));

        let err = manager.handle_chunk("/f.txt", 0, b"bad", false).unwrap_err();
        assert!(matches!(err, UploadError::WriteFailed { .. }));
        // 写入失败不清会话，留待下一个首块回收
        assert_eq!(manager.active_sessions(), 1);

        let outcome = manager.handle_chunk("/f.txt", 0, b"good", true).unwrap();
        assert!(matches!(outcome, ChunkOutcome::Completed(_)));
        assert_eq!(manager.active_sessions(), 0);

        let content = std::fs::read_to_string(temp.path().join("f.txt")).unwrap();
        assert_eq!(content, "good");
    }

    #[test]
    fn test_upload_into_mounted_prefix() {
        let default_dir = TempDir::new().unwrap();
        let data_dir = TempDir::new().unwrap();
        let default_fs: Arc<dyn FlashFs> = Arc::new(LocalFs::new(default_dir.path()));
        let data_fs: Arc<dyn FlashFs> = Arc::new(LocalFs::new(data_dir.path()));

        let mut registry = FsRegistry::new(default_fs);
        registry.register(data_fs, "/data");
        let manager = UploadManager::new(Arc::new(registry));

        manager
            .handle_chunk("/data/dump/log.bin", 0, b"mounted", true)
            .unwrap();

        // 挂载前缀被剥掉，文件落在 data backend 的 /dump 下
        assert!(data_dir.path().join("dump/log.bin").is_file());
        assert!(!default_dir.path().join("data").exists());
    }

    #[test]
    fn test_completion_of_same_name_after_close_starts_fresh() {
        let (temp, manager) = setup_manager();

        manager.handle_chunk("/f.txt", 0, b"first", true).unwrap();
        manager.handle_chunk("/f.txt", 0, b"second", true).unwrap();

        let content = std::fs::read_to_string(temp.path().join("f.txt")).unwrap();
        assert_eq!(content, "second");
    }
}
