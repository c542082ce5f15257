// 宿主目录 backend
//
// 以宿主机上的一个目录为根实现 FlashFs 能力接口，
// 用于测试以及在非嵌入式环境上运行核心逻辑。
// 语义对齐嵌入式文件系统：mkdir 只建一级、remove 只删文件、rmdir 只删空目录。

use std::fs::{self, File, ReadDir};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::types::{DirEntryInfo, FsError, FsErrorCode};
use super::{DirCursor, FileWrite, FlashFs};

/// 宿主目录文件系统
pub struct LocalFs {
    /// 根目录（所有相对路径都解析到该目录下）
    root: PathBuf,
}

impl LocalFs {
    /// 创建新的宿主目录文件系统
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 将 backend 相对路径解析为宿主机路径（拒绝 ../ 穿越）
    fn full_path(&self, path: &str) -> Result<PathBuf, FsError> {
        if Self::contains_traversal(path) {
            return Err(FsError::new(FsErrorCode::InvalidPathFormat).with_path(path));
        }
        Ok(self.root.join(path.trim_start_matches('/')))
    }

    /// 检查路径是否包含穿越序列
    fn contains_traversal(path: &str) -> bool {
        path.split('/').any(|component| component == "..")
    }
}

impl FlashFs for LocalFs {
    fn open_write(&self, path: &str) -> Result<Box<dyn FileWrite>, FsError> {
        let full = self.full_path(path)?;
        let file = File::create(&full).map_err(|e| {
            FsError::new(FsErrorCode::OpenFailed)
                .with_path(path)
                .with_message(format!("打开文件失败: {}", e))
        })?;
        debug!("打开写句柄: {:?}", full);
        Ok(Box::new(LocalFileWrite { file, path: path.to_string() }))
    }

    fn open_dir(&self, path: &str) -> Result<Box<dyn DirCursor + '_>, FsError> {
        let full = self.full_path(path)?;
        if !full.exists() {
            return Err(FsError::new(FsErrorCode::NotFound).with_path(path));
        }
        if !full.is_dir() {
            return Err(FsError::new(FsErrorCode::NotADirectory).with_path(path));
        }
        let read_dir = fs::read_dir(&full).map_err(|e| {
            FsError::new(FsErrorCode::DirectoryReadFailed)
                .with_path(path)
                .with_message(format!("读取目录失败: {}", e))
        })?;
        Ok(Box::new(LocalDirCursor { read_dir }))
    }

    fn exists(&self, path: &str) -> bool {
        match self.full_path(path) {
            Ok(full) => full.exists(),
            Err(_) => false,
        }
    }

    fn mkdir(&self, path: &str) -> bool {
        let full = match self.full_path(path) {
            Ok(full) => full,
            Err(_) => return false,
        };
        match fs::create_dir(&full) {
            Ok(()) => true,
            Err(e) => {
                warn!("创建目录失败: {:?}, 错误: {}", full, e);
                false
            }
        }
    }

    fn rmdir(&self, path: &str) -> bool {
        let full = match self.full_path(path) {
            Ok(full) => full,
            Err(_) => return false,
        };
        match fs::remove_dir(&full) {
            Ok(()) => true,
            Err(e) => {
                warn!("删除目录失败: {:?}, 错误: {}", full, e);
                false
            }
        }
    }

    fn remove(&self, path: &str) -> bool {
        let full = match self.full_path(path) {
            Ok(full) => full,
            Err(_) => return false,
        };
        match fs::remove_file(&full) {
            Ok(()) => true,
            Err(e) => {
                warn!("删除文件失败: {:?}, 错误: {}", full, e);
                false
            }
        }
    }
}

/// 宿主文件写句柄
#[derive(Debug)]
struct LocalFileWrite {
    file: File,
    path: String,
}

impl FileWrite for LocalFileWrite {
    fn append(&mut self, data: &[u8]) -> Result<usize, FsError> {
        self.file.write_all(data).map_err(|e| {
            FsError::new(FsErrorCode::WriteFailed)
                .with_path(self.path.clone())
                .with_message(format!("写入失败: {}", e))
        })?;
        Ok(data.len())
    }
}

/// 宿主目录游标
///
/// 读取失败的条目直接跳过（与嵌入式游标行为一致）
#[derive(Debug)]
struct LocalDirCursor {
    read_dir: ReadDir,
}

impl DirCursor for LocalDirCursor {
    fn next_entry(&mut self) -> Option<DirEntryInfo> {
        for entry in self.read_dir.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(_) => continue,
            };
            let name = entry.file_name().to_string_lossy().to_string();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            return Some(DirEntryInfo { name, is_dir });
        }
        None
    }
}
