// 上传会话
//
// 持有一次传输的打开文件句柄与累计写入量。
// 会话从打开到关闭独占句柄；句柄随会话 drop 关闭。

use tracing::{debug, info};

use crate::registry::FsRegistry;
use crate::vfs::{FlashFs, FsError};

/// 上传错误
#[derive(Debug)]
pub enum UploadError {
    /// 打开目标文件失败（会话级致命错误，本次传输作废）
    OpenFailed { filename: String, cause: FsError },
    /// 写入失败
    WriteFailed { filename: String, cause: FsError },
    /// 没有对应的活动会话（块在首块之前到达）
    NoActiveSession(String),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::OpenFailed { filename, cause } => {
                write!(f, "打开上传文件失败: {}: {}", filename, cause)
            }
            UploadError::WriteFailed { filename, cause } => {
                write!(f, "写入上传文件失败: {}: {}", filename, cause)
            }
            UploadError::NoActiveSession(filename) => {
                write!(f, "没有活动的上传会话: {}", filename)
            }
        }
    }
}

impl std::error::Error for UploadError {}

/// 上传会话
///
/// 状态机 Idle -> Open -> Closed 中的 Open 态实体；
/// Idle 与 Closed 不需要实体（会话在首块创建、末块销毁）。
#[derive(Debug)]
pub struct UploadSession {
    /// 对外文件名（含挂载前缀）
    filename: String,
    /// backend 相对路径
    relative: String,
    /// 写句柄（会话独占，drop 即关闭）
    writer: Box<dyn crate::vfs::FileWrite>,
    /// 累计写入字节数
    bytes_written: u64,
}

impl UploadSession {
    /// 打开新的上传会话（首块，Idle -> Open）
    ///
    /// 通过注册表解析 backend 与相对路径，自左向右补齐缺失的
    /// 中间目录，然后以截断模式打开目标文件。
    pub fn open(registry: &FsRegistry, filename: &str) -> Result<Self, UploadError> {
        let (fs, relative) = registry.resolve(filename);

        ensure_parent_dirs(fs.as_ref(), &relative);

        let writer = fs.open_write(&relative).map_err(|cause| UploadError::OpenFailed {
            filename: filename.to_string(),
            cause,
        })?;

        info!("上传开始: {}", filename);
        Ok(Self {
            filename: filename.to_string(),
            relative,
            writer,
            bytes_written: 0,
        })
    }

    /// 追加一块数据（Open -> Open）
    pub fn append(&mut self, data: &[u8]) -> Result<(), UploadError> {
        let written = self
            .writer
            .append(data)
            .map_err(|cause| UploadError::WriteFailed {
                filename: self.filename.clone(),
                cause,
            })?;
        self.bytes_written += written as u64;
        debug!(
            "写入文件: {}, len={} bytes, 累计={} bytes",
            self.relative, written, self.bytes_written
        );
        Ok(())
    }

    /// 对外文件名
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// 累计写入字节数
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

/// 自左向右补齐路径中缺失的中间目录
///
/// `a/b/c.txt` 依次确保 `a`、`a/b` 存在，之后才打开文件。
fn ensure_parent_dirs(fs: &dyn FlashFs, path: &str) {
    let mut prefix = String::new();
    for ch in path.chars() {
        if ch == '/' && !prefix.is_empty() && prefix != "/" {
            if !fs.exists(&prefix) {
                debug!("补齐中间目录: {}", prefix);
                fs.mkdir(&prefix);
            }
        }
        prefix.push(ch);
    }
}
