// 文件系统能力抽象
//
// 将底层 Flash 文件系统（LittleFS 等）抽象为一个窄接口：
// 打开写句柄、目录游标、exists/mkdir/rmdir/remove。
// 核心模块只消费该接口，不关心磨损均衡、块分配等底层行为。

mod local;
mod types;

pub use local::LocalFs;
pub use types::{DirEntryInfo, FsError, FsErrorCode};

/// 文件写句柄
///
/// 由 `FlashFs::open_write` 返回，打开即截断。
/// 句柄被 drop 时关闭文件（上传会话依赖该语义收尾）。
pub trait FileWrite: Send + std::fmt::Debug {
    /// 追加写入一段字节，返回写入的字节数
    fn append(&mut self, data: &[u8]) -> Result<usize, FsError>;
}

/// 目录条目游标
///
/// 逐条产出目录的直接子项，`None` 表示没有更多条目。
/// 条目顺序由 backend 决定，调用方不得假设任何排序。
pub trait DirCursor: std::fmt::Debug {
    fn next_entry(&mut self) -> Option<DirEntryInfo>;
}

/// 可挂载的文件系统能力接口
///
/// 路径均为该文件系统自身根下的相对路径（以 `/` 开头或为空串，
/// 空串表示根）。所有调用都是同步的。
pub trait FlashFs: Send + Sync {
    /// 以写模式打开文件（截断已有内容）
    fn open_write(&self, path: &str) -> Result<Box<dyn FileWrite>, FsError>;

    /// 打开目录并返回条目游标
    fn open_dir(&self, path: &str) -> Result<Box<dyn DirCursor + '_>, FsError>;

    /// 路径是否存在
    fn exists(&self, path: &str) -> bool;

    /// 创建目录，成功返回 true
    fn mkdir(&self, path: &str) -> bool;

    /// 删除空目录，成功返回 true
    fn rmdir(&self, path: &str) -> bool;

    /// 删除文件，成功返回 true（不存在视为失败）
    fn remove(&self, path: &str) -> bool;
}

/// 拼接目录路径与子项名称，并折叠由根路径产生的双斜杠
pub(crate) fn join_path(dir: &str, name: &str) -> String {
    let mut joined = format!("{}/{}", dir, name);
    if joined.starts_with("//") {
        joined.remove(0);
    }
    joined
}
