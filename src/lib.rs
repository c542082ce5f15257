// FlashFS Manager
// 多文件系统统一命名空间文件管理核心库
//
// 将若干独立挂载的 Flash 文件系统以统一的层级命名空间对外暴露，
// 并以流式方式接收分块上传的大文件（不在内存中保存完整文件）。

// 配置管理模块
pub mod config;

// 日志系统
pub mod logging;

// 文件系统能力抽象
pub mod vfs;

// 挂载注册表（路径路由）
pub mod registry;

// 目录树构建模块
pub mod tree;

// 递归删除模块
pub mod deleter;

// 分块上传接收模块
pub mod uploader;

// 命令分发模块
pub mod dispatch;

// 导出常用类型
pub use config::{AppConfig, LogConfig, MountSpec, StorageConfig};
pub use dispatch::{dispatch, CommandEnvelope, DispatchReply, FileCommand, StatusResponse};
pub use registry::{FsRegistry, MountEntry};
pub use tree::{build_tree, list_all, TreeNode};
pub use uploader::{ChunkOutcome, UploadError, UploadManager, UploadSummary};
pub use vfs::{DirCursor, DirEntryInfo, FileWrite, FlashFs, FsError, FsErrorCode, LocalFs};
