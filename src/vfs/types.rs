// 文件系统模块数据类型定义

/// 文件系统错误码
/// 错误码范围：40001 - 40099
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsErrorCode {
    /// 路径不存在
    NotFound = 40001,
    /// 不是目录
    NotADirectory = 40002,
    /// 目录读取失败
    DirectoryReadFailed = 40003,
    /// 打开文件失败
    OpenFailed = 40004,
    /// 写入失败
    WriteFailed = 40005,
    /// 删除文件失败
    RemoveFailed = 40006,
    /// 删除目录失败
    RmdirFailed = 40007,
    /// 路径格式无效
    InvalidPathFormat = 40008,
}

impl FsErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::NotFound => "路径不存在",
            Self::NotADirectory => "指定路径不是目录",
            Self::DirectoryReadFailed => "读取目录失败",
            Self::OpenFailed => "打开文件失败",
            Self::WriteFailed => "写入失败",
            Self::RemoveFailed => "删除文件失败",
            Self::RmdirFailed => "删除目录失败",
            Self::InvalidPathFormat => "路径格式无效",
        }
    }
}

/// 文件系统错误
#[derive(Debug)]
pub struct FsError {
    pub code: FsErrorCode,
    pub message: String,
    pub path: Option<String>,
}

impl FsError {
    pub fn new(code: FsErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl std::fmt::Display for FsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref path) = self.path {
            write!(f, "{}: {}", self.message, path)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for FsError {}

/// 目录条目信息
///
/// 由目录游标逐条产出，顺序由 backend 决定（嵌入式文件系统通常为创建顺序）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    /// 条目名称（不含路径）
    pub name: String,
    /// 是否为目录
    pub is_dir: bool,
}
