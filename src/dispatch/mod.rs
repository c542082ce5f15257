// 命令分发模块
//
// 把结构化命令（subaction + 参数）翻译为对注册表、树构建、
// 删除模块的调用，并生成统一形态的响应：
// 变更类操作 -> {"response": {"status": 0|1, "text": ...}}
// 列表操作   -> {"content": [TreeNode...]}
// 未知 subaction 产生结构化失败响应，不抛错。

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::deleter::{delete_file, delete_folder};
use crate::registry::FsRegistry;
use crate::tree::{list_all, TreeNode};

/// 结构化命令
#[derive(Debug, Clone, Deserialize)]
pub struct FileCommand {
    /// 操作名：listDir / deleteFile / deleteFolder / addFolder
    pub subaction: String,
    /// 目标文件（deleteFile）
    #[serde(default)]
    pub filename: Option<String>,
    /// 目标文件夹（deleteFolder / addFolder）
    #[serde(default)]
    pub foldername: Option<String>,
}

/// 命令信封（线上请求形态 {"cmd": {...}}）
#[derive(Debug, Clone, Deserialize)]
pub struct CommandEnvelope {
    pub cmd: FileCommand,
}

/// 统一状态响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusResponse {
    /// 1 成功，0 失败
    pub status: u8,
    /// 简短的人类可读结果
    pub text: String,
}

impl StatusResponse {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            status: 1,
            text: text.into(),
        }
    }

    pub fn fail(text: impl Into<String>) -> Self {
        Self {
            status: 0,
            text: text.into(),
        }
    }
}

/// 分发结果
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DispatchReply {
    /// 变更类操作的状态响应
    Status { response: StatusResponse },
    /// 列表操作的目录树
    Listing { content: Vec<TreeNode> },
}

impl DispatchReply {
    fn status(response: StatusResponse) -> Self {
        debug!(
            "dispatch: 响应 status={}, text={}",
            response.status, response.text
        );
        DispatchReply::Status { response }
    }
}

/// 分发一条结构化命令
pub fn dispatch(registry: &FsRegistry, envelope: &CommandEnvelope) -> DispatchReply {
    let cmd = &envelope.cmd;
    match cmd.subaction.as_str() {
        "listDir" => {
            info!("dispatch: 列出全部目录");
            match list_all(registry) {
                Ok(tree) => DispatchReply::Listing {
                    content: vec![tree],
                },
                Err(e) => {
                    warn!("dispatch: 目录列表构建失败: {}", e);
                    DispatchReply::status(StatusResponse::fail("listing failed"))
                }
            }
        }

        "deleteFile" => {
            let filename = cmd.filename.clone().unwrap_or_default();
            info!("dispatch: 请求删除文件 {}", filename);

            let (fs, relative) = registry.resolve(&filename);
            let response = match delete_file(fs.as_ref(), &relative) {
                Ok(()) => StatusResponse::ok("deletion successful"),
                Err(_) => StatusResponse::fail("deletion failed"),
            };
            DispatchReply::status(response)
        }

        "deleteFolder" => {
            let foldername = cmd.foldername.clone().unwrap_or_default();
            info!("dispatch: 请求删除文件夹 {}", foldername);

            let (fs, relative) = registry.resolve(&foldername);
            let response = match delete_folder(fs.as_ref(), &relative) {
                Ok(()) => StatusResponse::ok("deletion successful"),
                Err(_) => StatusResponse::fail("deletion failed"),
            };
            DispatchReply::status(response)
        }

        "addFolder" => {
            let foldername = cmd.foldername.clone().unwrap_or_default();
            info!("dispatch: 请求创建文件夹 {}", foldername);

            let (fs, relative) = registry.resolve(&foldername);
            // 已存在按非致命失败报告，不再调用创建
            if fs.exists(&relative) {
                warn!("dispatch: 文件夹已存在: {}", foldername);
                return DispatchReply::status(StatusResponse::fail("folder already exists"));
            }
            let response = if fs.mkdir(&relative) {
                info!("dispatch: 文件夹创建成功: {}", foldername);
                StatusResponse::ok("folder created successfully")
            } else {
                warn!("dispatch: 文件夹创建失败: {}", foldername);
                StatusResponse::fail("folder creation failed")
            };
            DispatchReply::status(response)
        }

        other => {
            warn!("dispatch: 未知 subaction: {}", other);
            DispatchReply::status(StatusResponse::fail("unknown subaction"))
        }
    }
}
