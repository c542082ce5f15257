// 挂载注册表
//
// 持有全部已挂载的 backend 及其命名空间前缀（base path），
// 负责把对外可见路径解析为 (backend, backend 相对路径)。
// 启动时配置一次，之后只读；注册表本身显式持有，不使用全局状态。

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::vfs::{FlashFs, LocalFs};

/// 一条挂载记录
#[derive(Clone)]
pub struct MountEntry {
    /// 挂载的 backend
    pub fs: Arc<dyn FlashFs>,
    /// 命名空间前缀（规范化后：以 / 开头，除根外不以 / 结尾）
    pub base_path: String,
}

/// 挂载注册表
///
/// 注册顺序即查找顺序：解析路径时返回第一条 base_path
/// 能作为该路径前缀的挂载记录；都不匹配时回落到默认 backend。
pub struct FsRegistry {
    /// 隐式默认 backend（注册表为空或无前缀匹配时使用）
    default_fs: Arc<dyn FlashFs>,
    /// 挂载记录（插入顺序 = 注册顺序）
    mounts: Vec<MountEntry>,
}

impl FsRegistry {
    /// 创建新的注册表
    pub fn new(default_fs: Arc<dyn FlashFs>) -> Self {
        Self {
            default_fs,
            mounts: Vec::new(),
        }
    }

    /// 根据存储配置构建注册表
    ///
    /// 每条挂载声明对应一个以宿主目录为根的 LocalFs backend。
    /// 第一条声明同时充当默认 backend；配置为空时以当前目录为默认根。
    pub fn from_config(config: &StorageConfig) -> Self {
        let default_fs: Arc<dyn FlashFs> = match config.mounts.first() {
            Some(spec) => Arc::new(LocalFs::new(&spec.root)),
            None => Arc::new(LocalFs::new(".")),
        };

        let mut registry = Self::new(default_fs);
        for spec in &config.mounts {
            let fs: Arc<dyn FlashFs> = Arc::new(LocalFs::new(&spec.root));
            registry.register(fs, &spec.base_path);
        }
        registry
    }

    /// 注册一个 backend
    ///
    /// 同一 backend（按引用同一性判断）重复注册为无操作，只记录告警。
    ///
    /// # 参数
    /// * `fs` - 要注册的 backend
    /// * `base_path` - 命名空间前缀，默认 "/"
    pub fn register(&mut self, fs: Arc<dyn FlashFs>, base_path: &str) {
        if self.mounts.iter().any(|m| Arc::ptr_eq(&m.fs, &fs)) {
            warn!("register: backend 已注册，忽略本次注册");
            return;
        }

        let base_path = normalize_base_path(base_path);
        info!("register: backend 注册成功, base path: {}", base_path);
        self.mounts.push(MountEntry { fs, base_path });
    }

    /// 已注册的挂载记录
    pub fn mounts(&self) -> &[MountEntry] {
        &self.mounts
    }

    /// 默认 backend
    pub fn default_fs(&self) -> Arc<dyn FlashFs> {
        Arc::clone(&self.default_fs)
    }

    /// 解析对外路径对应的 backend
    ///
    /// 按注册顺序返回第一条 base_path 为路径前缀的挂载；
    /// 注册表为空或无匹配时返回默认 backend（永不失败）。
    pub fn resolve_fs(&self, path: &str) -> Arc<dyn FlashFs> {
        for mount in &self.mounts {
            if path.starts_with(&mount.base_path) {
                debug!(
                    "resolve_fs: 路径 '{}' 命中挂载: {}",
                    path, mount.base_path
                );
                return Arc::clone(&mount.fs);
            }
        }
        debug!("resolve_fs: 路径 '{}' 未命中任何挂载，使用默认 backend", path);
        Arc::clone(&self.default_fs)
    }

    /// 将对外路径转换为 backend 相对路径
    ///
    /// 剥掉该 backend 挂载记录的非根 base_path 前缀；
    /// 默认 backend 或根挂载的路径原样返回。
    /// 必须与 `resolve_fs` 对同一路径成对调用。
    pub fn to_backend_path(&self, fs: &Arc<dyn FlashFs>, path: &str) -> String {
        for mount in &self.mounts {
            if Arc::ptr_eq(&mount.fs, fs) && mount.base_path != "/" {
                if let Some(stripped) = path.strip_prefix(&mount.base_path) {
                    return stripped.to_string();
                }
            }
        }
        path.to_string()
    }

    /// 一次性解析出一致的 (backend, 相对路径) 二元组
    pub fn resolve(&self, path: &str) -> (Arc<dyn FlashFs>, String) {
        let fs = self.resolve_fs(path);
        let relative = self.to_backend_path(&fs, path);
        (fs, relative)
    }
}

/// 规范化 base path：确保以 / 开头，除根外去掉尾部 /
fn normalize_base_path(base_path: &str) -> String {
    let mut normalized = if base_path.starts_with('/') {
        base_path.to_string()
    } else {
        format!("/{}", base_path)
    };
    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}
