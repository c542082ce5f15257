// 目录树构建模块
//
// 递归枚举一个 backend（或全部已注册 backend）的目录内容，
// 生成嵌套的树形描述。构建过程无状态，游标作用域受限于单层枚举，
// 枚举完立即释放，之后才进入子目录。

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::registry::FsRegistry;
use crate::vfs::{join_path, FlashFs, FsError};

/// 目录树节点
///
/// 根节点携带 `path`（挂载前缀 + 起始路径），子节点携带 `name`。
/// `content` 仅目录节点存在；构建完成后不可变。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    /// 展示路径（仅根节点）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// 条目名称（仅子节点）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 是否为目录（线上格式为 0/1）
    #[serde(rename = "isDir", serialize_with = "serialize_bool_as_int")]
    pub is_dir: bool,
    /// 子节点（仅目录）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<TreeNode>>,
}

fn serialize_bool_as_int<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

impl TreeNode {
    /// 构造树根节点
    fn root(path: String, children: Vec<TreeNode>) -> Self {
        Self {
            path: Some(path),
            name: None,
            is_dir: true,
            content: Some(children),
        }
    }

    /// 构造文件子节点
    fn file(name: String) -> Self {
        Self {
            path: None,
            name: Some(name),
            is_dir: false,
            content: None,
        }
    }

    /// 构造目录子节点
    fn dir(name: String, children: Vec<TreeNode>) -> Self {
        Self {
            path: None,
            name: Some(name),
            is_dir: true,
            content: Some(children),
        }
    }

    /// 构造挂载占位节点（只标目录，不递归展开）
    fn mount_stub(name: String) -> Self {
        Self {
            path: None,
            name: Some(name),
            is_dir: true,
            content: None,
        }
    }
}

/// 构建单个 backend 从 start_path 起的完整目录树
///
/// 根节点的展示路径为挂载前缀与起始路径的拼接，
/// 折叠开头的双斜杠、去掉结尾斜杠（结果为空串表示根）。
pub fn build_tree(
    fs: &dyn FlashFs,
    base_path: &str,
    start_path: &str,
) -> Result<TreeNode, FsError> {
    let display_path = display_path(base_path, start_path);
    debug!("build_tree: 开始构建目录树, path: '{}'", display_path);
    let children = build_children(fs, start_path)?;
    Ok(TreeNode::root(display_path, children))
}

/// 深度优先构建一个目录的子节点序列
///
/// 先把游标产出的条目一次性取完并释放游标，再递归进入子目录，
/// 保证同一时刻最多持有一个目录句柄。子树完全建好后才挂到父节点。
fn build_children(fs: &dyn FlashFs, dir_path: &str) -> Result<Vec<TreeNode>, FsError> {
    let mut entries = Vec::new();
    {
        let mut cursor = fs.open_dir(dir_path)?;
        while let Some(entry) = cursor.next_entry() {
            entries.push(entry);
        }
    }

    let mut children = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.is_dir {
            let child_path = join_path(dir_path, &entry.name);
            let sub = build_children(fs, &child_path)?;
            children.push(TreeNode::dir(entry.name, sub));
        } else {
            children.push(TreeNode::file(entry.name));
        }
    }
    Ok(children)
}

/// 列出统一命名空间下的全部内容
///
/// 有挂载时返回一个合成根节点：子节点先是每条挂载的占位目录项，
/// 随后是每个挂载 backend 从自身根起的完整目录树。
/// 注册表为空时直接返回默认 backend 的根目录树。
pub fn list_all(registry: &FsRegistry) -> Result<TreeNode, FsError> {
    if registry.mounts().is_empty() {
        return build_tree(registry.default_fs().as_ref(), "/", "/");
    }

    let mut children = Vec::new();
    for mount in registry.mounts() {
        // base_path 已规范化，至多一个前导 /
        let stub_name = mount
            .base_path
            .strip_prefix('/')
            .unwrap_or(&mount.base_path)
            .to_string();
        children.push(TreeNode::mount_stub(stub_name));
    }
    for mount in registry.mounts() {
        debug!("list_all: 展开挂载 {}", mount.base_path);
        children.push(build_tree(mount.fs.as_ref(), &mount.base_path, "/")?);
    }
    Ok(TreeNode::root("/".to_string(), children))
}

/// 根节点展示路径：拼接挂载前缀与起始路径后做轻量规范化
fn display_path(base_path: &str, start_path: &str) -> String {
    let mut path = format!("{}{}", base_path, start_path);
    if path.starts_with("//") {
        path.remove(0);
    }
    if path.ends_with('/') {
        path.pop();
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::LocalFs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup_fs() -> (TempDir, LocalFs) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let fs = LocalFs::new(temp_dir.path());
        (temp_dir, fs)
    }

    fn write_file(fs: &LocalFs, path: &str) {
        fs.open_write(path).unwrap().append(b"x").unwrap();
    }

    /// 按名称查找子节点
    fn child<'a>(node: &'a TreeNode, name: &str) -> &'a TreeNode {
        node.content
            .as_ref()
            .unwrap()
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
            .unwrap_or_else(|| panic!("child not found: {}", name))
    }

    #[test]
    fn test_display_path() {
        assert_eq!(display_path("/", "/"), "");
        assert_eq!(display_path("/data", "/"), "/data");
        assert_eq!(display_path("/data", "/logs"), "/data/logs");
    }

    #[test]
    fn test_build_tree_nested() {
        let (_temp, fs) = setup_fs();
        fs.mkdir("/logs");
        fs.mkdir("/logs/old");
        write_file(&fs, "/logs/app.log");
        write_file(&fs, "/logs/old/boot.log");
        write_file(&fs, "/config.json");

        let tree = build_tree(&fs, "/", "/").unwrap();
        assert_eq!(tree.path.as_deref(), Some(""));

        let logs = child(&tree, "logs");
        assert!(logs.is_dir);
        let old = child(logs, "old");
        assert!(old.is_dir);
        assert_eq!(old.content.as_ref().unwrap().len(), 1);
        assert!(!child(old, "boot.log").is_dir);
        assert!(!child(&tree, "config.json").is_dir);
    }

    #[test]
    fn test_build_tree_missing_path_fails() {
        let (_temp, fs) = setup_fs();
        assert!(build_tree(&fs, "/", "/missing").is_err());
    }

    #[test]
    fn test_tree_is_deterministic() {
        let (_temp, fs) = setup_fs();
        fs.mkdir("/a");
        fs.mkdir("/a/b");
        write_file(&fs, "/a/x.txt");
        write_file(&fs, "/a/b/y.txt");
        write_file(&fs, "/z.txt");

        let first = build_tree(&fs, "/", "/").unwrap();
        let second = build_tree(&fs, "/", "/").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_serialized_shape() {
        let (_temp, fs) = setup_fs();
        fs.mkdir("/logs");
        write_file(&fs, "/a.txt");

        let tree = build_tree(&fs, "/", "/").unwrap();
        let json = serde_json::to_value(&tree).unwrap();

        assert_eq!(json["path"], "");
        assert_eq!(json["isDir"], 1);
        assert!(json.get("name").is_none());

        let content = json["content"].as_array().unwrap();
        let file = content
            .iter()
            .find(|c| c["name"] == "a.txt")
            .unwrap();
        assert_eq!(file["isDir"], 0);
        assert!(file.get("content").is_none());
        assert!(file.get("path").is_none());
    }

    #[test]
    fn test_list_all_empty_registry() {
        let (_temp, fs) = setup_fs();
        write_file(&fs, "/a.txt");
        let registry = FsRegistry::new(Arc::new(fs));

        let tree = list_all(&registry).unwrap();
        assert_eq!(tree.path.as_deref(), Some(""));
        assert_eq!(tree.content.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_list_all_aggregates_mounts() {
        let (_t0, default_fs) = setup_fs();
        let (_t1, fs_data) = setup_fs();
        let (_t2, fs_www) = setup_fs();
        write_file(&fs_data, "/d.bin");
        write_file(&fs_www, "/index.html");

        let mut registry = FsRegistry::new(Arc::new(default_fs));
        registry.register(Arc::new(fs_data), "/data");
        registry.register(Arc::new(fs_www), "/www");

        let root = list_all(&registry).unwrap();
        assert_eq!(root.path.as_deref(), Some("/"));

        let children = root.content.as_ref().unwrap();
        // 两个占位节点 + 两棵完整子树
        assert_eq!(children.len(), 4);
        assert_eq!(children[0].name.as_deref(), Some("data"));
        assert!(children[0].is_dir);
        assert!(children[0].content.is_none());
        assert_eq!(children[1].name.as_deref(), Some("www"));

        assert_eq!(children[2].path.as_deref(), Some("/data"));
        assert_eq!(
            children[2].content.as_ref().unwrap()[0].name.as_deref(),
            Some("d.bin")
        );
        assert_eq!(children[3].path.as_deref(), Some("/www"));
    }
}
