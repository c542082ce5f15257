// 递归删除模块
//
// 自底向上删除整个子树：先清空子目录，再删文件，最后删掉空目录本身。
// 任何一步失败立即中止整个操作（已删除的条目保持删除，无回滚）。

use tracing::{debug, info, warn};

use crate::vfs::{join_path, FlashFs, FsError, FsErrorCode};

/// 递归删除整个文件夹
///
/// 路径不存在或不是目录立即失败；子树内首个删除失败即中止，
/// 不再尝试兄弟条目，顶层文件夹保留。全部子项删除成功后才
/// rmdir 文件夹本身。
pub fn delete_folder(fs: &dyn FlashFs, folder: &str) -> Result<(), FsError> {
    if !fs.exists(folder) {
        warn!("delete_folder: 文件夹不存在: {}", folder);
        return Err(FsError::new(FsErrorCode::NotFound).with_path(folder));
    }

    // 枚举直接子项并立刻释放游标，删除在游标关闭后进行
    let mut entries = Vec::new();
    {
        let mut cursor = fs.open_dir(folder)?;
        while let Some(entry) = cursor.next_entry() {
            entries.push(entry);
        }
    }

    for entry in entries {
        let path = join_path(folder, &entry.name);
        debug!("delete_folder: 处理条目: {}", path);
        if entry.is_dir {
            delete_folder(fs, &path)?;
        } else {
            debug!("delete_folder: 删除文件: {}", path);
            if !fs.remove(&path) {
                warn!("delete_folder: 删除文件失败: {}", path);
                return Err(FsError::new(FsErrorCode::RemoveFailed).with_path(path));
            }
        }
    }

    debug!("delete_folder: 删除文件夹: {}", folder);
    if !fs.rmdir(folder) {
        warn!("delete_folder: 删除文件夹失败: {}", folder);
        return Err(FsError::new(FsErrorCode::RmdirFailed).with_path(folder));
    }
    info!("delete_folder: 文件夹删除成功: {}", folder);
    Ok(())
}

/// 删除单个文件
///
/// 直接透传 backend 的 remove；backend 报告失败（含不存在）即失败。
pub fn delete_file(fs: &dyn FlashFs, path: &str) -> Result<(), FsError> {
    if fs.remove(path) {
        info!("delete_file: 文件删除成功: {}", path);
        Ok(())
    } else {
        warn!("delete_file: 文件删除失败: {}", path);
        Err(FsError::new(FsErrorCode::RemoveFailed).with_path(path))
    }
}
