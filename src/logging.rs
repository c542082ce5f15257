//! 日志系统配置
//!
//! 支持控制台输出和文件持久化，按文件大小和启动时间滚动，自动清理过期日志。
//! 未初始化时核心模块的 tracing 调用是静默空操作，不影响任何控制流。

use crate::config::LogConfig;
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// 日志文件前缀
const LOG_FILE_PREFIX: &str = "flashfs-manager";

/// 日志文件管理器（内部状态）
///
/// 负责日志文件的创建、按大小滚动和写入
struct LogFileManagerInner {
    /// 服务启动时间戳（格式：YYYY-MM-DD-HHMMSS）
    start_timestamp: String,
    /// 日志目录路径
    log_dir: PathBuf,
    /// 当前文件句柄
    current_file: Option<File>,
    /// 当前文件序号（0 表示基础文件，1、2、3... 表示滚动文件）
    current_index: u32,
    /// 单个文件最大大小（字节）
    max_file_size: u64,
    /// 当前文件已写入的字节数
    current_size: u64,
}

impl LogFileManagerInner {
    fn new(log_dir: PathBuf, max_file_size: u64) -> io::Result<Self> {
        let start_timestamp = Local::now().format("%Y-%m-%d-%H%M%S").to_string();

        let mut manager = Self {
            start_timestamp,
            log_dir,
            current_file: None,
            current_index: 0,
            max_file_size,
            current_size: 0,
        };
        manager.create_new_file()?;
        Ok(manager)
    }

    /// 生成日志文件路径
    fn generate_file_path(&self, index: u32) -> PathBuf {
        let filename = if index == 0 {
            format!("{}.{}.log", LOG_FILE_PREFIX, self.start_timestamp)
        } else {
            format!("{}.{}_{}.log", LOG_FILE_PREFIX, self.start_timestamp, index)
        };
        self.log_dir.join(filename)
    }

    /// 创建新的日志文件
    fn create_new_file(&mut self) -> io::Result<()> {
        let file_path = self.generate_file_path(self.current_index);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)?;

        self.current_file = Some(file);
        self.current_size = 0;
        Ok(())
    }

    /// 检查是否需要滚动到新文件
    fn should_rotate(&self, incoming_size: usize) -> bool {
        self.current_size + incoming_size as u64 > self.max_file_size
    }

    /// 滚动到新文件
    fn rotate(&mut self) -> io::Result<()> {
        if let Some(mut file) = self.current_file.take() {
            file.flush()?;
        }
        self.current_index += 1;
        self.create_new_file()
    }

    /// 写入数据
    fn write_data(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.should_rotate(buf.len()) {
            self.rotate()?;
        }

        if let Some(file) = &mut self.current_file {
            let written = file.write(buf)?;
            self.current_size += written as u64;
            Ok(written)
        } else {
            Err(io::Error::new(io::ErrorKind::Other, "日志文件未打开"))
        }
    }

    /// 刷新文件缓冲区
    fn flush_file(&mut self) -> io::Result<()> {
        if let Some(file) = &mut self.current_file {
            file.flush()?;
        }
        Ok(())
    }
}

/// 日志文件管理器（线程安全包装）
///
/// 实现了 Write trait，可以作为日志输出目标
pub struct LogFileManager {
    inner: Arc<Mutex<LogFileManagerInner>>,
}

impl LogFileManager {
    pub fn new(log_dir: PathBuf, max_file_size: u64) -> io::Result<Self> {
        let inner = LogFileManagerInner::new(log_dir, max_file_size)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
        })
    }
}

impl Write for LogFileManager {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        inner.write_data(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.flush_file()
    }
}

impl Clone for LogFileManager {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// 日志系统守卫
/// 必须保持存活，否则日志写入线程会终止
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// 初始化日志系统
///
/// # Arguments
/// * `config` - 日志配置
///
/// # Returns
/// * `LogGuard` - 日志守卫，需要保持存活直到程序结束
pub fn init_logging(config: &LogConfig) -> LogGuard {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
        .with_ansi(true);

    if config.enabled {
        // 确保日志目录存在
        if let Err(e) = fs::create_dir_all(&config.log_dir) {
            eprintln!("创建日志目录失败: {:?}, 错误: {}", config.log_dir, e);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .init();
            return LogGuard { _file_guard: None };
        }

        let file_manager = match LogFileManager::new(config.log_dir.clone(), config.max_file_size) {
            Ok(manager) => manager,
            Err(e) => {
                eprintln!("创建日志文件管理器失败: {}, 回退到仅控制台输出", e);
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .init();
                return LogGuard { _file_guard: None };
            }
        };

        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_manager);

        let file_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
            .with_ansi(false)
            .with_writer(non_blocking);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();

        info!(
            "日志系统初始化完成: 目录={:?}, 保留天数={}, 级别={}, 单文件最大={:.1}MB",
            config.log_dir,
            config.retention_days,
            config.level,
            config.max_file_size as f64 / 1024.0 / 1024.0
        );

        cleanup_old_logs(&config.log_dir, config.retention_days);

        LogGuard {
            _file_guard: Some(file_guard),
        }
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();

        info!("日志系统初始化完成（仅控制台输出）");
        LogGuard { _file_guard: None }
    }
}

/// 按修改时间清理过期日志文件
fn cleanup_old_logs(log_dir: &Path, retention_days: u32) {
    let now = chrono::Utc::now();
    let retention_duration = chrono::Duration::days(retention_days as i64);

    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("读取日志目录失败: {:?}, 错误: {}", log_dir, e);
            return;
        }
    };

    let mut deleted_count = 0;

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let filename = match path.file_name().and_then(|s| s.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if !filename.starts_with(LOG_FILE_PREFIX) || !filename.ends_with(".log") {
            continue;
        }

        let expired = entry
            .metadata()
            .and_then(|m| m.modified())
            .map(|modified| {
                let modified: chrono::DateTime<chrono::Utc> = modified.into();
                now.signed_duration_since(modified) > retention_duration
            })
            .unwrap_or(false);

        if expired {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("删除过期日志文件失败: {:?}, 错误: {}", path, e);
            } else {
                deleted_count += 1;
                tracing::debug!("已删除过期日志文件: {:?}", path);
            }
        }
    }

    if deleted_count > 0 {
        info!("已清理 {} 个过期日志文件", deleted_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_manager_rotation() {
        let temp_dir = TempDir::new().unwrap();
        // 单文件上限 16 字节，写两次触发滚动
        let mut manager = LogFileManager::new(temp_dir.path().to_path_buf(), 16).unwrap();

        manager.write(b"0123456789abcdef").unwrap();
        manager.write(b"next-file").unwrap();
        manager.flush().unwrap();

        let count = fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_generate_file_path() {
        let temp_dir = TempDir::new().unwrap();
        let inner = LogFileManagerInner::new(temp_dir.path().to_path_buf(), 1024).unwrap();

        let base = inner.generate_file_path(0);
        let rolled = inner.generate_file_path(2);
        let base_name = base.file_name().unwrap().to_string_lossy().to_string();
        let rolled_name = rolled.file_name().unwrap().to_string_lossy().to_string();

        assert!(base_name.starts_with("flashfs-manager."));
        assert!(base_name.ends_with(".log"));
        assert!(rolled_name.contains("_2.log"));
    }
}
