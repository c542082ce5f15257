// 分块上传接收模块
//
// 每个传输对应一个上传会话状态机：
// - 首块（offset 0）：解析 backend、按需补齐父目录、打开并截断目标文件
// - 中间块：按到达顺序追加
// - 末块（final 标记）：先追加携带的数据，再关闭句柄并产出完成摘要
//
// 调用方（传输层）保证同一文件名的块按 offset 连续递增送达，
// 核心不做乱序防御。

mod manager;
mod session;

pub use manager::{ChunkOutcome, UploadManager, UploadSummary};
pub use session::{UploadError, UploadSession};
