use std::path::PathBuf;
use std::sync::OnceLock;

/// 数据根目录，进程内只允许设置一次
static ROOT_DIR: OnceLock<PathBuf> = OnceLock::new();

/// 固定存储层的数据根目录，`app.db` 将创建于该目录下。
///
/// 由 `crates/app` 在启动时根据配置调用一次；测试场景传入各自的临时目录。
/// 首次调用之后再设置无效，保证同一进程内所有存储实例落在同一目录。
pub fn set_root_dir(path: PathBuf) {
    let _ = ROOT_DIR.set(path);
}

/// 返回当前数据根目录；未设置时回落到相对路径 "data"。
pub(crate) fn get_root_dir() -> PathBuf {
    ROOT_DIR
        .get()
        .cloned()
        .unwrap_or_else(|| PathBuf::from("data"))
}
