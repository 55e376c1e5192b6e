/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{QuizAttempt, ScoreResult};

/// 初始化全局日志
///
/// `RUST_LOG` 优先；未设置时默认 `info`，`verbose` 为真时为 `debug`。
/// 重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 测验辅导模式");
    info!("🔌 题目后端: {}", config.backend);
    info!("🌐 后端地址: {}", config.api_base_url);
    info!("📊 每次测验题数: {}", config.question_count);
    info!("{}", "=".repeat(60));
}

/// 记录测验开始加载
pub fn log_attempt_start(attempt: &QuizAttempt) {
    info!("\n{}", "─".repeat(60));
    info!("📦 开始加载测验 {}", attempt);
    info!("{}", "─".repeat(60));
}

/// 记录题目加载完成
///
/// # 参数
/// - `topic`: 测验主题
/// - `total`: 题目数量
pub fn log_quiz_loaded(topic: &str, total: usize) {
    info!("✓ 主题「{}」共 {} 道题已就绪", topic, total);
}

/// 打印成绩统计
pub fn log_score(topic: &str, result: &ScoreResult) {
    info!("\n{}", "=".repeat(60));
    info!("📊 测验完成统计 - {}", topic);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("✅ 答对: {}", result);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("光合作用的产物", 4), "光合作用...");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(false);
        init(true);
    }
}
