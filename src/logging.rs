// ==========================================
// 调查数据导入管道 - 日志系统初始化
// ==========================================
// 工具: tracing + tracing-subscriber
// 级别: RUST_LOG 环境变量（默认 info）
// 格式: 文本（开发）或 JSON（日志采集）
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// 从 LOG_FORMAT 环境变量读取（"json" → Json，其余 → Text）
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化日志系统（格式由 LOG_FORMAT 决定）
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器，例如 RUST_LOG=survey_csv_import=debug
/// - LOG_FORMAT: text / json
///
/// # 示例
/// ```no_run
/// use survey_csv_import::logging;
/// logging::init();
/// ```
pub fn init() {
    init_with_format(LogFormat::from_env());
}

/// 按指定格式初始化；重复初始化静默忽略
pub fn init_with_format(format: LogFormat) {
    let builder = fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .with_line_number(true);

    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
}

/// 初始化测试环境的日志系统
///
/// 使用 debug 级别并输出到测试捕获
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
