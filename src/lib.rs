// ==========================================
// 调查数据导入管道 - 核心库
// ==========================================
// 职责: 电子表格（CSV/XLSX/XLS）→ 列规格校验 → 批量参考数据行校验 → 批量写入
// 边界: 参考数据与写入端为外部协作方（Trait 注入），本库不做持久化
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 单元格/行/参考数据/记录
pub mod domain;

// 导入层 - 解码、校验、编排
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{CellValue, ColumnType, Row};

// 导入管道
pub use importer::{
    import_spreadsheet, import_worksheet, ColumnSpec, ColumnSpecEntry, ImportError, ImportOutcome,
    ImportReport, ImportResult, ImportStage, ImportStrategy, ImportSummary, ImportTarget,
    InsertSink, ReferenceDataProvider, RowIssue, RowValidation, SpreadsheetFile,
};

// 配置
pub use config::{AliasMatching, ConfigManager, ImportConfigReader};

// ==========================================
// 常量定义
// ==========================================

// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
