// ==========================================
// 调查数据导入管道 - 配置层
// ==========================================
// 职责: 导入配置读取（别名比较口径、WLH_ID 格式、默认性别选项）
// 存储: 内存 key-value
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, DEFAULT_SEX_OPTIONS, DEFAULT_WLH_ID_PATTERN};
pub use import_config_trait::{AliasMatching, ImportConfigReader};
