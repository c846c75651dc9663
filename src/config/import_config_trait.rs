// ==========================================
// 调查数据导入管道 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::error::ImportResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ==========================================
// AliasMatching - 别名唯一性比较口径
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasMatching {
    /// 忽略大小写（默认）
    #[default]
    CaseInsensitive,
    /// 区分大小写
    CaseSensitive,
}

impl AliasMatching {
    /// 别名比较键（TRIM + 可选小写）
    pub fn key(&self, alias: &str) -> String {
        match self {
            AliasMatching::CaseInsensitive => alias.trim().to_lowercase(),
            AliasMatching::CaseSensitive => alias.trim().to_string(),
        }
    }
}

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取别名比较口径
    ///
    /// # 默认值
    /// - CaseInsensitive
    async fn get_alias_matching(&self) -> ImportResult<AliasMatching>;

    /// 获取野生动物健康编号（WLH_ID）格式正则
    ///
    /// # 默认值
    /// - `^\d{2}-.+`
    async fn get_wlh_id_pattern(&self) -> ImportResult<String>;

    /// 获取默认性别选项（物种未定义性别选项时使用）
    ///
    /// # 默认值
    /// - ["Male", "Female", "Unknown", "Hermaphroditic"]
    async fn get_default_sex_options(&self) -> ImportResult<Vec<String>>;
}
