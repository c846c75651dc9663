// ==========================================
// 调查数据导入管道 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: 内存 key-value（可由 JSON 对象文件或 Map 初始化）
// 约定: 值格式错误时记录 warn 并回退默认值，不中断导入
// ==========================================

use crate::config::import_config_trait::{AliasMatching, ImportConfigReader};
use crate::importer::error::{ImportError, ImportResult};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::RwLock;

pub const DEFAULT_WLH_ID_PATTERN: &str = r"^\d{2}-.+";
pub const DEFAULT_SEX_OPTIONS: [&str; 4] = ["Male", "Female", "Unknown", "Hermaphroditic"];

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Debug, Default)]
pub struct ConfigManager {
    values: RwLock<HashMap<String, String>>,
}

impl ConfigManager {
    /// 创建空配置（全部使用默认值）
    pub fn new() -> Self {
        Self::default()
    }

    /// 从已有 Map 创建
    pub fn from_map(values: HashMap<String, String>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    /// 从 JSON 对象文本创建
    ///
    /// # 说明
    /// - 字符串值原样保存，其他值（布尔、数组等）保存其 JSON 文本
    /// - 顶层不是对象 → ConfigReadError
    pub fn from_json_str(json: &str) -> ImportResult<Self> {
        let parsed: Value = serde_json::from_str(json)?;
        let object = parsed.as_object().ok_or_else(|| ImportError::ConfigReadError {
            key: "<root>".to_string(),
            message: "配置文件顶层必须是 JSON 对象".to_string(),
        })?;

        let values = object
            .iter()
            .map(|(key, value)| {
                let raw = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), raw)
            })
            .collect();

        Ok(Self::from_map(values))
    }

    /// 从 JSON 配置文件创建
    pub fn from_json_file(path: impl AsRef<Path>) -> ImportResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// 读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
        Ok(values.get(key).cloned())
    }

    /// 读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ImportResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 覆写配置值
    pub fn set_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// 获取所有配置的快照（JSON 格式，键有序）
    ///
    /// # 用途
    /// - 导入日志中记录本次生效的配置
    pub fn get_config_snapshot(&self) -> ImportResult<String> {
        let values = self
            .values
            .read()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))?;
        let ordered: BTreeMap<&String, &String> = values.iter().collect();
        Ok(serde_json::to_string(&ordered)?)
    }
}

/// 解析性别选项: JSON 数组或逗号分隔文本
fn parse_sex_options(raw: &str) -> Option<Vec<String>> {
    let options: Vec<String> = match serde_json::from_str::<Vec<String>>(raw) {
        Ok(list) => list,
        Err(_) => raw.split(',').map(|s| s.to_string()).collect(),
    };

    let options: Vec<String> = options
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if options.is_empty() {
        None
    } else {
        Some(options)
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_alias_matching(&self) -> ImportResult<AliasMatching> {
        let value = self.get_config_or_default(config_keys::ALIAS_CASE_SENSITIVE, "false")?;
        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(AliasMatching::CaseSensitive),
            "false" | "0" | "no" => Ok(AliasMatching::CaseInsensitive),
            _ => {
                tracing::warn!(
                    config_key = config_keys::ALIAS_CASE_SENSITIVE,
                    raw_value = %value,
                    "别名大小写配置格式错误，使用默认值（忽略大小写）"
                );
                Ok(AliasMatching::CaseInsensitive)
            }
        }
    }

    async fn get_wlh_id_pattern(&self) -> ImportResult<String> {
        let value = self.get_config_or_default(config_keys::WLH_ID_PATTERN, DEFAULT_WLH_ID_PATTERN)?;
        if Regex::new(&value).is_ok() {
            Ok(value)
        } else {
            tracing::warn!(
                config_key = config_keys::WLH_ID_PATTERN,
                raw_value = %value,
                "WLH_ID 正则无法编译，使用默认值"
            );
            Ok(DEFAULT_WLH_ID_PATTERN.to_string())
        }
    }

    async fn get_default_sex_options(&self) -> ImportResult<Vec<String>> {
        let default = || DEFAULT_SEX_OPTIONS.iter().map(|s| s.to_string()).collect();
        match self.get_config_value(config_keys::DEFAULT_SEX_OPTIONS)? {
            None => Ok(default()),
            Some(raw) => match parse_sex_options(&raw) {
                Some(options) => Ok(options),
                None => {
                    tracing::warn!(
                        config_key = config_keys::DEFAULT_SEX_OPTIONS,
                        raw_value = %raw,
                        "默认性别选项为空，使用内置默认值"
                    );
                    Ok(default())
                }
            },
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 别名唯一性比较（true = 区分大小写）
    pub const ALIAS_CASE_SENSITIVE: &str = "alias_case_sensitive";

    // 野生动物健康编号格式（正则）
    pub const WLH_ID_PATTERN: &str = "wlh_id_pattern";

    // 默认性别选项（JSON 数组或逗号分隔）
    pub const DEFAULT_SEX_OPTIONS: &str = "default_sex_options";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_when_empty() {
        let config = ConfigManager::new();
        assert_eq!(config.get_alias_matching().await.unwrap(), AliasMatching::CaseInsensitive);
        assert_eq!(config.get_wlh_id_pattern().await.unwrap(), DEFAULT_WLH_ID_PATTERN);
        assert_eq!(
            config.get_default_sex_options().await.unwrap(),
            vec!["Male", "Female", "Unknown", "Hermaphroditic"]
        );
    }

    #[tokio::test]
    async fn test_from_json_str() {
        let config = ConfigManager::from_json_str(
            r#"{"alias_case_sensitive": true, "default_sex_options": ["M", "F"]}"#,
        )
        .unwrap();

        assert_eq!(config.get_alias_matching().await.unwrap(), AliasMatching::CaseSensitive);
        assert_eq!(config.get_default_sex_options().await.unwrap(), vec!["M", "F"]);
    }

    #[tokio::test]
    async fn test_malformed_values_fall_back() {
        let config = ConfigManager::new();
        config.set_config_value(config_keys::ALIAS_CASE_SENSITIVE, "sometimes").unwrap();
        config.set_config_value(config_keys::WLH_ID_PATTERN, "([").unwrap();
        config.set_config_value(config_keys::DEFAULT_SEX_OPTIONS, " , ").unwrap();

        assert_eq!(config.get_alias_matching().await.unwrap(), AliasMatching::CaseInsensitive);
        assert_eq!(config.get_wlh_id_pattern().await.unwrap(), DEFAULT_WLH_ID_PATTERN);
        assert_eq!(config.get_default_sex_options().await.unwrap().len(), 4);
    }

    #[test]
    fn test_non_object_json_rejected() {
        let result = ConfigManager::from_json_str("[1, 2]");
        assert!(matches!(result, Err(ImportError::ConfigReadError { .. })));
    }

    #[test]
    fn test_comma_separated_sex_options() {
        assert_eq!(
            parse_sex_options("Male, Female ,"),
            Some(vec!["Male".to_string(), "Female".to_string()])
        );
    }

    #[test]
    fn test_snapshot_is_ordered() {
        let config = ConfigManager::new();
        config.set_config_value("b", "2").unwrap();
        config.set_config_value("a", "1").unwrap();
        assert_eq!(config.get_config_snapshot().unwrap(), r#"{"a":"1","b":"2"}"#);
    }
}
