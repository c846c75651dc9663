// ==========================================
// 导入配置集成测试
// ==========================================
// 测试目标: JSON 配置文件加载 → ImportSettings 解析
// ==========================================

use async_trait::async_trait;
use std::io::Write;
use survey_csv_import::config::{AliasMatching, ConfigManager, ImportConfigReader};
use survey_csv_import::importer::{ImportError, ImportResult, ImportSettings};
use tempfile::Builder;

#[tokio::test]
async fn test_settings_from_json_file() {
    let mut file = Builder::new().suffix(".json").tempfile().unwrap();
    writeln!(
        file,
        r#"{{"alias_case_sensitive": "true", "wlh_id_pattern": "^WLH-\\d+$", "default_sex_options": "Male,Female"}}"#
    )
    .unwrap();

    let config = ConfigManager::from_json_file(file.path()).unwrap();
    let settings = ImportSettings::load(&config).await.unwrap();

    assert_eq!(settings.alias_matching, AliasMatching::CaseSensitive);
    assert!(settings.wlh_id_pattern.is_match("WLH-123"));
    assert!(!settings.wlh_id_pattern.is_match("21-123"));
    assert_eq!(settings.default_sex_options, vec!["Male", "Female"]);
}

#[tokio::test]
async fn test_missing_config_file() {
    let result = ConfigManager::from_json_file("/nonexistent/import-config.json");
    assert!(matches!(result, Err(ImportError::FileNotFound(_))));
}

#[tokio::test]
async fn test_malformed_config_file() {
    let mut file = Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, "{{ not json").unwrap();

    let result = ConfigManager::from_json_file(file.path());
    assert!(matches!(result, Err(ImportError::ConfigReadError { .. })));
}

/// 返回非法正则的配置读取器（ConfigManager 会回退默认值，这里绕过）
struct BrokenPatternConfig;

#[async_trait]
impl ImportConfigReader for BrokenPatternConfig {
    async fn get_alias_matching(&self) -> ImportResult<AliasMatching> {
        Ok(AliasMatching::CaseInsensitive)
    }

    async fn get_wlh_id_pattern(&self) -> ImportResult<String> {
        Ok("([".to_string())
    }

    async fn get_default_sex_options(&self) -> ImportResult<Vec<String>> {
        Ok(vec!["Male".to_string()])
    }
}

#[tokio::test]
async fn test_invalid_pattern_rejected() {
    let result = ImportSettings::load(&BrokenPatternConfig).await;
    match result {
        Err(ImportError::ConfigValueError { key, value, .. }) => {
            assert_eq!(key, "wlh_id_pattern");
            assert_eq!(value, "([");
        }
        other => panic!("expected ConfigValueError, got {:?}", other.map(|_| ())),
    }
}
