// ==========================================
// 调查数据导入管道 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分层: 本地错误（文件/结构/类型/行）由编排器收敛为 ImportOutcome::Failed
//       协作方错误（参考数据/写入/数量不一致）以 Err 向调用方抛出
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("表头行缺失")]
    MissingHeaderRow,

    // ===== 列规格错误 =====
    #[error("列规格非法: {0}")]
    InvalidColumnSpec(String),

    // ===== 协作方错误 =====
    #[error("参考数据获取失败 ({source_name}): {message}")]
    ReferenceDataError {
        source_name: String,
        message: String,
    },

    #[error("批量写入失败: {0}")]
    InsertError(String),

    #[error("批量写入数量不一致 ({kind}): 提交 {expected}，实际创建 {created}")]
    PartialInsert {
        kind: String,
        expected: usize,
        created: usize,
    },

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 参考数据错误快捷构造
    pub fn reference(source_name: &str, message: impl Into<String>) -> Self {
        ImportError::ReferenceDataError {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    /// 是否为文件解码阶段错误（用户输入问题，非协作方故障）
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            ImportError::FileNotFound(_)
                | ImportError::UnsupportedFormat(_)
                | ImportError::FileReadError(_)
                | ImportError::ExcelParseError(_)
                | ImportError::CsvParseError(_)
                | ImportError::MissingHeaderRow
        )
    }

    /// 面向用户的通用提示（“导入失败，请重试”）
    pub fn user_message(&self) -> String {
        crate::i18n::t("import.failed_try_again")
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<calamine::XlsxError>
impl From<calamine::XlsxError> for ImportError {
    fn from(err: calamine::XlsxError) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>（配置文件解析）
impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::ConfigReadError {
            key: "<file>".to_string(),
            message: err.to_string(),
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_insert_message() {
        let err = ImportError::PartialInsert {
            kind: "critters".to_string(),
            expected: 3,
            created: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("critters"));
        assert!(msg.contains('3'));
        assert!(msg.contains('2'));
    }

    #[test]
    fn test_decode_error_classification() {
        assert!(ImportError::MissingHeaderRow.is_decode_error());
        assert!(ImportError::CsvParseError("bad".to_string()).is_decode_error());
        assert!(!ImportError::InsertError("down".to_string()).is_decode_error());
        assert!(!ImportError::reference("taxonomy", "timeout").is_decode_error());
    }

    #[test]
    fn test_user_message_is_generic() {
        let _guard = crate::i18n::LOCALE_TEST_LOCK.lock().unwrap();
        crate::i18n::set_locale("en");

        let partial = ImportError::PartialInsert {
            kind: "captures".to_string(),
            expected: 2,
            created: 1,
        };
        let insert = ImportError::InsertError("connection reset".to_string());
        assert_eq!(partial.user_message(), "Import failed, please try again.");
        assert_eq!(insert.user_message(), partial.user_message());
        assert!(!insert.user_message().contains("connection reset"));

        crate::i18n::set_locale("zh-CN");
        assert_eq!(insert.user_message(), "导入失败，请重试。");
        crate::i18n::set_locale("en");
    }
}
