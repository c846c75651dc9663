// ==========================================
// 调查数据导入管道 - 面向调用方的错误报告
// ==========================================
// 形态: { message, details: [ {csv_column_errors: [...]} | {csv_row_errors: [...]} ] }
// 列级错误附带完整列规格（告诉用户“文件应该长什么样”）
// 行级错误逐行列出
// ==========================================

use crate::i18n::{t, t_with_args};
use crate::importer::column_spec::{ColumnSpec, ColumnSpecification};
use crate::importer::error::ImportError;
use crate::importer::header_validator::StructuralError;
use crate::importer::row_validation::RowIssue;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportDetail {
    CsvColumnErrors(Vec<ColumnSpecification>),
    CsvRowErrors(Vec<RowIssue>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub message: String,
    #[serde(default)]
    pub details: Vec<ReportDetail>,
}

impl ImportReport {
    /// 文件解码失败（无明细）
    pub fn decode_failed(err: &ImportError) -> Self {
        Self {
            message: t_with_args("import.decode_failed", &[("reason", &err.to_string())]),
            details: Vec::new(),
        }
    }

    /// 结构/类型错误 + 完整列规格
    pub fn structural(err: &StructuralError, spec: &ColumnSpec) -> Self {
        let message = match err {
            StructuralError::MissingColumns { columns } => {
                t_with_args("import.missing_columns", &[("columns", &columns.join(", "))])
            }
            StructuralError::EmptyWorksheet => t("import.empty_worksheet"),
            StructuralError::InvalidCellTypes { columns, .. } => {
                t_with_args("import.invalid_cell_types", &[("columns", &columns.join(", "))])
            }
        };

        Self {
            message,
            details: vec![ReportDetail::CsvColumnErrors(spec.specification())],
        }
    }

    /// 行级语义错误
    pub fn rows(issues: Vec<RowIssue>) -> Self {
        Self {
            message: t_with_args("import.invalid_rows", &[("count", &issues.len().to_string())]),
            details: vec![ReportDetail::CsvRowErrors(issues)],
        }
    }

    pub fn column_errors(&self) -> Option<&[ColumnSpecification]> {
        self.details.iter().find_map(|d| match d {
            ReportDetail::CsvColumnErrors(columns) => Some(columns.as_slice()),
            _ => None,
        })
    }

    pub fn row_errors(&self) -> Option<&[RowIssue]> {
        self.details.iter().find_map(|d| match d {
            ReportDetail::CsvRowErrors(issues) => Some(issues.as_slice()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ColumnType;
    use crate::importer::column_spec::ColumnSpecEntry;
    use serde_json::json;

    #[test]
    fn test_row_report_shape() {
        let report = ImportReport::rows(vec![RowIssue {
            row: 1,
            message: "Alias 'M1' conflicts with another CSV row (0).".to_string(),
        }]);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value["details"],
            json!([{ "csv_row_errors": [{ "row": 1, "message": "Alias 'M1' conflicts with another CSV row (0)." }] }])
        );
        assert_eq!(report.row_errors().map(|r| r.len()), Some(1));
        assert!(report.column_errors().is_none());
    }

    #[test]
    fn test_structural_report_carries_spec() {
        let spec = ColumnSpec::new(vec![
            ColumnSpecEntry::required("ALIAS", ColumnType::String).with_aliases(&["NICKNAME"]),
        ])
        .unwrap();
        let report = ImportReport::structural(
            &StructuralError::MissingColumns {
                columns: vec!["ALIAS".to_string()],
            },
            &spec,
        );

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value["details"][0]["csv_column_errors"][0],
            json!({
                "column_name": "ALIAS",
                "column_type": "string",
                "column_aliases": ["NICKNAME"],
                "optional": false
            })
        );
    }
}
