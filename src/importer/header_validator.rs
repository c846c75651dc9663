// ==========================================
// 调查数据导入管道 - 表头/类型校验器
// ==========================================
// 职责: 回答“文件形状是否正确”，不做语义校验
// 顺序: 1) 必填列存在（列名或任一别名） 2) 至少一行数据 3) 单元格类型
// 红线: 任一步失败即整体失败，不产出部分结果
// ==========================================

use crate::importer::cell_getter::ColumnGetter;
use crate::importer::column_spec::ColumnSpec;
use crate::importer::file_parser::Worksheet;
use thiserror::Error;

// ==========================================
// CellTypeMismatch - 类型不匹配明细（日志用）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellTypeMismatch {
    pub column: String,
    pub resolved_header: String,
    pub row: usize,
    pub expected: &'static str,
    pub found: &'static str, // "missing" 表示必填单元格缺失
}

// ==========================================
// StructuralError - 结构性错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("缺少必填列: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("工作表无数据行")]
    EmptyWorksheet,

    #[error("列类型不匹配: {}", .columns.join(", "))]
    InvalidCellTypes {
        columns: Vec<String>,
        mismatches: Vec<CellTypeMismatch>,
    },
}

/// 必填列缺失检查（列名或任一别名存在即可）
pub fn missing_required_columns(worksheet: &Worksheet, spec: &ColumnSpec) -> Vec<String> {
    spec.entries()
        .iter()
        .filter(|e| !e.optional)
        .filter(|e| !e.header_candidates().any(|c| worksheet.has_header(c)))
        .map(|e| e.name.clone())
        .collect()
}

/// 单元格类型检查
///
/// # 规则
/// - 列在表头中不存在（仅可选列可能）→ 跳过
/// - 可选列单元格缺失 → 合法
/// - 必填列单元格缺失 → 不匹配
pub fn cell_type_mismatches(worksheet: &Worksheet, spec: &ColumnSpec) -> Vec<CellTypeMismatch> {
    let getter = ColumnGetter::new(spec);
    let mut mismatches = Vec::new();

    for entry in spec.entries() {
        let present = entry.header_candidates().any(|c| worksheet.has_header(c));
        if !present {
            continue;
        }

        for (row_idx, row) in worksheet.rows.iter().enumerate() {
            let lookup = getter.get(row, &entry.name);
            match lookup.value {
                None if entry.optional => {}
                None => mismatches.push(CellTypeMismatch {
                    column: entry.name.clone(),
                    resolved_header: lookup.resolved_header,
                    row: row_idx,
                    expected: entry.column_type.as_str(),
                    found: "missing",
                }),
                Some(value) if entry.column_type.accepts(value) => {}
                Some(value) => mismatches.push(CellTypeMismatch {
                    column: entry.name.clone(),
                    resolved_header: lookup.resolved_header,
                    row: row_idx,
                    expected: entry.column_type.as_str(),
                    found: value.kind(),
                }),
            }
        }
    }

    mismatches
}

/// 完整结构校验
pub fn validate_worksheet(worksheet: &Worksheet, spec: &ColumnSpec) -> Result<(), StructuralError> {
    let missing = missing_required_columns(worksheet, spec);
    if !missing.is_empty() {
        return Err(StructuralError::MissingColumns { columns: missing });
    }

    if worksheet.rows.is_empty() {
        return Err(StructuralError::EmptyWorksheet);
    }

    let mismatches = cell_type_mismatches(worksheet, spec);
    if !mismatches.is_empty() {
        let mut columns: Vec<String> = Vec::new();
        for m in &mismatches {
            if !columns.contains(&m.column) {
                columns.push(m.column.clone());
            }
        }
        return Err(StructuralError::InvalidCellTypes { columns, mismatches });
    }

    Ok(())
}
