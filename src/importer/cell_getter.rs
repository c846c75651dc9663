// ==========================================
// 调查数据导入管道 - 列/单元格取值器
// ==========================================
// 职责: 按逻辑列名取单元格（列名优先，其次别名按声明顺序）
// 约定: 取不到时 value = None 且 resolved_header = 逻辑列名，从不报错
// 说明: 所有行校验器通过此处读取单元格，与“用户用了哪个表头”解耦
// ==========================================

use crate::domain::row::{normalize_header, Row};
use crate::domain::types::{format_number, parse_time_text, CellValue};
use crate::importer::column_spec::ColumnSpec;
use chrono::{NaiveDate, NaiveTime};

// ==========================================
// CellLookup - 取值结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct CellLookup<'r> {
    pub resolved_header: String,
    pub value: Option<&'r CellValue>,
}

// ==========================================
// ColumnGetter - 列取值器
// ==========================================
#[derive(Debug, Clone, Copy)]
pub struct ColumnGetter<'s> {
    spec: &'s ColumnSpec,
}

impl<'s> ColumnGetter<'s> {
    pub fn new(spec: &'s ColumnSpec) -> Self {
        Self { spec }
    }

    /// 按逻辑列名取值
    ///
    /// # 解析顺序
    /// 1. 规范列名
    /// 2. 别名（声明顺序）
    /// 规格中不存在的列名（如动态采集单元列）只按名称本身查找
    pub fn get<'r>(&self, row: &'r Row, name: &str) -> CellLookup<'r> {
        let key = normalize_header(name);

        if let Some(entry) = self.spec.entry(&key) {
            for candidate in entry.header_candidates() {
                if let Some(value) = row.get(candidate) {
                    return CellLookup {
                        resolved_header: candidate.to_string(),
                        value: Some(value),
                    };
                }
            }
        } else if let Some(value) = row.get(&key) {
            return CellLookup {
                resolved_header: key,
                value: Some(value),
            };
        }

        CellLookup {
            resolved_header: key,
            value: None,
        }
    }

    /// 文本取值（数值按整数格式渲染，空白视为缺失）
    pub fn text(&self, row: &Row, name: &str) -> Option<String> {
        self.get(row, name)
            .value
            .map(|v| match v {
                CellValue::Number(n) => format_number(*n),
                other => other.as_text().trim().to_string(),
            })
            .filter(|s| !s.is_empty())
    }

    pub fn number(&self, row: &Row, name: &str) -> Option<f64> {
        self.get(row, name).value.and_then(CellValue::as_number)
    }

    /// 整数取值（非整数返回 None）
    pub fn integer(&self, row: &Row, name: &str) -> Option<i64> {
        self.number(row, name)
            .filter(|n| n.fract() == 0.0)
            .map(|n| n as i64)
    }

    pub fn date(&self, row: &Row, name: &str) -> Option<NaiveDate> {
        self.get(row, name).value.and_then(CellValue::as_date)
    }

    /// 时间取值
    ///
    /// # 返回
    /// - Ok(None): 单元格缺失
    /// - Ok(Some): 解析成功
    /// - Err(原始文本): 存在但无法解析
    pub fn time(&self, row: &Row, name: &str) -> Result<Option<NaiveTime>, String> {
        match self.get(row, name).value {
            None => Ok(None),
            Some(CellValue::Date(dt)) => Ok(Some(dt.time())),
            Some(other) => {
                let raw = other.as_text();
                parse_time_text(&raw).map(Some).ok_or(raw)
            }
        }
    }
}
