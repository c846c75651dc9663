// ==========================================
// 调查数据导入管道 - 领域类型定义
// ==========================================
// 职责: 单元格取值 + 列类型（封闭枚举）
// 红线: 列类型只允许 string / number / date / string|number
// ==========================================

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 列类型 (Column Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Number,
    Date,
    StringOrNumber,
}

impl ColumnType {
    /// 判断单元格取值是否满足列类型
    ///
    /// # 规则
    /// - String: 仅文本
    /// - Number: 仅数值
    /// - Date: 日期单元格，或可解析为日历日期的文本
    /// - StringOrNumber: 文本或数值
    pub fn accepts(&self, value: &CellValue) -> bool {
        match (self, value) {
            (ColumnType::String, CellValue::Text(_)) => true,
            (ColumnType::Number, CellValue::Number(_)) => true,
            (ColumnType::Date, CellValue::Date(_)) => true,
            (ColumnType::Date, CellValue::Text(s)) => parse_date_text(s).is_some(),
            (ColumnType::StringOrNumber, CellValue::Text(_) | CellValue::Number(_)) => true,
            _ => false,
        }
    }

    /// 人类可读名称（用于错误提示与规格渲染）
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::StringOrNumber => "string|number",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 单元格取值 (Cell Value)
// ==========================================
// 空单元格不落入 Row，缺失即“不存在”
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
    Bool(bool),
}

impl CellValue {
    /// 文本表示（数值整数去掉小数部分）
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Date(dt) => {
                if dt.time() == NaiveTime::MIN {
                    dt.date().format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%d %H:%M:%S").to_string()
                }
            }
            CellValue::Bool(b) => b.to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(dt) => Some(dt.date()),
            CellValue::Text(s) => parse_date_text(s),
            _ => None,
        }
    }

    /// 运行时类型名（用于类型不匹配日志）
    pub fn kind(&self) -> &'static str {
        match self {
            CellValue::Text(_) => "string",
            CellValue::Number(_) => "number",
            CellValue::Date(_) => "date",
            CellValue::Bool(_) => "boolean",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// 数值格式化：整数不带小数点
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// ==========================================
// 日期解析
// ==========================================
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y", "%Y%m%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// 解析日期文本，失败返回 None
pub fn parse_date_text(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive())
}

/// 解析时间文本（HH:MM 或 HH:MM:SS）
pub fn parse_time_text(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_accepts() {
        let text = CellValue::Text("moose".to_string());
        let num = CellValue::Number(180703.0);

        assert!(ColumnType::String.accepts(&text));
        assert!(!ColumnType::String.accepts(&num));
        assert!(ColumnType::Number.accepts(&num));
        assert!(!ColumnType::Number.accepts(&text));
        assert!(ColumnType::StringOrNumber.accepts(&text));
        assert!(ColumnType::StringOrNumber.accepts(&num));
        assert!(!ColumnType::StringOrNumber.accepts(&CellValue::Bool(true)));
    }

    #[test]
    fn test_date_accepts_parseable_text() {
        assert!(ColumnType::Date.accepts(&CellValue::Text("2024-05-01".to_string())));
        assert!(ColumnType::Date.accepts(&CellValue::Text("05/01/2024".to_string())));
        assert!(ColumnType::Date.accepts(&CellValue::Text("2024-05-01T10:00:00Z".to_string())));
        assert!(!ColumnType::Date.accepts(&CellValue::Text("2024-13-45".to_string())));
        assert!(!ColumnType::Date.accepts(&CellValue::Text("yesterday".to_string())));
        assert!(!ColumnType::Date.accepts(&CellValue::Number(45000.0)));
    }

    #[test]
    fn test_as_text_number_formatting() {
        assert_eq!(CellValue::Number(12.0).as_text(), "12");
        assert_eq!(CellValue::Number(12.5).as_text(), "12.5");
    }

    #[test]
    fn test_parse_time_text() {
        assert_eq!(parse_time_text("08:30"), NaiveTime::from_hms_opt(8, 30, 0));
        assert_eq!(parse_time_text("08:30:15"), NaiveTime::from_hms_opt(8, 30, 15));
        assert_eq!(parse_time_text("8h30"), None);
    }
}
