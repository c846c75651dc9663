// ==========================================
// 调查数据导入管道 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解析（首个工作表约定）
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// 输出: 大写表头列表 + 行记录（空单元格不入行，整行空白跳过）
// ==========================================

use crate::domain::row::{normalize_header, Row};
use crate::domain::types::CellValue;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_traits::FileParser;
use calamine::{Data, Reader, Xls, Xlsx};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

// ==========================================
// Worksheet - 解码后的工作表
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Worksheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Worksheet {
    pub fn new(name: &str, headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.to_string(),
            headers: headers.iter().map(|h| normalize_header(h)).collect(),
            rows,
        }
    }

    pub fn has_header(&self, header: &str) -> bool {
        let wanted = normalize_header(header);
        self.headers.iter().any(|h| *h == wanted)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

// ==========================================
// SpreadsheetFile - 上传文件（名称 + 内存缓冲）
// ==========================================
#[derive(Debug, Clone)]
pub struct SpreadsheetFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SpreadsheetFile {
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            bytes,
        }
    }

    /// 从磁盘读取
    pub fn from_path<P: AsRef<Path>>(path: P) -> ImportResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        Ok(Self { file_name, bytes })
    }
}

// ==========================================
// SpreadsheetFormat - 由扩展名判定
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Csv,
    Xlsx,
    Xls,
}

impl SpreadsheetFormat {
    pub fn from_file_name(file_name: &str) -> ImportResult<Self> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => Ok(SpreadsheetFormat::Csv),
            "xlsx" => Ok(SpreadsheetFormat::Xlsx),
            "xls" => Ok(SpreadsheetFormat::Xls),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Worksheet> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes);

        // 读取表头
        let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ImportError::MissingHeaderRow);
        }

        // 读取所有行
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row = Row::new();

            for (col_idx, value) in record.iter().enumerate() {
                let Some(header) = headers.get(col_idx) else {
                    continue;
                };
                if header.is_empty() {
                    continue;
                }
                if let Some(cell) = infer_text_cell(value) {
                    row.insert(header, cell);
                }
            }

            // 跳过完全空白的行
            if row.is_empty() {
                continue;
            }

            rows.push(row);
        }

        Ok(Worksheet::new("Sheet1", headers, rows))
    }
}

/// CSV 文本单元格推断：空白 → None，数值文本 → Number，其他 → Text
fn infer_text_cell(raw: &str) -> Option<CellValue> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let numeric_chars = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    let has_digit = value.chars().any(|c| c.is_ascii_digit());

    if numeric_chars && has_digit {
        if let Ok(n) = value.parse::<f64>() {
            if n.is_finite() {
                return Some(CellValue::Number(n));
            }
        }
    }

    Some(CellValue::Text(value.to_string()))
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser {
    format: SpreadsheetFormat,
}

impl ExcelParser {
    pub fn xlsx() -> Self {
        Self {
            format: SpreadsheetFormat::Xlsx,
        }
    }

    pub fn xls() -> Self {
        Self {
            format: SpreadsheetFormat::Xls,
        }
    }
}

impl FileParser for ExcelParser {
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Worksheet> {
        let cursor = Cursor::new(bytes.to_vec());
        match self.format {
            SpreadsheetFormat::Xls => {
                let workbook: Xls<_> = Xls::new(cursor)
                    .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;
                read_first_sheet(workbook)
            }
            _ => {
                let workbook: Xlsx<_> = Xlsx::new(cursor)?;
                read_first_sheet(workbook)
            }
        }
    }
}

/// 读取首个工作表
fn read_first_sheet<RS, R>(mut workbook: R) -> ImportResult<Worksheet>
where
    RS: Read + Seek,
    R: Reader<RS>,
{
    let sheet_names = workbook.sheet_names();
    let Some(sheet_name) = sheet_names.first().cloned() else {
        return Err(ImportError::ExcelParseError("Excel 文件无工作表".to_string()));
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ImportError::ExcelParseError(format!("{:?}", e)))?;

    // 提取表头（第一行）
    let mut rows_iter = range.rows();
    let header_row = rows_iter.next().ok_or(ImportError::MissingHeaderRow)?;
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| normalize_header(&cell.to_string()))
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ImportError::MissingHeaderRow);
    }

    // 读取数据行
    let mut rows = Vec::new();
    for data_row in rows_iter {
        let mut row = Row::new();

        for (col_idx, cell) in data_row.iter().enumerate() {
            let Some(header) = headers.get(col_idx) else {
                continue;
            };
            if header.is_empty() {
                continue;
            }
            if let Some(value) = excel_cell_value(cell) {
                row.insert(header, value);
            }
        }

        // 跳过完全空白的行
        if row.is_empty() {
            continue;
        }

        rows.push(row);
    }

    Ok(Worksheet::new(&sheet_name, headers, rows))
}

/// calamine 单元格 → CellValue
///
/// 纯时间单元格（序列值 < 1）转为 HH:MM:SS 文本，便于按字符串列处理
fn excel_cell_value(cell: &Data) -> Option<CellValue> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(CellValue::Text(trimmed.to_string()))
            }
        }
        Data::Float(f) => Some(CellValue::Number(*f)),
        Data::Int(i) => Some(CellValue::Number(*i as f64)),
        Data::Bool(b) => Some(CellValue::Bool(*b)),
        Data::DateTime(dt) => Some(excel_date_cell(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(CellValue::Text(s.trim().to_string())),
    }
}

/// 日期格式单元格 → CellValue
///
/// 超出 Excel 日期范围的序列值保留为数字，由类型校验阶段报告所在列
fn excel_date_cell(serial: f64) -> CellValue {
    match excel_serial_to_datetime(serial) {
        None => CellValue::Number(serial),
        Some(value) if serial < 1.0 => CellValue::Text(value.time().format("%H:%M:%S").to_string()),
        Some(value) => CellValue::Date(value),
    }
}

/// Excel 最大日期序列值（9999-12-31）
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

/// Excel 序列日期（1900 系统）→ NaiveDateTime
///
/// 负数、非有限值或超过 9999-12-31 的序列值返回 None
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial.trunc() > EXCEL_MAX_SERIAL {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = Duration::try_days(serial.trunc() as i64)?;
    let seconds = Duration::try_seconds(((serial - serial.trunc()) * 86_400.0).round() as i64)?;
    epoch.checked_add_signed(days.checked_add(&seconds)?)
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse(&self, file_name: &str, bytes: &[u8]) -> ImportResult<Worksheet> {
        match SpreadsheetFormat::from_file_name(file_name)? {
            SpreadsheetFormat::Csv => CsvParser.parse_bytes(bytes),
            SpreadsheetFormat::Xlsx => ExcelParser::xlsx().parse_bytes(bytes),
            SpreadsheetFormat::Xls => ExcelParser::xls().parse_bytes(bytes),
        }
    }

    pub fn parse_file<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Worksheet> {
        let file = SpreadsheetFile::from_path(file_path)?;
        self.parse(&file.file_name, &file.bytes)
    }
}
