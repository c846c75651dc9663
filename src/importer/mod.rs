// ==========================================
// 调查数据导入管道 - 导入层
// ==========================================
// 流程: 解码 → 表头/类型校验 → 行校验（批量参考数据）→ 批量写入
// 支持: CSV, Excel (.xlsx/.xls)
// ==========================================

// 模块声明
pub mod cell_getter;
pub mod column_spec;
pub mod error;
pub mod file_parser;
pub mod header_validator;
pub mod import_traits;
pub mod orchestrator;
pub mod report;
pub mod row_validation;
pub mod strategies;

// 重导出核心类型
pub use cell_getter::{CellLookup, ColumnGetter};
pub use column_spec::{column_names_from_rendered, ColumnSpec, ColumnSpecEntry, ColumnSpecification};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, SpreadsheetFile, UniversalFileParser, Worksheet};
pub use header_validator::{validate_worksheet, CellTypeMismatch, StructuralError};
pub use orchestrator::{import_spreadsheet, import_worksheet, ImportOutcome, ImportStage, ImportSummary};
pub use report::{ImportReport, ReportDetail};
pub use row_validation::{InsertReceipt, RowIssue, RowIssues, RowValidation};
pub use strategies::{
    CaptureImportStrategy, CritterImportStrategy, ImportSettings, MarkingImportStrategy,
    MeasurementImportStrategy, TelemetryImportStrategy,
};

// 重导出 Trait 接口
pub use import_traits::{FileParser, ImportStrategy, ImportTarget, InsertSink, ReferenceDataProvider};
