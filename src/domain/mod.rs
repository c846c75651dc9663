// ==========================================
// 调查数据导入管道 - 领域模型层
// ==========================================
// 职责: 单元格/行、参考数据、校验后记录与批量写入载荷
// 红线: 不含 I/O，不含校验流程
// ==========================================

pub mod records;
pub mod reference;
pub mod row;
pub mod types;

// 重导出核心类型
pub use records::{
    BulkCounts, BulkCreateResponse, BulkPayload, BulkUpdateResponse, CaptureRecord,
    CollectionUnitAssignment, CritterRecord, LocationRecord, MarkingRecord, MeasurementRecord,
    QualitativeMeasurementRecord, QuantitativeMeasurementRecord, TelemetryRecord,
};
pub use reference::{
    find_option, CaptureSummary, CollectionCategory, CollectionUnit, DeploymentSummary,
    QualitativeMeasurementDef, QuantitativeMeasurementDef, SurveyCritter, TaxonMeasurements,
    TaxonRecord, VocabularyOption,
};
pub use row::{normalize_header, Row};
pub use types::{CellValue, ColumnType};
