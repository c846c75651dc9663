// ==========================================
// 调查数据导入管道 - 导入接口 Trait
// ==========================================
// 职责: 定义导入管道各接缝的接口（不包含实现）
// - FileParser: 文件解码（阶段 0）
// - ReferenceDataProvider: 外部参考数据（只接受去重后的批量键）
// - InsertSink: 外部批量写入
// - ImportStrategy: 列规格 + 行校验 + 写入（每个导入目标一个实现）
// ==========================================

use crate::domain::records::{BulkCreateResponse, BulkPayload, BulkUpdateResponse, TelemetryRecord};
use crate::domain::reference::{
    CaptureSummary, CollectionCategory, DeploymentSummary, SurveyCritter, TaxonMeasurements,
    TaxonRecord, VocabularyOption,
};
use crate::importer::column_spec::ColumnSpec;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::Worksheet;
use crate::importer::row_validation::{InsertReceipt, RowValidation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use uuid::Uuid;

// ==========================================
// FileParser Trait
// ==========================================
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析内存缓冲为工作表（首个工作表）
    ///
    /// # 返回
    /// - Ok(Worksheet): 大写表头 + 行记录
    /// - Err: 格式错误、缺少表头行
    fn parse_bytes(&self, bytes: &[u8]) -> ImportResult<Worksheet>;
}

// ==========================================
// ReferenceDataProvider Trait
// ==========================================
// 用途: 行校验所需的外部参考数据
// 约定: 调用方只传入去重后的批量键，绝不逐行调用
#[async_trait]
pub trait ReferenceDataProvider: Send + Sync {
    /// 按 TSN 批量查询分类（未知 TSN 不出现在结果中）
    async fn get_taxonomy_by_tsns(&self, tsns: &[i64]) -> ImportResult<Vec<TaxonRecord>>;

    /// 按 TSN 批量查询采集单元分类（TSN → 分类列表）
    async fn get_collection_units_for_taxa(
        &self,
        tsns: &[i64],
    ) -> ImportResult<HashMap<i64, Vec<CollectionCategory>>>;

    /// 按 TSN 批量查询性别选项（TSN 缺失时使用默认选项）
    async fn get_sex_options_for_taxa(&self, tsns: &[i64]) -> ImportResult<HashMap<i64, Vec<String>>>;

    /// 按 TSN 批量查询测量定义
    async fn get_measurements_for_taxa(
        &self,
        tsns: &[i64],
    ) -> ImportResult<HashMap<i64, TaxonMeasurements>>;

    /// 按 TSN 批量查询标记部位
    async fn get_body_locations_for_taxa(
        &self,
        tsns: &[i64],
    ) -> ImportResult<HashMap<i64, Vec<VocabularyOption>>>;

    /// 标记类型词表
    async fn get_marking_types(&self) -> ImportResult<Vec<VocabularyOption>>;

    /// 颜色词表
    async fn get_colours(&self) -> ImportResult<Vec<VocabularyOption>>;

    /// 调查内已有个体（别名 → 个体）
    async fn get_survey_critters(&self, survey_id: i64) -> ImportResult<Vec<SurveyCritter>>;

    /// 调查内已用别名
    ///
    /// # 默认实现
    /// - 由 get_survey_critters 派生
    async fn get_existing_aliases(&self, survey_id: i64) -> ImportResult<HashSet<String>> {
        Ok(self
            .get_survey_critters(survey_id)
            .await?
            .into_iter()
            .map(|c| c.alias)
            .collect())
    }

    /// 按个体批量查询已有捕获（个体 → 捕获列表）
    async fn get_captures_for_critters(
        &self,
        critter_ids: &[Uuid],
    ) -> ImportResult<HashMap<Uuid, Vec<CaptureSummary>>>;

    /// 调查内设备部署
    async fn get_survey_deployments(&self, survey_id: i64) -> ImportResult<Vec<DeploymentSummary>>;
}

// ==========================================
// InsertSink Trait
// ==========================================
// 用途: 外部批量写入端（非幂等，调用方不重试）
#[async_trait]
pub trait InsertSink: Send + Sync {
    /// 批量创建（返回各类实际创建数量）
    async fn bulk_create(&self, payload: BulkPayload) -> ImportResult<BulkCreateResponse>;

    /// 批量更新（返回各类实际更新数量）
    async fn bulk_update(&self, payload: BulkPayload) -> ImportResult<BulkUpdateResponse>;

    /// 将个体挂接到调查，返回调查个体 ID
    async fn add_critters_to_survey(
        &self,
        survey_id: i64,
        critter_ids: &[Uuid],
    ) -> ImportResult<Vec<i64>>;

    /// 写入人工遥测点，返回创建数量
    async fn create_manual_telemetry(&self, records: Vec<TelemetryRecord>) -> ImportResult<usize>;
}

// ==========================================
// ImportTarget - 导入目标
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportTarget {
    Critters,
    Captures,
    Markings,
    Measurements,
    Telemetry,
}

impl fmt::Display for ImportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportTarget::Critters => "critters",
            ImportTarget::Captures => "captures",
            ImportTarget::Markings => "markings",
            ImportTarget::Measurements => "measurements",
            ImportTarget::Telemetry => "telemetry",
        };
        f.write_str(s)
    }
}

// ==========================================
// ImportStrategy Trait
// ==========================================
// 实现者: CritterImportStrategy, CaptureImportStrategy, MarkingImportStrategy,
//         MeasurementImportStrategy, TelemetryImportStrategy
#[async_trait]
pub trait ImportStrategy: Send + Sync {
    /// 校验通过的记录类型
    type Record: Send;

    fn target(&self) -> ImportTarget;

    /// 列规格
    fn column_spec(&self) -> &ColumnSpec;

    /// 行级交叉校验
    ///
    /// # 前置条件
    /// - 工作表已通过表头/类型校验，且至少有一行数据
    ///
    /// # 返回
    /// - Ok(RowValidation::Valid): 全部行通过
    /// - Ok(RowValidation::Invalid): 累计的逐行错误
    /// - Err: 参考数据获取失败（协作方故障）
    async fn validate_rows(&self, worksheet: &Worksheet) -> ImportResult<RowValidation<Self::Record>>;

    /// 批量写入；数量不一致视为致命错误
    async fn insert(&self, records: Vec<Self::Record>) -> ImportResult<InsertReceipt>;
}
