// ==========================================
// 调查数据导入管道 - 导入编排器
// ==========================================
// 状态机: Decoding → HeaderValidating → RowValidating → Inserting
// 终态: Succeeded / Failed(stage)
// 规则:
// - 任一阶段失败立即终止，不自动重试
// - 本地错误（解码/结构/类型/行）收敛为 ImportOutcome::Failed
// - 协作方错误（参考数据/写入/数量不一致）以 Err 抛给调用方
// - Inserting 是唯一有外部副作用的阶段
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::file_parser::{SpreadsheetFile, UniversalFileParser, Worksheet};
use crate::importer::header_validator::{validate_worksheet, StructuralError};
use crate::importer::import_traits::{ImportStrategy, ImportTarget};
use crate::importer::report::ImportReport;
use crate::importer::row_validation::RowValidation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

// ==========================================
// ImportStage - 导入阶段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    Decoding,
    HeaderValidating,
    RowValidating,
    Inserting,
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportStage::Decoding => "decoding",
            ImportStage::HeaderValidating => "header_validating",
            ImportStage::RowValidating => "row_validating",
            ImportStage::Inserting => "inserting",
        };
        f.write_str(s)
    }
}

// ==========================================
// ImportSummary - 成功结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub target: ImportTarget,
    pub rows: usize,
    pub created: usize,
    #[serde(default)]
    pub updated: usize,
    #[serde(default)]
    pub ids: Vec<i64>,
}

// ==========================================
// ImportOutcome - 导入终态
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    Succeeded(ImportSummary),
    Failed { stage: ImportStage, report: ImportReport },
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ImportOutcome::Succeeded(_))
    }

    pub fn summary(&self) -> Option<&ImportSummary> {
        match self {
            ImportOutcome::Succeeded(summary) => Some(summary),
            ImportOutcome::Failed { .. } => None,
        }
    }

    pub fn report(&self) -> Option<&ImportReport> {
        match self {
            ImportOutcome::Succeeded(_) => None,
            ImportOutcome::Failed { report, .. } => Some(report),
        }
    }
}

/// 从上传文件导入
///
/// # 返回
/// - Ok(Succeeded): 全部写入
/// - Ok(Failed): 文件/结构/类型/行错误（用户可修正）
/// - Err: 参考数据或写入端故障、写入数量不一致
#[instrument(skip(strategy, file), fields(target = %strategy.target(), file_name = %file.file_name))]
pub async fn import_spreadsheet<S: ImportStrategy>(
    strategy: &S,
    file: &SpreadsheetFile,
) -> ImportResult<ImportOutcome> {
    // === 阶段 1: 解码 ===
    debug!(stage = %ImportStage::Decoding, bytes = file.bytes.len(), "开始解码文件");
    let worksheet = match UniversalFileParser.parse(&file.file_name, &file.bytes) {
        Ok(worksheet) => worksheet,
        Err(e) if e.is_decode_error() => {
            warn!(error = %e, "文件解码失败");
            return Ok(ImportOutcome::Failed {
                stage: ImportStage::Decoding,
                report: ImportReport::decode_failed(&e),
            });
        }
        Err(e) => {
            error!(error = %e, "文件解码出现内部错误");
            return Err(e);
        }
    };
    info!(
        sheet = %worksheet.name,
        headers = worksheet.headers.len(),
        rows = worksheet.row_count(),
        "文件解码完成"
    );

    import_worksheet(strategy, &worksheet).await
}

/// 从已解码工作表导入（阶段 2-4）
#[instrument(skip(strategy, worksheet), fields(target = %strategy.target(), rows = worksheet.row_count()))]
pub async fn import_worksheet<S: ImportStrategy>(
    strategy: &S,
    worksheet: &Worksheet,
) -> ImportResult<ImportOutcome> {
    let start_time = Instant::now();
    let spec = strategy.column_spec();

    // === 阶段 2: 表头/类型校验 ===
    debug!(stage = %ImportStage::HeaderValidating, "开始表头/类型校验");
    if let Err(e) = validate_worksheet(worksheet, spec) {
        match &e {
            StructuralError::InvalidCellTypes { mismatches, .. } => {
                for m in mismatches {
                    debug!(
                        column = %m.column,
                        header = %m.resolved_header,
                        row = m.row,
                        expected = m.expected,
                        found = m.found,
                        "单元格类型不匹配"
                    );
                }
                warn!(error = %e, count = mismatches.len(), "类型校验失败");
            }
            _ => warn!(error = %e, "表头校验失败"),
        }
        return Ok(ImportOutcome::Failed {
            stage: ImportStage::HeaderValidating,
            report: ImportReport::structural(&e, spec),
        });
    }
    info!("表头/类型校验通过");

    // === 阶段 3: 行校验 ===
    debug!(stage = %ImportStage::RowValidating, "开始行校验");
    let records = match strategy.validate_rows(worksheet).await {
        Ok(RowValidation::Valid(records)) => records,
        Ok(RowValidation::Invalid { issues }) => {
            warn!(issues = issues.len(), "行校验未通过");
            return Ok(ImportOutcome::Failed {
                stage: ImportStage::RowValidating,
                report: ImportReport::rows(issues),
            });
        }
        Err(e) => {
            error!(error = %e, "行校验时参考数据获取失败");
            return Err(e);
        }
    };
    info!(records = records.len(), "行校验通过");

    // === 阶段 4: 写入 ===
    debug!(stage = %ImportStage::Inserting, "开始批量写入");
    let receipt = strategy.insert(records).await.map_err(|e| {
        error!(error = %e, "批量写入失败");
        e
    })?;

    info!(
        created = receipt.created,
        updated = receipt.updated,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "导入完成"
    );

    Ok(ImportOutcome::Succeeded(ImportSummary {
        target: strategy.target(),
        rows: worksheet.row_count(),
        created: receipt.created,
        updated: receipt.updated,
        ids: receipt.ids,
    }))
}
