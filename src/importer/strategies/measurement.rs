// ==========================================
// 调查数据导入管道 - 测量 (Measurement) 导入策略
// ==========================================
// 列: ALIAS / CAPTURE_DATE / CAPTURE_TIME，其余列均视为测量名称
// 流程:
// 1) 获取调查内个体（一次）
// 2) 并发批量获取: 已有捕获（去重个体）、测量定义（去重 TSN）
// 3) 逐行逐列校验: 定性 → 选项匹配；定量 → 数值且在范围内
// 写入: bulk_create（定性 + 定量）
// ==========================================

use crate::domain::records::{
    BulkPayload, MeasurementRecord, QualitativeMeasurementRecord, QuantitativeMeasurementRecord,
};
use crate::domain::reference::{find_option, TaxonMeasurements};
use crate::domain::row::Row;
use crate::domain::types::ColumnType;
use crate::importer::cell_getter::ColumnGetter;
use crate::importer::column_spec::{ColumnSpec, ColumnSpecEntry};
use crate::importer::error::ImportResult;
use crate::importer::file_parser::Worksheet;
use crate::importer::import_traits::{ImportStrategy, ImportTarget, InsertSink, ReferenceDataProvider};
use crate::importer::row_validation::{InsertReceipt, RowIssues, RowValidation};
use crate::importer::strategies::common::{
    distinct, ensure_counts, optional_time, resolve_alias, resolve_capture, ImportSettings,
    SurveyCritterIndex,
};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// 测量导入列规格（仅标准列，测量列动态）
pub fn measurement_column_spec() -> ImportResult<ColumnSpec> {
    ColumnSpec::new(vec![
        ColumnSpecEntry::required("ALIAS", ColumnType::StringOrNumber).with_aliases(&["NICKNAME", "ANIMAL"]),
        ColumnSpecEntry::required("CAPTURE_DATE", ColumnType::Date),
        ColumnSpecEntry::optional("CAPTURE_TIME", ColumnType::String),
    ])
}

/// 单行测量列校验
///
/// # 返回
/// - (测量记录, 错误信息列表)
fn match_measurements(
    getter: &ColumnGetter<'_>,
    row: &Row,
    headers: &[String],
    definitions: Option<&TaxonMeasurements>,
    critter_id: Uuid,
    capture_id: Uuid,
) -> (MeasurementRecord, Vec<String>) {
    let mut record = MeasurementRecord::default();
    let mut issues = Vec::new();

    for header in headers {
        let Some(value) = getter.text(row, header) else {
            continue;
        };

        let definitions = match definitions.filter(|d| !d.is_empty()) {
            Some(definitions) => definitions,
            None => {
                issues.push("No measurements exist for this taxon.".to_string());
                break;
            }
        };

        if let Some(def) = definitions.find_qualitative(header) {
            match find_option(&def.options, &value) {
                Some(option) => record.qualitative.push(QualitativeMeasurementRecord {
                    measurement_qualitative_id: Uuid::new_v4(),
                    critter_id,
                    capture_id,
                    taxon_measurement_id: def.taxon_measurement_id,
                    qualitative_option_id: option.id,
                }),
                None => issues.push(format!(
                    "'{}' is not a valid option for {}. Allowed values: {}.",
                    value,
                    def.measurement_name,
                    def.options.iter().map(|o| o.label.as_str()).collect::<Vec<_>>().join(", ")
                )),
            }
        } else if let Some(def) = definitions.find_quantitative(header) {
            let Some(number) = getter.number(row, header) else {
                issues.push(format!("{} must be a number, got '{}'.", def.measurement_name, value));
                continue;
            };
            let below = def.min_value.map_or(false, |min| number < min);
            let above = def.max_value.map_or(false, |max| number > max);
            if below || above {
                issues.push(format!(
                    "{} value {} is outside the allowed range ({} to {}).",
                    def.measurement_name,
                    number,
                    def.min_value.map_or("-".to_string(), |v| v.to_string()),
                    def.max_value.map_or("-".to_string(), |v| v.to_string()),
                ));
                continue;
            }
            record.quantitative.push(QuantitativeMeasurementRecord {
                measurement_quantitative_id: Uuid::new_v4(),
                critter_id,
                capture_id,
                taxon_measurement_id: def.taxon_measurement_id,
                value: number,
            });
        } else {
            issues.push(format!("Column {} is not a measurement defined for this taxon.", header));
        }
    }

    (record, issues)
}

pub struct MeasurementImportStrategy {
    survey_id: i64,
    provider: Arc<dyn ReferenceDataProvider>,
    sink: Arc<dyn InsertSink>,
    settings: ImportSettings,
    spec: ColumnSpec,
}

impl MeasurementImportStrategy {
    pub fn new(
        survey_id: i64,
        provider: Arc<dyn ReferenceDataProvider>,
        sink: Arc<dyn InsertSink>,
        settings: ImportSettings,
    ) -> ImportResult<Self> {
        Ok(Self {
            survey_id,
            provider,
            sink,
            settings,
            spec: measurement_column_spec()?,
        })
    }
}

#[async_trait]
impl ImportStrategy for MeasurementImportStrategy {
    type Record = MeasurementRecord;

    fn target(&self) -> ImportTarget {
        ImportTarget::Measurements
    }

    fn column_spec(&self) -> &ColumnSpec {
        &self.spec
    }

    async fn validate_rows(&self, worksheet: &Worksheet) -> ImportResult<RowValidation<MeasurementRecord>> {
        let getter = ColumnGetter::new(&self.spec);

        let critters = self.provider.get_survey_critters(self.survey_id).await?;
        let index = SurveyCritterIndex::new(critters, self.settings.alias_matching);

        let resolved: Vec<_> = worksheet
            .rows
            .iter()
            .filter_map(|row| resolve_alias(&index, &getter, row).ok())
            .collect();
        let critter_ids = distinct(resolved.iter().map(|c| c.critter_id));
        let tsns = distinct(resolved.iter().map(|c| c.itis_tsn));

        let (captures, measurements) = futures::try_join!(
            self.provider.get_captures_for_critters(&critter_ids),
            self.provider.get_measurements_for_taxa(&tsns),
        )?;

        let measurement_headers = self.spec.non_standard_headers(&worksheet.headers);
        let mut issues = RowIssues::new();
        let mut records = Vec::with_capacity(worksheet.row_count());

        for (idx, row) in worksheet.rows.iter().enumerate() {
            let critter = match resolve_alias(&index, &getter, row) {
                Ok(critter) => critter,
                Err(message) => {
                    issues.push(idx, message);
                    continue;
                }
            };

            let capture_time = match optional_time(&getter, row, "CAPTURE_TIME") {
                Ok(time) => time,
                Err(message) => {
                    issues.push(idx, message);
                    continue;
                }
            };
            let Some(date) = getter.date(row, "CAPTURE_DATE") else {
                issues.push(idx, "CAPTURE_DATE is required.");
                continue;
            };
            let critter_captures = captures
                .get(&critter.critter_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let capture_id = match resolve_capture(critter_captures, date, capture_time) {
                Ok(capture) => capture.capture_id,
                Err(message) => {
                    issues.push(idx, message);
                    continue;
                }
            };

            let (record, row_issues) = match_measurements(
                &getter,
                row,
                &measurement_headers,
                measurements.get(&critter.itis_tsn),
                critter.critter_id,
                capture_id,
            );
            if row_issues.is_empty() {
                records.push(record);
            } else {
                for message in row_issues {
                    issues.push(idx, message);
                }
            }
        }

        Ok(issues.into_validation(records))
    }

    async fn insert(&self, records: Vec<MeasurementRecord>) -> ImportResult<InsertReceipt> {
        let mut payload = BulkPayload::default();
        for record in records {
            payload.qualitative_measurements.extend(record.qualitative);
            payload.quantitative_measurements.extend(record.quantitative);
        }
        let expected = payload.counts();

        let response = self.sink.bulk_create(payload).await?;
        ensure_counts(&expected, &response.created)?;

        Ok(InsertReceipt {
            created: expected.qualitative_measurements + expected.quantitative_measurements,
            ..Default::default()
        })
    }
}
