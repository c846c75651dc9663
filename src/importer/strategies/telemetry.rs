// ==========================================
// 调查数据导入管道 - 人工遥测 (Telemetry) 导入策略
// ==========================================
// 流程: 获取调查内设备部署（一次）→ 逐行按设备 + 日期定位唯一部署
// 写入: create_manual_telemetry
// ==========================================

use crate::domain::records::TelemetryRecord;
use crate::domain::reference::DeploymentSummary;
use crate::domain::types::ColumnType;
use crate::importer::cell_getter::ColumnGetter;
use crate::importer::column_spec::{ColumnSpec, ColumnSpecEntry};
use crate::importer::error::ImportResult;
use crate::importer::file_parser::Worksheet;
use crate::importer::import_traits::{ImportStrategy, ImportTarget, InsertSink, ReferenceDataProvider};
use crate::importer::row_validation::{InsertReceipt, RowIssues, RowValidation};
use crate::importer::strategies::common::{coordinate_issue, ensure_count, optional_time};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;
use uuid::Uuid;

/// 遥测导入列规格
pub fn telemetry_column_spec() -> ImportResult<ColumnSpec> {
    ColumnSpec::new(vec![
        ColumnSpecEntry::required("DEVICE_ID", ColumnType::Number).with_aliases(&["DEVICE"]),
        ColumnSpecEntry::required("DATE", ColumnType::Date),
        ColumnSpecEntry::optional("TIME", ColumnType::String),
        ColumnSpecEntry::required("LATITUDE", ColumnType::Number).with_aliases(&["LAT"]),
        ColumnSpecEntry::required("LONGITUDE", ColumnType::Number).with_aliases(&["LON", "LONG"]),
    ])
}

/// 定位设备在指定日期的唯一部署
fn resolve_deployment(
    deployments: &[DeploymentSummary],
    device_id: i64,
    date: NaiveDate,
) -> Result<Uuid, String> {
    let active: Vec<&DeploymentSummary> = deployments
        .iter()
        .filter(|d| d.device_id == device_id && d.covers(date))
        .collect();

    match active.as_slice() {
        [deployment] => Ok(deployment.deployment_id),
        [] => Err(format!("No deployment of device {} is active on {}.", device_id, date)),
        _ => Err(format!(
            "Device {} has multiple deployments active on {}.",
            device_id, date
        )),
    }
}

pub struct TelemetryImportStrategy {
    survey_id: i64,
    provider: Arc<dyn ReferenceDataProvider>,
    sink: Arc<dyn InsertSink>,
    spec: ColumnSpec,
}

impl TelemetryImportStrategy {
    pub fn new(
        survey_id: i64,
        provider: Arc<dyn ReferenceDataProvider>,
        sink: Arc<dyn InsertSink>,
    ) -> ImportResult<Self> {
        Ok(Self {
            survey_id,
            provider,
            sink,
            spec: telemetry_column_spec()?,
        })
    }
}

#[async_trait]
impl ImportStrategy for TelemetryImportStrategy {
    type Record = TelemetryRecord;

    fn target(&self) -> ImportTarget {
        ImportTarget::Telemetry
    }

    fn column_spec(&self) -> &ColumnSpec {
        &self.spec
    }

    async fn validate_rows(&self, worksheet: &Worksheet) -> ImportResult<RowValidation<TelemetryRecord>> {
        let getter = ColumnGetter::new(&self.spec);
        let deployments = self.provider.get_survey_deployments(self.survey_id).await?;

        let mut issues = RowIssues::new();
        let mut records = Vec::with_capacity(worksheet.row_count());

        for (idx, row) in worksheet.rows.iter().enumerate() {
            let mark = issues.mark();

            let time = optional_time(&getter, row, "TIME")
                .map_err(|message| issues.push(idx, message))
                .unwrap_or(None);

            let deployment_id = match (getter.integer(row, "DEVICE_ID"), getter.date(row, "DATE")) {
                (Some(device_id), Some(date)) => resolve_deployment(&deployments, device_id, date)
                    .map_err(|message| issues.push(idx, message))
                    .ok()
                    .map(|id| (id, date)),
                (None, _) => {
                    issues.push(idx, "DEVICE_ID must be a whole number.");
                    None
                }
                (_, None) => {
                    issues.push(idx, "DATE is required.");
                    None
                }
            };

            let coordinates = match (getter.number(row, "LATITUDE"), getter.number(row, "LONGITUDE")) {
                (Some(lat), Some(lon)) => match coordinate_issue("Telemetry", lat, lon) {
                    Some(message) => {
                        issues.push(idx, message);
                        None
                    }
                    None => Some((lat, lon)),
                },
                _ => {
                    issues.push(idx, "LATITUDE and LONGITUDE are required.");
                    None
                }
            };

            if issues.has_new_since(mark) {
                continue;
            }

            if let (Some((deployment_id, date)), Some((latitude, longitude))) = (deployment_id, coordinates) {
                records.push(TelemetryRecord {
                    telemetry_manual_id: Uuid::new_v4(),
                    deployment_id,
                    latitude,
                    longitude,
                    acquisition_date: date.and_time(time.unwrap_or(NaiveTime::MIN)),
                });
            }
        }

        Ok(issues.into_validation(records))
    }

    async fn insert(&self, records: Vec<TelemetryRecord>) -> ImportResult<InsertReceipt> {
        let expected = records.len();
        let created = self.sink.create_manual_telemetry(records).await?;
        ensure_count("telemetry", expected, created)?;

        Ok(InsertReceipt {
            created,
            ..Default::default()
        })
    }
}
