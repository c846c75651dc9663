// ==========================================
// 调查数据导入管道 - 捕获 (Capture) 导入策略
// ==========================================
// 流程:
// 1) 获取调查内个体（一次），别名 → 个体
// 2) 按去重后的个体 ID 批量获取已有捕获（一次）
// 3) 逐行校验；同一个体 + 日期 + 时间命中已有捕获 → 复用 capture_id（更新）
//    文件内同一个体 + 日期 + 时间重复 → 首行保留，后续行报错
// 写入: 新捕获 bulk_create，已有捕获 bulk_update
// ==========================================

use crate::domain::records::{BulkPayload, CaptureRecord, LocationRecord};
use crate::domain::types::ColumnType;
use crate::importer::cell_getter::ColumnGetter;
use crate::importer::column_spec::{ColumnSpec, ColumnSpecEntry};
use crate::importer::error::ImportResult;
use crate::importer::file_parser::Worksheet;
use crate::importer::import_traits::{ImportStrategy, ImportTarget, InsertSink, ReferenceDataProvider};
use crate::importer::row_validation::{InsertReceipt, RowIssues, RowValidation};
use crate::importer::strategies::common::{
    distinct, ensure_counts, location_pair, optional_time, resolve_alias, ImportSettings,
    SurveyCritterIndex,
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// 捕获导入列规格
pub fn capture_column_spec() -> ImportResult<ColumnSpec> {
    ColumnSpec::new(vec![
        ColumnSpecEntry::required("ALIAS", ColumnType::StringOrNumber).with_aliases(&["NICKNAME", "ANIMAL"]),
        ColumnSpecEntry::required("CAPTURE_DATE", ColumnType::Date),
        ColumnSpecEntry::optional("CAPTURE_TIME", ColumnType::String),
        ColumnSpecEntry::required("CAPTURE_LATITUDE", ColumnType::Number).with_aliases(&["LATITUDE"]),
        ColumnSpecEntry::required("CAPTURE_LONGITUDE", ColumnType::Number).with_aliases(&["LONGITUDE"]),
        ColumnSpecEntry::optional("CAPTURE_COMMENT", ColumnType::String).with_aliases(&["COMMENT"]),
        ColumnSpecEntry::optional("RELEASE_DATE", ColumnType::Date),
        ColumnSpecEntry::optional("RELEASE_TIME", ColumnType::String),
        ColumnSpecEntry::optional("RELEASE_LATITUDE", ColumnType::Number),
        ColumnSpecEntry::optional("RELEASE_LONGITUDE", ColumnType::Number),
        ColumnSpecEntry::optional("RELEASE_COMMENT", ColumnType::String),
    ])
}

pub struct CaptureImportStrategy {
    survey_id: i64,
    provider: Arc<dyn ReferenceDataProvider>,
    sink: Arc<dyn InsertSink>,
    settings: ImportSettings,
    spec: ColumnSpec,
}

impl CaptureImportStrategy {
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
            spec: capture_column_spec()?,
        })
    }
}

#[async_trait]
impl ImportStrategy for CaptureImportStrategy {
    type Record = CaptureRecord;

    fn target(&self) -> ImportTarget {
        ImportTarget::Captures
    }

    fn column_spec(&self) -> &ColumnSpec {
        &self.spec
    }

    async fn validate_rows(&self, worksheet: &Worksheet) -> ImportResult<RowValidation<CaptureRecord>> {
        let getter = ColumnGetter::new(&self.spec);

        let critters = self.provider.get_survey_critters(self.survey_id).await?;
        let index = SurveyCritterIndex::new(critters, self.settings.alias_matching);

        let critter_ids = distinct(
            worksheet
                .rows
                .iter()
                .filter_map(|row| resolve_alias(&index, &getter, row).ok())
                .map(|c| c.critter_id),
        );
        let existing = self.provider.get_captures_for_critters(&critter_ids).await?;

        let mut issues = RowIssues::new();
        let mut records = Vec::with_capacity(worksheet.row_count());
        let mut first_seen: HashMap<(Uuid, NaiveDate, Option<NaiveTime>), usize> = HashMap::new();

        for (idx, row) in worksheet.rows.iter().enumerate() {
            let mark = issues.mark();

            let critter = resolve_alias(&index, &getter, row)
                .map_err(|message| issues.push(idx, message))
                .ok();

            let capture_date = getter.date(row, "CAPTURE_DATE");
            if capture_date.is_none() {
                issues.push(idx, "CAPTURE_DATE is required.");
            }
            let capture_time = optional_time(&getter, row, "CAPTURE_TIME")
                .map_err(|message| issues.push(idx, message))
                .unwrap_or(None);

            let capture_location =
                match location_pair(&getter, row, "Capture", "CAPTURE_LATITUDE", "CAPTURE_LONGITUDE") {
                    Ok(Some((lat, lon))) => Some(LocationRecord::new(lat, lon)),
                    Ok(None) => {
                        issues.push(idx, "CAPTURE_LATITUDE and CAPTURE_LONGITUDE are required.");
                        None
                    }
                    Err(message) => {
                        issues.push(idx, message);
                        None
                    }
                };

            let release_location =
                match location_pair(&getter, row, "Release", "RELEASE_LATITUDE", "RELEASE_LONGITUDE") {
                    Ok(pair) => pair.map(|(lat, lon)| LocationRecord::new(lat, lon)),
                    Err(message) => {
                        issues.push(idx, message);
                        None
                    }
                };

            let release_date = getter.date(row, "RELEASE_DATE");
            if let (Some(release), Some(capture)) = (release_date, capture_date) {
                if release < capture {
                    issues.push(
                        idx,
                        format!("RELEASE_DATE {} is before CAPTURE_DATE {}.", release, capture),
                    );
                }
            }
            let release_time = optional_time(&getter, row, "RELEASE_TIME")
                .map_err(|message| issues.push(idx, message))
                .unwrap_or(None);

            if let (Some(critter), Some(date)) = (critter, capture_date) {
                let key = (critter.critter_id, date, capture_time);
                match first_seen.get(&key) {
                    Some(first_row) => issues.push(
                        idx,
                        format!(
                            "Capture of '{}' on {} conflicts with another CSV row ({}). Captures must be unique per critter, date and time.",
                            critter.alias, date, first_row
                        ),
                    ),
                    None => {
                        first_seen.insert(key, idx);
                    }
                }
            }

            if issues.has_new_since(mark) {
                continue;
            }

            if let (Some(critter), Some(capture_date), Some(capture_location)) =
                (critter, capture_date, capture_location)
            {
                let matched = existing.get(&critter.critter_id).and_then(|captures| {
                    captures
                        .iter()
                        .find(|c| c.capture_date == capture_date && c.capture_time == capture_time)
                });

                records.push(CaptureRecord {
                    capture_id: matched.map_or_else(Uuid::new_v4, |c| c.capture_id),
                    critter_id: critter.critter_id,
                    capture_date,
                    capture_time,
                    capture_location,
                    capture_comment: getter.text(row, "CAPTURE_COMMENT"),
                    release_date,
                    release_time,
                    release_location,
                    release_comment: getter.text(row, "RELEASE_COMMENT"),
                    existing: matched.is_some(),
                });
            }
        }

        Ok(issues.into_validation(records))
    }

    async fn insert(&self, records: Vec<CaptureRecord>) -> ImportResult<InsertReceipt> {
        let (updates, creates): (Vec<CaptureRecord>, Vec<CaptureRecord>) =
            records.into_iter().partition(|c| c.existing);
        let mut receipt = InsertReceipt::default();

        if !creates.is_empty() {
            let payload = BulkPayload {
                captures: creates,
                ..Default::default()
            };
            let expected = payload.counts();
            let response = self.sink.bulk_create(payload).await?;
            ensure_counts(&expected, &response.created)?;
            receipt.created = expected.captures;
        }

        if !updates.is_empty() {
            let payload = BulkPayload {
                captures: updates,
                ..Default::default()
            };
            let expected = payload.counts();
            let response = self.sink.bulk_update(payload).await?;
            ensure_counts(&expected, &response.updated)?;
            receipt.updated = expected.captures;
        }

        Ok(receipt)
    }
}
