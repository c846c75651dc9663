// ==========================================
// 调查数据导入管道 - 标记 (Marking) 导入策略
// ==========================================
// 流程:
// 1) 获取调查内个体（一次）
// 2) 并发批量获取: 已有捕获（去重个体）、标记部位（去重 TSN）、标记类型、颜色
// 3) 逐行校验
// 写入: bulk_create（标记）
// ==========================================

use crate::domain::records::{BulkPayload, MarkingRecord};
use crate::domain::reference::{find_option, VocabularyOption};
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

/// 标记导入列规格
pub fn marking_column_spec() -> ImportResult<ColumnSpec> {
    ColumnSpec::new(vec![
        ColumnSpecEntry::required("ALIAS", ColumnType::StringOrNumber).with_aliases(&["NICKNAME", "ANIMAL"]),
        ColumnSpecEntry::required("CAPTURE_DATE", ColumnType::Date),
        ColumnSpecEntry::optional("CAPTURE_TIME", ColumnType::String),
        ColumnSpecEntry::required("BODY_LOCATION", ColumnType::String).with_aliases(&["BODY_POSITION"]),
        ColumnSpecEntry::optional("MARKING_TYPE", ColumnType::String).with_aliases(&["TYPE"]),
        ColumnSpecEntry::optional("IDENTIFIER", ColumnType::StringOrNumber).with_aliases(&["ID"]),
        ColumnSpecEntry::optional("PRIMARY_COLOUR", ColumnType::String)
            .with_aliases(&["PRIMARY_COLOR", "COLOUR", "COLOR"]),
        ColumnSpecEntry::optional("SECONDARY_COLOUR", ColumnType::String).with_aliases(&["SECONDARY_COLOR"]),
        ColumnSpecEntry::optional("DESCRIPTION", ColumnType::String).with_aliases(&["COMMENT", "COMMENTS"]),
    ])
}

/// 可选词表列: 缺失 → Ok(None)，不在词表 → Err
fn optional_vocabulary(
    getter: &ColumnGetter<'_>,
    row: &Row,
    column: &str,
    options: &[VocabularyOption],
) -> Result<Option<Uuid>, String> {
    match getter.text(row, column) {
        None => Ok(None),
        Some(value) => find_option(options, &value)
            .map(|o| Some(o.id))
            .ok_or_else(|| format!("{} '{}' is not a recognized value.", column, value)),
    }
}

pub struct MarkingImportStrategy {
    survey_id: i64,
    provider: Arc<dyn ReferenceDataProvider>,
    sink: Arc<dyn InsertSink>,
    settings: ImportSettings,
    spec: ColumnSpec,
}

impl MarkingImportStrategy {
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
            spec: marking_column_spec()?,
        })
    }
}

#[async_trait]
impl ImportStrategy for MarkingImportStrategy {
    type Record = MarkingRecord;

    fn target(&self) -> ImportTarget {
        ImportTarget::Markings
    }

    fn column_spec(&self) -> &ColumnSpec {
        &self.spec
    }

    async fn validate_rows(&self, worksheet: &Worksheet) -> ImportResult<RowValidation<MarkingRecord>> {
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

        let (captures, body_locations, marking_types, colours) = futures::try_join!(
            self.provider.get_captures_for_critters(&critter_ids),
            self.provider.get_body_locations_for_taxa(&tsns),
            self.provider.get_marking_types(),
            self.provider.get_colours(),
        )?;

        let mut issues = RowIssues::new();
        let mut records = Vec::with_capacity(worksheet.row_count());

        for (idx, row) in worksheet.rows.iter().enumerate() {
            let mark = issues.mark();

            let critter = match resolve_alias(&index, &getter, row) {
                Ok(critter) => critter,
                Err(message) => {
                    issues.push(idx, message);
                    continue;
                }
            };

            let capture_time = optional_time(&getter, row, "CAPTURE_TIME")
                .map_err(|message| issues.push(idx, message))
                .unwrap_or(None);
            let capture_id = match getter.date(row, "CAPTURE_DATE") {
                None => {
                    issues.push(idx, "CAPTURE_DATE is required.");
                    None
                }
                Some(date) => {
                    let critter_captures = captures
                        .get(&critter.critter_id)
                        .map(Vec::as_slice)
                        .unwrap_or(&[]);
                    resolve_capture(critter_captures, date, capture_time)
                        .map(|c| c.capture_id)
                        .map_err(|message| issues.push(idx, message))
                        .ok()
                }
            };

            let locations = body_locations
                .get(&critter.itis_tsn)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let body_location_id = match getter.text(row, "BODY_LOCATION") {
                None => {
                    issues.push(idx, "BODY_LOCATION is required.");
                    None
                }
                Some(value) => match find_option(locations, &value) {
                    Some(option) => Some(option.id),
                    None => {
                        issues.push(idx, format!("BODY_LOCATION '{}' is not valid for this taxon.", value));
                        None
                    }
                },
            };

            let marking_type_id = optional_vocabulary(&getter, row, "MARKING_TYPE", &marking_types)
                .map_err(|message| issues.push(idx, message))
                .unwrap_or(None);
            let primary_colour_id = optional_vocabulary(&getter, row, "PRIMARY_COLOUR", &colours)
                .map_err(|message| issues.push(idx, message))
                .unwrap_or(None);
            let secondary_colour_id = optional_vocabulary(&getter, row, "SECONDARY_COLOUR", &colours)
                .map_err(|message| issues.push(idx, message))
                .unwrap_or(None);

            if issues.has_new_since(mark) {
                continue;
            }

            if let (Some(capture_id), Some(body_location_id)) = (capture_id, body_location_id) {
                records.push(MarkingRecord {
                    marking_id: Uuid::new_v4(),
                    critter_id: critter.critter_id,
                    capture_id,
                    body_location_id,
                    marking_type_id,
                    identifier: getter.text(row, "IDENTIFIER"),
                    primary_colour_id,
                    secondary_colour_id,
                    comment: getter.text(row, "DESCRIPTION"),
                });
            }
        }

        Ok(issues.into_validation(records))
    }

    async fn insert(&self, records: Vec<MarkingRecord>) -> ImportResult<InsertReceipt> {
        let payload = BulkPayload {
            markings: records,
            ..Default::default()
        };
        let expected = payload.counts();

        let response = self.sink.bulk_create(payload).await?;
        ensure_counts(&expected, &response.created)?;

        Ok(InsertReceipt {
            created: expected.markings,
            ..Default::default()
        })
    }
}
