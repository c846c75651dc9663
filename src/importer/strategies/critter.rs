// ==========================================
// 调查数据导入管道 - 个体 (Critter) 导入策略
// ==========================================
// 列: ITIS_TSN / SEX / ALIAS / WLH_ID / DESCRIPTION + 动态采集单元列
// 流程:
// 1) 收集去重 TSN
// 2) 并发批量获取: 分类、已有别名、采集单元、性别选项（各一次）
// 3) 逐行校验（累计错误，不中断）
// 写入: bulk_create（个体 + 采集单元）→ add_critters_to_survey
// ==========================================

use crate::domain::records::{BulkPayload, CollectionUnitAssignment, CritterRecord};
use crate::domain::reference::{CollectionCategory, TaxonRecord};
use crate::domain::row::Row;
use crate::domain::types::ColumnType;
use crate::importer::cell_getter::ColumnGetter;
use crate::importer::column_spec::{ColumnSpec, ColumnSpecEntry};
use crate::importer::error::ImportResult;
use crate::importer::file_parser::Worksheet;
use crate::importer::import_traits::{ImportStrategy, ImportTarget, InsertSink, ReferenceDataProvider};
use crate::importer::row_validation::{InsertReceipt, RowIssues, RowValidation};
use crate::importer::strategies::common::{distinct, ensure_count, ensure_counts, ImportSettings};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// 个体导入列规格
pub fn critter_column_spec() -> ImportResult<ColumnSpec> {
    ColumnSpec::new(vec![
        ColumnSpecEntry::required("ITIS_TSN", ColumnType::Number).with_aliases(&["TAXON", "SPECIES", "TSN"]),
        ColumnSpecEntry::required("SEX", ColumnType::String),
        ColumnSpecEntry::required("ALIAS", ColumnType::StringOrNumber).with_aliases(&["NICKNAME", "ANIMAL"]),
        ColumnSpecEntry::optional("WLH_ID", ColumnType::String),
        ColumnSpecEntry::optional("DESCRIPTION", ColumnType::String).with_aliases(&["COMMENT", "COMMENTS"]),
    ])
}

// ==========================================
// 参考数据快照（行校验结束即丢弃）
// ==========================================
struct CritterReference {
    taxa: HashMap<i64, TaxonRecord>,
    existing_aliases: HashSet<String>,
    collection_units: HashMap<i64, Vec<CollectionCategory>>,
    sex_options: HashMap<i64, Vec<String>>,
}

// ==========================================
// CritterImportStrategy
// ==========================================
pub struct CritterImportStrategy {
    survey_id: i64,
    provider: Arc<dyn ReferenceDataProvider>,
    sink: Arc<dyn InsertSink>,
    settings: ImportSettings,
    spec: ColumnSpec,
}

impl CritterImportStrategy {
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
            spec: critter_column_spec()?,
        })
    }

    /// 批量获取参考数据（每类一次，键已去重）
    async fn fetch_reference(&self, tsns: &[i64]) -> ImportResult<CritterReference> {
        let (taxa, aliases, collection_units, sex_options) = futures::try_join!(
            self.provider.get_taxonomy_by_tsns(tsns),
            self.provider.get_existing_aliases(self.survey_id),
            self.provider.get_collection_units_for_taxa(tsns),
            self.provider.get_sex_options_for_taxa(tsns),
        )?;

        Ok(CritterReference {
            taxa: taxa.into_iter().map(|t| (t.tsn, t)).collect(),
            existing_aliases: aliases
                .iter()
                .map(|a| self.settings.alias_matching.key(a))
                .collect(),
            collection_units,
            sex_options,
        })
    }

    /// 性别选项（物种未定义时使用默认选项），返回规范拼写
    fn match_sex(&self, reference: &CritterReference, tsn: i64, sex: &str) -> Result<String, String> {
        let options = reference
            .sex_options
            .get(&tsn)
            .filter(|o| !o.is_empty())
            .unwrap_or(&self.settings.default_sex_options);

        options
            .iter()
            .find(|o| o.trim().eq_ignore_ascii_case(sex.trim()))
            .cloned()
            .ok_or_else(|| {
                format!(
                    "SEX '{}' is not valid for this taxon. Allowed values: {}.",
                    sex,
                    options.join(", ")
                )
            })
    }

    /// 动态采集单元列
    ///
    /// # 规则
    /// - 物种无此分类 → 静默丢弃（未知附加列）
    /// - 分类存在但单元值不在其中 → 行错误
    fn match_collection_units(
        &self,
        getter: &ColumnGetter<'_>,
        row: &Row,
        categories: &[CollectionCategory],
        extra_headers: &[String],
        critter_id: Uuid,
    ) -> (Vec<CollectionUnitAssignment>, Vec<String>) {
        let mut assignments = Vec::new();
        let mut issues = Vec::new();

        for header in extra_headers {
            let Some(value) = getter.text(row, header) else {
                continue;
            };
            let Some(category) = categories
                .iter()
                .find(|c| c.category_name.trim().eq_ignore_ascii_case(header))
            else {
                continue;
            };

            match category
                .units
                .iter()
                .find(|u| u.unit_name.trim().eq_ignore_ascii_case(value.trim()))
            {
                Some(unit) => assignments.push(CollectionUnitAssignment {
                    critter_collection_unit_id: Uuid::new_v4(),
                    critter_id,
                    collection_category_id: category.collection_category_id,
                    collection_unit_id: unit.collection_unit_id,
                }),
                None => issues.push(format!(
                    "'{}' is not a valid {} for this taxon.",
                    value, category.category_name
                )),
            }
        }

        (assignments, issues)
    }
}

#[async_trait]
impl ImportStrategy for CritterImportStrategy {
    type Record = CritterRecord;

    fn target(&self) -> ImportTarget {
        ImportTarget::Critters
    }

    fn column_spec(&self) -> &ColumnSpec {
        &self.spec
    }

    async fn validate_rows(&self, worksheet: &Worksheet) -> ImportResult<RowValidation<CritterRecord>> {
        let getter = ColumnGetter::new(&self.spec);

        // ===== 1. 收集去重键 =====
        let tsns = distinct(worksheet.rows.iter().filter_map(|row| getter.integer(row, "ITIS_TSN")));

        // ===== 2. 批量获取参考数据 =====
        let reference = self.fetch_reference(&tsns).await?;
        let extra_headers = self.spec.non_standard_headers(&worksheet.headers);

        // ===== 3. 逐行校验 =====
        let mut issues = RowIssues::new();
        let mut records = Vec::with_capacity(worksheet.row_count());
        let mut first_seen: HashMap<String, usize> = HashMap::new();

        for (idx, row) in worksheet.rows.iter().enumerate() {
            let mark = issues.mark();
            let critter_id = Uuid::new_v4();

            let taxon = match getter.integer(row, "ITIS_TSN") {
                None => {
                    issues.push(idx, "ITIS_TSN must be a whole number.");
                    None
                }
                Some(tsn) => match reference.taxa.get(&tsn) {
                    Some(taxon) => Some(taxon),
                    None => {
                        issues.push(idx, format!("ITIS_TSN {} is not a recognized taxon.", tsn));
                        None
                    }
                },
            };

            let sex = match (getter.text(row, "SEX"), taxon) {
                (None, _) => {
                    issues.push(idx, "SEX is required.");
                    None
                }
                (Some(sex), Some(taxon)) => match self.match_sex(&reference, taxon.tsn, &sex) {
                    Ok(canonical) => Some(canonical),
                    Err(message) => {
                        issues.push(idx, message);
                        None
                    }
                },
                (Some(_), None) => None,
            };

            let alias = getter.text(row, "ALIAS");
            match &alias {
                None => issues.push(idx, "ALIAS is required."),
                Some(alias) => {
                    let key = self.settings.alias_matching.key(alias);
                    if reference.existing_aliases.contains(&key) {
                        issues.push(idx, format!("Alias '{}' already exists in the survey. Aliases must be unique.", alias));
                    } else if let Some(first_row) = first_seen.get(&key) {
                        issues.push(
                            idx,
                            format!(
                                "Alias '{}' conflicts with another CSV row ({}). Aliases must be unique.",
                                alias, first_row
                            ),
                        );
                    } else {
                        first_seen.insert(key, idx);
                    }
                }
            }

            let wlh_id = getter.text(row, "WLH_ID");
            if let Some(wlh_id) = &wlh_id {
                if !self.settings.wlh_id_pattern.is_match(wlh_id) {
                    issues.push(
                        idx,
                        format!(
                            "WLH_ID '{}' is malformed. Expected pattern: {}.",
                            wlh_id,
                            self.settings.wlh_id_pattern.as_str()
                        ),
                    );
                }
            }

            let mut collection_units = Vec::new();
            if let Some(taxon) = taxon {
                let categories = reference
                    .collection_units
                    .get(&taxon.tsn)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                let (assignments, unit_issues) =
                    self.match_collection_units(&getter, row, categories, &extra_headers, critter_id);
                for message in unit_issues {
                    issues.push(idx, message);
                }
                collection_units = assignments;
            }

            if issues.has_new_since(mark) {
                continue;
            }

            if let (Some(taxon), Some(sex), Some(alias)) = (taxon, sex, alias) {
                records.push(CritterRecord {
                    critter_id,
                    itis_tsn: taxon.canonical_tsn,
                    itis_scientific_name: taxon.scientific_name.clone(),
                    sex,
                    animal_id: alias,
                    wlh_id,
                    critter_comment: getter.text(row, "DESCRIPTION"),
                    collection_units,
                });
            }
        }

        Ok(issues.into_validation(records))
    }

    async fn insert(&self, records: Vec<CritterRecord>) -> ImportResult<InsertReceipt> {
        let mut critters = records;
        let collections: Vec<CollectionUnitAssignment> = critters
            .iter_mut()
            .flat_map(|c| std::mem::take(&mut c.collection_units))
            .collect();
        let critter_ids: Vec<Uuid> = critters.iter().map(|c| c.critter_id).collect();

        let payload = BulkPayload {
            critters,
            collections,
            ..Default::default()
        };
        let expected = payload.counts();

        let response = self.sink.bulk_create(payload).await?;
        ensure_counts(&expected, &response.created)?;

        let survey_critter_ids = self.sink.add_critters_to_survey(self.survey_id, &critter_ids).await?;
        ensure_count("survey_critters", critter_ids.len(), survey_critter_ids.len())?;

        Ok(InsertReceipt {
            created: expected.critters,
            updated: 0,
            ids: survey_critter_ids,
        })
    }
}
