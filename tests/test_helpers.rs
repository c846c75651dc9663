// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 记录调用的参考数据 Fake、可配置数量的写入端 Fake、测试数据构造
// ==========================================
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use survey_csv_import::config::ConfigManager;
use survey_csv_import::domain::{
    BulkCounts, BulkCreateResponse, BulkPayload, BulkUpdateResponse, CaptureSummary,
    CollectionCategory, CollectionUnit, DeploymentSummary, SurveyCritter, TaxonMeasurements,
    TaxonRecord, TelemetryRecord, VocabularyOption,
};
use survey_csv_import::importer::{
    ImportError, ImportResult, ImportSettings, InsertSink, ReferenceDataProvider, SpreadsheetFile,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

pub const SURVEY_ID: i64 = 42;
pub const MOOSE_TSN: i64 = 180703;
pub const CARIBOU_TSN: i64 = 180701;
pub const WOLF_TSN: i64 = 180596;

// ==========================================
// ProviderCall - 参考数据调用记录
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCall {
    pub method: &'static str,
    pub keys: Vec<String>,
}

// ==========================================
// FakeReferenceData - 参考数据 Fake
// ==========================================
#[derive(Default)]
pub struct FakeReferenceData {
    pub taxa: Vec<TaxonRecord>,
    pub collection_units: HashMap<i64, Vec<CollectionCategory>>,
    pub sex_options: HashMap<i64, Vec<String>>,
    pub measurements: HashMap<i64, TaxonMeasurements>,
    pub body_locations: HashMap<i64, Vec<VocabularyOption>>,
    pub marking_types: Vec<VocabularyOption>,
    pub colours: Vec<VocabularyOption>,
    pub survey_critters: Vec<SurveyCritter>,
    pub captures: Vec<CaptureSummary>,
    pub deployments: Vec<DeploymentSummary>,
    pub fail_taxonomy: bool,
    pub(crate) calls: Mutex<Vec<ProviderCall>>,
}

impl FakeReferenceData {
    fn record<K: ToString>(&self, method: &'static str, keys: &[K]) {
        self.calls.lock().unwrap().push(ProviderCall {
            method,
            keys: keys.iter().map(|k| k.to_string()).collect(),
        });
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<ProviderCall> {
        self.calls().into_iter().filter(|c| c.method == method).collect()
    }

    fn by_tsn<T: Clone>(source: &HashMap<i64, T>, tsns: &[i64]) -> HashMap<i64, T> {
        tsns.iter()
            .filter_map(|tsn| source.get(tsn).map(|v| (*tsn, v.clone())))
            .collect()
    }
}

#[async_trait]
impl ReferenceDataProvider for FakeReferenceData {
    async fn get_taxonomy_by_tsns(&self, tsns: &[i64]) -> ImportResult<Vec<TaxonRecord>> {
        self.record("get_taxonomy_by_tsns", tsns);
        if self.fail_taxonomy {
            return Err(ImportError::reference("taxonomy", "service unavailable"));
        }
        Ok(self.taxa.iter().filter(|t| tsns.contains(&t.tsn)).cloned().collect())
    }

    async fn get_collection_units_for_taxa(
        &self,
        tsns: &[i64],
    ) -> ImportResult<HashMap<i64, Vec<CollectionCategory>>> {
        self.record("get_collection_units_for_taxa", tsns);
        Ok(Self::by_tsn(&self.collection_units, tsns))
    }

    async fn get_sex_options_for_taxa(&self, tsns: &[i64]) -> ImportResult<HashMap<i64, Vec<String>>> {
        self.record("get_sex_options_for_taxa", tsns);
        Ok(Self::by_tsn(&self.sex_options, tsns))
    }

    async fn get_measurements_for_taxa(
        &self,
        tsns: &[i64],
    ) -> ImportResult<HashMap<i64, TaxonMeasurements>> {
        self.record("get_measurements_for_taxa", tsns);
        Ok(Self::by_tsn(&self.measurements, tsns))
    }

    async fn get_body_locations_for_taxa(
        &self,
        tsns: &[i64],
    ) -> ImportResult<HashMap<i64, Vec<VocabularyOption>>> {
        self.record("get_body_locations_for_taxa", tsns);
        Ok(Self::by_tsn(&self.body_locations, tsns))
    }

    async fn get_marking_types(&self) -> ImportResult<Vec<VocabularyOption>> {
        self.record::<String>("get_marking_types", &[]);
        Ok(self.marking_types.clone())
    }

    async fn get_colours(&self) -> ImportResult<Vec<VocabularyOption>> {
        self.record::<String>("get_colours", &[]);
        Ok(self.colours.clone())
    }

    async fn get_survey_critters(&self, survey_id: i64) -> ImportResult<Vec<SurveyCritter>> {
        self.record("get_survey_critters", &[survey_id]);
        Ok(self.survey_critters.clone())
    }

    async fn get_existing_aliases(&self, survey_id: i64) -> ImportResult<HashSet<String>> {
        self.record("get_existing_aliases", &[survey_id]);
        Ok(self.survey_critters.iter().map(|c| c.alias.clone()).collect())
    }

    async fn get_captures_for_critters(
        &self,
        critter_ids: &[Uuid],
    ) -> ImportResult<HashMap<Uuid, Vec<CaptureSummary>>> {
        self.record("get_captures_for_critters", critter_ids);
        let mut result: HashMap<Uuid, Vec<CaptureSummary>> = HashMap::new();
        for capture in self.captures.iter().filter(|c| critter_ids.contains(&c.critter_id)) {
            result.entry(capture.critter_id).or_default().push(capture.clone());
        }
        Ok(result)
    }

    async fn get_survey_deployments(&self, survey_id: i64) -> ImportResult<Vec<DeploymentSummary>> {
        self.record("get_survey_deployments", &[survey_id]);
        Ok(self.deployments.clone())
    }
}

// ==========================================
// FakeSink - 写入端 Fake
// ==========================================
// shortfall: 每类非零数量少报的条数（模拟部分写入）
#[derive(Default)]
pub struct FakeSink {
    pub shortfall: usize,
    pub created: Mutex<Vec<BulkPayload>>,
    pub updated: Mutex<Vec<BulkPayload>>,
    pub survey_links: Mutex<Vec<Uuid>>,
    pub telemetry: Mutex<Vec<TelemetryRecord>>,
}

impl FakeSink {
    pub fn short_by(shortfall: usize) -> Self {
        Self {
            shortfall,
            ..Default::default()
        }
    }

    fn reported(&self, counts: BulkCounts) -> BulkCounts {
        let short = |n: usize| if n == 0 { 0 } else { n.saturating_sub(self.shortfall) };
        BulkCounts {
            critters: short(counts.critters),
            collections: short(counts.collections),
            captures: short(counts.captures),
            markings: short(counts.markings),
            qualitative_measurements: short(counts.qualitative_measurements),
            quantitative_measurements: short(counts.quantitative_measurements),
        }
    }

    pub fn created_payloads(&self) -> Vec<BulkPayload> {
        self.created.lock().unwrap().clone()
    }

    pub fn updated_payloads(&self) -> Vec<BulkPayload> {
        self.updated.lock().unwrap().clone()
    }
}

#[async_trait]
impl InsertSink for FakeSink {
    async fn bulk_create(&self, payload: BulkPayload) -> ImportResult<BulkCreateResponse> {
        let created = self.reported(payload.counts());
        self.created.lock().unwrap().push(payload);
        Ok(BulkCreateResponse { created })
    }

    async fn bulk_update(&self, payload: BulkPayload) -> ImportResult<BulkUpdateResponse> {
        let updated = self.reported(payload.counts());
        self.updated.lock().unwrap().push(payload);
        Ok(BulkUpdateResponse { updated })
    }

    async fn add_critters_to_survey(&self, _survey_id: i64, critter_ids: &[Uuid]) -> ImportResult<Vec<i64>> {
        let mut links = self.survey_links.lock().unwrap();
        let start = links.len() as i64;
        links.extend_from_slice(critter_ids);
        Ok((0..critter_ids.len() as i64).map(|i| 1000 + start + i).collect())
    }

    async fn create_manual_telemetry(&self, records: Vec<TelemetryRecord>) -> ImportResult<usize> {
        let created = records.len().saturating_sub(self.shortfall);
        self.telemetry.lock().unwrap().extend(records);
        Ok(created)
    }
}

// ==========================================
// 测试数据构造
// ==========================================

pub fn csv_file(name: &str, content: &str) -> SpreadsheetFile {
    SpreadsheetFile::new(name, content.as_bytes().to_vec())
}

pub async fn default_settings() -> ImportSettings {
    ImportSettings::load(&ConfigManager::new())
        .await
        .expect("default settings should load")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn taxon(tsn: i64, scientific_name: &str) -> TaxonRecord {
    TaxonRecord {
        tsn,
        canonical_tsn: tsn,
        scientific_name: scientific_name.to_string(),
    }
}

pub fn survey_critter(alias: &str, itis_tsn: i64) -> SurveyCritter {
    SurveyCritter {
        critter_id: Uuid::new_v4(),
        alias: alias.to_string(),
        itis_tsn,
    }
}

pub fn capture_summary(critter: &SurveyCritter, day: NaiveDate, at: Option<NaiveTime>) -> CaptureSummary {
    CaptureSummary {
        capture_id: Uuid::new_v4(),
        critter_id: critter.critter_id,
        capture_date: day,
        capture_time: at,
    }
}

pub fn collection_category(name: &str, units: &[&str]) -> CollectionCategory {
    CollectionCategory {
        collection_category_id: Uuid::new_v4(),
        category_name: name.to_string(),
        units: units
            .iter()
            .map(|u| CollectionUnit {
                collection_unit_id: Uuid::new_v4(),
                unit_name: u.to_string(),
            })
            .collect(),
    }
}

/// 个体导入参考数据: 驼鹿、北美驯鹿（带种群单元）、狼
pub fn critter_reference() -> FakeReferenceData {
    let mut reference = FakeReferenceData {
        taxa: vec![
            taxon(MOOSE_TSN, "Alces alces"),
            taxon(CARIBOU_TSN, "Rangifer tarandus"),
            taxon(WOLF_TSN, "Canis lupus"),
        ],
        ..Default::default()
    };
    reference.collection_units.insert(
        CARIBOU_TSN,
        vec![collection_category("Population Unit", &["Atlin", "Carcross"])],
    );
    reference
}
