// ==========================================
// 调查数据导入管道 - 校验后记录 + 批量写入载荷
// ==========================================
// 职责: 行校验输出（强类型记录）及与写入端交互的载荷/响应
// 所有权: 校验结果移交给写入阶段，写入阶段是最后的读者
// ==========================================

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// 个体 (Critter)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritterRecord {
    pub critter_id: Uuid,
    pub itis_tsn: i64,
    pub itis_scientific_name: String,
    pub sex: String,
    pub animal_id: String, // 别名 / 昵称
    pub wlh_id: Option<String>,
    pub critter_comment: Option<String>,
    pub collection_units: Vec<CollectionUnitAssignment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionUnitAssignment {
    pub critter_collection_unit_id: Uuid,
    pub critter_id: Uuid,
    pub collection_category_id: Uuid,
    pub collection_unit_id: Uuid,
}

// ==========================================
// 捕获 (Capture)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub location_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationRecord {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            location_id: Uuid::new_v4(),
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub capture_id: Uuid,
    pub critter_id: Uuid,
    pub capture_date: NaiveDate,
    pub capture_time: Option<NaiveTime>,
    pub capture_location: LocationRecord,
    pub capture_comment: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub release_time: Option<NaiveTime>,
    pub release_location: Option<LocationRecord>,
    pub release_comment: Option<String>,
    /// true: 命中已有捕获（写入阶段走更新），false: 新建
    pub existing: bool,
}

// ==========================================
// 标记 (Marking)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkingRecord {
    pub marking_id: Uuid,
    pub critter_id: Uuid,
    pub capture_id: Uuid,
    pub body_location_id: Uuid,
    pub marking_type_id: Option<Uuid>,
    pub identifier: Option<String>,
    pub primary_colour_id: Option<Uuid>,
    pub secondary_colour_id: Option<Uuid>,
    pub comment: Option<String>,
}

// ==========================================
// 测量 (Measurement)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitativeMeasurementRecord {
    pub measurement_qualitative_id: Uuid,
    pub critter_id: Uuid,
    pub capture_id: Uuid,
    pub taxon_measurement_id: Uuid,
    pub qualitative_option_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitativeMeasurementRecord {
    pub measurement_quantitative_id: Uuid,
    pub critter_id: Uuid,
    pub capture_id: Uuid,
    pub taxon_measurement_id: Uuid,
    pub value: f64,
}

/// 一行测量表可产出多条测量
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub qualitative: Vec<QualitativeMeasurementRecord>,
    pub quantitative: Vec<QuantitativeMeasurementRecord>,
}

// ==========================================
// 遥测 (Telemetry)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub telemetry_manual_id: Uuid,
    pub deployment_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub acquisition_date: NaiveDateTime,
}

// ==========================================
// 批量写入载荷 / 响应
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkPayload {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub critters: Vec<CritterRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<CollectionUnitAssignment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub captures: Vec<CaptureRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markings: Vec<MarkingRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualitative_measurements: Vec<QualitativeMeasurementRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quantitative_measurements: Vec<QuantitativeMeasurementRecord>,
}

impl BulkPayload {
    /// 各类记录的提交数量（与写入端返回数量逐项比对）
    pub fn counts(&self) -> BulkCounts {
        BulkCounts {
            critters: self.critters.len(),
            collections: self.collections.len(),
            captures: self.captures.len(),
            markings: self.markings.len(),
            qualitative_measurements: self.qualitative_measurements.len(),
            quantitative_measurements: self.quantitative_measurements.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCounts {
    #[serde(default)]
    pub critters: usize,
    #[serde(default)]
    pub collections: usize,
    #[serde(default)]
    pub captures: usize,
    #[serde(default)]
    pub markings: usize,
    #[serde(default)]
    pub qualitative_measurements: usize,
    #[serde(default)]
    pub quantitative_measurements: usize,
}

impl BulkCounts {
    /// 找出第一个不一致的类别: (类别, 期望, 实际)
    pub fn first_mismatch(&self, actual: &BulkCounts) -> Option<(&'static str, usize, usize)> {
        [
            ("critters", self.critters, actual.critters),
            ("collections", self.collections, actual.collections),
            ("captures", self.captures, actual.captures),
            ("markings", self.markings, actual.markings),
            (
                "qualitative_measurements",
                self.qualitative_measurements,
                actual.qualitative_measurements,
            ),
            (
                "quantitative_measurements",
                self.quantitative_measurements,
                actual.quantitative_measurements,
            ),
        ]
        .into_iter()
        .find(|(_, expected, got)| expected != got)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkCreateResponse {
    pub created: BulkCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkUpdateResponse {
    pub updated: BulkCounts,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_mismatch() {
        let expected = BulkCounts {
            critters: 3,
            collections: 2,
            ..Default::default()
        };
        let actual = BulkCounts {
            critters: 3,
            collections: 1,
            ..Default::default()
        };

        assert_eq!(expected.first_mismatch(&expected), None);
        assert_eq!(expected.first_mismatch(&actual), Some(("collections", 2, 1)));
    }
}
