// ==========================================
// 调查数据导入管道 - 参考数据结构
// ==========================================
// 职责: 外部参考数据（分类、词表、调查内个体、捕获、部署）的只读形态
// 生命周期: 每次导入行校验前批量获取，校验结束即丢弃
// ==========================================

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// TaxonRecord - 分类记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonRecord {
    pub tsn: i64,            // 用户提交的 ITIS TSN
    pub canonical_tsn: i64,  // 规范 TSN（同物异名归并后）
    pub scientific_name: String,
}

// ==========================================
// 词表选项（通用）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyOption {
    pub id: Uuid,
    pub label: String,
}

impl VocabularyOption {
    pub fn new(label: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.to_string(),
        }
    }
}

/// 按标签查找（忽略大小写与首尾空白）
pub fn find_option<'a>(options: &'a [VocabularyOption], label: &str) -> Option<&'a VocabularyOption> {
    let wanted = label.trim();
    options.iter().find(|o| o.label.trim().eq_ignore_ascii_case(wanted))
}

// ==========================================
// 采集单元（按物种）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionCategory {
    pub collection_category_id: Uuid,
    pub category_name: String,
    pub units: Vec<CollectionUnit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionUnit {
    pub collection_unit_id: Uuid,
    pub unit_name: String,
}

// ==========================================
// 测量定义（按物种）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxonMeasurements {
    pub qualitative: Vec<QualitativeMeasurementDef>,
    pub quantitative: Vec<QuantitativeMeasurementDef>,
}

impl TaxonMeasurements {
    pub fn is_empty(&self) -> bool {
        self.qualitative.is_empty() && self.quantitative.is_empty()
    }

    pub fn find_qualitative(&self, name: &str) -> Option<&QualitativeMeasurementDef> {
        self.qualitative
            .iter()
            .find(|m| m.measurement_name.trim().eq_ignore_ascii_case(name.trim()))
    }

    pub fn find_quantitative(&self, name: &str) -> Option<&QuantitativeMeasurementDef> {
        self.quantitative
            .iter()
            .find(|m| m.measurement_name.trim().eq_ignore_ascii_case(name.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitativeMeasurementDef {
    pub taxon_measurement_id: Uuid,
    pub measurement_name: String,
    pub options: Vec<VocabularyOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitativeMeasurementDef {
    pub taxon_measurement_id: Uuid,
    pub measurement_name: String,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

// ==========================================
// 调查内个体 / 捕获 / 部署
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyCritter {
    pub critter_id: Uuid,
    pub alias: String,
    pub itis_tsn: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSummary {
    pub capture_id: Uuid,
    pub critter_id: Uuid,
    pub capture_date: NaiveDate,
    pub capture_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSummary {
    pub deployment_id: Uuid,
    pub device_id: i64,
    pub attachment_start: NaiveDate,
    pub attachment_end: Option<NaiveDate>, // None = 仍在部署
}

impl DeploymentSummary {
    /// 部署是否覆盖指定日期（闭区间，结束日可缺省）
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.attachment_start && self.attachment_end.map_or(true, |end| date <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_option_ignores_case() {
        let options = vec![VocabularyOption::new("Left Ear"), VocabularyOption::new("Right Ear")];
        assert_eq!(find_option(&options, " left ear").map(|o| o.label.as_str()), Some("Left Ear"));
        assert!(find_option(&options, "Tail").is_none());
    }

    #[test]
    fn test_deployment_covers_open_end() {
        let deployment = DeploymentSummary {
            deployment_id: Uuid::new_v4(),
            device_id: 101,
            attachment_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            attachment_end: None,
        };
        assert!(deployment.covers(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()));
        assert!(!deployment.covers(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()));
    }
}
