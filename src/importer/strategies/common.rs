// ==========================================
// 调查数据导入管道 - 行校验公共规则
// ==========================================
// 职责: 各导入目标共享的规则与辅助结构
// - 导入设置（别名口径 / WLH_ID 正则 / 默认性别选项）
// - 去重取键（BTreeSet，保证批量键有序且唯一）
// - 坐标范围、经纬度成对规则（二者皆有或皆无）
// - 别名 → 调查内个体、日期/时间 → 已有捕获
// - 写入数量核对
// ==========================================

use crate::config::{AliasMatching, ImportConfigReader};
use crate::domain::records::BulkCounts;
use crate::domain::reference::{CaptureSummary, SurveyCritter};
use crate::domain::row::Row;
use crate::importer::cell_getter::ColumnGetter;
use crate::importer::error::{ImportError, ImportResult};
use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

// ==========================================
// ImportSettings - 导入设置（每个策略加载一次）
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub alias_matching: AliasMatching,
    pub wlh_id_pattern: Regex,
    pub default_sex_options: Vec<String>,
}

impl ImportSettings {
    /// 从配置读取器加载
    ///
    /// # 返回
    /// - Err(ConfigValueError): WLH_ID 正则无法编译
    pub async fn load(reader: &dyn ImportConfigReader) -> ImportResult<Self> {
        let alias_matching = reader.get_alias_matching().await?;
        let pattern = reader.get_wlh_id_pattern().await?;
        let default_sex_options = reader.get_default_sex_options().await?;

        let wlh_id_pattern = Regex::new(&pattern).map_err(|e| ImportError::ConfigValueError {
            key: crate::config::config_keys::WLH_ID_PATTERN.to_string(),
            value: pattern.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            alias_matching,
            wlh_id_pattern,
            default_sex_options,
        })
    }
}

/// 去重并排序（批量查询键）
pub fn distinct<T: Ord>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    items.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

// ==========================================
// 坐标规则
// ==========================================

/// 坐标范围检查，返回错误信息
pub fn coordinate_issue(prefix: &str, latitude: f64, longitude: f64) -> Option<String> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Some(format!("{} latitude {} must be between -90 and 90.", prefix, latitude));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Some(format!("{} longitude {} must be between -180 and 180.", prefix, longitude));
    }
    None
}

/// 经纬度成对读取
///
/// # 返回
/// - Ok(Some((lat, lon))): 二者皆有且在范围内
/// - Ok(None): 二者皆无
/// - Err(信息): 只给了一半，或超出范围
pub fn location_pair(
    getter: &ColumnGetter<'_>,
    row: &Row,
    prefix: &str,
    latitude_column: &str,
    longitude_column: &str,
) -> Result<Option<(f64, f64)>, String> {
    let latitude = getter.number(row, latitude_column);
    let longitude = getter.number(row, longitude_column);

    match (latitude, longitude) {
        (None, None) => Ok(None),
        (Some(lat), Some(lon)) => match coordinate_issue(prefix, lat, lon) {
            Some(issue) => Err(issue),
            None => Ok(Some((lat, lon))),
        },
        _ => Err(format!(
            "{} and {} must both be provided, or both left empty.",
            latitude_column, longitude_column
        )),
    }
}

// ==========================================
// SurveyCritterIndex - 别名 → 调查内个体
// ==========================================
#[derive(Debug, Clone)]
pub struct SurveyCritterIndex {
    matching: AliasMatching,
    by_alias: HashMap<String, SurveyCritter>,
}

impl SurveyCritterIndex {
    pub fn new(critters: Vec<SurveyCritter>, matching: AliasMatching) -> Self {
        let by_alias = critters
            .into_iter()
            .map(|c| (matching.key(&c.alias), c))
            .collect();
        Self { matching, by_alias }
    }

    pub fn resolve(&self, alias: &str) -> Option<&SurveyCritter> {
        self.by_alias.get(&self.matching.key(alias))
    }
}

/// 读取并解析行内别名
///
/// # 返回
/// - Err(信息): 别名缺失或调查内不存在
pub fn resolve_alias<'i>(
    index: &'i SurveyCritterIndex,
    getter: &ColumnGetter<'_>,
    row: &Row,
) -> Result<&'i SurveyCritter, String> {
    let alias = getter
        .text(row, "ALIAS")
        .ok_or_else(|| "ALIAS is required.".to_string())?;
    index
        .resolve(&alias)
        .ok_or_else(|| format!("Alias '{}' does not match any critter in the survey.", alias))
}

/// 按日期（及可选时间）定位已有捕获
///
/// # 规则
/// - 同一天多条捕获且未给时间 → 歧义错误
/// - 给了时间 → 日期与时间都需一致
pub fn resolve_capture<'c>(
    captures: &'c [CaptureSummary],
    date: NaiveDate,
    time: Option<NaiveTime>,
) -> Result<&'c CaptureSummary, String> {
    let same_day: Vec<&CaptureSummary> = captures
        .iter()
        .filter(|c| c.capture_date == date)
        .filter(|c| time.map_or(true, |t| c.capture_time == Some(t)))
        .collect();

    match same_day.as_slice() {
        [capture] => Ok(capture),
        [] => Err(match time {
            Some(t) => format!("No capture found on {} at {}.", date, t.format("%H:%M:%S")),
            None => format!("No capture found on {}.", date),
        }),
        _ => Err(format!(
            "Multiple captures found on {}. Provide CAPTURE_TIME to pick one.",
            date
        )),
    }
}

/// 读取可选时间列，解析失败返回错误信息
pub fn optional_time(
    getter: &ColumnGetter<'_>,
    row: &Row,
    column: &str,
) -> Result<Option<NaiveTime>, String> {
    getter
        .time(row, column)
        .map_err(|raw| format!("{} '{}' is not a valid time (HH:MM or HH:MM:SS).", column, raw))
}

// ==========================================
// 写入数量核对
// ==========================================

/// 单类数量核对
pub fn ensure_count(kind: &str, expected: usize, created: usize) -> ImportResult<()> {
    if expected != created {
        return Err(ImportError::PartialInsert {
            kind: kind.to_string(),
            expected,
            created,
        });
    }
    Ok(())
}

/// 批量载荷逐类核对
pub fn ensure_counts(expected: &BulkCounts, actual: &BulkCounts) -> ImportResult<()> {
    match expected.first_mismatch(actual) {
        Some((kind, expected, created)) => ensure_count(kind, expected, created),
        None => Ok(()),
    }
}
