// ==========================================
// 调查数据导入管道 - 行记录
// ==========================================
// 职责: 有序的 (大写表头 → 单元格) 小容器
// 说明: 行不绑定固定结构，按表头动态查找
// ==========================================

use crate::domain::types::CellValue;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// 表头规范化：TRIM + UPPER
pub fn normalize_header(header: &str) -> String {
    header.trim().to_uppercase()
}

// ==========================================
// Row - 单行数据
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由 (表头, 值) 列表构造
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, CellValue)>,
        K: AsRef<str>,
    {
        let mut row = Row::new();
        for (key, value) in pairs {
            row.insert(key.as_ref(), value);
        }
        row
    }

    /// 插入单元格；同名表头原位覆盖
    pub fn insert(&mut self, header: &str, value: CellValue) {
        let key = normalize_header(header);
        match self.cells.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.cells.push((key, value)),
        }
    }

    pub fn get(&self, header: &str) -> Option<&CellValue> {
        let key = normalize_header(header);
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, header: &str) -> bool {
        self.get(header).is_some()
    }

    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// 序列化为 JSON 对象（保持列顺序）
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (k, v) in &self.cells {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
