// ==========================================
// 调查数据导入管道 - 列规格
// ==========================================
// 职责: 声明式列规格（逻辑列名 → 类型 / 可选 / 表头别名）
// 红线: 纯数据结构，无 I/O，无副作用
// 不变量:
// - 至少一列必填
// - 列名与别名统一大写；列名不得与任何别名冲突
// ==========================================

use crate::domain::row::normalize_header;
use crate::domain::types::ColumnType;
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ==========================================
// ColumnSpecEntry - 单列规格
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpecEntry {
    pub name: String,
    pub column_type: ColumnType,
    pub optional: bool,
    pub aliases: Vec<String>,
}

impl ColumnSpecEntry {
    pub fn required(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            optional: false,
            aliases: Vec::new(),
        }
    }

    pub fn optional(name: &str, column_type: ColumnType) -> Self {
        Self {
            optional: true,
            ..Self::required(name, column_type)
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    /// 候选表头：列名在前，别名按声明顺序
    pub fn header_candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(|a| a.as_str()))
    }
}

// ==========================================
// ColumnSpecification - 错误报告用的规格描述
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpecification {
    pub column_name: String,
    pub column_type: ColumnType,
    pub column_aliases: Vec<String>,
    pub optional: bool,
}

// ==========================================
// ColumnSpec - 一个导入目标的完整列规格
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    entries: Vec<ColumnSpecEntry>,
}

impl ColumnSpec {
    /// 构造并校验列规格
    ///
    /// # 返回
    /// - Err(InvalidColumnSpec): 无必填列 / 列名重复 / 列名与别名冲突 / 别名重复
    pub fn new(entries: Vec<ColumnSpecEntry>) -> ImportResult<Self> {
        let entries: Vec<ColumnSpecEntry> = entries
            .into_iter()
            .map(|e| ColumnSpecEntry {
                name: normalize_header(&e.name),
                aliases: e.aliases.iter().map(|a| normalize_header(a)).collect(),
                ..e
            })
            .collect();

        if !entries.iter().any(|e| !e.optional) {
            return Err(ImportError::InvalidColumnSpec("至少需要一个必填列".to_string()));
        }

        let mut names = HashSet::new();
        for entry in &entries {
            if entry.name.is_empty() {
                return Err(ImportError::InvalidColumnSpec("列名为空".to_string()));
            }
            if !names.insert(entry.name.as_str()) {
                return Err(ImportError::InvalidColumnSpec(format!("列名重复: {}", entry.name)));
            }
        }

        let mut aliases = HashSet::new();
        for entry in &entries {
            for alias in &entry.aliases {
                if names.contains(alias.as_str()) {
                    return Err(ImportError::InvalidColumnSpec(format!(
                        "别名与列名冲突: {} (列 {})",
                        alias, entry.name
                    )));
                }
                if !aliases.insert(alias.as_str()) {
                    return Err(ImportError::InvalidColumnSpec(format!("别名重复: {}", alias)));
                }
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ColumnSpecEntry] {
        &self.entries
    }

    pub fn entry(&self, name: &str) -> Option<&ColumnSpecEntry> {
        let key = normalize_header(name);
        self.entries.iter().find(|e| e.name == key)
    }

    /// 规范列名（声明顺序）
    pub fn column_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// 全部别名（展平，声明顺序）
    pub fn column_aliases(&self) -> Vec<String> {
        self.entries.iter().flat_map(|e| e.aliases.iter().cloned()).collect()
    }

    /// 错误报告用规格
    pub fn specification(&self) -> Vec<ColumnSpecification> {
        self.entries
            .iter()
            .map(|e| ColumnSpecification {
                column_name: e.name.clone(),
                column_type: e.column_type,
                column_aliases: e.aliases.clone(),
                optional: e.optional,
            })
            .collect()
    }

    /// 人类可读规格（每列一行）
    ///
    /// # 格式
    /// - `NAME (type[, optional][, aliases: A, B])`
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| {
                let mut line = format!("{} ({}", e.name, e.column_type);
                if e.optional {
                    line.push_str(", optional");
                }
                if !e.aliases.is_empty() {
                    line.push_str(", aliases: ");
                    line.push_str(&e.aliases.join(", "));
                }
                line.push(')');
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 表头是否属于规格（列名或别名）
    pub fn is_known_header(&self, header: &str) -> bool {
        let key = normalize_header(header);
        self.entries
            .iter()
            .any(|e| e.header_candidates().any(|c| c == key))
    }

    /// 非标准表头（既非列名也非别名），保持原顺序
    pub fn non_standard_headers(&self, headers: &[String]) -> Vec<String> {
        headers
            .iter()
            .map(|h| normalize_header(h))
            .filter(|h| !h.is_empty() && !self.is_known_header(h))
            .collect()
    }
}

/// 从 render() 输出中还原列名
pub fn column_names_from_rendered(rendered: &str) -> Vec<String> {
    rendered
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match line.find(" (") {
            Some(idx) => line[..idx].trim().to_string(),
            None => line.to_string(),
        })
        .collect()
}
