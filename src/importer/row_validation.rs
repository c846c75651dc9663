// ==========================================
// 调查数据导入管道 - 行校验结果
// ==========================================
// 职责: 校验结果（成功/逐行错误）+ 错误累计器 + 写入回执
// 行号: 从 0 开始，相对数据行（不含表头）
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// RowIssue - 单行语义错误
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIssue {
    pub row: usize,
    pub message: String,
}

// ==========================================
// RowValidation - 行校验结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum RowValidation<T> {
    Valid(Vec<T>),
    Invalid { issues: Vec<RowIssue> },
}

impl<T> RowValidation<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, RowValidation::Valid(_))
    }

    pub fn issues(&self) -> &[RowIssue] {
        match self {
            RowValidation::Valid(_) => &[],
            RowValidation::Invalid { issues } => issues,
        }
    }
}

// ==========================================
// RowIssues - 错误累计器
// ==========================================
// 校验器遇到单行错误继续向下走，一次性反馈全部问题
#[derive(Debug, Default)]
pub struct RowIssues {
    issues: Vec<RowIssue>,
}

impl RowIssues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: usize, message: impl Into<String>) {
        self.issues.push(RowIssue {
            row,
            message: message.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// 当前累计错误数（用于判断某行是否新增了错误）
    pub fn mark(&self) -> usize {
        self.issues.len()
    }

    pub fn has_new_since(&self, mark: usize) -> bool {
        self.issues.len() > mark
    }

    /// 无错误 → Valid(records)，否则 Invalid（按行号稳定排序）
    pub fn into_validation<T>(self, records: Vec<T>) -> RowValidation<T> {
        if self.issues.is_empty() {
            RowValidation::Valid(records)
        } else {
            let mut issues = self.issues;
            issues.sort_by_key(|i| i.row);
            RowValidation::Invalid { issues }
        }
    }
}

// ==========================================
// InsertReceipt - 写入回执
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertReceipt {
    pub created: usize,
    #[serde(default)]
    pub updated: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_issues_is_valid() {
        let issues = RowIssues::new();
        let result = issues.into_validation(vec![1, 2, 3]);
        assert_eq!(result, RowValidation::Valid(vec![1, 2, 3]));
        assert!(result.issues().is_empty());
    }

    #[test]
    fn test_issues_sorted_by_row() {
        let mut issues = RowIssues::new();
        issues.push(2, "third row");
        issues.push(0, "first row");
        issues.push(2, "third row again");

        let result: RowValidation<()> = issues.into_validation(vec![]);
        let rows: Vec<usize> = result.issues().iter().map(|i| i.row).collect();
        assert_eq!(rows, vec![0, 2, 2]);
        assert_eq!(result.issues()[1].message, "third row");
    }

    #[test]
    fn test_mark_tracks_new_issues() {
        let mut issues = RowIssues::new();
        let mark = issues.mark();
        assert!(!issues.has_new_since(mark));
        issues.push(0, "bad");
        assert!(issues.has_new_since(mark));
    }
}
