// ==========================================
// 表格批量导入系统 - 校验错误与汇总报告
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 行级字段错误（row_number 从 1 开始）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub row_number: usize,
    pub field_path: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "第 {} 行: {}", self.row_number, self.message)
    }
}

// ==========================================
// ValidationReport - 全量校验报告
// ==========================================
// 按行号聚合；报告非空即整体拒绝上传
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: BTreeMap<usize, Vec<ValidationError>>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.entry(error.row_number).or_default().push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.values().all(|errs| errs.is_empty())
    }

    pub fn error_count(&self) -> usize {
        self.errors.values().map(|errs| errs.len()).sum()
    }

    pub fn rows_with_errors(&self) -> usize {
        self.errors.values().filter(|errs| !errs.is_empty()).count()
    }

    pub fn errors_for_row(&self, row_number: usize) -> &[ValidationError] {
        self.errors
            .get(&row_number)
            .map(|errs| errs.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.values().flatten()
    }

    /// 合并为单份可读报告（行号升序，每条错误一行）
    pub fn to_message(&self) -> String {
        self.iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn err(row: usize, field: &str, msg: &str) -> ValidationError {
        ValidationError {
            row_number: row,
            field_path: field.to_string(),
            message: msg.to_string(),
        }
    }

    #[test]
    fn test_report_orders_by_row() {
        let mut report = ValidationReport::new();
        report.push(err(3, "a", "third"));
        report.push(err(1, "b", "first"));
        report.push(err(3, "c", "third again"));

        assert_eq!(report.error_count(), 3);
        assert_eq!(report.rows_with_errors(), 2);
        assert_eq!(
            report.to_message(),
            "第 1 行: first\n第 3 行: third\n第 3 行: third again"
        );
        assert_eq!(report.errors_for_row(2).len(), 0);
    }

    #[test]
    fn test_empty_report() {
        let report = ValidationReport::new();
        assert!(report.is_empty());
        assert_eq!(report.to_message(), "");
    }
}
