// ==========================================
// 表格批量导入系统 - 列规格
// ==========================================
// 列头文法: <name> ["[" <kind> "]"] ["[" <options> "]"]
// 子表列: table.rowIndex.field（rowIndex 为正整数）
// ==========================================

use crate::domain::record::{cell_value, RawRow};
use crate::domain::types::FieldKind;
use serde::{Deserialize, Serialize};

/// 单列的结构化描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub header: String,            // 原始列头（用于从行数据取值）
    pub path: String,              // 字段名或 table.rowIndex.field
    pub kind: Option<FieldKind>,   // None 表示无类型透传字段
    pub options: Option<String>,   // Select 可选值 / Link 目标实体类型
}

impl ColumnSpec {
    pub fn new(path: &str, kind: Option<FieldKind>, options: Option<&str>) -> Self {
        let mut spec = Self {
            header: String::new(),
            path: path.to_string(),
            kind,
            options: options.map(|o| o.to_string()),
        };
        spec.header = spec.to_header();
        spec
    }

    /// 渲染为列头字符串（模板生成使用）
    pub fn to_header(&self) -> String {
        match (&self.kind, &self.options) {
            (Some(kind), Some(options)) => format!("{} [{}] [{}]", self.path, kind, options),
            (Some(kind), None) => format!("{} [{}]", self.path, kind),
            (None, _) => self.path.clone(),
        }
    }

    /// 解析路径: 合法的三段式子表路径返回 ChildCell，否则按普通字段名处理
    pub fn column_path(&self) -> ColumnPath<'_> {
        ColumnPath::classify(&self.path)
    }

    /// Select 的可选值列表（逗号分隔，逐项 trim）
    pub fn select_options(&self) -> Vec<&str> {
        match &self.options {
            Some(options) => options
                .split(',')
                .map(|o| o.trim())
                .filter(|o| !o.is_empty())
                .collect(),
            None => Vec::new(),
        }
    }

    /// 读取本列在一行中的值（trim 后为空视为缺失）
    ///
    /// 优先按原始列头取值；行数据的列头写法不同（如省略可选值）时按字段名匹配，
    /// 多个列头同名时取最短者（等长按字典序）
    pub fn value_in<'r>(&self, row: &'r RawRow) -> Option<&'r str> {
        if row.contains_key(&self.header) {
            return cell_value(row, &self.header);
        }
        row.keys()
            .filter(|key| key.split('[').next().map(str::trim) == Some(self.path.as_str()))
            .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
            .and_then(|key| cell_value(row, key))
    }
}

/// 列路径分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPath<'a> {
    /// 普通字段（含畸形的点号路径）
    Literal(&'a str),
    /// 子表单元格 table.rowIndex.field
    ChildCell {
        table: &'a str,
        row_index: u32,
        field: &'a str,
    },
}

impl<'a> ColumnPath<'a> {
    pub fn classify(path: &'a str) -> ColumnPath<'a> {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.len() != 3 {
            return ColumnPath::Literal(path);
        }

        let (table, index, field) = (parts[0].trim(), parts[1].trim(), parts[2].trim());
        if table.is_empty() || field.is_empty() {
            return ColumnPath::Literal(path);
        }

        // 行号必须为正整数，否则回退为普通字段名
        match index.parse::<u32>() {
            Ok(row_index) if row_index >= 1 => ColumnPath::ChildCell {
                table,
                row_index,
                field,
            },
            _ => ColumnPath::Literal(path),
        }
    }
}
