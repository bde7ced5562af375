// ==========================================
// 表格批量导入系统 - 行数据与嵌套记录
// ==========================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// 已解码的一行原始数据（列头 → 单元格文本）
pub type RawRow = HashMap<String, String>;

/// 子表中的一行
pub type ChildRow = Map<String, Value>;

/// 读取单元格值：缺失或空白均视为“本行跳过该字段”
pub fn cell_value<'a>(row: &'a RawRow, header: &str) -> Option<&'a str> {
    row.get(header)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

// ==========================================
// Record - 嵌套记录
// ==========================================
// 不变量:
// - 子表中不含空行
// - 子表行按列路径中的 rowIndex 升序排列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub scalars: Map<String, Value>,
    pub child_tables: BTreeMap<String, Vec<ChildRow>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// 无顶层字段且无非空子表
    pub fn is_empty(&self) -> bool {
        self.scalars.is_empty() && self.child_tables.values().all(|rows| rows.is_empty())
    }

    pub fn scalar_str(&self, field: &str) -> Option<&str> {
        self.scalars.get(field).and_then(|v| v.as_str())
    }

    /// 渲染为远程文档 JSON（子表作为数组字段并入顶层）
    pub fn to_document(&self) -> Value {
        let mut doc = self.scalars.clone();
        for (table, rows) in &self.child_tables {
            if rows.is_empty() {
                continue;
            }
            let rows: Vec<Value> = rows.iter().cloned().map(Value::Object).collect();
            doc.insert(table.clone(), Value::Array(rows));
        }
        Value::Object(doc)
    }

    /// 带实体类型标记的文档（单条插入接口使用）
    pub fn to_typed_document(&self, entity_type: &str) -> Value {
        let mut doc = self.to_document();
        if let Value::Object(map) = &mut doc {
            map.insert("doctype".to_string(), Value::String(entity_type.to_string()));
        }
        doc
    }
}

/// 同一批次内需随主记录一起写入的次级实体分组
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryGroup {
    pub entity_type: String,
    pub records: Vec<Record>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_value_blank_is_absent() {
        let mut row = RawRow::new();
        row.insert("a".to_string(), "  ".to_string());
        row.insert("b".to_string(), " x ".to_string());

        assert_eq!(cell_value(&row, "a"), None);
        assert_eq!(cell_value(&row, "b"), Some("x"));
        assert_eq!(cell_value(&row, "c"), None);
    }

    #[test]
    fn test_to_document_merges_child_tables() {
        let mut record = Record::new();
        record.scalars.insert("customer_name".to_string(), json!("Hybrowlabs"));
        let mut child = ChildRow::new();
        child.insert("item".to_string(), json!("A"));
        record.child_tables.insert("items".to_string(), vec![child]);
        record.child_tables.insert("empty".to_string(), vec![]);

        assert_eq!(
            record.to_document(),
            json!({"customer_name": "Hybrowlabs", "items": [{"item": "A"}]})
        );
        assert_eq!(
            record.to_typed_document("Customer")["doctype"],
            json!("Customer")
        );
    }

    #[test]
    fn test_record_with_only_empty_tables_is_empty() {
        let mut record = Record::new();
        record.child_tables.insert("items".to_string(), vec![]);
        assert!(record.is_empty());
    }
}
