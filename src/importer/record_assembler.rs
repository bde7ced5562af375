// ==========================================
// 表格批量导入系统 - 记录组装器
// ==========================================
// 职责: 扁平行 → 嵌套记录（顶层字段 + 有序子表）
// 规则:
// 1. 空值跳过
// 2. table.rowIndex.field 写入子表桶，其他列按映射写入顶层字段
// 3. 子表行按 rowIndex 升序输出，丢弃空行
// 4. 畸形点号路径按普通字段名处理（不报错）
// ==========================================

use crate::domain::{ChildRow, ColumnPath, ColumnSpec, FieldKind, RawRow, Record};
use serde_json::{Number, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// 列头 → 目标字段名
///
/// 为空时所有列映射到自身解析出的字段名；非空时只导入已映射的列
pub type FieldMapping = HashMap<String, String>;

/// 组装单行
pub fn assemble(specs: &[ColumnSpec], row: &RawRow, field_mapping: &FieldMapping) -> Record {
    let mut record = Record::new();
    let mut buckets: BTreeMap<String, BTreeMap<u32, ChildRow>> = BTreeMap::new();

    for spec in specs {
        if !field_mapping.is_empty() && !field_mapping.contains_key(&spec.header) {
            continue;
        }
        let Some(raw) = spec.value_in(row) else {
            continue;
        };
        let value = coerce(spec.kind.as_ref(), raw);

        match spec.column_path() {
            ColumnPath::ChildCell {
                table,
                row_index,
                field,
            } => {
                buckets
                    .entry(table.to_string())
                    .or_default()
                    .entry(row_index)
                    .or_default()
                    .insert(field.to_string(), value);
            }
            ColumnPath::Literal(path) => {
                let target = field_mapping
                    .get(&spec.header)
                    .map(|t| t.trim())
                    .filter(|t| !t.is_empty())
                    .unwrap_or(path);
                record.scalars.insert(target.to_string(), value);
            }
        }
    }

    for (table, rows) in buckets {
        let rows: Vec<ChildRow> = rows
            .into_values()
            .filter(|child| !child.is_empty())
            .collect();
        if !rows.is_empty() {
            record.child_tables.insert(table, rows);
        }
    }

    record
}

/// 组装一段行，丢弃空记录
pub fn assemble_batch(
    specs: &[ColumnSpec],
    rows: &[RawRow],
    field_mapping: &FieldMapping,
) -> Vec<Record> {
    let records: Vec<Record> = rows
        .iter()
        .map(|row| assemble(specs, row, field_mapping))
        .filter(|record| !record.is_empty())
        .collect();

    if records.len() < rows.len() {
        debug!(
            rows = rows.len(),
            skipped = rows.len() - records.len(),
            "已跳过空记录"
        );
    }
    records
}

// 按字段类型转换单元格值，无法转换时保留原文本
fn coerce(kind: Option<&FieldKind>, raw: &str) -> Value {
    let text = || Value::String(raw.to_string());

    match kind {
        Some(FieldKind::Check) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "y" => Value::from(1),
            "0" | "false" | "no" | "n" => Value::from(0),
            _ => text(),
        },
        Some(FieldKind::Int) => {
            if let Ok(i) = raw.parse::<i64>() {
                return Value::from(i);
            }
            // Excel 常把整数读成 12.0
            match raw.parse::<f64>() {
                Ok(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Value::from(f as i64),
                _ => text(),
            }
        }
        Some(k) if k.is_numeric() => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(text),
        _ => text(),
    }
}
