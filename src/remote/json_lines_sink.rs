// ==========================================
// 表格批量导入系统 - JSON Lines 输出
// ==========================================
// 试运行: 每个文档输出为一行 JSON
// ==========================================

use crate::domain::Record;
use crate::remote::{BulkWriter, DocumentInserter, RemoteError, RemoteResult};
use async_trait::async_trait;
use serde_json::Value;
use std::io::Write;
use std::sync::Mutex;

pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> RemoteResult<W> {
        self.out
            .into_inner()
            .map_err(|e| RemoteError::Transport(format!("锁获取失败: {}", e)))
    }

    fn write_line(&self, document: &Value) -> RemoteResult<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|e| RemoteError::Transport(format!("锁获取失败: {}", e)))?;
        serde_json::to_writer(&mut *out, document)
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        writeln!(out).map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> BulkWriter for JsonLinesSink<W> {
    async fn insert_many(&self, entity_type: &str, records: &[Record]) -> RemoteResult<()> {
        for record in records {
            self.write_line(&record.to_typed_document(entity_type))?;
        }
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> DocumentInserter for JsonLinesSink<W> {
    async fn insert(&self, document: Value) -> RemoteResult<()> {
        self.write_line(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_many_writes_one_line_per_record() {
        let sink = JsonLinesSink::new(Vec::new());
        let mut record = Record::new();
        record.scalars.insert("customer_name".to_string(), json!("A"));

        sink.insert_many("Customer", &[record.clone(), record]).await.unwrap();

        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let doc: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(doc["doctype"], "Customer");
    }
}
