// ==========================================
// 表格批量导入系统 - 缺失引用自动创建
// ==========================================
// 按实体类型构造最小文档，经单文档写入接口创建
// ==========================================

use crate::remote::{DocumentInserter, RecordCreator, RemoteResult};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

/// 构造缺失引用目标的文档
///
/// 树形实体（客户组/区域）挂在各自的根节点下
pub fn missing_link_document(entity_type: &str, name: &str) -> Value {
    match entity_type {
        "Customer Group" => json!({
            "doctype": entity_type,
            "customer_group_name": name,
            "parent_customer_group": "All Customer Groups",
        }),
        "Territory" => json!({
            "doctype": entity_type,
            "territory_name": name,
            "parent_territory": "All Territories",
        }),
        "Supplier Group" => json!({
            "doctype": entity_type,
            "supplier_group_name": name,
            "parent_supplier_group": "All Supplier Groups",
        }),
        _ => json!({
            "doctype": entity_type,
            "name": name,
        }),
    }
}

// ==========================================
// AutoCreator - 基于单文档写入的 RecordCreator
// ==========================================
pub struct AutoCreator<I: DocumentInserter> {
    inserter: I,
}

impl<I: DocumentInserter> AutoCreator<I> {
    pub fn new(inserter: I) -> Self {
        Self { inserter }
    }
}

#[async_trait]
impl<I: DocumentInserter> RecordCreator for AutoCreator<I> {
    async fn create_missing(&self, entity_type: &str, name: &str) -> RemoteResult<()> {
        let document = missing_link_document(entity_type, name);
        self.inserter.insert(document).await?;
        info!(entity_type = %entity_type, name = %name, "已自动创建缺失的引用目标");
        Ok(())
    }
}
