// ==========================================
// 表格批量导入系统 - 远程文档服务协作接口
// ==========================================
// 职责: 定义导入核心所依赖的远程能力（不包含 HTTP 传输实现）
// - LinkResolver: 引用目标存在性校验
// - RecordCreator: 缺失引用目标的自动创建
// - BulkWriter: 批量写入
// - DocumentInserter: 单文档写入
// ==========================================

pub mod auto_creator;
pub mod json_lines_sink;
pub mod static_links;

use crate::domain::Record;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use auto_creator::{missing_link_document, AutoCreator};
pub use json_lines_sink::JsonLinesSink;
pub use static_links::StaticLinkResolver;

/// 远程调用错误
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("远程服务不可达: {0}")]
    Transport(String),

    #[error("远程服务鉴权失败: {0}")]
    Unauthorized(String),

    #[error("远程服务拒绝请求 (status={status}): {message}")]
    Rejected { status: u16, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type RemoteResult<T> = Result<T, RemoteError>;

// ==========================================
// LinkResolver Trait
// ==========================================
#[async_trait]
pub trait LinkResolver: Send + Sync {
    /// 判断 entity_type 类型下名为 name 的实体是否存在
    async fn exists(&self, entity_type: &str, name: &str) -> RemoteResult<bool>;
}

// ==========================================
// RecordCreator Trait
// ==========================================
#[async_trait]
pub trait RecordCreator: Send + Sync {
    /// 创建缺失的引用目标
    async fn create_missing(&self, entity_type: &str, name: &str) -> RemoteResult<()>;
}

// ==========================================
// BulkWriter Trait
// ==========================================
// 单次调用视为全有或全无
#[async_trait]
pub trait BulkWriter: Send + Sync {
    async fn insert_many(&self, entity_type: &str, records: &[Record]) -> RemoteResult<()>;
}

// ==========================================
// DocumentInserter Trait
// ==========================================
#[async_trait]
pub trait DocumentInserter: Send + Sync {
    /// 写入单个文档（文档内含 doctype 字段）
    async fn insert(&self, document: serde_json::Value) -> RemoteResult<()>;
}

// 共享实例（Arc）直接复用内部实现

#[async_trait]
impl<T: LinkResolver + ?Sized> LinkResolver for Arc<T> {
    async fn exists(&self, entity_type: &str, name: &str) -> RemoteResult<bool> {
        (**self).exists(entity_type, name).await
    }
}

#[async_trait]
impl<T: RecordCreator + ?Sized> RecordCreator for Arc<T> {
    async fn create_missing(&self, entity_type: &str, name: &str) -> RemoteResult<()> {
        (**self).create_missing(entity_type, name).await
    }
}

#[async_trait]
impl<T: BulkWriter + ?Sized> BulkWriter for Arc<T> {
    async fn insert_many(&self, entity_type: &str, records: &[Record]) -> RemoteResult<()> {
        (**self).insert_many(entity_type, records).await
    }
}

#[async_trait]
impl<T: DocumentInserter + ?Sized> DocumentInserter for Arc<T> {
    async fn insert(&self, document: serde_json::Value) -> RemoteResult<()> {
        (**self).insert(document).await
    }
}
