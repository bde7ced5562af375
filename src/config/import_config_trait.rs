// ==========================================
// 表格批量导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::batch_planner::BatchSizePolicy;
use crate::repository::RepositoryResult;
use async_trait::async_trait;
use std::path::PathBuf;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取批次大小分档策略
    ///
    /// # 默认值
    /// - < 1 MiB → 50
    /// - < 5 MiB → 100
    /// - < 20 MiB → 250
    /// - 其他 → 500
    async fn get_batch_size_policy(&self) -> RepositoryResult<BatchSizePolicy>;

    /// 校验时是否自动创建缺失的引用目标
    ///
    /// # 默认值
    /// - false
    async fn get_auto_create_links(&self) -> RepositoryResult<bool>;

    /// 上传文件存储根目录
    ///
    /// # 默认值
    /// - uploads
    async fn get_storage_root(&self) -> RepositoryResult<PathBuf>;
}
