// ==========================================
// 表格批量导入系统 - 导入任务 Repository Trait
// ==========================================
// 职责: 定义导入任务持久化接口（不包含业务逻辑）
// 红线: Repository 不含状态机规则，只做数据 CRUD
// ==========================================

use crate::domain::ImportJob;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::sync::Arc;

// ==========================================
// ImportJobRepository Trait
// ==========================================
// 实现者: ImportJobRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait ImportJobRepository: Send + Sync {
    /// 新建任务
    ///
    /// # 返回
    /// - Ok(String): 任务 ID
    async fn create(&self, job: &ImportJob) -> RepositoryResult<String>;

    /// 按 ID 加载任务
    ///
    /// # 返回
    /// - Err(NotFound): 任务不存在
    async fn load(&self, job_id: &str) -> RepositoryResult<ImportJob>;

    /// 保存任务（状态与进度）
    ///
    /// 返回前写入必须已提交，调用方据此推进到下一批次
    async fn save(&self, job: &ImportJob) -> RepositoryResult<()>;
}

#[async_trait]
impl<T: ImportJobRepository + ?Sized> ImportJobRepository for Arc<T> {
    async fn create(&self, job: &ImportJob) -> RepositoryResult<String> {
        (**self).create(job).await
    }

    async fn load(&self, job_id: &str) -> RepositoryResult<ImportJob> {
        (**self).load(job_id).await
    }

    async fn save(&self, job: &ImportJob) -> RepositoryResult<()> {
        (**self).save(job).await
    }
}
