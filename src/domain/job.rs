// ==========================================
// 表格批量导入系统 - 导入任务
// ==========================================
// 状态机: pending → processing → completed | failed
// 进度字段只在批次写入成功后推进
// ==========================================

use crate::domain::types::JobStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// 非法的状态迁移
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("无效的状态转换: from={from} to={to}")]
pub struct JobTransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

// ==========================================
// ImportJob - 导入任务
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportJob {
    pub job_id: String,                 // 任务 ID（UUID）
    pub entity_type: String,            // 目标实体类型
    pub status: JobStatus,
    pub total_rows: usize,
    pub processed_rows: usize,          // 已成功写入的行数（批次边界）
    pub batch_size: usize,
    pub current_batch: usize,           // 已成功写入的批次数
    pub error_message: Option<String>,
    pub file_path: Option<String>,      // 源文件（终态时释放）
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportJob {
    pub fn new(
        entity_type: &str,
        total_rows: usize,
        batch_size: usize,
        file_path: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4().to_string(),
            entity_type: entity_type.to_string(),
            status: JobStatus::Pending,
            total_rows,
            processed_rows: 0,
            batch_size,
            current_batch: 0,
            error_message: None,
            file_path,
            created_at: now,
            updated_at: now,
        }
    }

    /// 以失败任务的进度创建新任务，便于调用方从下一个未处理批次续跑
    ///
    /// 失败任务本身保持终态不变
    pub fn resume_from(failed: &ImportJob) -> Self {
        let mut job = ImportJob::new(
            &failed.entity_type,
            failed.total_rows,
            failed.batch_size,
            failed.file_path.clone(),
        );
        job.processed_rows = failed.processed_rows;
        job.current_batch = failed.current_batch;
        job
    }

    pub fn transition_to(&mut self, next: JobStatus) -> Result<(), JobTransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(JobTransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 批次写入成功后推进进度
    pub fn record_batch_success(&mut self, end_index: usize) {
        self.processed_rows = end_index;
        self.current_batch += 1;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) -> Result<(), JobTransitionError> {
        self.transition_to(JobStatus::Failed)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    pub fn total_batches(&self) -> usize {
        if self.batch_size == 0 {
            return 0;
        }
        self.total_rows.div_ceil(self.batch_size)
    }

    pub fn status_view(&self) -> JobStatusView {
        JobStatusView {
            job_id: self.job_id.clone(),
            status: self.status,
            processed_rows: self.processed_rows,
            total_rows: self.total_rows,
            current_batch: self.current_batch,
            total_batches: self.total_batches(),
            error_message: self.error_message.clone(),
        }
    }
}

/// 进度查询视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: String,
    pub status: JobStatus,
    pub processed_rows: usize,
    pub total_rows: usize,
    pub current_batch: usize,
    pub total_batches: usize,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_pending() {
        let job = ImportJob::new("Customer", 120, 50, None);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.total_batches(), 3);
        assert_eq!(job.processed_rows, 0);
    }

    #[test]
    fn test_total_batches_zero_batch_size() {
        let job = ImportJob::new("Customer", 120, 0, None);
        assert_eq!(job.status_view().total_batches, 0);
    }

    #[test]
    fn test_failed_job_stays_terminal() {
        let mut job = ImportJob::new("Customer", 10, 5, None);
        job.transition_to(JobStatus::Processing).unwrap();
        job.mark_failed("boom").unwrap();

        let err = job.transition_to(JobStatus::Processing).unwrap_err();
        assert_eq!(err.from, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_resume_from_copies_progress() {
        let mut failed = ImportJob::new("Customer", 120, 50, Some("uploads/a.csv".to_string()));
        failed.transition_to(JobStatus::Processing).unwrap();
        failed.record_batch_success(50);
        failed.mark_failed("remote down").unwrap();

        let resumed = ImportJob::resume_from(&failed);
        assert_ne!(resumed.job_id, failed.job_id);
        assert_eq!(resumed.status, JobStatus::Pending);
        assert_eq!(resumed.processed_rows, 50);
        assert_eq!(resumed.current_batch, 1);
        assert_eq!(resumed.error_message, None);
    }
}
