// ==========================================
// 表格批量导入系统 - 导入任务 Repository 实现
// ==========================================
// 存储: import_job 表（rusqlite）
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::{ImportJob, JobStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::import_job_repo::ImportJobRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct ImportJobRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ImportJobRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建（会确保 import_job 表存在）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            init_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row) -> rusqlite::Result<RawJobRow> {
        Ok(RawJobRow {
            job_id: row.get(0)?,
            entity_type: row.get(1)?,
            status: row.get(2)?,
            total_rows: row.get(3)?,
            processed_rows: row.get(4)?,
            batch_size: row.get(5)?,
            current_batch: row.get(6)?,
            error_message: row.get(7)?,
            file_path: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    /// 列出指定状态的任务（用于启动时发现中断的任务）
    pub fn list_by_status(&self, status: JobStatus) -> RepositoryResult<Vec<ImportJob>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT job_id, entity_type, status, total_rows, processed_rows, batch_size,
                   current_batch, error_message, file_path, created_at, updated_at
            FROM import_job
            WHERE status = ?1
            ORDER BY created_at
            "#,
        )?;

        let rows = stmt.query_map(params![status.as_str()], Self::map_row)?;
        let mut jobs = Vec::new();
        for row in rows {
            jobs.push(row?.into_job()?);
        }
        Ok(jobs)
    }
}

// 数据库行的原始形态
struct RawJobRow {
    job_id: String,
    entity_type: String,
    status: String,
    total_rows: i64,
    processed_rows: i64,
    batch_size: i64,
    current_batch: i64,
    error_message: Option<String>,
    file_path: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RawJobRow {
    fn into_job(self) -> RepositoryResult<ImportJob> {
        let status = JobStatus::parse(&self.status).ok_or_else(|| RepositoryError::FieldValueError {
            field: "status".to_string(),
            message: format!("未知任务状态: {}", self.status),
        })?;

        Ok(ImportJob {
            job_id: self.job_id,
            entity_type: self.entity_type,
            status,
            total_rows: to_count("total_rows", self.total_rows)?,
            processed_rows: to_count("processed_rows", self.processed_rows)?,
            batch_size: to_count("batch_size", self.batch_size)?,
            current_batch: to_count("current_batch", self.current_batch)?,
            error_message: self.error_message,
            file_path: self.file_path,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
        })
    }
}

fn to_count(field: &str, value: i64) -> RepositoryResult<usize> {
    usize::try_from(value).map_err(|_| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("计数为负数: {}", value),
    })
}

fn parse_timestamp(field: &str, value: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("时间格式错误 ({}): {}", value, e),
        })
}

#[async_trait]
impl ImportJobRepository for ImportJobRepositoryImpl {
    async fn create(&self, job: &ImportJob) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_job (
                job_id, entity_type, status, total_rows, processed_rows, batch_size,
                current_batch, error_message, file_path, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                job.job_id,
                job.entity_type,
                job.status.as_str(),
                job.total_rows as i64,
                job.processed_rows as i64,
                job.batch_size as i64,
                job.current_batch as i64,
                job.error_message,
                job.file_path,
                job.created_at.to_rfc3339(),
                job.updated_at.to_rfc3339(),
            ],
        )?;

        debug!(job_id = %job.job_id, "导入任务已创建");
        Ok(job.job_id.clone())
    }

    async fn load(&self, job_id: &str) -> RepositoryResult<ImportJob> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                r#"
                SELECT job_id, entity_type, status, total_rows, processed_rows, batch_size,
                       current_batch, error_message, file_path, created_at, updated_at
                FROM import_job
                WHERE job_id = ?1
                "#,
                params![job_id],
                Self::map_row,
            )
            .optional()?;

        match raw {
            Some(raw) => raw.into_job(),
            None => Err(RepositoryError::NotFound {
                entity: "ImportJob".to_string(),
                id: job_id.to_string(),
            }),
        }
    }

    async fn save(&self, job: &ImportJob) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE import_job SET
                status = ?2,
                total_rows = ?3,
                processed_rows = ?4,
                batch_size = ?5,
                current_batch = ?6,
                error_message = ?7,
                file_path = ?8,
                updated_at = ?9
            WHERE job_id = ?1
            "#,
            params![
                job.job_id,
                job.status.as_str(),
                job.total_rows as i64,
                job.processed_rows as i64,
                job.batch_size as i64,
                job.current_batch as i64,
                job.error_message,
                job.file_path,
                job.updated_at.to_rfc3339(),
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ImportJob".to_string(),
                id: job.job_id.clone(),
            });
        }

        debug!(
            job_id = %job.job_id,
            status = %job.status,
            processed_rows = job.processed_rows,
            current_batch = job.current_batch,
            "导入任务已保存"
        );
        Ok(())
    }
}
