// ==========================================
// 表格批量导入系统 - 导入任务控制器
// ==========================================
// 流程: pending → processing → 逐批 组装 → 拆分 → 写入 → 持久化进度
//       → completed | failed
// 红线:
// - 批次严格按顺序处理，上一批未成功不进入下一批
// - 进度只在批次写入成功且已持久化后推进
// - 首个失败批次即终止，失败任务不可再迁移
// - 两种终态都释放源文件
// ==========================================

use crate::domain::{ColumnSpec, ImportJob, JobStatus, RawRow, Record};
use crate::importer::batch_planner::plan_batches;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::record_assembler::{assemble_batch, FieldMapping};
use crate::importer::source_files::SourceFiles;
use crate::importer::template_handler::TemplateHandler;
use crate::remote::BulkWriter;
use crate::repository::ImportJobRepository;
use std::collections::BTreeMap;
use tracing::{debug, error, info, instrument, warn};

/// 一次任务执行的输入
#[derive(Debug, Clone, Copy)]
pub struct ImportRun<'a> {
    pub specs: &'a [ColumnSpec],
    pub rows: &'a [RawRow],
    pub field_mapping: &'a FieldMapping,
    pub handler: TemplateHandler,
}

// ==========================================
// JobController - 导入任务控制器
// ==========================================
pub struct JobController<S>
where
    S: ImportJobRepository,
{
    store: S,
    source_files: SourceFiles,
}

impl<S> JobController<S>
where
    S: ImportJobRepository,
{
    pub fn new(store: S, source_files: SourceFiles) -> Self {
        Self {
            store,
            source_files,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 执行任务
    ///
    /// pending 任务从第 0 批开始；processing 任务（进程中断后）从 current_batch 续跑
    ///
    /// # 返回
    /// - Ok(()): 任务已完成
    /// - Err(BatchWriteFailed): 某批次写入失败，任务已置为 failed
    /// - Err(InvalidStateTransition): 任务已处于终态
    #[instrument(skip(self, job, input, writer), fields(job_id = %job.job_id, entity_type = %job.entity_type))]
    pub async fn run<W>(
        &self,
        job: &mut ImportJob,
        input: &ImportRun<'_>,
        writer: &W,
    ) -> ImportResult<()>
    where
        W: BulkWriter + ?Sized,
    {
        let resumed = job.status == JobStatus::Processing;
        job.transition_to(JobStatus::Processing)?;
        self.store.save(job).await?;

        if input.rows.len() != job.total_rows {
            let err = ImportError::RowCountMismatch {
                expected: job.total_rows,
                actual: input.rows.len(),
            };
            self.fail(job, err.to_string()).await?;
            return Err(err);
        }

        let plan = plan_batches(job.total_rows, job.batch_size);
        info!(
            total_rows = job.total_rows,
            batch_size = plan.batch_size(),
            total_batches = plan.total_batches(),
            start_batch = job.current_batch,
            resumed,
            "开始执行导入任务"
        );

        for (index, range) in plan.iter_from(job.current_batch) {
            let batch_no = index + 1;
            debug!(batch = batch_no, start = range.start, end = range.end, "处理批次");

            let end = range.end;
            let records = assemble_batch(input.specs, &input.rows[range], input.field_mapping);

            let written = self
                .write_batch(&job.entity_type, input.handler, records, writer)
                .await;
            if let Err(message) = written {
                error!(batch = batch_no, error = %message, "批次写入失败，任务终止");
                self.fail(job, message.clone()).await?;
                return Err(ImportError::BatchWriteFailed {
                    batch: batch_no,
                    message,
                });
            }

            job.record_batch_success(end);
            self.store.save(job).await?;
            debug!(
                batch = batch_no,
                processed_rows = job.processed_rows,
                "批次写入成功"
            );
        }

        job.transition_to(JobStatus::Completed)?;
        self.store.save(job).await?;
        self.release_source(job);

        info!(processed_rows = job.processed_rows, "导入任务完成");
        Ok(())
    }

    // 写入一个批次: 主记录在前，次级记录按实体类型合并，每个实体类型一次写入
    async fn write_batch<W>(
        &self,
        entity_type: &str,
        handler: TemplateHandler,
        records: Vec<Record>,
        writer: &W,
    ) -> Result<(), String>
    where
        W: BulkWriter + ?Sized,
    {
        let mut primaries = Vec::with_capacity(records.len());
        let mut secondaries: BTreeMap<String, Vec<Record>> = BTreeMap::new();
        for record in records {
            let (primary, groups) = handler.split(record);
            if !primary.is_empty() {
                primaries.push(primary);
            }
            for group in groups {
                secondaries
                    .entry(group.entity_type)
                    .or_default()
                    .extend(group.records.into_iter().filter(|r| !r.is_empty()));
            }
        }

        if !primaries.is_empty() {
            writer
                .insert_many(entity_type, &primaries)
                .await
                .map_err(|e| e.to_string())?;
        }

        for (group_type, group_records) in secondaries.iter().filter(|(_, r)| !r.is_empty()) {
            writer
                .insert_many(group_type, group_records)
                .await
                .map_err(|e| format!("{} 写入失败: {}", group_type, e))?;
        }

        Ok(())
    }

    // 失败状态持久化出错只记日志，保留原始失败原因，源文件照常释放
    async fn fail(&self, job: &mut ImportJob, message: String) -> ImportResult<()> {
        job.mark_failed(message)?;
        if let Err(e) = self.store.save(job).await {
            error!(error = %e, "失败状态持久化失败");
        }
        self.release_source(job);
        Ok(())
    }

    // 释放失败只记日志，不改变任务结果
    fn release_source(&self, job: &ImportJob) {
        let Some(file_path) = job.file_path.as_deref() else {
            return;
        };
        if let Err(e) = self.source_files.release(file_path) {
            warn!(file_path = %file_path, error = %e, "源文件释放失败");
        }
    }
}
