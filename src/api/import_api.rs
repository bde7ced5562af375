// ==========================================
// 表格批量导入系统 - 导入API
// ==========================================
// 职责: 封装上传校验、启动导入、进度查询与模板生成
// 流程:
// 1. prepare_upload: 解析文件 → 约束校验 → 选择批次大小 → 建立 pending 任务
// 2. start_import:   加载任务 → 重新解析文件 → 控制器逐批写入
// 3. get_status:     查询任务进度
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::db::{default_db_path, open_sqlite_connection};
use crate::domain::{ColumnSpec, ImportJob, JobStatus, JobStatusView};
use crate::importer::{
    column_parser, FieldMapping, FileParser, ImportError, ImportRun, JobController, ParsedSheet,
    SchemaValidator, SourceFiles, TemplateHandler, UniversalFileParser,
};
use crate::remote::{BulkWriter, LinkResolver, RecordCreator};
use crate::repository::{ImportJobRepository, ImportJobRepositoryImpl};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

/// 上传校验通过后的响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub entity_type: String,
    /// 解析出的列规格（供调用方配置字段映射）
    pub columns: Vec<ColumnSpec>,
    pub total_rows: usize,
    pub batch_size: usize,
    pub total_batches: usize,
}

/// 导入所依赖的远程能力
#[derive(Clone)]
pub struct RemoteCollaborators {
    pub link_resolver: Arc<dyn LinkResolver>,
    pub record_creator: Option<Arc<dyn RecordCreator>>,
    pub bulk_writer: Arc<dyn BulkWriter>,
}

/// 导入API
pub struct ImportApi<S, C>
where
    S: ImportJobRepository,
    C: ImportConfigReader,
{
    controller: JobController<S>,
    config: C,
    source_files: SourceFiles,
    remote: RemoteCollaborators,
}

impl ImportApi<ImportJobRepositoryImpl, ConfigManager> {
    /// 基于数据库文件创建（任务与配置共享同一连接）
    ///
    /// 存储根目录从 config_kv 读取
    pub async fn open(db_path: &str, remote: RemoteCollaborators) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        Self::from_connection(Arc::new(Mutex::new(conn)), remote).await
    }

    /// 使用默认数据库路径创建（见 db::default_db_path）
    pub async fn open_default(remote: RemoteCollaborators) -> ApiResult<Self> {
        Self::open(&default_db_path(), remote).await
    }

    pub async fn from_connection(
        conn: Arc<Mutex<Connection>>,
        remote: RemoteCollaborators,
    ) -> ApiResult<Self> {
        let config = ConfigManager::from_connection(conn.clone())?;
        let store = ImportJobRepositoryImpl::from_connection(conn)?;
        let storage_root = config.get_storage_root().await?;
        info!(storage_root = %storage_root.display(), "导入API初始化完成");
        Ok(Self::new(store, config, SourceFiles::new(storage_root), remote))
    }
}

impl<S, C> ImportApi<S, C>
where
    S: ImportJobRepository,
    C: ImportConfigReader,
{
    pub fn new(store: S, config: C, source_files: SourceFiles, remote: RemoteCollaborators) -> Self {
        Self {
            controller: JobController::new(store, source_files.clone()),
            config,
            source_files,
            remote,
        }
    }

    fn read_sheet(&self, file_name: &str) -> ApiResult<ParsedSheet> {
        let path = self.source_files.resolve(file_name)?;
        Ok(UniversalFileParser.parse_sheet(&path)?)
    }

    // 拒绝上传时释放源文件，释放失败不覆盖原错误
    fn discard_upload(&self, file_name: &str) {
        if let Err(e) = self.source_files.release(file_name) {
            warn!(file_name = %file_name, error = %e, "源文件释放失败");
        }
    }

    // 按文件字节数选定批次大小并落库 pending 任务
    async fn register_job(
        &self,
        file_name: &str,
        entity_type: &str,
        total_rows: usize,
    ) -> ApiResult<(ImportJob, u64)> {
        let file_bytes = self.source_files.size_of(file_name)?;
        let policy = self.config.get_batch_size_policy().await?;
        let batch_size = policy.choose(file_bytes);

        let job = ImportJob::new(
            entity_type,
            total_rows,
            batch_size,
            Some(file_name.to_string()),
        );
        self.controller.store().create(&job).await?;
        Ok((job, file_bytes))
    }

    /// 上传校验并建立任务
    ///
    /// # 参数
    /// - file_name: 存储根目录下的源文件名
    /// - entity_type: 目标实体类型
    ///
    /// # 返回
    /// - Ok(UploadResponse): pending 任务
    /// - Err(ValidationError): 存在行级错误，未建立任务且源文件已释放
    #[instrument(skip(self))]
    pub async fn prepare_upload(
        &self,
        file_name: &str,
        entity_type: &str,
    ) -> ApiResult<UploadResponse> {
        if entity_type.trim().is_empty() {
            return Err(ApiError::InvalidInput("实体类型不能为空".to_string()));
        }

        let sheet = match self.read_sheet(file_name) {
            Ok(sheet) => sheet,
            Err(e) => {
                self.discard_upload(file_name);
                return Err(e);
            }
        };
        let specs = column_parser::parse_headers(sheet.headers.iter().map(|h| h.as_str()));

        let auto_create = match self.config.get_auto_create_links().await {
            Ok(enabled) => enabled,
            Err(e) => {
                self.discard_upload(file_name);
                return Err(e.into());
            }
        };
        let mut validator = SchemaValidator::new(self.remote.link_resolver.clone());
        if let Some(creator) = &self.remote.record_creator {
            validator = validator.with_record_creator(creator.clone());
        }

        let report = validator.validate_all(&specs, &sheet.rows, auto_create).await;
        if !report.is_empty() {
            self.discard_upload(file_name);
            return Err(ApiError::ValidationError(report));
        }

        // 建立任务失败时源文件无人持有，同样释放
        let (job, file_bytes) = match self
            .register_job(file_name, entity_type.trim(), sheet.total_rows())
            .await
        {
            Ok(created) => created,
            Err(e) => {
                self.discard_upload(file_name);
                return Err(e);
            }
        };
        let job_id = job.job_id.clone();
        let batch_size = job.batch_size;

        info!(
            job_id = %job_id,
            total_rows = job.total_rows,
            file_bytes,
            batch_size,
            "导入任务已建立"
        );

        Ok(UploadResponse {
            job_id,
            entity_type: job.entity_type.clone(),
            columns: specs,
            total_rows: job.total_rows,
            batch_size,
            total_batches: job.total_batches(),
        })
    }

    /// 启动（或续跑）导入任务
    ///
    /// # 返回
    /// - Ok(JobStatusView): 任务已完成
    /// - Err: 任务失败或状态不允许执行；失败详情可通过 get_status 查询
    #[instrument(skip(self, field_mapping), fields(mapped_columns = field_mapping.len()))]
    pub async fn start_import(
        &self,
        job_id: &str,
        field_mapping: &FieldMapping,
    ) -> ApiResult<JobStatusView> {
        let mut job = self.controller.store().load(job_id).await?;
        if job.status.is_terminal() {
            return Err(ApiError::InvalidStateTransition {
                from: job.status.to_string(),
                to: JobStatus::Processing.to_string(),
            });
        }

        let file_name = job
            .file_path
            .clone()
            .ok_or_else(|| ApiError::InvalidInput(format!("任务 {} 缺少源文件", job_id)))?;

        let sheet = match self.read_sheet(&file_name) {
            Ok(sheet) => sheet,
            Err(e) => {
                // 源文件不可读，任务无法继续
                job.mark_failed(e.to_string()).map_err(ImportError::from)?;
                self.controller.store().save(&job).await?;
                self.discard_upload(&file_name);
                return Err(e);
            }
        };
        let specs = column_parser::parse_headers(sheet.headers.iter().map(|h| h.as_str()));

        let input = ImportRun {
            specs: &specs,
            rows: &sheet.rows,
            field_mapping,
            handler: TemplateHandler::resolve(&job.entity_type),
        };
        self.controller
            .run(&mut job, &input, self.remote.bulk_writer.as_ref())
            .await?;

        Ok(job.status_view())
    }

    /// 以失败任务的进度建立新任务（源文件需重新上传）
    ///
    /// # 返回
    /// - Ok(String): 新任务 ID，从失败任务的下一个未处理批次开始
    pub async fn resume_failed(&self, job_id: &str, file_name: &str) -> ApiResult<String> {
        let failed = self.controller.store().load(job_id).await?;
        if failed.status != JobStatus::Failed {
            return Err(ApiError::InvalidStateTransition {
                from: failed.status.to_string(),
                to: JobStatus::Pending.to_string(),
            });
        }

        let mut job = ImportJob::resume_from(&failed);
        job.file_path = Some(file_name.to_string());
        let new_id = self.controller.store().create(&job).await?;

        info!(
            failed_job_id = %job_id,
            job_id = %new_id,
            start_batch = job.current_batch,
            "已基于失败任务建立续跑任务"
        );
        Ok(new_id)
    }

    /// 查询任务进度
    pub async fn get_status(&self, job_id: &str) -> ApiResult<JobStatusView> {
        let job = self.controller.store().load(job_id).await?;
        Ok(job.status_view())
    }

    /// 生成导入模板列头
    pub fn template_headers(&self, entity_type: &str, selection: &[String]) -> Vec<String> {
        TemplateHandler::resolve(entity_type)
            .fields(selection)
            .iter()
            .map(|spec| spec.to_header())
            .collect()
    }
}
