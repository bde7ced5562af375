// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、上传目录、远程服务替身
// ==========================================
#![allow(dead_code)]

use async_trait::async_trait;
use rusqlite::Connection;
use sheet_importer::api::{ImportApi, RemoteCollaborators};
use sheet_importer::config::{config_keys, ConfigManager};
use sheet_importer::db::{init_schema, open_sqlite_connection};
use sheet_importer::domain::Record;
use sheet_importer::remote::{BulkWriter, RemoteError, RemoteResult, StaticLinkResolver};
use sheet_importer::repository::ImportJobRepositoryImpl;
use std::error::Error;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, TempDir};

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("非 UTF-8 路径")?.to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 在上传目录下写入 CSV 文件，返回文件名
pub fn write_csv(dir: &Path, file_name: &str, lines: &[String]) -> String {
    let mut file = std::fs::File::create(dir.join(file_name)).unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file_name.to_string()
}

/// 生成 n 行单列 CSV
pub fn name_rows_csv(header: &str, n: usize) -> Vec<String> {
    let mut lines = vec![header.to_string()];
    lines.extend((0..n).map(|i| format!("item-{:03}", i)));
    lines
}

// ==========================================
// RecordingWriter - 记录每次批量写入
// ==========================================
#[derive(Default)]
pub struct RecordingWriter {
    pub calls: Mutex<Vec<(String, Vec<Record>)>>,
    /// 第 n 次调用（从 1 开始）返回错误
    pub fail_on_call: Option<usize>,
}

impl RecordingWriter {
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(String, Vec<Record>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BulkWriter for RecordingWriter {
    async fn insert_many(&self, entity_type: &str, records: &[Record]) -> RemoteResult<()> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((entity_type.to_string(), records.to_vec()));
        if Some(calls.len()) == self.fail_on_call {
            return Err(RemoteError::Rejected {
                status: 500,
                message: "bulk insert failed".to_string(),
            });
        }
        Ok(())
    }
}

// ==========================================
// TestEnv - 完整导入环境
// ==========================================
pub struct TestEnv {
    pub upload_dir: TempDir,
    pub conn: Arc<Mutex<Connection>>,
    pub links: Arc<StaticLinkResolver>,
    pub writer: Arc<RecordingWriter>,
    pub api: ImportApi<ImportJobRepositoryImpl, ConfigManager>,
}

impl TestEnv {
    pub async fn new(writer: RecordingWriter) -> Self {
        Self::with_config(writer, &[]).await
    }

    /// 以额外配置项创建（存储根目录总是指向临时上传目录）
    pub async fn with_config(writer: RecordingWriter, settings: &[(&str, &str)]) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let conn = Arc::new(Mutex::new(Connection::open_in_memory().unwrap()));

        let config = ConfigManager::from_connection(conn.clone()).unwrap();
        config
            .set_config_value(config_keys::STORAGE_ROOT, upload_dir.path().to_str().unwrap())
            .unwrap();
        for (key, value) in settings {
            config.set_config_value(key, value).unwrap();
        }

        let links = Arc::new(StaticLinkResolver::new());
        let writer = Arc::new(writer);
        let remote = RemoteCollaborators {
            link_resolver: links.clone(),
            record_creator: Some(links.clone()),
            bulk_writer: writer.clone(),
        };
        let api = ImportApi::from_connection(conn.clone(), remote).await.unwrap();

        Self {
            upload_dir,
            conn,
            links,
            writer,
            api,
        }
    }

    pub fn upload(&self, file_name: &str, lines: &[String]) -> String {
        write_csv(self.upload_dir.path(), file_name, lines)
    }

    pub fn exists(&self, file_name: &str) -> bool {
        self.upload_dir.path().join(file_name).exists()
    }
}
