// ==========================================
// 表格批量导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::{init_schema, open_sqlite_connection};
use crate::importer::batch_planner::BatchSizePolicy;
use crate::repository::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// 配置键
pub mod config_keys {
    pub const BATCH_SIZE_SMALL: &str = "import/batch_size_small";
    pub const BATCH_SIZE_MEDIUM: &str = "import/batch_size_medium";
    pub const BATCH_SIZE_LARGE: &str = "import/batch_size_large";
    pub const BATCH_SIZE_HUGE: &str = "import/batch_size_huge";
    pub const THRESHOLD_SMALL_BYTES: &str = "import/threshold_small_bytes";
    pub const THRESHOLD_MEDIUM_BYTES: &str = "import/threshold_medium_bytes";
    pub const THRESHOLD_LARGE_BYTES: &str = "import/threshold_large_bytes";
    pub const AUTO_CREATE_LINKS: &str = "import/auto_create_links";
    pub const STORAGE_ROOT: &str = "import/storage_root";
}

/// 默认上传目录
pub const DEFAULT_STORAGE_ROOT: &str = "uploads";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建 ConfigManager
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

    /// 读取 global scope 的配置值
    pub fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 读取并解析配置值，缺失时返回默认值
    fn get_parsed_or<T: FromStr>(&self, key: &str, default: T) -> RepositoryResult<T> {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|_| RepositoryError::FieldValueError {
                field: key.to_string(),
                message: format!("配置值格式错误: {}", raw),
            }),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_batch_size_policy(&self) -> RepositoryResult<BatchSizePolicy> {
        let d = BatchSizePolicy::default();
        let policy = BatchSizePolicy {
            small_batch: self.get_parsed_or(config_keys::BATCH_SIZE_SMALL, d.small_batch)?,
            medium_batch: self.get_parsed_or(config_keys::BATCH_SIZE_MEDIUM, d.medium_batch)?,
            large_batch: self.get_parsed_or(config_keys::BATCH_SIZE_LARGE, d.large_batch)?,
            huge_batch: self.get_parsed_or(config_keys::BATCH_SIZE_HUGE, d.huge_batch)?,
            small_limit_bytes: self
                .get_parsed_or(config_keys::THRESHOLD_SMALL_BYTES, d.small_limit_bytes)?,
            medium_limit_bytes: self
                .get_parsed_or(config_keys::THRESHOLD_MEDIUM_BYTES, d.medium_limit_bytes)?,
            large_limit_bytes: self
                .get_parsed_or(config_keys::THRESHOLD_LARGE_BYTES, d.large_limit_bytes)?,
        };
        Ok(policy)
    }

    async fn get_auto_create_links(&self) -> RepositoryResult<bool> {
        match self.get_config_value(config_keys::AUTO_CREATE_LINKS)? {
            None => Ok(false),
            Some(raw) => parse_flag(&raw).ok_or_else(|| RepositoryError::FieldValueError {
                field: config_keys::AUTO_CREATE_LINKS.to_string(),
                message: format!("无法解析为布尔值: {}", raw),
            }),
        }
    }

    async fn get_storage_root(&self) -> RepositoryResult<PathBuf> {
        let root = self
            .get_config_value(config_keys::STORAGE_ROOT)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_STORAGE_ROOT.to_string());
        Ok(PathBuf::from(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_table_empty() {
        let config = memory_config();

        assert_eq!(
            config.get_batch_size_policy().await.unwrap(),
            BatchSizePolicy::default()
        );
        assert!(!config.get_auto_create_links().await.unwrap());
        assert_eq!(
            config.get_storage_root().await.unwrap(),
            PathBuf::from("uploads")
        );
    }

    #[tokio::test]
    async fn test_overrides() {
        let config = memory_config();
        config.set_config_value(config_keys::BATCH_SIZE_SMALL, "20").unwrap();
        config.set_config_value(config_keys::AUTO_CREATE_LINKS, "yes").unwrap();
        config.set_config_value(config_keys::STORAGE_ROOT, "/srv/uploads").unwrap();

        let policy = config.get_batch_size_policy().await.unwrap();
        assert_eq!(policy.small_batch, 20);
        assert_eq!(policy.medium_batch, 100);
        assert!(config.get_auto_create_links().await.unwrap());
        assert_eq!(
            config.get_storage_root().await.unwrap(),
            PathBuf::from("/srv/uploads")
        );
    }

    #[tokio::test]
    async fn test_bad_value_is_reported() {
        let config = memory_config();
        config.set_config_value(config_keys::BATCH_SIZE_HUGE, "lots").unwrap();

        let err = config.get_batch_size_policy().await.unwrap_err();
        assert!(matches!(err, RepositoryError::FieldValueError { .. }));
    }
}
