// ==========================================
// 表格批量导入系统 - 源文件存储
// ==========================================
// 存储根目录显式注入；任务终态时释放（删除）源文件
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SourceFiles {
    root: PathBuf,
}

impl SourceFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 解析源文件路径
    ///
    /// 绝对路径原样返回；相对路径挂在存储根目录下，且不允许包含 `..`
    pub fn resolve(&self, file_path: &str) -> ImportResult<PathBuf> {
        let path = Path::new(file_path);
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(ImportError::InvalidSourcePath(file_path.to_string()));
        }
        Ok(self.root.join(path))
    }

    /// 源文件字节数（用于选择批次大小）
    pub fn size_of(&self, file_path: &str) -> ImportResult<u64> {
        let path = self.resolve(file_path)?;
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        Ok(std::fs::metadata(&path)?.len())
    }

    /// 释放源文件
    ///
    /// # 返回
    /// - Ok(true): 已删除
    /// - Ok(false): 文件本就不存在
    pub fn release(&self, file_path: &str) -> ImportResult<bool> {
        let path = self.resolve(file_path)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "源文件已释放");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "源文件不存在，无需释放");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
