// ==========================================
// 表格批量导入系统 - 离线引用表
// ==========================================
// 用途: 离线试运行时代替远程存在性校验
// 格式: { "<实体类型>": ["名称1", "名称2", ...] }
// ==========================================

use crate::remote::{LinkResolver, RecordCreator, RemoteError, RemoteResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

pub struct StaticLinkResolver {
    known: RwLock<HashMap<String, HashSet<String>>>,
}

impl StaticLinkResolver {
    pub fn new() -> Self {
        Self {
            known: RwLock::new(HashMap::new()),
        }
    }

    /// 从 JSON 对象加载
    pub fn from_json(value: &serde_json::Value) -> Result<Self, RemoteError> {
        let object = value
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("引用表必须是 JSON 对象"))?;

        let resolver = Self::new();
        for (entity_type, names) in object {
            let names = names
                .as_array()
                .ok_or_else(|| anyhow::anyhow!("实体类型 {} 的值必须是数组", entity_type))?;
            for name in names.iter().filter_map(|n| n.as_str()) {
                resolver.insert(entity_type, name)?;
            }
        }
        Ok(resolver)
    }

    pub fn insert(&self, entity_type: &str, name: &str) -> RemoteResult<()> {
        let mut known = self
            .known
            .write()
            .map_err(|e| RemoteError::Transport(format!("锁获取失败: {}", e)))?;
        known
            .entry(entity_type.to_string())
            .or_default()
            .insert(name.to_string());
        Ok(())
    }
}

impl Default for StaticLinkResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkResolver for StaticLinkResolver {
    async fn exists(&self, entity_type: &str, name: &str) -> RemoteResult<bool> {
        let known = self
            .known
            .read()
            .map_err(|e| RemoteError::Transport(format!("锁获取失败: {}", e)))?;
        Ok(known
            .get(entity_type)
            .map(|names| names.contains(name))
            .unwrap_or(false))
    }
}

#[async_trait]
impl RecordCreator for StaticLinkResolver {
    async fn create_missing(&self, entity_type: &str, name: &str) -> RemoteResult<()> {
        self.insert(entity_type, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_from_json_and_exists() {
        let resolver =
            StaticLinkResolver::from_json(&json!({"Territory": ["India", "Nepal"]})).unwrap();

        assert!(resolver.exists("Territory", "India").await.unwrap());
        assert!(!resolver.exists("Territory", "Mars").await.unwrap());
        assert!(!resolver.exists("Currency", "INR").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_missing_registers_name() {
        let resolver = StaticLinkResolver::new();
        resolver.create_missing("Currency", "INR").await.unwrap();
        assert!(resolver.exists("Currency", "INR").await.unwrap());
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        assert!(StaticLinkResolver::from_json(&json!(["India"])).is_err());
    }
}
