// ==========================================
// 表格批量导入系统 - 领域类型定义
// ==========================================
// 字段类型 (FieldKind) 与导入任务状态 (JobStatus)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 字段类型 (Field Kind)
// ==========================================
// 开放集合: 未识别的类型名原样保留在 Other 中
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Data,
    Select, // 枚举约束
    Link,   // 引用其他实体
    Check,  // 0/1 勾选
    Int,
    Float,
    Currency,
    Percent,
    Table, // 子表
    Other(String),
}

impl FieldKind {
    /// 从列头中的类型片段解析（空字符串返回 None）
    pub fn parse(raw: &str) -> Option<FieldKind> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let kind = match trimmed {
            "Data" => FieldKind::Data,
            "Select" => FieldKind::Select,
            "Link" => FieldKind::Link,
            "Check" => FieldKind::Check,
            "Int" => FieldKind::Int,
            "Float" => FieldKind::Float,
            "Currency" => FieldKind::Currency,
            "Percent" => FieldKind::Percent,
            "Table" => FieldKind::Table,
            other => FieldKind::Other(other.to_string()),
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Data => "Data",
            FieldKind::Select => "Select",
            FieldKind::Link => "Link",
            FieldKind::Check => "Check",
            FieldKind::Int => "Int",
            FieldKind::Float => "Float",
            FieldKind::Currency => "Currency",
            FieldKind::Percent => "Percent",
            FieldKind::Table => "Table",
            FieldKind::Other(name) => name.as_str(),
        }
    }

    /// 是否为数值类型（组装时转换为 JSON number）
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Int | FieldKind::Float | FieldKind::Currency | FieldKind::Percent
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 导入任务状态 (Job Status)
// ==========================================
// 状态机: pending → processing → completed | failed
// 终态不可再迁移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<JobStatus> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// 判断状态迁移是否合法
    ///
    /// - pending → processing | failed（预检失败）
    /// - processing → processing（崩溃后续跑）| completed | failed
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Pending, JobStatus::Processing) => true,
            (JobStatus::Pending, JobStatus::Failed) => true,
            (JobStatus::Processing, JobStatus::Processing) => true,
            (JobStatus::Processing, JobStatus::Completed) => true,
            (JobStatus::Processing, JobStatus::Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
