// ==========================================
// 表格批量导入系统 - 核心库
// ==========================================
// 职责: 表格文件 → 列规格 → 约束校验 → 嵌套记录 → 分批写入远程文档服务
// 技术栈: Rust + SQLite（任务进度与配置）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 列规格/记录/任务
pub mod domain;

// 远程协作接口 - 引用校验/自动创建/批量写入
pub mod remote;

// 数据仓储层 - 任务持久化
pub mod repository;

// 导入层 - 解析/校验/组装/分批
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    ColumnSpec, FieldKind, ImportJob, JobStatus, JobStatusView, Record, ValidationError,
    ValidationReport,
};

// 导入层
pub use importer::{
    BatchPlan, BatchSizePolicy, FieldMapping, ImportError, JobController, SchemaValidator,
    TemplateHandler,
};

// API
pub use api::{ApiError, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "表格批量导入系统";
