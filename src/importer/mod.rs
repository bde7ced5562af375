// ==========================================
// 表格批量导入系统 - 导入层
// ==========================================
// 职责: 列头解析 → 约束校验 → 批次规划 → 记录组装 → 分批写入
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod batch_planner;
pub mod column_parser;
pub mod error;
pub mod file_parser;
pub mod job_controller;
pub mod record_assembler;
pub mod schema_validator;
pub mod source_files;
pub mod template_handler;

// 重导出核心类型
pub use batch_planner::{choose_batch_size, plan_batches, BatchIter, BatchPlan, BatchSizePolicy};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, ParsedSheet, UniversalFileParser};
pub use job_controller::{ImportRun, JobController};
pub use record_assembler::{assemble, assemble_batch, FieldMapping};
pub use schema_validator::SchemaValidator;
pub use source_files::SourceFiles;
pub use template_handler::TemplateHandler;
