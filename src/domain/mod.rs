// ==========================================
// 表格批量导入系统 - 领域层
// ==========================================
// 职责: 列规格、记录、任务等核心领域对象
// 红线: 领域层不依赖仓储与远程调用
// ==========================================

pub mod column;
pub mod job;
pub mod record;
pub mod types;
pub mod validation;

// 重导出核心类型
pub use column::{ColumnPath, ColumnSpec};
pub use job::{ImportJob, JobStatusView, JobTransitionError};
pub use record::{cell_value, ChildRow, RawRow, Record, SecondaryGroup};
pub use types::{FieldKind, JobStatus};
pub use validation::{ValidationError, ValidationReport};
