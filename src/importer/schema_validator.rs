// ==========================================
// 表格批量导入系统 - 字段约束校验器
// ==========================================
// 职责: 写入前对全部行做约束校验，汇总为一份报告
// 规则:
// - 空值一律跳过
// - Select: 值必须是可选值之一
// - Link: 引用目标必须存在；允许时自动创建缺失目标
// - 其他类型: 不做内置校验
// 远程调用失败同样记为行级错误，不中断整体校验
// ==========================================

use crate::domain::{ColumnSpec, FieldKind, RawRow, ValidationError, ValidationReport};
use crate::remote::{LinkResolver, RecordCreator};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// 单次校验内的引用查询结果缓存: (实体类型, 名称) → 结果
// Err 中保存的是不含字段名的原因描述
type LinkCache = HashMap<(String, String), Result<(), String>>;

pub struct SchemaValidator {
    link_resolver: Arc<dyn LinkResolver>,
    record_creator: Option<Arc<dyn RecordCreator>>,
}

impl SchemaValidator {
    pub fn new(link_resolver: Arc<dyn LinkResolver>) -> Self {
        Self {
            link_resolver,
            record_creator: None,
        }
    }

    pub fn with_record_creator(mut self, record_creator: Arc<dyn RecordCreator>) -> Self {
        self.record_creator = Some(record_creator);
        self
    }

    /// 校验全部行
    ///
    /// # 参数
    /// - specs: 列规格
    /// - rows: 原始行数据
    /// - auto_create: 引用目标缺失时是否自动创建
    ///
    /// # 返回
    /// - ValidationReport: 以 1 起始的行号为键；为空表示全部通过
    #[instrument(skip(self, specs, rows), fields(rows = rows.len()))]
    pub async fn validate_all(
        &self,
        specs: &[ColumnSpec],
        rows: &[RawRow],
        auto_create: bool,
    ) -> ValidationReport {
        let mut report = ValidationReport::new();
        let mut cache = LinkCache::new();

        for (idx, row) in rows.iter().enumerate() {
            let row_number = idx + 1;
            for error in self
                .validate_row(row_number, specs, row, auto_create, &mut cache)
                .await
            {
                report.push(error);
            }
        }

        if report.is_empty() {
            info!(rows = rows.len(), "字段约束校验通过");
        } else {
            warn!(
                rows_with_errors = report.rows_with_errors(),
                errors = report.error_count(),
                "字段约束校验未通过"
            );
        }
        report
    }

    async fn validate_row(
        &self,
        row_number: usize,
        specs: &[ColumnSpec],
        row: &RawRow,
        auto_create: bool,
        cache: &mut LinkCache,
    ) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for spec in specs {
            let Some(value) = spec.value_in(row) else {
                continue;
            };

            let outcome = match (&spec.kind, spec.options.as_deref()) {
                (Some(FieldKind::Select), Some(_)) => check_select(spec, value),
                (Some(FieldKind::Link), Some(entity_type)) => {
                    self.check_link(spec, entity_type, value, auto_create, cache)
                        .await
                }
                _ => Ok(()),
            };

            if let Err(message) = outcome {
                errors.push(ValidationError {
                    row_number,
                    field_path: spec.path.clone(),
                    message,
                });
            }
        }

        errors
    }

    async fn check_link(
        &self,
        spec: &ColumnSpec,
        entity_type: &str,
        value: &str,
        auto_create: bool,
        cache: &mut LinkCache,
    ) -> Result<(), String> {
        let key = (entity_type.to_string(), value.to_string());
        if let Some(cached) = cache.get(&key) {
            return cached
                .clone()
                .map_err(|reason| format!("字段 '{}' {}", spec.path, reason));
        }

        let exists = match self.link_resolver.exists(entity_type, value).await {
            Ok(exists) => exists,
            Err(e) => {
                // 基础设施错误不缓存，后续行会重新查询
                warn!(entity_type = %entity_type, value = %value, error = %e, "引用校验调用失败");
                return Err(format!(
                    "字段 '{}' 引用校验失败 ({} '{}'): {}",
                    spec.path, entity_type, value, e
                ));
            }
        };

        let outcome = if exists {
            Ok(())
        } else {
            self.resolve_missing(entity_type, value, auto_create).await
        };

        cache.insert(key, outcome.clone());
        outcome.map_err(|reason| format!("字段 '{}' {}", spec.path, reason))
    }

    async fn resolve_missing(
        &self,
        entity_type: &str,
        value: &str,
        auto_create: bool,
    ) -> Result<(), String> {
        if !auto_create {
            return Err(format!("引用的 {} '{}' 不存在", entity_type, value));
        }

        let Some(creator) = &self.record_creator else {
            return Err(format!(
                "引用的 {} '{}' 不存在，且未配置自动创建",
                entity_type, value
            ));
        };

        debug!(entity_type = %entity_type, value = %value, "引用目标缺失，尝试自动创建");
        creator
            .create_missing(entity_type, value)
            .await
            .map_err(|e| format!("引用的 {} '{}' 不存在，自动创建失败: {}", entity_type, value, e))
    }
}

fn check_select(spec: &ColumnSpec, value: &str) -> Result<(), String> {
    let options = spec.select_options();
    if options.iter().any(|o| *o == value) {
        return Ok(());
    }
    Err(format!(
        "字段 '{}' 的值 '{}' 无效，可选值: {}",
        spec.path,
        value,
        options.join(", ")
    ))
}
