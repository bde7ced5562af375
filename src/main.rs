// ==========================================
// 表格批量导入系统 - 离线试运行入口
// ==========================================
// 用法:
//   sheet-importer <file> <entity_type> [known_links.json]
//   SHEET_IMPORTER_LOG_JSON=1 时日志以 JSON 输出
//
// 依据离线引用表校验，通过后将文档逐行以 JSON 输出到 stdout
// 不连接远程服务，不删除源文件
// ==========================================

use anyhow::{bail, Context};
use rusqlite::Connection;
use sheet_importer::domain::ImportJob;
use sheet_importer::importer::{
    choose_batch_size, column_parser, FieldMapping, FileParser, ImportRun, JobController,
    SchemaValidator, SourceFiles, TemplateHandler, UniversalFileParser,
};
use sheet_importer::remote::{JsonLinesSink, StaticLinkResolver};
use sheet_importer::repository::{ImportJobRepository, ImportJobRepositoryImpl};
use sheet_importer::{logging, VERSION};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var_os("SHEET_IMPORTER_LOG_JSON").is_some() {
        logging::init_json();
    } else {
        logging::init();
    }

    let mut args = std::env::args().skip(1);
    let (Some(file), Some(entity_type)) = (args.next(), args.next()) else {
        bail!("用法: sheet-importer <file> <entity_type> [known_links.json]");
    };
    let links_path = args.next().map(PathBuf::from);

    tracing::info!(version = VERSION, file = %file, entity_type = %entity_type, "开始试运行");

    let links = match links_path {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("无法读取引用表 {}", path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("引用表不是合法 JSON: {}", path.display()))?;
            StaticLinkResolver::from_json(&value)?
        }
        None => StaticLinkResolver::new(),
    };
    let links = Arc::new(links);

    let path = PathBuf::from(&file);
    let sheet = UniversalFileParser.parse_sheet(&path)?;
    let specs = column_parser::parse_headers(sheet.headers.iter().map(|h| h.as_str()));

    // 自动创建写入离线引用表，仅对本次试运行有效
    let validator = SchemaValidator::new(links.clone()).with_record_creator(links.clone());
    let report = validator.validate_all(&specs, &sheet.rows, true).await;
    if !report.is_empty() {
        eprintln!("{}", report.to_message());
        bail!("校验未通过: {} 行存在错误", report.rows_with_errors());
    }

    let file_bytes = std::fs::metadata(&path)?.len();
    let batch_size = choose_batch_size(file_bytes);

    // 试运行任务存放在内存库；不登记源文件，避免被释放
    let conn = Arc::new(Mutex::new(Connection::open_in_memory()?));
    let store = ImportJobRepositoryImpl::from_connection(conn)?;
    let controller = JobController::new(store, SourceFiles::new("."));

    let mut job = ImportJob::new(&entity_type, sheet.total_rows(), batch_size, None);
    controller.store().create(&job).await?;

    let mapping = FieldMapping::new();
    let input = ImportRun {
        specs: &specs,
        rows: &sheet.rows,
        field_mapping: &mapping,
        handler: TemplateHandler::resolve(&entity_type),
    };
    let sink = JsonLinesSink::new(std::io::stdout());
    controller.run(&mut job, &input, &sink).await?;

    let view = job.status_view();
    eprintln!(
        "完成: {} 行, {} 批 (批次大小 {})",
        view.processed_rows, view.total_batches, batch_size
    );
    Ok(())
}
