// ==========================================
// 导入组件集成测试
// ==========================================
// 列头解析 → 约束校验 → 记录组装 → 批次规划，不经过 API 层
// ==========================================

mod test_helpers;

use serde_json::json;
use sheet_importer::domain::{FieldKind, RawRow};
use sheet_importer::importer::column_parser::{parse, parse_headers};
use sheet_importer::importer::{
    assemble, plan_batches, CsvParser, FieldMapping, FileParser, SchemaValidator,
};
use sheet_importer::remote::{AutoCreator, JsonLinesSink, LinkResolver, StaticLinkResolver};
use std::sync::Arc;
use test_helpers::write_csv;

fn row(pairs: &[(&str, &str)]) -> RawRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_header_grammar() {
    let spec = parse("customer_group [Link] [Customer Group]");
    assert_eq!(spec.path, "customer_group");
    assert_eq!(spec.kind, Some(FieldKind::Link));
    assert_eq!(spec.options.as_deref(), Some("Customer Group"));

    let spec = parse("is_frozen [Check]");
    assert_eq!(spec.kind, Some(FieldKind::Check));
    assert_eq!(spec.options, None);

    let spec = parse("  notes  ");
    assert_eq!(spec.path, "notes");
    assert_eq!(spec.kind, None);
}

#[tokio::test]
async fn test_select_scenario_with_short_row_keys() {
    let specs = vec![parse("customer_type [Select] [Company, Individual]")];
    let rows = vec![
        row(&[("customer_type [Select]", "Company")]),
        row(&[("customer_type [Select]", "Bogus")]),
    ];
    let validator = SchemaValidator::new(Arc::new(StaticLinkResolver::new()));

    let report = validator.validate_all(&specs, &rows, false).await;

    assert_eq!(report.error_count(), 1);
    assert_eq!(report.errors_for_row(2).len(), 1);
    assert!(report.errors_for_row(2)[0].message.contains("Bogus"));
    assert!(report.to_message().starts_with("第 2 行"));
}

#[tokio::test]
async fn test_auto_create_writes_parent_document() {
    let sink = Arc::new(JsonLinesSink::new(Vec::<u8>::new()));
    let creator = Arc::new(AutoCreator::new(sink.clone()));
    let specs = parse_headers(["customer_group [Link] [Customer Group]"]);
    let rows = vec![
        row(&[("customer_group [Link] [Customer Group]", "Wholesale")]),
        row(&[("customer_group [Link] [Customer Group]", "Wholesale")]),
    ];
    let validator =
        SchemaValidator::new(Arc::new(StaticLinkResolver::new())).with_record_creator(creator);

    let report = validator.validate_all(&specs, &rows, true).await;
    assert!(report.is_empty());

    drop(validator);
    let sink = Arc::try_unwrap(sink).ok().unwrap();
    let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    let lines: Vec<serde_json::Value> = output
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    // 同名缺失目标只创建一次
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["doctype"], json!("Customer Group"));
    assert_eq!(lines[0]["customer_group_name"], json!("Wholesale"));
    assert_eq!(lines[0]["parent_customer_group"], json!("All Customer Groups"));
}

#[test]
fn test_csv_to_records_with_child_tables() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_csv(
        dir.path(),
        "orders.csv",
        &[
            "customer [Data],items.2.item_code,items.1.item_code,items.1.qty [Int]".to_string(),
            "ACME,SKU-2,SKU-1,3".to_string(),
            "Globex,,SKU-9,".to_string(),
        ],
    );

    let sheet = CsvParser.parse_sheet(&dir.path().join(file)).unwrap();
    let specs = parse_headers(sheet.headers.iter().map(|h| h.as_str()));
    let mapping = FieldMapping::new();

    let first = assemble(&specs, &sheet.rows[0], &mapping);
    let items = &first.child_tables["items"];
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["item_code"], json!("SKU-1"));
    assert_eq!(items[0]["qty"], json!(3));
    assert_eq!(items[1]["item_code"], json!("SKU-2"));

    let second = assemble(&specs, &sheet.rows[1], &mapping);
    assert_eq!(second.child_tables["items"].len(), 1);
    assert_eq!(
        second.to_typed_document("Sales Order")["doctype"],
        json!("Sales Order")
    );
}

#[test]
fn test_plan_for_uploaded_rows() {
    let plan = plan_batches(120, 50);
    let ranges: Vec<_> = plan.iter().map(|(_, r)| (r.start, r.end)).collect();
    assert_eq!(ranges, vec![(0, 50), (50, 100), (100, 120)]);
}

#[tokio::test]
async fn test_static_links_from_json() {
    let links = StaticLinkResolver::from_json(&json!({
        "Territory": ["India", "Nepal"],
        "Customer Group": ["Commercial"]
    }))
    .unwrap();

    assert!(links.exists("Territory", "Nepal").await.unwrap());
    assert!(!links.exists("Territory", "Mars").await.unwrap());
    assert!(StaticLinkResolver::from_json(&json!(["not", "an", "object"])).is_err());
}
