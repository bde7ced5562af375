// ==========================================
// 表格批量导入系统 - 实体模板策略
// ==========================================
// 按实体类型名在任务建立时一次性选定，统一提供:
// - fields(selection): 模板列规格
// - split(record): 主记录 + 需同批写入的次级实体分组
// ==========================================

use crate::domain::{ChildRow, ColumnSpec, Record, SecondaryGroup};
use crate::importer::column_parser;
use serde_json::{json, Map, Value};
use tracing::warn;

const CUSTOMER_FIELDS: &[&str] = &[
    "customer_name [Data]",
    "customer_type [Select] [Company, Individual]",
    "customer_group [Link] [Customer Group]",
    "territory [Link] [Territory]",
    "address.address_line1 [Data]",
    "address.city [Data]",
    "address.state [Data]",
    "address.country [Data]",
    "address.pincode [Data]",
    "address.address_type [Select] [Billing, Shipping]",
    "address.is_primary_address [Check]",
    "tax_id [Data]",
    "gstin [Data]",
];

const CUSTOMER_GROUP_FIELDS: &[&str] = &[
    "customer_group_name [Data]",
    "parent_customer_group [Link] [Customer Group]",
    "is_group [Check]",
];

const ADDRESS_PREFIX: &str = "address.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateHandler {
    /// 无内置模板: 列规格由调用方选择的字段名直接生成
    Generic,
    Customer,
    CustomerGroup,
}

impl TemplateHandler {
    pub fn resolve(entity_type: &str) -> Self {
        match entity_type.trim() {
            "Customer" => TemplateHandler::Customer,
            "Customer Group" => TemplateHandler::CustomerGroup,
            _ => TemplateHandler::Generic,
        }
    }

    fn builtin_fields(&self) -> &'static [&'static str] {
        match self {
            TemplateHandler::Generic => &[],
            TemplateHandler::Customer => CUSTOMER_FIELDS,
            TemplateHandler::CustomerGroup => CUSTOMER_GROUP_FIELDS,
        }
    }

    /// 模板列规格
    ///
    /// selection 为空时返回全部字段；否则按 selection 的顺序返回已知字段
    pub fn fields(&self, selection: &[String]) -> Vec<ColumnSpec> {
        if *self == TemplateHandler::Generic {
            return selection
                .iter()
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .map(|name| ColumnSpec::new(name, None, None))
                .collect();
        }

        let all = column_parser::parse_headers(self.builtin_fields().iter().copied());
        if selection.is_empty() {
            return all;
        }

        selection
            .iter()
            .filter_map(|name| all.iter().find(|spec| spec.path == name.trim()).cloned())
            .collect()
    }

    /// 拆分记录
    pub fn split(&self, record: Record) -> (Record, Vec<SecondaryGroup>) {
        match self {
            TemplateHandler::Customer => split_customer(record),
            TemplateHandler::Generic | TemplateHandler::CustomerGroup => (record, Vec::new()),
        }
    }
}

// 客户记录中的 address.* 字段拆为独立地址，并回链到客户
fn split_customer(mut record: Record) -> (Record, Vec<SecondaryGroup>) {
    let address_keys: Vec<String> = record
        .scalars
        .keys()
        .filter(|k| k.starts_with(ADDRESS_PREFIX))
        .cloned()
        .collect();
    if address_keys.is_empty() {
        return (record, Vec::new());
    }

    let mut address = Record::new();
    for key in address_keys {
        if let Some(value) = record.scalars.remove(&key) {
            address
                .scalars
                .insert(key[ADDRESS_PREFIX.len()..].to_string(), value);
        }
    }

    // 无客户名的地址无法回链，丢弃
    let Some(customer_name) = record.scalar_str("customer_name").map(|s| s.to_string()) else {
        warn!(fields = address.scalars.len(), "地址缺少所属客户名，已忽略");
        return (record, Vec::new());
    };

    address
        .scalars
        .entry("address_title".to_string())
        .or_insert_with(|| Value::String(customer_name.clone()));

    let mut link: ChildRow = Map::new();
    link.insert("link_doctype".to_string(), json!("Customer"));
    link.insert("link_name".to_string(), json!(customer_name));
    address.child_tables.insert("links".to_string(), vec![link]);

    let group = SecondaryGroup {
        entity_type: "Address".to_string(),
        records: vec![address],
    };
    (record, vec![group])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldKind;

    #[test]
    fn test_resolve() {
        assert_eq!(TemplateHandler::resolve("Customer"), TemplateHandler::Customer);
        assert_eq!(
            TemplateHandler::resolve(" Customer Group "),
            TemplateHandler::CustomerGroup
        );
        assert_eq!(TemplateHandler::resolve("Item"), TemplateHandler::Generic);
    }

    #[test]
    fn test_customer_fields_follow_selection_order() {
        let selection = vec![
            "territory".to_string(),
            "customer_name".to_string(),
            "unknown".to_string(),
        ];
        let fields = TemplateHandler::Customer.fields(&selection);

        let paths: Vec<&str> = fields.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["territory", "customer_name"]);
        assert_eq!(fields[0].kind, Some(FieldKind::Link));
        assert_eq!(fields[0].options.as_deref(), Some("Territory"));
    }

    #[test]
    fn test_all_customer_fields_when_selection_empty() {
        let fields = TemplateHandler::Customer.fields(&[]);
        assert_eq!(fields.len(), CUSTOMER_FIELDS.len());
        assert_eq!(fields[1].to_header(), CUSTOMER_FIELDS[1]);
    }

    #[test]
    fn test_generic_fields_are_untyped() {
        let fields = TemplateHandler::Generic.fields(&["item_code".to_string(), " ".to_string()]);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].kind, None);
        assert_eq!(fields[0].to_header(), "item_code");
    }

    #[test]
    fn test_split_customer_moves_address() {
        let mut record = Record::new();
        record.scalars.insert("customer_name".to_string(), json!("Hybrowlabs"));
        record.scalars.insert("address.city".to_string(), json!("Pune"));
        record.scalars.insert("address.address_line1".to_string(), json!("MG Road"));

        let (primary, groups) = TemplateHandler::Customer.split(record);

        assert_eq!(primary.scalars.len(), 1);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].entity_type, "Address");
        let address = &groups[0].records[0];
        assert_eq!(address.scalars["city"], json!("Pune"));
        assert_eq!(address.scalars["address_title"], json!("Hybrowlabs"));
        assert_eq!(address.child_tables["links"][0]["link_name"], json!("Hybrowlabs"));
    }

    #[test]
    fn test_split_without_address_is_identity() {
        let mut record = Record::new();
        record.scalars.insert("customer_name".to_string(), json!("A"));

        let (primary, groups) = TemplateHandler::Customer.split(record.clone());
        assert_eq!(primary, record);
        assert!(groups.is_empty());

        let (primary, groups) = TemplateHandler::Generic.split(record.clone());
        assert_eq!(primary, record);
        assert!(groups.is_empty());
    }

    #[test]
    fn test_split_drops_address_without_customer_name() {
        let mut record = Record::new();
        record.scalars.insert("address.city".to_string(), json!("Pune"));

        let (primary, groups) = TemplateHandler::Customer.split(record);

        assert!(primary.is_empty());
        assert!(groups.is_empty());
    }
}
