// ==========================================
// 表格批量导入系统 - 列头解析
// ==========================================
// 文法: <name> ["[" <kind> "]"] ["[" <options> "]"]
// - Link: 第三个 '[' 片段为目标实体类型
// - 其他类型: 第一个 ']' 之后的剩余部分作为 options
// 永不报错: 无法解析时退化为无类型透传字段
// ==========================================

use crate::domain::{ColumnSpec, FieldKind};
use tracing::warn;

/// 解析单个列头
pub fn parse(header: &str) -> ColumnSpec {
    let parts: Vec<&str> = header.split('[').collect();
    let name = parts[0].trim().to_string();

    if parts.len() < 2 {
        return ColumnSpec {
            header: header.to_string(),
            path: name,
            kind: None,
            options: None,
        };
    }

    // 类型只取第二个片段中第一个 ']' 之前的部分，其后为未加括号的 options
    let kind = FieldKind::parse(parts[1].split(']').next().unwrap_or_default().trim());
    let options = match kind {
        Some(FieldKind::Link) => parts.get(2).and_then(|p| non_empty(p.trim().trim_end_matches(']'))),
        Some(_) => trailing_options(header),
        None => None,
    };

    ColumnSpec {
        header: header.to_string(),
        path: name,
        kind,
        options,
    }
}

/// 解析整组列头，跳过字段名为空的列
pub fn parse_headers<'a, I>(headers: I) -> Vec<ColumnSpec>
where
    I: IntoIterator<Item = &'a str>,
{
    headers
        .into_iter()
        .filter_map(|header| {
            let spec = parse(header);
            if spec.path.is_empty() {
                warn!(header = %header, "列头字段名为空，已忽略");
                None
            } else {
                Some(spec)
            }
        })
        .collect()
}

// 第一个 ']' 之后的内容（可带或不带方括号）
fn trailing_options(header: &str) -> Option<String> {
    let close = header.find(']')?;
    let rest = header[close + 1..].trim();
    let rest = rest.strip_prefix('[').unwrap_or(rest);
    non_empty(rest.trim_end_matches(']'))
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
