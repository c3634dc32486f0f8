//! 见积文本解析
//!
//! 逐行扫描: 带前缀的字段行 (件名 / 有効期限 / 合計金額 / 明細) 任何位置都识别,
//! 进入明细模式后, 其余非空行按逗号切分为明细记录。

use crate::error::ParseError;
use crate::models::{Quotation, QuotationItem};

const SUBJECT_KEYS: &[&str] = &["subject", "件名"];
const EXPIRY_KEYS: &[&str] = &["expiry", "有効期限"];
const TOTAL_KEYS: &[&str] = &["total amount", "合計金額"];
const ITEMS_KEYS: &[&str] = &["items", "明細", "項目明細"];

/// 识别出的字段前缀
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Subject,
    Expiry,
    Total,
    Items,
}

/// 是否为见积请求 (同时包含件名行和有效期限行)
pub fn is_quotation_request(text: &str) -> bool {
    let mut has_subject = false;
    let mut has_expiry = false;
    for line in text.lines() {
        match split_field(line) {
            Some((Field::Subject, _)) => has_subject = true,
            Some((Field::Expiry, _)) => has_expiry = true,
            _ => {}
        }
    }
    has_subject && has_expiry
}

/// 解析见积文本
///
/// 缺失的字段保持为空; 字段数不符的明细行直接丢弃。
/// 数字字段无法转换时整体失败, 不会留下半条明细。
pub fn parse_quotation(text: &str) -> Result<Quotation, ParseError> {
    let mut quotation = Quotation::default();
    let mut in_items = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((field, value)) = split_field(line) {
            match field {
                Field::Subject => quotation.subject = Some(value.to_string()),
                Field::Expiry => quotation.expiry = Some(value.to_string()),
                Field::Total => quotation.stated_total = parse_stated_total(value, line_no),
                Field::Items => in_items = true,
            }
            continue;
        }

        if !in_items {
            continue;
        }

        if let Some(item) = parse_item(&normalize_commas(line), line_no)? {
            quotation.items.push(item);
        }
    }

    quotation.total = Quotation::sum_items(&quotation.items).ok_or(ParseError::TotalOverflow)?;

    if let Some(stated) = quotation.stated_total {
        if stated != quotation.total {
            tracing::warn!(
                "stated total {} differs from item sum {}, using item sum",
                stated,
                quotation.total
            );
        }
    }

    Ok(quotation)
}

/// 解析单条明细: 4 字段计算金额, 5 字段金额照抄
fn parse_item(line: &str, line_no: usize) -> Result<Option<QuotationItem>, ParseError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    match fields.as_slice() {
        [name, qty, unit, price] => {
            let qty = parse_number(qty, line_no, "qty")?;
            let price = parse_number(price, line_no, "price")?;
            QuotationItem::computed(name.to_string(), qty, unit.to_string(), price)
                .map(Some)
                .ok_or(ParseError::Overflow { line: line_no })
        }
        [name, qty, unit, price, amount] => Ok(Some(QuotationItem {
            name: name.to_string(),
            qty: parse_number(qty, line_no, "qty")?,
            unit: unit.to_string(),
            price: parse_number(price, line_no, "price")?,
            amount: parse_number(amount, line_no, "amount")?,
        })),
        _ => {
            tracing::debug!(
                "line {}: dropping item record with {} fields",
                line_no,
                fields.len()
            );
            Ok(None)
        }
    }
}

/// 拆出 `key:value` / `key：value`, 只返回已识别的字段
fn split_field(line: &str) -> Option<(Field, &str)> {
    let line = line.trim();
    let (pos, colon) = line.char_indices().find(|&(_, c)| c == ':' || c == '：')?;
    let key = line[..pos].trim();
    let value = line[pos + colon.len_utf8()..].trim();

    let matches = |keys: &[&str]| keys.iter().any(|k| k.eq_ignore_ascii_case(key));
    let field = if matches(SUBJECT_KEYS) {
        Field::Subject
    } else if matches(EXPIRY_KEYS) {
        Field::Expiry
    } else if matches(TOTAL_KEYS) {
        Field::Total
    } else if matches(ITEMS_KEYS) {
        Field::Items
    } else {
        return None;
    };
    Some((field, value))
}

fn normalize_commas(line: &str) -> String {
    line.replace(['，', '、'], ",")
}

/// 文本中给出的合计只作参考: 去掉千分位和括号注释 (（税込） 等), 无法识别时忽略
fn parse_stated_total(raw: &str, line: usize) -> Option<i64> {
    let head = raw.split(['(', '（']).next().unwrap_or(raw);
    let cleaned: String = head.chars().filter(|c| !matches!(c, ',' | '，')).collect();

    match parse_number(&cleaned, line, "total") {
        Ok(total) => Some(total),
        Err(e) => {
            tracing::warn!("Ignoring stated total: {}", e);
            None
        }
    }
}

/// 整数字段, 允许 ¥ / ￥ 前缀和 円 后缀
fn parse_number(raw: &str, line: usize, field: &'static str) -> Result<i64, ParseError> {
    let s = raw.trim();
    let s = s
        .strip_prefix('¥')
        .or_else(|| s.strip_prefix('￥'))
        .unwrap_or(s);
    let s = s.strip_suffix('円').unwrap_or(s).trim();

    s.parse::<i64>().map_err(|_| ParseError::InvalidNumber {
        line,
        field,
        value: raw.trim().to_string(),
    })
}
