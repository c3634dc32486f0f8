use serde::{Deserialize, Serialize};

/// 明细行 (品名, 数量, 单位, 单价, 金额)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationItem {
    pub name: String,
    pub qty: i64,
    pub unit: String,
    pub price: i64,
    pub amount: i64,
}

impl QuotationItem {
    /// 4 字段明细: 金额 = 数量 × 单价, 溢出时返回 None
    pub fn computed(name: String, qty: i64, unit: String, price: i64) -> Option<Self> {
        let amount = qty.checked_mul(price)?;
        Some(Self {
            name,
            qty,
            unit,
            price,
            amount,
        })
    }
}

/// 见积书 (报价单)
///
/// `total` 始终由明细金额汇总得出; 文本中给出的合计只保存在 `stated_total`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quotation {
    pub subject: Option<String>,
    pub expiry: Option<String>,
    pub items: Vec<QuotationItem>,
    pub stated_total: Option<i64>,
    pub total: i64,
}

impl Quotation {
    /// 汇总明细金额, 溢出时返回 None
    pub fn sum_items(items: &[QuotationItem]) -> Option<i64> {
        items
            .iter()
            .try_fold(0i64, |acc, item| acc.checked_add(item.amount))
    }

    pub fn subject_or_empty(&self) -> &str {
        self.subject.as_deref().unwrap_or("")
    }

    pub fn expiry_or_empty(&self) -> &str {
        self.expiry.as_deref().unwrap_or("")
    }
}
