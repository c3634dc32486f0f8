//! 见积书版面
//!
//! 纯计算: Quotation → 每页的文字 / 矩形元素 (单位 pt, 原点在左下)。
//! PDF 绘制见 `renderer`。

use crate::models::Quotation;
use chrono::NaiveDate;
use serde::Deserialize;

pub const PAGE_WIDTH: f64 = 595.0;
pub const PAGE_HEIGHT: f64 = 842.0;
pub const MARGIN: f64 = 50.0;

const TITLE_SIZE: f64 = 14.0;
const BODY_SIZE: f64 = 10.0;
const ROW_HEIGHT: f64 = 20.0;
const CELL_PAD_X: f64 = 4.0;
const CELL_PAD_Y: f64 = 6.0;
const ELLIPSIS: &str = "...";

/// 表格列宽: 品名 / 数量 / 单位 / 单价 / 金额, 合计 = 页宽 - 两侧边距
pub const COLUMN_WIDTHS: [f64; 5] = [215.0, 60.0, 60.0, 80.0, 80.0];

/// 版面元素
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        x: f64,
        y: f64,
        size: f64,
        bold: bool,
        text: String,
    },
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayout {
    pub title: String,
    pub pages: Vec<PageLayout>,
}

impl DocumentLayout {
    /// 所有页面上的文字, 按绘制顺序
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flat_map(|p| {
            p.elements.iter().filter_map(|e| match e {
                Element::Text { text, .. } => Some(text.as_str()),
                Element::Rect { .. } => None,
            })
        })
    }

    /// 是否含有 WinAnsi (Latin-1) 以外的字符, 内置字体无法显示
    pub fn needs_unicode_font(&self) -> bool {
        self.texts().any(|t| t.chars().any(|c| c as u32 > 0xFF))
    }
}

/// 文档语言
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ja,
    En,
}

/// 版面上的固定文字
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub title: &'static str,
    pub expiry: &'static str,
    pub issued: &'static str,
    pub stated_total: &'static str,
    pub section: &'static str,
    pub columns: [&'static str; 5],
    pub total: &'static str,
}

impl Labels {
    pub fn japanese() -> Self {
        Self {
            title: "見積書：",
            expiry: "有効期限：",
            issued: "発行日：",
            stated_total: "記載合計：",
            section: "項目明細：",
            columns: ["品名", "数量", "単位", "単価", "金額"],
            total: "合計金額：",
        }
    }

    pub fn english() -> Self {
        Self {
            title: "Quotation: ",
            expiry: "Valid until: ",
            issued: "Issued: ",
            stated_total: "Stated total: ",
            section: "Items:",
            columns: ["Description", "Qty", "Unit", "Price", "Amount"],
            total: "Total: ",
        }
    }

    pub fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::Ja => Self::japanese(),
            Locale::En => Self::english(),
        }
    }
}

/// 金额格式: ¥ + 千分位
pub fn format_yen(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-¥{}", grouped)
    } else {
        format!("¥{}", grouped)
    }
}

/// 估算文字宽度: Latin-1 按 0.6em, 其余 (日文等) 按全角 1em
pub fn estimate_width(text: &str, size: f64) -> f64 {
    text.chars().map(|c| char_width(c, size)).sum()
}

fn char_width(c: char, size: f64) -> f64 {
    let em = if (c as u32) <= 0xFF { 0.6 } else { 1.0 };
    em * size
}

/// 超出宽度时截断并加省略号
pub fn fit_to_width(text: String, max_width: f64, size: f64) -> String {
    if estimate_width(&text, size) <= max_width {
        return text;
    }
    let budget = max_width - estimate_width(ELLIPSIS, size);
    let mut out = String::new();
    let mut used = 0.0;
    for c in text.chars() {
        let w = char_width(c, size);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str(ELLIPSIS);
    out
}

/// 逐页排版的游标
struct Cursor {
    pages: Vec<PageLayout>,
    current: PageLayout,
    y: f64,
}

impl Cursor {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: PageLayout::default(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn text(&mut self, x: f64, size: f64, bold: bool, text: String) {
        self.current.elements.push(Element::Text {
            x,
            y: self.y,
            size,
            bold,
            text,
        });
    }

    fn fits(&self, height: f64) -> bool {
        self.y - height >= MARGIN
    }

    fn new_page(&mut self) {
        let done = std::mem::take(&mut self.current);
        self.pages.push(done);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// 一行表格: 每个单元格一个边框 + 文字
    fn row(&mut self, cells: [String; 5], bold: bool) {
        let top = self.y;
        let bottom = top - ROW_HEIGHT;
        let mut x = MARGIN;
        for (cell, width) in cells.into_iter().zip(COLUMN_WIDTHS) {
            self.current.elements.push(Element::Rect {
                x,
                y: bottom,
                width,
                height: ROW_HEIGHT,
            });
            self.current.elements.push(Element::Text {
                x: x + CELL_PAD_X,
                y: bottom + CELL_PAD_Y,
                size: BODY_SIZE,
                bold,
                text: fit_to_width(cell, width - 2.0 * CELL_PAD_X, BODY_SIZE),
            });
            x += width;
        }
        self.y = bottom;
    }

    fn finish(mut self) -> Vec<PageLayout> {
        self.pages.push(self.current);
        self.pages
    }
}

/// 排版见积书; 明细超出一页时换页并重复表头
pub fn layout_quotation(quotation: &Quotation, labels: &Labels, issued: NaiveDate) -> DocumentLayout {
    let title = format!("{}{}", labels.title, quotation.subject_or_empty());
    let header = labels.columns.map(str::to_string);

    let mut cur = Cursor::new();
    cur.text(MARGIN, TITLE_SIZE, true, title.clone());
    cur.y -= 20.0;
    cur.text(
        MARGIN,
        BODY_SIZE,
        false,
        format!("{}{}", labels.expiry, quotation.expiry_or_empty()),
    );
    cur.y -= 16.0;
    cur.text(
        MARGIN,
        BODY_SIZE,
        false,
        format!("{}{}", labels.issued, issued.format("%Y-%m-%d")),
    );
    if let Some(stated) = quotation.stated_total {
        cur.y -= 16.0;
        cur.text(
            MARGIN,
            BODY_SIZE,
            false,
            format!("{}{}", labels.stated_total, format_yen(stated)),
        );
    }
    cur.y -= 30.0;
    cur.text(MARGIN, BODY_SIZE, true, labels.section.to_string());
    cur.y -= 10.0;

    cur.row(header.clone(), true);
    for item in &quotation.items {
        if !cur.fits(ROW_HEIGHT) {
            cur.new_page();
            cur.row(header.clone(), true);
        }
        cur.row(
            [
                item.name.clone(),
                item.qty.to_string(),
                item.unit.clone(),
                format_yen(item.price),
                format_yen(item.amount),
            ],
            false,
        );
    }

    if !cur.fits(30.0) {
        cur.new_page();
    }
    cur.y -= 24.0;
    cur.text(
        MARGIN,
        12.0,
        true,
        format!("{}{}", labels.total, format_yen(quotation.total)),
    );

    DocumentLayout {
        title,
        pages: cur.finish(),
    }
}
