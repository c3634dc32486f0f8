//! 见积书 PDF 绘制 (oxidize-pdf)

use crate::error::RenderError;
use crate::models::Quotation;
use crate::service::layout::{layout_quotation, DocumentLayout, Element, Labels, Locale};
use chrono::Local;
use oxidize_pdf::{Color, Document, Font, Page};
use std::path::{Path, PathBuf};

const BORDER_WIDTH: f64 = 0.5;

/// 字体选择
///
/// - `Builtin`: 内置 Helvetica, 只覆盖 WinAnsi (Latin-1)
/// - `Embedded`: 嵌入 TrueType/OpenType 字体, 覆盖范围取决于字体本身 (IPAexGothic 覆盖日文)
#[derive(Debug, Clone)]
pub enum FontChoice {
    Builtin,
    Embedded { name: String, data: Vec<u8> },
}

impl FontChoice {
    /// 从字体文件加载, 启动时调用一次
    pub fn load(name: &str, path: &Path) -> Result<Self, RenderError> {
        let data = std::fs::read(path).map_err(|e| RenderError::Font {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        tracing::info!("Loaded font {} from {} ({} bytes)", name, path.display(), data.len());
        Ok(FontChoice::Embedded {
            name: name.to_string(),
            data,
        })
    }
}

/// PDF 渲染器
pub struct PdfRenderer {
    font: FontChoice,
    labels: Labels,
}

impl PdfRenderer {
    pub fn new(font: FontChoice, locale: Locale) -> Self {
        Self {
            font,
            labels: Labels::for_locale(locale),
        }
    }

    /// 排版并写出 PDF, 返回所用版面
    pub fn render(&self, quotation: &Quotation, path: &Path) -> Result<DocumentLayout, RenderError> {
        let layout = layout_quotation(quotation, &self.labels, Local::now().date_naive());
        self.write(&layout, path)?;
        Ok(layout)
    }

    /// 绘制已排好的版面
    pub fn write(&self, layout: &DocumentLayout, path: &Path) -> Result<(), RenderError> {
        let mut doc = Document::new();
        doc.set_title(layout.title.as_str());

        match &self.font {
            FontChoice::Builtin => {
                if layout.needs_unicode_font() {
                    tracing::warn!(
                        "Document {:?} contains characters outside Latin-1; builtin font cannot render them, configure render.font_path",
                        layout.title
                    );
                }
            }
            FontChoice::Embedded { name, data } => {
                doc.add_font_from_bytes(name.as_str(), data.clone())
                    .map_err(|e| RenderError::Font {
                        path: name.clone(),
                        reason: e.to_string(),
                    })?;
            }
        }

        for page_layout in &layout.pages {
            let mut page = Page::a4();
            for element in &page_layout.elements {
                match element {
                    Element::Text {
                        x,
                        y,
                        size,
                        bold,
                        text,
                    } => {
                        page.text()
                            .set_font(self.pdf_font(*bold), *size)
                            .at(*x, *y)
                            .write(text)
                            .map_err(pdf_error)?;
                    }
                    Element::Rect {
                        x,
                        y,
                        width,
                        height,
                    } => {
                        page.graphics()
                            .set_stroke_color(Color::black())
                            .set_line_width(BORDER_WIDTH)
                            .rect(*x, *y, *width, *height)
                            .stroke();
                    }
                }
            }
            doc.add_page(page);
        }

        doc.save(path).map_err(pdf_error)?;
        tracing::debug!("Wrote {} page(s) to {}", layout.pages.len(), path.display());
        Ok(())
    }

    fn pdf_font(&self, bold: bool) -> Font {
        match &self.font {
            FontChoice::Builtin if bold => Font::HelveticaBold,
            FontChoice::Builtin => Font::Helvetica,
            FontChoice::Embedded { name, .. } => Font::Custom(name.clone()),
        }
    }
}

fn pdf_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::Pdf(e.to_string())
}

/// 字体配置 → FontChoice; 未配置字体文件时退回内置字体
pub fn font_from_config(name: &str, path: Option<&PathBuf>) -> Result<FontChoice, RenderError> {
    match path {
        Some(path) => FontChoice::load(name, path),
        None => {
            tracing::warn!("No font configured, falling back to builtin Helvetica (Latin-1 only)");
            Ok(FontChoice::Builtin)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuotationItem;

    fn latin_quotation() -> Quotation {
        let items = vec![
            QuotationItem {
                name: "Bolt".into(),
                qty: 10,
                unit: "pcs".into(),
                price: 30,
                amount: 300,
            },
            QuotationItem {
                name: "Labor".into(),
                qty: 2,
                unit: "h".into(),
                price: 5000,
                amount: 10000,
            },
        ];
        Quotation {
            subject: Some("Repair".into()),
            expiry: Some("2025-12-31".into()),
            total: 10300,
            items,
            stated_total: None,
        }
    }

    #[test]
    fn writes_pdf_with_builtin_font() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repair.pdf");
        let renderer = PdfRenderer::new(FontChoice::Builtin, Locale::En);

        let layout = renderer.render(&latin_quotation(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(layout.texts().any(|t| t == "Total: ¥10,300"));
    }

    #[test]
    fn missing_font_file_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FontChoice::load("IPAexGothic", &dir.path().join("nope.ttf")).unwrap_err();
        assert!(matches!(err, RenderError::Font { .. }));
    }

    #[test]
    fn unconfigured_font_falls_back_to_builtin() {
        let choice = font_from_config("IPAexGothic", None).unwrap();
        assert!(matches!(choice, FontChoice::Builtin));
    }

    #[test]
    fn unwritable_target_is_a_render_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.pdf");
        let renderer = PdfRenderer::new(FontChoice::Builtin, Locale::En);
        assert!(renderer.render(&latin_quotation(), &path).is_err());
    }
}
