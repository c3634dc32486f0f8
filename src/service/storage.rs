//! PDF 输出目录与下载链接

use crate::error::RenderError;
use chrono::Local;
use reqwest::Url;
use std::path::{Path, PathBuf};

/// 静态文件的 URL 路径 (与 HTTP 路由一致)
pub const PUBLIC_PATH: &str = "/static/pdfs";

const MAX_STEM_CHARS: usize = 48;
const FALLBACK_STEM: &str = "quotation";

/// 已分配的输出文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file_name: String,
    pub path: PathBuf,
}

/// 输出目录
#[derive(Debug, Clone)]
pub struct OutputStore {
    dir: PathBuf,
    public_base: Url,
}

impl OutputStore {
    pub fn new(dir: impl Into<PathBuf>, public_base_url: &str) -> Result<Self, RenderError> {
        let public_base = Url::parse(public_base_url)
            .map_err(|e| RenderError::Url(format!("{}: {}", public_base_url, e)))?;
        if public_base.cannot_be_a_base() {
            return Err(RenderError::Url(public_base_url.to_string()));
        }
        Ok(Self {
            dir: dir.into(),
            public_base,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 创建输出目录 (已存在时无操作)
    pub fn prepare(&self) -> Result<(), RenderError> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// 为一次请求分配唯一文件名: {件名}_{时间戳}_{随机}.pdf
    pub fn allocate(&self, subject: Option<&str>) -> StoredFile {
        let stem = sanitize_stem(subject.unwrap_or(""));
        let stamp = Local::now().format("%Y%m%d%H%M%S");
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let file_name = format!("{}_{}_{}.pdf", stem, stamp, &nonce[..8]);
        StoredFile {
            path: self.dir.join(&file_name),
            file_name,
        }
    }

    /// 下载链接, 文件名作为单个路径段编码
    pub fn public_url(&self, file_name: &str) -> Result<Url, RenderError> {
        let mut url = self.public_base.clone();
        url.path_segments_mut()
            .map_err(|_| RenderError::Url(self.public_base.to_string()))?
            .pop_if_empty()
            .extend(PUBLIC_PATH.trim_start_matches('/').split('/'))
            .push(file_name);
        Ok(url)
    }
}

/// 件名 → 安全的文件名主干
///
/// 只保留 Unicode 字母数字、`-`、`_`, 其余替换为 `_` 并合并。
pub fn sanitize_stem(subject: &str) -> String {
    let mut out = String::new();
    for c in subject.chars() {
        let c = if c.is_alphanumeric() || c == '-' { c } else { '_' };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }

    let trimmed: String = out
        .trim_matches('_')
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();
    let trimmed = trimmed.trim_end_matches('_');

    if trimmed.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        trimmed.to_string()
    }
}
