//! 错误类型
//!
//! 内部细节只写日志; 返回给用户的是 `BotError::user_message` 的固定分类文本。

use thiserror::Error;

/// 文本解析错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: field `{field}` is not a number: {value:?}")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: amount overflows")]
    Overflow { line: usize },

    #[error("total amount overflows")]
    TotalOverflow,
}

/// PDF 渲染 / 写文件错误
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to load font {path}: {reason}")]
    Font { path: String, reason: String },

    #[error("pdf error: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid public url: {0}")]
    Url(String),
}

/// 消息发送错误
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing required configuration: {0}")]
    Missing(&'static str),
}

/// 单条消息处理流程的统一错误
#[derive(Debug, Error)]
pub enum BotError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

impl BotError {
    /// 面向用户的分类提示, 不暴露内部错误文本
    pub fn user_message(&self) -> &'static str {
        match self {
            BotError::Parse(_) => {
                "見積内容を読み取れませんでした。明細は「品名,数量,単位,単価」の形式で、数量と単価は数字で入力してください。"
            }
            BotError::Render(_) => "見積書PDFの作成に失敗しました。しばらくしてから再度お試しください。",
            BotError::Delivery(_) => "見積書の送信に失敗しました。しばらくしてから再度お試しください。",
        }
    }
}
