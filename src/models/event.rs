use serde::Deserialize;

/// Webhook 请求体
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

/// 单个事件; 只有 `message` 事件带有消息体
///
/// 渠道处于 standby 等模式时, message 事件不带 reply token。
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WebhookEvent {
    Message {
        #[serde(rename = "replyToken", default)]
        reply_token: Option<String>,
        #[serde(default)]
        source: Option<EventSource>,
        message: MessageKind,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventSource {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(rename = "userId", default)]
    pub user_id: Option<String>,
}

/// 消息类型, 按类型分发
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageKind {
    Text {
        text: String,
    },
    File {
        #[serde(rename = "fileName", default)]
        file_name: String,
    },
    Image,
    Sticker,
    #[serde(other)]
    Unsupported,
}

impl MessageKind {
    pub fn label(&self) -> &'static str {
        match self {
            MessageKind::Text { .. } => "text",
            MessageKind::File { .. } => "file",
            MessageKind::Image => "image",
            MessageKind::Sticker => "sticker",
            MessageKind::Unsupported => "unsupported",
        }
    }
}
