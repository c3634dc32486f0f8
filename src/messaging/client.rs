use crate::error::DeliveryError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Mutex;

/// 消息平台发送接口
#[async_trait]
pub trait Messenger: Send + Sync {
    /// 用 reply token 回复
    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), DeliveryError>;

    /// 主动推送给用户
    async fn push(&self, to: &str, text: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<TextMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: Vec<TextMessage<'a>>,
}

/// LINE Messaging API 客户端
pub struct LineClient {
    http: Client,
    api_base: String,
    access_token: String,
}

impl LineClient {
    pub fn new(api_base: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<(), DeliveryError> {
        let endpoint = format!("{}{}", self.api_base, path);
        let res = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Request {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for LineClient {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), DeliveryError> {
        let body = ReplyRequest {
            reply_token,
            messages: vec![TextMessage { kind: "text", text }],
        };
        self.post("/v2/bot/message/reply", &body).await
    }

    async fn push(&self, to: &str, text: &str) -> Result<(), DeliveryError> {
        let body = PushRequest {
            to,
            messages: vec![TextMessage { kind: "text", text }],
        };
        self.post("/v2/bot/message/push", &body).await
    }
}

/// 已发送的消息 (测试用记录)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Reply { reply_token: String, text: String },
    Push { to: String, text: String },
}

/// 只记录不发送的 Messenger; 失败的发送也会记录
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<Sent>>,
    fail_reply: bool,
    fail_push: bool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每次发送都返回错误
    pub fn failing() -> Self {
        Self {
            fail_reply: true,
            fail_push: true,
            ..Self::default()
        }
    }

    /// 只有推送返回错误
    pub fn failing_push() -> Self {
        Self {
            fail_push: true,
            ..Self::default()
        }
    }

    /// 所有发送尝试, 按顺序
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn record(&self, msg: Sent) -> Result<(), DeliveryError> {
        let fail = match msg {
            Sent::Reply { .. } => self.fail_reply,
            Sent::Push { .. } => self.fail_push,
        };
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(msg);
        }
        if fail {
            return Err(DeliveryError::Status {
                endpoint: "recording".into(),
                status: 500,
                body: "forced failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<(), DeliveryError> {
        self.record(Sent::Reply {
            reply_token: reply_token.to_string(),
            text: text.to_string(),
        })
    }

    async fn push(&self, to: &str, text: &str) -> Result<(), DeliveryError> {
        self.record(Sent::Push {
            to: to.to_string(),
            text: text.to_string(),
        })
    }
}
