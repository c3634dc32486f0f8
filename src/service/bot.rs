//! 消息处理: 按消息类型分发, 见积文本 → PDF → 交付

use crate::config::DeliveryMode;
use crate::error::{BotError, DeliveryError};
use crate::messaging::Messenger;
use crate::models::{MessageKind, Quotation, WebhookEvent};
use crate::service::parser::{is_quotation_request, parse_quotation};
use crate::service::renderer::PdfRenderer;
use crate::service::storage::{OutputStore, StoredFile};
use reqwest::Url;
use std::sync::Arc;

/// 非见积消息的固定回复
pub const GUIDANCE: &str = "メッセージを受け取りました！（件名・有効期限の情報が必要です）\n\
例：\n件名:部品見積\n有効期限:2025-12-31\n明細:\n部品A,2,個,1000";

/// 生成完成的见积书
#[derive(Debug, Clone)]
pub struct GeneratedQuote {
    pub quotation: Quotation,
    pub file: StoredFile,
    pub url: Url,
}

/// 处理上下文: 启动时构建一次, 各请求共享
pub struct QuoteBot {
    messenger: Arc<dyn Messenger>,
    renderer: PdfRenderer,
    store: OutputStore,
    mode: DeliveryMode,
}

impl QuoteBot {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        renderer: PdfRenderer,
        store: OutputStore,
        mode: DeliveryMode,
    ) -> Self {
        Self {
            messenger,
            renderer,
            store,
            mode,
        }
    }

    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    /// 处理单个 webhook 事件; 非消息事件忽略
    pub async fn handle_event(&self, event: &WebhookEvent) -> Result<(), DeliveryError> {
        match event {
            WebhookEvent::Message {
                reply_token,
                source,
                message,
            } => {
                if let Some(source) = source {
                    tracing::debug!("Message event from {} source", source.source_type);
                }
                let user_id = source.as_ref().and_then(|s| s.user_id.as_deref());
                self.handle_message(reply_token.as_deref(), user_id, message)
                    .await
            }
            WebhookEvent::Other => {
                tracing::debug!("Ignoring non-message event");
                Ok(())
            }
        }
    }

    /// 每条用户消息至多回复一次; 没有可用的回复渠道时跳过
    pub async fn handle_message(
        &self,
        reply_token: Option<&str>,
        user_id: Option<&str>,
        message: &MessageKind,
    ) -> Result<(), DeliveryError> {
        let text = match message {
            MessageKind::Text { text } if is_quotation_request(text) => text,
            MessageKind::File { file_name } => {
                tracing::info!("Received file {:?}, sending guidance", file_name);
                return self.notify(reply_token, user_id, GUIDANCE).await;
            }
            other => {
                tracing::info!("Received {} message, sending guidance", other.label());
                return self.notify(reply_token, user_id, GUIDANCE).await;
            }
        };

        let Some(route) = self.delivery_route(reply_token, user_id) else {
            tracing::info!("Quotation request has no reply token or push target, skipping");
            return Ok(());
        };

        let generated = match self.generate(text) {
            Ok(g) => g,
            Err(e) => {
                tracing::error!("Failed to generate quotation: {}", e);
                return self.notify(reply_token, user_id, e.user_message()).await;
            }
        };

        tracing::info!(
            "Generated {} ({} items, total {})",
            generated.file.file_name,
            generated.quotation.items.len(),
            generated.quotation.total
        );

        if let Err(e) = self.send(route, &delivery_text(&generated)).await {
            tracing::error!("Failed to deliver {}: {}", generated.file.file_name, e);
            // reply token 只能使用一次: 仅在推送失败且 token 未用过时回复错误提示
            return match (route, reply_token) {
                (Route::Push(_), Some(token)) => {
                    let err = BotError::from(e);
                    self.messenger.reply(token, err.user_message()).await
                }
                _ => Err(e),
            };
        }
        Ok(())
    }

    /// 解析 + 渲染 + 生成下载链接 (同步, 写完文件才返回)
    pub fn generate(&self, text: &str) -> Result<GeneratedQuote, BotError> {
        let quotation = parse_quotation(text)?;
        self.store.prepare()?;
        let file = self.store.allocate(quotation.subject.as_deref());
        self.renderer.render(&quotation, &file.path)?;
        let url = self.store.public_url(&file.file_name)?;
        Ok(GeneratedQuote {
            quotation,
            file,
            url,
        })
    }

    /// 提示类消息: 优先用 reply token, 推送模式下可推送给用户
    fn notice_route<'a>(
        &self,
        reply_token: Option<&'a str>,
        user_id: Option<&'a str>,
    ) -> Option<Route<'a>> {
        match (reply_token, self.mode, user_id) {
            (Some(token), _, _) => Some(Route::Reply(token)),
            (None, DeliveryMode::Push, Some(to)) => Some(Route::Push(to)),
            _ => None,
        }
    }

    /// 见积书交付: 推送模式优先推送, 否则回复
    fn delivery_route<'a>(
        &self,
        reply_token: Option<&'a str>,
        user_id: Option<&'a str>,
    ) -> Option<Route<'a>> {
        match (self.mode, user_id, reply_token) {
            (DeliveryMode::Push, Some(to), _) => Some(Route::Push(to)),
            (DeliveryMode::Push, None, Some(token)) => {
                tracing::warn!("Push delivery requested but event has no user id, replying instead");
                Some(Route::Reply(token))
            }
            _ => self.notice_route(reply_token, user_id),
        }
    }

    async fn notify(
        &self,
        reply_token: Option<&str>,
        user_id: Option<&str>,
        text: &str,
    ) -> Result<(), DeliveryError> {
        match self.notice_route(reply_token, user_id) {
            Some(route) => self.send(route, text).await,
            None => {
                tracing::info!("No reply token or push target, dropping notice");
                Ok(())
            }
        }
    }

    async fn send(&self, route: Route<'_>, text: &str) -> Result<(), DeliveryError> {
        match route {
            Route::Reply(token) => self.messenger.reply(token, text).await,
            Route::Push(to) => self.messenger.push(to, text).await,
        }
    }
}

/// 回复渠道
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route<'a> {
    Reply(&'a str),
    Push(&'a str),
}

fn delivery_text(generated: &GeneratedQuote) -> String {
    format!(
        "見積書（{}）のPDFを作成しました！\nこちらからダウンロードできます：\n{}",
        generated.quotation.subject_or_empty(),
        generated.url
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::{RecordingMessenger, Sent};
    use crate::service::layout::Locale;
    use crate::service::renderer::FontChoice;

    const REQUEST: &str = "subject: Repair\nexpiry: 2025-12-31\nitems:\nBolt,10,pcs,30\nLabor,2,h,5000";

    fn bot(
        dir: &std::path::Path,
        messenger: Arc<RecordingMessenger>,
        mode: DeliveryMode,
    ) -> QuoteBot {
        QuoteBot::new(
            messenger,
            PdfRenderer::new(FontChoice::Builtin, Locale::En),
            OutputStore::new(dir.join("pdfs"), "https://bot.example.com").unwrap(),
            mode,
        )
    }

    fn text(s: &str) -> MessageKind {
        MessageKind::Text { text: s.into() }
    }

    #[tokio::test]
    async fn quotation_is_rendered_and_link_replied() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(RecordingMessenger::new());
        let bot = bot(dir.path(), messenger.clone(), DeliveryMode::Reply);

        bot.handle_message(Some("tok"), Some("U1"), &text(REQUEST)).await.unwrap();

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        let Sent::Reply { reply_token, text } = &sent[0] else {
            panic!("expected reply, got {:?}", sent[0]);
        };
        assert_eq!(reply_token, "tok");
        assert!(text.contains("見積書（Repair）"));
        assert!(text.contains("https://bot.example.com/static/pdfs/Repair_"));

        let files: Vec<_> = std::fs::read_dir(dir.path().join("pdfs")).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn push_mode_sends_to_user() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(RecordingMessenger::new());
        let bot = bot(dir.path(), messenger.clone(), DeliveryMode::Push);

        bot.handle_message(Some("tok"), Some("U1"), &text(REQUEST)).await.unwrap();
        assert!(matches!(&messenger.sent()[..], [Sent::Push { to, .. }] if to == "U1"));

        bot.handle_message(Some("tok2"), None, &text(REQUEST)).await.unwrap();
        assert!(matches!(&messenger.sent()[1], Sent::Reply { reply_token, .. } if reply_token == "tok2"));
    }

    #[tokio::test]
    async fn same_subject_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(RecordingMessenger::new());
        let bot = bot(dir.path(), messenger, DeliveryMode::Reply);

        let a = bot.generate(REQUEST).unwrap();
        let b = bot.generate(REQUEST).unwrap();
        assert_ne!(a.file.path, b.file.path);
        assert!(a.file.path.exists() && b.file.path.exists());
        assert_eq!(a.quotation.total, 10300);
    }

    #[tokio::test]
    async fn parse_failure_replies_with_category_message() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(RecordingMessenger::new());
        let bot = bot(dir.path(), messenger.clone(), DeliveryMode::Reply);

        bot.handle_message(
            Some("tok"),
            None,
            &text("件名:テスト\n有効期限:2025-01-01\n明細:\n部品A,2,個,abc"),
        )
        .await
        .unwrap();

        let sent = messenger.sent();
        let Sent::Reply { text, .. } = &sent[0] else {
            panic!("expected reply");
        };
        assert_eq!(text, BotError::Parse(crate::error::ParseError::TotalOverflow).user_message());
        assert!(!text.contains("abc"));
        assert!(!dir.path().join("pdfs").exists());
    }

    #[tokio::test]
    async fn other_messages_get_guidance() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(RecordingMessenger::new());
        let bot = bot(dir.path(), messenger.clone(), DeliveryMode::Reply);

        bot.handle_message(Some("t1"), None, &text("こんにちは")).await.unwrap();
        bot.handle_message(Some("t2"), None, &MessageKind::Sticker).await.unwrap();
        bot.handle_message(
            Some("t3"),
            None,
            &MessageKind::File {
                file_name: "a.pdf".into(),
            },
        )
        .await
        .unwrap();
        bot.handle_event(&WebhookEvent::Other).await.unwrap();

        let sent = messenger.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent
            .iter()
            .all(|s| matches!(s, Sent::Reply { text, .. } if text == GUIDANCE)));
    }

    #[tokio::test]
    async fn failed_reply_is_not_retried_on_the_same_token() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(RecordingMessenger::failing());
        let bot = bot(dir.path(), messenger.clone(), DeliveryMode::Reply);

        assert!(bot.handle_message(Some("tok"), None, &text(REQUEST)).await.is_err());
        assert_eq!(messenger.sent().len(), 1);
    }

    #[tokio::test]
    async fn failed_push_falls_back_to_category_reply() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(RecordingMessenger::failing_push());
        let bot = bot(dir.path(), messenger.clone(), DeliveryMode::Push);

        bot.handle_message(Some("tok"), Some("U1"), &text(REQUEST))
            .await
            .unwrap();

        let expected = BotError::Delivery(DeliveryError::Request {
            endpoint: String::new(),
            reason: String::new(),
        })
        .user_message();
        let sent = messenger.sent();
        assert_eq!(sent.len(), 2);
        assert!(matches!(&sent[0], Sent::Push { to, .. } if to == "U1"));
        assert!(matches!(&sent[1], Sent::Reply { reply_token, text }
            if reply_token == "tok" && text == expected));
    }

    #[tokio::test]
    async fn events_without_reply_token_are_skipped_in_reply_mode() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(RecordingMessenger::new());
        let bot = bot(dir.path(), messenger.clone(), DeliveryMode::Reply);

        bot.handle_message(None, Some("U1"), &text(REQUEST)).await.unwrap();
        bot.handle_message(None, Some("U1"), &MessageKind::Sticker).await.unwrap();

        assert!(messenger.sent().is_empty());
        assert!(!dir.path().join("pdfs").exists());
    }

    #[tokio::test]
    async fn events_without_reply_token_are_pushed_in_push_mode() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(RecordingMessenger::new());
        let bot = bot(dir.path(), messenger.clone(), DeliveryMode::Push);

        bot.handle_message(None, Some("U1"), &text(REQUEST)).await.unwrap();
        bot.handle_message(None, None, &text(REQUEST)).await.unwrap();

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0], Sent::Push { to, .. } if to == "U1"));
    }
}
