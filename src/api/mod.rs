pub mod handlers;
pub mod signature;

pub use handlers::*;

use crate::service::storage::PUBLIC_PATH;
use crate::service::QuoteBot;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<QuoteBot>,
    pub channel_secret: Arc<str>,
}

/// 路由: webhook, 健康检查, 生成的 PDF 静态目录
pub fn router(state: AppState) -> Router {
    let pdf_dir = ServeDir::new(state.bot.store().dir());

    Router::new()
        .route("/health", get(health_check))
        .route("/webhook", post(webhook))
        .nest_service(PUBLIC_PATH, pdf_dir)
        .with_state(state)
        .layer(ServiceBuilder::new())
}
