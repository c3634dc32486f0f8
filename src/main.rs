use quote_pdf_bot::api::{self, AppState};
use quote_pdf_bot::messaging::LineClient;
use quote_pdf_bot::service::renderer::font_from_config;
use quote_pdf_bot::service::{OutputStore, PdfRenderer, QuoteBot};
use quote_pdf_bot::AppConfig;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 日志 - 本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config);

    // 字体 / 输出目录
    let font = font_from_config(&config.render.font_name, config.render.font_path.as_ref())?;
    let renderer = PdfRenderer::new(font, config.render.locale);
    let store = OutputStore::new(&config.output.dir, &config.output.public_base_url)?;
    store.prepare()?;
    info!("Writing PDFs to {}", store.dir().display());

    let messenger = Arc::new(LineClient::new(
        config.line.api_base.clone(),
        config.line.channel_access_token.clone(),
    ));
    let bot = QuoteBot::new(messenger, renderer, store, config.delivery.mode);

    let app = api::router(AppState {
        bot: Arc::new(bot),
        channel_secret: Arc::from(config.line.channel_secret.as_str()),
    });

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /webhook          - messaging webhook ({:?} delivery)", config.delivery.mode);
    info!("  GET  /static/pdfs/...  - generated quotations");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
