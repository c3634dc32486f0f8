pub mod api;
pub mod config;
pub mod error;
pub mod messaging;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use error::{BotError, DeliveryError, ParseError, RenderError};
pub use service::{parse_quotation, PdfRenderer, QuoteBot};
