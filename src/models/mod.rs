pub mod event;
pub mod quotation;

pub use event::{EventSource, MessageKind, WebhookEvent, WebhookPayload};
pub use quotation::{Quotation, QuotationItem};
