pub mod bot;
pub mod layout;
pub mod parser;
pub mod renderer;
pub mod storage;

pub use bot::QuoteBot;
pub use parser::{is_quotation_request, parse_quotation};
pub use renderer::{FontChoice, PdfRenderer};
pub use storage::OutputStore;
