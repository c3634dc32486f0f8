pub mod client;

pub use client::{LineClient, Messenger, RecordingMessenger, Sent};
