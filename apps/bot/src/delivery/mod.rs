//! Report delivery channels.

pub mod signal;
pub mod telegram;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Config;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("{channel} delivery failed: {message}")]
    ChannelFailed { channel: String, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// An outbound messaging channel for the rendered report.
#[async_trait]
pub trait ReportSender: Send + Sync {
    fn channel(&self) -> &'static str;

    async fn send(&self, message: &str) -> Result<(), DeliveryError>;
}

/// Instantiate every channel the config has credentials for. An empty
/// result means the caller should fall back to stdout.
pub fn build_senders(config: &Config) -> Vec<Box<dyn ReportSender>> {
    let mut senders: Vec<Box<dyn ReportSender>> = Vec::new();

    if !config.telegram.bot_token.is_empty() && !config.telegram.chat_ids.is_empty() {
        senders.push(Box::new(telegram::TelegramSender::new(
            config.telegram.bot_token.clone(),
            config.telegram.chat_ids.clone(),
        )));
    }

    if !config.signal.sender.is_empty() && !config.signal.recipients.is_empty() {
        senders.push(Box::new(signal::SignalSender::new(
            config.signal.api_base.clone(),
            config.signal.sender.clone(),
            config.signal.recipients.clone(),
        )));
    }

    senders
}
