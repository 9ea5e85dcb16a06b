//! Telegram Bot API delivery.
//!
//! Telegram caps messages at 4096 characters, so oversized reports are split
//! into chunks on line boundaries. Delivery counts as successful when at
//! least one chat received every chunk.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::{DeliveryError, ReportSender};

const MAX_RETRIES: u32 = 3;
const TG_MAX_LEN: usize = 4096;

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    description: Option<String>,
}

pub struct TelegramSender {
    client: Client,
    bot_token: String,
    chat_ids: Vec<String>,
}

impl TelegramSender {
    pub fn new(bot_token: String, chat_ids: Vec<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            bot_token,
            chat_ids,
        }
    }

    async fn post_message(&self, chat_id: &str, text: &str) -> bool {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = json!({
            "chat_id": chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });

        for attempt in 1..=MAX_RETRIES {
            match self.client.post(&url).json(&payload).send().await {
                Ok(response) => match response.json::<TelegramResponse>().await {
                    Ok(body) if body.ok => {
                        info!("Telegram message sent to {} (attempt {})", chat_id, attempt);
                        return true;
                    }
                    Ok(body) => {
                        warn!(
                            "Telegram API error for chat {}: {} (attempt {}/{})",
                            chat_id,
                            body.description.unwrap_or_default(),
                            attempt,
                            MAX_RETRIES
                        );
                    }
                    Err(e) => {
                        warn!(
                            "Telegram response parse failed for chat {} (attempt {}/{}): {}",
                            chat_id, attempt, MAX_RETRIES, e
                        );
                    }
                },
                Err(e) => {
                    warn!(
                        "Telegram send failed for chat {} (attempt {}/{}): {}",
                        chat_id, attempt, MAX_RETRIES, e
                    );
                }
            }
        }

        warn!(
            "Telegram send to {} failed after {} attempts",
            chat_id, MAX_RETRIES
        );
        false
    }
}

#[async_trait]
impl ReportSender for TelegramSender {
    fn channel(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, message: &str) -> Result<(), DeliveryError> {
        let chunks = chunk_message(message, TG_MAX_LEN);
        let mut any_ok = false;

        for chat_id in &self.chat_ids {
            let mut chat_ok = true;
            for chunk in &chunks {
                if !self.post_message(chat_id, chunk).await {
                    chat_ok = false;
                }
            }
            if chat_ok {
                any_ok = true;
            }
        }

        if any_ok {
            Ok(())
        } else {
            Err(DeliveryError::ChannelFailed {
                channel: "telegram".to_string(),
                message: "no chat accepted the message".to_string(),
            })
        }
    }
}

/// Split on line boundaries into chunks of at most `max_len` characters.
fn chunk_message(text: &str, max_len: usize) -> Vec<String> {
    if text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        if rest.chars().count() <= max_len {
            chunks.push(rest.to_string());
            break;
        }

        let window_end = rest
            .char_indices()
            .nth(max_len)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let cut = match rest[..window_end].rfind('\n') {
            Some(pos) if pos > 0 => pos,
            _ => window_end,
        };

        chunks.push(rest[..cut].to_string());
        rest = rest[cut..].trim_start_matches('\n');
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_is_a_single_chunk() {
        let chunks = chunk_message("hello\nworld", 100);
        assert_eq!(chunks, vec!["hello\nworld"]);
    }

    #[test]
    fn long_message_splits_on_newlines() {
        let text = "aaaa\nbbbb\ncccc";
        let chunks = chunk_message(text, 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn unbreakable_line_is_cut_hard() {
        let text = "a".repeat(25);
        let chunks = chunk_message(&text, 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn chunks_never_start_with_newline() {
        let text = format!("{}\n\n{}", "a".repeat(8), "b".repeat(8));
        for chunk in chunk_message(&text, 10) {
            assert!(!chunk.starts_with('\n'));
        }
    }

    #[test]
    fn telegram_response_parsing() {
        let ok: TelegramResponse = serde_json::from_str(r#"{"ok": true, "result": {}}"#).unwrap();
        assert!(ok.ok);

        let err: TelegramResponse =
            serde_json::from_str(r#"{"ok": false, "description": "Bad Request"}"#).unwrap();
        assert!(!err.ok);
        assert_eq!(err.description.as_deref(), Some("Bad Request"));
    }
}
