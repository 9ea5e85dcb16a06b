//! Signal delivery through a signal-cli-rest-api instance.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use super::{DeliveryError, ReportSender};

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Serialize)]
struct SendPayload<'a> {
    message: &'a str,
    number: &'a str,
    recipients: &'a [String],
}

pub struct SignalSender {
    client: Client,
    api_base: String,
    sender: String,
    recipients: Vec<String>,
}

impl SignalSender {
    pub fn new(api_base: String, sender: String, recipients: Vec<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            sender,
            recipients,
        }
    }
}

#[async_trait]
impl ReportSender for SignalSender {
    fn channel(&self) -> &'static str {
        "signal"
    }

    async fn send(&self, message: &str) -> Result<(), DeliveryError> {
        let url = format!("{}/v2/send", self.api_base);
        let payload = SendPayload {
            message,
            number: &self.sender,
            recipients: &self.recipients,
        };

        for attempt in 1..=MAX_RETRIES {
            match self.client.post(&url).json(&payload).send().await {
                Ok(response) if response.status().as_u16() < 300 => {
                    info!("Signal message sent successfully (attempt {})", attempt);
                    return Ok(());
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    warn!(
                        "Signal API returned {}: {} (attempt {}/{})",
                        status,
                        body.chars().take(200).collect::<String>(),
                        attempt,
                        MAX_RETRIES
                    );
                }
                Err(e) => {
                    warn!(
                        "Signal send failed (attempt {}/{}): {}",
                        attempt, MAX_RETRIES, e
                    );
                }
            }
        }

        Err(DeliveryError::ChannelFailed {
            channel: "signal".to_string(),
            message: format!("gave up after {} attempts", MAX_RETRIES),
        })
    }
}
