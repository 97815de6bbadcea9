//! Outbound chat messages.
//!
//! [`DiscordMessenger`] posts through the Discord REST API: channel
//! messages with the bot token, interaction replies through the
//! interaction's follow-up webhook. [`LogMessenger`] only logs, for running
//! without a token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use quill_sprint::ports::Messenger;
use quill_sprint::{MessagingError, Target};

/// Default Discord REST API base.
pub const DISCORD_API: &str = "https://discord.com/api/v10";

#[derive(Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
    allowed_mentions: AllowedMentions,
}

/// Only user mentions ping; role and everyone mentions stay inert.
#[derive(Serialize)]
struct AllowedMentions {
    parse: [&'static str; 1],
}

/// Sends messages through the Discord REST API.
pub struct DiscordMessenger {
    http: Client,
    api_base: String,
    token: String,
}

impl DiscordMessenger {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Result<Self, MessagingError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MessagingError::Delivery(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }
}

#[async_trait]
impl Messenger for DiscordMessenger {
    async fn send(&self, target: &Target, text: &str) -> Result<(), MessagingError> {
        let request = match target {
            Target::Channel(channel) => self
                .http
                .post(format!("{}/channels/{}/messages", self.api_base, channel))
                .header("Authorization", format!("Bot {}", self.token)),
            // Webhook follow-ups authenticate with the interaction token in the path
            Target::Interaction(interaction) => self.http.post(format!(
                "{}/webhooks/{}/{}",
                self.api_base, interaction.application_id, interaction.token
            )),
        };

        let response = request
            .json(&CreateMessage {
                content: text,
                allowed_mentions: AllowedMentions { parse: ["users"] },
            })
            .send()
            .await
            .map_err(|e| MessagingError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("failed to read response: {}", e));
            return Err(MessagingError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(destination = %describe(target), "message sent");
        Ok(())
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
    async fn send(&self, target: &Target, text: &str) -> Result<(), MessagingError> {
        info!(destination = %describe(target), "{}", text);
        Ok(())
    }
}

/// Loggable name for a target. Never includes the interaction token.
fn describe(target: &Target) -> String {
    match target {
        Target::Channel(channel) => format!("channel:{}", channel),
        Target::Interaction(interaction) => format!("interaction:{}", interaction.application_id),
    }
}
