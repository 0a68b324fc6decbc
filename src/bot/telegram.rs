use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error, info};

use crate::bot::command::{respond, BotCommand};
use crate::config::{BOT_ERROR_PAUSE_SECS, BOT_POLL_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::pipeline::Pipeline;

/// getUpdates response.
#[derive(Debug, Deserialize)]
struct Updates {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

/// sendMessage response; only the status matters.
#[derive(Debug, Deserialize)]
struct Sent {
    ok: bool,
    description: Option<String>,
}

/// Long-polling Telegram bot answering from the report pipeline.
pub struct TelegramBot {
    api_base: String,
    client: reqwest::Client,
    pipeline: Arc<Pipeline>,
    /// Highest update_id handled so far.
    last_update_id: i64,
}

impl TelegramBot {
    pub fn new(api_url: &str, token: &str, pipeline: Arc<Pipeline>) -> Result<Self> {
        // long poll must outlive the server-side wait
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(BOT_POLL_TIMEOUT_SECS + 10))
            .build()?;
        Ok(Self {
            api_base: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
            client,
            pipeline,
            last_update_id: 0,
        })
    }

    pub async fn run(mut self) {
        info!("telegram bot polling started");
        loop {
            if let Err(e) = self.poll_once(BOT_POLL_TIMEOUT_SECS).await {
                error!("telegram poll failed: {e}");
                tokio::time::sleep(Duration::from_secs(BOT_ERROR_PAUSE_SECS)).await;
            }
        }
    }

    /// One getUpdates round. Returns how many updates were handled.
    pub async fn poll_once(&mut self, wait_secs: u64) -> Result<usize> {
        let params = serde_json::json!({
            "offset": self.last_update_id + 1,
            "timeout": wait_secs,
            "allowed_updates": ["message"],
        });
        let updates: Updates = self
            .client
            .post(format!("{}/getUpdates", self.api_base))
            .json(&params)
            .send()
            .await?
            .json()
            .await?;

        if !updates.ok {
            return Err(AppError::Data(format!(
                "getUpdates rejected: {}",
                updates.description.unwrap_or_default()
            )));
        }

        let count = updates.result.len();
        for update in updates.result {
            self.last_update_id = self.last_update_id.max(update.update_id);
            if let Err(e) = self.handle(update).await {
                error!("telegram update failed: {e}");
            }
        }
        Ok(count)
    }

    async fn handle(&self, update: Update) -> Result<()> {
        let Some(message) = update.message else {
            return Ok(());
        };
        let Some(text) = message.text else {
            return Ok(());
        };
        debug!(chat_id = message.chat.id, text = %text, "telegram message");

        let command = BotCommand::parse(&text);
        let Some(reply) = respond(command, &self.pipeline).await else {
            return Ok(());
        };
        self.send_message(message.chat.id, &reply).await
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let params = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        let sent: Sent = self
            .client
            .post(format!("{}/sendMessage", self.api_base))
            .json(&params)
            .send()
            .await?
            .json()
            .await?;

        if !sent.ok {
            return Err(AppError::Publish(format!(
                "sendMessage rejected: {}",
                sent.description.unwrap_or_default()
            )));
        }
        Ok(())
    }
}
