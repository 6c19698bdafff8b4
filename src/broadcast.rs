use crate::api::TelegramApi;
use crate::models::ReplyMarkup;
use std::time::Duration;
use tracing::{info, warn};

/// Keeps mass sends under the Bot API's ~30 messages per second.
const SEND_PAUSE: Duration = Duration::from_millis(35);

#[derive(Debug, Clone)]
pub enum Delivery {
    Text {
        text: String,
        markup: Option<ReplyMarkup>,
    },
    Photo {
        file_id: String,
        caption: String,
        markup: Option<ReplyMarkup>,
    },
}

impl Delivery {
    pub fn text(text: impl Into<String>) -> Self {
        Delivery::Text {
            text: text.into(),
            markup: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

/// Sends to every recipient. A failure is counted and the broadcast moves on.
pub async fn broadcast(
    telegram: &TelegramApi,
    recipients: &[i64],
    delivery: &Delivery,
) -> BroadcastReport {
    let mut report = BroadcastReport::default();

    for (index, chat_id) in recipients.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(SEND_PAUSE).await;
        }
        let result = match delivery {
            Delivery::Text { text, markup } => {
                telegram.send_message(*chat_id, text, markup.clone()).await
            }
            Delivery::Photo {
                file_id,
                caption,
                markup,
            } => {
                telegram
                    .send_photo(*chat_id, file_id, caption, markup.clone())
                    .await
            }
        };
        match result {
            Ok(_) => report.sent += 1,
            Err(err) => {
                warn!(chat_id, "Broadcast delivery failed: {err:?}");
                report.failed += 1;
            }
        }
    }

    info!(sent = report.sent, failed = report.failed, "Broadcast finished");
    report
}
