use crate::models::{Message, ReplyMarkup, SendMessageRequest, TelegramResponse, Update};
use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Clone)]
pub struct TelegramApi {
    client: reqwest::Client,
    base_url: String,
}

impl TelegramApi {
    pub fn new(token: String) -> Self {
        Self::new_with_base_url(format!("https://api.telegram.org/bot{}", token))
    }

    pub fn new_with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    async fn post_json<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, method);
        let resp: TelegramResponse<T> = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        unwrap_response(resp, method)
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<ReplyMarkup>,
    ) -> Result<i64> {
        let body = SendMessageRequest {
            chat_id,
            text: text.to_string(),
            reply_to_message_id: None,
            parse_mode: Some("HTML".to_string()),
            reply_markup,
        };
        let message: Message = self.post_json("sendMessage", &body).await?;
        Ok(message.message_id)
    }

    /// Sends a photo already stored on Telegram servers.
    pub async fn send_photo(
        &self,
        chat_id: i64,
        photo_file_id: &str,
        caption: &str,
        reply_markup: Option<ReplyMarkup>,
    ) -> Result<i64> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "photo": photo_file_id,
            "caption": caption,
            "parse_mode": "HTML",
        });
        if let Some(markup) = reply_markup {
            body["reply_markup"] = serde_json::to_value(markup)?;
        }
        let message: Message = self.post_json("sendPhoto", &body).await?;
        Ok(message.message_id)
    }

    pub async fn send_document(&self, chat_id: i64, file_id: &str, caption: &str) -> Result<i64> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "document": file_id,
            "caption": caption,
            "parse_mode": "HTML",
        });
        let message: Message = self.post_json("sendDocument", &body).await?;
        Ok(message.message_id)
    }

    /// Uploads a generated file as a document.
    pub async fn upload_document(
        &self,
        chat_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
        caption: &str,
    ) -> Result<i64> {
        let url = format!("{}/sendDocument", self.base_url);
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", "HTML".to_string())
            .part(
                "document",
                reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name.to_string())
                    .mime_str(
                        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                    )?,
            );

        let resp: TelegramResponse<Message> = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;

        Ok(unwrap_response(resp, "sendDocument")?.message_id)
    }

    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()> {
        let mut body = serde_json::json!({
            "callback_query_id": callback_query_id,
            "show_alert": show_alert,
        });
        if let Some(text) = text {
            body["text"] = serde_json::Value::from(text);
        }
        let _: bool = self.post_json("answerCallbackQuery", &body).await?;
        Ok(())
    }

    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
        });

        match self
            .post_json::<_, serde_json::Value>("deleteMessage", &body)
            .await
        {
            Ok(_) => Ok(()),
            // Already deleted or too old.
            Err(err)
                if err.to_string().contains("message to delete not found")
                    || err.to_string().contains("message can't be deleted") =>
            {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    pub async fn get_updates(&self, offset: Option<i64>, timeout: i32) -> Result<Vec<Update>> {
        let url = format!("{}/getUpdates", self.base_url);
        let mut params = vec![
            ("timeout", timeout.to_string()),
            ("allowed_updates", r#"["message","callback_query"]"#.to_string()),
        ];
        if let Some(offset) = offset {
            params.push(("offset", offset.to_string()));
        }

        let resp: TelegramResponse<Vec<Update>> = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await?
            .json()
            .await?;

        if !resp.ok {
            let error_msg = resp
                .description
                .unwrap_or_else(|| "getUpdates failed".to_string());
            return Err(anyhow!("Telegram API error: {}", error_msg));
        }

        Ok(resp.result.unwrap_or_default())
    }

    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<()> {
        let mut body = serde_json::json!({ "url": url });
        if let Some(secret) = secret_token {
            body["secret_token"] = serde_json::Value::from(secret);
        }
        let _: bool = self.post_json("setWebhook", &body).await?;
        Ok(())
    }

    pub async fn delete_webhook(&self) -> Result<()> {
        let _: bool = self
            .post_json("deleteWebhook", &serde_json::json!({}))
            .await?;
        Ok(())
    }

    pub async fn get_webhook_info(&self) -> Result<serde_json::Value> {
        let url = format!("{}/getWebhookInfo", self.base_url);
        let resp: TelegramResponse<serde_json::Value> =
            self.client.get(&url).send().await?.json().await?;
        unwrap_response(resp, "getWebhookInfo")
    }
}

fn unwrap_response<T>(resp: TelegramResponse<T>, method: &str) -> Result<T> {
    if !resp.ok {
        let error_msg = resp
            .description
            .unwrap_or_else(|| format!("{method} failed"));
        return Err(anyhow!("Telegram API error: {}", error_msg));
    }
    resp.result
        .ok_or_else(|| anyhow!("Telegram API error: missing result in response"))
}
