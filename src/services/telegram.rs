//! Thin Telegram Bot API client.
//!
//! Covers only the operations the bot needs: long-poll `getUpdates`,
//! `sendMessage`, `editMessageText`, and `setMyCommands`. The base URL is
//! injectable so tests can point the client at a mock server.

use serde::{Deserialize, Serialize};

use crate::errors::BotError;

/// Long-poll timeout passed to `getUpdates`, in seconds.
pub const LONG_POLL_TIMEOUT_SECS: u64 = 30;

/// Client for the Telegram Bot API.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

// --- Bot API wire types (the subset this bot consumes) ---

/// Envelope every Bot API method responds with.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// One inbound event from the long poll.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub data: Option<String>,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

impl TelegramClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        // No global request timeout: getUpdates holds the connection open
        // for the long-poll interval.
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, BotError> {
        let mut body = serde_json::json!({ "timeout": LONG_POLL_TIMEOUT_SECS });
        if let Some(offset) = offset {
            body["offset"] = serde_json::json!(offset);
        }
        self.call("getUpdates", &body).await
    }

    /// Send a text message to a chat, optionally with HTML parse mode and an
    /// inline keyboard.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<&str>,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message, BotError> {
        let mut body = serde_json::json!({ "chat_id": chat_id, "text": text });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = serde_json::json!(mode);
        }
        if let Some(markup) = reply_markup {
            body["reply_markup"] = serde_json::to_value(markup)
                .map_err(|e| BotError::Transport(format!("keyboard serialize error: {}", e)))?;
        }
        self.call("sendMessage", &body).await
    }

    /// Edit a previously sent message in place.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), BotError> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        // editMessageText returns the edited Message; we only care that the
        // call succeeded.
        self.call::<serde_json::Value>("editMessageText", &body)
            .await
            .map(|_| ())
    }

    /// Register the static command menu.
    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<(), BotError> {
        let body = serde_json::json!({ "commands": commands });
        self.call::<serde_json::Value>("setMyCommands", &body)
            .await
            .map(|_| ())
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, BotError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| BotError::Transport(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            BotError::Transport(format!("{} response parse error: {}", method, e))
        })?;

        if !envelope.ok {
            return Err(BotError::Transport(format!(
                "{} failed (HTTP {}): {}",
                method,
                status,
                envelope.description.unwrap_or_else(|| "no description".to_string()),
            )));
        }

        envelope.result.ok_or_else(|| {
            BotError::Transport(format!("{} returned ok with no result", method))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_updates_parses_messages_and_callbacks() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "ok": true,
            "result": [
                {
                    "update_id": 10,
                    "message": {
                        "message_id": 1,
                        "chat": { "id": 42, "first_name": "Anna" },
                        "text": "/weather"
                    }
                },
                {
                    "update_id": 11,
                    "callback_query": {
                        "id": "cb1",
                        "data": "GOOD",
                        "message": {
                            "message_id": 2,
                            "chat": { "id": 42, "first_name": "Anna" }
                        }
                    }
                }
            ]
        });
        Mock::given(method("POST"))
            .and(path("/bot123:abc/getUpdates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), "123:abc");
        let updates = client.get_updates(None).await.unwrap();

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].update_id, 10);
        assert_eq!(updates[0].message.as_ref().unwrap().text.as_deref(), Some("/weather"));
        assert_eq!(
            updates[1].callback_query.as_ref().unwrap().data.as_deref(),
            Some("GOOD")
        );
    }

    #[tokio::test]
    async fn test_send_message_api_error_is_transport() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "ok": false,
            "description": "Forbidden: bot was blocked by the user"
        });
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(ResponseTemplate::new(403).set_body_json(body))
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), "123:abc");
        let err = client.send_message(42, "hi", None, None).await.unwrap_err();
        assert!(matches!(err, BotError::Transport(_)));
        assert!(err.to_string().contains("blocked"));
    }

    #[tokio::test]
    async fn test_edit_message_text_ok() {
        let server = MockServer::start().await;
        let body = serde_json::json!({ "ok": true, "result": { "message_id": 2 } });
        Mock::given(method("POST"))
            .and(path("/bot123:abc/editMessageText"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = TelegramClient::new(&server.uri(), "123:abc");
        client.edit_message_text(42, 2, "done").await.unwrap();
    }
}
