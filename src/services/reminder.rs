//! Cron-scheduled reminder broadcast.
//!
//! On every fire of the configured cron expression, sends one fixed message
//! to every registered user, sequentially. A single failed delivery (for
//! example a user who blocked the bot) is logged and skipped; it never
//! aborts delivery to the remaining recipients.

use chrono::Utc;
use cron::Schedule;
use sqlx::PgPool;

use crate::db::models::BotUser;
use crate::db::queries;
use crate::services::telegram::TelegramClient;

/// The fixed broadcast text.
const REMINDER_TEXT: &str =
    "Hi! How are things? Heading out to the river tomorrow? \
     Don't forget to tell me how it went with /result.";

/// Run the reminder loop. Never returns; spawn via `tokio::spawn`.
pub async fn run_reminder(pool: PgPool, telegram: TelegramClient, schedule: Schedule) {
    tracing::info!("Reminder scheduler started");

    loop {
        let Some(next_fire) = schedule.upcoming(Utc).next() else {
            // A schedule with no future fire times never triggers again.
            tracing::warn!("Reminder schedule has no upcoming fire times, stopping");
            return;
        };

        let wait = (next_fire - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        tracing::debug!(next_fire = %next_fire, "Reminder: sleeping until next fire");
        tokio::time::sleep(wait).await;

        let users = match queries::list_users(&pool).await {
            Ok(users) => users,
            Err(e) => {
                tracing::error!("Reminder: failed to load users: {}", e);
                continue;
            }
        };

        broadcast_to(&telegram, &users).await;
    }
}

/// Send the reminder to every user, isolating per-recipient failures.
pub async fn broadcast_to(telegram: &TelegramClient, users: &[BotUser]) {
    let mut delivered = 0usize;
    for user in users {
        match telegram
            .send_message(user.chat_id, REMINDER_TEXT, None, None)
            .await
        {
            Ok(_) => delivered += 1,
            Err(e) => {
                tracing::warn!(chat_id = user.chat_id, "Reminder delivery failed: {}", e);
            }
        }
    }
    tracing::info!(delivered, total = users.len(), "Reminder broadcast complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn user(chat_id: i64) -> BotUser {
        BotUser {
            chat_id,
            first_name: "Anna".to_string(),
            last_name: None,
            username: None,
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn test_default_cron_expression_parses() {
        let schedule = Schedule::from_str("0 0 18 * * Fri *").unwrap();
        let next = schedule.upcoming(Utc).next().unwrap();
        assert!(next > Utc::now());
    }

    #[test]
    fn test_five_field_expression_is_rejected() {
        // The cron crate wants seconds granularity (6 or 7 fields)
        assert!(Schedule::from_str("0 18 * * Fri").is_err());
    }

    #[tokio::test]
    async fn test_broadcast_continues_past_blocked_recipient() {
        let server = MockServer::start().await;

        // First recipient blocked the bot
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(serde_json::json!({ "chat_id": 1 })))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "ok": false,
                "description": "Forbidden: bot was blocked by the user"
            })))
            .expect(1)
            .mount(&server)
            .await;

        // Second recipient must still receive the reminder
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(serde_json::json!({ "chat_id": 2 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "result": { "message_id": 7, "chat": { "id": 2 } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let telegram = TelegramClient::new(&server.uri(), "123:abc");
        broadcast_to(&telegram, &[user(1), user(2)]).await;

        // Mock expectations assert both recipients were attempted
        server.verify().await;
    }
}
