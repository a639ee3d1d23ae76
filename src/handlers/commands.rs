//! Command handlers: /start, /help, /weather, /result, /about, and the
//! fallback echo for anything unrecognized.

use chrono::Utc;

use crate::context::BotContext;
use crate::db::models::Snapshot;
use crate::db::queries;
use crate::errors::BotError;
use crate::helpers::dec_to_f64;
use crate::services::conversation::ResultChoice;
use crate::services::telegram::{BotCommand, InlineKeyboardButton, InlineKeyboardMarkup, Message};

/// The static command menu registered with Telegram at startup.
pub fn command_menu() -> Vec<BotCommand> {
    [
        ("/start", "register and say hello"),
        ("/help", "what I can do"),
        ("/weather", "current river weather and water level"),
        ("/result", "report how the fishing went"),
        ("/about", "who I am"),
    ]
    .into_iter()
    .map(|(command, description)| BotCommand {
        command: command.to_string(),
        description: description.to_string(),
    })
    .collect()
}

/// Route a text message to the matching command handler.
pub async fn handle_command(ctx: &BotContext, message: &Message) -> Result<(), BotError> {
    let text = message.text.as_deref().unwrap_or_default();
    match text {
        "/start" => start(ctx, message).await,
        "/help" => help(ctx, message).await,
        "/weather" => weather(ctx, message).await,
        "/result" => result(ctx, message).await,
        "/about" => about(ctx, message).await,
        _ => fallback(ctx, message, text).await,
    }
}

fn first_name(message: &Message) -> &str {
    message.chat.first_name.as_deref().unwrap_or("friend")
}

/// /start — register the user (idempotent) and greet.
async fn start(ctx: &BotContext, message: &Message) -> Result<(), BotError> {
    let chat = &message.chat;
    let inserted = queries::register_user_if_absent(
        &ctx.pool,
        chat.id,
        chat.first_name.as_deref().unwrap_or_default(),
        chat.last_name.as_deref(),
        chat.username.as_deref(),
        Utc::now(),
    )
    .await?;
    if inserted {
        tracing::info!(chat_id = chat.id, "New user registered");
    }

    let text = format!(
        "Hello, {}! I watch the river for you: weather, water level, and \
         your fishing reports. See what I can do with /help.",
        first_name(message),
    );
    ctx.telegram
        .send_message(chat.id, &text, None, None)
        .await?;
    Ok(())
}

/// /help — command overview.
async fn help(ctx: &BotContext, message: &Message) -> Result<(), BotError> {
    let text = format!(
        "{}, here is what I can do:\n\n\
         <b>Commands:</b>\n\
         /weather - current river weather and water level\n\
         /result - report how the fishing went\n\
         /about - who I am\n\n\
         The menu button in the corner lists these too.",
        first_name(message),
    );
    ctx.telegram
        .send_message(message.chat.id, &text, Some("HTML"), None)
        .await?;
    Ok(())
}

/// /weather — format the latest snapshot.
async fn weather(ctx: &BotContext, message: &Message) -> Result<(), BotError> {
    let text = match queries::latest_snapshot(&ctx.pool).await? {
        Some(snapshot) => format_weather_reply(&snapshot, first_name(message)),
        None => "I have no readings yet, ask me again in a little while.".to_string(),
    };
    ctx.telegram
        .send_message(message.chat.id, &text, Some("HTML"), None)
        .await?;
    Ok(())
}

/// /result — ask the question with the five-button row, worst→best.
async fn result(ctx: &BotContext, message: &Message) -> Result<(), BotError> {
    let text = format!(
        "So, {}, how generous was the river today?",
        first_name(message),
    );
    ctx.telegram
        .send_message(message.chat.id, &text, None, Some(&result_keyboard()))
        .await?;
    Ok(())
}

/// /about — bot description.
async fn about(ctx: &BotContext, message: &Message) -> Result<(), BotError> {
    let text = format!(
        "I'm {}. I keep an eye on the river: every hour I note the weather \
         and the water level, and I collect your fishing reports with \
         /result. Ask me for the current conditions with /weather.",
        ctx.bot_name,
    );
    ctx.telegram
        .send_message(message.chat.id, &text, None, None)
        .await?;
    Ok(())
}

/// Anything unrecognized — echo back with a greeting.
async fn fallback(ctx: &BotContext, message: &Message, text: &str) -> Result<(), BotError> {
    let reply = format!("Hi {}, you said: {}", first_name(message), text);
    ctx.telegram
        .send_message(message.chat.id, &reply, None, None)
        .await?;
    Ok(())
}

/// Build the single-row inline keyboard with the five result buttons.
pub fn result_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![ResultChoice::ALL
            .into_iter()
            .map(|choice| InlineKeyboardButton {
                text: choice.label().to_string(),
                callback_data: choice.callback_id().to_string(),
            })
            .collect()],
    }
}

/// Format the /weather reply from the latest snapshot.
fn format_weather_reply(snapshot: &Snapshot, name: &str) -> String {
    format!(
        "The river right now, {}:\n\n\
         <b>Country:</b> {}\n\
         <b>City:</b> {}\n\
         <b>Temperature:</b> {} C (feels like {} C)\n\
         <b>Humidity:</b> {}%\n\
         <b>Pressure:</b> {} hPa\n\
         <b>Wind:</b> {} m/s at {}°\n\
         <b>Water level:</b> {} cm ({:+} cm)",
        name,
        snapshot.country,
        snapshot.city,
        snapshot.temperature_c,
        snapshot.feels_like_c,
        snapshot.humidity_pct,
        snapshot.pressure_hpa,
        snapshot.wind_speed_ms,
        snapshot.wind_direction_deg,
        snapshot.water_level_cm,
        dec_to_f64(snapshot.water_delta_cm),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use uuid::Uuid;

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            id: Uuid::new_v4(),
            timestamp_ms: 1_700_000_000_000,
            country: "RU".to_string(),
            city: "Tver".to_string(),
            temperature_c: Decimal::from_str("12.3").unwrap(),
            feels_like_c: Decimal::from_str("10.9").unwrap(),
            humidity_pct: Decimal::from_str("81.0").unwrap(),
            pressure_hpa: Decimal::from_str("1013.0").unwrap(),
            wind_direction_deg: Decimal::from_str("220.0").unwrap(),
            wind_speed_ms: Decimal::from_str("4.6").unwrap(),
            water_level_cm: Decimal::from_str("312.0").unwrap(),
            water_delta_cm: Decimal::from_str("-4.0").unwrap(),
            result_label: None,
            result_author: None,
            result_latitude: None,
            result_longitude: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_result_keyboard_is_one_row_of_five() {
        let keyboard = result_keyboard();
        assert_eq!(keyboard.inline_keyboard.len(), 1);
        let row = &keyboard.inline_keyboard[0];
        assert_eq!(row.len(), 5);
        assert_eq!(row[0].callback_data, "UNSATISFACTORY");
        assert_eq!(row[4].callback_data, "EXCELLENT");
        assert_eq!(row[3].text, "good");
    }

    #[test]
    fn test_format_weather_reply_includes_all_readings() {
        let text = format_weather_reply(&sample_snapshot(), "Anna");
        assert!(text.contains("Anna"));
        assert!(text.contains("RU"));
        assert!(text.contains("Tver"));
        assert!(text.contains("12.3"));
        assert!(text.contains("10.9"));
        assert!(text.contains("81.0%"));
        assert!(text.contains("1013.0 hPa"));
        assert!(text.contains("4.6 m/s"));
        assert!(text.contains("312.0 cm"));
        assert!(text.contains("-4 cm"));
    }

    #[test]
    fn test_command_menu_covers_all_commands() {
        let menu = command_menu();
        let commands: Vec<&str> = menu.iter().map(|c| c.command.as_str()).collect();
        assert_eq!(
            commands,
            vec!["/start", "/help", "/weather", "/result", "/about"]
        );
    }
}
