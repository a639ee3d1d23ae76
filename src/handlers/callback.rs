//! Inline-button callback handler for the five result choices.

use crate::context::BotContext;
use crate::errors::BotError;
use crate::services::conversation::{self, ResultChoice};
use crate::services::telegram::CallbackQuery;

/// Record the chosen result against current conditions and prompt for a
/// location share.
///
/// The dispatcher only routes here for payloads matching one of the five
/// choice names. A reader failure aborts the whole operation — a result is
/// never recorded against a missing reading — and the user sees no reply.
pub async fn handle_result_choice(
    ctx: &BotContext,
    choice: ResultChoice,
    callback_query: &CallbackQuery,
) -> Result<(), BotError> {
    let Some(message) = &callback_query.message else {
        // Telegram omits the message for very old callbacks; nothing to edit.
        tracing::warn!(
            callback_id = %callback_query.id,
            "Callback without originating message, dropping"
        );
        return Ok(());
    };

    let author = message
        .chat
        .first_name
        .as_deref()
        .unwrap_or("someone")
        .to_string();

    conversation::record_result(ctx, choice, &author, message.chat.id, message.message_id).await
}
