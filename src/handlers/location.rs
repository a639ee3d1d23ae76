//! Location-share handler.

use chrono::Utc;

use crate::context::BotContext;
use crate::errors::BotError;
use crate::services::conversation;
use crate::services::telegram::Message;

/// Attach a shared location to the pending result, if the awaiting-location
/// window is still open. Late or unsolicited locations are silently ignored.
pub async fn handle_location(ctx: &BotContext, message: &Message) -> Result<(), BotError> {
    let Some(location) = message.location else {
        return Ok(());
    };

    let attached = conversation::record_location(
        ctx,
        location.latitude,
        location.longitude,
        Utc::now(),
    )
    .await?;

    if attached {
        let name = message.chat.first_name.as_deref().unwrap_or("friend");
        let text = format!("Got it, {}, the spot is noted.", name);
        ctx.telegram
            .send_message(message.chat.id, &text, None, None)
            .await?;
    }

    Ok(())
}
