use serenity::http::Http;
use serenity::model::mention::Mentionable as _;

use super::game::{Notice, RoundOutput};
use crate::prelude::*;

/// Posts round results to a Discord channel.
pub struct ChannelOutput {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl ChannelOutput {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

fn notice_message(notice: Notice) -> CreateMessage {
    match notice {
        Notice::Cancelled => CreateMessage::new().content("🛑 RPS game cancelled by an admin."),
        Notice::Revealing => {
            CreateMessage::new().content("🔍 **Time's up! Finding the winner...**")
        },
        Notice::Winner(user_id) => {
            let embed = CreateEmbed::new()
                .title("🎉 We Have a Winner!")
                .description(format!("{} guessed the correct move!", user_id.mention()))
                .color(SUCCESS_EMBED_COLOR);

            CreateMessage::new().embed(embed)
        },
        Notice::NoWinner => {
            let embed = CreateEmbed::new()
                .title("Game Over")
                .description("😔 No one guessed correctly!")
                .color(ERROR_EMBED_COLOR);

            CreateMessage::new().embed(embed)
        },
        Notice::Over => CreateMessage::new().content("✅ The game is over."),
    }
}

impl RoundOutput for ChannelOutput {
    async fn notify(&self, notice: Notice) -> Result {
        self.channel_id
            .send_message(&*self.http, notice_message(notice))
            .await
            .with_context(|| format!("failed to post rps notice to {}", self.channel_id))?;

        Ok(())
    }

    async fn clear_prompt(&self, message_id: MessageId) -> Result {
        let edit = EditMessage::new().components(Vec::new());
        self.channel_id
            .edit_message(&*self.http, message_id, edit)
            .await?;

        Ok(())
    }
}
