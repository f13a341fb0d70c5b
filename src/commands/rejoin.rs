use log::error;

use crate::{commands::error::CommandError, data::Context, utils::rejoin_reply};

/// Force the bot to rejoin the voice channel
#[poise::command(slash_command, guild_only)]
pub async fn rejoin(ctx: Context<'_>) -> Result<(), CommandError> {
    ctx.defer().await?;
    let rejoined = match ctx.data().voice.rejoin().await {
        Ok(()) => true,
        Err(err) => {
            error!("failed to rejoin voice channel: {err}");
            false
        }
    };
    ctx.say(rejoin_reply(rejoined)).await?;
    Ok(())
}
