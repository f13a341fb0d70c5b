use crate::{commands::error::CommandError, data::Context};

/// Skip the current track
#[poise::command(slash_command, guild_only)]
pub async fn skip(ctx: Context<'_>) -> Result<(), CommandError> {
    ctx.data().controller.skip().await;
    ctx.say("Skipped current track.").await?;
    Ok(())
}
