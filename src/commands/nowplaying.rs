use crate::{commands::error::CommandError, data::Context, utils::now_playing_reply};

/// Show what's currently playing
#[poise::command(slash_command, guild_only)]
pub async fn nowplaying(ctx: Context<'_>) -> Result<(), CommandError> {
    let now_playing = ctx.data().controller.now_playing().await;
    ctx.say(now_playing_reply(now_playing.as_ref())).await?;
    Ok(())
}
