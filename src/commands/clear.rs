use crate::{commands::error::CommandError, data::Context, utils::clear_reply};

/// Clear the YouTube queue
#[poise::command(slash_command, guild_only)]
pub async fn clear(ctx: Context<'_>) -> Result<(), CommandError> {
    let cleared = ctx.data().controller.clear().await.is_ok();
    ctx.say(clear_reply(cleared)).await?;
    Ok(())
}
