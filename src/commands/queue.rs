use crate::{commands::error::CommandError, data::Context, utils::queue_reply};

/// Show the current queue
#[poise::command(slash_command, guild_only)]
pub async fn queue(ctx: Context<'_>) -> Result<(), CommandError> {
    let snapshot = ctx.data().controller.snapshot().await;
    ctx.say(queue_reply(&snapshot)).await?;
    Ok(())
}
