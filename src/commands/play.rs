use log::warn;

use crate::{
    commands::error::CommandError,
    data::Context,
    queue::Mode,
    utils::{added_reply, play_error_reply, wrong_mode_play_reply}
};

/// Play a YouTube song or playlist (YouTube mode only)
#[poise::command(slash_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "YouTube URL or search query"] query: String
) -> Result<(), CommandError> {
    let controller = ctx.data().controller.clone();
    if controller.mode().await != Mode::Remote {
        ctx.say(wrong_mode_play_reply()).await?;
        return Ok(());
    }

    // resolving can take longer than discord waits for a reply
    ctx.defer().await?;

    match controller.enqueue_query(&query, &ctx.author().name).await {
        Ok(enqueued) => {
            ctx.say(added_reply(&enqueued.added)).await?;
            if enqueued.start_needed {
                controller.start_if_idle().await;
            }
        },
        Err(err) => {
            warn!("error processing play command: {err}");
            ctx.say(play_error_reply(&err)).await?;
        }
    }
    Ok(())
}
