use crate::{commands::error::CommandError, data::Context, queue::Mode, utils::mode_reply};

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum ModeChoice {
    #[name = "Local Files"]
    Local,
    #[name = "YouTube"]
    YouTube
}

impl From<ModeChoice> for Mode {
    fn from(value: ModeChoice) -> Self {
        match value {
            ModeChoice::Local => Mode::LocalFiles,
            ModeChoice::YouTube => Mode::Remote
        }
    }
}

/// Switch between local files and YouTube mode
#[poise::command(slash_command, guild_only)]
pub async fn mode(
    ctx: Context<'_>,
    #[description = "The mode to switch to"]
    #[rename = "type"]
    kind: ModeChoice
) -> Result<(), CommandError> {
    let switch = ctx.data().controller.switch_mode(kind.into()).await;
    ctx.say(mode_reply(&switch)).await?;
    Ok(())
}
