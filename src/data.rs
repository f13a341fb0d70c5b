use std::sync::Arc;

use serenity::model::id::GuildId;

use crate::commands::error::CommandError;
use crate::driver::SongbirdTransport;
use crate::playback::PlaybackController;
use crate::source::youtube::YouTubeSource;
use crate::voice::VoiceSessionManager;

pub type Controller = PlaybackController<YouTubeSource>;
pub type VoiceManager = VoiceSessionManager<YouTubeSource, SongbirdTransport>;

pub type Context<'a> = poise::Context<'a, Data, CommandError>;
pub struct Data {
    pub guild_id: GuildId,
    pub controller: Arc<Controller>,
    pub voice: Arc<VoiceManager>
}
