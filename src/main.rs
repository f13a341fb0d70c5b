use log::{error, info};
use resonator::{
    commands::{self, error::CommandError},
    config::BotConfig,
    data::Data,
    driver::{mirror_presence, SongbirdTransport},
    error::AppError,
    playback::PlaybackController,
    queue::LocalTrackList,
    source::youtube::YouTubeSource,
    voice::{ReconnectPolicy, VoiceSessionManager}
};
use serenity::{client::{Client, FullEvent}, prelude::*};
use songbird::SerenityInit;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("resonator=info")).init();

    let config = BotConfig::from_env()?;
    let local_tracks = LocalTrackList::scan(&config.music_dir);
    let (controller, sink_events) = PlaybackController::new(YouTubeSource::default(), local_tracks);
    tokio::spawn(controller.clone().run(sink_events));

    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES | GatewayIntents::GUILD_MESSAGES;
    let guild_id = config.guild_id;
    let voice_channel_id = config.voice_channel_id;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            event_handler: |ctx, event, framework_ctx, data| Box::pin(event_handler(ctx, event, framework_ctx, data)),
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("{} has connected to discord", ready.user.name);

                if let Err(err) = poise::builtins::register_in_guild(ctx, &framework.options().commands, guild_id).await {
                    error!("error registering commands: {err}");
                }

                let manager = songbird::get(ctx).await.ok_or(CommandError::NoVoiceManager)?;
                let transport = SongbirdTransport::new(manager, ctx.http.clone(), guild_id, voice_channel_id, controller.sink_events());
                let (voice, transport_events) = VoiceSessionManager::new(transport, controller.clone(), ReconnectPolicy::default());
                tokio::spawn(voice.clone().run(transport_events));
                tokio::spawn(mirror_presence(ctx.clone(), controller.presence()));

                let connecting = voice.clone();
                tokio::spawn(async move { connecting.establish().await });

                let shard_manager = framework.shard_manager().clone();
                let stopping = voice.clone();
                tokio::spawn(async move {
                    if let Err(err) = tokio::signal::ctrl_c().await {
                        error!("could not listen for ctrl-c: {err}");
                        return;
                    }
                    info!("shutting down");
                    stopping.shutdown().await;
                    shard_manager.shutdown_all().await;
                });

                Ok(Data { guild_id, controller, voice })
            })
        })
        .build();

    let mut client = Client::builder(&config.token, intents)
        .application_id(config.application_id)
        .framework(framework)
        .register_songbird()
        .await?;
    client.start().await?;
    Ok(())
}

async fn event_handler<'a>(_ctx: &Context, event: &FullEvent, framework_ctx: poise::FrameworkContext<'a, Data, CommandError>, data: &Data) -> Result<(), CommandError> {
    if let FullEvent::VoiceStateUpdate { old, new } = event {
        if new.user_id != framework_ctx.bot_id || new.guild_id != Some(data.guild_id) { return Ok(()); }

        let was_connected = old.as_ref().and_then(|old| old.channel_id).is_some();
        if was_connected && new.channel_id.is_none() {
            data.voice.bot_left().await;
        }
    }
    Ok(())
}
