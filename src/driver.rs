use std::sync::Arc;

use log::{debug, warn};
use serenity::{
    async_trait,
    client::Context,
    gateway::ActivityData,
    http::Http,
    model::{channel::{Channel, ChannelType}, id::{ChannelId, GuildId}}
};
use songbird::{
    events::{CoreEvent, Event, EventContext, EventHandler, TrackEvent},
    input::Input,
    tracks::TrackHandle,
    Call, Songbird
};
use tokio::sync::{mpsc, watch, Mutex};

use crate::playback::{AudioSink, Presence, SinkError, SinkEvent, SinkEventKind};
use crate::voice::{TransportError, TransportEvent, TransportStatus, VoiceTransport};

/// Forwards the end or failure of one track to the playback controller.
struct TrackEventForwarder {
    generation: u64,
    events: mpsc::UnboundedSender<SinkEvent>
}

#[async_trait]
impl EventHandler for TrackEventForwarder {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let EventContext::Track(slice) = ctx else { return None; };
        let Some((track_state, _)) = slice.first() else { return None; };

        let kind = match &track_state.playing {
            songbird::tracks::PlayMode::Errored(err) => SinkEventKind::Error(format!("{err:?}")),
            _ => SinkEventKind::Idle
        };
        let _ = self.events.send(SinkEvent { generation: self.generation, kind });
        None
    }
}

/// Reports driver connection changes of one session.
struct ConnectionForwarder {
    session: u64,
    status: TransportStatus,
    events: mpsc::UnboundedSender<TransportEvent>
}

#[async_trait]
impl EventHandler for ConnectionForwarder {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        let _ = self.events.send(TransportEvent { session: self.session, status: self.status });
        None
    }
}

pub struct SongbirdSink {
    handler: Arc<Mutex<Call>>,
    current: Mutex<Option<TrackHandle>>,
    events: mpsc::UnboundedSender<SinkEvent>
}

#[async_trait]
impl AudioSink<Input> for SongbirdSink {
    async fn play(&self, audio: Input, generation: u64) -> Result<(), SinkError> {
        let track_handle = {
            let mut handler_guard = self.handler.lock().await;
            handler_guard.stop();
            handler_guard.play_input(audio)
        };

        for track_event in [TrackEvent::End, TrackEvent::Error] {
            let forwarder = TrackEventForwarder { generation, events: self.events.clone() };
            track_handle.add_event(Event::Track(track_event), forwarder)
                .map_err(|err| SinkError::Rejected { message: err.to_string() })?;
        }
        *self.current.lock().await = Some(track_handle);
        Ok(())
    }

    async fn stop(&self) {
        if let Some(track_handle) = self.current.lock().await.take() {
            if let Err(err) = track_handle.stop() {
                debug!("track was already gone: {err}");
            }
        }
    }
}

/// Joins one fixed channel through songbird.
pub struct SongbirdTransport {
    manager: Arc<Songbird>,
    http: Arc<Http>,
    guild_id: GuildId,
    channel_id: ChannelId,
    sink_events: mpsc::UnboundedSender<SinkEvent>
}

impl SongbirdTransport {
    pub fn new(manager: Arc<Songbird>, http: Arc<Http>, guild_id: GuildId, channel_id: ChannelId, sink_events: mpsc::UnboundedSender<SinkEvent>) -> Self {
        Self { manager, http, guild_id, channel_id, sink_events }
    }

    async fn check_channel(&self) -> Result<(), TransportError> {
        let channel = self.http.get_channel(self.channel_id).await
            .map_err(|_| TransportError::ChannelNotFound { channel: self.channel_id.get() })?;
        match channel {
            Channel::Guild(guild_channel) if matches!(guild_channel.kind, ChannelType::Voice | ChannelType::Stage) => Ok(()),
            _ => Err(TransportError::NotVoiceChannel { channel: self.channel_id.get() })
        }
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    type Audio = Input;

    async fn join(&self, session: u64, events: mpsc::UnboundedSender<TransportEvent>) -> Result<Arc<dyn AudioSink<Input>>, TransportError> {
        self.check_channel().await?;

        let handler = self.manager.join(self.guild_id, self.channel_id).await
            .map_err(|err| TransportError::Join { message: err.to_string() })?;

        {
            let mut handler_guard = handler.lock().await;
            handler_guard.remove_all_global_events();
            let forwarders = [
                (CoreEvent::DriverDisconnect, TransportStatus::Disconnected),
                (CoreEvent::DriverConnect, TransportStatus::Ready),
                (CoreEvent::DriverReconnect, TransportStatus::Ready)
            ];
            for (core_event, status) in forwarders {
                handler_guard.add_global_event(Event::Core(core_event), ConnectionForwarder { session, status, events: events.clone() });
            }
        }

        Ok(Arc::new(SongbirdSink { handler, current: Mutex::new(None), events: self.sink_events.clone() }))
    }

    async fn leave(&self) {
        if self.manager.get(self.guild_id).is_none() { return; }
        if let Err(err) = self.manager.remove(self.guild_id).await {
            warn!("failed to leave voice channel: {err}");
        }
    }
}

/// Keeps the bot's activity in line with what the controller publishes.
pub async fn mirror_presence(ctx: Context, mut presence: watch::Receiver<Presence>) {
    ctx.set_activity(activity_for(&presence.borrow_and_update()));
    while presence.changed().await.is_ok() {
        let activity = activity_for(&presence.borrow_and_update());
        ctx.set_activity(activity);
    }
}

pub fn activity_for(presence: &Presence) -> Option<ActivityData> {
    match presence {
        Presence::Idle => None,
        Presence::Listening(title) => Some(ActivityData::listening(title)),
        Presence::WaitingForSongs => Some(ActivityData::watching("Waiting for songs..."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::model::gateway::ActivityType;

    #[test]
    fn presence_maps_to_activity() {
        assert!(activity_for(&Presence::Idle).is_none());

        let listening = activity_for(&Presence::Listening("a.mp3".to_owned())).unwrap();
        assert_eq!(listening.name, "a.mp3");
        assert_eq!(listening.kind, ActivityType::Listening);

        let waiting = activity_for(&Presence::WaitingForSongs).unwrap();
        assert_eq!(waiting.name, "Waiting for songs...");
        assert_eq!(waiting.kind, ActivityType::Watching);
    }
}
