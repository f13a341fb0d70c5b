//! Keeps the bot in its voice channel.
//!
//! [`VoiceSessionManager`] joins through a [`VoiceTransport`], hands the resulting sink to the
//! playback controller and reacts to [`TransportEvent`]s. Each join gets a fresh session id, so
//! events from a handle that was already torn down are ignored.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use serenity::async_trait;
use thiserror::Error as ThisError;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;

use crate::playback::{AudioSink, PlaybackController};
use crate::queue::Mode;
use crate::source::TrackSource;

#[derive(Debug, ThisError)]
pub enum TransportError {
    #[error("could not join the voice channel: {message}")]
    Join { message: String },
    #[error("voice connection was not ready after {after:?}")]
    Timeout { after: Duration },
    #[error("voice channel {channel} not found")]
    ChannelNotFound { channel: u64 },
    #[error("channel {channel} is not a voice channel")]
    NotVoiceChannel { channel: u64 }
}

#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum ReconnectError {
    #[error("gave up after {attempts} reconnection attempts")]
    ExhaustedRetries { attempts: u32 },
    #[error("a newer rejoin took over")]
    Superseded,
    #[error("shutting down")]
    ShutDown
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    Signalling,
    Connecting,
    Ready,
    Disconnected,
    /// The bot was taken out of its channel from the outside.
    Removed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportEvent {
    pub session: u64,
    pub status: TransportStatus
}

/// The voice connection as seen by the session manager.
#[async_trait]
pub trait VoiceTransport: Send + Sync + 'static {
    type Audio: Send + 'static;

    /// Joins the configured channel. Status changes of the new connection are sent to `events` tagged with `session`.
    async fn join(&self, session: u64, events: mpsc::UnboundedSender<TransportEvent>) -> Result<Arc<dyn AudioSink<Self::Audio>>, TransportError>;
    async fn leave(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub recovery_window: Duration,
    pub ready_timeout: Duration
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(5),
            recovery_window: Duration::from_secs(5),
            ready_timeout: Duration::from_secs(30)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Ready,
    Destroyed
}

#[derive(Debug)]
struct VoiceSession {
    status: SessionStatus,
    session: u64,
    connected_once: bool,
    attempts: u32,
    // bumped by rejoin and shutdown to stop a running reconnection loop
    cycle: u64,
    shut_down: bool,
    // when the bot last left the channel by itself
    own_leave: Option<Instant>
}

pub struct VoiceSessionManager<S, T>
where S: TrackSource, T: VoiceTransport<Audio = S::Audio> {
    transport: T,
    controller: Arc<PlaybackController<S>>,
    policy: ReconnectPolicy,
    session: Mutex<VoiceSession>,
    events: mpsc::UnboundedSender<TransportEvent>
}

impl<S, T> VoiceSessionManager<S, T>
where S: TrackSource, T: VoiceTransport<Audio = S::Audio> {
    pub fn new(transport: T, controller: Arc<PlaybackController<S>>, policy: ReconnectPolicy) -> (Arc<Self>, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let session = VoiceSession {
            status: SessionStatus::Disconnected,
            session: 0,
            connected_once: false,
            attempts: 0,
            cycle: 0,
            shut_down: false,
            own_leave: None
        };
        (Arc::new(Self { transport, controller, policy, session: Mutex::new(session), events }), receiver)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn status(&self) -> SessionStatus {
        self.session.lock().await.status
    }

    pub async fn attempts(&self) -> u32 {
        self.session.lock().await.attempts
    }

    pub async fn session_id(&self) -> u64 {
        self.session.lock().await.session
    }

    /// Reports a status seen outside the transport, tagged with the current session.
    pub async fn notify(&self, status: TransportStatus) {
        let session = self.session_id().await;
        let _ = self.events.send(TransportEvent { session, status });
    }

    /// Handles the gateway reporting that the bot left its channel. The echo of a leave the
    /// manager did itself is swallowed once, even if a rejoin already finished.
    pub async fn bot_left(&self) {
        {
            let mut state = self.session.lock().await;
            if let Some(left_at) = state.own_leave.take() {
                if left_at.elapsed() <= self.policy.recovery_window {
                    debug!("ignoring echo of our own leave");
                    return;
                }
            }
            if state.status != SessionStatus::Ready {
                return;
            }
        }
        self.notify(TransportStatus::Removed).await;
    }

    /// Joins once and falls back to the reconnection protocol if that fails.
    pub async fn establish(&self) {
        if let Err(err) = self.connect().await {
            error!("failed to connect to voice channel: {err}");
            if let Err(err) = self.reconnect().await {
                error!("{err}");
            }
        }
    }

    pub async fn connect(&self) -> Result<(), TransportError> {
        let session = {
            let mut state = self.session.lock().await;
            state.session += 1;
            state.status = SessionStatus::Connecting;
            state.session
        };

        let joined = tokio::time::timeout(self.policy.ready_timeout, self.transport.join(session, self.events.clone())).await
            .unwrap_or(Err(TransportError::Timeout { after: self.policy.ready_timeout }));

        let sink = match joined {
            Ok(sink) => sink,
            Err(err) => {
                // a rejoin may have connected a newer session while this join hung
                let current = self.session.lock().await.session == session;
                if current {
                    self.destroy().await;
                } else {
                    debug!("session {session} failed after being replaced");
                }
                return Err(err);
            }
        };

        let first = {
            let mut state = self.session.lock().await;
            if state.session != session {
                debug!("session {session} was replaced while joining");
                return Ok(());
            }
            state.status = SessionStatus::Ready;
            state.attempts = 0;
            let first = !state.connected_once;
            state.connected_once = true;
            first
        };
        info!("successfully connected to voice channel");

        self.controller.attach_sink(sink).await;
        if first && self.controller.mode().await == Mode::LocalFiles && self.controller.has_local_tracks().await {
            self.controller.start().await;
        } else if let Some(outcome) = self.controller.resume().await {
            debug!("resumed playback: {outcome:?}");
        }
        Ok(())
    }

    async fn destroy(&self) {
        {
            let mut state = self.session.lock().await;
            state.session += 1;
            state.status = SessionStatus::Destroyed;
            state.own_leave = Some(Instant::now());
        }
        self.controller.detach_sink().await;
        self.transport.leave().await;
        info!("voice connection destroyed");
    }

    /// Retries [`VoiceSessionManager::connect`] with a fixed delay until it works or the attempts run out.
    pub async fn reconnect(&self) -> Result<(), ReconnectError> {
        let cycle = self.session.lock().await.cycle;
        loop {
            let attempt = {
                let mut state = self.session.lock().await;
                Self::check_cycle(&state, cycle)?;
                if state.attempts >= self.policy.max_attempts {
                    error!("max reconnection attempts reached, giving up");
                    return Err(ReconnectError::ExhaustedRetries { attempts: state.attempts });
                }
                state.attempts += 1;
                state.attempts
            };
            info!("reconnection attempt {attempt}/{}", self.policy.max_attempts);

            tokio::time::sleep(self.policy.delay).await;
            Self::check_cycle(&*self.session.lock().await, cycle)?;

            match self.connect().await {
                Ok(()) => return Ok(()),
                Err(err) => warn!("reconnection attempt {attempt} failed: {err}")
            }
        }
    }

    fn check_cycle(state: &VoiceSession, cycle: u64) -> Result<(), ReconnectError> {
        if state.shut_down { return Err(ReconnectError::ShutDown); }
        if state.cycle != cycle { return Err(ReconnectError::Superseded); }
        Ok(())
    }

    pub async fn rejoin(&self) -> Result<(), TransportError> {
        {
            let mut state = self.session.lock().await;
            state.attempts = 0;
            state.cycle += 1;
        }
        info!("rejoining voice channel");
        self.destroy().await;
        self.connect().await
    }

    pub async fn shutdown(&self) {
        {
            let mut state = self.session.lock().await;
            state.shut_down = true;
            state.cycle += 1;
        }
        self.controller.stop().await;
        self.destroy().await;
    }

    /// Consumes transport events until the channel closes.
    pub async fn run(self: Arc<Self>, mut receiver: mpsc::UnboundedReceiver<TransportEvent>) {
        while let Some(event) = receiver.recv().await {
            if !self.is_current(event.session).await {
                debug!("ignoring event from stale session: {event:?}");
                continue;
            }
            match event.status {
                TransportStatus::Ready => {
                    let mut state = self.session.lock().await;
                    state.status = SessionStatus::Ready;
                    state.attempts = 0;
                },
                TransportStatus::Signalling | TransportStatus::Connecting => self.session.lock().await.status = SessionStatus::Connecting,
                TransportStatus::Disconnected => {
                    self.session.lock().await.status = SessionStatus::Disconnected;
                    if self.await_recovery(&mut receiver, event.session).await {
                        debug!("voice connection is recovering by itself");
                        continue;
                    }
                    warn!("voice connection lost, will attempt to reconnect");
                    self.destroy().await;
                    self.spawn_reconnect();
                },
                TransportStatus::Removed => {
                    warn!("bot was disconnected from voice channel, attempting to rejoin");
                    self.destroy().await;
                    self.spawn_reconnect();
                }
            }
        }
        debug!("transport event channel closed");
    }

    async fn is_current(&self, session: u64) -> bool {
        let state = self.session.lock().await;
        !state.shut_down && state.session == session
    }

    // the loop runs beside `run` so events of the new sessions keep flowing
    fn spawn_reconnect(self: &Arc<Self>) {
        let manager = self.clone();
        tokio::spawn(async move {
            if let Err(err) = manager.reconnect().await {
                match err {
                    ReconnectError::ExhaustedRetries { .. } => error!("{err}, use /rejoin to try again"),
                    _ => debug!("reconnection stopped: {err}")
                }
            }
        });
    }

    async fn await_recovery(&self, receiver: &mut mpsc::UnboundedReceiver<TransportEvent>, session: u64) -> bool {
        let recovered = async {
            while let Some(event) = receiver.recv().await {
                if event.session != session { continue; }
                match event.status {
                    TransportStatus::Signalling | TransportStatus::Connecting | TransportStatus::Ready => return true,
                    TransportStatus::Removed => return false,
                    TransportStatus::Disconnected => ()
                }
            }
            false
        };
        tokio::time::timeout(self.policy.recovery_window, recovered).await.unwrap_or(false)
    }
}
