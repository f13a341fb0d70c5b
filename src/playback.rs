//! The playback state machine.
//!
//! One [`PlaybackController`] owns the audio sink and decides what plays next. Every
//! playback attempt, stop and sink change bumps a generation counter; sink events and
//! stream-open results tagged with an older generation are dropped on arrival.

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error, info, warn};
use serenity::async_trait;
use thiserror::Error as ThisError;
use tokio::sync::{mpsc, watch, Mutex};

use crate::queue::{advance_local, LocalTrackList, Mode, RemoteQueue, RemoteQueueItem};
use crate::source::{Resolution, ResolutionError, TrackSource};

#[derive(Debug, ThisError)]
pub enum SinkError {
    #[error("sink rejected the track: {message}")]
    Rejected { message: String }
}

/// The single audio output. Implementations report back through [`SinkEvent`]s tagged with `generation`.
#[async_trait]
pub trait AudioSink<A: Send + 'static>: Send + Sync {
    async fn play(&self, audio: A, generation: u64) -> Result<(), SinkError>;
    async fn stop(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEventKind {
    Idle,
    Error(String)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEvent {
    pub generation: u64,
    pub kind: SinkEventKind
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Loading,
    Playing
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NowPlaying {
    Local { index: usize, filename: String },
    Remote(RemoteQueueItem)
}

impl NowPlaying {
    pub fn title(&self) -> &str {
        match self {
            NowPlaying::Local { filename, .. } => filename,
            NowPlaying::Remote(item) => &item.title
        }
    }
}

/// What the bot shows as its Discord activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Idle,
    Listening(String),
    WaitingForSongs
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Playing { track: NowPlaying, skipped: Vec<RemoteQueueItem> },
    NoTracks,
    QueueEmpty,
    /// Every candidate within the attempt budget failed to open.
    Exhausted { skipped: Vec<RemoteQueueItem> },
    /// A newer stop, switch or start took over while the stream was opening.
    Superseded,
    /// No sink is attached yet, playback resumes on attach.
    Detached
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeSwitch {
    AlreadyInMode(Mode),
    Switched { mode: Mode, outcome: StartOutcome }
}

#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("not available in {current} mode")]
    WrongMode { current: Mode }
}

#[derive(Debug, ThisError)]
pub enum PlayError {
    #[error("{0}")]
    Control(#[from] ControlError),
    #[error("{0}")]
    Resolution(#[from] ResolutionError),
    #[error("the queue changed while the request was resolving")]
    Superseded
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Added {
    Track(RemoteQueueItem),
    Playlist { title: String, count: usize }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enqueued {
    pub added: Added,
    pub start_needed: bool
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub mode: Mode,
    pub status: PlaybackStatus,
    pub now_playing: Option<NowPlaying>,
    pub queue: Vec<RemoteQueueItem>,
    pub cursor: usize
}

enum Target {
    Local { index: usize, filename: String, path: PathBuf },
    Remote(RemoteQueueItem)
}

struct PlaybackState<A: Send + 'static> {
    mode: Mode,
    local: LocalTrackList,
    cursor: usize,
    queue: RemoteQueue,
    status: PlaybackStatus,
    now_playing: Option<NowPlaying>,
    sink: Option<Arc<dyn AudioSink<A>>>,
    generation: u64,
    epoch: u64,
    interrupted: bool
}

impl<A: Send + 'static> PlaybackState<A> {
    fn go_idle(&mut self) {
        self.status = PlaybackStatus::Idle;
        self.now_playing = None;
    }

    // stops the sink and invalidates whatever it was playing
    async fn halt(&mut self) {
        self.generation += 1;
        if let Some(sink) = &self.sink {
            sink.stop().await;
        }
        self.go_idle();
        self.interrupted = false;
    }
}

pub struct PlaybackController<S: TrackSource> {
    source: S,
    state: Mutex<PlaybackState<S::Audio>>,
    events: mpsc::UnboundedSender<SinkEvent>,
    presence: watch::Sender<Presence>
}

impl<S: TrackSource> PlaybackController<S> {
    /// Starts in local files mode. The receiver must be handed to [`PlaybackController::run`].
    pub fn new(source: S, local: LocalTrackList) -> (Arc<Self>, mpsc::UnboundedReceiver<SinkEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let (presence, _) = watch::channel(Presence::Idle);
        let state = PlaybackState {
            mode: Mode::LocalFiles,
            local,
            cursor: 0,
            queue: RemoteQueue::new(),
            status: PlaybackStatus::Idle,
            now_playing: None,
            sink: None,
            generation: 0,
            epoch: 0,
            interrupted: false
        };
        (Arc::new(Self { source, state: Mutex::new(state), events, presence }), receiver)
    }

    /// Feeds sink events into the state machine until every sender is gone.
    pub async fn run(self: Arc<Self>, mut receiver: mpsc::UnboundedReceiver<SinkEvent>) {
        while let Some(event) = receiver.recv().await {
            self.handle_sink_event(event).await;
        }
        debug!("sink event channel closed");
    }

    pub fn sink_events(&self) -> mpsc::UnboundedSender<SinkEvent> {
        self.events.clone()
    }

    pub fn presence(&self) -> watch::Receiver<Presence> {
        self.presence.subscribe()
    }

    fn publish(&self, presence: Presence) {
        self.presence.send_replace(presence);
    }

    pub async fn mode(&self) -> Mode {
        self.state.lock().await.mode
    }

    pub async fn has_local_tracks(&self) -> bool {
        !self.state.lock().await.local.is_empty()
    }

    pub async fn start(&self) -> StartOutcome {
        let mut skipped = vec![];
        let mut budget: Option<usize> = None;

        loop {
            let (generation, target) = {
                let mut state = self.state.lock().await;
                if state.sink.is_none() {
                    info!("no voice connection yet, playback starts once connected");
                    state.go_idle();
                    state.interrupted = true;
                    return StartOutcome::Detached;
                }

                let target = match state.mode {
                    Mode::LocalFiles => {
                        if state.local.is_empty() {
                            info!("no local tracks to play");
                            state.go_idle();
                            self.publish(Presence::Idle);
                            return StartOutcome::NoTracks;
                        }
                        let remaining = budget.get_or_insert(state.local.len());
                        if *remaining == 0 {
                            error!("none of the {} local tracks could be opened", state.local.len());
                            state.go_idle();
                            self.publish(Presence::Idle);
                            return StartOutcome::Exhausted { skipped };
                        }
                        *remaining -= 1;

                        let index = state.cursor;
                        let (Some(filename), Some(path)) = (state.local.get(index), state.local.path_of(index)) else {
                            // cursor out of range
                            state.cursor = 0;
                            continue;
                        };
                        Target::Local { index, filename: filename.to_owned(), path }
                    },
                    Mode::Remote => {
                        let Some(front) = state.queue.peek_front().cloned() else {
                            info!("youtube queue is empty");
                            state.go_idle();
                            self.publish(Presence::WaitingForSongs);
                            return match skipped.is_empty() {
                                true => StartOutcome::QueueEmpty,
                                false => StartOutcome::Exhausted { skipped }
                            };
                        };
                        let remaining = budget.get_or_insert(state.queue.len());
                        if *remaining == 0 {
                            warn!("gave up after skipping {} unplayable tracks", skipped.len());
                            state.go_idle();
                            self.publish(Presence::WaitingForSongs);
                            return StartOutcome::Exhausted { skipped };
                        }
                        *remaining -= 1;
                        Target::Remote(front)
                    }
                };

                state.generation += 1;
                state.status = PlaybackStatus::Loading;
                state.interrupted = false;
                (state.generation, target)
            };

            let opened = match &target {
                Target::Local { path, .. } => self.source.open_local(path).await,
                Target::Remote(item) => self.source.open_remote(&item.url).await
            };

            let mut state = self.state.lock().await;
            if state.generation != generation {
                debug!("dropping stale stream for generation {generation}");
                return StartOutcome::Superseded;
            }

            let played = match (opened, state.sink.clone()) {
                (Ok(audio), Some(sink)) => sink.play(audio, generation).await.map_err(|err| err.to_string()),
                (Ok(_), None) => Err("sink detached".to_owned()),
                (Err(err), _) => Err(err.to_string())
            };

            match (played, target) {
                (Ok(()), target) => {
                    let track = match target {
                        Target::Local { index, filename, .. } => {
                            state.cursor = advance_local(index, state.local.len()).unwrap_or(0);
                            NowPlaying::Local { index, filename }
                        },
                        Target::Remote(item) => NowPlaying::Remote(item)
                    };
                    info!("Now playing: {}", track.title());
                    state.status = PlaybackStatus::Playing;
                    state.now_playing = Some(track.clone());
                    self.publish(Presence::Listening(track.title().to_owned()));
                    return StartOutcome::Playing { track, skipped };
                },
                (Err(err), Target::Local { index, filename, .. }) => {
                    warn!("error playing local track {filename}: {err}");
                    state.cursor = advance_local(index, state.local.len()).unwrap_or(0);
                },
                (Err(err), Target::Remote(item)) => {
                    warn!("error playing youtube track {}: {err}", item.title);
                    // a concurrent clear may already have removed it
                    if state.queue.peek_front() == Some(&item) {
                        state.queue.pop_front();
                        skipped.push(item);
                    }
                }
            }
        }
    }

    /// Starts playback unless something is already loading or playing. Concurrent callers
    /// see the claimed `Loading` status, so only one of them starts.
    pub async fn start_if_idle(&self) -> Option<StartOutcome> {
        {
            let mut state = self.state.lock().await;
            if state.status != PlaybackStatus::Idle {
                return None;
            }
            state.status = PlaybackStatus::Loading;
        }
        Some(self.start().await)
    }

    /// The sink finished its track on its own.
    pub async fn on_sink_idle(&self) -> StartOutcome {
        {
            let mut state = self.state.lock().await;
            state.go_idle();
            if state.mode == Mode::Remote {
                if let Some(finished) = state.queue.pop_front() {
                    debug!("finished {}", finished.title);
                }
            }
        }
        self.start().await
    }

    pub async fn on_sink_error(&self, err: &str) -> StartOutcome {
        error!("audio player error: {err}");
        self.on_sink_idle().await
    }

    /// Dispatches a sink event if it belongs to the current generation. The generation is
    /// claimed first so a track reporting both an end and an error advances only once.
    pub async fn handle_sink_event(&self, event: SinkEvent) -> Option<StartOutcome> {
        {
            let mut state = self.state.lock().await;
            if event.generation != state.generation {
                debug!("ignoring stale sink event {:?}", event);
                return None;
            }
            state.generation += 1;
        }
        Some(match event.kind {
            SinkEventKind::Idle => self.on_sink_idle().await,
            SinkEventKind::Error(err) => self.on_sink_error(&err).await
        })
    }

    /// Halts the sink. The queue is left alone.
    pub async fn stop(&self) {
        self.state.lock().await.halt().await;
    }

    pub async fn switch_mode(&self, mode: Mode) -> ModeSwitch {
        {
            let mut state = self.state.lock().await;
            if state.mode == mode {
                return ModeSwitch::AlreadyInMode(mode);
            }
            info!("switching from {} to {} mode", state.mode, mode);
            state.mode = mode;
            state.epoch += 1;
            if mode == Mode::LocalFiles {
                state.queue.clear();
            }
            state.halt().await;
        }
        let outcome = self.start().await;
        ModeSwitch::Switched { mode, outcome }
    }

    /// Resolves `query` and appends the result. Resolution runs without holding the state,
    /// and its result is discarded if a clear or mode switch happened in the meantime.
    pub async fn enqueue_query(&self, query: &str, requester: &str) -> Result<Enqueued, PlayError> {
        let epoch = {
            let state = self.state.lock().await;
            if state.mode != Mode::Remote {
                return Err(ControlError::WrongMode { current: state.mode }.into());
            }
            state.epoch
        };

        let resolution = self.source.resolve(query).await?;

        let mut state = self.state.lock().await;
        if state.epoch != epoch || state.mode != Mode::Remote {
            info!("discarding resolved request {query:?}, the queue changed meanwhile");
            return Err(PlayError::Superseded);
        }

        let added = match resolution {
            Resolution::Single(item) => {
                let item = item.requested_by(requester);
                state.queue.enqueue([item.clone()]);
                Added::Track(item)
            },
            Resolution::Playlist { title, items } => {
                let count = items.len();
                state.queue.enqueue(items.into_iter().map(|item| item.requested_by(requester)));
                Added::Playlist { title, count }
            }
        };
        Ok(Enqueued { added, start_needed: state.status == PlaybackStatus::Idle })
    }

    /// Ends the current track so the sink's end event moves playback forward.
    /// In local mode the cursor is advanced first.
    pub async fn skip(&self) {
        let mut state = self.state.lock().await;
        if state.mode == Mode::LocalFiles {
            if let Ok(next) = advance_local(state.cursor, state.local.len()) {
                state.cursor = next;
            }
        }
        if let Some(sink) = &state.sink {
            sink.stop().await;
        }
    }

    pub async fn clear(&self) -> Result<(), ControlError> {
        let mut state = self.state.lock().await;
        if state.mode != Mode::Remote {
            return Err(ControlError::WrongMode { current: state.mode });
        }
        state.queue.clear();
        state.epoch += 1;
        state.halt().await;
        self.publish(Presence::WaitingForSongs);
        Ok(())
    }

    pub async fn now_playing(&self) -> Option<NowPlaying> {
        let state = self.state.lock().await;
        match state.status {
            PlaybackStatus::Playing => state.now_playing.clone(),
            _ => None
        }
    }

    pub async fn snapshot(&self) -> PlaybackSnapshot {
        let state = self.state.lock().await;
        PlaybackSnapshot {
            mode: state.mode,
            status: state.status,
            now_playing: state.now_playing.clone().filter(|_| state.status == PlaybackStatus::Playing),
            queue: state.queue.iter().cloned().collect(),
            cursor: state.cursor
        }
    }

    pub async fn attach_sink(&self, sink: Arc<dyn AudioSink<S::Audio>>) {
        self.state.lock().await.sink = Some(sink);
    }

    /// Drops the sink. Returns whether a track was cut off, in which case [`PlaybackController::resume`] replays it.
    pub async fn detach_sink(&self) -> bool {
        let mut state = self.state.lock().await;
        state.generation += 1;
        if state.sink.take().is_none() {
            return false;
        }
        if state.status != PlaybackStatus::Idle {
            state.interrupted = true;
            state.status = PlaybackStatus::Idle;
        }
        state.interrupted
    }

    /// Replays whatever was cut off by a detach, or whatever could not start without a sink.
    pub async fn resume(&self) -> Option<StartOutcome> {
        {
            let mut state = self.state.lock().await;
            if !state.interrupted {
                return None;
            }
            if let (Mode::LocalFiles, Some(NowPlaying::Local { index, .. })) = (state.mode, &state.now_playing) {
                state.cursor = *index;
            }
        }
        Some(self.start().await)
    }
}
