//! In-memory stand-ins for the audio sink, the track source and the voice transport.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serenity::async_trait;
use tokio::sync::{mpsc, Notify};

use crate::playback::{AudioSink, SinkError};
use crate::queue::{LocalTrackList, RemoteQueueItem};
use crate::source::{Resolution, ResolutionError, ResolvedItem, StreamError, TrackSource};
use crate::voice::{TransportError, TransportEvent, VoiceTransport};

pub fn item(name: &str) -> RemoteQueueItem {
    RemoteQueueItem { url: name.to_owned(), title: name.to_owned(), requester: "alice".to_owned() }
}

impl From<RemoteQueueItem> for ResolvedItem {
    fn from(value: RemoteQueueItem) -> Self {
        ResolvedItem { url: value.url, title: value.title }
    }
}

pub fn local_list(names: &[&str]) -> LocalTrackList {
    LocalTrackList::new("music", names.iter().map(|name| name.to_string()).collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Played {
    Local(String),
    Remote(String)
}

/// Pauses the first call that hits it until released.
#[derive(Clone, Default)]
pub struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>
}

impl Gate {
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[derive(Clone, Default)]
pub struct FakeSource {
    resolutions: Arc<Mutex<HashMap<String, Resolution>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    opened: Arc<Mutex<Vec<String>>>,
    open_gate: Arc<Mutex<Option<Gate>>>,
    resolve_gate: Arc<Mutex<Option<Gate>>>
}

impl FakeSource {
    /// Opening `key` (a url, or a local path like `music/a.mp3`) fails.
    pub fn failing(self, key: &str) -> Self {
        self.failing.lock().unwrap().insert(key.to_owned());
        self
    }

    pub fn resolves(&self, query: &str, resolution: Resolution) {
        self.resolutions.lock().unwrap().insert(query.to_owned(), resolution);
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn gate_open(&self) -> Gate {
        let gate = Gate::default();
        *self.open_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn gate_resolve(&self) -> Gate {
        let gate = Gate::default();
        *self.resolve_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    async fn open(&self, key: String, audio: Played) -> Result<Played, StreamError> {
        self.opened.lock().unwrap().push(key.clone());
        let gate = self.open_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if self.failing.lock().unwrap().contains(&key) {
            return Err(StreamError::NoAudioFormat { url: key });
        }
        Ok(audio)
    }
}

#[async_trait]
impl TrackSource for FakeSource {
    type Audio = Played;

    async fn open_local(&self, path: &Path) -> Result<Played, StreamError> {
        let filename = path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        self.open(path.to_string_lossy().into_owned(), Played::Local(filename)).await
    }

    async fn open_remote(&self, url: &str) -> Result<Played, StreamError> {
        self.open(url.to_owned(), Played::Remote(url.to_owned())).await
    }

    async fn resolve(&self, query: &str) -> Result<Resolution, ResolutionError> {
        let gate = self.resolve_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        self.resolutions.lock().unwrap().get(query).cloned()
            .ok_or(ResolutionError::NoResults { query: query.to_owned() })
    }
}

#[derive(Default)]
pub struct FakeSink {
    played: Mutex<Vec<(Played, u64)>>,
    stops: AtomicUsize
}

impl FakeSink {
    pub fn played(&self) -> Vec<Played> {
        self.played.lock().unwrap().iter().map(|(played, _)| played.clone()).collect()
    }

    pub fn played_local(&self) -> Vec<String> {
        self.played().into_iter()
            .filter_map(|played| match played {
                Played::Local(name) => Some(name),
                Played::Remote(_) => None
            })
            .collect()
    }

    pub fn last_generation(&self) -> Option<u64> {
        self.played.lock().unwrap().last().map(|(_, generation)| *generation)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioSink<Played> for FakeSink {
    async fn play(&self, audio: Played, generation: u64) -> Result<(), SinkError> {
        self.played.lock().unwrap().push((audio, generation));
        Ok(())
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records joins and leaves; joins fail while `failures` is above zero.
#[derive(Default)]
pub struct FakeTransport {
    joins: AtomicUsize,
    leaves: AtomicUsize,
    failures: AtomicUsize,
    sinks: Mutex<Vec<Arc<FakeSink>>>,
    events: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
    join_gate: Mutex<Option<Gate>>
}

impl FakeTransport {
    pub fn failing_joins(failures: usize) -> Self {
        let transport = Self::default();
        transport.failures.store(failures, Ordering::SeqCst);
        transport
    }

    pub fn set_failures(&self, failures: usize) {
        self.failures.store(failures, Ordering::SeqCst);
    }

    /// Holds the next join after it has decided whether to fail.
    pub fn gate_join(&self) -> Gate {
        let gate = Gate::default();
        *self.join_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn joins(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }

    pub fn leaves(&self) -> usize {
        self.leaves.load(Ordering::SeqCst)
    }

    pub fn last_sink(&self) -> Option<Arc<FakeSink>> {
        self.sinks.lock().unwrap().last().cloned()
    }

    pub fn sinks(&self) -> usize {
        self.sinks.lock().unwrap().len()
    }

    /// Sender the manager handed to the most recent join.
    pub fn events(&self) -> Option<mpsc::UnboundedSender<TransportEvent>> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl VoiceTransport for FakeTransport {
    type Audio = Played;

    async fn join(&self, _session: u64, events: mpsc::UnboundedSender<TransportEvent>) -> Result<Arc<dyn AudioSink<Played>>, TransportError> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        let failed = self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1)).is_ok();
        let gate = self.join_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if failed {
            return Err(TransportError::Join { message: "gateway unreachable".to_owned() });
        }
        *self.events.lock().unwrap() = Some(events);
        let sink = Arc::new(FakeSink::default());
        self.sinks.lock().unwrap().push(sink.clone());
        Ok(sink)
    }

    async fn leave(&self) {
        self.leaves.fetch_add(1, Ordering::SeqCst);
    }
}
