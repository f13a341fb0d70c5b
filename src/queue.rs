use std::collections::VecDeque;
use std::path::PathBuf;
use thiserror::Error as ThisError;

/// Extension a file must carry to be picked up by [`LocalTrackList::scan`].
pub const LOCAL_TRACK_EXTENSION: &str = ".mp3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    LocalFiles,
    Remote
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::LocalFiles => write!(f, "local"),
            Mode::Remote => write!(f, "youtube")
        }
    }
}

#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("no tracks")]
    NoTracks
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteQueueItem {
    pub url: String,
    pub title: String,
    pub requester: String
}

/// FIFO of remote play requests. The front item is the one playing (or about to).
#[derive(Debug, Clone, Default)]
pub struct RemoteQueue {
    items: VecDeque<RemoteQueueItem>
}

impl RemoteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue<I: IntoIterator<Item = RemoteQueueItem>>(&mut self, items: I) {
        self.items.extend(items);
    }

    pub fn peek_front(&self) -> Option<&RemoteQueueItem> {
        self.items.front()
    }

    // popping an empty queue is a no-op
    pub fn pop_front(&mut self) -> Option<RemoteQueueItem> {
        self.items.pop_front()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteQueueItem> {
        self.items.iter()
    }
}

pub fn advance_local(cursor: usize, length: usize) -> Result<usize, QueueError> {
    if length == 0 { return Err(QueueError::NoTracks); }
    Ok((cursor + 1) % length)
}

/// Filenames found in the music directory at startup. Never changes afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalTrackList {
    dir: PathBuf,
    tracks: Vec<String>
}

impl LocalTrackList {
    pub fn new(dir: impl Into<PathBuf>, tracks: Vec<String>) -> Self {
        Self { dir: dir.into(), tracks }
    }

    /// Lists the `.mp3` files of `dir`, sorted by name. An unreadable directory yields an empty list.
    pub fn scan(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let tracks = match std::fs::read_dir(&dir) {
            Ok(entries) => {
                let mut tracks = entries
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| entry.file_type().map(|kind| kind.is_file()).unwrap_or(false))
                    .filter_map(|entry| entry.file_name().into_string().ok())
                    .filter(|name| name.ends_with(LOCAL_TRACK_EXTENSION))
                    .collect::<Vec<String>>();
                tracks.sort();
                tracks
            },
            Err(err) => {
                log::error!("error loading local tracks from {}: {}", dir.display(), err);
                vec![]
            }
        };

        if tracks.is_empty() {
            log::warn!("no MP3 files found in the music directory {}", dir.display());
        } else {
            log::info!("loaded {} local tracks from {}", tracks.len(), dir.display());
        }
        Self { dir, tracks }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.tracks.get(index).map(|name| name.as_str())
    }

    pub fn path_of(&self, index: usize) -> Option<PathBuf> {
        self.get(index).map(|name| self.dir.join(name))
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
