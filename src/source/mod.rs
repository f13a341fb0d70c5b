//! Where playable audio comes from: files in the music directory or YouTube streams.

pub mod youtube;

use std::path::{Path, PathBuf};

use serenity::async_trait;
use thiserror::Error as ThisError;

use crate::queue::RemoteQueueItem;
use crate::scrapers::youtube::YoutubeScrapeError;

#[derive(Debug, ThisError)]
pub enum ResolutionError {
    #[error("no results for {query}")]
    NoResults { query: String },
    #[error("could not read video info: {0}")]
    VideoInfo(#[from] rusty_ytdl::VideoError),
    #[error("{0}")]
    Scrape(#[from] YoutubeScrapeError)
}

#[derive(Debug, ThisError)]
pub enum StreamError {
    #[error("{} not found", path.display())]
    NotFound { path: PathBuf },
    #[error("could not read video info: {0}")]
    VideoInfo(#[from] rusty_ytdl::VideoError),
    #[error("no audio-only format for {url}")]
    NoAudioFormat { url: String },
    #[error("{0}")]
    Io(#[from] std::io::Error)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedItem {
    pub url: String,
    pub title: String
}

impl ResolvedItem {
    pub fn requested_by(self, requester: &str) -> RemoteQueueItem {
        RemoteQueueItem { url: self.url, title: self.title, requester: requester.to_owned() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Single(ResolvedItem),
    Playlist { title: String, items: Vec<ResolvedItem> }
}

/// Turns local paths and remote urls into audio the sink can play, and user input into queue entries.
#[async_trait]
pub trait TrackSource: Send + Sync + 'static {
    type Audio: Send + 'static;

    async fn open_local(&self, path: &Path) -> Result<Self::Audio, StreamError>;
    async fn open_remote(&self, url: &str) -> Result<Self::Audio, StreamError>;
    async fn resolve(&self, query: &str) -> Result<Resolution, ResolutionError>;
}
