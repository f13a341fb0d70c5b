use std::path::Path;

use serenity::async_trait;
use songbird::input::{File, HttpRequest, Input};

use crate::convert_query::{extract_media_type, MediaType};
use crate::scrapers;
use super::{Resolution, ResolutionError, ResolvedItem, StreamError, TrackSource};

/// Songbird-backed source: local files through symphonia, remote audio over http.
pub struct YouTubeSource {
    client: reqwest::Client
}

impl YouTubeSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for YouTubeSource {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

fn audio_quality_rank(audio_quality: &str) -> u8 {
    match audio_quality {
        "AUDIO_QUALITY_HIGH" => 3,
        "AUDIO_QUALITY_MEDIUM" => 2,
        "AUDIO_QUALITY_LOW" => 1,
        _ => 0
    }
}

async fn find_audio_format(url: &str) -> Result<String, StreamError> {
    let video = rusty_ytdl::Video::new(url)?;
    let video_basic_info = video.get_basic_info().await?;

    let best = video_basic_info.formats.into_iter()
        .filter(|format| format.has_audio && !format.has_video)
        .max_by_key(|format| format.audio_quality.as_deref().map(audio_quality_rank).unwrap_or(0));

    match best {
        Some(format) => Ok(format.url),
        None => {
            log::warn!("no audio-only format for {url}");
            Err(StreamError::NoAudioFormat { url: url.to_owned() })
        }
    }
}

fn stream_headers() -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(reqwest::header::USER_AGENT, reqwest::header::HeaderValue::from_static("Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:129.0) Gecko/20100101 Firefox/129.0"));
    headers.insert(reqwest::header::CONNECTION, reqwest::header::HeaderValue::from_static("keep-alive"));
    headers.insert(reqwest::header::ACCEPT_LANGUAGE, reqwest::header::HeaderValue::from_static("en-US,en;q=0.5"));
    headers
}

#[async_trait]
impl TrackSource for YouTubeSource {
    type Audio = Input;

    async fn open_local(&self, path: &Path) -> Result<Input, StreamError> {
        if !tokio::fs::try_exists(path).await? {
            return Err(StreamError::NotFound { path: path.to_path_buf() });
        }
        Ok(File::new(path.to_path_buf()).into())
    }

    async fn open_remote(&self, url: &str) -> Result<Input, StreamError> {
        let stream_url = find_audio_format(url).await?;
        Ok(HttpRequest::new_with_headers(self.client.clone(), stream_url, stream_headers()).into())
    }

    async fn resolve(&self, query: &str) -> Result<Resolution, ResolutionError> {
        Ok(match extract_media_type(query) {
            MediaType::YouTubePlaylist { playlist_id } => {
                let playlist = scrapers::youtube::playlist(&self.client, &playlist_id).await?;
                let items = playlist.videos.iter()
                    .map(|video| ResolvedItem { url: video.short_url(), title: video.title.clone() })
                    .collect();
                Resolution::Playlist { title: playlist.title, items }
            },
            MediaType::YouTubeVideo { url } => {
                let video = rusty_ytdl::Video::new(url.as_str())?;
                let title = video.get_basic_info().await?.video_details.title;
                Resolution::Single(ResolvedItem { url, title })
            },
            MediaType::Search { query } => {
                match scrapers::youtube::search(&self.client, &query).await {
                    Ok(video) => Resolution::Single(ResolvedItem { url: video.watch_url(), title: video.title }),
                    Err(scrapers::youtube::YoutubeScrapeError::VideoId) => return Err(ResolutionError::NoResults { query }),
                    Err(err) => return Err(err.into())
                }
            }
        })
    }
}
