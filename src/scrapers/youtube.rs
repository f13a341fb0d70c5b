use reqwest::{Client, Url, Method};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{escaped, is_not, tag, take_until},
    character::complete::anychar,
    combinator::{map, opt},
    sequence::{delimited, preceded}
};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum YoutubeScrapeError {
    #[error("no video found on the results page")]
    VideoId,
    #[error("could not find a title next to video {video_id}")]
    Title { video_id: String },
    #[error("playlist page has no videos")]
    EmptyPlaylist,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("bad url: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedVideo {
    pub video_id: String,
    pub title: String
}

impl ScrapedVideo {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.video_id)
    }

    pub fn short_url(&self) -> String {
        format!("https://youtu.be/{}", self.video_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPlaylist {
    pub title: String,
    pub videos: Vec<ScrapedVideo>
}

// contents of a json string literal, escapes left in place
fn json_string(input: &str) -> IResult<&str, &str> {
    delimited(
        tag("\""),
        map(opt(escaped(is_not("\\\""), '\\', anychar)), |s| s.unwrap_or("")),
        tag("\"")
    )(input)
}

fn parse_video_id(input: &str) -> IResult<&str, &str> {
    preceded(preceded(take_until("\"videoId\":"), tag("\"videoId\":")), json_string)(input)
}

// first "title" key holding either a runs array or a simpleText
fn parse_title(mut input: &str) -> IResult<&str, &str> {
    loop {
        let (rest, _) = preceded(take_until("\"title\":"), tag("\"title\":"))(input)?;
        let title: IResult<&str, &str> = alt((
            preceded(tag("{\"runs\":[{\"text\":"), json_string),
            preceded(tag("{\"simpleText\":"), json_string)
        ))(rest);
        match title {
            Ok(parsed) => return Ok(parsed),
            Err(_) => input = rest
        }
    }
}

fn parse_search_result(input: &str) -> IResult<&str, &str> {
    preceded(take_until("\"videoRenderer\":"), parse_video_id)(input)
}

fn parse_playlist_entry(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, video_id) = preceded(take_until("\"playlistVideoRenderer\":"), parse_video_id)(input)?;
    let (input, title) = parse_title(input)?;
    Ok((input, (video_id, title)))
}

fn parse_playlist_title(input: &str) -> IResult<&str, &str> {
    preceded(
        take_until("\"playlistMetadataRenderer\":"),
        preceded(preceded(take_until("\"title\":"), tag("\"title\":")), json_string)
    )(input)
}

fn decode(raw: &str) -> String {
    serde_json::from_str(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_owned())
}

fn parse_search_page(doc: &str) -> Result<ScrapedVideo, YoutubeScrapeError> {
    let (rest, video_id) = parse_search_result(doc).map_err(|_| YoutubeScrapeError::VideoId)?;
    let (_, title) = parse_title(rest).map_err(|_| YoutubeScrapeError::Title { video_id: video_id.to_owned() })?;
    Ok(ScrapedVideo { video_id: video_id.to_owned(), title: decode(title) })
}

fn parse_playlist_page(doc: &str) -> Result<ScrapedPlaylist, YoutubeScrapeError> {
    let title = parse_playlist_title(doc).map(|(_, title)| decode(title)).unwrap_or_else(|_| "Unknown Playlist".to_owned());

    let mut videos = vec![];
    let mut rest = doc;
    while let Ok((next, (video_id, raw_title))) = parse_playlist_entry(rest) {
        videos.push(ScrapedVideo { video_id: video_id.to_owned(), title: decode(raw_title) });
        rest = next;
    }

    if videos.is_empty() { return Err(YoutubeScrapeError::EmptyPlaylist); }
    Ok(ScrapedPlaylist { title, videos })
}

async fn fetch(client: &Client, url: Url, query: &[(&str, &str)]) -> Result<String, YoutubeScrapeError> {
    let request = client.request(Method::GET, url)
        .query(query)
        .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
        .build()?;
    Ok(client.execute(request).await?.error_for_status()?.text().await?)
}

/// First video on YouTube's results page for `query`.
pub async fn search(client: &Client, query: &str) -> Result<ScrapedVideo, YoutubeScrapeError> {
    let url = Url::parse("https://www.youtube.com/results")?;
    let doc = fetch(client, url, &[("search_query", query)]).await?;
    parse_search_page(&doc)
}

/// Title and videos (in playlist order) listed on the first page of a playlist.
pub async fn playlist(client: &Client, playlist_id: &str) -> Result<ScrapedPlaylist, YoutubeScrapeError> {
    let url = Url::parse("https://www.youtube.com/playlist")?;
    let doc = fetch(client, url, &[("list", playlist_id)]).await?;
    parse_playlist_page(&doc)
}
