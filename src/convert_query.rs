use url::Url;

const PLAYLIST_ID_PREFIXES: [&str; 6] = ["PL", "UU", "LL", "FL", "RD", "OL"];
const PLAYLIST_ID_MIN_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaType {
    YouTubePlaylist { playlist_id: String },
    YouTubeVideo { url: String },
    Search { query: String }
}

/// Sorts user input into a playlist, a direct video or a search query.
/// A `list` parameter wins over `v` when a url carries both.
pub fn extract_media_type(query: &str) -> MediaType {
    let query = query.trim();
    if let Some(playlist_id) = playlist_id(query) {
        return MediaType::YouTubePlaylist { playlist_id };
    }
    if query.contains("youtube.com") || query.contains("youtu.be") {
        return MediaType::YouTubeVideo { url: query.to_owned() };
    }
    MediaType::Search { query: query.to_owned() }
}

fn playlist_id(query: &str) -> Option<String> {
    match Url::parse(query) {
        Ok(url) => {
            let domain = url.domain()?;
            if !is_youtube_domain(domain) { return None; }
            url.query_pairs()
                .find(|pair| pair.0 == "list")
                .map(|pair| pair.1.into_owned())
                .filter(|id| is_playlist_id(id))
        },
        Err(_) => is_playlist_id(query).then(|| query.to_owned())
    }
}

fn is_youtube_domain(domain: &str) -> bool {
    matches!(domain, "www.youtube.com" | "youtube.com" | "m.youtube.com" | "music.youtube.com" | "www.youtu.be" | "youtu.be")
}

fn is_playlist_id(candidate: &str) -> bool {
    candidate.len() >= PLAYLIST_ID_MIN_LEN
        && PLAYLIST_ID_PREFIXES.iter().any(|prefix| candidate.starts_with(prefix))
        && candidate.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
