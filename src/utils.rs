use crate::playback::{Added, ModeSwitch, NowPlaying, PlayError, PlaybackSnapshot, StartOutcome};
use crate::queue::{Mode, RemoteQueueItem};
use crate::source::ResolutionError;

const QUEUE_PREVIEW_LEN: usize = 10;

pub fn mode_reply(switch: &ModeSwitch) -> String {
    match switch {
        ModeSwitch::AlreadyInMode(mode) => format!("Already in {mode} mode."),
        ModeSwitch::Switched { mode: Mode::LocalFiles, outcome: StartOutcome::NoTracks } =>
            "Switched to local files mode, but no MP3 files found in the music directory.".to_owned(),
        ModeSwitch::Switched { mode: Mode::LocalFiles, .. } => "Switched to local files mode. Playing local MP3 files.".to_owned(),
        ModeSwitch::Switched { mode: Mode::Remote, .. } => "Switched to YouTube mode. Use `/play` to add songs or playlists.".to_owned()
    }
}

pub fn wrong_mode_play_reply() -> String {
    "The bot is currently in local files mode. Use `/mode youtube` to switch to YouTube mode.".to_owned()
}

pub fn added_reply(added: &Added) -> String {
    match added {
        Added::Track(item) => format!("Added to queue: {}", item.title),
        Added::Playlist { title, count } => format!("Added {count} tracks from playlist: {title}")
    }
}

pub fn play_error_reply(err: &PlayError) -> String {
    match err {
        PlayError::Control(_) => wrong_mode_play_reply(),
        PlayError::Resolution(ResolutionError::NoResults { .. }) => "No results found for your search query.".to_owned(),
        _ => "An error occurred while processing your request.".to_owned()
    }
}

fn queue_line(position: usize, item: &RemoteQueueItem) -> String {
    format!("{}. {} (requested by {})", position, item.title, item.requester)
}

pub fn queue_reply(snapshot: &PlaybackSnapshot) -> String {
    match snapshot.mode {
        Mode::LocalFiles => {
            let current = snapshot.now_playing.as_ref().map(NowPlaying::title).unwrap_or("None");
            format!("Playing local files. Current: {current}")
        },
        Mode::Remote if snapshot.queue.is_empty() => "The queue is empty.".to_owned(),
        Mode::Remote => {
            let mut reply = "**Current Queue:**".to_owned();
            for (i, item) in snapshot.queue.iter().take(QUEUE_PREVIEW_LEN).enumerate() {
                reply.push('\n');
                reply.push_str(&queue_line(i + 1, item));
            }
            if snapshot.queue.len() > QUEUE_PREVIEW_LEN {
                reply.push_str(&format!("\n... and {} more", snapshot.queue.len() - QUEUE_PREVIEW_LEN));
            }
            reply
        }
    }
}

pub fn now_playing_reply(now_playing: Option<&NowPlaying>) -> String {
    match now_playing {
        None => "Nothing is currently playing.".to_owned(),
        Some(NowPlaying::Local { filename, .. }) => format!("Now playing: {filename} (Local File)"),
        Some(NowPlaying::Remote(item)) => format!("Now playing: {} (requested by {})", item.title, item.requester)
    }
}

pub fn clear_reply(cleared: bool) -> String {
    match cleared {
        true => "Queue cleared.".to_owned(),
        false => "Clear command only works in YouTube mode.".to_owned()
    }
}

pub fn rejoin_reply(rejoined: bool) -> String {
    match rejoined {
        true => "Successfully rejoined the voice channel.".to_owned(),
        false => "Failed to rejoin the voice channel.".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{ControlError, PlaybackStatus};

    fn track(n: usize) -> RemoteQueueItem {
        RemoteQueueItem { url: format!("https://youtu.be/{n}"), title: format!("Song {n}"), requester: "alice".to_owned() }
    }

    fn snapshot(mode: Mode, queue: Vec<RemoteQueueItem>, now_playing: Option<NowPlaying>) -> PlaybackSnapshot {
        PlaybackSnapshot { mode, status: PlaybackStatus::Idle, now_playing, queue, cursor: 0 }
    }

    #[test]
    fn mode_replies() {
        assert_eq!(mode_reply(&ModeSwitch::AlreadyInMode(Mode::Remote)), "Already in youtube mode.");
        assert_eq!(mode_reply(&ModeSwitch::AlreadyInMode(Mode::LocalFiles)), "Already in local mode.");
        assert_eq!(
            mode_reply(&ModeSwitch::Switched { mode: Mode::LocalFiles, outcome: StartOutcome::NoTracks }),
            "Switched to local files mode, but no MP3 files found in the music directory."
        );
        assert_eq!(
            mode_reply(&ModeSwitch::Switched { mode: Mode::LocalFiles, outcome: StartOutcome::Detached }),
            "Switched to local files mode. Playing local MP3 files."
        );
        assert_eq!(
            mode_reply(&ModeSwitch::Switched { mode: Mode::Remote, outcome: StartOutcome::QueueEmpty }),
            "Switched to YouTube mode. Use `/play` to add songs or playlists."
        );
    }

    #[test]
    fn play_replies() {
        assert_eq!(added_reply(&Added::Track(track(1))), "Added to queue: Song 1");
        assert_eq!(added_reply(&Added::Playlist { title: "Mix".to_owned(), count: 3 }), "Added 3 tracks from playlist: Mix");
        assert_eq!(
            play_error_reply(&PlayError::Resolution(ResolutionError::NoResults { query: "zzz".to_owned() })),
            "No results found for your search query."
        );
        assert_eq!(play_error_reply(&PlayError::Superseded), "An error occurred while processing your request.");
        assert_eq!(play_error_reply(&PlayError::Control(ControlError::WrongMode { current: Mode::LocalFiles })), wrong_mode_play_reply());
    }

    #[test]
    fn queue_lists_first_ten() {
        let reply = queue_reply(&snapshot(Mode::Remote, (1..=12).map(track).collect(), None));
        let lines = reply.lines().collect::<Vec<&str>>();
        assert_eq!(lines[0], "**Current Queue:**");
        assert_eq!(lines[1], "1. Song 1 (requested by alice)");
        assert_eq!(lines[10], "10. Song 10 (requested by alice)");
        assert_eq!(lines[11], "... and 2 more");
        assert_eq!(lines.len(), 12);
    }

    #[test]
    fn short_queue_has_no_overflow_line() {
        let reply = queue_reply(&snapshot(Mode::Remote, vec![track(1)], None));
        assert_eq!(reply, "**Current Queue:**\n1. Song 1 (requested by alice)");
        assert_eq!(queue_reply(&snapshot(Mode::Remote, vec![], None)), "The queue is empty.");
    }

    #[test]
    fn local_queue_shows_current_file() {
        let playing = NowPlaying::Local { index: 0, filename: "a.mp3".to_owned() };
        assert_eq!(queue_reply(&snapshot(Mode::LocalFiles, vec![], Some(playing))), "Playing local files. Current: a.mp3");
        assert_eq!(queue_reply(&snapshot(Mode::LocalFiles, vec![], None)), "Playing local files. Current: None");
    }

    #[test]
    fn now_playing_replies() {
        assert_eq!(now_playing_reply(None), "Nothing is currently playing.");
        let local = NowPlaying::Local { index: 1, filename: "b.mp3".to_owned() };
        assert_eq!(now_playing_reply(Some(&local)), "Now playing: b.mp3 (Local File)");
        assert_eq!(now_playing_reply(Some(&NowPlaying::Remote(track(4)))), "Now playing: Song 4 (requested by alice)");
    }
}
