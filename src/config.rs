use std::path::PathBuf;

use serenity::model::id::{ApplicationId, ChannelId, GuildId};

use crate::error::AppError;

pub static DISCORD_TOKEN_ENV: &str = "DISCORD_BOT_TOKEN";
pub static GUILD_ID_ENV: &str = "GUILD_ID";
pub static VOICE_CHANNEL_ID_ENV: &str = "VOICE_CHANNEL_ID";
pub static APPLICATION_ID_ENV: &str = "APPLICATION_ID";
pub static MUSIC_DIR_ENV: &str = "MUSIC_DIR";

const TOKEN_MIN_LEN: usize = 16;
const ID_MIN_LEN: usize = 8;
const DEFAULT_MUSIC_DIR: &str = "music";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub token: String,
    pub guild_id: GuildId,
    pub voice_channel_id: ChannelId,
    pub application_id: ApplicationId,
    pub music_dir: PathBuf
}

impl BotConfig {
    /// Loads `.env` when present and validates the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        if let Err(err) = dotenv::dotenv() {
            // a missing file is fine, a broken one is not
            if !err.not_found() { return Err(AppError::EnvFile); }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where F: Fn(&str) -> Option<String> {
        // empty strings are treated as unset
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let token = required(&get, DISCORD_TOKEN_ENV, TOKEN_MIN_LEN)?;
        let guild_id = GuildId::new(required_id(&get, GUILD_ID_ENV)?);
        let voice_channel_id = ChannelId::new(required_id(&get, VOICE_CHANNEL_ID_ENV)?);
        let application_id = ApplicationId::new(required_id(&get, APPLICATION_ID_ENV)?);
        let music_dir = get(MUSIC_DIR_ENV).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_MUSIC_DIR));

        Ok(Self { token, guild_id, voice_channel_id, application_id, music_dir })
    }
}

fn required<F>(get: &F, entry: &str, min: usize) -> Result<String, AppError>
where F: Fn(&str) -> Option<String> {
    let value = get(entry).ok_or(AppError::MissingEnvEntry { entry: entry.to_owned() })?;
    if value.chars().count() < min {
        return Err(AppError::EnvEntryTooShort { entry: entry.to_owned(), min });
    }
    Ok(value)
}

fn required_id<F>(get: &F, entry: &str) -> Result<u64, AppError>
where F: Fn(&str) -> Option<String> {
    let value = required(get, entry, ID_MIN_LEN)?;
    match value.trim().parse::<u64>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(AppError::MalformedId { entry: entry.to_owned() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn valid() -> HashMap<String, String> {
        env(&[
            (DISCORD_TOKEN_ENV, "abcdefghijklmnopqrstuvwxyz"),
            (GUILD_ID_ENV, "883721114604404757"),
            (VOICE_CHANNEL_ID_ENV, "883721114604404758"),
            (APPLICATION_ID_ENV, "883721114604404759"),
        ])
    }

    #[test]
    fn loads_valid_environment() {
        let vars = valid();
        let config = BotConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
        assert_eq!(config.guild_id, GuildId::new(883721114604404757));
        assert_eq!(config.voice_channel_id, ChannelId::new(883721114604404758));
        assert_eq!(config.application_id, ApplicationId::new(883721114604404759));
        assert_eq!(config.music_dir, PathBuf::from("music"));
    }

    #[test]
    fn music_dir_override() {
        let mut vars = valid();
        vars.insert(MUSIC_DIR_ENV.to_owned(), "/srv/tracks".to_owned());
        let config = BotConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
        assert_eq!(config.music_dir, PathBuf::from("/srv/tracks"));
    }

    #[test]
    fn short_token_is_rejected() {
        let mut vars = valid();
        vars.insert(DISCORD_TOKEN_ENV.to_owned(), "short".to_owned());
        let err = BotConfig::from_lookup(|key| vars.get(key).cloned()).unwrap_err();
        assert_eq!(err, AppError::EnvEntryTooShort { entry: DISCORD_TOKEN_ENV.to_owned(), min: 16 });
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut vars = valid();
        vars.insert(GUILD_ID_ENV.to_owned(), String::new());
        let err = BotConfig::from_lookup(|key| vars.get(key).cloned()).unwrap_err();
        assert_eq!(err, AppError::MissingEnvEntry { entry: GUILD_ID_ENV.to_owned() });
    }

    #[test]
    fn non_numeric_id_is_malformed() {
        let mut vars = valid();
        vars.insert(VOICE_CHANNEL_ID_ENV.to_owned(), "not-a-channel".to_owned());
        let err = BotConfig::from_lookup(|key| vars.get(key).cloned()).unwrap_err();
        assert_eq!(err, AppError::MalformedId { entry: VOICE_CHANNEL_ID_ENV.to_owned() });
    }

    #[test]
    fn short_id_is_rejected_before_parsing() {
        let mut vars = valid();
        vars.insert(APPLICATION_ID_ENV.to_owned(), "1234".to_owned());
        let err = BotConfig::from_lookup(|key| vars.get(key).cloned()).unwrap_err();
        assert_eq!(err, AppError::EnvEntryTooShort { entry: APPLICATION_ID_ENV.to_owned(), min: 8 });
    }
}
