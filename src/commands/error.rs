use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CommandError {
    #[error("voice manager doesn't exist")]
    NoVoiceManager,
    #[error("{0}")]
    Serenity(#[from] serenity::Error)
}
