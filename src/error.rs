use thiserror::Error as ThisError;

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("could not load the .env file")]
    EnvFile,
    #[error("missing environment variable {entry}")]
    MissingEnvEntry { entry: String },
    #[error("environment variable {entry} must be at least {min} characters long")]
    EnvEntryTooShort { entry: String, min: usize },
    #[error("environment variable {entry} is not a valid discord id")]
    MalformedId { entry: String },
    #[error("discord client failed: {message}")]
    Client { message: String }
}

impl From<serenity::Error> for AppError {
    fn from(value: serenity::Error) -> Self {
        Self::Client { message: value.to_string() }
    }
}
