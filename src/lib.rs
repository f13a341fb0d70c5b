pub mod error;
pub mod config;
pub mod queue;
pub mod convert_query;
pub mod scrapers;
pub mod source;
pub mod playback;
pub mod voice;
pub mod driver;
pub mod data;
pub mod utils;
pub mod commands;

#[cfg(test)]
pub(crate) mod testing;
