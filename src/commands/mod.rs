pub mod error;
pub mod mode;
pub mod play;
pub mod skip;
pub mod queue;
pub mod clear;
pub mod nowplaying;
pub mod rejoin;

use crate::data::Data;
use error::CommandError;

pub fn all() -> Vec<poise::Command<Data, CommandError>> {
    vec![
        mode::mode(),
        play::play(),
        skip::skip(),
        queue::queue(),
        clear::clear(),
        nowplaying::nowplaying(),
        rejoin::rejoin()
    ]
}
