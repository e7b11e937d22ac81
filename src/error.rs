use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GameError {
    #[error("player name must not be empty")]
    EmptyName,

    #[error("player name is longer than {max} characters")]
    NameTooLong { max: usize },

    #[error("score can only be saved once after a finished, non-practice run with points")]
    SaveUnavailable,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no data directory available for the score table")]
    NoDataDir,

    #[error("writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding scores: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("no output audio device available")]
    NoDevice,

    #[error("failed to get default output config: {0}")]
    Config(String),

    #[error("failed to build output stream: {0}")]
    Stream(String),

    #[error("failed to play stream: {0}")]
    Play(String),
}

/// Errors reported by the command line.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no note named {0:?}; try C4 through G5")]
    UnknownNote(String),
}
