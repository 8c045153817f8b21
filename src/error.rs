use std::io;
use std::result;

use serenity::prelude::SerenityError;
use thiserror::Error as ThisError;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, Clone, Eq, PartialEq, ThisError)]
pub enum Error {
    // A referenced pool, channel or guild no longer exists.
    #[error("{0}")]
    Configuration(String),
    // An entrant failed a role / level / balance check.
    #[error("{0}")]
    Eligibility(String),
    // An entry was attempted after the participant cap was reached.
    #[error("{0}")]
    Capacity(String),
    // A persisted record could not be parsed.
    #[error("{0}")]
    DataCorruption(String),
    #[error("{0}")]
    Storage(String),
    #[error("{0}")]
    Serenity(String),
}

impl Error {
    // Rejections that must be explained to the user rather than
    // swallowed by a log line.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Eligibility(_) | Error::Capacity(_) | Error::Configuration(_)
        )
    }
}

impl From<SerenityError> for Error {
    fn from(err: SerenityError) -> Error {
        Error::Serenity(err.to_string())
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::DataCorruption(err.to_string())
    }
}
