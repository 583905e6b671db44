use crate::location::LocationParseError;
use thiserror::Error;

pub type StagingResult<T> = std::result::Result<T, StagingError>;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("invalid location reference: {0}")]
    Location(#[from] LocationParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
