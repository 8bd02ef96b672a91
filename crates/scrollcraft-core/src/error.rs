use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid lerp factor {0}: expected a value strictly between 0 and 1")]
    InvalidLerp(f64),

    #[error("Invalid snap proximity {0}: expected a finite, non-negative distance")]
    InvalidProximity(f64),

    #[error("Engine is missing a required collaborator: {0}")]
    MissingCollaborator(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
