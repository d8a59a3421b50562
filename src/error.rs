use thiserror::Error;

/// Errors raised while building a grid world or loading its configuration.
///
/// Sweeps and the convergence loop never fail; every error is reported
/// before the first sweep runs.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cell ({x}, {y}) lies outside the {width}x{height} grid")]
    OutOfBounds {
        x: isize,
        y: isize,
        width: usize,
        height: usize,
    },

    #[error("Cell ({x}, {y}) is declared more than once with conflicting contents")]
    ConflictingCell { x: usize, y: usize },

    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Error::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
