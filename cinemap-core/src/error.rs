use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("cannot read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read dataset stream: {0}")]
    Stream(#[from] std::io::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum CoordinatesError {
    #[error("cannot parse coordinates from \"{0}\"")]
    Syntax(String),

    #[error("latitude {0} is outside -90..=90")]
    LatitudeRange(f64),

    #[error("longitude {0} is outside -180..=180")]
    LongitudeRange(f64),
}
