use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("polygon needs at least 3 vertices, got {0}")]
    DegeneratePolygon(usize),

    #[error("region {name:?} needs at least 3 vertices, got {vertices}")]
    InvalidRegion { name: String, vertices: usize },

    #[error("trajectory capacity must be at least 1")]
    ZeroTrajectoryCapacity,

    #[error("region {0:?} is defined more than once")]
    DuplicateRegion(String),

    #[error("video source {0:?} does not exist")]
    SourceNotFound(PathBuf),

    #[error("detector weights {0:?} do not exist")]
    WeightsNotFound(PathBuf),

    #[error("unknown device {0:?}, expected auto, cpu or a GPU index")]
    InvalidDevice(String),

    #[error("unknown counting policy {0:?}, expected per_frame or once_per_object")]
    InvalidPolicy(String),

    #[error("Config Error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("malformed detections on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "opencv")]
    #[error("OpenCV Error: {0}")]
    OpenCv(#[from] opencv::Error),
}
