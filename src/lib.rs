pub mod analyze;
pub mod classify;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod discover;
pub mod insight;
pub mod project;
pub mod report;
pub mod transcript;

use std::path::PathBuf;

#[derive(Debug)]
pub enum LensError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Config(String),
    Root { path: PathBuf, source: std::io::Error },
}

impl std::fmt::Display for LensError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LensError::Io(e) => write!(f, "io: {e}"),
            LensError::Json(e) => write!(f, "json: {e}"),
            LensError::Config(msg) => write!(f, "config: {msg}"),
            LensError::Root { path, source } => {
                write!(f, "cannot read projects dir {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for LensError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LensError::Io(e) => Some(e),
            LensError::Json(e) => Some(e),
            LensError::Root { source, .. } => Some(source),
            LensError::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for LensError {
    fn from(e: std::io::Error) -> Self {
        LensError::Io(e)
    }
}

impl From<serde_json::Error> for LensError {
    fn from(e: serde_json::Error) -> Self {
        LensError::Json(e)
    }
}
