use std::{io, path::PathBuf};

use thiserror::Error;

use crate::constants::ENV_CACHE_FILE;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} is a mandatory OS environment variable")]
    MissingVariable(&'static str),
    #[error("{var} must point to an existing file ({}): {source}", .path.display())]
    TokenFile {
        var: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{var} points to a file that is not valid UTF-8 ({})", .path.display())]
    TokenEncoding { var: &'static str, path: PathBuf },
    #[error("Could not determine home directory and {} not provided", ENV_CACHE_FILE)]
    HomeDirectory,
    #[error("Failed to assume role with web identity: {0}")]
    Federation(String),
    #[error("Failed to write credential cache {}: {source}", .path.display())]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not marshal json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to write credentials to stdout: {0}")]
    Stdout(#[source] io::Error),
}

pub(crate) fn cache_write_error(path: &std::path::Path, source: io::Error) -> Error {
    Error::CacheWrite {
        path: path.to_path_buf(),
        source,
    }
}
