use std::io;

use thiserror::Error;

/// Errors that stop the server from starting or keep it from running.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },
    #[error("HTTP server failed: {0}")]
    Serve(#[from] io::Error),
}
