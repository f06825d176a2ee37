use std::io;
use std::path::PathBuf;

/// Failures that end one command cycle but never the session.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("{0}: missing redirection target")]
    MissingRedirectTarget(String),

    #[error("{}: {source}", .path.display())]
    Redirect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("exit: {0}: numeric argument required")]
    InvalidExitCode(String),

    #[error("{program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ShellResult<T> = Result<T, ShellError>;
